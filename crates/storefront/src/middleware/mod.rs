//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request tracing, `request_id` span field)
//! 3. Request ID (add unique ID to each request)
//! 4. Session layer (tower-sessions, `PostgreSQL` or in-memory store)
//! 5. Rate limiting (governor) on the auth and payment-vault routes
//!
//! The signed-in user is read per handler through [`RequireAuth`].

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod session;

pub use auth::{RequireAuth, clear_current_user, set_current_user};
pub use rate_limit::{api_rate_limiter, auth_rate_limiter, vault_rate_limiter};
pub use request_id::request_id_middleware;
pub use session::{create_session_layer, postgres_session_store};
