//! HTTP route handlers for the storefront JSON API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                        - Liveness
//! GET    /health/ready                  - Readiness (database ping)
//!
//! # Auth (rate limited)
//! POST   /api/auth/register             - Create account and sign in
//! POST   /api/auth/login                - Sign in
//! POST   /api/auth/logout               - Sign out
//!
//! # Cart (requires auth)
//! GET    /api/cart                      - Current cart
//! POST   /api/cart/items                - Add item
//! PATCH  /api/cart/items/{id}           - Set quantity
//! DELETE /api/cart/items/{id}           - Remove item (idempotent)
//! POST   /api/cart/sync                 - Merge a client cart
//!
//! # Orders (requires auth)
//! POST   /api/orders                    - Place order from cart
//! GET    /api/orders                    - Order history
//! GET    /api/orders/{number}           - Order detail
//! POST   /api/orders/{number}/cancel    - Cancel while processing
//!
//! # Account (requires auth)
//! GET    /api/account/addresses         - Address book
//! POST   /api/account/addresses         - Add address
//! PATCH  /api/account/addresses/{id}    - Edit address / make default
//! DELETE /api/account/addresses/{id}    - Remove address
//! GET    /api/account/payments          - Saved cards (masked, rate limited)
//! POST   /api/account/payments          - Add card (+password)
//! PATCH  /api/account/payments/{id}     - Edit card (+password)
//! DELETE /api/account/payments/{id}     - Remove card (+password)
//! ```

pub mod account;
pub mod auth;
pub mod cart;
pub mod health;
pub mod orders;

use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::middleware::{api_rate_limiter, auth_rate_limiter, vault_rate_limiter};
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .layer(auth_rate_limiter())
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/items", post(cart::add_item))
        .route("/items/{id}", patch(cart::update_item).delete(cart::remove_item))
        .route("/sync", post(cart::sync))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index).post(orders::place))
        .route("/{number}", get(orders::show))
        .route("/{number}/cancel", post(orders::cancel))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    let payments = Router::new()
        .route("/payments", get(account::payments).post(account::create_payment))
        .route(
            "/payments/{id}",
            patch(account::update_payment).delete(account::delete_payment),
        )
        .layer(vault_rate_limiter());

    Router::new()
        .route("/addresses", get(account::addresses).post(account::create_address))
        .route(
            "/addresses/{id}",
            patch(account::update_address).delete(account::delete_address),
        )
        .merge(payments)
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    let api = Router::new()
        .nest("/cart", cart_routes())
        .nest("/orders", order_routes())
        .nest("/account", account_routes())
        .layer(api_rate_limiter());

    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api/auth", auth_routes())
        .nest("/api", api)
}
