//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Email and password accounts, password re-verification
//! - `cart` - Authoritative per-user cart and client cart sync
//! - `address_book` - Saved shipping addresses with one default
//! - `payment_vault` - Saved cards with one default, password gated
//! - `checkout` - Order assembly from the cart
//! - `orders` - Order history and status transitions
//! - `email` - Customer notifications
//!
//! Every service holds an `Arc<dyn Store>` and takes the acting `UserId`
//! explicitly; resolving it from the session is the HTTP layer's job.

pub mod address_book;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod email;
mod error;
pub mod orders;
pub mod payment_vault;

pub use address_book::AddressBook;
pub use auth::{AuthError, AuthService, CredentialVerifier, PasswordCredentialVerifier};
pub use cart::{CartService, SyncOutcome};
pub use checkout::{
    OrderAssembler, OrderNumberGenerator, PaymentSelection, PlaceOrderRequest, ShippingSelection,
    TimeOrderNumbers,
};
pub use email::{LogNotifier, Notification, NotificationError, NotificationSender, SmtpNotifier};
pub use error::ServiceError;
pub use orders::OrderService;
pub use payment_vault::PaymentVault;
