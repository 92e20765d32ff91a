//! Domain models for the storefront.
//!
//! Carts live in `cartwright_core::cart` because the client replica shares
//! them; everything here is server-only.

pub mod order;
pub mod session;
pub mod user;

pub use order::{Order, OrderItem, OrderState, PaymentMethod, PaymentSnapshot, ShippingAddress};
pub use session::{CurrentUser, keys as session_keys};
pub use user::{
    Address, AddressInput, AddressPatch, PaymentOption, PaymentOptionInput, PaymentOptionPatch,
    PaymentOptionView, User,
};
