//! Error taxonomy shared by the cart, account and checkout services.

use thiserror::Error;

use cartwright_core::{CollectionError, StockShortfall, TransitionError};

use crate::db::RepositoryError;

/// Errors returned by the storefront services.
///
/// Business conditions get their own variant; anything infrastructural is
/// wrapped in `Repository` and surfaces as a 500.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// No session, or a gated mutation with a wrong password.
    #[error("invalid credentials")]
    Unauthorized,

    /// A referenced product, cart line, address, card or order is missing.
    #[error("{0} not found")]
    NotFound(String),

    /// One or more products cannot cover the requested quantity.
    #[error("insufficient stock for {} product(s)", .0.len())]
    InsufficientStock(Vec<StockShortfall>),

    /// Checkout was attempted with no cart lines.
    #[error("cart is empty")]
    EmptyCart,

    /// A uniqueness collision that a retry may resolve.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Malformed input.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A disallowed order or payment status change.
    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    /// Storage failure.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl ServiceError {
    /// `NotFound` for the given kind of thing.
    #[must_use]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Map a collection lookup failure onto `NotFound(what)`.
    pub(crate) fn from_collection(err: CollectionError, what: &str) -> Self {
        match err {
            CollectionError::NotFound => Self::not_found(what),
        }
    }
}
