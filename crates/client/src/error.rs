//! Client error types.

use thiserror::Error;

use cartwright_core::api::ErrorBody;

/// Errors talking to the storefront.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// HTTP transport failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid storefront URL.
    #[error("invalid base URL: {0}")]
    Url(#[from] url::ParseError),

    /// The storefront rejected the request with a JSON error body.
    #[error("storefront returned {status}: {}", .body.message)]
    Api {
        /// HTTP status code.
        status: u16,
        /// Decoded error body.
        body: ErrorBody,
    },

    /// The storefront answered with something that is not a JSON error.
    #[error("unexpected response {status}: {body}")]
    Unexpected {
        /// HTTP status code.
        status: u16,
        /// Raw response text.
        body: String,
    },
}

impl RemoteError {
    /// The machine-readable error code, when the storefront sent one.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Api { body, .. } => Some(&body.error),
            _ => None,
        }
    }
}

/// Errors reading or writing the saved replica.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// File system error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The saved cart could not be encoded or decoded.
    #[error("invalid saved cart: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors from [`crate::CartReplica`] operations.
///
/// A `Remote` error means the local change was kept but the server did not
/// accept it; call `refresh` to get back in line with the server.
#[derive(Debug, Error)]
pub enum ReplicaError {
    /// The storefront call failed.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// The local copy could not be saved or loaded.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// Quantities start at 1.
    #[error("quantity must be at least 1")]
    InvalidQuantity,

    /// No local line with that ID.
    #[error("cart item not found")]
    ItemNotFound,
}
