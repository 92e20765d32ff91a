//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers return `Result<T, AppError>`
//! and every error body is a JSON [`ErrorBody`].

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use cartwright_core::api::ErrorBody;

use crate::db::RepositoryError;
use crate::services::{AuthError, ServiceError};

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// A cart, account or order operation failed.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Database operation failed outside a service.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// No signed-in user.
    #[error("Unauthorized")]
    Unauthorized,

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(err: tower_sessions::session::Error) -> Self {
        Self::Internal(format!("session: {err}"))
    }
}

impl AppError {
    /// Whether this is a server-side failure rather than a client mistake.
    const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Database(_)
                | Self::Internal(_)
                | Self::Service(ServiceError::Repository(_))
                | Self::Auth(AuthError::Repository(_) | AuthError::PasswordHash)
        )
    }

    /// Status code and client-facing body. Internal details never leave the
    /// server.
    fn parts(self) -> (StatusCode, ErrorBody) {
        match self {
            Self::Service(err) => service_parts(err),
            Self::Auth(err) => auth_parts(err),
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                ErrorBody::new("unauthorized", "sign in required"),
            ),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorBody::new("validation", msg)),
            Self::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                ErrorBody::new("rate_limited", "too many requests"),
            ),
            Self::Database(_) | Self::Internal(_) => internal(),
        }
    }
}

fn service_parts(err: ServiceError) -> (StatusCode, ErrorBody) {
    match err {
        ServiceError::Unauthorized => (
            StatusCode::UNAUTHORIZED,
            ErrorBody::new("unauthorized", "invalid credentials"),
        ),
        ServiceError::NotFound(what) => (
            StatusCode::NOT_FOUND,
            ErrorBody::new("not_found", format!("{what} not found")),
        ),
        ServiceError::InsufficientStock(shortfalls) => (
            StatusCode::CONFLICT,
            ErrorBody {
                shortfalls,
                ..ErrorBody::new("insufficient_stock", "not enough stock for some items")
            },
        ),
        ServiceError::EmptyCart => (
            StatusCode::UNPROCESSABLE_ENTITY,
            ErrorBody::new("empty_cart", "cart is empty"),
        ),
        ServiceError::Conflict(msg) => (
            StatusCode::CONFLICT,
            ErrorBody {
                retryable: true,
                ..ErrorBody::new("conflict", msg)
            },
        ),
        ServiceError::Validation(msg) => (StatusCode::BAD_REQUEST, ErrorBody::new("validation", msg)),
        ServiceError::InvalidTransition(err) => (
            StatusCode::CONFLICT,
            ErrorBody::new("invalid_transition", err.to_string()),
        ),
        ServiceError::Repository(_) => internal(),
    }
}

fn auth_parts(err: AuthError) -> (StatusCode, ErrorBody) {
    match err {
        AuthError::InvalidCredentials => (
            StatusCode::UNAUTHORIZED,
            ErrorBody::new("unauthorized", "invalid credentials"),
        ),
        AuthError::UserAlreadyExists => (
            StatusCode::CONFLICT,
            ErrorBody::new("conflict", "an account with this email already exists"),
        ),
        AuthError::WeakPassword(msg) => (StatusCode::BAD_REQUEST, ErrorBody::new("validation", msg)),
        AuthError::InvalidEmail(_) => (
            StatusCode::BAD_REQUEST,
            ErrorBody::new("validation", "invalid email address"),
        ),
        AuthError::Repository(_) | AuthError::PasswordHash => internal(),
    }
}

fn internal() -> (StatusCode, ErrorBody) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        ErrorBody::new("internal", "internal server error"),
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let (status, body) = self.parts();
        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}
