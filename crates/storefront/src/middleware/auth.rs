//! Session-backed authentication extractor.
//!
//! Every protected handler takes [`RequireAuth`], so a request without a
//! signed-in user is rejected before any cart, account or order logic runs.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use crate::error::AppError;
use crate::models::{CurrentUser, session_keys};

/// Extractor that requires a signed-in user.
///
/// Rejects with `401` and a JSON error body when there is no session or no
/// user in it.
///
/// # Example
///
/// ```rust,ignore
/// async fn get_cart(
///     State(state): State<AppState>,
///     RequireAuth(user): RequireAuth,
/// ) -> Result<Json<CartView>> {
///     let cart = state.carts().get_or_create(user.id).await?;
///     Ok(Json(CartView::from(&cart)))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RequireAuth(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Set by SessionManagerLayer
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AppError::Unauthorized)?;

        let user: CurrentUser = session
            .get(session_keys::CURRENT_USER)
            .await
            .ok()
            .flatten()
            .ok_or(AppError::Unauthorized)?;

        tracing::Span::current().record("user_id", tracing::field::display(user.id));
        Ok(Self(user))
    }
}

/// Store the signed-in user in the session, rotating the session ID first.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(session: &Session, user: &CurrentUser) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Drop the whole session (logout).
///
/// # Errors
///
/// Returns an error if the session store cannot be updated.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
