//! Account registration and session handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use cartwright_core::{Email, UserId};

use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{clear_current_user, set_current_user};
use crate::models::{CurrentUser, User};
use crate::state::AppState;

/// Body of register and login requests.
#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

/// The signed-in account.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub id: UserId,
    pub email: Email,
}

impl From<&User> for AccountResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
        }
    }
}

/// Create an account and sign it in.
///
/// POST /api/auth/register
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<CredentialsRequest>,
) -> Result<(StatusCode, Json<AccountResponse>)> {
    let user = state.auth().register(&body.email, &body.password).await?;
    sign_in(&session, &user).await?;
    Ok((StatusCode::CREATED, Json(AccountResponse::from(&user))))
}

/// Sign in with email and password.
///
/// POST /api/auth/login
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<CredentialsRequest>,
) -> Result<Json<AccountResponse>> {
    let user = state.auth().login(&body.email, &body.password).await?;
    sign_in(&session, &user).await?;
    tracing::info!(user_id = %user.id, "User signed in");
    Ok(Json(AccountResponse::from(&user)))
}

/// Sign out. Succeeds whether or not anyone was signed in.
///
/// POST /api/auth/logout
pub async fn logout(session: Session) -> Result<StatusCode> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}

async fn sign_in(session: &Session, user: &User) -> Result<()> {
    let current = CurrentUser {
        id: user.id,
        email: user.email.clone(),
    };
    set_current_user(session, &current).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(())
}
