//! Address book and payment vault handlers.
//!
//! Payment vault mutations carry the account password in the body; it is
//! checked before anything changes.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::instrument;

use cartwright_core::{AddressId, PaymentOptionId};

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::{Address, AddressInput, AddressPatch, PaymentOptionInput, PaymentOptionPatch, PaymentOptionView};
use crate::state::AppState;

// =============================================================================
// Request Types
// =============================================================================

/// Body of `POST /api/account/addresses`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAddressRequest {
    #[serde(flatten)]
    pub address: AddressInput,
    #[serde(default)]
    pub is_default: bool,
}

/// Body of `POST /api/account/payments`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    pub password: String,
    #[serde(flatten)]
    pub card: PaymentOptionInput,
    #[serde(default)]
    pub is_default: bool,
}

/// Body of `PATCH /api/account/payments/{id}`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePaymentRequest {
    pub password: String,
    #[serde(flatten)]
    pub patch: PaymentOptionPatch,
}

/// Body of `DELETE /api/account/payments/{id}`.
#[derive(Deserialize)]
pub struct PasswordRequest {
    pub password: String,
}

// =============================================================================
// Address Book
// =============================================================================

/// GET /api/account/addresses
pub async fn addresses(State(state): State<AppState>, RequireAuth(user): RequireAuth) -> Result<Json<Vec<Address>>> {
    Ok(Json(state.addresses().list(user.id).await?))
}

/// POST /api/account/addresses
#[instrument(skip_all)]
pub async fn create_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<CreateAddressRequest>,
) -> Result<(StatusCode, Json<Vec<Address>>)> {
    let list = state
        .addresses()
        .add(user.id, body.address, body.is_default)
        .await?;
    Ok((StatusCode::CREATED, Json(list)))
}

/// PATCH /api/account/addresses/{id}
#[instrument(skip_all)]
pub async fn update_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<AddressId>,
    Json(patch): Json<AddressPatch>,
) -> Result<Json<Vec<Address>>> {
    Ok(Json(state.addresses().update(user.id, id, patch).await?))
}

/// DELETE /api/account/addresses/{id}
#[instrument(skip_all)]
pub async fn delete_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<AddressId>,
) -> Result<Json<Vec<Address>>> {
    Ok(Json(state.addresses().remove(user.id, id).await?))
}

// =============================================================================
// Payment Vault
// =============================================================================

/// GET /api/account/payments
pub async fn payments(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<PaymentOptionView>>> {
    Ok(Json(state.vault().list(user.id).await?))
}

/// POST /api/account/payments
#[instrument(skip_all)]
pub async fn create_payment(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<Vec<PaymentOptionView>>)> {
    let list = state
        .vault()
        .add(user.id, &body.password, body.card, body.is_default)
        .await?;
    Ok((StatusCode::CREATED, Json(list)))
}

/// PATCH /api/account/payments/{id}
#[instrument(skip_all)]
pub async fn update_payment(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<PaymentOptionId>,
    Json(body): Json<UpdatePaymentRequest>,
) -> Result<Json<Vec<PaymentOptionView>>> {
    let list = state
        .vault()
        .update(user.id, &body.password, id, body.patch)
        .await?;
    Ok(Json(list))
}

/// DELETE /api/account/payments/{id}
#[instrument(skip_all)]
pub async fn delete_payment(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<PaymentOptionId>,
    Json(body): Json<PasswordRequest>,
) -> Result<Json<Vec<PaymentOptionView>>> {
    Ok(Json(state.vault().remove(user.id, &body.password, id).await?))
}
