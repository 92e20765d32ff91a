//! Cart handlers.
//!
//! Every response carries the whole cart as the server sees it, so clients
//! can replace their copy wholesale.

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::instrument;

use cartwright_core::CartItemId;
use cartwright_core::api::{AddItemRequest, CartView, SyncRequest, SyncResponse, UpdateQuantityRequest};

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// GET /api/cart
pub async fn show(State(state): State<AppState>, RequireAuth(user): RequireAuth) -> Result<Json<CartView>> {
    let cart = state.carts().get_or_create(user.id).await?;
    Ok(Json(CartView::from(&cart)))
}

/// POST /api/cart/items
#[instrument(skip_all)]
pub async fn add_item(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<AddItemRequest>,
) -> Result<Json<CartView>> {
    let cart = state
        .carts()
        .add_item(user.id, body.product_id, body.quantity, body.variant_id)
        .await?;
    Ok(Json(CartView::from(&cart)))
}

/// PATCH /api/cart/items/{id}
#[instrument(skip_all)]
pub async fn update_item(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(item_id): Path<CartItemId>,
    Json(body): Json<UpdateQuantityRequest>,
) -> Result<Json<CartView>> {
    let cart = state
        .carts()
        .update_item_quantity(user.id, item_id, body.quantity)
        .await?;
    Ok(Json(CartView::from(&cart)))
}

/// DELETE /api/cart/items/{id}
#[instrument(skip_all)]
pub async fn remove_item(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(item_id): Path<CartItemId>,
) -> Result<Json<CartView>> {
    let cart = state.carts().remove_item(user.id, item_id).await?;
    Ok(Json(CartView::from(&cart)))
}

/// POST /api/cart/sync
#[instrument(skip_all)]
pub async fn sync(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<SyncRequest>,
) -> Result<Json<SyncResponse>> {
    let outcome = state.carts().sync_from_client(user.id, &body.items).await?;
    Ok(Json(SyncResponse {
        cart: CartView::from(&outcome.cart),
        skipped: outcome.skipped,
    }))
}
