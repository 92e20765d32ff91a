//! Checkout and order history handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::instrument;

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::Order;
use crate::services::PlaceOrderRequest;
use crate::state::AppState;

/// Place an order for the current cart.
///
/// POST /api/orders
#[instrument(skip_all)]
pub async fn place(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<Order>)> {
    let order = state.checkout().place_order(user.id, body).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /api/orders
pub async fn index(State(state): State<AppState>, RequireAuth(user): RequireAuth) -> Result<Json<Vec<Order>>> {
    Ok(Json(state.orders().list_orders(user.id).await?))
}

/// GET /api/orders/{number}
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(number): Path<String>,
) -> Result<Json<Order>> {
    Ok(Json(state.orders().get_order(user.id, &number).await?))
}

/// POST /api/orders/{number}/cancel
#[instrument(skip_all, fields(order_number = %number))]
pub async fn cancel(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(number): Path<String>,
) -> Result<Json<Order>> {
    Ok(Json(state.orders().cancel_order(user.id, &number).await?))
}
