//! Order administration commands.
//!
//! Staff changes go through the same state machines as customer actions,
//! acting as [`Actor::Admin`].

use std::sync::Arc;

use cartwright_core::{Actor, OrderStatus, PaymentStatus};
use cartwright_storefront::db::{PgStore, Store};
use cartwright_storefront::services::OrderService;

use super::{CommandError, connect};

async fn orders() -> Result<OrderService, CommandError> {
    let pool = connect().await?;
    let store: Arc<dyn Store> = Arc::new(PgStore::new(pool));
    Ok(OrderService::new(store))
}

/// Move an order to `status`.
///
/// # Errors
///
/// Returns an error if the order does not exist or the transition is not
/// allowed from its current status.
pub async fn set_status(number: &str, status: OrderStatus) -> Result<(), CommandError> {
    let order = orders()
        .await?
        .transition_status(number, status, Actor::Admin)
        .await?;
    tracing::info!(order_number = %order.order_number, status = %order.order_status, "Order updated");
    Ok(())
}

/// Record a payment outcome for an order.
///
/// # Errors
///
/// Returns an error if the order does not exist or the payment transition is
/// not allowed.
pub async fn set_payment(number: &str, status: PaymentStatus) -> Result<(), CommandError> {
    let order = orders().await?.set_payment_status(number, status).await?;
    tracing::info!(order_number = %order.order_number, payment = %order.payment_status, "Payment updated");
    Ok(())
}
