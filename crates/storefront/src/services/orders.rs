//! Order history and status changes.
//!
//! Only the status fields of a stored order ever change; line items, totals,
//! the shipping address and the payment snapshot are fixed at checkout.

use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use cartwright_core::{Actor, OrderStatus, PaymentStatus, UserId};

use super::ServiceError;
use crate::db::{RepositoryError, Store};
use crate::models::{Order, OrderState};

/// Read and transition orders.
#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn Store>,
}

impl OrderService {
    /// Create an order service over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// A user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if storage fails.
    pub async fn list_orders(&self, user_id: UserId) -> Result<Vec<Order>, ServiceError> {
        Ok(self.store.list_orders_for_user(user_id).await?)
    }

    /// One of the user's orders. Orders belonging to someone else are
    /// reported as missing.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if there is no such order for this user.
    pub async fn get_order(&self, user_id: UserId, order_number: &str) -> Result<Order, ServiceError> {
        self.load(order_number)
            .await?
            .filter(|order| order.user_id == user_id)
            .ok_or_else(|| ServiceError::not_found("order"))
    }

    /// Cancel one of the user's orders while it is still processing.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown order, `InvalidTransition` once the
    /// order has moved on, and `Conflict` if its status changed mid-request.
    #[instrument(skip_all, fields(%user_id, %order_number))]
    pub async fn cancel_order(&self, user_id: UserId, order_number: &str) -> Result<Order, ServiceError> {
        let mut order = self.get_order(user_id, order_number).await?;
        let expected = order.state();
        order.order_status = order
            .order_status
            .transition(OrderStatus::Cancelled, Actor::Customer)?;
        self.save_state(&mut order, expected).await?;
        tracing::info!("Order cancelled by customer");
        Ok(order)
    }

    /// Move an order to `target` on behalf of `actor`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown order and `InvalidTransition` if
    /// the state machine forbids the move.
    #[instrument(skip_all, fields(%order_number, %target, ?actor))]
    pub async fn transition_status(
        &self,
        order_number: &str,
        target: OrderStatus,
        actor: Actor,
    ) -> Result<Order, ServiceError> {
        let mut order = self
            .load(order_number)
            .await?
            .ok_or_else(|| ServiceError::not_found("order"))?;
        let expected = order.state();
        order.order_status = order.order_status.transition(target, actor)?;
        self.save_state(&mut order, expected).await?;
        tracing::info!("Order status changed");
        Ok(order)
    }

    /// Record a payment outcome.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown order and `InvalidTransition` if
    /// the payment state machine forbids the move.
    #[instrument(skip_all, fields(%order_number, %target))]
    pub async fn set_payment_status(&self, order_number: &str, target: PaymentStatus) -> Result<Order, ServiceError> {
        let mut order = self
            .load(order_number)
            .await?
            .ok_or_else(|| ServiceError::not_found("order"))?;
        let expected = order.state();
        order.payment_status = order.payment_status.transition(target)?;
        self.save_state(&mut order, expected).await?;
        tracing::info!("Payment status changed");
        Ok(order)
    }

    async fn load(&self, order_number: &str) -> Result<Option<Order>, ServiceError> {
        Ok(self.store.get_order(order_number).await?)
    }

    /// Write the new statuses only if nobody changed them since `expected`
    /// was read. A lost race is reported as a retryable `Conflict`.
    async fn save_state(&self, order: &mut Order, expected: OrderState) -> Result<(), ServiceError> {
        order.updated_at = Utc::now();
        match self.store.update_order_state(order, expected).await {
            Ok(()) => Ok(()),
            Err(RepositoryError::Conflict(reason)) => {
                tracing::warn!(%reason, "Order status changed concurrently");
                Err(ServiceError::Conflict(reason))
            }
            Err(e) => Err(e.into()),
        }
    }
}
