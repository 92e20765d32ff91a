//! Order and payment status state machines.
//!
//! ```text
//! processing ──► shipped ──► delivered
//!     │             │
//!     ├──► cancelled│
//!     └─────────────┴──► returned
//! ```
//!
//! `delivered`, `cancelled` and `returned` are terminal. A customer may only
//! cancel a `processing` order; every other transition is admin-only.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Who is asking for a status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    /// The customer who owns the order.
    Customer,
    /// Store staff.
    Admin,
}

/// A status transition that is not allowed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot move from {from} to {to} as {actor:?}")]
pub struct TransitionError {
    /// Current status.
    pub from: String,
    /// Requested status.
    pub to: String,
    /// Who requested it.
    pub actor: Actor,
}

/// Order fulfilment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "storefront.order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Returned,
}

impl OrderStatus {
    /// Whether no further transitions are permitted.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled | Self::Returned)
    }

    /// Whether `actor` may move an order from `self` to `to`.
    #[must_use]
    pub const fn can_transition(self, to: Self, actor: Actor) -> bool {
        if self.is_terminal() {
            return false;
        }

        match actor {
            Actor::Customer => matches!((self, to), (Self::Processing, Self::Cancelled)),
            Actor::Admin => matches!(
                (self, to),
                (Self::Processing, Self::Shipped | Self::Cancelled | Self::Returned)
                    | (Self::Shipped, Self::Delivered | Self::Returned)
            ),
        }
    }

    /// Validate and perform a transition.
    ///
    /// # Errors
    ///
    /// Returns `TransitionError` if the transition is not allowed for `actor`.
    pub fn transition(self, to: Self, actor: Actor) -> Result<Self, TransitionError> {
        if self.can_transition(to, actor) {
            Ok(to)
        } else {
            Err(TransitionError {
                from: self.to_string(),
                to: to.to_string(),
                actor,
            })
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Processing => write!(f, "processing"),
            Self::Shipped => write!(f, "shipped"),
            Self::Delivered => write!(f, "delivered"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Returned => write!(f, "returned"),
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            "returned" => Ok(Self::Returned),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

/// Order payment status.
///
/// No gateway is integrated; staff record the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "storefront.payment_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    /// Whether staff may record a move from `self` to `to`.
    #[must_use]
    pub const fn can_transition(self, to: Self) -> bool {
        matches!(
            (self, to),
            (Self::Pending, Self::Paid | Self::Failed)
                | (Self::Failed, Self::Paid)
                | (Self::Paid, Self::Refunded)
        )
    }

    /// Validate and perform a transition (always as [`Actor::Admin`]).
    ///
    /// # Errors
    ///
    /// Returns `TransitionError` if the transition is not allowed.
    pub fn transition(self, to: Self) -> Result<Self, TransitionError> {
        if self.can_transition(to) {
            Ok(to)
        } else {
            Err(TransitionError {
                from: self.to_string(),
                to: to.to_string(),
                actor: Actor::Admin,
            })
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Paid => write!(f, "paid"),
            Self::Failed => write!(f, "failed"),
            Self::Refunded => write!(f, "refunded"),
        }
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "failed" => Ok(Self::Failed),
            "refunded" => Ok(Self::Refunded),
            _ => Err(format!("invalid payment status: {s}")),
        }
    }
}
