//! Orders and their denormalized snapshots.
//!
//! Nothing in an [`Order`] references live catalog or address-book data:
//! later edits to a product or a saved address never show up in a placed
//! order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cartwright_core::{Money, OrderId, OrderStatus, PaymentStatus, ProductId, UserId, VariantId};

use super::user::{Address, AddressInput};

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub subtotal: Money,
    pub shipping: Money,
    pub total: Money,
    pub payment: PaymentSnapshot,
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatus,
    /// Set when a post-checkout stock decrement was refused.
    #[serde(default)]
    pub backordered: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// The order and payment statuses as they stand now.
    #[must_use]
    pub const fn state(&self) -> OrderState {
        OrderState {
            order_status: self.order_status,
            payment_status: self.payment_status,
        }
    }
}

/// The two status fields of an order, compared as one unit when a status
/// change is written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderState {
    pub order_status: OrderStatus,
    pub payment_status: PaymentStatus,
}

/// One order line, copied from the catalog at checkout time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: ProductId,
    #[serde(default)]
    pub variant_id: Option<VariantId>,
    /// e.g. "Color: Red".
    #[serde(default)]
    pub variant_label: Option<String>,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    /// Unit price resolved at checkout.
    pub price: Money,
    pub quantity: u32,
}

impl OrderItem {
    /// `price x quantity`.
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.price.times(self.quantity)
    }
}

/// Shipping address copied into the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub full_name: String,
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub city: String,
    #[serde(default)]
    pub region: Option<String>,
    pub postal_code: String,
    pub country: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl From<&Address> for ShippingAddress {
    fn from(address: &Address) -> Self {
        Self {
            full_name: address.full_name.clone(),
            line1: address.line1.clone(),
            line2: address.line2.clone(),
            city: address.city.clone(),
            region: address.region.clone(),
            postal_code: address.postal_code.clone(),
            country: address.country.clone(),
            phone: address.phone.clone(),
        }
    }
}

impl From<AddressInput> for ShippingAddress {
    fn from(input: AddressInput) -> Self {
        Self::from(&input.into_address())
    }
}

/// How the customer chose to pay. No gateway is involved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    CashOnDelivery,
    Paypal,
    BankTransfer,
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Card => write!(f, "card"),
            Self::CashOnDelivery => write!(f, "cash on delivery"),
            Self::Paypal => write!(f, "PayPal"),
            Self::BankTransfer => write!(f, "bank transfer"),
        }
    }
}

/// Payment details recorded on the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSnapshot {
    pub method: PaymentMethod,
    /// Masked card number when a saved card was used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cardholder_name: Option<String>,
}

impl PaymentSnapshot {
    /// A snapshot with no card details.
    #[must_use]
    pub const fn method_only(method: PaymentMethod) -> Self {
        Self {
            method,
            card_number: None,
            cardholder_name: None,
        }
    }
}
