//! JSON wire types shared by the storefront API and its clients.
//!
//! Request quantities are signed so that zero or negative values reach the
//! service layer and come back as validation errors (or sync skips) instead of
//! body-parsing failures.

use serde::{Deserialize, Serialize};

use crate::cart::{Cart, CartItem};
use crate::stock::StockShortfall;
use crate::types::{CartItemId, Money, ProductId, VariantId};

/// A cart line as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineView {
    pub id: CartItemId,
    pub product_id: ProductId,
    #[serde(default)]
    pub variant_id: Option<VariantId>,
    pub quantity: u32,
    pub price: Money,
    pub line_total: Money,
}

/// A cart as returned by the API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub items: Vec<CartLineView>,
    pub total: Money,
    pub item_count: u32,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            items: cart
                .items
                .iter()
                .map(|item| CartLineView {
                    id: item.id,
                    product_id: item.product_id,
                    variant_id: item.variant_id,
                    quantity: item.quantity,
                    price: item.price,
                    line_total: item.line_total(),
                })
                .collect(),
            total: cart.total(),
            item_count: cart.item_count(),
        }
    }
}

impl From<CartView> for Cart {
    fn from(view: CartView) -> Self {
        Self {
            items: view
                .items
                .into_iter()
                .map(|line| CartItem {
                    id: line.id,
                    product_id: line.product_id,
                    variant_id: line.variant_id,
                    quantity: line.quantity,
                    price: line.price,
                })
                .collect(),
        }
    }
}

/// `POST /api/cart/items`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: ProductId,
    pub quantity: i64,
    #[serde(default)]
    pub variant_id: Option<VariantId>,
}

/// `PATCH /api/cart/items/{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: i64,
}

/// One line of a client-held cart offered for merging.
///
/// Any price the client believes in is deliberately absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalCartItem {
    pub product_id: ProductId,
    #[serde(default)]
    pub variant_id: Option<VariantId>,
    pub quantity: i64,
}

/// `POST /api/cart/sync`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRequest {
    pub items: Vec<LocalCartItem>,
}

/// Why a local line was not merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The product no longer exists.
    ProductNotFound,
    /// The product exists but the selected variant option does not.
    VariantNotFound,
    /// Quantity below 1.
    InvalidQuantity,
}

/// A local line the server refused to merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedItem {
    pub item: LocalCartItem,
    pub reason: SkipReason,
}

/// Response of `POST /api/cart/sync`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    pub cart: CartView,
    pub skipped: Vec<SkippedItem>,
}

/// Error body returned by every failing API call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// Stable machine-readable code, e.g. `insufficient_stock`.
    pub error: String,
    /// Human-readable message.
    pub message: String,
    /// Every offending product, for `insufficient_stock`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shortfalls: Vec<StockShortfall>,
    /// Set when repeating the request may succeed.
    #[serde(default, skip_serializing_if = "core::ops::Not::not")]
    pub retryable: bool,
}

impl ErrorBody {
    /// Body with just a code and message.
    #[must_use]
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            shortfalls: Vec::new(),
            retryable: false,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_view_totals() {
        let mut cart = Cart::default();
        cart.add((ProductId::generate(), None), 2, Money::from_units(25));
        cart.add((ProductId::generate(), None), 1, Money::from_units(40));

        let view = CartView::from(&cart);
        assert_eq!(view.total, Money::from_units(90));
        assert_eq!(view.item_count, 3);
        assert_eq!(view.items.first().unwrap().line_total, Money::from_units(50));
        assert_eq!(Cart::from(view), cart);
    }

    #[test]
    fn test_error_body_omits_empty_fields() {
        let json = serde_json::to_value(ErrorBody::new("empty_cart", "cart is empty")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "error": "empty_cart", "message": "cart is empty" })
        );
    }

    #[test]
    fn test_sync_request_accepts_negative_quantity() {
        let json = serde_json::json!({
            "items": [{ "productId": ProductId::generate(), "quantity": -2 }]
        });
        let request: SyncRequest = serde_json::from_value(json).unwrap();
        assert_eq!(request.items.first().unwrap().quantity, -2);
    }
}
