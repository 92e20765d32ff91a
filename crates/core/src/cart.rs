//! Cart document shared by the authoritative server cart and the client
//! replica.
//!
//! Lines are merged on `(product_id, variant_id)`. Prices stored here are
//! snapshots produced by [`crate::pricing::resolve_price`]; nothing in this
//! module computes a price.

use serde::{Deserialize, Serialize};

use crate::types::{CartItemId, Money, ProductId, VariantId};

/// Merge key of a cart line.
pub type LineKey = (ProductId, Option<VariantId>);

/// One line of a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// Line ID.
    pub id: CartItemId,
    /// Product on this line.
    pub product_id: ProductId,
    /// Selected variant option, if any.
    #[serde(default)]
    pub variant_id: Option<VariantId>,
    /// Units, always at least 1.
    pub quantity: u32,
    /// Unit price snapshot at add or last update.
    pub price: Money,
}

impl CartItem {
    /// Create a new line with a fresh ID.
    #[must_use]
    pub fn new(product_id: ProductId, variant_id: Option<VariantId>, quantity: u32, price: Money) -> Self {
        Self {
            id: CartItemId::generate(),
            product_id,
            variant_id,
            quantity,
            price,
        }
    }

    /// The line's merge key.
    #[must_use]
    pub const fn key(&self) -> LineKey {
        (self.product_id, self.variant_id)
    }

    /// `price x quantity`.
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.price.times(self.quantity)
    }
}

/// A cart: an ordered list of lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    /// Lines in insertion order.
    #[serde(default)]
    pub items: Vec<CartItem>,
}

impl Cart {
    /// Sum of line totals.
    #[must_use]
    pub fn total(&self) -> Money {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Total units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0_u32, |acc, item| acc.saturating_add(item.quantity))
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drop every line.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Find a line by ID.
    #[must_use]
    pub fn item(&self, id: CartItemId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Find a line by ID for mutation.
    pub fn item_mut(&mut self, id: CartItemId) -> Option<&mut CartItem> {
        self.items.iter_mut().find(|item| item.id == id)
    }

    /// Find a line by merge key.
    #[must_use]
    pub fn find(&self, key: LineKey) -> Option<&CartItem> {
        self.items.iter().find(|item| item.key() == key)
    }

    fn find_mut(&mut self, key: LineKey) -> Option<&mut CartItem> {
        self.items.iter_mut().find(|item| item.key() == key)
    }

    /// Add `quantity` units under `key`.
    ///
    /// An existing line has its quantity incremented and its price replaced;
    /// otherwise a new line is appended. Returns the line ID.
    pub fn add(&mut self, key: LineKey, quantity: u32, price: Money) -> CartItemId {
        if let Some(line) = self.find_mut(key) {
            line.quantity = line.quantity.saturating_add(quantity);
            line.price = price;
            return line.id;
        }

        let line = CartItem::new(key.0, key.1, quantity, price);
        let id = line.id;
        self.items.push(line);
        id
    }

    /// Set the quantity and price under `key`, inserting if absent.
    ///
    /// Unlike [`Cart::add`] this overwrites, so applying the same call twice
    /// leaves the cart as one call would.
    pub fn upsert(&mut self, key: LineKey, quantity: u32, price: Money) -> CartItemId {
        if let Some(line) = self.find_mut(key) {
            line.quantity = quantity;
            line.price = price;
            return line.id;
        }

        let line = CartItem::new(key.0, key.1, quantity, price);
        let id = line.id;
        self.items.push(line);
        id
    }

    /// Remove a line. Returns whether a line was removed.
    pub fn remove(&mut self, id: CartItemId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        self.items.len() != before
    }
}
