//! Authoritative per-user cart.
//!
//! Every write re-resolves the unit price on the server. Prices sent by a
//! client are never read.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use cartwright_core::api::{LocalCartItem, SkipReason, SkippedItem};
use cartwright_core::{Cart, CartItemId, Product, ProductId, StockShortfall, UserId, VariantId, resolve_price};

use super::ServiceError;
use crate::db::Store;

/// Result of merging a client cart into the server cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    /// The server cart after the merge.
    pub cart: Cart,
    /// Local lines that were not merged, with the reason.
    pub skipped: Vec<SkippedItem>,
}

/// Cart operations for signed-in users.
#[derive(Clone)]
pub struct CartService {
    store: Arc<dyn Store>,
}

impl CartService {
    /// Create a cart service over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Return the user's cart, creating an empty one on first access.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if storage fails.
    pub async fn get_or_create(&self, user_id: UserId) -> Result<Cart, ServiceError> {
        if let Some(cart) = self.store.get_cart(user_id).await? {
            return Ok(cart);
        }

        let cart = Cart::default();
        self.store.save_cart(user_id, &cart).await?;
        tracing::debug!(%user_id, "Created empty cart");
        Ok(cart)
    }

    /// Add `quantity` units of a product (and optional variant).
    ///
    /// An existing line for the same product and variant is incremented and
    /// repriced without a stock check; a new line requires `stock >= quantity`.
    ///
    /// # Errors
    ///
    /// - `Validation` if `quantity < 1`
    /// - `NotFound` if the product or the variant option does not exist
    /// - `InsufficientStock` if a new line asks for more than is on hand
    #[instrument(skip_all, fields(%user_id, %product_id))]
    pub async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i64,
        variant_id: Option<VariantId>,
    ) -> Result<Cart, ServiceError> {
        let quantity = positive_quantity(quantity)?;
        let product = self.load_product(product_id).await?;
        if let Some(variant) = variant_id
            && product.find_variant(variant).is_none()
        {
            return Err(ServiceError::not_found("variant"));
        }

        let mut cart = self.get_or_create(user_id).await?;
        let key = (product_id, variant_id);

        if cart.find(key).is_none() && product.stock < quantity {
            return Err(ServiceError::InsufficientStock(vec![StockShortfall {
                product_id,
                requested: quantity,
                available: product.stock,
            }]));
        }

        let price = resolve_price(&product, variant_id, Utc::now());
        cart.add(key, quantity, price);
        self.store.save_cart(user_id, &cart).await?;
        Ok(cart)
    }

    /// Set a line's quantity and reprice it.
    ///
    /// # Errors
    ///
    /// - `Validation` if `quantity < 1`
    /// - `NotFound` if the line or its product no longer exists
    #[instrument(skip_all, fields(%user_id, %item_id))]
    pub async fn update_item_quantity(
        &self,
        user_id: UserId,
        item_id: CartItemId,
        quantity: i64,
    ) -> Result<Cart, ServiceError> {
        let quantity = positive_quantity(quantity)?;
        let mut cart = self.get_or_create(user_id).await?;

        let line = cart
            .item(item_id)
            .ok_or_else(|| ServiceError::not_found("cart item"))?;
        let product = self.load_product(line.product_id).await?;
        let price = resolve_price(&product, line.variant_id, Utc::now());

        if let Some(line) = cart.item_mut(item_id) {
            line.quantity = quantity;
            line.price = price;
        }
        self.store.save_cart(user_id, &cart).await?;
        Ok(cart)
    }

    /// Remove a line. Removing a line that is not there is not an error.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if storage fails.
    #[instrument(skip_all, fields(%user_id, %item_id))]
    pub async fn remove_item(&self, user_id: UserId, item_id: CartItemId) -> Result<Cart, ServiceError> {
        let mut cart = self.get_or_create(user_id).await?;
        if cart.remove(item_id) {
            self.store.save_cart(user_id, &cart).await?;
        }
        Ok(cart)
    }

    /// Merge a client-held cart into the server cart.
    ///
    /// For each local line the price and variant are re-validated here. A
    /// line whose key already exists on the server overwrites the quantity;
    /// otherwise it is inserted. Lines with a vanished product or variant, or
    /// a quantity below 1, are skipped and reported. Applying the same
    /// snapshot twice leaves the cart as applying it once.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if storage fails.
    #[instrument(skip_all, fields(%user_id, lines = items.len()))]
    pub async fn sync_from_client(
        &self,
        user_id: UserId,
        items: &[LocalCartItem],
    ) -> Result<SyncOutcome, ServiceError> {
        let mut cart = self.get_or_create(user_id).await?;
        let mut skipped = Vec::new();
        let mut products: HashMap<ProductId, Option<Product>> = HashMap::new();
        let now = Utc::now();

        for item in items {
            let Ok(quantity) = positive_quantity(item.quantity) else {
                skipped.push(skip(*item, SkipReason::InvalidQuantity));
                continue;
            };

            let product = match products.get(&item.product_id) {
                Some(cached) => cached.clone(),
                None => {
                    let loaded = self.store.get_product(item.product_id).await?;
                    products.insert(item.product_id, loaded.clone());
                    loaded
                }
            };
            let Some(product) = product else {
                skipped.push(skip(*item, SkipReason::ProductNotFound));
                continue;
            };
            if let Some(variant) = item.variant_id
                && product.find_variant(variant).is_none()
            {
                skipped.push(skip(*item, SkipReason::VariantNotFound));
                continue;
            }

            let price = resolve_price(&product, item.variant_id, now);
            cart.upsert((item.product_id, item.variant_id), quantity, price);
        }

        self.store.save_cart(user_id, &cart).await?;
        if !skipped.is_empty() {
            tracing::info!(skipped = skipped.len(), "Skipped stale lines during cart sync");
        }
        Ok(SyncOutcome { cart, skipped })
    }

    async fn load_product(&self, id: ProductId) -> Result<Product, ServiceError> {
        self.store
            .get_product(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("product"))
    }
}

const fn skip(item: LocalCartItem, reason: SkipReason) -> SkippedItem {
    SkippedItem { item, reason }
}

/// Accept quantities of at least 1 that fit a `u32`.
fn positive_quantity(quantity: i64) -> Result<u32, ServiceError> {
    if quantity < 1 {
        return Err(ServiceError::Validation("quantity must be at least 1".to_owned()));
    }
    u32::try_from(quantity).map_err(|_| ServiceError::Validation("quantity is too large".to_owned()))
}
