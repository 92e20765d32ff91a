//! Turning a cart into an order.
//!
//! # Flow
//!
//! ```text
//! cart ─► shipping ─► payment ─► reload products ─► stock check ─► totals
//!                                                                     │
//!   notify ◄── decrement stock ◄── clear cart ◄── insert (retry on number clash)
//! ```
//!
//! Nothing is written before the insert, so any failure up to that point
//! leaves no order and an untouched cart. After the insert the order stands:
//! a refused stock decrement only flags it `backordered`, and a failed email
//! is only logged.

mod number;

pub use number::{OrderNumberGenerator, TimeOrderNumbers};

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use cartwright_core::stock::{self, StockCheck, StockRequest};
use cartwright_core::{
    AddressId, Cart, Money, OrderId, OrderStatus, PaymentOptionId, PaymentStatus, Product, ProductId,
    UserId, resolve_price,
};

use super::email::{Notification, NotificationSender};
use super::{AddressBook, PaymentVault, ServiceError};
use crate::config::CheckoutConfig;
use crate::db::{RepositoryError, Store};
use crate::models::{AddressInput, Order, OrderItem, PaymentMethod, PaymentSnapshot, ShippingAddress};

/// Attempts at inserting an order before a number clash is reported.
const MAX_INSERT_ATTEMPTS: usize = 3;

/// Where to ship. An inline address wins over a saved one; with neither, the
/// default address is used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingSelection {
    #[serde(default)]
    pub address_id: Option<AddressId>,
    #[serde(default)]
    pub address: Option<AddressInput>,
}

/// How to pay. `payment_option_id` is only read for `card`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSelection {
    pub method: PaymentMethod,
    #[serde(default)]
    pub payment_option_id: Option<PaymentOptionId>,
}

/// Body of `POST /api/orders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    #[serde(default)]
    pub shipping: ShippingSelection,
    pub payment: PaymentSelection,
}

/// Builds orders from carts.
#[derive(Clone)]
pub struct OrderAssembler {
    store: Arc<dyn Store>,
    addresses: AddressBook,
    vault: PaymentVault,
    notifier: Arc<dyn NotificationSender>,
    numbers: Arc<dyn OrderNumberGenerator>,
    checkout: CheckoutConfig,
}

impl OrderAssembler {
    /// Create an assembler.
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        addresses: AddressBook,
        vault: PaymentVault,
        notifier: Arc<dyn NotificationSender>,
        numbers: Arc<dyn OrderNumberGenerator>,
        checkout: CheckoutConfig,
    ) -> Self {
        Self {
            store,
            addresses,
            vault,
            notifier,
            numbers,
            checkout,
        }
    }

    /// Place an order for everything in the user's cart.
    ///
    /// # Errors
    ///
    /// - `EmptyCart` if the cart has no lines
    /// - `Validation` if no usable shipping address is given or saved
    /// - `NotFound` if a saved address, saved card, product or variant is gone
    /// - `InsufficientStock` listing every product that cannot be covered
    /// - `Conflict` if no free order number was found; safe to retry
    #[instrument(skip_all, fields(%user_id, order_number = tracing::field::Empty))]
    pub async fn place_order(&self, user_id: UserId, request: PlaceOrderRequest) -> Result<Order, ServiceError> {
        let cart = self.store.get_cart(user_id).await?.unwrap_or_default();
        if cart.is_empty() {
            return Err(ServiceError::EmptyCart);
        }

        let shipping_address = self.resolve_shipping(user_id, request.shipping).await?;
        let payment = self.resolve_payment(user_id, &request.payment).await?;

        let products = self.load_products(&cart).await?;
        let items = snapshot_items(&cart, &products)?;

        let requests = items.iter().map(|item| StockRequest {
            product_id: item.product_id,
            quantity: item.quantity,
        });
        if let StockCheck::Failed(shortfalls) =
            stock::validate(requests, |id| products.get(&id).map(|p| p.stock))
        {
            return Err(ServiceError::InsufficientStock(shortfalls));
        }

        let subtotal: Money = items.iter().map(OrderItem::line_total).sum();
        let shipping = self.checkout.shipping_for(subtotal);
        let now = Utc::now();

        let mut order = Order {
            id: OrderId::generate(),
            order_number: String::new(),
            user_id,
            items,
            shipping_address,
            subtotal,
            shipping,
            total: subtotal + shipping,
            payment,
            payment_status: PaymentStatus::Pending,
            order_status: OrderStatus::Processing,
            backordered: false,
            created_at: now,
            updated_at: now,
        };
        self.insert_with_fresh_number(&mut order).await?;
        tracing::Span::current().record("order_number", order.order_number.as_str());
        tracing::info!(total = %order.total, lines = order.items.len(), "Order placed");

        self.clear_cart(user_id, cart).await;
        self.decrement_stock(&mut order).await;
        self.notify(&order).await;

        Ok(order)
    }

    async fn resolve_shipping(
        &self,
        user_id: UserId,
        selection: ShippingSelection,
    ) -> Result<ShippingAddress, ServiceError> {
        if let Some(input) = selection.address {
            input.validate().map_err(ServiceError::Validation)?;
            return Ok(ShippingAddress::from(input));
        }

        if let Some(id) = selection.address_id {
            let saved = self.addresses.get(user_id, id).await?;
            return Ok(ShippingAddress::from(&saved));
        }

        self.addresses
            .default_address(user_id)
            .await?
            .map(|address| ShippingAddress::from(&address))
            .ok_or_else(|| ServiceError::Validation("a shipping address is required".to_owned()))
    }

    async fn resolve_payment(
        &self,
        user_id: UserId,
        selection: &PaymentSelection,
    ) -> Result<PaymentSnapshot, ServiceError> {
        match (selection.method, selection.payment_option_id) {
            (PaymentMethod::Card, Some(id)) => {
                let card = self.vault.get(user_id, id).await?;
                Ok(PaymentSnapshot {
                    method: PaymentMethod::Card,
                    card_number: Some(card.card_number.masked()),
                    cardholder_name: Some(card.cardholder_name),
                })
            }
            (method, _) => Ok(PaymentSnapshot::method_only(method)),
        }
    }

    async fn load_products(&self, cart: &Cart) -> Result<HashMap<ProductId, Product>, ServiceError> {
        let mut products = HashMap::new();
        for line in &cart.items {
            if products.contains_key(&line.product_id) {
                continue;
            }
            let product = self
                .store
                .get_product(line.product_id)
                .await?
                .ok_or_else(|| ServiceError::not_found("product"))?;
            products.insert(line.product_id, product);
        }
        Ok(products)
    }

    async fn insert_with_fresh_number(&self, order: &mut Order) -> Result<(), ServiceError> {
        for attempt in 1..=MAX_INSERT_ATTEMPTS {
            order.order_number = self.numbers.next_number();
            match self.store.insert_order(order).await {
                Ok(()) => return Ok(()),
                Err(RepositoryError::Conflict(reason)) => {
                    tracing::warn!(
                        attempt,
                        order_number = %order.order_number,
                        %reason,
                        "Order number already taken"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(ServiceError::Conflict("could not allocate an order number".to_owned()))
    }

    async fn clear_cart(&self, user_id: UserId, mut cart: Cart) {
        cart.clear();
        if let Err(e) = self.store.save_cart(user_id, &cart).await {
            tracing::error!(error = %e, "Failed to clear cart after order was placed");
        }
    }

    /// Take each product's ordered quantity off its stock. A refusal means
    /// another checkout got there first; the order is flagged for follow-up.
    async fn decrement_stock(&self, order: &mut Order) {
        let mut per_product: BTreeMap<ProductId, u32> = BTreeMap::new();
        for item in &order.items {
            let total = per_product.entry(item.product_id).or_insert(0);
            *total = total.saturating_add(item.quantity);
        }

        for (product_id, quantity) in per_product {
            match self.store.decrement_stock(product_id, quantity).await {
                Ok(()) => {}
                Err(RepositoryError::Conflict(_) | RepositoryError::NotFound) => {
                    tracing::warn!(%product_id, quantity, "Stock decrement refused, order backordered");
                    order.backordered = true;
                }
                Err(e) => {
                    tracing::error!(%product_id, error = %e, "Stock decrement failed, order backordered");
                    order.backordered = true;
                }
            }
        }

        if !order.backordered {
            return;
        }
        if let Err(e) = self.store.set_backordered(&order.order_number).await {
            tracing::error!(error = %e, "Failed to flag order as backordered");
            return;
        }
        // The order may already have been cancelled; hand back what is stored
        match self.store.get_order(&order.order_number).await {
            Ok(Some(stored)) => *order = stored,
            Ok(None) => tracing::error!("Backordered order vanished from the store"),
            Err(e) => tracing::warn!(error = %e, "Could not reload backordered order"),
        }
    }

    async fn notify(&self, order: &Order) {
        let user = match self.store.get_user(order.user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                tracing::warn!("No account for order confirmation");
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not load account for order confirmation");
                return;
            }
        };

        let notification = Notification::OrderConfirmation(order);
        if let Err(e) = self.notifier.send(&user.email, &notification).await {
            tracing::warn!(error = %e, "Order confirmation not sent");
        }
    }
}

/// Copy each cart line into an immutable order line priced as of now.
fn snapshot_items(cart: &Cart, products: &HashMap<ProductId, Product>) -> Result<Vec<OrderItem>, ServiceError> {
    let now = Utc::now();
    cart.items
        .iter()
        .map(|line| {
            let product = products
                .get(&line.product_id)
                .ok_or_else(|| ServiceError::not_found("product"))?;
            let variant_label = match line.variant_id {
                Some(variant) => Some(
                    product
                        .variant_label(variant)
                        .ok_or_else(|| ServiceError::not_found("variant"))?,
                ),
                None => None,
            };

            Ok(OrderItem {
                product_id: line.product_id,
                variant_id: line.variant_id,
                variant_label,
                name: product.name.clone(),
                image: product.image.clone(),
                price: resolve_price(product, line.variant_id, now),
                quantity: line.quantity,
            })
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use cartwright_core::VariantId;

    use super::*;
    use crate::db::{CartStore, MemoryStore, OrderStore, ProductStore};
    use crate::services::CartService;
    use crate::services::auth::{AuthService, PasswordCredentialVerifier};
    use crate::services::email::LogNotifier;

    /// Hands out a scripted list of numbers, then repeats the last one.
    struct ScriptedNumbers(Mutex<Vec<String>>);

    impl ScriptedNumbers {
        fn new(numbers: &[&str]) -> Self {
            Self(Mutex::new(numbers.iter().rev().map(|n| (*n).to_owned()).collect()))
        }
    }

    impl OrderNumberGenerator for ScriptedNumbers {
        fn next_number(&self) -> String {
            let mut numbers = self.0.lock().unwrap();
            if numbers.len() > 1 {
                numbers.pop().unwrap()
            } else {
                numbers.first().cloned().unwrap()
            }
        }
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        carts: CartService,
        assembler: OrderAssembler,
        user: UserId,
    }

    async fn fixture(numbers: Arc<dyn OrderNumberGenerator>) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let dyn_store: Arc<dyn Store> = store.clone();
        let user = AuthService::new(Arc::clone(&dyn_store))
            .register("buyer@cartwright.test", "long enough")
            .await
            .unwrap();
        let verifier = Arc::new(PasswordCredentialVerifier::new(Arc::clone(&dyn_store)));
        let assembler = OrderAssembler::new(
            Arc::clone(&dyn_store),
            AddressBook::new(Arc::clone(&dyn_store)),
            PaymentVault::new(Arc::clone(&dyn_store), verifier),
            Arc::new(LogNotifier),
            numbers,
            CheckoutConfig::default(),
        );
        Fixture {
            carts: CartService::new(dyn_store),
            store,
            assembler,
            user: user.id,
        }
    }

    async fn product(store: &MemoryStore, price: i64, stock: u32) -> ProductId {
        let product = Product {
            id: ProductId::generate(),
            name: format!("Item {price}"),
            image: None,
            price: Money::from_units(price),
            compare_at_price: None,
            variants: Vec::new(),
            stock,
            flash_sale: None,
        };
        store.upsert_product(&product).await.unwrap();
        product.id
    }

    fn inline_request() -> PlaceOrderRequest {
        PlaceOrderRequest {
            shipping: ShippingSelection {
                address_id: None,
                address: Some(AddressInput {
                    full_name: "Ada Lovelace".to_owned(),
                    line1: "12 St James's Square".to_owned(),
                    line2: None,
                    city: "London".to_owned(),
                    region: None,
                    postal_code: "SW1Y 4JH".to_owned(),
                    country: "GB".to_owned(),
                    phone: None,
                }),
            },
            payment: PaymentSelection {
                method: PaymentMethod::CashOnDelivery,
                payment_option_id: None,
            },
        }
    }

    #[tokio::test]
    async fn test_totals_and_cart_cleared() {
        let f = fixture(Arc::new(TimeOrderNumbers::new())).await;
        let a = product(&f.store, 25, 10).await;
        let b = product(&f.store, 40, 10).await;
        f.carts.add_item(f.user, a, 2, None).await.unwrap();
        f.carts.add_item(f.user, b, 1, None).await.unwrap();

        let order = f.assembler.place_order(f.user, inline_request()).await.unwrap();
        assert_eq!(order.subtotal, Money::from_units(90));
        assert_eq!(order.shipping, Money::from_units(10));
        assert_eq!(order.total, Money::from_units(100));
        assert_eq!(order.order_status, OrderStatus::Processing);
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert!(!order.backordered);
        assert!(order.order_number.starts_with("CW-"));

        assert!(f.store.get_cart(f.user).await.unwrap().unwrap().is_empty());
        assert_eq!(f.store.get_product(a).await.unwrap().unwrap().stock, 8);
    }

    #[tokio::test]
    async fn test_free_shipping_above_threshold() {
        let f = fixture(Arc::new(TimeOrderNumbers::new())).await;
        let a = product(&f.store, 101, 1).await;
        f.carts.add_item(f.user, a, 1, None).await.unwrap();
        let order = f.assembler.place_order(f.user, inline_request()).await.unwrap();
        assert_eq!(order.shipping, Money::ZERO);
        assert_eq!(order.total, Money::from_units(101));
    }

    #[tokio::test]
    async fn test_empty_cart_rejected() {
        let f = fixture(Arc::new(TimeOrderNumbers::new())).await;
        assert!(matches!(
            f.assembler.place_order(f.user, inline_request()).await,
            Err(ServiceError::EmptyCart)
        ));
    }

    #[tokio::test]
    async fn test_missing_address_is_validation_error() {
        let f = fixture(Arc::new(TimeOrderNumbers::new())).await;
        let a = product(&f.store, 5, 1).await;
        f.carts.add_item(f.user, a, 1, None).await.unwrap();

        let mut request = inline_request();
        request.shipping = ShippingSelection::default();
        assert!(matches!(
            f.assembler.place_order(f.user, request).await,
            Err(ServiceError::Validation(_))
        ));
        assert_eq!(f.store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_unknown_saved_card_is_not_found() {
        let f = fixture(Arc::new(TimeOrderNumbers::new())).await;
        let a = product(&f.store, 5, 1).await;
        f.carts.add_item(f.user, a, 1, None).await.unwrap();

        let mut request = inline_request();
        request.payment = PaymentSelection {
            method: PaymentMethod::Card,
            payment_option_id: Some(PaymentOptionId::generate()),
        };
        assert!(matches!(
            f.assembler.place_order(f.user, request).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_vanished_variant_is_not_found() {
        let f = fixture(Arc::new(TimeOrderNumbers::new())).await;
        let a = product(&f.store, 5, 3).await;
        let mut cart = Cart::default();
        cart.add((a, Some(VariantId::generate())), 1, Money::from_units(5));
        f.store.save_cart(f.user, &cart).await.unwrap();

        assert!(matches!(
            f.assembler.place_order(f.user, inline_request()).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_number_clash_is_retried() {
        let numbers = Arc::new(ScriptedNumbers::new(&["CW-TAKEN-AAAAAA", "CW-TAKEN-AAAAAA", "CW-FREE-BBBBBB"]));
        let f = fixture(numbers).await;
        let a = product(&f.store, 5, 10).await;

        f.carts.add_item(f.user, a, 1, None).await.unwrap();
        let first = f.assembler.place_order(f.user, inline_request()).await.unwrap();
        assert_eq!(first.order_number, "CW-TAKEN-AAAAAA");

        f.carts.add_item(f.user, a, 1, None).await.unwrap();
        let second = f.assembler.place_order(f.user, inline_request()).await.unwrap();
        assert_eq!(second.order_number, "CW-FREE-BBBBBB");
    }

    #[tokio::test]
    async fn test_persistent_clash_is_conflict_and_keeps_cart() {
        let numbers = Arc::new(ScriptedNumbers::new(&["CW-SAME-AAAAAA"]));
        let f = fixture(numbers).await;
        let a = product(&f.store, 5, 10).await;

        f.carts.add_item(f.user, a, 1, None).await.unwrap();
        f.assembler.place_order(f.user, inline_request()).await.unwrap();

        f.carts.add_item(f.user, a, 2, None).await.unwrap();
        assert!(matches!(
            f.assembler.place_order(f.user, inline_request()).await,
            Err(ServiceError::Conflict(_))
        ));
        assert_eq!(f.store.order_count().await, 1);
        let cart = f.store.get_cart(f.user).await.unwrap().unwrap();
        assert_eq!(cart.items.first().unwrap().quantity, 2);
        assert!(f.store.get_order("CW-SAME-AAAAAA").await.unwrap().is_some());
    }
}
