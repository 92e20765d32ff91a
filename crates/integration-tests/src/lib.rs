//! Integration tests for Cartwright.
//!
//! Every test runs in-process over [`MemoryStore`]: services are driven
//! directly, the client replica talks to an in-process remote, and the HTTP
//! API is exercised through `tower::ServiceExt::oneshot`. No database or
//! running server is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p cartwright-integration-tests
//! ```
//!
//! # Test Files
//!
//! - `checkout` - Order placement, totals, stock and snapshots
//! - `accounts` - Address book and payment vault rules
//! - `cart_sync` - Client cart merge and the replica
//! - `backorder` - Stock decrement refused after the order is saved
//! - `api` - The JSON API end to end

#![allow(clippy::missing_panics_doc)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use secrecy::SecretString;

use cartwright_core::{Email, Money, Product, ProductId, UserId, VariantGroup, VariantId, VariantOption};
use cartwright_storefront::config::{CheckoutConfig, StoreBackend, StorefrontConfig};
use cartwright_storefront::db::{MemoryStore, ProductStore, Store};
use cartwright_storefront::models::{AddressInput, PaymentMethod, PaymentOptionInput};
use cartwright_storefront::services::{
    Notification, NotificationError, NotificationSender, PaymentSelection, PlaceOrderRequest, ShippingSelection,
    TimeOrderNumbers,
};
use cartwright_storefront::state::AppState;

/// Password used for every test account.
pub const PASSWORD: &str = "correct horse battery";

/// Configuration for an in-memory storefront.
#[must_use]
pub fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        backend: StoreBackend::Memory,
        database_url: None,
        host: std::net::Ipv4Addr::LOCALHOST.into(),
        port: 3000,
        base_url: "http://localhost:3000".to_owned(),
        session_secret: SecretString::from("integration-tests-session-secret-0123456789abcdef"),
        checkout: CheckoutConfig::default(),
        email: None,
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 0.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// Notifier that remembers what it was asked to send.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    /// `(recipient, subject)` pairs in send order.
    #[must_use]
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().expect("notifier lock poisoned").clone()
    }
}

#[async_trait]
impl NotificationSender for RecordingNotifier {
    async fn send(&self, to: &Email, notification: &Notification<'_>) -> Result<(), NotificationError> {
        self.sent
            .lock()
            .expect("notifier lock poisoned")
            .push((to.as_str().to_owned(), notification.subject()));
        Ok(())
    }
}

/// A storefront wired over a memory store.
pub struct Shop {
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub state: AppState,
}

impl Shop {
    /// A shop whose services all share one fresh [`MemoryStore`].
    #[must_use]
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let dyn_store: Arc<dyn Store> = store.clone();
        Self::with_store(store, dyn_store)
    }

    /// A shop whose services use `services_store`, which should wrap `store`.
    #[must_use]
    pub fn with_store(store: Arc<MemoryStore>, services_store: Arc<dyn Store>) -> Self {
        let notifier = Arc::new(RecordingNotifier::default());
        let state = AppState::new(
            test_config(),
            services_store,
            None,
            notifier.clone(),
            Arc::new(TimeOrderNumbers::new()),
        );
        Self { store, notifier, state }
    }

    /// Register an account and return its ID.
    pub async fn customer(&self, email: &str) -> UserId {
        self.state
            .auth()
            .register(email, PASSWORD)
            .await
            .expect("register test customer")
            .id
    }

    /// Add a product without variants to the catalog.
    pub async fn product(&self, name: &str, price: i64, stock: u32) -> Product {
        let product = Product {
            id: ProductId::generate(),
            name: name.to_owned(),
            image: Some(format!("https://cdn.cartwright.test/{}.jpg", name.to_lowercase())),
            price: Money::from_units(price),
            compare_at_price: None,
            variants: Vec::new(),
            stock,
            flash_sale: None,
        };
        self.save_product(&product).await;
        product
    }

    /// Add a product with one "Color" option costing `extra` more.
    pub async fn product_with_color(&self, name: &str, price: i64, extra: i64, stock: u32) -> (Product, VariantId) {
        let variant = VariantId::generate();
        let mut product = self.product(name, price, stock).await;
        product.variants = vec![VariantGroup {
            name: "Color".to_owned(),
            options: vec![VariantOption {
                id: variant,
                name: "Blue".to_owned(),
                value: "#0000ff".to_owned(),
                additional_price: Money::from_units(extra),
            }],
        }];
        self.save_product(&product).await;
        (product, variant)
    }

    /// Insert or replace a product.
    pub async fn save_product(&self, product: &Product) {
        self.store
            .upsert_product(product)
            .await
            .expect("upsert test product");
    }

    /// Current stock of a product.
    pub async fn stock(&self, id: ProductId) -> u32 {
        self.store
            .get_product(id)
            .await
            .expect("load product")
            .expect("product exists")
            .stock
    }
}

impl Default for Shop {
    fn default() -> Self {
        Self::new()
    }
}

/// A complete shipping address.
#[must_use]
pub fn address(full_name: &str) -> AddressInput {
    AddressInput {
        full_name: full_name.to_owned(),
        line1: "1 Market Street".to_owned(),
        line2: None,
        city: "Springfield".to_owned(),
        region: Some("OR".to_owned()),
        postal_code: "97477".to_owned(),
        country: "US".to_owned(),
        phone: None,
    }
}

/// Card input with the given number.
#[must_use]
pub fn card(number: &str) -> PaymentOptionInput {
    PaymentOptionInput {
        cardholder_name: "Ada Lovelace".to_owned(),
        card_number: number.to_owned(),
        expiry_month: 12,
        expiry_year: 2030,
    }
}

/// Cash on delivery to an inline address.
#[must_use]
pub fn cash_order() -> PlaceOrderRequest {
    PlaceOrderRequest {
        shipping: ShippingSelection {
            address_id: None,
            address: Some(address("Ada Lovelace")),
        },
        payment: PaymentSelection {
            method: PaymentMethod::CashOnDelivery,
            payment_option_id: None,
        },
    }
}
