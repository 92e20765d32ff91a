//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::db::Store;
use crate::services::{
    AddressBook, AuthService, CartService, NotificationSender, OrderAssembler, OrderNumberGenerator,
    OrderService, PasswordCredentialVerifier, PaymentVault,
};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`; every service shares one store.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: Option<PgPool>,
    auth: AuthService,
    carts: CartService,
    addresses: AddressBook,
    vault: PaymentVault,
    checkout: OrderAssembler,
    orders: OrderService,
}

impl AppState {
    /// Wire every service over `store`.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `store` - Persistence backend shared by all services
    /// * `pool` - The `PostgreSQL` pool behind `store`, if any, for readiness checks
    /// * `notifier` - Where order confirmations go
    /// * `numbers` - Order number source
    #[must_use]
    pub fn new(
        config: StorefrontConfig,
        store: Arc<dyn Store>,
        pool: Option<PgPool>,
        notifier: Arc<dyn NotificationSender>,
        numbers: Arc<dyn OrderNumberGenerator>,
    ) -> Self {
        let verifier = Arc::new(PasswordCredentialVerifier::new(Arc::clone(&store)));
        let addresses = AddressBook::new(Arc::clone(&store));
        let vault = PaymentVault::new(Arc::clone(&store), verifier);
        let checkout = OrderAssembler::new(
            Arc::clone(&store),
            addresses.clone(),
            vault.clone(),
            notifier,
            numbers,
            config.checkout,
        );

        Self {
            inner: Arc::new(AppStateInner {
                auth: AuthService::new(Arc::clone(&store)),
                carts: CartService::new(Arc::clone(&store)),
                orders: OrderService::new(store),
                addresses,
                vault,
                checkout,
                config,
                pool,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// The database pool, when running on `PostgreSQL`.
    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }

    #[must_use]
    pub fn auth(&self) -> &AuthService {
        &self.inner.auth
    }

    #[must_use]
    pub fn carts(&self) -> &CartService {
        &self.inner.carts
    }

    #[must_use]
    pub fn addresses(&self) -> &AddressBook {
        &self.inner.addresses
    }

    #[must_use]
    pub fn vault(&self) -> &PaymentVault {
        &self.inner.vault
    }

    #[must_use]
    pub fn checkout(&self) -> &OrderAssembler {
        &self.inner.checkout
    }

    #[must_use]
    pub fn orders(&self) -> &OrderService {
        &self.inner.orders
    }
}
