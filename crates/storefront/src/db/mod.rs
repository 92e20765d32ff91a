//! Persistence for the storefront.
//!
//! Services talk to storage through the traits below and hold an
//! `Arc<dyn Store>`. Two implementations exist:
//!
//! - [`PgStore`] - `PostgreSQL`, one JSONB document per cart, address book,
//!   payment vault, product and order
//! - [`MemoryStore`] - process memory, for tests and the `memory` backend
//!
//! # Tables (schema `storefront`)
//!
//! - `user` - accounts and password hashes
//! - `address_book` / `payment_vault` - one list document per user
//! - `product` - catalog documents with a `CHECK (stock >= 0)` column
//! - `cart` - one cart document per user
//! - `order` - order documents, `UNIQUE (order_number)`
//! - `tower_sessions.session` - tower-sessions storage
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p cartwright-cli -- migrate
//! ```

mod memory;
mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use cartwright_core::{Cart, Email, Product, ProductId, UserId};

use crate::models::{Address, Order, OrderState, PaymentOption, User};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email, duplicate order number,
    /// insufficient stock on decrement).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Catalog access.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Load one product.
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Every product, ordered by name.
    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError>;

    /// Insert or replace a product document.
    async fn upsert_product(&self, product: &Product) -> Result<(), RepositoryError>;

    /// Decrement stock only if at least `quantity` units remain.
    ///
    /// Returns `NotFound` for an unknown product and `Conflict` if the
    /// decrement would make stock negative; stock is unchanged in both cases.
    async fn decrement_stock(&self, id: ProductId, quantity: u32) -> Result<(), RepositoryError>;
}

/// Per-user cart documents.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Load a user's cart, if one was ever saved.
    async fn get_cart(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError>;

    /// Replace a user's cart document.
    async fn save_cart(&self, user_id: UserId, cart: &Cart) -> Result<(), RepositoryError>;
}

/// Order documents.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert a new order. Returns `Conflict` if the order number is taken.
    async fn insert_order(&self, order: &Order) -> Result<(), RepositoryError>;

    /// Look up an order by its number.
    async fn get_order(&self, order_number: &str) -> Result<Option<Order>, RepositoryError>;

    /// A user's orders, newest first.
    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError>;

    /// Write an order's statuses and `updated_at`, provided the stored
    /// statuses still equal `expected`. Returns `Conflict` when another
    /// writer changed them first, leaving the stored order untouched. Line
    /// items, totals, addresses and the backorder flag are never rewritten.
    async fn update_order_state(&self, order: &Order, expected: OrderState) -> Result<(), RepositoryError>;

    /// Flag an order as backordered. Statuses are left alone.
    async fn set_backordered(&self, order_number: &str) -> Result<(), RepositoryError>;
}

/// Accounts and the lists they own.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Create an account. Returns `Conflict` if the email is taken.
    async fn create_user(&self, email: &Email, password_hash: &str) -> Result<User, RepositoryError>;

    /// Look up an account by email.
    async fn get_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;

    /// Look up an account by ID.
    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// The stored argon2 PHC string for a user.
    async fn get_password_hash(&self, id: UserId) -> Result<Option<String>, RepositoryError>;

    /// A user's address list as stored.
    async fn get_addresses(&self, user_id: UserId) -> Result<Vec<Address>, RepositoryError>;

    /// Replace a user's address list in one write.
    async fn save_addresses(&self, user_id: UserId, addresses: &[Address]) -> Result<(), RepositoryError>;

    /// A user's saved cards as stored.
    async fn get_payment_options(&self, user_id: UserId) -> Result<Vec<PaymentOption>, RepositoryError>;

    /// Replace a user's saved cards in one write.
    async fn save_payment_options(
        &self,
        user_id: UserId,
        options: &[PaymentOption],
    ) -> Result<(), RepositoryError>;
}

/// Everything the services need from storage.
pub trait Store: ProductStore + CartStore + OrderStore + UserStore {}

impl<T: ProductStore + CartStore + OrderStore + UserStore> Store for T {}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
