//! In-memory store for tests and the `memory` backend.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use cartwright_core::{Cart, Email, Product, ProductId, UserId};

use super::{CartStore, OrderStore, ProductStore, RepositoryError, UserStore};
use crate::models::{Address, Order, OrderState, PaymentOption, User};

/// A [`super::Store`] that keeps everything in process memory.
///
/// Every operation takes the lock once, so each call is atomic with respect
/// to the others, matching per-document atomicity in `PostgreSQL`.
#[derive(Default)]
pub struct MemoryStore {
    products: RwLock<HashMap<ProductId, Product>>,
    carts: RwLock<HashMap<UserId, Cart>>,
    orders: RwLock<Vec<Order>>,
    users: RwLock<Users>,
}

#[derive(Default)]
struct Users {
    accounts: HashMap<UserId, Account>,
    by_email: HashMap<String, UserId>,
    addresses: HashMap<UserId, Vec<Address>>,
    payment_options: HashMap<UserId, Vec<PaymentOption>>,
}

struct Account {
    user: User,
    password_hash: String,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.orders.read().await.len()
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.products.read().await.get(&id).cloned())
    }

    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError> {
        let mut products: Vec<Product> = self.products.read().await.values().cloned().collect();
        products.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(products)
    }

    async fn upsert_product(&self, product: &Product) -> Result<(), RepositoryError> {
        self.products
            .write()
            .await
            .insert(product.id, product.clone());
        Ok(())
    }

    async fn decrement_stock(&self, id: ProductId, quantity: u32) -> Result<(), RepositoryError> {
        let mut products = self.products.write().await;
        let product = products.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        product.stock = product.stock.checked_sub(quantity).ok_or_else(|| {
            RepositoryError::Conflict(format!(
                "insufficient stock for {id}: {} < {quantity}",
                product.stock
            ))
        })?;
        Ok(())
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn get_cart(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        Ok(self.carts.read().await.get(&user_id).cloned())
    }

    async fn save_cart(&self, user_id: UserId, cart: &Cart) -> Result<(), RepositoryError> {
        self.carts.write().await.insert(user_id, cart.clone());
        Ok(())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn insert_order(&self, order: &Order) -> Result<(), RepositoryError> {
        let mut orders = self.orders.write().await;
        if orders.iter().any(|o| o.order_number == order.order_number) {
            return Err(RepositoryError::Conflict(format!(
                "order number {} already exists",
                order.order_number
            )));
        }
        orders.push(order.clone());
        Ok(())
    }

    async fn get_order(&self, order_number: &str) -> Result<Option<Order>, RepositoryError> {
        Ok(self
            .orders
            .read()
            .await
            .iter()
            .find(|o| o.order_number == order_number)
            .cloned())
    }

    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let mut orders: Vec<Order> = self
            .orders
            .read()
            .await
            .iter()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn update_order_state(&self, order: &Order, expected: OrderState) -> Result<(), RepositoryError> {
        let mut orders = self.orders.write().await;
        let stored = orders
            .iter_mut()
            .find(|o| o.order_number == order.order_number)
            .ok_or(RepositoryError::NotFound)?;
        if stored.state() != expected {
            return Err(RepositoryError::Conflict(format!(
                "order {} was changed concurrently",
                order.order_number
            )));
        }
        stored.order_status = order.order_status;
        stored.payment_status = order.payment_status;
        stored.updated_at = order.updated_at;
        Ok(())
    }

    async fn set_backordered(&self, order_number: &str) -> Result<(), RepositoryError> {
        let mut orders = self.orders.write().await;
        let stored = orders
            .iter_mut()
            .find(|o| o.order_number == order_number)
            .ok_or(RepositoryError::NotFound)?;
        stored.backordered = true;
        stored.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, email: &Email, password_hash: &str) -> Result<User, RepositoryError> {
        let mut users = self.users.write().await;
        if users.by_email.contains_key(email.as_str()) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let now = Utc::now();
        let user = User {
            id: UserId::generate(),
            email: email.clone(),
            created_at: now,
            updated_at: now,
        };
        users.by_email.insert(email.as_str().to_owned(), user.id);
        users.accounts.insert(
            user.id,
            Account {
                user: user.clone(),
                password_hash: password_hash.to_owned(),
            },
        );
        Ok(user)
    }

    async fn get_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users
            .by_email
            .get(email.as_str())
            .and_then(|id| users.accounts.get(id))
            .map(|account| account.user.clone()))
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .users
            .read()
            .await
            .accounts
            .get(&id)
            .map(|account| account.user.clone()))
    }

    async fn get_password_hash(&self, id: UserId) -> Result<Option<String>, RepositoryError> {
        Ok(self
            .users
            .read()
            .await
            .accounts
            .get(&id)
            .map(|account| account.password_hash.clone()))
    }

    async fn get_addresses(&self, user_id: UserId) -> Result<Vec<Address>, RepositoryError> {
        Ok(self
            .users
            .read()
            .await
            .addresses
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn save_addresses(&self, user_id: UserId, addresses: &[Address]) -> Result<(), RepositoryError> {
        self.users
            .write()
            .await
            .addresses
            .insert(user_id, addresses.to_vec());
        Ok(())
    }

    async fn get_payment_options(&self, user_id: UserId) -> Result<Vec<PaymentOption>, RepositoryError> {
        Ok(self
            .users
            .read()
            .await
            .payment_options
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn save_payment_options(
        &self,
        user_id: UserId,
        options: &[PaymentOption],
    ) -> Result<(), RepositoryError> {
        self.users
            .write()
            .await
            .payment_options
            .insert(user_id, options.to_vec());
        Ok(())
    }
}
