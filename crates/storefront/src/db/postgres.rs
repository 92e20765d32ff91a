//! `PostgreSQL` store.
//!
//! Queries are checked at runtime (`sqlx::query`) and documents travel as
//! `Json<T>`. Columns that must be queried or guarded (stock, order number,
//! statuses) are kept outside the JSON document and win over any copy inside
//! it when a row is read back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use cartwright_core::{Cart, Email, OrderStatus, PaymentStatus, Product, ProductId, UserId};

use super::{CartStore, OrderStore, ProductStore, RepositoryError, UserStore};
use crate::models::{Address, Order, OrderState, PaymentOption, User};

/// A [`super::Store`] backed by a `PostgreSQL` pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

type OrderRow = (Json<Order>, OrderStatus, PaymentStatus, bool, DateTime<Utc>);
type UserRow = (uuid::Uuid, String, DateTime<Utc>, DateTime<Utc>);

fn product_from_row((Json(mut product), stock): (Json<Product>, i32)) -> Result<Product, RepositoryError> {
    product.stock = u32::try_from(stock)
        .map_err(|_| RepositoryError::DataCorruption(format!("negative stock for product {}", product.id)))?;
    Ok(product)
}

fn order_from_row((Json(mut order), order_status, payment_status, backordered, updated_at): OrderRow) -> Order {
    order.order_status = order_status;
    order.payment_status = payment_status;
    order.backordered = backordered;
    order.updated_at = updated_at;
    order
}

fn user_from_row((id, email, created_at, updated_at): UserRow) -> Result<User, RepositoryError> {
    let email = Email::parse(&email)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid email in database: {e}")))?;
    Ok(User {
        id: UserId::new(id),
        email,
        created_at,
        updated_at,
    })
}

fn stock_column(value: u32) -> Result<i32, RepositoryError> {
    i32::try_from(value).map_err(|_| RepositoryError::Conflict(format!("stock value {value} out of range")))
}

fn conflict_on_unique(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(e)
}

#[async_trait]
impl ProductStore for PgStore {
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row: Option<(Json<Product>, i32)> = sqlx::query_as(
            r"
            SELECT document, stock
            FROM storefront.product
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(product_from_row).transpose()
    }

    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows: Vec<(Json<Product>, i32)> = sqlx::query_as(
            r"
            SELECT document, stock
            FROM storefront.product
            ORDER BY name
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(product_from_row).collect()
    }

    async fn upsert_product(&self, product: &Product) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO storefront.product (id, name, document, stock)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE
            SET name = EXCLUDED.name,
                document = EXCLUDED.document,
                stock = EXCLUDED.stock,
                updated_at = now()
            ",
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(Json(product))
        .bind(stock_column(product.stock)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn decrement_stock(&self, id: ProductId, quantity: u32) -> Result<(), RepositoryError> {
        let quantity = stock_column(quantity)?;
        let result = sqlx::query(
            r"
            UPDATE storefront.product
            SET stock = stock - $2, updated_at = now()
            WHERE id = $1 AND stock >= $2
            ",
        )
        .bind(id)
        .bind(quantity)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        let exists: Option<(i32,)> = sqlx::query_as("SELECT stock FROM storefront.product WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match exists {
            Some((stock,)) => Err(RepositoryError::Conflict(format!(
                "insufficient stock for {id}: {stock} < {quantity}"
            ))),
            None => Err(RepositoryError::NotFound),
        }
    }
}

#[async_trait]
impl CartStore for PgStore {
    async fn get_cart(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        let row: Option<(Json<Cart>,)> = sqlx::query_as("SELECT document FROM storefront.cart WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(Json(cart),)| cart))
    }

    async fn save_cart(&self, user_id: UserId, cart: &Cart) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO storefront.cart (user_id, document)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE
            SET document = EXCLUDED.document, updated_at = now()
            ",
        )
        .bind(user_id)
        .bind(Json(cart))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn insert_order(&self, order: &Order) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO storefront."order"
                (id, order_number, user_id, document, order_status, payment_status,
                 backordered, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(order.id)
        .bind(&order.order_number)
        .bind(order.user_id)
        .bind(Json(order))
        .bind(order.order_status)
        .bind(order.payment_status)
        .bind(order.backordered)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "order number"))?;
        Ok(())
    }

    async fn get_order(&self, order_number: &str) -> Result<Option<Order>, RepositoryError> {
        let row: Option<OrderRow> = sqlx::query_as(
            r#"
            SELECT document, order_status, payment_status, backordered, updated_at
            FROM storefront."order"
            WHERE order_number = $1
            "#,
        )
        .bind(order_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(order_from_row))
    }

    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows: Vec<OrderRow> = sqlx::query_as(
            r#"
            SELECT document, order_status, payment_status, backordered, updated_at
            FROM storefront."order"
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(order_from_row).collect())
    }

    async fn update_order_state(&self, order: &Order, expected: OrderState) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE storefront."order"
            SET order_status = $2, payment_status = $3, updated_at = $4
            WHERE order_number = $1 AND order_status = $5 AND payment_status = $6
            "#,
        )
        .bind(&order.order_number)
        .bind(order.order_status)
        .bind(order.payment_status)
        .bind(order.updated_at)
        .bind(expected.order_status)
        .bind(expected.payment_status)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Tell a missing order apart from a lost compare-and-set
            return match self.get_order(&order.order_number).await? {
                Some(_) => Err(RepositoryError::Conflict(format!(
                    "order {} was changed concurrently",
                    order.order_number
                ))),
                None => Err(RepositoryError::NotFound),
            };
        }
        Ok(())
    }

    async fn set_backordered(&self, order_number: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE storefront."order"
            SET backordered = TRUE, updated_at = NOW()
            WHERE order_number = $1
            "#,
        )
        .bind(order_number)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, email: &Email, password_hash: &str) -> Result<User, RepositoryError> {
        let row: UserRow = sqlx::query_as(
            r"
            INSERT INTO storefront.user (id, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, email, created_at, updated_at
            ",
        )
        .bind(UserId::generate())
        .bind(email.as_str())
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "email"))?;

        user_from_row(row)
    }

    async fn get_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(
            r"
            SELECT id, email, created_at, updated_at
            FROM storefront.user
            WHERE email = $1
            ",
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(user_from_row).transpose()
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(
            r"
            SELECT id, email, created_at, updated_at
            FROM storefront.user
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(user_from_row).transpose()
    }

    async fn get_password_hash(&self, id: UserId) -> Result<Option<String>, RepositoryError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT password_hash FROM storefront.user WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(hash,)| hash))
    }

    async fn get_addresses(&self, user_id: UserId) -> Result<Vec<Address>, RepositoryError> {
        let row: Option<(Json<Vec<Address>>,)> =
            sqlx::query_as("SELECT entries FROM storefront.address_book WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(Json(entries),)| entries).unwrap_or_default())
    }

    async fn save_addresses(&self, user_id: UserId, addresses: &[Address]) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO storefront.address_book (user_id, entries)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE
            SET entries = EXCLUDED.entries, updated_at = now()
            ",
        )
        .bind(user_id)
        .bind(Json(addresses))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_payment_options(&self, user_id: UserId) -> Result<Vec<PaymentOption>, RepositoryError> {
        let row: Option<(Json<Vec<PaymentOption>>,)> =
            sqlx::query_as("SELECT entries FROM storefront.payment_vault WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(Json(entries),)| entries).unwrap_or_default())
    }

    async fn save_payment_options(
        &self,
        user_id: UserId,
        options: &[PaymentOption],
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO storefront.payment_vault (user_id, entries)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE
            SET entries = EXCLUDED.entries, updated_at = now()
            ",
        )
        .bind(user_id)
        .bind(Json(options))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
