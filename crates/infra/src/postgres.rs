//! Postgres-backed collaborator implementations.
//!
//! Expected schema:
//!
//! ```sql
//! CREATE TABLE customers (
//!     id             UUID PRIMARY KEY,
//!     name           TEXT NOT NULL,
//!     email          TEXT NOT NULL,
//!     registered_at  TIMESTAMPTZ NOT NULL
//! );
//!
//! CREATE TABLE products (
//!     id                  UUID PRIMARY KEY,
//!     sku                 TEXT NOT NULL,
//!     name                TEXT NOT NULL,
//!     available_quantity  BIGINT NOT NULL CHECK (available_quantity >= 0),
//!     unit_price          BIGINT NOT NULL CHECK (unit_price >= 0)
//! );
//!
//! CREATE TABLE orders (
//!     id           UUID PRIMARY KEY,
//!     customer_id  UUID NOT NULL REFERENCES customers (id),
//!     created_at   TIMESTAMPTZ NOT NULL
//! );
//!
//! CREATE TABLE order_line_items (
//!     order_id    UUID NOT NULL REFERENCES orders (id) ON DELETE CASCADE,
//!     line_no     BIGINT NOT NULL,
//!     product_id  UUID NOT NULL REFERENCES products (id),
//!     quantity    BIGINT NOT NULL CHECK (quantity > 0),
//!     unit_price  BIGINT NOT NULL,
//!     PRIMARY KEY (order_id, line_no)
//! );
//! ```
//!
//! ## Concurrency
//!
//! The conditional decrement runs the whole batch inside one transaction;
//! each `UPDATE` only applies while `available_quantity` still covers the
//! decrement, and any row left unaffected rolls the batch back and reports
//! `Conflict`. Competing orders therefore serialize on the row locks taken
//! by the updates, and stock can never go negative.
//!
//! ## Thread Safety
//!
//! All stores share a SQLx connection pool, which handles thread-safe
//! connection management; the stores themselves are `Send + Sync`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use orderdesk_catalog::{DecrementOutcome, ProductSnapshot, StockDecrement};
use orderdesk_core::{CustomerId, OrderId, ProductId};
use orderdesk_customers::Customer;
use orderdesk_ordering::{
    CustomerDirectory, Order, OrderLineItem, OrderStore, ProductCatalog, StorageFault,
};

/// Postgres-backed customer directory.
#[derive(Debug, Clone)]
pub struct PostgresCustomerDirectory {
    pool: Arc<PgPool>,
}

impl PostgresCustomerDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }
}

#[async_trait]
impl CustomerDirectory for PostgresCustomerDirectory {
    #[instrument(skip(self), fields(customer_id = %id), err)]
    async fn find_by_id(&self, id: CustomerId) -> Result<Option<Customer>, StorageFault> {
        let row = sqlx::query(
            "SELECT id, name, email, registered_at FROM customers WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(StorageFault::new)?;

        Ok(row.map(|row| Customer {
            id: CustomerId::from_uuid(row.get("id")),
            name: row.get("name"),
            email: row.get("email"),
            registered_at: row.get("registered_at"),
        }))
    }
}

/// Postgres-backed product catalog with conditional stock decrements.
#[derive(Debug, Clone)]
pub struct PostgresProductCatalog {
    pool: Arc<PgPool>,
}

impl PostgresProductCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }
}

#[async_trait]
impl ProductCatalog for PostgresProductCatalog {
    #[instrument(skip_all, fields(id_count = ids.len()), err)]
    async fn find_by_ids(&self, ids: &[ProductId]) -> Result<Vec<ProductSnapshot>, StorageFault> {
        let uuids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();

        let rows = sqlx::query(
            "SELECT id, available_quantity, unit_price FROM products WHERE id = ANY($1)",
        )
        .bind(&uuids)
        .fetch_all(&*self.pool)
        .await
        .map_err(StorageFault::new)?;

        Ok(rows
            .into_iter()
            .map(|row| ProductSnapshot {
                id: ProductId::from_uuid(row.get("id")),
                available_quantity: row.get("available_quantity"),
                unit_price: row.get::<i64, _>("unit_price") as u64,
            })
            .collect())
    }

    #[instrument(skip_all, fields(decrement_count = decrements.len()), err)]
    async fn decrement_quantities(
        &self,
        decrements: &[StockDecrement],
    ) -> Result<DecrementOutcome, StorageFault> {
        let mut tx = self.pool.begin().await.map_err(StorageFault::new)?;

        for d in decrements {
            let result = sqlx::query(
                "UPDATE products \
                 SET available_quantity = available_quantity - $2 \
                 WHERE id = $1 AND available_quantity >= $2",
            )
            .bind(d.product_id.as_uuid())
            .bind(d.quantity)
            .execute(&mut *tx)
            .await
            .map_err(StorageFault::new)?;

            if result.rows_affected() != 1 {
                tx.rollback().await.map_err(StorageFault::new)?;
                return Ok(DecrementOutcome::Conflict);
            }
        }

        tx.commit().await.map_err(StorageFault::new)?;
        Ok(DecrementOutcome::Applied)
    }
}

/// Postgres-backed order store.
#[derive(Debug, Clone)]
pub struct PostgresOrderStore {
    pool: Arc<PgPool>,
}

impl PostgresOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    #[instrument(skip_all, fields(customer_id = %customer_id, line_count = line_items.len()), err)]
    async fn create(
        &self,
        customer_id: CustomerId,
        line_items: Vec<OrderLineItem>,
    ) -> Result<Order, StorageFault> {
        let id = OrderId::new();
        let created_at = Utc::now();

        let mut tx = self.pool.begin().await.map_err(StorageFault::new)?;

        sqlx::query("INSERT INTO orders (id, customer_id, created_at) VALUES ($1, $2, $3)")
            .bind(id.as_uuid())
            .bind(customer_id.as_uuid())
            .bind(created_at)
            .execute(&mut *tx)
            .await
            .map_err(StorageFault::new)?;

        for (line_no, item) in line_items.iter().enumerate() {
            sqlx::query(
                "INSERT INTO order_line_items (order_id, line_no, product_id, quantity, unit_price) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(id.as_uuid())
            .bind(line_no as i64 + 1)
            .bind(item.product_id.as_uuid())
            .bind(item.quantity)
            .bind(item.unit_price as i64)
            .execute(&mut *tx)
            .await
            .map_err(StorageFault::new)?;
        }

        tx.commit().await.map_err(StorageFault::new)?;

        Ok(Order {
            id,
            customer_id,
            line_items,
            created_at,
        })
    }

    #[instrument(skip(self), fields(order_id = %id), err)]
    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, StorageFault> {
        let order_row = sqlx::query(
            "SELECT id, customer_id, created_at FROM orders WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(StorageFault::new)?;

        let Some(order_row) = order_row else {
            return Ok(None);
        };

        let line_rows = sqlx::query(
            "SELECT product_id, quantity, unit_price FROM order_line_items \
             WHERE order_id = $1 ORDER BY line_no ASC",
        )
        .bind(id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(StorageFault::new)?;

        let line_items = line_rows
            .into_iter()
            .map(|row| OrderLineItem {
                product_id: ProductId::from_uuid(row.get("product_id")),
                quantity: row.get("quantity"),
                unit_price: row.get::<i64, _>("unit_price") as u64,
            })
            .collect();

        Ok(Some(Order {
            id,
            customer_id: CustomerId::from_uuid(order_row.get("customer_id")),
            line_items,
            created_at: order_row.get::<DateTime<Utc>, _>("created_at"),
        }))
    }

    #[instrument(skip(self), fields(order_id = %id), err)]
    async fn discard(&self, id: OrderId) -> Result<(), StorageFault> {
        // Line items cascade with the order row.
        sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(StorageFault::new)?;
        Ok(())
    }
}
