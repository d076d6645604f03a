//! # Postgres Order Repository
//!
//! sqlx-backed [`OrderRepository`]. The insert is one transaction: header
//! plus every item commit together or not at all, and `ON CONFLICT
//! (payment_ref) DO NOTHING` resolves duplicate finalization inside the
//! database — concurrent retries race on the unique index, not on
//! application locks.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shop_core::{
    InsertOutcome, Order, OrderDraft, OrderItem, OrderRepository, OrderSummary, ShippingAddress,
    StoreError, StoreResult,
};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

/// Connect to Postgres and run pending migrations
pub async fn connect(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(pool)
}

/// Postgres-backed order repository
#[derive(Clone)]
pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn items_for(&self, order_id: Uuid) -> StoreResult<Vec<OrderItem>> {
        let rows: Vec<ItemRow> =
            sqlx::query_as("SELECT name, quantity, price FROM order_items WHERE order_id = $1 ORDER BY id")
                .bind(order_id)
                .fetch_all(&self.pool)
                .await
                .map_err(persistence)?;
        Ok(rows.into_iter().map(ItemRow::into_item).collect())
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn insert(&self, draft: &OrderDraft) -> StoreResult<InsertOutcome> {
        let mut tx = self.pool.begin().await.map_err(persistence)?;

        let inserted: Option<OrderRow> = sqlx::query_as(
            "INSERT INTO orders (id, order_number, user_id, total, payment_method, payment_ref, \
             shipping_address_line1, shipping_address_city, shipping_address_state, \
             shipping_address_postal_code) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             ON CONFLICT (payment_ref) DO NOTHING \
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&draft.order_number)
        .bind(draft.user_id)
        .bind(draft.total)
        .bind(&draft.payment_method)
        .bind(&draft.payment_ref)
        .bind(&draft.shipping_address.line1)
        .bind(&draft.shipping_address.city)
        .bind(&draft.shipping_address.state)
        .bind(&draft.shipping_address.postal_code)
        .fetch_optional(&mut *tx)
        .await
        .map_err(persistence)?;

        let Some(row) = inserted else {
            // The unique index on payment_ref absorbed the insert; hand back
            // the order that beat us there.
            tx.rollback().await.ok();
            let payment_ref = draft.payment_ref.as_deref().ok_or_else(|| {
                StoreError::Persistence("insert conflicted without a payment_ref".to_string())
            })?;
            return match self.find_by_payment_ref(payment_ref).await? {
                Some(existing) => Ok(InsertOutcome::Existing(existing)),
                None => Err(StoreError::Persistence(
                    "insert conflicted but no existing order was found".to_string(),
                )),
            };
        };

        for item in &draft.items {
            sqlx::query(
                "INSERT INTO order_items (order_id, name, quantity, price) VALUES ($1, $2, $3, $4)",
            )
            .bind(row.id)
            .bind(&item.name)
            .bind(item.quantity as i32)
            .bind(item.price)
            .execute(&mut *tx)
            .await
            .map_err(persistence)?;
        }

        tx.commit().await.map_err(persistence)?;
        Ok(InsertOutcome::Created(row.into_order(draft.items.clone())))
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Order>> {
        let row: Option<OrderRow> = sqlx::query_as("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(persistence)?;

        match row {
            Some(row) => {
                let items = self.items_for(row.id).await?;
                Ok(Some(row.into_order(items)))
            }
            None => Ok(None),
        }
    }

    async fn find_by_payment_ref(&self, payment_ref: &str) -> StoreResult<Option<Order>> {
        let row: Option<OrderRow> = sqlx::query_as("SELECT * FROM orders WHERE payment_ref = $1")
            .bind(payment_ref)
            .fetch_optional(&self.pool)
            .await
            .map_err(persistence)?;

        match row {
            Some(row) => {
                let items = self.items_for(row.id).await?;
                Ok(Some(row.into_order(items)))
            }
            None => Ok(None),
        }
    }

    async fn list_for_user(&self, user_id: i64) -> StoreResult<Vec<OrderSummary>> {
        let rows: Vec<SummaryRow> = sqlx::query_as(
            "SELECT id, order_number, total, status, created_at FROM orders \
             WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(persistence)?;

        Ok(rows.into_iter().map(SummaryRow::into_summary).collect())
    }
}

fn persistence(err: sqlx::Error) -> StoreError {
    StoreError::Persistence(err.to_string())
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    order_number: String,
    user_id: Option<i64>,
    total: Decimal,
    payment_method: String,
    status: String,
    payment_ref: Option<String>,
    shipping_address_line1: String,
    shipping_address_city: String,
    shipping_address_state: String,
    shipping_address_postal_code: String,
    created_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Order {
        Order {
            id: self.id,
            order_number: self.order_number,
            user_id: self.user_id,
            total: self.total,
            payment_method: self.payment_method,
            status: self.status,
            payment_ref: self.payment_ref,
            shipping_address: ShippingAddress {
                line1: self.shipping_address_line1,
                city: self.shipping_address_city,
                state: self.shipping_address_state,
                postal_code: self.shipping_address_postal_code,
            },
            created_at: self.created_at,
            items,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ItemRow {
    name: String,
    quantity: i32,
    price: Decimal,
}

impl ItemRow {
    fn into_item(self) -> OrderItem {
        OrderItem {
            name: self.name,
            quantity: self.quantity.max(0) as u32,
            price: self.price,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SummaryRow {
    id: Uuid,
    order_number: String,
    total: Decimal,
    status: String,
    created_at: DateTime<Utc>,
}

impl SummaryRow {
    fn into_summary(self) -> OrderSummary {
        OrderSummary {
            id: self.id,
            order_number: self.order_number,
            total: self.total,
            status: self.status,
            created_at: self.created_at,
        }
    }
}
