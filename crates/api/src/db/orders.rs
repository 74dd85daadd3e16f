//! Order repository and per-store analytics queries.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};

use bizshop_core::{OrderId, OrderStatus, ProductId, StoreId};

use super::RepositoryError;
use crate::models::{NewOrder, Order};

/// Order totals of one store. Cancelled orders are excluded.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub order_count: i64,
    pub revenue: Decimal,
    pub transaction_fees: Decimal,
    pub merchant_payout: Decimal,
}

/// Units and revenue of one product across a store's orders.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProductSales {
    pub product_id: ProductId,
    pub name: String,
    pub units: i64,
    pub revenue: Decimal,
}

/// Orders and revenue for one day.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DailySales {
    pub day: chrono::NaiveDate,
    pub order_count: i64,
    pub revenue: Decimal,
}

pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Most recent orders of a store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        store_id: StoreId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Order>, RepositoryError> {
        let orders = sqlx::query_as::<_, Order>(
            r"
            SELECT * FROM orders WHERE store_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            ",
        )
        .bind(store_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;
        Ok(orders)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, store_id: StoreId, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 AND store_id = $2")
            .bind(id)
            .bind(store_id)
            .fetch_optional(self.pool)
            .await?;
        Ok(order)
    }

    /// Move an order from `from` to `to`.
    ///
    /// Only the fulfilment status changes; amounts, snapshot and fee split
    /// are immutable.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the order is no longer in `from`.
    pub async fn update_status(
        &self,
        store_id: StoreId,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        sqlx::query_as::<_, Order>(
            r"
            UPDATE orders SET status = $4, updated_at = NOW()
            WHERE id = $1 AND store_id = $2 AND status = $3
            RETURNING *
            ",
        )
        .bind(id)
        .bind(store_id)
        .bind(from)
        .bind(to)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| RepositoryError::Conflict("order status changed concurrently".to_owned()))
    }

    /// Totals for a store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn summary(&self, store_id: StoreId) -> Result<OrderSummary, RepositoryError> {
        let summary = sqlx::query_as::<_, OrderSummary>(
            r"
            SELECT COUNT(*) AS order_count,
                   COALESCE(SUM(total), 0) AS revenue,
                   COALESCE(SUM(transaction_fee), 0) AS transaction_fees,
                   COALESCE(SUM(merchant_payout), 0) AS merchant_payout
            FROM orders
            WHERE store_id = $1 AND status <> 'cancelled'
            ",
        )
        .bind(store_id)
        .fetch_one(self.pool)
        .await?;
        Ok(summary)
    }

    /// Best-selling products from the item snapshots.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn top_products(
        &self,
        store_id: StoreId,
        limit: i64,
    ) -> Result<Vec<ProductSales>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductSales>(
            r"
            SELECT (item->>'productId')::int AS product_id,
                   MAX(item->>'name') AS name,
                   SUM((item->>'quantity')::bigint)::bigint AS units,
                   SUM((item->>'priceInr')::numeric * (item->>'quantity')::int) AS revenue
            FROM orders, jsonb_array_elements(items) AS item
            WHERE store_id = $1 AND status <> 'cancelled'
            GROUP BY 1
            ORDER BY units DESC, product_id
            LIMIT $2
            ",
        )
        .bind(store_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Orders per day over the last `days` days.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn daily_sales(
        &self,
        store_id: StoreId,
        days: i32,
    ) -> Result<Vec<DailySales>, RepositoryError> {
        let rows = sqlx::query_as::<_, DailySales>(
            r"
            SELECT (created_at AT TIME ZONE 'Asia/Kolkata')::date AS day,
                   COUNT(*) AS order_count,
                   SUM(total) AS revenue
            FROM orders
            WHERE store_id = $1 AND status <> 'cancelled'
              AND created_at >= NOW() - make_interval(days => $2)
            GROUP BY 1
            ORDER BY 1
            ",
        )
        .bind(store_id)
        .bind(days)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }
}

/// Insert an order inside the placing transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert(conn: &mut PgConnection, order: &NewOrder) -> Result<Order, RepositoryError> {
    let created = sqlx::query_as::<_, Order>(
        r"
        INSERT INTO orders (
            store_id, customer_name, customer_email, shipping_address, items,
            subtotal, discount_amount, shipping_fee, total, discount_code,
            transaction_fee, merchant_payout
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING *
        ",
    )
    .bind(order.store_id)
    .bind(&order.customer_name)
    .bind(&order.customer_email)
    .bind(order.shipping_address.as_deref())
    .bind(Json(&order.items))
    .bind(order.subtotal)
    .bind(order.discount_amount)
    .bind(order.shipping_fee)
    .bind(order.total)
    .bind(order.discount_code.as_deref())
    .bind(order.transaction_fee)
    .bind(order.merchant_payout)
    .fetch_one(conn)
    .await?;
    Ok(created)
}
