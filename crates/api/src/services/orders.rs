//! Order placement and fulfilment.
//!
//! Placing an order is one transaction: lock the products, snapshot them,
//! consume the discount code, split the fee, take the stock and insert the
//! order. Any failure leaves nothing behind.

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;

use bizshop_core::discount::{DiscountError, DiscountOutcome, normalize_code};
use bizshop_core::fees;
use bizshop_core::{Email, OrderId, Price, StoreId};

use crate::db::{OrderRepository, StoreRepository, discounts, orders, products};
use crate::error::AppError;
use crate::models::order::{OrderLine, OrderStatusUpdate, merge_lines};
use crate::models::{NewOrder, Order, OrderItem, PlaceOrder};

/// Longest accepted customer name.
const MAX_CUSTOMER_NAME_LEN: usize = 200;

/// A committed order and the store it was placed with.
#[derive(Debug)]
pub struct PlacedOrder {
    pub order: Order,
    pub store_name: String,
}

pub struct OrderService<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Place an order on the published store `slug`.
    ///
    /// # Errors
    ///
    /// `AppError::NotFound` for an unknown or unpublished store,
    /// `AppError::BadRequest` for invalid lines or unavailable products,
    /// `AppError::Database` with a conflict for insufficient stock and
    /// `AppError::Entitlement` for an unusable discount code.
    #[tracing::instrument(skip(self, request))]
    pub async fn place(&self, slug: &str, request: &PlaceOrder) -> Result<PlacedOrder, AppError> {
        let store = StoreRepository::new(self.pool)
            .get_published_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::NotFound("store not found".to_string()))?;
        let store_id = store.store.id;

        let customer_name = request.customer_name.trim();
        if customer_name.is_empty() || customer_name.chars().count() > MAX_CUSTOMER_NAME_LEN {
            return Err(AppError::BadRequest("customer name is required".to_string()));
        }
        let customer_email = Email::parse(&request.customer_email)
            .map_err(|_| AppError::BadRequest("invalid customer email".to_string()))?;
        let lines = merge_lines(&request.items).map_err(AppError::BadRequest)?;
        let discount_code = request
            .discount_code
            .as_deref()
            .filter(|code| !code.trim().is_empty())
            .map(normalize_code)
            .transpose()?;

        let mut tx = self.pool.begin().await?;

        let items = snapshot(&mut tx, store_id, &lines).await?;
        let subtotal: Decimal = items.iter().map(OrderItem::line_total).sum();

        let outcome = match &discount_code {
            Some(code) => {
                let row = discounts::lock_by_code(&mut tx, store_id, code)
                    .await?
                    .ok_or_else(|| AppError::NotFound("discount code not found".to_string()))?;
                let rules = row.rules();
                rules.validate(Utc::now())?;
                if !discounts::consume(&mut tx, row.id).await? {
                    return Err(DiscountError::UsageLimitReached.into());
                }
                rules.apply(subtotal, store.store.shipping_fee_inr)
            }
            None => DiscountOutcome::none(store.store.shipping_fee_inr),
        };

        let total = outcome.total(subtotal);
        let split = fees::calculate(Price::inr(total), store.owner_plan)?;

        for line in &lines {
            products::decrement_inventory(&mut tx, line.product_id, line.quantity).await?;
        }

        let order = orders::insert(
            &mut tx,
            &NewOrder {
                store_id,
                customer_name: customer_name.to_owned(),
                customer_email: customer_email.into_inner(),
                shipping_address: request
                    .shipping_address
                    .as_deref()
                    .map(str::trim)
                    .filter(|a| !a.is_empty())
                    .map(str::to_owned),
                items,
                subtotal,
                discount_amount: outcome.discount_amount,
                shipping_fee: outcome.shipping_fee,
                total,
                discount_code,
                transaction_fee: split.transaction_fee,
                merchant_payout: split.merchant_payout,
            },
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            order_id = %order.id,
            store_id = %store_id,
            total = %order.total,
            transaction_fee = %order.transaction_fee,
            "Order placed"
        );

        Ok(PlacedOrder {
            order,
            store_name: store.store.name,
        })
    }

    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn list(&self, store_id: StoreId, limit: i64, offset: i64) -> Result<Vec<Order>, AppError> {
        Ok(OrderRepository::new(self.pool)
            .list(store_id, limit, offset)
            .await?)
    }

    /// Move an order forward in its fulfilment flow.
    ///
    /// # Errors
    ///
    /// `AppError::NotFound` for an unknown order, `AppError::Conflict` for a
    /// backwards or skipped move.
    pub async fn update_status(
        &self,
        store_id: StoreId,
        id: OrderId,
        update: OrderStatusUpdate,
    ) -> Result<Order, AppError> {
        let repo = OrderRepository::new(self.pool);
        let current = repo
            .get(store_id, id)
            .await?
            .ok_or_else(|| AppError::NotFound("order not found".to_string()))?;

        if current.status == update.status {
            return Ok(current);
        }
        if !current.status.can_transition_to(update.status) {
            return Err(AppError::Conflict(format!(
                "cannot move order from {:?} to {:?}",
                current.status, update.status
            )));
        }

        let order = repo
            .update_status(store_id, id, current.status, update.status)
            .await?;
        tracing::info!(order_id = %order.id, status = ?order.status, "Order status changed");
        Ok(order)
    }
}

/// Lock the ordered products and take the item snapshot.
async fn snapshot(
    conn: &mut sqlx::PgConnection,
    store_id: StoreId,
    lines: &[OrderLine],
) -> Result<Vec<OrderItem>, AppError> {
    let ids: Vec<_> = lines.iter().map(|line| line.product_id).collect();
    let locked = products::lock_for_order(conn, store_id, &ids).await?;

    lines
        .iter()
        .map(|line| {
            let product = locked
                .iter()
                .find(|p| p.id == line.product_id)
                .ok_or_else(|| {
                    AppError::BadRequest(format!("product {} is not available", line.product_id))
                })?;
            if product.inventory < line.quantity {
                return Err(AppError::Conflict(format!(
                    "insufficient inventory for product {}",
                    product.id
                )));
            }
            Ok(OrderItem {
                product_id: product.id,
                name: product.name.clone(),
                price_inr: product.price_inr,
                quantity: line.quantity,
            })
        })
        .collect()
}
