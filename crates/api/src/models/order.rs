//! Orders placed on public storefronts.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

use bizshop_core::{OrderId, OrderStatus, ProductId, StoreId};

/// Most distinct products accepted in one order.
pub const MAX_ORDER_LINES: usize = 50;

/// One line of the item snapshot taken when the order is placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: ProductId,
    pub name: String,
    pub price_inr: Decimal,
    pub quantity: i32,
}

impl OrderItem {
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price_inr * Decimal::from(self.quantity)
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub store_id: StoreId,
    pub customer_name: String,
    pub customer_email: String,
    pub shipping_address: Option<String>,
    pub items: Json<Vec<OrderItem>>,
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub shipping_fee: Decimal,
    pub total: Decimal,
    pub discount_code: Option<String>,
    pub transaction_fee: Decimal,
    pub merchant_payout: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A requested line: which product and how many.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: i32,
}

/// Checkout request from a storefront customer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrder {
    pub customer_name: String,
    pub customer_email: String,
    pub shipping_address: Option<String>,
    pub items: Vec<OrderLine>,
    pub discount_code: Option<String>,
}

/// Everything written to `orders` in the placing transaction.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub store_id: StoreId,
    pub customer_name: String,
    pub customer_email: String,
    pub shipping_address: Option<String>,
    pub items: Vec<OrderItem>,
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub shipping_fee: Decimal,
    pub total: Decimal,
    pub discount_code: Option<String>,
    pub transaction_fee: Decimal,
    pub merchant_payout: Decimal,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct OrderStatusUpdate {
    pub status: OrderStatus,
}

/// Merge repeated products and check quantities.
///
/// # Errors
///
/// A message when the order is empty, too long, or has a non-positive
/// quantity.
pub fn merge_lines(lines: &[OrderLine]) -> Result<Vec<OrderLine>, String> {
    if lines.is_empty() {
        return Err("order has no items".to_owned());
    }
    let mut merged: Vec<OrderLine> = Vec::with_capacity(lines.len());
    for line in lines {
        if line.quantity <= 0 {
            return Err(format!("quantity for product {} must be positive", line.product_id));
        }
        match merged.iter_mut().find(|m| m.product_id == line.product_id) {
            Some(existing) => {
                existing.quantity = existing
                    .quantity
                    .checked_add(line.quantity)
                    .ok_or_else(|| "quantity too large".to_owned())?;
            }
            None => merged.push(*line),
        }
    }
    if merged.len() > MAX_ORDER_LINES {
        return Err(format!("at most {MAX_ORDER_LINES} products per order"));
    }
    Ok(merged)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line(id: i32, quantity: i32) -> OrderLine {
        OrderLine {
            product_id: ProductId::new(id),
            quantity,
        }
    }

    #[test]
    fn test_merge_lines_combines_duplicates() {
        let merged = merge_lines(&[line(1, 2), line(2, 1), line(1, 3)]).unwrap();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].quantity, 5);
    }

    #[test]
    fn test_merge_lines_rejects_bad_input() {
        assert!(merge_lines(&[]).is_err());
        assert!(merge_lines(&[line(1, 0)]).is_err());
        assert!(merge_lines(&[line(1, i32::MAX), line(1, 1)]).is_err());
    }

    #[test]
    fn test_line_total() {
        let item = OrderItem {
            product_id: ProductId::new(1),
            name: "Kurta".to_owned(),
            price_inr: Decimal::new(49950, 2),
            quantity: 3,
        };
        assert_eq!(item.line_total(), Decimal::new(149_850, 2));
    }

    #[test]
    fn test_item_snapshot_wire_names() {
        let item = OrderItem {
            product_id: ProductId::new(9),
            name: "Mug".to_owned(),
            price_inr: Decimal::from(250),
            quantity: 1,
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["productId"], 9);
        assert_eq!(json["priceInr"], "250");
    }
}
