//! Products and categories.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bizshop_core::{CategoryId, MAX_STORED_AMOUNT, ProductId, StoreId};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub store_id: StoreId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub store_id: StoreId,
    pub category_id: Option<CategoryId>,
    pub name: String,
    pub description: Option<String>,
    pub price_inr: Decimal,
    pub inventory: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<CategoryId>,
    pub price_inr: Decimal,
    #[serde(default)]
    pub inventory: i32,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

const fn default_active() -> bool {
    true
}

/// Partial product update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<CategoryId>,
    pub price_inr: Option<Decimal>,
    pub inventory: Option<i32>,
    pub is_active: Option<bool>,
}

impl NewProduct {
    /// Field checks that do not need the database.
    ///
    /// # Errors
    ///
    /// A human-readable message for the first invalid field.
    pub fn check(&self) -> Result<(), String> {
        check_name(&self.name)?;
        check_price(self.price_inr)?;
        check_inventory(self.inventory)
    }
}

impl ProductUpdate {
    /// Field checks that do not need the database.
    ///
    /// # Errors
    ///
    /// A human-readable message for the first invalid field.
    pub fn check(&self) -> Result<(), String> {
        if let Some(name) = &self.name {
            check_name(name)?;
        }
        if let Some(price) = self.price_inr {
            check_price(price)?;
        }
        if let Some(inventory) = self.inventory {
            check_inventory(inventory)?;
        }
        Ok(())
    }
}

fn check_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("name is required".to_owned());
    }
    Ok(())
}

fn check_price(price: Decimal) -> Result<(), String> {
    if price <= Decimal::ZERO {
        return Err("priceInr must be positive".to_owned());
    }
    if price.scale() > 2 && price != price.round_dp(2) {
        return Err("priceInr has at most 2 decimal places".to_owned());
    }
    if price > MAX_STORED_AMOUNT {
        return Err(format!("priceInr must be at most {MAX_STORED_AMOUNT}"));
    }
    Ok(())
}

fn check_inventory(inventory: i32) -> Result<(), String> {
    if inventory < 0 {
        return Err("inventory must not be negative".to_owned());
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product(price: Decimal, inventory: i32) -> NewProduct {
        NewProduct {
            name: "Masala chai".to_owned(),
            description: None,
            category_id: None,
            price_inr: price,
            inventory,
            is_active: true,
        }
    }

    #[test]
    fn test_new_product_checks() {
        assert!(product(Decimal::new(14950, 2), 5).check().is_ok());
        assert!(product(Decimal::ZERO, 5).check().is_err());
        assert!(product(Decimal::new(1, 3), 5).check().is_err());
        assert!(product(Decimal::from(10), -1).check().is_err());
    }

    #[test]
    fn test_price_must_fit_stored_column() {
        assert!(product(MAX_STORED_AMOUNT, 1).check().is_ok());
        let err = product(Decimal::from(10_000_000_000_i64), 1)
            .check()
            .unwrap_err();
        assert!(err.contains("at most"), "{err}");

        let update = ProductUpdate {
            price_inr: Some(MAX_STORED_AMOUNT + Decimal::new(1, 2)),
            ..ProductUpdate::default()
        };
        assert!(update.check().is_err());
    }

    #[test]
    fn test_update_only_checks_present_fields() {
        assert!(ProductUpdate::default().check().is_ok());
        let update = ProductUpdate {
            name: Some("   ".to_owned()),
            ..ProductUpdate::default()
        };
        assert!(update.check().is_err());
    }

    #[test]
    fn test_new_product_defaults_to_active() {
        let parsed: NewProduct =
            serde_json::from_str(r#"{"name":"Tea","priceInr":"120.00"}"#).unwrap();
        assert!(parsed.is_active);
        assert_eq!(parsed.inventory, 0);
    }
}
