//! Discount code rows and requests.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bizshop_core::discount::DiscountRules;
use bizshop_core::{DiscountCodeId, DiscountType, StoreId};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DiscountCode {
    pub id: DiscountCodeId,
    pub store_id: StoreId,
    pub code: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub discount_type: DiscountType,
    pub value: Decimal,
    pub usage_limit: Option<i32>,
    pub usage_count: i32,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl DiscountCode {
    #[must_use]
    pub fn rules(&self) -> DiscountRules {
        DiscountRules {
            discount_type: self.discount_type,
            value: self.value,
            usage_limit: self.usage_limit,
            usage_count: self.usage_count,
            starts_at: self.starts_at,
            expires_at: self.expires_at,
            is_active: self.is_active,
        }
    }
}

/// Create request. The code is normalized before it is stored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDiscount {
    pub code: String,
    #[serde(rename = "type")]
    pub discount_type: DiscountType,
    #[serde(default)]
    pub value: Decimal,
    pub usage_limit: Option<i32>,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

const fn default_active() -> bool {
    true
}

impl NewDiscount {
    /// The rules this code would start with.
    #[must_use]
    pub const fn rules(&self) -> DiscountRules {
        DiscountRules {
            discount_type: self.discount_type,
            value: self.value,
            usage_limit: self.usage_limit,
            usage_count: 0,
            starts_at: self.starts_at,
            expires_at: self.expires_at,
            is_active: self.is_active,
        }
    }
}

/// Partial update; the code and type are fixed once created.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountUpdate {
    pub value: Option<Decimal>,
    pub usage_limit: Option<i32>,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
}

impl DiscountUpdate {
    /// The rules `code` would have after this update.
    #[must_use]
    pub fn apply_to(&self, code: &DiscountCode) -> DiscountRules {
        let mut rules = code.rules();
        if let Some(value) = self.value {
            rules.value = value;
        }
        if self.usage_limit.is_some() {
            rules.usage_limit = self.usage_limit;
        }
        if self.starts_at.is_some() {
            rules.starts_at = self.starts_at;
        }
        if self.expires_at.is_some() {
            rules.expires_at = self.expires_at;
        }
        if let Some(active) = self.is_active {
            rules.is_active = active;
        }
        rules
    }
}

/// Storefront request to preview a code against a cart subtotal.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateDiscount {
    pub code: String,
    pub subtotal: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountPreview {
    pub code: String,
    #[serde(rename = "type")]
    pub discount_type: DiscountType,
    pub discount_amount: Decimal,
    pub shipping_fee: Decimal,
    pub total: Decimal,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn code() -> DiscountCode {
        DiscountCode {
            id: DiscountCodeId::new(1),
            store_id: StoreId::new(1),
            code: "DIWALI".to_owned(),
            discount_type: DiscountType::Percentage,
            value: Decimal::from(10),
            usage_limit: Some(5),
            usage_count: 2,
            starts_at: None,
            expires_at: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_update_keeps_usage_count() {
        let update = DiscountUpdate {
            value: Some(Decimal::from(20)),
            is_active: Some(false),
            ..DiscountUpdate::default()
        };
        let rules = update.apply_to(&code());
        assert_eq!(rules.value, Decimal::from(20));
        assert!(!rules.is_active);
        assert_eq!(rules.usage_count, 2);
        assert_eq!(rules.usage_limit, Some(5));
    }

    #[test]
    fn test_wire_uses_type_key() {
        let json = serde_json::to_value(code()).unwrap();
        assert_eq!(json["type"], "percentage");
        assert_eq!(json["usageLimit"], 5);
        assert_eq!(json["usageCount"], 2);
    }
}
