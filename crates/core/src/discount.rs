//! Discount code rules.
//!
//! Validation is a pure read of the code's row. Consuming a use is a
//! conditional database increment and lives with the order transaction, not
//! here.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{CurrencyCode, DiscountType, MAX_STORED_AMOUNT};

/// Longest accepted discount code.
pub const MAX_CODE_LEN: usize = 32;

/// The rule-bearing fields of a discount code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountRules {
    #[serde(rename = "type")]
    pub discount_type: DiscountType,
    pub value: Decimal,
    /// `None` means unlimited uses.
    pub usage_limit: Option<i32>,
    pub usage_count: i32,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

/// Why a code cannot be used (or defined).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscountError {
    #[error("discount code is not active")]
    Inactive,
    #[error("discount code is not valid yet")]
    NotStarted,
    #[error("discount code has expired")]
    Expired,
    #[error("discount code usage limit reached")]
    UsageLimitReached,
    #[error("invalid discount value: {0}")]
    InvalidValue(String),
    #[error("invalid discount code: {0}")]
    InvalidCode(String),
}

/// What a valid code does to an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountOutcome {
    /// Amount taken off the subtotal.
    pub discount_amount: Decimal,
    /// Shipping after the discount.
    pub shipping_fee: Decimal,
}

impl DiscountOutcome {
    /// No discount at all.
    #[must_use]
    pub const fn none(shipping_fee: Decimal) -> Self {
        Self {
            discount_amount: Decimal::ZERO,
            shipping_fee,
        }
    }

    /// Order total for `subtotal` with this outcome applied.
    #[must_use]
    pub fn total(&self, subtotal: Decimal) -> Decimal {
        subtotal - self.discount_amount + self.shipping_fee
    }
}

impl DiscountRules {
    /// Check whether the code may be used at `now`. The validity window
    /// includes both `starts_at` and `expires_at`.
    ///
    /// # Errors
    ///
    /// One [`DiscountError`] variant per failed condition, checked in the
    /// order active, started, not expired, uses left.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), DiscountError> {
        if !self.is_active {
            return Err(DiscountError::Inactive);
        }
        if self.starts_at.is_some_and(|start| now < start) {
            return Err(DiscountError::NotStarted);
        }
        if self.expires_at.is_some_and(|end| now > end) {
            return Err(DiscountError::Expired);
        }
        if self.usage_limit.is_some_and(|limit| self.usage_count >= limit) {
            return Err(DiscountError::UsageLimitReached);
        }
        Ok(())
    }

    /// Check the definition when a seller creates or edits a code.
    ///
    /// # Errors
    ///
    /// [`DiscountError::InvalidValue`] for negative values, percentages over
    /// 100, a non-positive usage limit or an end before the start.
    pub fn check_definition(&self) -> Result<(), DiscountError> {
        if self.value < Decimal::ZERO {
            return Err(DiscountError::InvalidValue("value must not be negative".to_owned()));
        }
        if self.value > MAX_STORED_AMOUNT {
            return Err(DiscountError::InvalidValue("value is too large".to_owned()));
        }
        if self.discount_type == DiscountType::Percentage && self.value > Decimal::ONE_HUNDRED {
            return Err(DiscountError::InvalidValue(
                "percentage must be at most 100".to_owned(),
            ));
        }
        if self.usage_limit.is_some_and(|limit| limit <= 0) {
            return Err(DiscountError::InvalidValue(
                "usage limit must be positive".to_owned(),
            ));
        }
        if let (Some(start), Some(end)) = (self.starts_at, self.expires_at)
            && end <= start
        {
            return Err(DiscountError::InvalidValue(
                "expiry must be after start".to_owned(),
            ));
        }
        Ok(())
    }

    /// Apply the code to an order's subtotal and shipping.
    ///
    /// The discount never exceeds the subtotal.
    #[must_use]
    pub fn apply(&self, subtotal: Decimal, shipping_fee: Decimal) -> DiscountOutcome {
        let value = self.value.max(Decimal::ZERO);
        match self.discount_type {
            DiscountType::Percentage => {
                let percent = value.min(Decimal::ONE_HUNDRED);
                let amount = CurrencyCode::INR.round(subtotal * percent / Decimal::ONE_HUNDRED);
                DiscountOutcome {
                    discount_amount: amount.min(subtotal),
                    shipping_fee,
                }
            }
            DiscountType::FixedAmount => DiscountOutcome {
                discount_amount: value.min(subtotal),
                shipping_fee,
            },
            DiscountType::FreeShipping => DiscountOutcome {
                discount_amount: Decimal::ZERO,
                shipping_fee: Decimal::ZERO,
            },
        }
    }
}

/// Canonical form of a discount code: trimmed and upper-cased.
///
/// # Errors
///
/// [`DiscountError::InvalidCode`] when the code is empty, longer than
/// [`MAX_CODE_LEN`] or contains anything but ASCII letters, digits, `-` and `_`.
pub fn normalize_code(raw: &str) -> Result<String, DiscountError> {
    let code = raw.trim().to_ascii_uppercase();
    let valid_chars = code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if code.is_empty() || code.len() > MAX_CODE_LEN || !valid_chars {
        return Err(DiscountError::InvalidCode(raw.to_owned()));
    }
    Ok(code)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap()
    }

    fn rules(discount_type: DiscountType, value: i64) -> DiscountRules {
        DiscountRules {
            discount_type,
            value: Decimal::from(value),
            usage_limit: None,
            usage_count: 0,
            starts_at: None,
            expires_at: None,
            is_active: true,
        }
    }

    #[test]
    fn test_usage_limit_reached() {
        let mut code = rules(DiscountType::Percentage, 10);
        code.usage_limit = Some(5);
        code.usage_count = 4;
        assert_eq!(code.validate(now()), Ok(()));
        code.usage_count = 5;
        assert_eq!(code.validate(now()), Err(DiscountError::UsageLimitReached));
    }

    #[test]
    fn test_validation_is_a_pure_read() {
        let code = rules(DiscountType::FixedAmount, 50);
        let before = code.clone();
        code.validate(now()).unwrap();
        code.validate(now()).unwrap();
        assert_eq!(code, before);
    }

    #[test]
    fn test_window_and_active_flag() {
        let mut code = rules(DiscountType::Percentage, 10);
        code.is_active = false;
        assert_eq!(code.validate(now()), Err(DiscountError::Inactive));

        code.is_active = true;
        code.starts_at = Some(now() + Duration::hours(1));
        assert_eq!(code.validate(now()), Err(DiscountError::NotStarted));

        code.starts_at = Some(now() - Duration::days(2));
        code.expires_at = Some(now() - Duration::seconds(1));
        assert_eq!(code.validate(now()), Err(DiscountError::Expired));

        code.expires_at = Some(now() + Duration::days(1));
        assert_eq!(code.validate(now()), Ok(()));
    }

    #[test]
    fn test_window_includes_both_ends() {
        let mut code = rules(DiscountType::Percentage, 10);
        code.starts_at = Some(now());
        code.expires_at = Some(now() + Duration::days(1));
        assert_eq!(code.validate(now()), Ok(()));

        code.starts_at = Some(now() - Duration::days(1));
        code.expires_at = Some(now());
        assert_eq!(code.validate(now()), Ok(()));
        assert_eq!(
            code.validate(now() + Duration::milliseconds(1)),
            Err(DiscountError::Expired)
        );
    }

    #[test]
    fn test_percentage_is_rounded_and_capped() {
        let code = rules(DiscountType::Percentage, 15);
        let outcome = code.apply(Decimal::new(33333, 2), Decimal::from(40));
        // 15% of 333.33 = 49.9995
        assert_eq!(outcome.discount_amount, Decimal::new(5000, 2));
        assert_eq!(outcome.shipping_fee, Decimal::from(40));

        let over = DiscountRules {
            value: Decimal::from(150),
            ..code
        };
        assert_eq!(
            over.apply(Decimal::from(200), Decimal::ZERO).discount_amount,
            Decimal::from(200)
        );
    }

    #[test]
    fn test_fixed_amount_never_exceeds_subtotal() {
        let code = rules(DiscountType::FixedAmount, 500);
        let outcome = code.apply(Decimal::from(300), Decimal::from(50));
        assert_eq!(outcome.discount_amount, Decimal::from(300));
        assert_eq!(outcome.total(Decimal::from(300)), Decimal::from(50));
    }

    #[test]
    fn test_free_shipping_waives_shipping() {
        let code = rules(DiscountType::FreeShipping, 0);
        let outcome = code.apply(Decimal::from(999), Decimal::from(60));
        assert_eq!(outcome.discount_amount, Decimal::ZERO);
        assert_eq!(outcome.shipping_fee, Decimal::ZERO);
        assert_eq!(outcome.total(Decimal::from(999)), Decimal::from(999));
    }

    #[test]
    fn test_check_definition() {
        assert!(rules(DiscountType::Percentage, 100).check_definition().is_ok());
        assert!(rules(DiscountType::Percentage, 101).check_definition().is_err());
        assert!(rules(DiscountType::FixedAmount, -1).check_definition().is_err());

        let mut huge = rules(DiscountType::FixedAmount, 10);
        huge.value = MAX_STORED_AMOUNT;
        assert!(huge.check_definition().is_ok());
        huge.value += Decimal::new(1, 2);
        assert!(huge.check_definition().is_err());

        let mut code = rules(DiscountType::FixedAmount, 10);
        code.usage_limit = Some(0);
        assert!(code.check_definition().is_err());

        code.usage_limit = Some(10);
        code.starts_at = Some(now());
        code.expires_at = Some(now() - Duration::days(1));
        assert!(code.check_definition().is_err());
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("  diwali-10 ").unwrap(), "DIWALI-10");
        assert!(normalize_code("").is_err());
        assert!(normalize_code("two words").is_err());
        assert!(normalize_code(&"X".repeat(MAX_CODE_LEN + 1)).is_err());
    }
}
