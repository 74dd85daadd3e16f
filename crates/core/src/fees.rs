//! Platform commission on orders.
//!
//! `transactionFee = round(total × rate(plan))` and
//! `merchantPayout = total − transactionFee`, so the two always add back up to
//! the order total exactly. Rates come from [`PlanDefinition::fee_rate`].
//!
//! [`PlanDefinition::fee_rate`]: crate::plans::PlanDefinition::fee_rate

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::plans::PlanTier;
use crate::types::Price;

/// Commission split of one order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeSplit {
    /// Platform commission.
    pub transaction_fee: Decimal,
    /// What the store owner receives.
    pub merchant_payout: Decimal,
}

/// Fee calculation input errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FeeError {
    /// Orders must have a positive total.
    #[error("order total must be positive, got {0}")]
    NonPositiveTotal(Decimal),
}

/// Compute the commission split for an order placed with a seller on `plan`.
///
/// # Errors
///
/// Returns [`FeeError::NonPositiveTotal`] when `total` is zero or negative.
pub fn calculate(total: Price, plan: PlanTier) -> Result<FeeSplit, FeeError> {
    if !total.is_positive() {
        return Err(FeeError::NonPositiveTotal(total.amount));
    }

    let rate = plan.definition().fee_rate();
    let transaction_fee = total.round(total.amount * rate);

    Ok(FeeSplit {
        transaction_fee,
        merchant_payout: total.amount - transaction_fee,
    })
}

/// Like [`calculate`], but takes a raw plan id.
///
/// An unrecognised id is charged at the free tier rate instead of failing the
/// order. The returned flag is `true` when that fallback was used.
///
/// # Errors
///
/// Returns [`FeeError::NonPositiveTotal`] when `total` is zero or negative.
pub fn calculate_for_plan_id(total: Price, plan_id: &str) -> Result<(FeeSplit, bool), FeeError> {
    match plan_id.parse::<PlanTier>() {
        Ok(plan) => calculate(total, plan).map(|split| (split, false)),
        Err(_) => calculate(total, PlanTier::Free).map(|split| (split, true)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::plans::ALL_TIERS;

    fn inr(amount: i64, scale: u32) -> Price {
        Price::inr(Decimal::new(amount, scale))
    }

    #[test]
    fn test_free_plan_example() {
        let split = calculate(inr(1000, 0), PlanTier::Free).unwrap();
        assert_eq!(split.transaction_fee, Decimal::new(5000, 2));
        assert_eq!(split.merchant_payout, Decimal::new(95000, 2));
    }

    #[test]
    fn test_premium_plan_example() {
        let split = calculate(inr(1000, 0), PlanTier::Premium).unwrap();
        assert_eq!(split.transaction_fee, Decimal::ZERO);
        assert_eq!(split.merchant_payout, Decimal::new(1000, 0));
    }

    #[test]
    fn test_fee_is_rounded_to_paise() {
        // 3% of 333.33 = 9.9999
        let split = calculate(inr(33333, 2), PlanTier::Basic).unwrap();
        assert_eq!(split.transaction_fee, Decimal::new(1000, 2));
        assert_eq!(split.merchant_payout, Decimal::new(32333, 2));
    }

    #[test]
    fn test_fee_and_payout_sum_to_total() {
        let totals = [1, 99, 101, 12_345, 99_999, 1_000_001, 7];
        for cents in totals {
            let total = inr(cents, 2);
            for plan in ALL_TIERS {
                let split = calculate(total, plan).unwrap();
                assert_eq!(split.transaction_fee + split.merchant_payout, total.amount);
                assert!(split.transaction_fee >= Decimal::ZERO);
            }
        }
    }

    #[test]
    fn test_free_fee_is_never_lower_than_paid() {
        for cents in [1, 250, 99_999, 5_000_000] {
            let total = inr(cents, 2);
            let free = calculate(total, PlanTier::Free).unwrap().transaction_fee;
            for plan in ALL_TIERS {
                assert!(free >= calculate(total, plan).unwrap().transaction_fee);
            }
        }
    }

    #[test]
    fn test_non_positive_total_is_rejected() {
        assert_eq!(
            calculate(inr(0, 0), PlanTier::Free),
            Err(FeeError::NonPositiveTotal(Decimal::ZERO))
        );
        assert!(calculate(inr(-500, 2), PlanTier::Premium).is_err());
    }

    #[test]
    fn test_unknown_plan_id_falls_back_to_free_rate() {
        let (split, fell_back) = calculate_for_plan_id(inr(200, 0), "gold").unwrap();
        assert!(fell_back);
        assert_eq!(split.transaction_fee, Decimal::new(1000, 2));

        let (split, fell_back) = calculate_for_plan_id(inr(200, 0), "pro").unwrap();
        assert!(!fell_back);
        assert_eq!(split.transaction_fee, Decimal::new(200, 2));
    }

    #[test]
    fn test_unknown_plan_id_still_rejects_bad_total() {
        assert!(calculate_for_plan_id(inr(0, 0), "gold").is_err());
    }

    #[test]
    fn test_split_serializes_with_wire_names() {
        let split = calculate(inr(1000, 0), PlanTier::Free).unwrap();
        let json = serde_json::to_value(split).unwrap();
        assert_eq!(json["transactionFee"], "50.00");
        assert_eq!(json["merchantPayout"], "950.00");
    }
}
