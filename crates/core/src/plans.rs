//! Subscription plan catalog.
//!
//! The catalog is a static table keyed by the closed [`PlanTier`] enum. Prices,
//! caps, the commission schedule and the Razorpay plan identifiers all live
//! here; every other module reads them through [`PlanTier::definition`].

use core::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Limit;

/// Days of free trial granted at registration.
pub const DEFAULT_TRIAL_DAYS: i64 = 14;

/// A subscription tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "subscription_plan", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PlanTier {
    #[default]
    Free,
    Basic,
    Pro,
    Premium,
    Lifetime,
}

/// How a plan is paid for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Billing {
    /// No payment step.
    Free,
    /// Monthly Razorpay subscription.
    Recurring,
    /// Single Razorpay order, never renews.
    OneTime,
}

/// One row of the plan catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanDefinition {
    pub id: PlanTier,
    pub name: &'static str,
    /// Monthly price in whole rupees (the one-time price for `lifetime`).
    pub price_inr: u32,
    pub billing: Billing,
    pub max_products: Limit,
    pub max_stores: Limit,
    /// Marketing feature list, in display order.
    pub features: &'static [&'static str],
    /// Razorpay plan used when creating a recurring subscription.
    pub razorpay_plan_id: Option<&'static str>,
    /// Platform commission on each order, in basis points.
    pub fee_rate_bps: u32,
}

static FREE: PlanDefinition = PlanDefinition {
    id: PlanTier::Free,
    name: "Free",
    price_inr: 0,
    billing: Billing::Free,
    max_products: Limit::Max(10),
    max_stores: Limit::Max(1),
    features: &["1 store", "Up to 10 products", "BizShop subdomain"],
    razorpay_plan_id: None,
    fee_rate_bps: 500,
};

static BASIC: PlanDefinition = PlanDefinition {
    id: PlanTier::Basic,
    name: "Basic",
    price_inr: 299,
    billing: Billing::Recurring,
    max_products: Limit::Max(100),
    max_stores: Limit::Max(1),
    features: &["1 store", "Up to 100 products", "Discount codes"],
    razorpay_plan_id: Some("plan_bizshop_basic_monthly"),
    fee_rate_bps: 300,
};

static PRO: PlanDefinition = PlanDefinition {
    id: PlanTier::Pro,
    name: "Pro",
    price_inr: 799,
    billing: Billing::Recurring,
    max_products: Limit::Max(500),
    max_stores: Limit::Max(3),
    features: &[
        "3 stores",
        "Up to 500 products",
        "Custom domain",
        "Remove BizShop branding",
        "Priority support",
    ],
    razorpay_plan_id: Some("plan_bizshop_pro_monthly"),
    fee_rate_bps: 100,
};

static PREMIUM: PlanDefinition = PlanDefinition {
    id: PlanTier::Premium,
    name: "Premium",
    price_inr: 1499,
    billing: Billing::Recurring,
    max_products: Limit::Unlimited,
    max_stores: Limit::Max(5),
    features: &[
        "5 stores",
        "Unlimited products",
        "Custom domain",
        "Remove BizShop branding",
        "AI product content",
        "Advanced analytics",
        "Up to 3 store managers",
        "Priority support",
        "Zero transaction fees",
    ],
    razorpay_plan_id: Some("plan_bizshop_premium_monthly"),
    fee_rate_bps: 0,
};

static LIFETIME: PlanDefinition = PlanDefinition {
    id: PlanTier::Lifetime,
    name: "Lifetime",
    price_inr: 9999,
    billing: Billing::OneTime,
    max_products: Limit::Unlimited,
    max_stores: Limit::Max(10),
    features: &[
        "10 stores",
        "Unlimited products",
        "Every Premium feature",
        "One-time payment",
        "Zero transaction fees",
    ],
    razorpay_plan_id: None,
    fee_rate_bps: 0,
};

/// Tiers in ascending price order.
pub const ALL_TIERS: [PlanTier; 5] = [
    PlanTier::Free,
    PlanTier::Basic,
    PlanTier::Pro,
    PlanTier::Premium,
    PlanTier::Lifetime,
];

/// Catalog lookup failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// No plan with this id exists.
    #[error("unknown plan: {0}")]
    UnknownPlan(String),
}

impl PlanTier {
    /// The catalog row for this tier.
    #[must_use]
    pub fn definition(self) -> &'static PlanDefinition {
        match self {
            Self::Free => &FREE,
            Self::Basic => &BASIC,
            Self::Pro => &PRO,
            Self::Premium => &PREMIUM,
            Self::Lifetime => &LIFETIME,
        }
    }

    /// Returns the wire/database label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Basic => "basic",
            Self::Pro => "pro",
            Self::Premium => "premium",
            Self::Lifetime => "lifetime",
        }
    }

    /// Whether activating this tier requires a payment.
    #[must_use]
    pub fn is_paid(self) -> bool {
        self.definition().billing != Billing::Free
    }
}

impl fmt::Display for PlanTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanTier {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_TIERS
            .into_iter()
            .find(|tier| tier.as_str() == s)
            .ok_or_else(|| CatalogError::UnknownPlan(s.to_owned()))
    }
}

impl PlanDefinition {
    /// Price as a decimal rupee amount.
    #[must_use]
    pub fn price(&self) -> Decimal {
        Decimal::from(self.price_inr)
    }

    /// Commission rate as a fraction (`0.05` for 500 bps).
    #[must_use]
    pub fn fee_rate(&self) -> Decimal {
        Decimal::new(i64::from(self.fee_rate_bps), 4)
    }
}

/// Look up a plan by its id.
///
/// # Errors
///
/// Returns [`CatalogError::UnknownPlan`]; callers must reject the operation
/// rather than fall back to a default tier.
pub fn lookup(id: &str) -> Result<&'static PlanDefinition, CatalogError> {
    id.parse::<PlanTier>().map(PlanTier::definition)
}

/// Look up a plan by the Razorpay plan id it is billed under.
///
/// # Errors
///
/// Returns [`CatalogError::UnknownPlan`] if no tier uses this Razorpay plan.
pub fn lookup_by_razorpay_plan(razorpay_plan_id: &str) -> Result<&'static PlanDefinition, CatalogError> {
    all()
        .find(|plan| plan.razorpay_plan_id == Some(razorpay_plan_id))
        .ok_or_else(|| CatalogError::UnknownPlan(razorpay_plan_id.to_owned()))
}

/// Every catalog row in ascending price order.
pub fn all() -> impl Iterator<Item = &'static PlanDefinition> {
    ALL_TIERS.into_iter().map(PlanTier::definition)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_and_unknown() {
        assert_eq!(lookup("premium").unwrap().id, PlanTier::Premium);
        assert_eq!(
            lookup("enterprise"),
            Err(CatalogError::UnknownPlan("enterprise".to_owned()))
        );
        // ids are exact, not case-folded
        assert!(lookup("Premium").is_err());
    }

    #[test]
    fn test_definitions_are_keyed_by_their_own_tier() {
        for tier in ALL_TIERS {
            assert_eq!(tier.definition().id, tier);
            assert_eq!(tier.as_str().parse::<PlanTier>().unwrap(), tier);
        }
    }

    #[test]
    fn test_only_recurring_tiers_have_razorpay_plans() {
        for plan in all() {
            assert_eq!(
                plan.razorpay_plan_id.is_some(),
                plan.billing == Billing::Recurring,
                "{}",
                plan.name
            );
        }
        assert_eq!(
            lookup_by_razorpay_plan("plan_bizshop_pro_monthly").unwrap().id,
            PlanTier::Pro
        );
        assert!(lookup_by_razorpay_plan("plan_unknown").is_err());
    }

    #[test]
    fn test_free_carries_the_highest_fee() {
        let free = PlanTier::Free.definition().fee_rate_bps;
        assert!(all().all(|plan| plan.fee_rate_bps <= free));
        assert_eq!(PlanTier::Free.definition().fee_rate(), Decimal::new(5, 2));
    }

    #[test]
    fn test_is_paid() {
        assert!(!PlanTier::Free.is_paid());
        assert!(PlanTier::Basic.is_paid());
        assert!(PlanTier::Lifetime.is_paid());
    }

    #[test]
    fn test_serializes_unlimited_as_sentinel() {
        let json = serde_json::to_value(PlanTier::Premium.definition()).unwrap();
        assert_eq!(json["maxProducts"], -1);
        assert_eq!(json["id"], "premium");
        assert_eq!(json["razorpayPlanId"], "plan_bizshop_premium_monthly");
    }
}
