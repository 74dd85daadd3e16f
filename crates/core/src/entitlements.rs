//! Plan-derived capabilities.
//!
//! Capabilities depend on nothing but the plan tier. They are recomputed on
//! every gated action, so a plan change is visible on the very next request.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::plans::PlanTier;
use crate::types::Limit;

/// A boolean capability that can be gated by plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Feature {
    CustomDomain,
    RemoveBranding,
    AiContent,
    PrioritySupport,
    AdvancedAnalytics,
    StoreManagers,
}

/// The feature name is not one of [`Feature`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown feature: {0}")]
pub struct UnknownFeature(pub String);

impl Feature {
    /// Every gated feature.
    pub const ALL: [Self; 6] = [
        Self::CustomDomain,
        Self::RemoveBranding,
        Self::AiContent,
        Self::PrioritySupport,
        Self::AdvancedAnalytics,
        Self::StoreManagers,
    ];

    /// The camelCase name used by clients.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CustomDomain => "customDomain",
            Self::RemoveBranding => "removeBranding",
            Self::AiContent => "aiContent",
            Self::PrioritySupport => "prioritySupport",
            Self::AdvancedAnalytics => "advancedAnalytics",
            Self::StoreManagers => "storeManagers",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Feature {
    type Err = UnknownFeature;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|feature| feature.as_str() == s)
            .ok_or_else(|| UnknownFeature(s.to_owned()))
    }
}

/// Everything a plan unlocks beyond product/store caps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    pub custom_domain: bool,
    pub remove_branding: bool,
    pub ai_content: bool,
    pub priority_support: bool,
    pub advanced_analytics: bool,
    pub store_managers: bool,
    pub max_managers: u32,
}

impl Capabilities {
    /// Project a single feature flag.
    #[must_use]
    pub const fn allows(&self, feature: Feature) -> bool {
        match feature {
            Feature::CustomDomain => self.custom_domain,
            Feature::RemoveBranding => self.remove_branding,
            Feature::AiContent => self.ai_content,
            Feature::PrioritySupport => self.priority_support,
            Feature::AdvancedAnalytics => self.advanced_analytics,
            Feature::StoreManagers => self.store_managers,
        }
    }

    /// Manager cap as a [`Limit`].
    #[must_use]
    pub const fn manager_limit(&self) -> Limit {
        Limit::Max(self.max_managers)
    }
}

/// Resolve the capability set of a plan.
#[must_use]
pub const fn capabilities_for(plan: PlanTier) -> Capabilities {
    let branded_tier = matches!(plan, PlanTier::Pro | PlanTier::Premium | PlanTier::Lifetime);
    let top_tier = matches!(plan, PlanTier::Premium | PlanTier::Lifetime);

    Capabilities {
        custom_domain: branded_tier,
        remove_branding: branded_tier,
        ai_content: top_tier,
        priority_support: branded_tier,
        advanced_analytics: top_tier,
        store_managers: top_tier,
        max_managers: if top_tier { 3 } else { 0 },
    }
}

/// Whether `plan` includes `feature`.
#[must_use]
pub const fn has_feature_access(plan: PlanTier, feature: Feature) -> bool {
    capabilities_for(plan).allows(feature)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::plans::ALL_TIERS;

    #[test]
    fn test_free_and_basic_get_nothing() {
        for plan in [PlanTier::Free, PlanTier::Basic] {
            let caps = capabilities_for(plan);
            assert!(Feature::ALL.into_iter().all(|f| !caps.allows(f)), "{plan}");
            assert_eq!(caps.max_managers, 0);
        }
    }

    #[test]
    fn test_pro_gets_branding_tier_only() {
        let caps = capabilities_for(PlanTier::Pro);
        assert!(caps.custom_domain);
        assert!(caps.remove_branding);
        assert!(caps.priority_support);
        assert!(!caps.ai_content);
        assert!(!caps.advanced_analytics);
        assert!(!caps.store_managers);
        assert_eq!(caps.max_managers, 0);
    }

    #[test]
    fn test_premium_and_lifetime_get_everything() {
        for plan in [PlanTier::Premium, PlanTier::Lifetime] {
            let caps = capabilities_for(plan);
            assert!(Feature::ALL.into_iter().all(|f| caps.allows(f)), "{plan}");
            assert_eq!(caps.max_managers, 3);
        }
    }

    #[test]
    fn test_feature_access_is_pure() {
        for plan in ALL_TIERS {
            for feature in Feature::ALL {
                let first = has_feature_access(plan, feature);
                // interleave another lookup to rule out hidden state
                let _ = has_feature_access(PlanTier::Premium, Feature::AiContent);
                assert_eq!(first, has_feature_access(plan, feature));
            }
        }
    }

    #[test]
    fn test_basic_to_premium_unlocks_ai_content() {
        assert!(!has_feature_access(PlanTier::Basic, Feature::AiContent));
        assert!(has_feature_access(PlanTier::Premium, Feature::AiContent));
    }

    #[test]
    fn test_feature_names_parse() {
        assert_eq!("aiContent".parse::<Feature>().unwrap(), Feature::AiContent);
        assert_eq!(
            "ai_content".parse::<Feature>(),
            Err(UnknownFeature("ai_content".to_owned()))
        );
        for feature in Feature::ALL {
            assert_eq!(feature.as_str().parse::<Feature>().unwrap(), feature);
        }
    }

    #[test]
    fn test_capabilities_serialize_camel_case() {
        let json = serde_json::to_value(capabilities_for(PlanTier::Premium)).unwrap();
        assert_eq!(json["aiContent"], true);
        assert_eq!(json["maxManagers"], 3);
    }
}
