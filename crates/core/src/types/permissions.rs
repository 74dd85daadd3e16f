//! Store manager permission set.

use serde::{Deserialize, Serialize};

/// Current schema version of [`ManagerPermissions`].
///
/// Bump when a flag is added and give the new field a `#[serde(default)]`, so
/// rows written under the previous version still deserialize (with the new
/// permission off).
pub const PERMISSIONS_VERSION: u16 = 1;

/// Named permissions an owner grants to a store manager.
///
/// Stored as JSONB on the manager row. Unknown keys are rejected so a typo in
/// a request cannot silently grant nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ManagerPermissions {
    #[serde(default = "current_version")]
    pub version: u16,
    #[serde(default)]
    pub manage_products: bool,
    #[serde(default)]
    pub manage_orders: bool,
    #[serde(default)]
    pub manage_categories: bool,
    #[serde(default)]
    pub manage_discounts: bool,
    #[serde(default)]
    pub view_analytics: bool,
}

const fn current_version() -> u16 {
    PERMISSIONS_VERSION
}

impl Default for ManagerPermissions {
    fn default() -> Self {
        Self::none()
    }
}

impl ManagerPermissions {
    /// No permissions.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            version: PERMISSIONS_VERSION,
            manage_products: false,
            manage_orders: false,
            manage_categories: false,
            manage_discounts: false,
            view_analytics: false,
        }
    }

    /// Every permission.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            version: PERMISSIONS_VERSION,
            manage_products: true,
            manage_orders: true,
            manage_categories: true,
            manage_discounts: true,
            view_analytics: true,
        }
    }

    /// Logical AND of every flag with `enabled`.
    #[must_use]
    pub const fn gated(self, enabled: bool) -> Self {
        Self {
            version: self.version,
            manage_products: self.manage_products && enabled,
            manage_orders: self.manage_orders && enabled,
            manage_categories: self.manage_categories && enabled,
            manage_discounts: self.manage_discounts && enabled,
            view_analytics: self.view_analytics && enabled,
        }
    }

    /// Whether any flag is set.
    #[must_use]
    pub const fn any(&self) -> bool {
        self.manage_products
            || self.manage_orders
            || self.manage_categories
            || self.manage_discounts
            || self.view_analytics
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_flags_default_to_false() {
        let perms: ManagerPermissions =
            serde_json::from_str(r#"{"manageProducts": true}"#).unwrap();
        assert!(perms.manage_products);
        assert!(!perms.manage_orders);
        assert_eq!(perms.version, PERMISSIONS_VERSION);
    }

    #[test]
    fn test_unknown_flag_is_rejected() {
        let result = serde_json::from_str::<ManagerPermissions>(r#"{"manageEverything": true}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_gated_clears_everything_when_disabled() {
        let perms = ManagerPermissions::all().gated(false);
        assert!(!perms.any());
        assert_eq!(ManagerPermissions::all().gated(true), ManagerPermissions::all());
    }
}
