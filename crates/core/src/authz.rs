//! Store and platform authorization.
//!
//! Access is resolved from fresh rows on every request. Nothing here caches;
//! a plan downgrade of the owner or a revoked manager grant takes effect on
//! the caller's next request.

use core::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::entitlements::{Feature, has_feature_access};
use crate::plans::PlanTier;
use crate::types::{ManagerPermissions, ManagerStatus, Role, StoreId, UserId};

/// The authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub role: Role,
}

/// The store being acted on, with its owner's current plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreContext {
    pub store_id: StoreId,
    pub owner_id: UserId,
    pub owner_plan: PlanTier,
}

/// A manager row linking the caller to the store, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagerGrant {
    pub permissions: ManagerPermissions,
    pub status: ManagerStatus,
}

/// Manager permissions after plan gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EffectivePermissions(ManagerPermissions);

impl EffectivePermissions {
    /// Stored flags AND the owner's `storeManagers` entitlement.
    #[must_use]
    pub const fn new(stored: ManagerPermissions, owner_plan: PlanTier) -> Self {
        Self(stored.gated(has_feature_access(owner_plan, Feature::StoreManagers)))
    }

    #[must_use]
    pub const fn permissions(&self) -> ManagerPermissions {
        self.0
    }

    const fn allows(&self, action: StoreAction) -> bool {
        let p = &self.0;
        match action {
            StoreAction::View => p.any(),
            StoreAction::ManageProducts => p.manage_products,
            StoreAction::ManageOrders => p.manage_orders,
            StoreAction::ManageCategories => p.manage_categories,
            StoreAction::ManageDiscounts => p.manage_discounts,
            StoreAction::ViewAnalytics => p.view_analytics,
            StoreAction::UpdateSettings
            | StoreAction::ManageDomain
            | StoreAction::Publish
            | StoreAction::ManageManagers
            | StoreAction::Delete => false,
        }
    }
}

/// How the caller relates to a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Owner,
    Admin,
    Manager(EffectivePermissions),
    Unauthorized,
}

/// Something a caller wants to do to a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreAction {
    View,
    ManageProducts,
    ManageOrders,
    ManageCategories,
    ManageDiscounts,
    ViewAnalytics,
    UpdateSettings,
    ManageDomain,
    Publish,
    ManageManagers,
    Delete,
}

impl StoreAction {
    /// Actions no manager may perform, whatever their permissions.
    #[must_use]
    pub const fn is_owner_only(self) -> bool {
        matches!(
            self,
            Self::UpdateSettings | Self::ManageDomain | Self::Publish | Self::ManageManagers | Self::Delete
        )
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::View => "view",
            Self::ManageProducts => "manage_products",
            Self::ManageOrders => "manage_orders",
            Self::ManageCategories => "manage_categories",
            Self::ManageDiscounts => "manage_discounts",
            Self::ViewAnalytics => "view_analytics",
            Self::UpdateSettings => "update_settings",
            Self::ManageDomain => "manage_domain",
            Self::Publish => "publish",
            Self::ManageManagers => "manage_managers",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for StoreAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operations outside any single store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformAction {
    /// Platform-wide counts and revenue.
    ViewStatistics,
    /// List and delete user accounts.
    ManageUsers,
    /// Pause, resume or cancel another user's subscription.
    ManageSubscriptions,
}

/// Authorization failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthzError {
    /// The caller has no relation to the store. Reported as "not found".
    #[error("store not found")]
    NoAccess,
    /// A manager attempted an owner-only action.
    #[error("only the store owner may {0}")]
    OwnerOnly(StoreAction),
    /// A manager lacks the permission for this action.
    #[error("missing permission: {0}")]
    MissingPermission(StoreAction),
    #[error("administrator role required")]
    AdminRequired,
    #[error("super administrator role required")]
    SuperAdminRequired,
}

/// Work out how `principal` relates to `store`.
///
/// Owner wins over admin, admin over manager. Only accepted grants count.
#[must_use]
pub fn resolve_access(
    principal: Principal,
    store: StoreContext,
    grant: Option<ManagerGrant>,
) -> Access {
    if principal.user_id == store.owner_id {
        return Access::Owner;
    }
    if principal.role.is_admin() {
        return Access::Admin;
    }
    match grant {
        Some(ManagerGrant {
            permissions,
            status: ManagerStatus::Accepted,
        }) => Access::Manager(EffectivePermissions::new(permissions, store.owner_plan)),
        _ => Access::Unauthorized,
    }
}

/// Check that `access` permits `action`.
///
/// # Errors
///
/// [`AuthzError::NoAccess`] for unrelated callers, [`AuthzError::OwnerOnly`]
/// or [`AuthzError::MissingPermission`] for managers.
pub fn authorize(access: Access, action: StoreAction) -> Result<Access, AuthzError> {
    match access {
        Access::Owner | Access::Admin => Ok(access),
        Access::Unauthorized => Err(AuthzError::NoAccess),
        Access::Manager(effective) => {
            if action.is_owner_only() {
                Err(AuthzError::OwnerOnly(action))
            } else if effective.allows(action) {
                Ok(access)
            } else if action == StoreAction::View {
                // a manager left with no usable permission is a stranger
                Err(AuthzError::NoAccess)
            } else {
                Err(AuthzError::MissingPermission(action))
            }
        }
    }
}

/// Check a platform-wide operation.
///
/// # Errors
///
/// Statistics and user management need [`Role::SuperAdmin`]; subscription
/// support actions need any admin role.
pub const fn authorize_platform(role: Role, action: PlatformAction) -> Result<(), AuthzError> {
    match (action, role) {
        (PlatformAction::ViewStatistics | PlatformAction::ManageUsers, Role::SuperAdmin)
        | (PlatformAction::ManageSubscriptions, Role::Admin | Role::SuperAdmin) => Ok(()),
        (PlatformAction::ViewStatistics | PlatformAction::ManageUsers, _) => {
            Err(AuthzError::SuperAdminRequired)
        }
        (PlatformAction::ManageSubscriptions, Role::User) => Err(AuthzError::AdminRequired),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const OWNER: UserId = UserId::new(1);
    const OTHER: UserId = UserId::new(2);

    fn store(plan: PlanTier) -> StoreContext {
        StoreContext {
            store_id: StoreId::new(10),
            owner_id: OWNER,
            owner_plan: plan,
        }
    }

    fn principal(user_id: UserId, role: Role) -> Principal {
        Principal { user_id, role }
    }

    fn grant(status: ManagerStatus) -> Option<ManagerGrant> {
        Some(ManagerGrant {
            permissions: ManagerPermissions {
                manage_products: true,
                ..ManagerPermissions::none()
            },
            status,
        })
    }

    #[test]
    fn test_owner_can_do_everything() {
        let access = resolve_access(principal(OWNER, Role::User), store(PlanTier::Free), None);
        assert_eq!(access, Access::Owner);
        assert!(authorize(access, StoreAction::Delete).is_ok());
        assert!(authorize(access, StoreAction::ManageManagers).is_ok());
    }

    #[test]
    fn test_admin_sees_any_store() {
        let access = resolve_access(principal(OTHER, Role::Admin), store(PlanTier::Free), None);
        assert_eq!(access, Access::Admin);
        assert!(authorize(access, StoreAction::ManageOrders).is_ok());
    }

    #[test]
    fn test_stranger_gets_no_access() {
        let access = resolve_access(principal(OTHER, Role::User), store(PlanTier::Premium), None);
        assert_eq!(access, Access::Unauthorized);
        assert_eq!(authorize(access, StoreAction::View), Err(AuthzError::NoAccess));
    }

    #[test]
    fn test_pending_and_declined_grants_do_not_count() {
        for status in [ManagerStatus::Pending, ManagerStatus::Declined] {
            let access = resolve_access(
                principal(OTHER, Role::User),
                store(PlanTier::Premium),
                grant(status),
            );
            assert_eq!(access, Access::Unauthorized);
        }
    }

    #[test]
    fn test_accepted_manager_uses_granted_permissions() {
        let access = resolve_access(
            principal(OTHER, Role::User),
            store(PlanTier::Premium),
            grant(ManagerStatus::Accepted),
        );
        assert!(authorize(access, StoreAction::View).is_ok());
        assert!(authorize(access, StoreAction::ManageProducts).is_ok());
        assert_eq!(
            authorize(access, StoreAction::ManageOrders),
            Err(AuthzError::MissingPermission(StoreAction::ManageOrders))
        );
    }

    #[test]
    fn test_manager_never_gets_owner_only_actions() {
        let access = Access::Manager(EffectivePermissions::new(
            ManagerPermissions::all(),
            PlanTier::Premium,
        ));
        for action in [
            StoreAction::UpdateSettings,
            StoreAction::ManageDomain,
            StoreAction::Publish,
            StoreAction::ManageManagers,
            StoreAction::Delete,
        ] {
            assert_eq!(authorize(access, action), Err(AuthzError::OwnerOnly(action)));
        }
    }

    #[test]
    fn test_owner_downgrade_disables_managers() {
        let access = resolve_access(
            principal(OTHER, Role::User),
            store(PlanTier::Basic),
            grant(ManagerStatus::Accepted),
        );
        let Access::Manager(effective) = access else {
            panic!("expected manager access, got {access:?}");
        };
        assert!(!effective.permissions().any());
        assert_eq!(authorize(access, StoreAction::View), Err(AuthzError::NoAccess));
        assert!(authorize(access, StoreAction::ManageProducts).is_err());
    }

    #[test]
    fn test_platform_actions() {
        assert!(authorize_platform(Role::SuperAdmin, PlatformAction::ViewStatistics).is_ok());
        assert_eq!(
            authorize_platform(Role::Admin, PlatformAction::ViewStatistics),
            Err(AuthzError::SuperAdminRequired)
        );
        assert_eq!(
            authorize_platform(Role::User, PlatformAction::ManageUsers),
            Err(AuthzError::SuperAdminRequired)
        );
        assert!(authorize_platform(Role::Admin, PlatformAction::ManageSubscriptions).is_ok());
        assert_eq!(
            authorize_platform(Role::User, PlatformAction::ManageSubscriptions),
            Err(AuthzError::AdminRequired)
        );
    }
}
