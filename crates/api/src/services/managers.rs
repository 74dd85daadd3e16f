//! Store manager invitations.
//!
//! Only owners of stores on a plan with `storeManagers` may invite, and a
//! store holds at most `maxManagers` manager rows in any status. The store
//! row is locked while the rows are counted.

use sqlx::PgPool;

use bizshop_core::entitlements::{Feature, capabilities_for};
use bizshop_core::{
    Email, LimitKind, ManagerPermissions, ManagerStatus, PlanTier, StoreManagerId, UserId,
};

use crate::db::{ManagerRepository, UserRepository, managers, stores};
use crate::error::AppError;
use crate::models::{Invitation, OwnedStore, StoreManager};

pub struct ManagerService<'a> {
    pool: &'a PgPool,
}

impl<'a> ManagerService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Invite an existing user to manage `store`.
    ///
    /// # Errors
    ///
    /// `AppError::Entitlement` when the owner's plan lacks store managers or
    /// the cap is reached, `AppError::NotFound` when no account has the
    /// email, `AppError::BadRequest` when inviting the owner.
    #[tracing::instrument(skip(self, store, email, permissions), fields(store_id = %store.store.id))]
    pub async fn invite(
        &self,
        store: &OwnedStore,
        invited_by: UserId,
        email: &str,
        permissions: ManagerPermissions,
    ) -> Result<StoreManager, AppError> {
        check_capacity(store.owner_plan, 0)?;

        let email = Email::parse(email)
            .map_err(|_| AppError::BadRequest("invalid email address".to_string()))?;
        let invitee = UserRepository::new(self.pool)
            .get_by_email(&email)
            .await?
            .ok_or_else(|| AppError::NotFound("no BizShop account with this email".to_string()))?;
        if invitee.id == store.store.user_id {
            return Err(AppError::BadRequest(
                "the store owner cannot be invited as a manager".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;
        stores::lock(&mut tx, store.store.id).await?;
        let existing = managers::count_for_store(&mut tx, store.store.id).await?;
        check_capacity(store.owner_plan, existing)?;
        let manager =
            managers::insert(&mut tx, store.store.id, invitee.id, permissions, invited_by).await?;
        tx.commit().await?;

        tracing::info!(manager_id = %manager.id, user_id = %invitee.id, "Manager invited");
        Ok(manager)
    }

    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn pending_for(&self, user_id: UserId) -> Result<Vec<Invitation>, AppError> {
        Ok(ManagerRepository::new(self.pool)
            .pending_for_user(user_id)
            .await?)
    }

    /// Accept or decline an invitation addressed to `user_id`.
    ///
    /// # Errors
    ///
    /// `AppError::NotFound` unless a pending invitation with this id is
    /// addressed to the caller.
    pub async fn respond(
        &self,
        id: StoreManagerId,
        user_id: UserId,
        accept: bool,
    ) -> Result<StoreManager, AppError> {
        let status = if accept {
            ManagerStatus::Accepted
        } else {
            ManagerStatus::Declined
        };
        let manager = ManagerRepository::new(self.pool)
            .respond(id, user_id, status)
            .await
            .map_err(|e| match e {
                crate::db::RepositoryError::NotFound => {
                    AppError::NotFound("invitation not found".to_string())
                }
                other => other.into(),
            })?;
        tracing::info!(manager_id = %manager.id, status = ?manager.status, "Invitation answered");
        Ok(manager)
    }
}

/// Whether a store owned on `owner_plan` may add another manager to
/// `existing` ones.
fn check_capacity(owner_plan: PlanTier, existing: u64) -> Result<(), AppError> {
    let capabilities = capabilities_for(owner_plan);
    if !capabilities.allows(Feature::StoreManagers) {
        return Err(AppError::upgrade_required(
            "store managers require the Premium or Lifetime plan",
        ));
    }
    capabilities
        .manager_limit()
        .check(existing, LimitKind::Managers)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_fourth_manager_is_rejected() {
        for plan in [PlanTier::Premium, PlanTier::Lifetime] {
            for existing in 0..3 {
                assert!(check_capacity(plan, existing).is_ok(), "{plan} with {existing}");
            }
            assert!(matches!(
                check_capacity(plan, 3),
                Err(AppError::Entitlement { code: "upgrade_required", .. })
            ));
        }
    }

    #[test]
    fn test_plans_without_store_managers_cannot_invite() {
        for plan in [PlanTier::Free, PlanTier::Basic, PlanTier::Pro] {
            assert!(matches!(
                check_capacity(plan, 0),
                Err(AppError::Entitlement { code: "upgrade_required", reason })
                    if reason.contains("Premium")
            ));
        }
    }
}
