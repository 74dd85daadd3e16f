//! Store access checks.
//!
//! Resolves how the caller relates to a store from fresh rows on every call
//! and applies the authorization guard. Callers with no relation to the store
//! get the same "not found" as for a store that does not exist.

use sqlx::PgPool;

use bizshop_core::StoreId;
use bizshop_core::authz::{Access, StoreAction, authorize, resolve_access};

use crate::db::{ManagerRepository, StoreRepository};
use crate::error::AppError;
use crate::models::{OwnedStore, User};

/// A store the caller has been cleared to act on.
#[derive(Debug, Clone)]
pub struct StoreAccess {
    pub store: OwnedStore,
    pub access: Access,
}

/// Load `store_id` and check `user` may perform `action` on it.
///
/// # Errors
///
/// `AppError::NotFound` for a missing store or a caller with no access,
/// `AppError::Forbidden` for a manager without the needed permission.
#[tracing::instrument(skip(pool, user), fields(user_id = %user.id))]
pub async fn authorize_store(
    pool: &PgPool,
    user: &User,
    store_id: StoreId,
    action: StoreAction,
) -> Result<StoreAccess, AppError> {
    let store = StoreRepository::new(pool)
        .get(store_id)
        .await?
        .ok_or_else(|| AppError::NotFound("store not found".to_string()))?;

    let principal = user.principal();
    let grant = if principal.user_id == store.store.user_id || principal.role.is_admin() {
        None
    } else {
        ManagerRepository::new(pool)
            .find(store_id, user.id)
            .await?
            .map(|manager| manager.grant())
    };

    let access = resolve_access(principal, store.context(), grant);
    let access = authorize(access, action).inspect_err(|e| {
        tracing::debug!(target: "security", error = %e, action = %action, "Store access denied");
    })?;

    Ok(StoreAccess { store, access })
}
