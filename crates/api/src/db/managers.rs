//! Store manager repository.

use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};

use bizshop_core::{ManagerPermissions, ManagerStatus, StoreId, StoreManagerId, UserId};

use super::{RepositoryError, conflict_on_unique, count_to_u64};
use crate::models::{Invitation, StoreManager};

const MANAGER_SELECT: &str = r"
    SELECT m.*, u.email
    FROM store_managers m
    JOIN users u ON u.id = m.user_id
";

/// Selects from a CTE named `m` holding modified `store_managers` rows.
const CTE_MANAGER_SELECT: &str = "SELECT m.*, u.email FROM m JOIN users u ON u.id = m.user_id";

pub struct ManagerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ManagerRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Every manager row of a store, in any status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, store_id: StoreId) -> Result<Vec<StoreManager>, RepositoryError> {
        let sql = format!("{MANAGER_SELECT} WHERE m.store_id = $1 ORDER BY m.created_at, m.id");
        let managers = sqlx::query_as::<_, StoreManager>(&sql)
            .bind(store_id)
            .fetch_all(self.pool)
            .await?;
        Ok(managers)
    }

    /// The manager row linking `user_id` to `store_id`, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find(
        &self,
        store_id: StoreId,
        user_id: UserId,
    ) -> Result<Option<StoreManager>, RepositoryError> {
        let sql = format!("{MANAGER_SELECT} WHERE m.store_id = $1 AND m.user_id = $2");
        let manager = sqlx::query_as::<_, StoreManager>(&sql)
            .bind(store_id)
            .bind(user_id)
            .fetch_optional(self.pool)
            .await?;
        Ok(manager)
    }

    /// Pending invitations addressed to `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn pending_for_user(&self, user_id: UserId) -> Result<Vec<Invitation>, RepositoryError> {
        let invitations = sqlx::query_as::<_, Invitation>(
            r"
            SELECT m.id, m.store_id, s.name AS store_name, m.permissions, m.invited_by, m.created_at
            FROM store_managers m
            JOIN stores s ON s.id = m.store_id
            WHERE m.user_id = $1 AND m.status = 'pending'
            ORDER BY m.created_at
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(invitations)
    }

    /// Replace a manager's permissions.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the manager is not in this store.
    pub async fn update_permissions(
        &self,
        store_id: StoreId,
        id: StoreManagerId,
        permissions: ManagerPermissions,
    ) -> Result<StoreManager, RepositoryError> {
        let sql = format!(
            r"
            WITH m AS (
                UPDATE store_managers SET permissions = $3, updated_at = NOW()
                WHERE id = $1 AND store_id = $2
                RETURNING *
            )
            {CTE_MANAGER_SELECT}
            "
        );
        sqlx::query_as::<_, StoreManager>(&sql)
            .bind(id)
            .bind(store_id)
            .bind(Json(permissions))
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Answer an invitation. Only the invitee can, and only while pending.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if there is no pending invitation
    /// with this id for `user_id`.
    pub async fn respond(
        &self,
        id: StoreManagerId,
        user_id: UserId,
        status: ManagerStatus,
    ) -> Result<StoreManager, RepositoryError> {
        let sql = format!(
            r"
            WITH m AS (
                UPDATE store_managers SET status = $3, updated_at = NOW()
                WHERE id = $1 AND user_id = $2 AND status = 'pending'
                RETURNING *
            )
            {CTE_MANAGER_SELECT}
            "
        );
        sqlx::query_as::<_, StoreManager>(&sql)
            .bind(id)
            .bind(user_id)
            .bind(status)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Remove a manager from a store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the manager is not in this store.
    pub async fn delete(&self, store_id: StoreId, id: StoreManagerId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM store_managers WHERE id = $1 AND store_id = $2")
            .bind(id)
            .bind(store_id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

// =============================================================================
// Transactional steps
// =============================================================================

/// Manager rows of a store in any status.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn count_for_store(conn: &mut PgConnection, store_id: StoreId) -> Result<u64, RepositoryError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM store_managers WHERE store_id = $1")
        .bind(store_id)
        .fetch_one(conn)
        .await?;
    count_to_u64(count)
}

/// Insert a pending invitation.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the user is already invited.
pub async fn insert(
    conn: &mut PgConnection,
    store_id: StoreId,
    user_id: UserId,
    permissions: ManagerPermissions,
    invited_by: UserId,
) -> Result<StoreManager, RepositoryError> {
    let sql = format!(
        r"
        WITH m AS (
            INSERT INTO store_managers (store_id, user_id, permissions, invited_by)
            VALUES ($1, $2, $3, $4)
            RETURNING *
        )
        {CTE_MANAGER_SELECT}
        "
    );
    let manager = sqlx::query_as::<_, StoreManager>(&sql)
        .bind(store_id)
        .bind(user_id)
        .bind(Json(permissions))
        .bind(invited_by)
        .fetch_one(conn)
        .await
        .map_err(conflict_on_unique("user is already a manager of this store"))?;
    Ok(manager)
}
