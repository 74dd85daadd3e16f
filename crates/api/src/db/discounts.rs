//! Discount code repository.
//!
//! Consuming a use is a single conditional increment, so two checkouts can
//! never both take the last use of a limited code.

use sqlx::{PgConnection, PgPool};

use bizshop_core::discount::DiscountRules;
use bizshop_core::{DiscountCodeId, StoreId};

use super::{RepositoryError, conflict_on_unique};
use crate::models::DiscountCode;

pub struct DiscountRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DiscountRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, store_id: StoreId) -> Result<Vec<DiscountCode>, RepositoryError> {
        let codes = sqlx::query_as::<_, DiscountCode>(
            "SELECT * FROM discount_codes WHERE store_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(store_id)
        .fetch_all(self.pool)
        .await?;
        Ok(codes)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        store_id: StoreId,
        id: DiscountCodeId,
    ) -> Result<Option<DiscountCode>, RepositoryError> {
        let code = sqlx::query_as::<_, DiscountCode>(
            "SELECT * FROM discount_codes WHERE id = $1 AND store_id = $2",
        )
        .bind(id)
        .bind(store_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(code)
    }

    /// Look up a code by its normalized text. Never modifies the row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_code(
        &self,
        store_id: StoreId,
        code: &str,
    ) -> Result<Option<DiscountCode>, RepositoryError> {
        let code = sqlx::query_as::<_, DiscountCode>(
            "SELECT * FROM discount_codes WHERE store_id = $1 AND code = $2",
        )
        .bind(store_id)
        .bind(code)
        .fetch_optional(self.pool)
        .await?;
        Ok(code)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the code already exists in the store.
    pub async fn create(
        &self,
        store_id: StoreId,
        code: &str,
        rules: &DiscountRules,
    ) -> Result<DiscountCode, RepositoryError> {
        let created = sqlx::query_as::<_, DiscountCode>(
            r"
            INSERT INTO discount_codes (
                store_id, code, type, value, usage_limit, starts_at, expires_at, is_active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            ",
        )
        .bind(store_id)
        .bind(code)
        .bind(rules.discount_type)
        .bind(rules.value)
        .bind(rules.usage_limit)
        .bind(rules.starts_at)
        .bind(rules.expires_at)
        .bind(rules.is_active)
        .fetch_one(self.pool)
        .await
        .map_err(conflict_on_unique("discount code already exists"))?;
        Ok(created)
    }

    /// Overwrite the editable rule fields. `usage_count` is never touched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the code is not in this store.
    /// Returns `RepositoryError::Conflict` if the new limit is below the
    /// uses already consumed.
    pub async fn update(
        &self,
        store_id: StoreId,
        id: DiscountCodeId,
        rules: &DiscountRules,
    ) -> Result<DiscountCode, RepositoryError> {
        sqlx::query_as::<_, DiscountCode>(
            r"
            UPDATE discount_codes SET
                value = $3, usage_limit = $4, starts_at = $5, expires_at = $6, is_active = $7
            WHERE id = $1 AND store_id = $2
            RETURNING *
            ",
        )
        .bind(id)
        .bind(store_id)
        .bind(rules.value)
        .bind(rules.usage_limit)
        .bind(rules.starts_at)
        .bind(rules.expires_at)
        .bind(rules.is_active)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_check_violation()
            {
                return RepositoryError::Conflict("usage limit below current usage".to_owned());
            }
            RepositoryError::Database(e)
        })?
        .ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the code is not in this store.
    pub async fn delete(&self, store_id: StoreId, id: DiscountCodeId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM discount_codes WHERE id = $1 AND store_id = $2")
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

/// Lock a code for an order being placed.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_by_code(
    conn: &mut PgConnection,
    store_id: StoreId,
    code: &str,
) -> Result<Option<DiscountCode>, RepositoryError> {
    let code = sqlx::query_as::<_, DiscountCode>(
        "SELECT * FROM discount_codes WHERE store_id = $1 AND code = $2 FOR UPDATE",
    )
    .bind(store_id)
    .bind(code)
    .fetch_optional(conn)
    .await?;
    Ok(code)
}

/// Consume one use of a code.
///
/// Returns `false` when the usage limit has already been reached.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn consume(conn: &mut PgConnection, id: DiscountCodeId) -> Result<bool, RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE discount_codes SET usage_count = usage_count + 1
        WHERE id = $1 AND (usage_limit IS NULL OR usage_count < usage_limit)
        ",
    )
    .bind(id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}
