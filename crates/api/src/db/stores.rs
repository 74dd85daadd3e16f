//! Store repository.

use sqlx::{PgConnection, PgPool};

use bizshop_core::{StoreId, UserId};

use super::{RepositoryError, conflict_on_unique, count_to_u64};
use crate::models::{NewStore, OwnedStore, Store, StoreUpdate};

const OWNED_STORE_SELECT: &str = r"
    SELECT s.*, u.subscription_plan AS owner_plan
    FROM stores s
    JOIN users u ON u.id = s.user_id
";

pub struct StoreRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StoreRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a store with its owner's current plan.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: StoreId) -> Result<Option<OwnedStore>, RepositoryError> {
        let sql = format!("{OWNED_STORE_SELECT} WHERE s.id = $1");
        let store = sqlx::query_as::<_, OwnedStore>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(store)
    }

    /// Get a published store by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_published_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<OwnedStore>, RepositoryError> {
        let sql = format!("{OWNED_STORE_SELECT} WHERE s.slug = $1 AND s.is_published");
        let store = sqlx::query_as::<_, OwnedStore>(&sql)
            .bind(slug)
            .fetch_optional(self.pool)
            .await?;
        Ok(store)
    }

    /// Stores owned by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_owned(&self, user_id: UserId) -> Result<Vec<Store>, RepositoryError> {
        let stores = sqlx::query_as::<_, Store>(
            "SELECT * FROM stores WHERE user_id = $1 ORDER BY created_at, id",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(stores)
    }

    /// Stores where `user_id` holds an accepted manager grant.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_managed(&self, user_id: UserId) -> Result<Vec<Store>, RepositoryError> {
        let stores = sqlx::query_as::<_, Store>(
            r"
            SELECT s.* FROM stores s
            JOIN store_managers m ON m.store_id = s.id
            WHERE m.user_id = $1 AND m.status = 'accepted'
            ORDER BY s.created_at, s.id
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(stores)
    }

    /// Apply a settings update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the store does not exist.
    pub async fn update(&self, id: StoreId, update: &StoreUpdate) -> Result<Store, RepositoryError> {
        sqlx::query_as::<_, Store>(
            r"
            UPDATE stores SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                primary_color = COALESCE($4, primary_color),
                secondary_color = COALESCE($5, secondary_color),
                font_family = COALESCE($6, font_family),
                logo_url = COALESCE($7, logo_url),
                remove_branding = COALESCE($8, remove_branding),
                shipping_fee_inr = COALESCE($9, shipping_fee_inr),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            ",
        )
        .bind(id)
        .bind(update.name.as_deref())
        .bind(update.description.as_deref())
        .bind(update.primary_color.as_deref())
        .bind(update.secondary_color.as_deref())
        .bind(update.font_family.as_deref())
        .bind(update.logo_url.as_deref())
        .bind(update.remove_branding)
        .bind(update.shipping_fee_inr)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Set or clear the custom domain.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if another store uses the domain.
    pub async fn set_custom_domain(
        &self,
        id: StoreId,
        domain: Option<&str>,
    ) -> Result<Store, RepositoryError> {
        sqlx::query_as::<_, Store>(
            "UPDATE stores SET custom_domain = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(domain)
        .fetch_optional(self.pool)
        .await
        .map_err(conflict_on_unique("domain already in use"))?
        .ok_or(RepositoryError::NotFound)
    }

    /// Publish or unpublish a store.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the store does not exist.
    pub async fn set_published(&self, id: StoreId, published: bool) -> Result<Store, RepositoryError> {
        sqlx::query_as::<_, Store>(
            "UPDATE stores SET is_published = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(published)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }
}

// =============================================================================
// Transactional steps
// =============================================================================

/// Number of stores owned by `user_id`.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn count_owned(conn: &mut PgConnection, user_id: UserId) -> Result<u64, RepositoryError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stores WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(conn)
        .await?;
    count_to_u64(count)
}

/// Insert a store.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the slug is taken.
pub async fn insert(
    conn: &mut PgConnection,
    owner: UserId,
    slug: &str,
    new: &NewStore,
) -> Result<Store, RepositoryError> {
    let store = sqlx::query_as::<_, Store>(
        r"
        INSERT INTO stores (
            user_id, name, slug, description,
            primary_color, secondary_color, font_family, logo_url, shipping_fee_inr
        )
        VALUES (
            $1, $2, $3, $4,
            COALESCE($5, '#111827'), COALESCE($6, '#f59e0b'), COALESCE($7, 'Inter'), $8, $9
        )
        RETURNING *
        ",
    )
    .bind(owner)
    .bind(new.name.trim())
    .bind(slug)
    .bind(new.description.as_deref())
    .bind(new.primary_color.as_deref())
    .bind(new.secondary_color.as_deref())
    .bind(new.font_family.as_deref())
    .bind(new.logo_url.as_deref())
    .bind(new.shipping_fee_inr)
    .fetch_one(conn)
    .await
    .map_err(conflict_on_unique("slug already taken"))?;

    Ok(store)
}

/// Lock a store row for the rest of the transaction.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the store does not exist.
pub async fn lock(conn: &mut PgConnection, id: StoreId) -> Result<Store, RepositoryError> {
    sqlx::query_as::<_, Store>("SELECT * FROM stores WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or(RepositoryError::NotFound)
}

/// Delete a store and all its children.
///
/// Products go first, then orders, then the remaining children, then the
/// store itself.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the store does not exist.
pub async fn delete_cascade(conn: &mut PgConnection, id: StoreId) -> Result<(), RepositoryError> {
    for statement in [
        "DELETE FROM products WHERE store_id = $1",
        "DELETE FROM orders WHERE store_id = $1",
        "DELETE FROM categories WHERE store_id = $1",
        "DELETE FROM discount_codes WHERE store_id = $1",
        "DELETE FROM store_managers WHERE store_id = $1",
    ] {
        sqlx::query(statement).bind(id).execute(&mut *conn).await?;
    }

    let result = sqlx::query("DELETE FROM stores WHERE id = $1")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}
