//! Category repository.

use sqlx::PgPool;

use bizshop_core::{CategoryId, StoreId};

use super::{RepositoryError, conflict_on_unique};
use crate::models::Category;

pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, store_id: StoreId) -> Result<Vec<Category>, RepositoryError> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT * FROM categories WHERE store_id = $1 ORDER BY name",
        )
        .bind(store_id)
        .fetch_all(self.pool)
        .await?;
        Ok(categories)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the store already has a
    /// category with this name.
    pub async fn create(&self, store_id: StoreId, name: &str) -> Result<Category, RepositoryError> {
        let category = sqlx::query_as::<_, Category>(
            "INSERT INTO categories (store_id, name) VALUES ($1, $2) RETURNING *",
        )
        .bind(store_id)
        .bind(name)
        .fetch_one(self.pool)
        .await
        .map_err(conflict_on_unique("category already exists"))?;
        Ok(category)
    }

    /// Delete a category. Its products keep existing without a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category is not in this store.
    pub async fn delete(&self, store_id: StoreId, id: CategoryId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1 AND store_id = $2")
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
