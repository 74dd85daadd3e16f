//! Product repository.

use sqlx::{PgConnection, PgPool};

use bizshop_core::{ProductId, StoreId};

use super::{RepositoryError, count_to_u64};
use crate::models::{NewProduct, Product, ProductUpdate};

pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Every product of a store, active or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, store_id: StoreId) -> Result<Vec<Product>, RepositoryError> {
        let products = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE store_id = $1 ORDER BY created_at, id",
        )
        .bind(store_id)
        .fetch_all(self.pool)
        .await?;
        Ok(products)
    }

    /// Active products, for the public storefront.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_active(&self, store_id: StoreId) -> Result<Vec<Product>, RepositoryError> {
        let products = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE store_id = $1 AND is_active ORDER BY created_at, id",
        )
        .bind(store_id)
        .fetch_all(self.pool)
        .await?;
        Ok(products)
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product is not in this store.
    pub async fn delete(&self, store_id: StoreId, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1 AND store_id = $2")
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

/// Number of active products in a store.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn count_active(conn: &mut PgConnection, store_id: StoreId) -> Result<u64, RepositoryError> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE store_id = $1 AND is_active")
            .bind(store_id)
            .fetch_one(conn)
            .await?;
    count_to_u64(count)
}

/// Lock one product of a store.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the product is not in this store.
pub async fn lock(
    conn: &mut PgConnection,
    store_id: StoreId,
    id: ProductId,
) -> Result<Product, RepositoryError> {
    sqlx::query_as::<_, Product>(
        "SELECT * FROM products WHERE id = $1 AND store_id = $2 FOR UPDATE",
    )
    .bind(id)
    .bind(store_id)
    .fetch_optional(conn)
    .await?
    .ok_or(RepositoryError::NotFound)
}

/// Lock the active products an order refers to, in id order.
///
/// Products that are missing, inactive or in another store are simply
/// absent from the result.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_for_order(
    conn: &mut PgConnection,
    store_id: StoreId,
    ids: &[ProductId],
) -> Result<Vec<Product>, RepositoryError> {
    let raw: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();
    let products = sqlx::query_as::<_, Product>(
        r"
        SELECT * FROM products
        WHERE store_id = $1 AND id = ANY($2) AND is_active
        ORDER BY id
        FOR UPDATE
        ",
    )
    .bind(store_id)
    .bind(&raw)
    .fetch_all(conn)
    .await?;
    Ok(products)
}

/// Take `quantity` units out of stock.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if there is not enough stock.
pub async fn decrement_inventory(
    conn: &mut PgConnection,
    id: ProductId,
    quantity: i32,
) -> Result<(), RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE products SET inventory = inventory - $2, updated_at = NOW()
        WHERE id = $1 AND inventory >= $2
        ",
    )
    .bind(id)
    .bind(quantity)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::Conflict(format!(
            "insufficient inventory for product {id}"
        )));
    }
    Ok(())
}

/// Insert a product.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert(
    conn: &mut PgConnection,
    store_id: StoreId,
    new: &NewProduct,
) -> Result<Product, RepositoryError> {
    let product = sqlx::query_as::<_, Product>(
        r"
        INSERT INTO products (store_id, category_id, name, description, price_inr, inventory, is_active)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        ",
    )
    .bind(store_id)
    .bind(new.category_id)
    .bind(new.name.trim())
    .bind(new.description.as_deref())
    .bind(new.price_inr)
    .bind(new.inventory)
    .bind(new.is_active)
    .fetch_one(conn)
    .await?;
    Ok(product)
}

/// Apply a partial update.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the product is not in this store.
pub async fn update(
    conn: &mut PgConnection,
    store_id: StoreId,
    id: ProductId,
    update: &ProductUpdate,
) -> Result<Product, RepositoryError> {
    sqlx::query_as::<_, Product>(
        r"
        UPDATE products SET
            name = COALESCE($3, name),
            description = COALESCE($4, description),
            category_id = COALESCE($5, category_id),
            price_inr = COALESCE($6, price_inr),
            inventory = COALESCE($7, inventory),
            is_active = COALESCE($8, is_active),
            updated_at = NOW()
        WHERE id = $1 AND store_id = $2
        RETURNING *
        ",
    )
    .bind(id)
    .bind(store_id)
    .bind(update.name.as_deref().map(str::trim))
    .bind(update.description.as_deref())
    .bind(update.category_id)
    .bind(update.price_inr)
    .bind(update.inventory)
    .bind(update.is_active)
    .fetch_optional(conn)
    .await?
    .ok_or(RepositoryError::NotFound)
}

/// Whether `category_id` belongs to `store_id`.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn category_in_store(
    conn: &mut PgConnection,
    store_id: StoreId,
    category_id: bizshop_core::CategoryId,
) -> Result<bool, RepositoryError> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM categories WHERE id = $1 AND store_id = $2)",
    )
    .bind(category_id)
    .bind(store_id)
    .fetch_one(conn)
    .await?;
    Ok(exists)
}
