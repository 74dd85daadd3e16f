//! Product writes under the owner's active-product cap.
//!
//! The cap counts active products of one store against the store owner's
//! plan, never the acting manager's. It is checked when a product is created
//! active and when an inactive product is re-activated.

use sqlx::{PgConnection, PgPool};

use bizshop_core::{CategoryId, LimitKind, ProductId, StoreId};

use crate::db::{ProductRepository, products, users};
use crate::error::AppError;
use crate::models::{NewProduct, OwnedStore, Product, ProductUpdate};

pub struct ProductService<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn list(&self, store_id: StoreId) -> Result<Vec<Product>, AppError> {
        Ok(ProductRepository::new(self.pool).list(store_id).await?)
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// `AppError::BadRequest` for invalid fields or a foreign category,
    /// `AppError::Entitlement` when an active product would exceed the cap.
    #[tracing::instrument(skip(self, store, new), fields(store_id = %store.store.id))]
    pub async fn create(&self, store: &OwnedStore, new: &NewProduct) -> Result<Product, AppError> {
        new.check().map_err(AppError::BadRequest)?;

        let mut tx = self.pool.begin().await?;
        if new.is_active {
            check_active_cap(&mut tx, store).await?;
        }
        check_category(&mut tx, store.store.id, new.category_id).await?;
        let product = products::insert(&mut tx, store.store.id, new).await?;
        tx.commit().await?;

        tracing::info!(product_id = %product.id, "Product created");
        Ok(product)
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// `AppError::NotFound` if the product is not in this store,
    /// `AppError::Entitlement` when re-activation would exceed the cap.
    #[tracing::instrument(skip(self, store, update), fields(store_id = %store.store.id))]
    pub async fn update(
        &self,
        store: &OwnedStore,
        id: ProductId,
        update: &ProductUpdate,
    ) -> Result<Product, AppError> {
        update.check().map_err(AppError::BadRequest)?;

        let mut tx = self.pool.begin().await?;
        // owner before product, same lock order as create
        let owner = if update.is_active == Some(true) {
            Some(users::lock(&mut tx, store.store.user_id).await?)
        } else {
            None
        };
        let current = products::lock(&mut tx, store.store.id, id).await?;
        if let Some(owner) = &owner
            && !current.is_active
        {
            let active = products::count_active(&mut tx, store.store.id).await?;
            owner.max_products.check(active, LimitKind::Products)?;
        }
        check_category(&mut tx, store.store.id, update.category_id).await?;
        let product = products::update(&mut tx, store.store.id, id, update).await?;
        tx.commit().await?;

        Ok(product)
    }

    /// # Errors
    ///
    /// `AppError::NotFound` if the product is not in this store.
    pub async fn delete(&self, store_id: StoreId, id: ProductId) -> Result<(), AppError> {
        ProductRepository::new(self.pool).delete(store_id, id).await?;
        tracing::info!(store_id = %store_id, product_id = %id, "Product deleted");
        Ok(())
    }
}

/// Lock the store owner and check one more active product fits.
async fn check_active_cap(conn: &mut PgConnection, store: &OwnedStore) -> Result<(), AppError> {
    let owner = users::lock(&mut *conn, store.store.user_id).await?;
    let active = products::count_active(&mut *conn, store.store.id).await?;
    owner.max_products.check(active, LimitKind::Products)?;
    Ok(())
}

async fn check_category(
    conn: &mut PgConnection,
    store_id: StoreId,
    category_id: Option<CategoryId>,
) -> Result<(), AppError> {
    if let Some(category_id) = category_id
        && !products::category_in_store(conn, store_id, category_id).await?
    {
        return Err(AppError::BadRequest(format!(
            "category {category_id} does not belong to this store"
        )));
    }
    Ok(())
}
