//! Discount code management and storefront preview.

use chrono::Utc;
use sqlx::PgPool;

use bizshop_core::discount::normalize_code;
use bizshop_core::{DiscountCodeId, StoreId};

use crate::db::{DiscountRepository, StoreRepository};
use crate::error::AppError;
use crate::models::discount::{DiscountPreview, ValidateDiscount};
use crate::models::{DiscountCode, DiscountUpdate, NewDiscount};

pub struct DiscountService<'a> {
    pool: &'a PgPool,
}

impl<'a> DiscountService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// `AppError::BadRequest` for an invalid code or definition,
    /// `AppError::Database` with a conflict for a duplicate code.
    pub async fn create(&self, store_id: StoreId, new: &NewDiscount) -> Result<DiscountCode, AppError> {
        let code = normalize_code(&new.code)?;
        let rules = new.rules();
        rules.check_definition()?;
        let created = DiscountRepository::new(self.pool)
            .create(store_id, &code, &rules)
            .await?;
        tracing::info!(store_id = %store_id, discount_id = %created.id, "Discount code created");
        Ok(created)
    }

    /// # Errors
    ///
    /// `AppError::NotFound` for an unknown code, `AppError::BadRequest` for
    /// an invalid definition.
    pub async fn update(
        &self,
        store_id: StoreId,
        id: DiscountCodeId,
        update: &DiscountUpdate,
    ) -> Result<DiscountCode, AppError> {
        let repo = DiscountRepository::new(self.pool);
        let current = repo
            .get(store_id, id)
            .await?
            .ok_or_else(|| AppError::NotFound("discount code not found".to_string()))?;
        let rules = update.apply_to(&current);
        rules.check_definition()?;
        Ok(repo.update(store_id, id, &rules).await?)
    }

    /// Preview a code against a subtotal on a published store.
    ///
    /// A pure read: the code's usage count is not touched.
    ///
    /// # Errors
    ///
    /// `AppError::NotFound` for an unknown store or code,
    /// `AppError::Entitlement` when the code cannot be used now.
    pub async fn preview(&self, slug: &str, request: &ValidateDiscount) -> Result<DiscountPreview, AppError> {
        if request.subtotal.is_sign_negative() {
            return Err(AppError::BadRequest("subtotal must not be negative".to_string()));
        }
        let store = StoreRepository::new(self.pool)
            .get_published_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::NotFound("store not found".to_string()))?;
        let code = normalize_code(&request.code)?;
        let row = DiscountRepository::new(self.pool)
            .find_by_code(store.store.id, &code)
            .await?
            .ok_or_else(|| AppError::NotFound("discount code not found".to_string()))?;

        let rules = row.rules();
        rules.validate(Utc::now())?;
        let outcome = rules.apply(request.subtotal, store.store.shipping_fee_inr);

        Ok(DiscountPreview {
            code: row.code,
            discount_type: row.discount_type,
            discount_amount: outcome.discount_amount,
            shipping_fee: outcome.shipping_fee,
            total: outcome.total(request.subtotal),
        })
    }
}
