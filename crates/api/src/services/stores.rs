//! Store lifecycle: creation under the plan's store cap, settings, custom
//! domains, publishing and deletion.

use rust_decimal::Decimal;
use sqlx::PgPool;

use bizshop_core::entitlements::{Feature, has_feature_access};
use bizshop_core::{LimitKind, MAX_STORED_AMOUNT, StoreId};

use crate::db::{StoreRepository, stores, users};
use crate::error::AppError;
use crate::models::store::{is_valid_domain, is_valid_slug, slugify};
use crate::models::{NewStore, OwnedStore, Store, StoreUpdate, User};

/// Stores a user can open: owned ones first, then managed ones.
#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreList {
    pub owned: Vec<Store>,
    pub managed: Vec<Store>,
}

pub struct StoreService<'a> {
    pool: &'a PgPool,
}

impl<'a> StoreService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `AppError::Database` if a query fails.
    pub async fn list_for(&self, user: &User) -> Result<StoreList, AppError> {
        let repo = StoreRepository::new(self.pool);
        Ok(StoreList {
            owned: repo.list_owned(user.id).await?,
            managed: repo.list_managed(user.id).await?,
        })
    }

    /// Create a store for `owner`.
    ///
    /// The owner row is locked while the existing stores are counted, so two
    /// concurrent creations cannot both slip under the cap.
    ///
    /// # Errors
    ///
    /// `AppError::BadRequest` for invalid fields, `AppError::Entitlement`
    /// when the plan's store cap is reached, `AppError::Database` with a
    /// conflict when the slug is taken.
    #[tracing::instrument(skip(self, owner, new), fields(user_id = %owner.id))]
    pub async fn create(&self, owner: &User, new: &NewStore) -> Result<Store, AppError> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(AppError::BadRequest("name is required".to_string()));
        }
        check_shipping_fee(new.shipping_fee_inr)?;

        let slug = match new.slug.as_deref() {
            Some(slug) if is_valid_slug(slug) => slug.to_owned(),
            Some(_) => {
                return Err(AppError::BadRequest(
                    "slug may only contain lowercase letters, digits and single hyphens".to_string(),
                ));
            }
            None => slugify(name).ok_or_else(|| {
                AppError::BadRequest("name must contain a letter or digit".to_string())
            })?,
        };

        let mut tx = self.pool.begin().await?;
        let locked = users::lock(&mut tx, owner.id).await?;
        let owned = stores::count_owned(&mut tx, owner.id).await?;
        locked.max_stores.check(owned, LimitKind::Stores)?;
        let store = stores::insert(&mut tx, owner.id, &slug, new).await?;
        tx.commit().await?;

        tracing::info!(store_id = %store.id, slug = %store.slug, "Store created");
        Ok(store)
    }

    /// Apply a settings update.
    ///
    /// # Errors
    ///
    /// `AppError::Entitlement` when hiding branding without the feature.
    pub async fn update(&self, store: &OwnedStore, update: &StoreUpdate) -> Result<Store, AppError> {
        if let Some(name) = &update.name
            && name.trim().is_empty()
        {
            return Err(AppError::BadRequest("name is required".to_string()));
        }
        if let Some(fee) = update.shipping_fee_inr {
            check_shipping_fee(fee)?;
        }
        if update.remove_branding == Some(true)
            && !has_feature_access(store.owner_plan, Feature::RemoveBranding)
        {
            return Err(AppError::upgrade_required(
                "removing BizShop branding requires the Pro plan or above",
            ));
        }

        let updated = StoreRepository::new(self.pool)
            .update(store.store.id, update)
            .await?;
        Ok(updated)
    }

    /// Set or clear the custom domain.
    ///
    /// Clearing is always allowed; setting needs the `customDomain` feature.
    ///
    /// # Errors
    ///
    /// `AppError::Entitlement` without the feature, `AppError::BadRequest`
    /// for a malformed hostname.
    pub async fn set_domain(
        &self,
        store: &OwnedStore,
        domain: Option<&str>,
    ) -> Result<Store, AppError> {
        let domain = domain
            .map(|d| d.trim().trim_end_matches('.').to_ascii_lowercase())
            .filter(|d| !d.is_empty());

        if let Some(domain) = &domain {
            if !has_feature_access(store.owner_plan, Feature::CustomDomain) {
                return Err(AppError::upgrade_required(
                    "custom domains require the Pro plan or above",
                ));
            }
            if !is_valid_domain(domain) {
                return Err(AppError::BadRequest(format!("invalid domain: {domain}")));
            }
        }

        let updated = StoreRepository::new(self.pool)
            .set_custom_domain(store.store.id, domain.as_deref())
            .await?;
        tracing::info!(store_id = %updated.id, domain = ?updated.custom_domain, "Custom domain changed");
        Ok(updated)
    }

    /// # Errors
    ///
    /// Returns `AppError::Database` if the update fails.
    pub async fn set_published(&self, store_id: StoreId, published: bool) -> Result<Store, AppError> {
        let store = StoreRepository::new(self.pool)
            .set_published(store_id, published)
            .await?;
        tracing::info!(store_id = %store.id, published, "Store publication changed");
        Ok(store)
    }

    /// Delete a store with its products, orders, categories, discounts and
    /// managers, in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if any delete fails.
    pub async fn delete(&self, store_id: StoreId) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        stores::delete_cascade(&mut tx, store_id).await?;
        tx.commit().await?;
        tracing::info!(store_id = %store_id, "Store deleted");
        Ok(())
    }
}

fn check_shipping_fee(fee: Decimal) -> Result<(), AppError> {
    if fee.is_sign_negative() || fee.round_dp(2) != fee || fee > MAX_STORED_AMOUNT {
        return Err(AppError::BadRequest(
            "shipping fee must be a non-negative amount with at most 2 decimals".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shipping_fee_rules() {
        assert!(check_shipping_fee(Decimal::ZERO).is_ok());
        assert!(check_shipping_fee(Decimal::new(4999, 2)).is_ok());
        assert!(check_shipping_fee(Decimal::new(-1, 0)).is_err());
        assert!(check_shipping_fee(Decimal::new(1001, 3)).is_err());
        assert!(check_shipping_fee(MAX_STORED_AMOUNT).is_ok());
        assert!(check_shipping_fee(MAX_STORED_AMOUNT + Decimal::new(1, 2)).is_err());
    }
}
