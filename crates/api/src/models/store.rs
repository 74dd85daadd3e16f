//! Storefront types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bizshop_core::authz::StoreContext;
use bizshop_core::entitlements::{Feature, has_feature_access};
use bizshop_core::{PlanTier, StoreId, UserId};

use super::catalog::Product;

/// Longest accepted store slug.
pub const MAX_SLUG_LEN: usize = 48;

/// A store row.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    pub id: StoreId,
    pub user_id: UserId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub primary_color: String,
    pub secondary_color: String,
    pub font_family: String,
    pub logo_url: Option<String>,
    pub remove_branding: bool,
    pub is_published: bool,
    pub custom_domain: Option<String>,
    pub shipping_fee_inr: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A store joined with its owner's current plan.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OwnedStore {
    #[sqlx(flatten)]
    pub store: Store,
    pub owner_plan: PlanTier,
}

impl OwnedStore {
    /// Authorization context for this store.
    #[must_use]
    pub const fn context(&self) -> StoreContext {
        StoreContext {
            store_id: self.store.id,
            owner_id: self.store.user_id,
            owner_plan: self.owner_plan,
        }
    }

    /// Whether the BizShop badge is hidden on the public storefront.
    ///
    /// The stored flag only counts while the owner's plan still includes
    /// `removeBranding`.
    #[must_use]
    pub const fn hides_branding(&self) -> bool {
        self.store.remove_branding && has_feature_access(self.owner_plan, Feature::RemoveBranding)
    }

    /// The custom domain, while the owner's plan still includes it.
    #[must_use]
    pub fn active_custom_domain(&self) -> Option<&str> {
        self.store
            .custom_domain
            .as_deref()
            .filter(|_| has_feature_access(self.owner_plan, Feature::CustomDomain))
    }
}

/// Fields for a new store.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStore {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub primary_color: Option<String>,
    pub secondary_color: Option<String>,
    pub font_family: Option<String>,
    pub logo_url: Option<String>,
    #[serde(default)]
    pub shipping_fee_inr: Decimal,
}

/// Partial update of a store's settings. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub primary_color: Option<String>,
    pub secondary_color: Option<String>,
    pub font_family: Option<String>,
    pub logo_url: Option<String>,
    pub remove_branding: Option<bool>,
    pub shipping_fee_inr: Option<Decimal>,
}

/// What customers see at `/api/public/stores/{slug}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicStore {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub primary_color: String,
    pub secondary_color: String,
    pub font_family: String,
    pub logo_url: Option<String>,
    pub custom_domain: Option<String>,
    pub shipping_fee_inr: Decimal,
    pub show_branding: bool,
    pub products: Vec<Product>,
}

impl PublicStore {
    #[must_use]
    pub fn new(owned: &OwnedStore, products: Vec<Product>) -> Self {
        let store = &owned.store;
        Self {
            name: store.name.clone(),
            slug: store.slug.clone(),
            description: store.description.clone(),
            primary_color: store.primary_color.clone(),
            secondary_color: store.secondary_color.clone(),
            font_family: store.font_family.clone(),
            logo_url: store.logo_url.clone(),
            custom_domain: owned.active_custom_domain().map(str::to_owned),
            shipping_fee_inr: store.shipping_fee_inr,
            show_branding: !owned.hides_branding(),
            products,
        }
    }
}

/// Derive a URL slug from a store name.
///
/// Lowercases ASCII letters and digits, collapses everything else into single
/// hyphens and trims hyphens from both ends. Returns `None` when nothing
/// usable remains.
#[must_use]
pub fn slugify(name: &str) -> Option<String> {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    let slug = &slug[..slug.len().min(MAX_SLUG_LEN)];
    let slug = slug.trim_end_matches('-');
    (!slug.is_empty()).then(|| slug.to_owned())
}

/// Check a client-supplied slug is already in canonical form.
#[must_use]
pub fn is_valid_slug(slug: &str) -> bool {
    slugify(slug).as_deref() == Some(slug)
}

/// Validate a custom domain: lowercase hostname with at least one dot.
#[must_use]
pub fn is_valid_domain(domain: &str) -> bool {
    domain.len() <= 253
        && domain.contains('.')
        && domain.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn owned(plan: PlanTier, remove_branding: bool) -> OwnedStore {
        let now = Utc::now();
        OwnedStore {
            store: Store {
                id: StoreId::new(1),
                user_id: UserId::new(1),
                name: "Chai Corner".to_owned(),
                slug: "chai-corner".to_owned(),
                description: None,
                primary_color: "#111827".to_owned(),
                secondary_color: "#f59e0b".to_owned(),
                font_family: "Inter".to_owned(),
                logo_url: None,
                remove_branding,
                is_published: true,
                custom_domain: Some("chai.example.in".to_owned()),
                shipping_fee_inr: Decimal::from(40),
                created_at: now,
                updated_at: now,
            },
            owner_plan: plan,
        }
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Chai Corner").as_deref(), Some("chai-corner"));
        assert_eq!(slugify("  Ravi's  Sarees!! ").as_deref(), Some("ravi-s-sarees"));
        assert_eq!(slugify("!!!"), None);
        assert!(slugify(&"a".repeat(100)).unwrap().len() <= MAX_SLUG_LEN);
    }

    #[test]
    fn test_is_valid_slug() {
        assert!(is_valid_slug("chai-corner"));
        assert!(!is_valid_slug("Chai-Corner"));
        assert!(!is_valid_slug("-chai"));
    }

    #[test]
    fn test_is_valid_domain() {
        assert!(is_valid_domain("shop.example.in"));
        assert!(!is_valid_domain("localhost"));
        assert!(!is_valid_domain("Shop.Example.in"));
        assert!(!is_valid_domain("bad-.example.in"));
    }

    #[test]
    fn test_branding_follows_current_plan() {
        assert!(owned(PlanTier::Pro, true).hides_branding());
        assert!(!owned(PlanTier::Pro, false).hides_branding());
        // downgraded owner: stored flag no longer honoured
        assert!(!owned(PlanTier::Basic, true).hides_branding());
    }

    #[test]
    fn test_custom_domain_follows_current_plan() {
        assert_eq!(
            owned(PlanTier::Premium, false).active_custom_domain(),
            Some("chai.example.in")
        );
        assert_eq!(owned(PlanTier::Free, false).active_custom_domain(), None);
    }

    #[test]
    fn test_public_store_hides_owner_fields() {
        let public = PublicStore::new(&owned(PlanTier::Free, true), Vec::new());
        let json = serde_json::to_value(&public).unwrap();
        assert_eq!(json["showBranding"], true);
        assert!(json.get("userId").is_none());
        assert!(json["customDomain"].is_null());
    }
}
