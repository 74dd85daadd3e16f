//! HTTP route handlers for the API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check (database)
//!
//! # Auth
//! POST /api/auth/register      - Create an account (starts the trial)
//! POST /api/auth/login         - Email/password login
//! POST /api/auth/logout        - End the session
//!
//! # Account
//! GET  /api/me                 - Current user with plan capabilities
//! GET  /api/me/features/{feature} - Whether the plan includes a feature
//! GET  /api/invitations        - Pending store manager invitations
//! POST /api/invitations/{id}/accept | decline
//!
//! # Plans and subscriptions
//! GET  /api/plans              - Plan catalog
//! POST /api/subscriptions/free | checkout | verify | pause | resume | cancel
//! POST /api/webhooks/razorpay  - Signed gateway webhook
//!
//! # Stores (owner, admin, or manager with the matching permission)
//! GET/POST          /api/stores
//! GET/PATCH/DELETE  /api/stores/{id}
//! PUT               /api/stores/{id}/domain
//! POST              /api/stores/{id}/publish
//! GET/POST          /api/stores/{id}/products
//! PATCH/DELETE      /api/stores/{id}/products/{product_id}
//! GET/POST          /api/stores/{id}/categories
//! DELETE            /api/stores/{id}/categories/{category_id}
//! GET/POST          /api/stores/{id}/discounts
//! PATCH/DELETE      /api/stores/{id}/discounts/{discount_id}
//! GET               /api/stores/{id}/orders
//! PATCH             /api/stores/{id}/orders/{order_id}
//! GET               /api/stores/{id}/analytics
//! GET/POST          /api/stores/{id}/managers
//! PATCH/DELETE      /api/stores/{id}/managers/{manager_id}
//!
//! # Public storefront
//! GET  /api/public/stores/{slug}
//! POST /api/public/stores/{slug}/discounts/validate
//! POST /api/public/stores/{slug}/orders
//!
//! # Platform staff
//! GET    /api/admin/stats      - super admin
//! GET    /api/admin/users      - super admin
//! DELETE /api/admin/users/{id} - super admin
//! POST   /api/admin/users/{id}/subscription/{action} - admin
//! ```

pub mod admin;
pub mod analytics;
pub mod auth;
pub mod catalog;
pub mod discounts;
pub mod health;
pub mod managers;
pub mod me;
pub mod orders;
pub mod plans;
pub mod public;
pub mod stores;
pub mod subscriptions;

use axum::{
    Router,
    routing::{delete, get, patch, post, put},
};
use serde::Deserialize;

use crate::state::AppState;

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 200;

/// `?limit=&offset=` query parameters.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Pagination {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Pagination {
    #[must_use]
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    #[must_use]
    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
}

/// Create the subscription routes router.
pub fn subscription_routes() -> Router<AppState> {
    Router::new()
        .route("/free", post(subscriptions::activate_free))
        .route("/checkout", post(subscriptions::checkout))
        .route("/verify", post(subscriptions::verify))
        .route("/pause", post(subscriptions::pause))
        .route("/resume", post(subscriptions::resume))
        .route("/cancel", post(subscriptions::cancel))
}

/// Create the store routes router.
pub fn store_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(stores::index).post(stores::create))
        .route(
            "/{id}",
            get(stores::show).patch(stores::update).delete(stores::destroy),
        )
        .route("/{id}/domain", put(stores::set_domain))
        .route("/{id}/publish", post(stores::publish))
        .route(
            "/{id}/products",
            get(catalog::list_products).post(catalog::create_product),
        )
        .route(
            "/{id}/products/{product_id}",
            patch(catalog::update_product).delete(catalog::delete_product),
        )
        .route(
            "/{id}/categories",
            get(catalog::list_categories).post(catalog::create_category),
        )
        .route(
            "/{id}/categories/{category_id}",
            delete(catalog::delete_category),
        )
        .route("/{id}/discounts", get(discounts::index).post(discounts::create))
        .route(
            "/{id}/discounts/{discount_id}",
            patch(discounts::update).delete(discounts::destroy),
        )
        .route("/{id}/orders", get(orders::index))
        .route("/{id}/orders/{order_id}", patch(orders::update_status))
        .route("/{id}/analytics", get(analytics::show))
        .route("/{id}/managers", get(managers::index).post(managers::invite))
        .route(
            "/{id}/managers/{manager_id}",
            patch(managers::update).delete(managers::destroy),
        )
}

/// Create the public storefront routes router.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/stores/{slug}", get(public::store))
        .route(
            "/stores/{slug}/discounts/validate",
            post(public::validate_discount),
        )
        .route("/stores/{slug}/orders", post(public::place_order))
}

/// Create the platform staff routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/stats", get(admin::stats))
        .route("/users", get(admin::users))
        .route("/users/{id}", delete(admin::delete_user))
        .route(
            "/users/{id}/subscription/{action}",
            post(admin::manage_subscription),
        )
}

/// Create all routes for the API.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api/auth", auth_routes())
        .route("/api/me", get(me::show))
        .route("/api/me/features/{feature}", get(me::feature))
        .route("/api/invitations", get(managers::invitations))
        .route("/api/invitations/{id}/accept", post(managers::accept))
        .route("/api/invitations/{id}/decline", post(managers::decline))
        .route("/api/plans", get(plans::index))
        .nest("/api/subscriptions", subscription_routes())
        .route("/api/webhooks/razorpay", post(subscriptions::razorpay_webhook))
        .nest("/api/stores", store_routes())
        .nest("/api/public", public_routes())
        .nest("/api/admin", admin_routes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults_and_clamps() {
        let page = Pagination::default();
        assert_eq!(page.limit(), DEFAULT_PAGE_SIZE);
        assert_eq!(page.offset(), 0);

        let page = Pagination {
            limit: Some(10_000),
            offset: Some(-5),
        };
        assert_eq!(page.limit(), MAX_PAGE_SIZE);
        assert_eq!(page.offset(), 0);

        let page = Pagination {
            limit: Some(0),
            offset: Some(20),
        };
        assert_eq!(page.limit(), 1);
        assert_eq!(page.offset(), 20);
    }
}
