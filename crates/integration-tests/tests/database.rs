//! Repository and service behavior against a live database.
//!
//! Set `BIZSHOP_TEST_DATABASE_URL` (or `DATABASE_URL`) to a scratch database
//! and run with `--ignored`. Migrations are applied on connect; every test
//! creates its own users and stores.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::json;
use sqlx::PgPool;

use bizshop_api::db::{DiscountRepository, StoreRepository, UserRepository, discounts, stores};
use bizshop_api::error::AppError;
use bizshop_api::models::{NewStore, OwnedStore, User};
use bizshop_api::services::ManagerService;
use bizshop_api::services::subscriptions::{LedgerEntry, apply_event};
use bizshop_core::discount::DiscountRules;
use bizshop_core::subscription::{Outcome, SubscriptionEvent, SubscriptionState, VerifiedPayment};
use bizshop_core::{DiscountType, Email, ManagerPermissions, PlanTier, SubscriptionStatus};

async fn pool() -> PgPool {
    let url = std::env::var("BIZSHOP_TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .expect("BIZSHOP_TEST_DATABASE_URL or DATABASE_URL must be set");
    let pool = PgPool::connect(&url).await.expect("Failed to connect");
    sqlx::migrate!("../api/migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

fn unique(prefix: &str) -> String {
    format!(
        "{prefix}-{}",
        Utc::now().timestamp_nanos_opt().unwrap_or_default()
    )
}

async fn user(pool: &PgPool, plan: PlanTier) -> User {
    let email = Email::parse(&format!("{}@example.com", unique("user"))).unwrap();
    let mut state = SubscriptionState::new_trial(Utc::now(), 14);
    if plan != PlanTier::Free {
        state.plan = plan;
        state.status = SubscriptionStatus::Active;
        state.trial_ends_at = None;
    }
    UserRepository::new(pool)
        .create(&email, "not-a-real-hash", None, &state)
        .await
        .expect("Failed to create user")
}

async fn store(pool: &PgPool, owner: &User) -> OwnedStore {
    let slug = unique("store");
    let new = NewStore {
        name: "Chai Corner".to_owned(),
        slug: Some(slug.clone()),
        description: None,
        primary_color: None,
        secondary_color: None,
        font_family: None,
        logo_url: None,
        shipping_fee_inr: Decimal::ZERO,
    };
    let mut conn = pool.acquire().await.unwrap();
    let created = stores::insert(&mut conn, owner.id, &slug, &new)
        .await
        .expect("Failed to create store");
    StoreRepository::new(pool)
        .get(created.id)
        .await
        .unwrap()
        .expect("store just created")
}

// ============================================================================
// Discount usage
// ============================================================================

#[tokio::test]
#[ignore = "Requires PostgreSQL (BIZSHOP_TEST_DATABASE_URL)"]
async fn test_consume_counts_each_use_once() {
    let pool = pool().await;
    let owner = user(&pool, PlanTier::Basic).await;
    let store = store(&pool, &owner).await;
    let rules = DiscountRules {
        discount_type: DiscountType::FixedAmount,
        value: Decimal::from(50),
        usage_limit: Some(2),
        usage_count: 0,
        starts_at: None,
        expires_at: None,
        is_active: true,
    };
    let repo = DiscountRepository::new(&pool);
    let code = repo
        .create(store.store.id, &unique("SAVE").to_uppercase(), &rules)
        .await
        .unwrap();

    let mut conn = pool.acquire().await.unwrap();
    assert!(discounts::consume(&mut conn, code.id).await.unwrap());
    let after_one = repo.get(store.store.id, code.id).await.unwrap().unwrap();
    assert_eq!(after_one.usage_count, 1);

    assert!(discounts::consume(&mut conn, code.id).await.unwrap());
    assert!(!discounts::consume(&mut conn, code.id).await.unwrap());
    let exhausted = repo.get(store.store.id, code.id).await.unwrap().unwrap();
    assert_eq!(exhausted.usage_count, 2);
}

// ============================================================================
// Payment ledger
// ============================================================================

#[tokio::test]
#[ignore = "Requires PostgreSQL (BIZSHOP_TEST_DATABASE_URL)"]
async fn test_payment_verified_then_webhook_applies_once() {
    let pool = pool().await;
    let buyer = user(&pool, PlanTier::Free).await;
    let payment_id = unique("pay");
    let subscription_id = unique("sub");
    let event = || {
        SubscriptionEvent::PaymentVerified(VerifiedPayment {
            plan: PlanTier::Pro,
            payment_id: payment_id.clone(),
            gateway_subscription_id: Some(subscription_id.clone()),
            period_end: Some(Utc::now() + chrono::Duration::days(30)),
        })
    };

    let verified = apply_event(
        &pool,
        buyer.id,
        event(),
        Some(LedgerEntry {
            key: payment_id.clone(),
            kind: "checkout.verified",
            payload: json!({ "plan": "pro" }),
        }),
    )
    .await
    .unwrap();
    assert_eq!(verified.outcome, Outcome::Applied);
    assert_eq!(verified.user.subscription_plan, PlanTier::Pro);

    let replayed = apply_event(
        &pool,
        buyer.id,
        event(),
        Some(LedgerEntry {
            key: payment_id.clone(),
            kind: "webhook",
            payload: json!({ "event": "subscription.charged" }),
        }),
    )
    .await
    .unwrap();
    assert_eq!(replayed.outcome, Outcome::Unchanged);
    assert_eq!(replayed.user.subscription(), verified.user.subscription());
}

// ============================================================================
// Store managers
// ============================================================================

#[tokio::test]
#[ignore = "Requires PostgreSQL (BIZSHOP_TEST_DATABASE_URL)"]
async fn test_fourth_manager_invite_is_rejected() {
    let pool = pool().await;
    let owner = user(&pool, PlanTier::Premium).await;
    let store = store(&pool, &owner).await;
    let service = ManagerService::new(&pool);

    for _ in 0..3 {
        let invitee = user(&pool, PlanTier::Free).await;
        service
            .invite(&store, owner.id, invitee.email.as_str(), ManagerPermissions::all())
            .await
            .unwrap();
    }

    let fourth = user(&pool, PlanTier::Free).await;
    let err = service
        .invite(&store, owner.id, fourth.email.as_str(), ManagerPermissions::all())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Entitlement {
            code: "upgrade_required",
            ..
        }
    ));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (BIZSHOP_TEST_DATABASE_URL)"]
async fn test_pro_owner_cannot_invite_managers() {
    let pool = pool().await;
    let owner = user(&pool, PlanTier::Pro).await;
    let store = store(&pool, &owner).await;
    let invitee = user(&pool, PlanTier::Free).await;

    let err = ManagerService::new(&pool)
        .invite(&store, owner.id, invitee.email.as_str(), ManagerPermissions::none())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Entitlement { .. }));
}
