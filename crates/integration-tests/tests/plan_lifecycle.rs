//! A seller's plan over time: trial, upgrade, managers, commission, lapse.

#![allow(clippy::unwrap_used)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;

use bizshop_core::authz::{
    Access, AuthzError, ManagerGrant, Principal, StoreAction, StoreContext, authorize,
    resolve_access,
};
use bizshop_core::entitlements::capabilities_for;
use bizshop_core::fees;
use bizshop_core::subscription::{
    Outcome, SubscriptionError, SubscriptionEvent, SubscriptionState, VerifiedPayment, apply,
};
use bizshop_core::{
    LimitKind, ManagerPermissions, ManagerStatus, PlanTier, Price, Role, StoreId,
    SubscriptionStatus, UserId,
};

fn signup() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 1, 9, 0, 0).unwrap()
}

fn charge(plan: PlanTier, payment_id: &str, period_end: DateTime<Utc>) -> SubscriptionEvent {
    SubscriptionEvent::PaymentVerified(VerifiedPayment {
        plan,
        payment_id: payment_id.to_owned(),
        gateway_subscription_id: Some("sub_seller".to_owned()),
        period_end: Some(period_end),
    })
}

fn manager_access(owner_plan: PlanTier) -> Access {
    resolve_access(
        Principal {
            user_id: UserId::new(2),
            role: Role::User,
        },
        StoreContext {
            store_id: StoreId::new(10),
            owner_id: UserId::new(1),
            owner_plan,
        },
        Some(ManagerGrant {
            permissions: ManagerPermissions::all(),
            status: ManagerStatus::Accepted,
        }),
    )
}

fn inr(amount: i64) -> Price {
    Price::inr(Decimal::new(amount, 0))
}

#[test]
fn test_trial_upgrade_then_cancel_at_period_end_then_expire() {
    let t0 = signup();
    let trial = SubscriptionState::new_trial(t0, 14);
    assert_eq!(trial.status, SubscriptionStatus::Trial);
    assert!(trial.max_products().check(9, LimitKind::Products).is_ok());
    assert!(trial.max_products().check(10, LimitKind::Products).is_err());

    let period_end = t0 + Duration::days(30);
    let active = apply(&trial, &charge(PlanTier::Premium, "pay_1", period_end), t0)
        .unwrap()
        .state;
    assert_eq!(active.status, SubscriptionStatus::Active);
    assert!(active.auto_renewal);
    assert!(active.max_products().check(100_000, LimitKind::Products).is_ok());

    // the same payment delivered again changes nothing
    let replay = apply(&active, &charge(PlanTier::Premium, "pay_1", period_end), t0).unwrap();
    assert_eq!(replay.outcome, Outcome::Unchanged);

    let cancelled = apply(
        &active,
        &SubscriptionEvent::Cancel { at_period_end: true },
        t0 + Duration::days(3),
    )
    .unwrap()
    .state;
    assert_eq!(cancelled.status, SubscriptionStatus::Cancelled);
    assert_eq!(cancelled.plan, PlanTier::Premium);
    assert!(cancelled.cancel_at_period_end);

    let early = apply(&cancelled, &SubscriptionEvent::Expire, t0 + Duration::days(10));
    assert_eq!(early, Err(SubscriptionError::NotDue));

    let expired = apply(&cancelled, &SubscriptionEvent::Expire, period_end)
        .unwrap()
        .state;
    assert_eq!(expired.status, SubscriptionStatus::Expired);
    assert_eq!(expired.plan, PlanTier::Free);
}

#[test]
fn test_manager_access_follows_owner_plan() {
    let premium = manager_access(PlanTier::Premium);
    assert!(authorize(premium, StoreAction::ManageProducts).is_ok());
    assert_eq!(
        authorize(premium, StoreAction::Delete),
        Err(AuthzError::OwnerOnly(StoreAction::Delete))
    );

    // after a downgrade the stored grant is inert
    let downgraded = manager_access(PlanTier::Free);
    assert_eq!(
        authorize(downgraded, StoreAction::View),
        Err(AuthzError::NoAccess)
    );
    assert!(authorize(downgraded, StoreAction::ManageProducts).is_err());
}

#[test]
fn test_manager_cap_by_plan() {
    assert_eq!(capabilities_for(PlanTier::Premium).max_managers, 3);
    assert_eq!(capabilities_for(PlanTier::Lifetime).max_managers, 3);
    assert_eq!(capabilities_for(PlanTier::Pro).max_managers, 0);

    let cap = capabilities_for(PlanTier::Premium).manager_limit();
    assert!(cap.check(2, LimitKind::Managers).is_ok());
    let err = cap.check(3, LimitKind::Managers).unwrap_err();
    assert_eq!(err.limit, 3);
}

#[test]
fn test_commission_drops_with_plan() {
    let total = inr(1000);
    let on = |plan| fees::calculate(total, plan).unwrap();

    assert_eq!(on(PlanTier::Free).transaction_fee, Decimal::new(50, 0));
    assert_eq!(on(PlanTier::Basic).transaction_fee, Decimal::new(30, 0));
    assert_eq!(on(PlanTier::Pro).transaction_fee, Decimal::new(10, 0));
    assert_eq!(on(PlanTier::Premium).transaction_fee, Decimal::ZERO);

    for plan in [PlanTier::Free, PlanTier::Basic, PlanTier::Pro, PlanTier::Lifetime] {
        let split = on(plan);
        assert_eq!(split.transaction_fee + split.merchant_payout, total.amount);
    }
}

#[test]
fn test_lifetime_purchase_never_lapses() {
    let t0 = signup();
    let trial = SubscriptionState::new_trial(t0, 14);
    let lifetime = apply(
        &trial,
        &SubscriptionEvent::PaymentVerified(VerifiedPayment {
            plan: PlanTier::Lifetime,
            payment_id: "pay_once".to_owned(),
            gateway_subscription_id: None,
            period_end: None,
        }),
        t0,
    )
    .unwrap()
    .state;
    assert_eq!(lifetime.status, SubscriptionStatus::Active);
    assert!(!lifetime.auto_renewal);

    let years_later = t0 + Duration::days(3650);
    assert_eq!(
        apply(&lifetime, &SubscriptionEvent::Expire, years_later),
        Err(SubscriptionError::NotDue)
    );
    assert!(matches!(
        apply(&lifetime, &SubscriptionEvent::Pause, years_later),
        Err(SubscriptionError::NotRecurring)
    ));
}
