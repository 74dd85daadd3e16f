//! Subscription lifecycle: checkout, verification, webhooks and manual actions.
//!
//! Every change goes through [`apply_event`], which records the gateway event
//! in the `payment_events` ledger, locks the user row, runs the state machine
//! and persists the result guarded by the previous status, all in one
//! transaction. A ledger key that is already present short-circuits to the
//! current state, so verify callbacks and webhooks for the same payment never
//! apply twice.

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use tracing::{info, instrument, warn};

use bizshop_core::plans::{Billing, PlanTier, lookup_by_razorpay_plan};
use bizshop_core::subscription::{
    self, Outcome, SubscriptionError, SubscriptionEvent, SubscriptionState, VerifiedPayment,
};
use bizshop_core::{SubscriptionStatus, UserId};

use crate::db::{RepositoryError, UserRepository, payments, users};
use crate::error::AppError;
use crate::models::User;
use crate::services::email::Notification;
use crate::services::razorpay::types::{Payment, Subscription, note};
use crate::services::razorpay::{Notes, RazorpayError, WebhookEvent};
use crate::state::AppState;

// =============================================================================
// Requests and responses
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    pub plan: String,
}

/// What the browser needs to open Razorpay checkout.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    pub key_id: String,
    pub plan: PlanTier,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

/// Checkout callback as posted back by the browser.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyPayment {
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
    #[serde(default)]
    pub razorpay_subscription_id: Option<String>,
    #[serde(default)]
    pub razorpay_order_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRequest {
    #[serde(default)]
    pub at_period_end: bool,
}

/// A manual action on a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManualAction {
    Pause,
    Resume,
    Cancel { at_period_end: bool },
}

impl ManualAction {
    const fn event(self) -> SubscriptionEvent {
        match self {
            Self::Pause => SubscriptionEvent::Pause,
            Self::Resume => SubscriptionEvent::Resume,
            Self::Cancel { at_period_end } => SubscriptionEvent::Cancel { at_period_end },
        }
    }
}

/// Result of running one event through the ledger and the state machine.
#[derive(Debug, Clone)]
pub struct Applied {
    pub user: User,
    pub previous: SubscriptionState,
    pub outcome: Outcome,
}

/// A gateway event to record before applying.
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub key: String,
    pub kind: &'static str,
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookOutcome {
    Applied,
    Unchanged,
    Ignored,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpirySummary {
    pub expired: Vec<UserId>,
    pub skipped: usize,
}

// =============================================================================
// Ledger + state machine
// =============================================================================

/// Apply `event` to a user's subscription.
///
/// # Errors
///
/// Returns `AppError` for rejected transitions, unknown users, a concurrent
/// status change, or database failures. Nothing is written on error.
#[instrument(skip(pool, event, ledger), fields(event = event.name()))]
pub async fn apply_event(
    pool: &PgPool,
    user_id: UserId,
    event: SubscriptionEvent,
    ledger: Option<LedgerEntry>,
) -> Result<Applied, AppError> {
    let mut tx = pool.begin().await?;

    let first_delivery = match &ledger {
        Some(entry) => {
            payments::record(&mut tx, &entry.key, entry.kind, Some(user_id), &entry.payload)
                .await?
        }
        None => true,
    };

    let user = users::lock(&mut tx, user_id).await?;
    let previous = user.subscription();
    let Some(next) = decide(&previous, &event, Utc::now(), first_delivery)? else {
        tx.commit().await?;
        if let Some(entry) = ledger.as_ref().filter(|_| !first_delivery) {
            info!(%user_id, key = %entry.key, "Gateway event already recorded");
        }
        return Ok(Applied {
            user,
            previous,
            outcome: Outcome::Unchanged,
        });
    };

    let updated = users::update_subscription(&mut tx, user_id, previous.status, &next).await?;
    tx.commit().await?;

    info!(
        %user_id,
        from_status = %previous.status,
        to_status = %updated.subscription_status,
        plan = %updated.subscription_plan,
        "Subscription updated"
    );

    Ok(Applied {
        user: updated,
        previous,
        outcome: Outcome::Applied,
    })
}

/// The state `event` moves `previous` to, or `None` when nothing changes.
///
/// A ledger key that was already recorded is never applied twice, whichever
/// path (checkout callback or webhook) delivered it first.
fn decide(
    previous: &SubscriptionState,
    event: &SubscriptionEvent,
    now: DateTime<Utc>,
    first_delivery: bool,
) -> Result<Option<SubscriptionState>, SubscriptionError> {
    if !first_delivery {
        return Ok(None);
    }
    let transition = subscription::apply(previous, event, now)?;
    Ok((transition.outcome == Outcome::Applied).then_some(transition.state))
}

/// Expire every trial or period that lapsed before `now`.
///
/// # Errors
///
/// Returns `AppError::Database` if the candidate query fails; per-user
/// failures are logged and counted as skipped.
#[instrument(skip(pool))]
pub async fn expire_due(
    pool: &PgPool,
    now: DateTime<Utc>,
    dry_run: bool,
) -> Result<ExpirySummary, AppError> {
    let candidates = UserRepository::new(pool).list_due_for_expiry(now).await?;
    let mut summary = ExpirySummary::default();

    for user in candidates {
        if dry_run {
            match subscription::apply(&user.subscription(), &SubscriptionEvent::Expire, now) {
                Ok(_) => summary.expired.push(user.id),
                Err(_) => summary.skipped += 1,
            }
            continue;
        }

        match apply_event(pool, user.id, SubscriptionEvent::Expire, None).await {
            Ok(applied) if applied.outcome == Outcome::Applied => summary.expired.push(user.id),
            Ok(_) => summary.skipped += 1,
            Err(e) => {
                warn!(user_id = %user.id, error = %e, "Skipping expiry");
                summary.skipped += 1;
            }
        }
    }

    info!(
        expired = summary.expired.len(),
        skipped = summary.skipped,
        dry_run,
        "Expiry sweep finished"
    );
    Ok(summary)
}

// =============================================================================
// Service
// =============================================================================

pub struct SubscriptionService<'a> {
    state: &'a AppState,
}

impl<'a> SubscriptionService<'a> {
    #[must_use]
    pub const fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    /// Switch to the free plan.
    ///
    /// # Errors
    ///
    /// `AppError::Conflict` when the current status does not allow it.
    pub async fn activate_free(&self, user: &User) -> Result<User, AppError> {
        let applied =
            apply_event(self.state.pool(), user.id, SubscriptionEvent::ActivateFree, None).await?;
        if applied.outcome == Outcome::Applied {
            self.state.notify(Notification::activated(&applied.user));
        }
        Ok(applied.user)
    }

    /// Create the gateway object the browser pays against.
    ///
    /// # Errors
    ///
    /// `AppError::BadRequest` for unknown or free plans, `AppError::Conflict`
    /// while paused or while a recurring subscription is still billing,
    /// `AppError::Gateway` if Razorpay rejects the call.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn checkout(&self, user: &User, plan: &str) -> Result<CheckoutSession, AppError> {
        let plan: PlanTier = plan.parse()?;
        let definition = plan.definition();
        check_checkout(&user.subscription())?;

        let razorpay = self.state.razorpay();
        let notes = Notes {
            user_id: user.id.to_string(),
            plan: plan.as_str().to_owned(),
        };

        match definition.billing {
            Billing::Free => Err(SubscriptionError::FreePlanNotPayable.into()),
            Billing::Recurring => {
                let plan_id = definition.razorpay_plan_id.ok_or_else(|| {
                    AppError::Internal(format!("plan {plan} has no Razorpay plan id"))
                })?;
                let created = razorpay.create_subscription(plan_id, notes).await?;
                info!(subscription_id = %created.id, %plan, "Checkout started");
                Ok(CheckoutSession {
                    key_id: razorpay.key_id().to_owned(),
                    plan,
                    subscription_id: Some(created.id),
                    order_id: None,
                    amount: None,
                    currency: None,
                })
            }
            Billing::OneTime => {
                let receipt = format!("user_{}_{}_{}", user.id, plan, Utc::now().timestamp());
                let order = razorpay
                    .create_order(amount_paise(plan), receipt, notes)
                    .await?;
                info!(order_id = %order.id, %plan, "Checkout started");
                Ok(CheckoutSession {
                    key_id: razorpay.key_id().to_owned(),
                    plan,
                    subscription_id: None,
                    order_id: Some(order.id),
                    amount: Some(order.amount),
                    currency: Some(order.currency),
                })
            }
        }
    }

    /// Verify a checkout callback and activate the paid plan.
    ///
    /// The signature is checked first; the plan and period are then read
    /// back from the gateway rather than trusted from the browser.
    ///
    /// # Errors
    ///
    /// `AppError::Gateway` on a bad signature or gateway failure,
    /// `AppError::Forbidden` when the gateway object belongs to someone else.
    #[instrument(skip(self, user, callback), fields(user_id = %user.id))]
    pub async fn verify(&self, user: &User, callback: &VerifyPayment) -> Result<User, AppError> {
        let razorpay = self.state.razorpay();
        let payment_id = callback.razorpay_payment_id.as_str();

        let payment = match (
            callback.razorpay_subscription_id.as_deref(),
            callback.razorpay_order_id.as_deref(),
        ) {
            (Some(subscription_id), _) => {
                razorpay
                    .verify_subscription_payment(
                        payment_id,
                        subscription_id,
                        &callback.razorpay_signature,
                    )
                    .inspect_err(|_| log_bad_signature(user.id, "subscription"))?;
                let gateway = razorpay.fetch_subscription(subscription_id).await?;
                check_owner(&gateway.notes, user.id)?;
                recurring_payment(&gateway, payment_id.to_owned(), Utc::now())?
            }
            (None, Some(order_id)) => {
                razorpay
                    .verify_order_payment(order_id, payment_id, &callback.razorpay_signature)
                    .inspect_err(|_| log_bad_signature(user.id, "order"))?;
                let order = razorpay.fetch_order(order_id).await?;
                check_owner(&order.notes, user.id)?;
                let plan = one_time_plan(&order.notes, order.amount)?;
                VerifiedPayment {
                    plan,
                    payment_id: payment_id.to_owned(),
                    gateway_subscription_id: None,
                    period_end: None,
                }
            }
            (None, None) => {
                return Err(AppError::BadRequest(
                    "razorpay_subscription_id or razorpay_order_id is required".to_owned(),
                ));
            }
        };

        let ledger = LedgerEntry {
            key: payment.payment_id.clone(),
            kind: "checkout.verified",
            payload: json!({
                "plan": payment.plan,
                "subscriptionId": payment.gateway_subscription_id,
                "orderId": callback.razorpay_order_id,
            }),
        };
        let applied = apply_event(
            self.state.pool(),
            user.id,
            SubscriptionEvent::PaymentVerified(payment),
            Some(ledger),
        )
        .await?;

        self.notify_change(&applied);
        Ok(applied.user)
    }

    /// Pause, resume or cancel `user_id`'s subscription.
    ///
    /// The transition is checked before the gateway is called, so a rejected
    /// action never reaches Razorpay.
    ///
    /// # Errors
    ///
    /// `AppError::NotFound` for unknown users, `AppError::Conflict` for
    /// rejected transitions, `AppError::Gateway` if Razorpay fails.
    #[instrument(skip(self))]
    pub async fn manage(&self, user_id: UserId, action: ManualAction) -> Result<User, AppError> {
        let user = UserRepository::new(self.state.pool())
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("user not found".to_owned()))?;

        let event = action.event();
        let dry_run = subscription::apply(&user.subscription(), &event, Utc::now())?;
        if dry_run.outcome == Outcome::Unchanged {
            return Ok(user);
        }

        let gateway_id = user.gateway_subscription_id.as_deref();
        if let Some(gateway_id) = gateway_id {
            let razorpay = self.state.razorpay();
            match action {
                ManualAction::Pause => {
                    razorpay.pause_subscription(gateway_id).await?;
                }
                ManualAction::Resume => {
                    razorpay.resume_subscription(gateway_id).await?;
                }
                ManualAction::Cancel { at_period_end } => {
                    razorpay.cancel_subscription(gateway_id, at_period_end).await?;
                }
            }
        }

        let applied = apply_event(self.state.pool(), user_id, event, None)
            .await
            .inspect_err(|e| {
                if let Some(gateway_id) = gateway_id {
                    warn!(
                        target: "security",
                        %user_id,
                        subscription_id = %gateway_id,
                        ?action,
                        error = %e,
                        "Gateway subscription changed but local update failed"
                    );
                }
            })?;
        self.notify_change(&applied);
        Ok(applied.user)
    }

    /// Handle a signed Razorpay webhook delivery.
    ///
    /// Only a missing or bad signature and an unparseable body are errors.
    /// Events for unknown users or that the state machine rejects are logged
    /// and acknowledged, so Razorpay stops retrying them.
    ///
    /// # Errors
    ///
    /// `AppError::Gateway` for signature failures, `AppError::BadRequest` for
    /// malformed bodies, `AppError::Database` for storage failures.
    #[instrument(skip_all)]
    pub async fn webhook(
        &self,
        body: &[u8],
        signature: Option<&str>,
        event_id: Option<&str>,
    ) -> Result<WebhookOutcome, AppError> {
        let Some(signature) = signature else {
            warn!(target: "security", "Webhook without signature rejected");
            return Err(RazorpayError::InvalidSignature("missing signature".to_owned()).into());
        };
        self.state
            .razorpay()
            .verify_webhook(body, signature)
            .inspect_err(|_| warn!(target: "security", "Webhook signature mismatch"))?;

        let event: WebhookEvent = serde_json::from_slice(body)
            .map_err(|e| AppError::BadRequest(format!("invalid webhook body: {e}")))?;

        let Some(mapped) = map_webhook(&event, Utc::now()) else {
            info!(event = %event.event, "Ignoring webhook event");
            return Ok(WebhookOutcome::Ignored);
        };

        let user_id = match &mapped.target {
            Target::User(user_id) => *user_id,
            Target::Subscription(gateway_id) => {
                match UserRepository::new(self.state.pool())
                    .find_by_gateway_subscription(gateway_id)
                    .await?
                {
                    Some(user) => user.id,
                    None => {
                        warn!(event = %event.event, subscription_id = %gateway_id, "Webhook for unknown subscription");
                        return Ok(WebhookOutcome::Ignored);
                    }
                }
            }
        };

        let key = match &mapped.event {
            SubscriptionEvent::PaymentVerified(payment) => payment.payment_id.clone(),
            _ => event_id.map_or_else(|| body_digest(body), |id| format!("evt:{id}")),
        };
        let ledger = LedgerEntry {
            key,
            kind: "webhook",
            payload: serde_json::from_slice(body).unwrap_or(serde_json::Value::Null),
        };

        match apply_event(self.state.pool(), user_id, mapped.event, Some(ledger)).await {
            Ok(applied) => {
                self.notify_change(&applied);
                Ok(match applied.outcome {
                    Outcome::Applied => WebhookOutcome::Applied,
                    Outcome::Unchanged => WebhookOutcome::Unchanged,
                })
            }
            Err(AppError::Database(RepositoryError::NotFound)) => {
                warn!(event = %event.event, %user_id, "Webhook for unknown user");
                Ok(WebhookOutcome::Ignored)
            }
            Err(AppError::Conflict(reason)) => {
                warn!(event = %event.event, %user_id, %reason, "Webhook event rejected");
                Ok(WebhookOutcome::Ignored)
            }
            Err(e) => Err(e),
        }
    }

    fn notify_change(&self, applied: &Applied) {
        if applied.outcome != Outcome::Applied {
            return;
        }
        let user = &applied.user;
        match user.subscription_status {
            SubscriptionStatus::Active
                if applied.previous.status != SubscriptionStatus::Active
                    || applied.previous.plan != user.subscription_plan =>
            {
                self.state.notify(Notification::activated(user));
            }
            SubscriptionStatus::Cancelled => {
                self.state
                    .notify(Notification::cancelled(user, applied.previous.plan));
            }
            _ => {}
        }
    }
}

// =============================================================================
// Gateway object helpers
// =============================================================================

/// Whether `state` may start a new checkout.
fn check_checkout(state: &SubscriptionState) -> Result<(), AppError> {
    if state.status == SubscriptionStatus::Paused {
        return Err(AppError::Conflict(
            "resume the paused subscription before changing plans".to_owned(),
        ));
    }
    if state.is_billing() {
        return Err(SubscriptionError::RecurringSubscriptionActive.into());
    }
    Ok(())
}

fn amount_paise(plan: PlanTier) -> u64 {
    u64::from(plan.definition().price_inr) * 100
}

fn log_bad_signature(user_id: UserId, kind: &str) {
    warn!(target: "security", %user_id, kind, "Payment signature verification failed");
}

fn check_owner(notes: &serde_json::Value, user_id: UserId) -> Result<(), AppError> {
    if note(notes, "user_id") == Some(user_id.to_string().as_str()) {
        Ok(())
    } else {
        warn!(target: "security", %user_id, "Checkout object belongs to another user");
        Err(AppError::Forbidden("payment does not belong to this account".to_owned()))
    }
}

/// The paid period of a recurring subscription, defaulting to one month.
fn period_end(subscription: &Subscription, now: DateTime<Utc>) -> DateTime<Utc> {
    subscription
        .current_end
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .or_else(|| now.checked_add_months(Months::new(1)))
        .unwrap_or(now)
}

fn recurring_payment(
    subscription: &Subscription,
    payment_id: String,
    now: DateTime<Utc>,
) -> Result<VerifiedPayment, AppError> {
    let plan = lookup_by_razorpay_plan(&subscription.plan_id)?.id;
    Ok(VerifiedPayment {
        plan,
        payment_id,
        gateway_subscription_id: Some(subscription.id.clone()),
        period_end: Some(period_end(subscription, now)),
    })
}

/// The one-time plan an order paid for; the amount must match the catalog.
fn one_time_plan(notes: &serde_json::Value, amount: u64) -> Result<PlanTier, AppError> {
    let plan: PlanTier = note(notes, "plan")
        .ok_or_else(|| AppError::BadRequest("order has no plan".to_owned()))?
        .parse()?;
    if plan.definition().billing != Billing::OneTime {
        return Err(AppError::BadRequest(format!("{plan} is not a one-time plan")));
    }
    if amount != amount_paise(plan) {
        warn!(target: "security", %plan, amount, "Order amount does not match plan price");
        return Err(AppError::BadRequest("order amount does not match plan".to_owned()));
    }
    Ok(plan)
}

fn body_digest(body: &[u8]) -> String {
    format!("sha256:{}", hex::encode(Sha256::digest(body)))
}

// =============================================================================
// Webhook mapping
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    /// Resolve through `users.gateway_subscription_id`.
    Subscription(String),
    User(UserId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct MappedEvent {
    target: Target,
    event: SubscriptionEvent,
}

/// Translate a Razorpay event into a state machine event.
///
/// Returns `None` for events that do not move a subscription.
fn map_webhook(webhook: &WebhookEvent, now: DateTime<Utc>) -> Option<MappedEvent> {
    let on_subscription = |event: SubscriptionEvent| {
        webhook.subscription().map(|s| MappedEvent {
            target: Target::Subscription(s.id.clone()),
            event,
        })
    };

    match webhook.event.as_str() {
        "subscription.charged" => {
            let subscription = webhook.subscription()?;
            let payment = webhook.payment()?;
            let verified = recurring_payment(subscription, payment.id.clone(), now).ok()?;
            Some(MappedEvent {
                target: Target::Subscription(subscription.id.clone()),
                event: SubscriptionEvent::PaymentVerified(verified),
            })
        }
        "subscription.paused" => on_subscription(SubscriptionEvent::Pause),
        "subscription.resumed" => on_subscription(SubscriptionEvent::Resume),
        "subscription.cancelled" | "subscription.halted" | "subscription.completed" => {
            on_subscription(SubscriptionEvent::Cancel {
                at_period_end: false,
            })
        }
        "payment.captured" => lifetime_payment(webhook.payment()?),
        _ => None,
    }
}

/// A captured payment for a one-time order, identified by its notes.
fn lifetime_payment(payment: &Payment) -> Option<MappedEvent> {
    if payment.subscription_id.is_some() || payment.order_id.is_none() {
        return None;
    }
    let plan = one_time_plan(&payment.notes, payment.amount).ok()?;
    let user_id = note(&payment.notes, "user_id")?.parse::<i32>().ok()?;
    Some(MappedEvent {
        target: Target::User(UserId::new(user_id)),
        event: SubscriptionEvent::PaymentVerified(VerifiedPayment {
            plan,
            payment_id: payment.id.clone(),
            gateway_subscription_id: None,
            period_end: None,
        }),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 1, 12, 0, 0).unwrap()
    }

    fn pro_plan_id() -> &'static str {
        PlanTier::Pro.definition().razorpay_plan_id.unwrap()
    }

    fn webhook(value: serde_json::Value) -> WebhookEvent {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_charged_maps_to_verified_payment() {
        let event = webhook(json!({
            "event": "subscription.charged",
            "payload": {
                "subscription": { "entity": {
                    "id": "sub_1", "plan_id": pro_plan_id(), "status": "active",
                    "current_end": 1_793_000_000, "notes": {}
                }},
                "payment": { "entity": {
                    "id": "pay_1", "subscription_id": "sub_1", "amount": 99_900,
                    "status": "captured", "notes": {}
                }}
            }
        }));

        let mapped = map_webhook(&event, now()).unwrap();
        assert_eq!(mapped.target, Target::Subscription("sub_1".to_owned()));
        let SubscriptionEvent::PaymentVerified(payment) = mapped.event else {
            panic!("expected a payment");
        };
        assert_eq!(payment.plan, PlanTier::Pro);
        assert_eq!(payment.payment_id, "pay_1");
        assert_eq!(payment.gateway_subscription_id.as_deref(), Some("sub_1"));
        assert_eq!(payment.period_end, DateTime::from_timestamp(1_793_000_000, 0));
    }

    #[test]
    fn test_charged_on_unknown_plan_is_ignored() {
        let event = webhook(json!({
            "event": "subscription.charged",
            "payload": {
                "subscription": { "entity": {
                    "id": "sub_1", "plan_id": "plan_unknown", "status": "active"
                }},
                "payment": { "entity": { "id": "pay_1", "amount": 1, "status": "captured" }}
            }
        }));
        assert!(map_webhook(&event, now()).is_none());
    }

    #[test]
    fn test_lifecycle_events() {
        let with = |name: &str| {
            webhook(json!({
                "event": name,
                "payload": { "subscription": { "entity": {
                    "id": "sub_9", "plan_id": pro_plan_id(), "status": "x"
                }}}
            }))
        };

        assert_eq!(
            map_webhook(&with("subscription.paused"), now()).unwrap().event,
            SubscriptionEvent::Pause
        );
        assert_eq!(
            map_webhook(&with("subscription.resumed"), now()).unwrap().event,
            SubscriptionEvent::Resume
        );
        for name in ["subscription.cancelled", "subscription.halted", "subscription.completed"] {
            assert_eq!(
                map_webhook(&with(name), now()).unwrap().event,
                SubscriptionEvent::Cancel {
                    at_period_end: false
                }
            );
        }
        assert!(map_webhook(&with("subscription.authenticated"), now()).is_none());
    }

    #[test]
    fn test_lifetime_capture_targets_user_from_notes() {
        let amount = amount_paise(PlanTier::Lifetime);
        let event = webhook(json!({
            "event": "payment.captured",
            "payload": { "payment": { "entity": {
                "id": "pay_life", "order_id": "order_1", "amount": amount,
                "status": "captured", "notes": { "user_id": "42", "plan": "lifetime" }
            }}}
        }));

        let mapped = map_webhook(&event, now()).unwrap();
        assert_eq!(mapped.target, Target::User(UserId::new(42)));
        assert!(matches!(
            mapped.event,
            SubscriptionEvent::PaymentVerified(VerifiedPayment {
                plan: PlanTier::Lifetime,
                period_end: None,
                ..
            })
        ));
    }

    #[test]
    fn test_underpaid_lifetime_capture_is_ignored() {
        let event = webhook(json!({
            "event": "payment.captured",
            "payload": { "payment": { "entity": {
                "id": "pay_life", "order_id": "order_1", "amount": 100,
                "status": "captured", "notes": { "user_id": "42", "plan": "lifetime" }
            }}}
        }));
        assert!(map_webhook(&event, now()).is_none());
    }

    #[test]
    fn test_subscription_payment_capture_is_left_to_charged() {
        let event = webhook(json!({
            "event": "payment.captured",
            "payload": { "payment": { "entity": {
                "id": "pay_2", "order_id": "order_2", "subscription_id": "sub_1",
                "amount": 99_900, "status": "captured",
                "notes": { "user_id": "42", "plan": "pro" }
            }}}
        }));
        assert!(map_webhook(&event, now()).is_none());
    }

    #[test]
    fn test_one_time_plan_rejects_recurring_tiers() {
        let notes = json!({ "plan": "pro" });
        assert!(matches!(
            one_time_plan(&notes, amount_paise(PlanTier::Pro)),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_period_end_defaults_to_one_month() {
        let subscription = Subscription {
            id: "sub_1".to_owned(),
            plan_id: pro_plan_id().to_owned(),
            status: "authenticated".to_owned(),
            current_end: None,
            notes: serde_json::Value::Null,
        };
        assert_eq!(
            period_end(&subscription, now()),
            Utc.with_ymd_and_hms(2026, 11, 1, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_check_owner() {
        let notes = json!({ "user_id": "7" });
        assert!(check_owner(&notes, UserId::new(7)).is_ok());
        assert!(matches!(
            check_owner(&notes, UserId::new(8)),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn test_body_digest_is_stable() {
        assert_eq!(body_digest(b"{}"), body_digest(b"{}"));
        assert_ne!(body_digest(b"{}"), body_digest(b"[]"));
        assert!(body_digest(b"").starts_with("sha256:"));
    }

    fn verified(plan: PlanTier, payment_id: &str, sub_id: Option<&str>) -> SubscriptionEvent {
        SubscriptionEvent::PaymentVerified(VerifiedPayment {
            plan,
            payment_id: payment_id.to_owned(),
            gateway_subscription_id: sub_id.map(str::to_owned),
            period_end: sub_id.map(|_| now() + chrono::Duration::days(30)),
        })
    }

    #[test]
    fn test_payment_seen_by_callback_is_not_reapplied_by_webhook() {
        let trial = SubscriptionState::new_trial(now(), 14);
        let callback = verified(PlanTier::Pro, "pay_1", Some("sub_1"));
        let active = decide(&trial, &callback, now(), true).unwrap().unwrap();
        assert_eq!(active.status, SubscriptionStatus::Active);
        assert_eq!(active.last_payment_id.as_deref(), Some("pay_1"));

        // The webhook for the same payment hits the ledger key first.
        let webhook = verified(PlanTier::Pro, "pay_1", Some("sub_1"));
        assert_eq!(decide(&active, &webhook, now(), false).unwrap(), None);
        // Even under a different ledger key the stored payment id matches.
        assert_eq!(decide(&active, &webhook, now(), true).unwrap(), None);
    }

    #[test]
    fn test_recorded_event_is_not_rejected_on_redelivery() {
        let trial = SubscriptionState::new_trial(now(), 14);
        assert!(decide(&trial, &SubscriptionEvent::Pause, now(), true).is_err());
        assert_eq!(
            decide(&trial, &SubscriptionEvent::Pause, now(), false).unwrap(),
            None
        );
    }

    #[test]
    fn test_checkout_requires_no_live_recurring_subscription() {
        let trial = SubscriptionState::new_trial(now(), 14);
        assert!(check_checkout(&trial).is_ok());

        let active = decide(&trial, &verified(PlanTier::Pro, "pay_1", Some("sub_1")), now(), true)
            .unwrap()
            .unwrap();
        assert!(matches!(
            check_checkout(&active),
            Err(AppError::Conflict(msg)) if msg.contains("cancel the current recurring")
        ));

        let paused = decide(&active, &SubscriptionEvent::Pause, now(), true)
            .unwrap()
            .unwrap();
        assert!(matches!(
            check_checkout(&paused),
            Err(AppError::Conflict(msg)) if msg.contains("resume")
        ));

        let cancelled = decide(
            &active,
            &SubscriptionEvent::Cancel { at_period_end: false },
            now(),
            true,
        )
        .unwrap()
        .unwrap();
        assert!(check_checkout(&cancelled).is_ok());

        let lifetime = decide(&trial, &verified(PlanTier::Lifetime, "pay_2", None), now(), true)
            .unwrap()
            .unwrap();
        assert!(check_checkout(&lifetime).is_ok());
    }
}
