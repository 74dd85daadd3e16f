//! Subscription state machine.
//!
//! ```text
//! trial ──pay──▶ active ◀──resume── paused
//!   │              │ └────pause─────▶ │
//!   │              ▼                  │
//!   ├──cancel──▶ cancelled ◀──cancel──┘
//!   │              │ (at period end)
//!   └──expire──▶ expired ◀──expire──┘
//! ```
//!
//! [`apply`] is pure: it takes the current state, an event and the clock and
//! returns the next state. Persisting it (and re-deriving entitlements from the
//! new plan) is the caller's job. Duplicate gateway deliveries of the same
//! payment resolve to [`Outcome::Unchanged`].
//!
//! While a recurring gateway subscription is live the plan cannot be switched
//! (to free, another recurring plan or lifetime); it has to be cancelled first
//! so the gateway stops charging.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::plans::PlanTier;
use crate::types::{Limit, SubscriptionStatus};

/// Subscription-related fields of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionState {
    #[serde(rename = "subscriptionPlan")]
    pub plan: PlanTier,
    #[serde(rename = "subscriptionStatus")]
    pub status: SubscriptionStatus,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub subscription_expires_at: Option<DateTime<Utc>>,
    pub auto_renewal: bool,
    pub cancel_at_period_end: bool,
    pub gateway_subscription_id: Option<String>,
    pub last_payment_id: Option<String>,
}

impl SubscriptionState {
    /// State of a freshly registered user: a free-plan trial.
    #[must_use]
    pub fn new_trial(now: DateTime<Utc>, trial_days: i64) -> Self {
        Self {
            plan: PlanTier::Free,
            status: SubscriptionStatus::Trial,
            trial_ends_at: Some(now + Duration::days(trial_days)),
            subscription_expires_at: None,
            auto_renewal: false,
            cancel_at_period_end: false,
            gateway_subscription_id: None,
            last_payment_id: None,
        }
    }

    /// Product cap dictated by the current plan.
    #[must_use]
    pub fn max_products(&self) -> Limit {
        self.plan.definition().max_products
    }

    /// Store cap dictated by the current plan.
    #[must_use]
    pub fn max_stores(&self) -> Limit {
        self.plan.definition().max_stores
    }

    /// Whether a recurring gateway subscription is still charging this user.
    #[must_use]
    pub const fn is_billing(&self) -> bool {
        matches!(
            self.status,
            SubscriptionStatus::Active | SubscriptionStatus::Paused
        ) && self.gateway_subscription_id.is_some()
    }

    fn reset_to_free(&mut self) {
        self.plan = PlanTier::Free;
        self.auto_renewal = false;
        self.cancel_at_period_end = false;
        self.gateway_subscription_id = None;
    }
}

/// A payment whose gateway signature has already been verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedPayment {
    /// Tier the payment was for.
    pub plan: PlanTier,
    /// Gateway payment id; the idempotency key.
    pub payment_id: String,
    /// Recurring subscription the payment belongs to; `None` for one-time orders.
    pub gateway_subscription_id: Option<String>,
    /// End of the paid period; `None` for purchases that never lapse.
    pub period_end: Option<DateTime<Utc>>,
}

/// Something that can move a subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionEvent {
    /// Switch to the free plan; needs no payment.
    ActivateFree,
    /// A verified checkout or renewal payment.
    PaymentVerified(VerifiedPayment),
    /// Pause the recurring subscription.
    Pause,
    /// Resume a paused subscription.
    Resume,
    /// Cancel, either now or when the paid period ends.
    Cancel { at_period_end: bool },
    /// Time-based lapse of a trial or unrenewed period.
    Expire,
}

impl SubscriptionEvent {
    /// Short name for logs and errors.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ActivateFree => "activate_free",
            Self::PaymentVerified(_) => "payment_verified",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Cancel { .. } => "cancel",
            Self::Expire => "expire",
        }
    }
}

/// Whether a transition changed anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Applied,
    /// The event was already reflected in the state (e.g. duplicate webhook).
    Unchanged,
}

/// Result of a successful [`apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: SubscriptionState,
    pub outcome: Outcome,
}

impl Transition {
    const fn applied(state: SubscriptionState) -> Self {
        Self {
            state,
            outcome: Outcome::Applied,
        }
    }

    fn unchanged(state: &SubscriptionState) -> Self {
        Self {
            state: state.clone(),
            outcome: Outcome::Unchanged,
        }
    }
}

/// Rejected transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscriptionError {
    /// The event is not valid from the current status.
    #[error("cannot {event} a subscription that is {from}")]
    InvalidTransition {
        from: SubscriptionStatus,
        event: &'static str,
    },
    /// A cancelled subscription can only be reactivated by a new gateway subscription.
    #[error("cancelled subscriptions can only be reactivated with a new subscription")]
    RequiresNewSubscription,
    /// Payments are never taken for the free plan.
    #[error("the free plan does not take payments")]
    FreePlanNotPayable,
    /// A live recurring subscription must be cancelled before switching plans.
    #[error("cancel the current recurring subscription before changing plans")]
    RecurringSubscriptionActive,
    /// Pause/resume only applies to recurring gateway subscriptions.
    #[error("no recurring subscription to pause or resume")]
    NotRecurring,
    /// Expiry requested before the relevant date (or with auto-renewal on).
    #[error("subscription is not due to expire")]
    NotDue,
}

/// Compute the next state for `event`.
///
/// # Errors
///
/// Returns a [`SubscriptionError`] when the event is not allowed from the
/// current state; the caller must leave the stored state untouched.
pub fn apply(
    state: &SubscriptionState,
    event: &SubscriptionEvent,
    now: DateTime<Utc>,
) -> Result<Transition, SubscriptionError> {
    use SubscriptionStatus::{Active, Cancelled, Expired, Paused, Trial};

    let invalid = || SubscriptionError::InvalidTransition {
        from: state.status,
        event: event.name(),
    };

    match event {
        SubscriptionEvent::ActivateFree => match state.status {
            Active if state.plan == PlanTier::Free => Ok(Transition::unchanged(state)),
            Active if state.is_billing() => Err(SubscriptionError::RecurringSubscriptionActive),
            Trial | Active | Expired => {
                let mut next = state.clone();
                next.reset_to_free();
                next.status = Active;
                next.subscription_expires_at = None;
                Ok(Transition::applied(next))
            }
            Paused | Cancelled => Err(invalid()),
        },

        SubscriptionEvent::PaymentVerified(payment) => {
            if state.last_payment_id.as_deref() == Some(payment.payment_id.as_str()) {
                return Ok(Transition::unchanged(state));
            }
            if payment.plan == PlanTier::Free {
                return Err(SubscriptionError::FreePlanNotPayable);
            }
            match state.status {
                Paused => return Err(invalid()),
                Active
                    if state.is_billing()
                        && payment.gateway_subscription_id != state.gateway_subscription_id =>
                {
                    return Err(SubscriptionError::RecurringSubscriptionActive);
                }
                Cancelled
                    if payment.gateway_subscription_id.is_some()
                        && payment.gateway_subscription_id == state.gateway_subscription_id =>
                {
                    return Err(SubscriptionError::RequiresNewSubscription);
                }
                Trial | Active | Cancelled | Expired => {}
            }

            let mut next = state.clone();
            next.plan = payment.plan;
            next.status = Active;
            next.subscription_expires_at = payment.period_end;
            next.auto_renewal = payment.gateway_subscription_id.is_some();
            next.cancel_at_period_end = false;
            next.gateway_subscription_id.clone_from(&payment.gateway_subscription_id);
            next.last_payment_id = Some(payment.payment_id.clone());
            Ok(Transition::applied(next))
        }

        SubscriptionEvent::Pause => match state.status {
            Paused => Ok(Transition::unchanged(state)),
            Active if state.gateway_subscription_id.is_none() => {
                Err(SubscriptionError::NotRecurring)
            }
            Active => {
                let mut next = state.clone();
                next.status = Paused;
                Ok(Transition::applied(next))
            }
            Trial | Cancelled | Expired => Err(invalid()),
        },

        SubscriptionEvent::Resume => match state.status {
            Active => Ok(Transition::unchanged(state)),
            Paused => {
                let mut next = state.clone();
                next.status = Active;
                Ok(Transition::applied(next))
            }
            Trial | Cancelled | Expired => Err(invalid()),
        },

        SubscriptionEvent::Cancel { at_period_end } => match state.status {
            Cancelled => Ok(Transition::unchanged(state)),
            Expired => Err(invalid()),
            Trial | Active | Paused => {
                let mut next = state.clone();
                next.status = Cancelled;
                next.auto_renewal = false;
                let period_running = state.subscription_expires_at.is_some_and(|end| end > now);
                if *at_period_end && period_running {
                    next.cancel_at_period_end = true;
                } else {
                    let gateway_id = next.gateway_subscription_id.take();
                    next.reset_to_free();
                    // keep the id so a later payment on it is recognised as stale
                    next.gateway_subscription_id = gateway_id;
                    next.subscription_expires_at = Some(now);
                }
                Ok(Transition::applied(next))
            }
        },

        SubscriptionEvent::Expire => {
            let due = match state.status {
                Expired => return Ok(Transition::unchanged(state)),
                Trial => !state.auto_renewal && state.trial_ends_at.is_some_and(|t| now >= t),
                Active => {
                    !state.auto_renewal && state.subscription_expires_at.is_some_and(|t| now >= t)
                }
                Cancelled => {
                    state.cancel_at_period_end
                        && state.subscription_expires_at.is_some_and(|t| now >= t)
                }
                Paused => false,
            };
            if !due {
                return Err(SubscriptionError::NotDue);
            }
            let mut next = state.clone();
            next.reset_to_free();
            next.status = Expired;
            Ok(Transition::applied(next))
        }
    }
}
