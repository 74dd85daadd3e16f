//! User account types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use bizshop_core::authz::Principal;
use bizshop_core::entitlements::{Capabilities, capabilities_for};
use bizshop_core::subscription::SubscriptionState;
use bizshop_core::{Email, Limit, PlanTier, Role, SubscriptionStatus, UserId};

/// A BizShop account, as stored in `users`.
///
/// Never serialized directly; use [`UserResponse`].
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub name: Option<String>,
    pub email_verified: bool,
    pub role: Role,
    pub subscription_plan: PlanTier,
    pub subscription_status: SubscriptionStatus,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub subscription_expires_at: Option<DateTime<Utc>>,
    pub auto_renewal: bool,
    pub cancel_at_period_end: bool,
    pub gateway_subscription_id: Option<String>,
    pub last_payment_id: Option<String>,
    pub max_products: Limit,
    pub max_stores: Limit,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// The subscription fields as state-machine input.
    #[must_use]
    pub fn subscription(&self) -> SubscriptionState {
        SubscriptionState {
            plan: self.subscription_plan,
            status: self.subscription_status,
            trial_ends_at: self.trial_ends_at,
            subscription_expires_at: self.subscription_expires_at,
            auto_renewal: self.auto_renewal,
            cancel_at_period_end: self.cancel_at_period_end,
            gateway_subscription_id: self.gateway_subscription_id.clone(),
            last_payment_id: self.last_payment_id.clone(),
        }
    }

    #[must_use]
    pub const fn principal(&self) -> Principal {
        Principal {
            user_id: self.id,
            role: self.role,
        }
    }

    /// Capabilities of the current plan, recomputed on every call.
    #[must_use]
    pub const fn capabilities(&self) -> Capabilities {
        capabilities_for(self.subscription_plan)
    }

    /// Display name, falling back to the email's local part.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or_else(|| {
            self.email
                .as_str()
                .split_once('@')
                .map_or(self.email.as_str(), |(local, _)| local)
        })
    }
}

/// A user row joined with its password hash, for login.
#[derive(Debug, sqlx::FromRow)]
pub struct UserWithPassword {
    #[sqlx(flatten)]
    pub user: User,
    pub password_hash: String,
}

/// Public view of a user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: UserId,
    pub email: String,
    pub name: Option<String>,
    pub email_verified: bool,
    pub role: Role,
    pub is_admin: bool,
    pub subscription_plan: PlanTier,
    pub subscription_status: SubscriptionStatus,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub subscription_expires_at: Option<DateTime<Utc>>,
    pub auto_renewal: bool,
    pub cancel_at_period_end: bool,
    pub max_products: Limit,
    pub max_stores: Limit,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.as_str().to_owned(),
            name: user.name.clone(),
            email_verified: user.email_verified,
            role: user.role,
            is_admin: user.role.is_admin(),
            subscription_plan: user.subscription_plan,
            subscription_status: user.subscription_status,
            trial_ends_at: user.trial_ends_at,
            subscription_expires_at: user.subscription_expires_at,
            auto_renewal: user.auto_renewal,
            cancel_at_period_end: user.cancel_at_period_end,
            max_products: user.max_products,
            max_stores: user.max_stores,
            created_at: user.created_at,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod fixtures {
    use super::*;

    /// A seller fresh out of registration.
    pub fn seller(id: i32, plan: PlanTier) -> User {
        let now = Utc::now();
        let definition = plan.definition();
        User {
            id: UserId::new(id),
            email: Email::parse(&format!("seller{id}@shop.in")).unwrap(),
            name: None,
            email_verified: false,
            role: Role::User,
            subscription_plan: plan,
            subscription_status: SubscriptionStatus::Active,
            trial_ends_at: None,
            subscription_expires_at: None,
            auto_renewal: false,
            cancel_at_period_end: false,
            gateway_subscription_id: None,
            last_payment_id: None,
            max_products: definition.max_products,
            max_stores: definition.max_stores,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::fixtures::seller;
    use super::*;

    #[test]
    fn test_response_exposes_is_admin_and_limits() {
        let mut user = seller(7, PlanTier::Premium);
        user.role = Role::SuperAdmin;

        let json = serde_json::to_value(UserResponse::from(&user)).unwrap();
        assert_eq!(json["isAdmin"], true);
        assert_eq!(json["subscriptionPlan"], "premium");
        assert_eq!(json["maxProducts"], -1);
        assert_eq!(json["maxStores"], 5);
        assert!(json.get("passwordHash").is_none());
    }

    #[test]
    fn test_display_name_falls_back_to_local_part() {
        let mut user = seller(3, PlanTier::Free);
        assert_eq!(user.display_name(), "seller3");
        user.name = Some("Asha".to_owned());
        assert_eq!(user.display_name(), "Asha");
    }

    #[test]
    fn test_subscription_roundtrips_user_fields() {
        let mut user = seller(1, PlanTier::Basic);
        user.gateway_subscription_id = Some("sub_1".to_owned());
        let state = user.subscription();
        assert_eq!(state.plan, PlanTier::Basic);
        assert_eq!(state.gateway_subscription_id.as_deref(), Some("sub_1"));
        assert_eq!(state.max_products(), user.max_products);
    }
}
