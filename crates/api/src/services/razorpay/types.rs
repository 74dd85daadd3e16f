//! Razorpay request and response types.
//!
//! Only the fields BizShop reads are modelled. Razorpay sends `notes` as an
//! empty array when no notes were set, so it stays a raw JSON value.

use serde::{Deserialize, Serialize};

/// Body of `POST /v1/subscriptions`.
#[derive(Debug, Serialize)]
pub struct CreateSubscription<'a> {
    pub plan_id: &'a str,
    /// Billing cycles before the subscription completes.
    pub total_count: u32,
    pub customer_notify: u8,
    pub notes: Notes,
}

/// Body of `POST /v1/orders`.
#[derive(Debug, Serialize)]
pub struct CreateOrder {
    /// Amount in paise.
    pub amount: u64,
    pub currency: &'static str,
    pub receipt: String,
    pub notes: Notes,
}

/// Notes BizShop attaches to everything it creates.
#[derive(Debug, Clone, Serialize)]
pub struct Notes {
    pub user_id: String,
    pub plan: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub plan_id: String,
    pub status: String,
    /// End of the current billing cycle, unix seconds.
    #[serde(default)]
    pub current_end: Option<i64>,
    #[serde(default)]
    pub notes: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Order {
    pub id: String,
    /// Amount in paise.
    pub amount: u64,
    pub currency: String,
    pub status: String,
    #[serde(default)]
    pub notes: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Payment {
    pub id: String,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub subscription_id: Option<String>,
    pub amount: u64,
    pub status: String,
    #[serde(default)]
    pub notes: serde_json::Value,
}

/// Razorpay error body.
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// A webhook delivery.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    #[serde(default)]
    pub payload: WebhookPayload,
    #[serde(default)]
    pub created_at: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub subscription: Option<Entity<Subscription>>,
    #[serde(default)]
    pub payment: Option<Entity<Payment>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Entity<T> {
    pub entity: T,
}

impl WebhookEvent {
    #[must_use]
    pub fn subscription(&self) -> Option<&Subscription> {
        self.payload.subscription.as_ref().map(|e| &e.entity)
    }

    #[must_use]
    pub fn payment(&self) -> Option<&Payment> {
        self.payload.payment.as_ref().map(|e| &e.entity)
    }
}

/// Read a string note, tolerating the empty-array form.
#[must_use]
pub fn note<'a>(notes: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    notes.get(key).and_then(serde_json::Value::as_str)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_subscription_charged_webhook() {
        let body = r#"{
            "entity": "event",
            "event": "subscription.charged",
            "payload": {
                "subscription": {"entity": {
                    "id": "sub_N1", "plan_id": "plan_bizshop_pro_monthly",
                    "status": "active", "current_end": 1767225600,
                    "notes": {"user_id": "7", "plan": "pro"}
                }},
                "payment": {"entity": {
                    "id": "pay_P1", "amount": 79900, "status": "captured",
                    "subscription_id": "sub_N1", "notes": []
                }}
            },
            "created_at": 1764547200
        }"#;
        let event: WebhookEvent = serde_json::from_str(body).unwrap();
        assert_eq!(event.event, "subscription.charged");
        let sub = event.subscription().unwrap();
        assert_eq!(sub.current_end, Some(1_767_225_600));
        assert_eq!(note(&sub.notes, "user_id"), Some("7"));
        let payment = event.payment().unwrap();
        assert_eq!(payment.id, "pay_P1");
        assert_eq!(note(&payment.notes, "user_id"), None);
    }

    #[test]
    fn test_parse_event_without_payload() {
        let event: WebhookEvent = serde_json::from_str(r#"{"event": "refund.created"}"#).unwrap();
        assert!(event.subscription().is_none());
        assert!(event.payment().is_none());
    }
}
