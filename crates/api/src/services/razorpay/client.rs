//! Razorpay REST API client.
//!
//! Covers the subscription lifecycle (create, fetch, pause, resume, cancel)
//! and one-time orders. Requests authenticate with HTTP basic auth using the
//! key id and key secret.

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, error, instrument};

use super::RazorpayError;
use super::signature;
use super::types::{CreateOrder, CreateSubscription, ErrorResponse, Notes, Order, Payment, Subscription};
use crate::config::RazorpayConfig;

/// Razorpay API base URL.
const RAZORPAY_API_BASE: &str = "https://api.razorpay.com/v1";

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Monthly cycles before a recurring subscription completes (ten years).
const SUBSCRIPTION_TOTAL_COUNT: u32 = 120;

/// Razorpay API client.
#[derive(Clone)]
pub struct RazorpayClient {
    client: Client,
    key_id: String,
    key_secret: SecretString,
    webhook_secret: SecretString,
}

impl std::fmt::Debug for RazorpayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RazorpayClient")
            .field("key_id", &self.key_id)
            .field("key_secret", &"[REDACTED]")
            .field("webhook_secret", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl RazorpayClient {
    #[must_use]
    pub fn new(config: &RazorpayConfig) -> Self {
        Self {
            client: Client::new(),
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
            webhook_secret: config.webhook_secret.clone(),
        }
    }

    /// Public key id, handed to the checkout widget.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    // =========================================================================
    // Signatures
    // =========================================================================

    /// # Errors
    ///
    /// Returns `RazorpayError::InvalidSignature` on mismatch.
    pub fn verify_subscription_payment(
        &self,
        payment_id: &str,
        subscription_id: &str,
        signature: &str,
    ) -> Result<(), RazorpayError> {
        signature::verify_subscription_payment(
            &self.key_secret,
            payment_id,
            subscription_id,
            signature,
        )
    }

    /// # Errors
    ///
    /// Returns `RazorpayError::InvalidSignature` on mismatch.
    pub fn verify_order_payment(
        &self,
        order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<(), RazorpayError> {
        signature::verify_order_payment(&self.key_secret, order_id, payment_id, signature)
    }

    /// # Errors
    ///
    /// Returns `RazorpayError::InvalidSignature` on mismatch.
    pub fn verify_webhook(&self, body: &[u8], signature: &str) -> Result<(), RazorpayError> {
        signature::verify_webhook(&self.webhook_secret, body, signature)
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    /// Create a monthly subscription on a Razorpay plan.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, notes))]
    pub async fn create_subscription(
        &self,
        plan_id: &str,
        notes: Notes,
    ) -> Result<Subscription, RazorpayError> {
        let body = CreateSubscription {
            plan_id,
            total_count: SUBSCRIPTION_TOTAL_COUNT,
            customer_notify: 1,
            notes,
        };
        let subscription: Subscription = self
            .send(self.client.post(format!("{RAZORPAY_API_BASE}/subscriptions")).json(&body))
            .await?;
        debug!(subscription_id = %subscription.id, "Razorpay subscription created");
        Ok(subscription)
    }

    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn fetch_subscription(&self, id: &str) -> Result<Subscription, RazorpayError> {
        self.send(self.client.get(format!("{RAZORPAY_API_BASE}/subscriptions/{id}")))
            .await
    }

    /// Pause collection immediately.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn pause_subscription(&self, id: &str) -> Result<Subscription, RazorpayError> {
        self.send(
            self.client
                .post(format!("{RAZORPAY_API_BASE}/subscriptions/{id}/pause"))
                .json(&json!({ "pause_at": "now" })),
        )
        .await
    }

    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn resume_subscription(&self, id: &str) -> Result<Subscription, RazorpayError> {
        self.send(
            self.client
                .post(format!("{RAZORPAY_API_BASE}/subscriptions/{id}/resume"))
                .json(&json!({ "resume_at": "now" })),
        )
        .await
    }

    /// Cancel now, or at the end of the current billing cycle.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn cancel_subscription(
        &self,
        id: &str,
        at_cycle_end: bool,
    ) -> Result<Subscription, RazorpayError> {
        self.send(
            self.client
                .post(format!("{RAZORPAY_API_BASE}/subscriptions/{id}/cancel"))
                .json(&json!({ "cancel_at_cycle_end": u8::from(at_cycle_end) })),
        )
        .await
    }

    // =========================================================================
    // Orders and payments
    // =========================================================================

    /// Create a one-time INR order.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, notes))]
    pub async fn create_order(
        &self,
        amount_paise: u64,
        receipt: String,
        notes: Notes,
    ) -> Result<Order, RazorpayError> {
        let body = CreateOrder {
            amount: amount_paise,
            currency: "INR",
            receipt,
            notes,
        };
        let order: Order = self
            .send(self.client.post(format!("{RAZORPAY_API_BASE}/orders")).json(&body))
            .await?;
        debug!(order_id = %order.id, "Razorpay order created");
        Ok(order)
    }

    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn fetch_order(&self, id: &str) -> Result<Order, RazorpayError> {
        self.send(self.client.get(format!("{RAZORPAY_API_BASE}/orders/{id}")))
            .await
    }

    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn fetch_payment(&self, id: &str) -> Result<Payment, RazorpayError> {
        self.send(self.client.get(format!("{RAZORPAY_API_BASE}/payments/{id}")))
            .await
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, RazorpayError> {
        let response = request
            .basic_auth(&self.key_id, Some(self.key_secret.expose_secret()))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| RazorpayError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorResponse>()
                .await
                .ok()
                .and_then(|body| body.error.description.or(body.error.code))
                .unwrap_or_else(|| status.to_string());
            error!(status = status.as_u16(), message = %message, "Razorpay API error");
            return Err(RazorpayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| RazorpayError::Response(e.to_string()))
    }
}
