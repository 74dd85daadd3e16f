//! Integration tests for BizShop.
//!
//! The router is driven in-process with [`tower::ServiceExt::oneshot`]. The
//! pool connects lazily, so requests that never touch the database run
//! without `PostgreSQL`.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p bizshop-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `router` - Routing, auth rejection and response shape
//! - `webhooks` - Razorpay webhook signature handling
//! - `plan_lifecycle` - Plan, fee and subscription rules across crates
//! - `database` - Repository and ledger behavior; needs `PostgreSQL` and
//!   `--ignored`

#![cfg_attr(not(test), forbid(unsafe_code))]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use hmac::{Hmac, Mac};
use secrecy::SecretString;
use serde_json::Value;
use sha2::Sha256;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;
use tower_sessions::{MemoryStore, SessionManagerLayer};

use bizshop_api::config::{ApiConfig, RazorpayConfig};
use bizshop_api::state::AppState;

/// Webhook secret used by [`test_config`].
pub const WEBHOOK_SECRET: &str = "whsec_integration_only_value";

/// Configuration with Razorpay test credentials and email disabled.
#[must_use]
pub fn test_config() -> ApiConfig {
    ApiConfig {
        database_url: SecretString::from("postgres://localhost/bizshop_test"),
        host: std::net::IpAddr::from([127, 0, 0, 1]),
        port: 3000,
        base_url: "http://localhost:3000".to_string(),
        session_secret: SecretString::from("k8Jq2vR9mZ4tW7yB1nC5xF3hL6pD0sGa"),
        razorpay: RazorpayConfig {
            key_id: "rzp_test_integration".to_string(),
            key_secret: SecretString::from("integration_key_value"),
            webhook_secret: SecretString::from(WEBHOOK_SECRET),
        },
        email: None,
        trial_days: 14,
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// Build the full application router over a lazy pool and in-memory sessions.
///
/// # Panics
///
/// Panics if the state cannot be built.
#[must_use]
#[allow(clippy::expect_used)]
pub fn test_app() -> Router {
    let config = test_config();
    let pool = PgPoolOptions::new()
        .connect_lazy("postgres://localhost/bizshop_test")
        .expect("lazy pool");
    let state = AppState::new(config, pool).expect("app state");
    bizshop_api::app(state, SessionManagerLayer::new(MemoryStore::default()))
}

/// Send one request and return the status with the parsed JSON body.
///
/// A non-JSON body is returned as a JSON string.
///
/// # Panics
///
/// Panics if the router fails or the body cannot be read.
#[allow(clippy::expect_used)]
pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.expect("router is infallible");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let body = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, body)
}

/// Hex HMAC-SHA256 of `body` under [`WEBHOOK_SECRET`], as Razorpay sends it.
///
/// # Panics
///
/// Never; HMAC accepts keys of any length.
#[must_use]
#[allow(clippy::expect_used)]
pub fn sign_webhook(body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(WEBHOOK_SECRET.as_bytes()).expect("any key length");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}
