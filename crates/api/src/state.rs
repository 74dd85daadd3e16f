//! Application state shared across handlers.

use std::sync::Arc;

use lettre::transport::smtp::Error as SmtpError;
use sqlx::PgPool;

use crate::config::ApiConfig;
use crate::services::email::{EmailService, Notification};
use crate::services::razorpay::RazorpayClient;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    pool: PgPool,
    razorpay: RazorpayClient,
    email: Option<EmailService>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if SMTP is configured but the relay cannot be set up.
    pub fn new(config: ApiConfig, pool: PgPool) -> Result<Self, SmtpError> {
        let razorpay = RazorpayClient::new(&config.razorpay);
        let email = config
            .email
            .as_ref()
            .map(|email| EmailService::new(email, &config.base_url))
            .transpose()?;

        if email.is_none() {
            tracing::info!("SMTP not configured; notifications will only be logged");
        }

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                razorpay,
                email,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn razorpay(&self) -> &RazorpayClient {
        &self.inner.razorpay
    }

    /// Send a notification in the background.
    ///
    /// Call only after the change it describes is committed. Failures are
    /// logged and never reach the caller.
    pub fn notify(&self, notification: Notification) {
        let Some(email) = self.inner.email.clone() else {
            tracing::debug!(kind = notification.kind(), "Email disabled, skipping notification");
            return;
        };

        tokio::spawn(async move {
            if let Err(e) = email.send(&notification).await {
                tracing::warn!(kind = notification.kind(), error = %e, "Failed to send email");
            }
        });
    }
}
