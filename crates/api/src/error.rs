//! Unified error handling with Sentry integration.
//!
//! Every handler returns `Result<T, AppError>`. Server-side failures are
//! captured to Sentry before the response is built; clients only ever see a
//! stable error code and a safe message:
//!
//! ```json
//! {"error": "not_found", "message": "store not found"}
//! {"error": "upgrade_required", "reason": "plan allows at most 1 stores"}
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use bizshop_core::LimitError;
use bizshop_core::authz::AuthzError;
use bizshop_core::discount::DiscountError;
use bizshop_core::entitlements::UnknownFeature;
use bizshop_core::fees::FeeError;
use bizshop_core::plans::CatalogError;
use bizshop_core::subscription::SubscriptionError;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::razorpay::RazorpayError;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Payment gateway call or signature check failed.
    #[error("Gateway error: {0}")]
    Gateway(#[from] RazorpayError),

    /// Resource not found, or hidden from the caller.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not allowed.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Invalid input.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The caller's plan does not cover this, or a cap was reached.
    #[error("Upgrade required: {reason}")]
    Entitlement { code: &'static str, reason: String },

    /// The change collides with current state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// A plan gate that the caller's tier does not pass.
    #[must_use]
    pub fn upgrade_required(reason: impl Into<String>) -> Self {
        Self::Entitlement {
            code: "upgrade_required",
            reason: reason.into(),
        }
    }

    const fn status(&self) -> StatusCode {
        match self {
            Self::Database(err) => match err {
                RepositoryError::NotFound => StatusCode::NOT_FOUND,
                RepositoryError::Conflict(_) => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::UserAlreadyExists => StatusCode::CONFLICT,
                AuthError::WeakPassword(_) | AuthError::InvalidEmail(_) => StatusCode::BAD_REQUEST,
                AuthError::Repository(_) | AuthError::PasswordHash => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Gateway(RazorpayError::InvalidSignature(_)) | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Gateway(_) => StatusCode::BAD_GATEWAY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Entitlement { .. } => StatusCode::PAYMENT_REQUIRED,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self.status() {
            StatusCode::BAD_REQUEST => "validation",
            StatusCode::UNAUTHORIZED => "unauthorized",
            StatusCode::FORBIDDEN => "forbidden",
            StatusCode::NOT_FOUND => "not_found",
            StatusCode::CONFLICT => "conflict",
            StatusCode::BAD_GATEWAY => "gateway",
            StatusCode::PAYMENT_REQUIRED => match self {
                Self::Entitlement { code, .. } => *code,
                _ => "upgrade_required",
            },
            _ => "internal",
        }
    }

    /// Message safe to show to clients.
    fn public_message(&self) -> String {
        match self {
            Self::Database(RepositoryError::NotFound) => "not found".to_string(),
            Self::Database(RepositoryError::Conflict(msg))
            | Self::NotFound(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::BadRequest(msg)
            | Self::Conflict(msg) => msg.clone(),
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => "Invalid credentials".to_string(),
                AuthError::UserAlreadyExists => {
                    "An account with this email already exists".to_string()
                }
                AuthError::WeakPassword(msg) => msg.clone(),
                AuthError::InvalidEmail(_) => "Invalid email address".to_string(),
                AuthError::Repository(_) | AuthError::PasswordHash => {
                    "Internal server error".to_string()
                }
            },
            Self::Gateway(RazorpayError::InvalidSignature(_)) => {
                "Payment signature verification failed".to_string()
            }
            Self::Gateway(_) => "Payment gateway error".to_string(),
            Self::Entitlement { reason, .. } => reason.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let body = match &self {
            Self::Entitlement { code, reason } => json!({ "error": code, "reason": reason }),
            _ => json!({ "error": self.code(), "message": self.public_message() }),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(RepositoryError::Database(err))
    }
}

impl From<LimitError> for AppError {
    fn from(err: LimitError) -> Self {
        Self::upgrade_required(err.to_string())
    }
}

impl From<AuthzError> for AppError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::NoAccess => Self::NotFound("store not found".to_string()),
            other => Self::Forbidden(other.to_string()),
        }
    }
}

impl From<DiscountError> for AppError {
    fn from(err: DiscountError) -> Self {
        match err {
            DiscountError::Inactive
            | DiscountError::NotStarted
            | DiscountError::Expired
            | DiscountError::UsageLimitReached => Self::Entitlement {
                code: "discount_unavailable",
                reason: err.to_string(),
            },
            DiscountError::InvalidValue(_) | DiscountError::InvalidCode(_) => {
                Self::BadRequest(err.to_string())
            }
        }
    }
}

impl From<SubscriptionError> for AppError {
    fn from(err: SubscriptionError) -> Self {
        match err {
            SubscriptionError::FreePlanNotPayable => Self::BadRequest(err.to_string()),
            _ => Self::Conflict(err.to_string()),
        }
    }
}

impl From<FeeError> for AppError {
    fn from(err: FeeError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<UnknownFeature> for AppError {
    fn from(err: UnknownFeature) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(err: tower_sessions::session::Error) -> Self {
        Self::Internal(format!("session error: {err}"))
    }
}

/// Set the Sentry user context.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bizshop_core::LimitKind;
    use bizshop_core::authz::StoreAction;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    async fn body_json(err: AppError) -> serde_json::Value {
        let response = err.into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("store-123".to_string());
        assert_eq!(err.to_string(), "Not found: store-123");
    }

    #[test]
    fn test_status_per_class() {
        assert_eq!(
            get_status(AppError::BadRequest("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Unauthorized("x".into())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Forbidden("x".into())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::upgrade_required("x")),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            get_status(AppError::Database(RepositoryError::Conflict("x".into()))),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::Database(RepositoryError::NotFound)),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Gateway(RazorpayError::InvalidSignature("x".into()))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Gateway(RazorpayError::Request("x".into()))),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(AppError::Internal("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_authz_errors_map_to_not_found_or_forbidden() {
        assert_eq!(
            get_status(AuthzError::NoAccess.into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AuthzError::OwnerOnly(StoreAction::Delete).into()),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AuthzError::SuperAdminRequired.into()),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_discount_errors() {
        assert_eq!(
            get_status(DiscountError::UsageLimitReached.into()),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            get_status(DiscountError::InvalidCode("?".into()).into()),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_subscription_errors() {
        assert_eq!(
            get_status(SubscriptionError::RequiresNewSubscription.into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(SubscriptionError::FreePlanNotPayable.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(SubscriptionError::RecurringSubscriptionActive.into()),
            StatusCode::CONFLICT
        );
    }

    #[tokio::test]
    async fn test_limit_error_body() {
        let err: AppError = LimitError {
            kind: LimitKind::Stores,
            limit: 1,
        }
        .into();
        let body = body_json(err).await;
        assert_eq!(body["error"], "upgrade_required");
        assert_eq!(body["reason"], "plan allows at most 1 stores");
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let body = body_json(AppError::Internal("pool exhausted".into())).await;
        assert_eq!(body["error"], "internal");
        assert_eq!(body["message"], "Internal server error");
    }

    #[tokio::test]
    async fn test_validation_body() {
        let body = body_json(AppError::BadRequest("price must be positive".into())).await;
        assert_eq!(body["error"], "validation");
        assert_eq!(body["message"], "price must be positive");
    }
}
