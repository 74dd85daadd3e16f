//! Subscription routes and the Razorpay webhook.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use serde_json::{Value, json};

use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::models::UserResponse;
use crate::services::SubscriptionService;
use crate::services::subscriptions::{
    CancelRequest, CheckoutRequest, CheckoutSession, ManualAction, VerifyPayment,
};
use crate::state::AppState;

const SIGNATURE_HEADER: &str = "x-razorpay-signature";
const EVENT_ID_HEADER: &str = "x-razorpay-event-id";

/// POST /api/subscriptions/free
///
/// # Errors
///
/// 409 when the current status cannot move to the free plan.
pub async fn activate_free(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<UserResponse>> {
    let user = SubscriptionService::new(&state).activate_free(&user).await?;
    Ok(Json(UserResponse::from(&user)))
}

/// POST /api/subscriptions/checkout
///
/// # Errors
///
/// 400 for unknown or free plans, 502 if Razorpay fails.
pub async fn checkout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<CheckoutSession>> {
    let session = SubscriptionService::new(&state)
        .checkout(&user, &request.plan)
        .await?;
    Ok(Json(session))
}

/// POST /api/subscriptions/verify
///
/// # Errors
///
/// 400 on a bad signature, 409 when the state machine rejects the payment.
pub async fn verify(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(callback): Json<VerifyPayment>,
) -> Result<Json<UserResponse>> {
    let user = SubscriptionService::new(&state).verify(&user, &callback).await?;
    Ok(Json(UserResponse::from(&user)))
}

/// POST /api/subscriptions/pause
///
/// # Errors
///
/// 409 unless an active recurring subscription exists.
pub async fn pause(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<UserResponse>> {
    let user = SubscriptionService::new(&state)
        .manage(user.id, ManualAction::Pause)
        .await?;
    Ok(Json(UserResponse::from(&user)))
}

/// POST /api/subscriptions/resume
///
/// # Errors
///
/// 409 unless the subscription is paused.
pub async fn resume(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<UserResponse>> {
    let user = SubscriptionService::new(&state)
        .manage(user.id, ManualAction::Resume)
        .await?;
    Ok(Json(UserResponse::from(&user)))
}

/// POST /api/subscriptions/cancel
///
/// An empty body cancels immediately.
///
/// # Errors
///
/// 409 for expired subscriptions.
pub async fn cancel(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    request: Option<Json<CancelRequest>>,
) -> Result<Json<UserResponse>> {
    let at_period_end = request.is_some_and(|Json(request)| request.at_period_end);
    let user = SubscriptionService::new(&state)
        .manage(user.id, ManualAction::Cancel { at_period_end })
        .await?;
    Ok(Json(UserResponse::from(&user)))
}

/// POST /api/webhooks/razorpay
///
/// The raw body is needed for the signature, so it is taken as bytes.
///
/// # Errors
///
/// 400 for a missing or bad signature and malformed bodies.
pub async fn razorpay_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>)> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    let outcome = SubscriptionService::new(&state)
        .webhook(&body, header(SIGNATURE_HEADER), header(EVENT_ID_HEADER))
        .await?;

    Ok((StatusCode::OK, Json(json!({ "status": outcome }))))
}
