//! Email/password authentication routes.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use tower_sessions::Session;

use crate::error::Result;
use crate::middleware::{log_in, log_out};
use crate::models::UserResponse;
use crate::services::{AuthService, Notification};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Create an account on a free-plan trial and log it in.
///
/// POST /api/auth/register
///
/// # Errors
///
/// 400 for an invalid email or weak password, 409 if the email is taken.
#[tracing::instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    let trial_days = state.config().trial_days;
    let user = AuthService::new(state.pool(), trial_days)
        .register(&request.email, &request.password, request.name.as_deref())
        .await?;

    log_in(&session, &user).await?;
    state.notify(Notification::welcome(&user, trial_days));

    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
}

/// POST /api/auth/login
///
/// # Errors
///
/// 401 for unknown emails and wrong passwords alike.
#[tracing::instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<LoginRequest>,
) -> Result<Json<UserResponse>> {
    let user = AuthService::new(state.pool(), state.config().trial_days)
        .login(&request.email, &request.password)
        .await?;

    log_in(&session, &user).await?;
    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(UserResponse::from(&user)))
}

/// POST /api/auth/logout
///
/// # Errors
///
/// 500 if the session store cannot be reached.
pub async fn logout(session: Session) -> Result<StatusCode> {
    log_out(&session).await?;
    Ok(StatusCode::NO_CONTENT)
}
