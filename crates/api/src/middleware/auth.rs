//! Authentication extractor and session helpers.
//!
//! The session carries only the user id. [`CurrentUser`] re-reads the user
//! row on every request so plan changes, role changes and deletions take
//! effect immediately.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use bizshop_core::UserId;

use crate::db::UserRepository;
use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::models::{User, session_keys};
use crate::state::AppState;

/// Extractor that requires a logged-in user.
///
/// Rejects with 401 when there is no session or the user no longer exists.
///
/// # Example
///
/// ```rust,ignore
/// async fn me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
///     Json(UserResponse::from(&user))
/// }
/// ```
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let unauthorized = || AppError::Unauthorized("login required".to_string());

        let session = parts
            .extensions
            .get::<Session>()
            .ok_or_else(unauthorized)?;

        let user_id: UserId = session
            .get(session_keys::USER_ID)
            .await?
            .ok_or_else(unauthorized)?;

        let user = UserRepository::new(state.pool())
            .get_by_id(user_id)
            .await?
            .ok_or_else(unauthorized)?;

        set_sentry_user(&user.id, Some(user.email.as_str()));
        tracing::Span::current().record("user_id", user.id.as_i32());

        Ok(Self(user))
    }
}

/// Start an authenticated session for `user`.
///
/// The session id is rotated first to prevent fixation.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn log_in(session: &Session, user: &User) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::USER_ID, user.id).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(())
}

/// End the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be flushed.
pub async fn log_out(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await?;
    clear_sentry_user();
    Ok(())
}
