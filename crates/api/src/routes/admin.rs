//! Platform staff routes.
//!
//! Statistics and account management are for the super admin only; admins
//! may act on subscriptions for support.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use bizshop_core::UserId;
use bizshop_core::authz::{PlatformAction, authorize_platform};

use super::Pagination;
use crate::db::stats::PlatformStats;
use crate::db::{StatsRepository, UserRepository, users};
use crate::error::{AppError, Result};
use crate::middleware::CurrentUser;
use crate::models::{User, UserResponse};
use crate::services::SubscriptionService;
use crate::services::subscriptions::{CancelRequest, ManualAction};
use crate::state::AppState;

fn require(user: &User, action: PlatformAction) -> Result<()> {
    authorize_platform(user.role, action).inspect_err(|e| {
        tracing::warn!(target: "security", user_id = %user.id, error = %e, "Platform action denied");
    })?;
    Ok(())
}

/// GET /api/admin/stats
///
/// # Errors
///
/// 403 for anyone but the super admin.
pub async fn stats(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<PlatformStats>> {
    require(&user, PlatformAction::ViewStatistics)?;
    Ok(Json(StatsRepository::new(state.pool()).platform().await?))
}

/// GET /api/admin/users?limit=&offset=
///
/// # Errors
///
/// 403 for anyone but the super admin.
pub async fn users(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<UserResponse>>> {
    require(&user, PlatformAction::ManageUsers)?;
    let users = UserRepository::new(state.pool())
        .list(page.limit(), page.offset())
        .await?;
    Ok(Json(users.iter().map(UserResponse::from).collect()))
}

/// Delete an account with all its stores.
///
/// DELETE /api/admin/users/{id}
///
/// # Errors
///
/// 403 for anyone but the super admin, 400 for the caller's own account.
pub async fn delete_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<UserId>,
) -> Result<StatusCode> {
    require(&user, PlatformAction::ManageUsers)?;
    if id == user.id {
        return Err(AppError::BadRequest("cannot delete your own account".to_string()));
    }

    let mut tx = state.pool().begin().await?;
    users::delete_cascade(&mut tx, id).await?;
    tx.commit().await?;

    tracing::info!(target: "security", admin_id = %user.id, deleted_user_id = %id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/admin/users/{id}/subscription/{pause|resume|cancel}
///
/// # Errors
///
/// 403 for non-admins, 400 for unknown actions, 409 for rejected transitions.
pub async fn manage_subscription(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((id, action)): Path<(UserId, String)>,
    request: Option<Json<CancelRequest>>,
) -> Result<Json<UserResponse>> {
    require(&user, PlatformAction::ManageSubscriptions)?;

    let action = match action.as_str() {
        "pause" => ManualAction::Pause,
        "resume" => ManualAction::Resume,
        "cancel" => ManualAction::Cancel {
            at_period_end: request.is_some_and(|Json(request)| request.at_period_end),
        },
        other => {
            return Err(AppError::BadRequest(format!("unknown subscription action: {other}")));
        }
    };

    let updated = SubscriptionService::new(&state).manage(id, action).await?;
    tracing::info!(
        target: "security",
        admin_id = %user.id,
        user_id = %id,
        ?action,
        "Subscription changed by admin"
    );
    Ok(Json(UserResponse::from(&updated)))
}
