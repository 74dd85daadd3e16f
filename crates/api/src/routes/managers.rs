//! Store managers and the invitee's side of invitations.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use bizshop_core::authz::StoreAction;
use bizshop_core::{StoreId, StoreManagerId};

use crate::db::ManagerRepository;
use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::models::manager::{InviteManager, UpdatePermissions};
use crate::models::{Invitation, StoreManager};
use crate::services::{ManagerService, authorize_store};
use crate::state::AppState;

/// GET /api/stores/{id}/managers
///
/// # Errors
///
/// 403 for managers; only owners and admins see the list.
pub async fn index(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<StoreId>,
) -> Result<Json<Vec<StoreManager>>> {
    authorize_store(state.pool(), &user, id, StoreAction::ManageManagers).await?;
    Ok(Json(ManagerRepository::new(state.pool()).list(id).await?))
}

/// POST /api/stores/{id}/managers
///
/// # Errors
///
/// 402 without `storeManagers` or at the cap, 404 for unknown emails.
pub async fn invite(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<StoreId>,
    Json(request): Json<InviteManager>,
) -> Result<(StatusCode, Json<StoreManager>)> {
    let access = authorize_store(state.pool(), &user, id, StoreAction::ManageManagers).await?;
    let manager = ManagerService::new(state.pool())
        .invite(&access.store, user.id, &request.email, request.permissions)
        .await?;
    Ok((StatusCode::CREATED, Json(manager)))
}

/// PATCH /api/stores/{id}/managers/{manager_id}
///
/// # Errors
///
/// 404 for managers of other stores.
pub async fn update(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((id, manager_id)): Path<(StoreId, StoreManagerId)>,
    Json(request): Json<UpdatePermissions>,
) -> Result<Json<StoreManager>> {
    authorize_store(state.pool(), &user, id, StoreAction::ManageManagers).await?;
    let manager = ManagerRepository::new(state.pool())
        .update_permissions(id, manager_id, request.permissions)
        .await?;
    tracing::info!(store_id = %id, manager_id = %manager_id, "Manager permissions changed");
    Ok(Json(manager))
}

/// DELETE /api/stores/{id}/managers/{manager_id}
///
/// # Errors
///
/// 404 for managers of other stores.
pub async fn destroy(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((id, manager_id)): Path<(StoreId, StoreManagerId)>,
) -> Result<StatusCode> {
    authorize_store(state.pool(), &user, id, StoreAction::ManageManagers).await?;
    ManagerRepository::new(state.pool())
        .delete(id, manager_id)
        .await?;
    tracing::info!(store_id = %id, manager_id = %manager_id, "Manager removed");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/invitations
///
/// # Errors
///
/// 401 without a session.
pub async fn invitations(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<Invitation>>> {
    Ok(Json(ManagerService::new(state.pool()).pending_for(user.id).await?))
}

/// POST /api/invitations/{id}/accept
///
/// # Errors
///
/// 404 unless the invitation is pending and addressed to the caller.
pub async fn accept(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<StoreManagerId>,
) -> Result<Json<StoreManager>> {
    let manager = ManagerService::new(state.pool())
        .respond(id, user.id, true)
        .await?;
    Ok(Json(manager))
}

/// POST /api/invitations/{id}/decline
///
/// # Errors
///
/// 404 unless the invitation is pending and addressed to the caller.
pub async fn decline(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<StoreManagerId>,
) -> Result<Json<StoreManager>> {
    let manager = ManagerService::new(state.pool())
        .respond(id, user.id, false)
        .await?;
    Ok(Json(manager))
}
