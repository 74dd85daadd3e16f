//! Store management routes.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;

use bizshop_core::StoreId;
use bizshop_core::authz::StoreAction;

use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::models::{NewStore, Store, StoreUpdate};
use crate::services::{StoreList, StoreService, authorize_store};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DomainRequest {
    #[serde(default)]
    pub domain: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    pub published: bool,
}

/// Owned and managed stores of the caller.
///
/// GET /api/stores
///
/// # Errors
///
/// 500 if the stores cannot be loaded.
pub async fn index(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<StoreList>> {
    Ok(Json(StoreService::new(state.pool()).list_for(&user).await?))
}

/// POST /api/stores
///
/// # Errors
///
/// 402 when the plan's store cap is reached, 409 for a taken slug.
pub async fn create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(new): Json<NewStore>,
) -> Result<(StatusCode, Json<Store>)> {
    let store = StoreService::new(state.pool()).create(&user, &new).await?;
    Ok((StatusCode::CREATED, Json(store)))
}

/// GET /api/stores/{id}
///
/// # Errors
///
/// 404 for stores the caller cannot see.
pub async fn show(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<StoreId>,
) -> Result<Json<Store>> {
    let access = authorize_store(state.pool(), &user, id, StoreAction::View).await?;
    Ok(Json(access.store.store))
}

/// PATCH /api/stores/{id}
///
/// # Errors
///
/// 403 for managers, 402 when hiding branding without the feature.
pub async fn update(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<StoreId>,
    Json(update): Json<StoreUpdate>,
) -> Result<Json<Store>> {
    let access = authorize_store(state.pool(), &user, id, StoreAction::UpdateSettings).await?;
    let store = StoreService::new(state.pool())
        .update(&access.store, &update)
        .await?;
    Ok(Json(store))
}

/// DELETE /api/stores/{id}
///
/// # Errors
///
/// 403 for managers.
pub async fn destroy(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<StoreId>,
) -> Result<StatusCode> {
    authorize_store(state.pool(), &user, id, StoreAction::Delete).await?;
    StoreService::new(state.pool()).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Set or clear the custom domain.
///
/// PUT /api/stores/{id}/domain
///
/// # Errors
///
/// 402 without `customDomain`, 400 for malformed hostnames.
pub async fn set_domain(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<StoreId>,
    Json(request): Json<DomainRequest>,
) -> Result<Json<Store>> {
    let access = authorize_store(state.pool(), &user, id, StoreAction::ManageDomain).await?;
    let store = StoreService::new(state.pool())
        .set_domain(&access.store, request.domain.as_deref())
        .await?;
    Ok(Json(store))
}

/// Publish the store, or unpublish it with `{"published": false}`.
///
/// POST /api/stores/{id}/publish
///
/// # Errors
///
/// 403 for managers.
pub async fn publish(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<StoreId>,
    request: Option<Json<PublishRequest>>,
) -> Result<Json<Store>> {
    authorize_store(state.pool(), &user, id, StoreAction::Publish).await?;
    let published = request.is_none_or(|Json(request)| request.published);
    let store = StoreService::new(state.pool())
        .set_published(id, published)
        .await?;
    Ok(Json(store))
}
