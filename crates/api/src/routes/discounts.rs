//! Discount codes of a store.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use bizshop_core::authz::StoreAction;
use bizshop_core::{DiscountCodeId, StoreId};

use crate::db::DiscountRepository;
use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::models::{DiscountCode, DiscountUpdate, NewDiscount};
use crate::services::{DiscountService, authorize_store};
use crate::state::AppState;

/// GET /api/stores/{id}/discounts
///
/// # Errors
///
/// 403 for managers without `manageDiscounts`.
pub async fn index(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<StoreId>,
) -> Result<Json<Vec<DiscountCode>>> {
    authorize_store(state.pool(), &user, id, StoreAction::ManageDiscounts).await?;
    Ok(Json(DiscountRepository::new(state.pool()).list(id).await?))
}

/// POST /api/stores/{id}/discounts
///
/// # Errors
///
/// 400 for invalid definitions, 409 for a code already in use.
pub async fn create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<StoreId>,
    Json(new): Json<NewDiscount>,
) -> Result<(StatusCode, Json<DiscountCode>)> {
    authorize_store(state.pool(), &user, id, StoreAction::ManageDiscounts).await?;
    let code = DiscountService::new(state.pool()).create(id, &new).await?;
    Ok((StatusCode::CREATED, Json(code)))
}

/// PATCH /api/stores/{id}/discounts/{discount_id}
///
/// # Errors
///
/// 404 for unknown codes, 400 for invalid definitions.
pub async fn update(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((id, discount_id)): Path<(StoreId, DiscountCodeId)>,
    Json(update): Json<DiscountUpdate>,
) -> Result<Json<DiscountCode>> {
    authorize_store(state.pool(), &user, id, StoreAction::ManageDiscounts).await?;
    let code = DiscountService::new(state.pool())
        .update(id, discount_id, &update)
        .await?;
    Ok(Json(code))
}

/// DELETE /api/stores/{id}/discounts/{discount_id}
///
/// # Errors
///
/// 404 for unknown codes.
pub async fn destroy(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((id, discount_id)): Path<(StoreId, DiscountCodeId)>,
) -> Result<StatusCode> {
    authorize_store(state.pool(), &user, id, StoreAction::ManageDiscounts).await?;
    DiscountRepository::new(state.pool())
        .delete(id, discount_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
