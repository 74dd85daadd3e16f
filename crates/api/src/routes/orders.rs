//! Orders of a store, seller side.

use axum::{
    Json,
    extract::{Path, Query, State},
};

use bizshop_core::authz::StoreAction;
use bizshop_core::{OrderId, StoreId};

use super::Pagination;
use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::models::Order;
use crate::models::order::OrderStatusUpdate;
use crate::services::{OrderService, authorize_store};
use crate::state::AppState;

/// Most recent orders first.
///
/// GET /api/stores/{id}/orders?limit=&offset=
///
/// # Errors
///
/// 403 for managers without `manageOrders`.
pub async fn index(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<StoreId>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<Order>>> {
    authorize_store(state.pool(), &user, id, StoreAction::ManageOrders).await?;
    let orders = OrderService::new(state.pool())
        .list(id, page.limit(), page.offset())
        .await?;
    Ok(Json(orders))
}

/// PATCH /api/stores/{id}/orders/{order_id}
///
/// # Errors
///
/// 404 for unknown orders, 409 for moves the fulfilment flow forbids.
pub async fn update_status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((id, order_id)): Path<(StoreId, OrderId)>,
    Json(update): Json<OrderStatusUpdate>,
) -> Result<Json<Order>> {
    authorize_store(state.pool(), &user, id, StoreAction::ManageOrders).await?;
    let order = OrderService::new(state.pool())
        .update_status(id, order_id, update)
        .await?;
    Ok(Json(order))
}
