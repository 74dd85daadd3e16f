//! Public storefront routes. No session required.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::db::{ProductRepository, StoreRepository};
use crate::error::{AppError, Result};
use crate::models::discount::{DiscountPreview, ValidateDiscount};
use crate::models::{Order, PlaceOrder, PublicStore};
use crate::services::{DiscountService, Notification, OrderService};
use crate::state::AppState;

/// A published store with its active products.
///
/// GET /api/public/stores/{slug}
///
/// # Errors
///
/// 404 for unknown or unpublished stores.
pub async fn store(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<PublicStore>> {
    let store = StoreRepository::new(state.pool())
        .get_published_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound("store not found".to_string()))?;
    let products = ProductRepository::new(state.pool())
        .list_active(store.store.id)
        .await?;
    Ok(Json(PublicStore::new(&store, products)))
}

/// Preview a discount code without consuming it.
///
/// POST /api/public/stores/{slug}/discounts/validate
///
/// # Errors
///
/// 404 for unknown codes, 402 for codes that cannot be used now.
pub async fn validate_discount(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(request): Json<ValidateDiscount>,
) -> Result<Json<DiscountPreview>> {
    let preview = DiscountService::new(state.pool())
        .preview(&slug, &request)
        .await?;
    Ok(Json(preview))
}

/// POST /api/public/stores/{slug}/orders
///
/// # Errors
///
/// 400 for unavailable products or short inventory, 402 for unusable codes.
pub async fn place_order(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(request): Json<PlaceOrder>,
) -> Result<(StatusCode, Json<Order>)> {
    let placed = OrderService::new(state.pool()).place(&slug, &request).await?;

    state.notify(Notification::OrderConfirmation {
        store_name: placed.store_name,
        order: Box::new(placed.order.clone()),
    });

    Ok((StatusCode::CREATED, Json(placed.order)))
}
