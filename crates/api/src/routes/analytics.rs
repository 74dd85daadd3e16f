//! Store analytics.
//!
//! Every plan gets the order summary. Top products and daily sales are added
//! when the owner's plan includes `advancedAnalytics`.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;

use bizshop_core::StoreId;
use bizshop_core::authz::StoreAction;
use bizshop_core::entitlements::{Feature, has_feature_access};

use crate::db::OrderRepository;
use crate::db::orders::{DailySales, OrderSummary, ProductSales};
use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::services::authorize_store;
use crate::state::AppState;

const TOP_PRODUCTS: i64 = 10;
const SALES_WINDOW_DAYS: i32 = 30;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    #[serde(flatten)]
    pub summary: OrderSummary,
    pub advanced: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_products: Option<Vec<ProductSales>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_sales: Option<Vec<DailySales>>,
}

/// GET /api/stores/{id}/analytics
///
/// # Errors
///
/// 403 for managers without `viewAnalytics`.
pub async fn show(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<StoreId>,
) -> Result<Json<Analytics>> {
    let access = authorize_store(state.pool(), &user, id, StoreAction::ViewAnalytics).await?;
    let repo = OrderRepository::new(state.pool());
    let summary = repo.summary(id).await?;

    let advanced = has_feature_access(access.store.owner_plan, Feature::AdvancedAnalytics);
    let (top_products, daily_sales) = if advanced {
        (
            Some(repo.top_products(id, TOP_PRODUCTS).await?),
            Some(repo.daily_sales(id, SALES_WINDOW_DAYS).await?),
        )
    } else {
        (None, None)
    };

    Ok(Json(Analytics {
        summary,
        advanced,
        top_products,
        daily_sales,
    }))
}
