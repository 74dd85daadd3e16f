//! Products and categories of a store.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;

use bizshop_core::authz::StoreAction;
use bizshop_core::{CategoryId, ProductId, StoreId};

use crate::db::CategoryRepository;
use crate::error::{AppError, Result};
use crate::middleware::CurrentUser;
use crate::models::{Category, NewProduct, Product, ProductUpdate};
use crate::services::{ProductService, authorize_store};
use crate::state::AppState;

const MAX_CATEGORY_NAME_LEN: usize = 100;

#[derive(Debug, Deserialize)]
pub struct NewCategory {
    pub name: String,
}

/// GET /api/stores/{id}/products
///
/// # Errors
///
/// 404 for stores the caller cannot see.
pub async fn list_products(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<StoreId>,
) -> Result<Json<Vec<Product>>> {
    authorize_store(state.pool(), &user, id, StoreAction::View).await?;
    Ok(Json(ProductService::new(state.pool()).list(id).await?))
}

/// POST /api/stores/{id}/products
///
/// # Errors
///
/// 402 when an active product would exceed the owner's cap.
pub async fn create_product(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<StoreId>,
    Json(new): Json<NewProduct>,
) -> Result<(StatusCode, Json<Product>)> {
    let access = authorize_store(state.pool(), &user, id, StoreAction::ManageProducts).await?;
    let product = ProductService::new(state.pool())
        .create(&access.store, &new)
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// PATCH /api/stores/{id}/products/{product_id}
///
/// # Errors
///
/// 402 when reactivating past the cap, 404 for unknown products.
pub async fn update_product(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((id, product_id)): Path<(StoreId, ProductId)>,
    Json(update): Json<ProductUpdate>,
) -> Result<Json<Product>> {
    let access = authorize_store(state.pool(), &user, id, StoreAction::ManageProducts).await?;
    let product = ProductService::new(state.pool())
        .update(&access.store, product_id, &update)
        .await?;
    Ok(Json(product))
}

/// DELETE /api/stores/{id}/products/{product_id}
///
/// # Errors
///
/// 404 for unknown products.
pub async fn delete_product(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((id, product_id)): Path<(StoreId, ProductId)>,
) -> Result<StatusCode> {
    authorize_store(state.pool(), &user, id, StoreAction::ManageProducts).await?;
    ProductService::new(state.pool())
        .delete(id, product_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/stores/{id}/categories
///
/// # Errors
///
/// 404 for stores the caller cannot see.
pub async fn list_categories(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<StoreId>,
) -> Result<Json<Vec<Category>>> {
    authorize_store(state.pool(), &user, id, StoreAction::View).await?;
    Ok(Json(CategoryRepository::new(state.pool()).list(id).await?))
}

/// POST /api/stores/{id}/categories
///
/// # Errors
///
/// 400 for empty or overlong names, 409 for duplicates.
pub async fn create_category(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<StoreId>,
    Json(new): Json<NewCategory>,
) -> Result<(StatusCode, Json<Category>)> {
    authorize_store(state.pool(), &user, id, StoreAction::ManageCategories).await?;

    let name = new.name.trim();
    if name.is_empty() || name.chars().count() > MAX_CATEGORY_NAME_LEN {
        return Err(AppError::BadRequest(format!(
            "category name must be 1 to {MAX_CATEGORY_NAME_LEN} characters"
        )));
    }

    let category = CategoryRepository::new(state.pool())
        .create(id, name)
        .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// Products in the category keep existing, uncategorized.
///
/// DELETE /api/stores/{id}/categories/{category_id}
///
/// # Errors
///
/// 404 for unknown categories.
pub async fn delete_category(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((id, category_id)): Path<(StoreId, CategoryId)>,
) -> Result<StatusCode> {
    authorize_store(state.pool(), &user, id, StoreAction::ManageCategories).await?;
    CategoryRepository::new(state.pool())
        .delete(id, category_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
