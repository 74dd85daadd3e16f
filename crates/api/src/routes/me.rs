//! The logged-in account.

use axum::{Json, extract::Path};
use serde::Serialize;

use bizshop_core::entitlements::{Capabilities, Feature};

use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::models::UserResponse;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub capabilities: Capabilities,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureAccess {
    pub feature: Feature,
    pub has_access: bool,
}

/// GET /api/me
pub async fn show(CurrentUser(user): CurrentUser) -> Json<MeResponse> {
    Json(MeResponse {
        user: UserResponse::from(&user),
        capabilities: user.capabilities(),
    })
}

/// GET /api/me/features/{feature}
///
/// # Errors
///
/// 400 for a feature name that does not exist.
pub async fn feature(
    CurrentUser(user): CurrentUser,
    Path(feature): Path<String>,
) -> Result<Json<FeatureAccess>> {
    let feature: Feature = feature.parse()?;
    Ok(Json(FeatureAccess {
        feature,
        has_access: user.capabilities().allows(feature),
    }))
}
