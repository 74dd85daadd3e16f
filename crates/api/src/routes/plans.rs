//! Public plan catalog.

use axum::Json;

use bizshop_core::plans::{self, PlanDefinition};

/// GET /api/plans
pub async fn index() -> Json<Vec<&'static PlanDefinition>> {
    Json(plans::all().collect())
}
