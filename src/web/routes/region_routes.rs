use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, post},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::db::services::{region_service, tick_service};
use crate::web::{AppError, AppState};

pub fn region_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_region).get(list_regions))
        .route("/{id}", delete(delete_region))
}

#[derive(Deserialize)]
struct CreateRegionRequest {
    name: String,
}

#[axum::debug_handler]
async fn create_region(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<CreateRegionRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::InvalidInput("Region name is required".to_string()));
    }

    let existing = region_service::get_region_by_name(&app_state.db, name).await?;
    if existing.is_some() {
        return Err(AppError::Conflict(
            "Region with this name already exists".to_string(),
        ));
    }

    let region = region_service::create_region(&app_state.db, name).await?;

    // The queue group is created eagerly so workers can read right away.
    // Failure here must not fail region creation.
    if let Err(err) = app_state.queue.create_group(region.id).await {
        warn!(region_id = %region.id, error = %err, "Queue group creation failed for new region.");
    }

    Ok(Json(serde_json::json!({
        "message": "Region created successfully with queue group",
        "region": { "id": region.id, "name": region.name },
    })))
}

#[axum::debug_handler]
async fn list_regions(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, AppError> {
    let regions = region_service::get_all_regions(&app_state.db).await?;
    Ok(Json(serde_json::json!({ "regions": regions })))
}

#[axum::debug_handler]
async fn delete_region(
    State(app_state): State<Arc<AppState>>,
    Path(region_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    region_service::get_region_by_id(&app_state.db, region_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Region not found".to_string()))?;

    let tick_count = tick_service::count_ticks_by_region(&app_state.db, region_id).await?;
    if tick_count > 0 {
        return Err(AppError::InvalidInput(
            "Cannot delete region with existing monitoring data".to_string(),
        ));
    }

    region_service::delete_region(&app_state.db, region_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
