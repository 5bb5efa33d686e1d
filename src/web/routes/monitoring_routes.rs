//! The dispatch API: consumer-group management plus the pusher and worker
//! triggers. Paths are kept exactly as the dashboard calls them, including
//! the historical `/redis/` prefix from the broker this queue replaced.

use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    routing::post,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};
use uuid::Uuid;

use crate::db::services::region_service;
use crate::dispatch::queue::QueueError;
use crate::dispatch::{pusher, worker};
use crate::web::models::AuthenticatedUser;
use crate::web::{AppError, AppState};

pub fn monitoring_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/redis/create-group/{region_id}", post(create_group))
        .route("/trigger-pusher", post(trigger_pusher))
        .route("/trigger-worker", post(trigger_worker))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateGroupResponse {
    message: String,
    region_id: Uuid,
    region_name: String,
}

#[axum::debug_handler]
async fn create_group(
    State(app_state): State<Arc<AppState>>,
    Path(region_id): Path<Uuid>,
) -> Result<Json<CreateGroupResponse>, AppError> {
    let region = region_service::get_region_by_id(&app_state.db, region_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Region not found".to_string()))?;

    let message = match app_state.queue.create_group(region_id).await {
        Ok(()) => format!(
            "Consumer group created for region '{}' ({region_id})",
            region.name
        ),
        // Re-creation is tolerated: the existing group keeps its cursor and
        // pending entries.
        Err(QueueError::GroupAlreadyExists { .. }) => {
            warn!(%region_id, "Consumer group already exists.");
            format!(
                "Consumer group already exists for region '{}' ({region_id})",
                region.name
            )
        }
        Err(err) => {
            error!(%region_id, error = %err, "Consumer group creation failed.");
            return Err(AppError::InternalServerError(
                "Failed to create consumer group".to_string(),
            ));
        }
    };

    Ok(Json(CreateGroupResponse {
        message,
        region_id,
        region_name: region.name,
    }))
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct TriggerPusherRequest {
    region_id: Option<Uuid>,
}

#[axum::debug_handler]
async fn trigger_pusher(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    body: axum::body::Bytes,
) -> Result<Json<pusher::PushReport>, AppError> {
    // The dashboard posts this without a body; an explicit region can be
    // passed as `{"regionId": ...}`.
    let payload: TriggerPusherRequest = if body.is_empty() {
        TriggerPusherRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|_| AppError::InvalidInput("Invalid JSON body".to_string()))?
    };

    // The target region is an enqueue-time operator choice: request field
    // first, configured default second.
    let region_id = payload
        .region_id
        .or(app_state.config.default_region_id)
        .ok_or_else(|| {
            AppError::InvalidInput(
                "Target region is required (pass regionId or configure DEFAULT_REGION_ID)"
                    .to_string(),
            )
        })?;

    region_service::get_region_by_id(&app_state.db, region_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Region not found".to_string()))?;

    let report = pusher::push_unchecked_websites(&app_state.db, &app_state.queue, region_id, user.id)
        .await
        .map_err(|err| {
            error!(%region_id, user_id = user.id, error = %err, "Pusher trigger failed.");
            AppError::InternalServerError("Failed to trigger pusher".to_string())
        })?;

    Ok(Json(report))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TriggerWorkerRequest {
    region_id: Option<Uuid>,
    worker_id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TriggerWorkerResponse {
    message: String,
    processed: usize,
    total: usize,
    region_name: String,
    worker_id: String,
}

#[axum::debug_handler]
async fn trigger_worker(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<TriggerWorkerRequest>,
) -> Result<Json<TriggerWorkerResponse>, AppError> {
    let (Some(region_id), Some(worker_id)) = (payload.region_id, payload.worker_id) else {
        return Err(AppError::InvalidInput(
            "Region ID and Worker ID are required".to_string(),
        ));
    };

    let region = region_service::get_region_by_id(&app_state.db, region_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Region not found".to_string()))?;

    let report = worker::run_batch(
        &app_state.db,
        app_state.prober.as_ref(),
        &app_state.queue,
        region_id,
        &worker_id,
        worker::DEFAULT_BATCH_SIZE,
    )
    .await
    .map_err(|err| {
        error!(%region_id, %worker_id, error = %err, "Worker trigger failed.");
        AppError::InternalServerError("Failed to trigger worker".to_string())
    })?;

    let message = if report.total == 0 {
        format!(
            "No websites in queue for region '{}' to process",
            region.name
        )
    } else {
        format!(
            "Successfully processed {} websites in region '{}' with worker '{worker_id}'",
            report.processed, region.name
        )
    };

    Ok(Json(TriggerWorkerResponse {
        message,
        processed: report.processed,
        total: report.total,
        region_name: region.name,
        worker_id,
    }))
}
