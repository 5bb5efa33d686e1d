use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::entities::website_tick;
use crate::db::enums::TickStatus;
use crate::db::services::{tick_service, website_service};
use crate::web::models::AuthenticatedUser;
use crate::web::{AppError, AppState};

pub fn website_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_website).get(list_websites))
        .route("/status/{website_id}", get(website_status))
        .route("/{id}", delete(delete_website))
}

#[derive(Deserialize)]
struct CreateWebsiteRequest {
    url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateWebsiteResponse {
    id: Uuid,
    url: String,
    message: String,
}

/// A website plus its computed display status: the latest tick's status, or
/// `Unknown` when it has never been probed.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WebsiteSummary {
    id: Uuid,
    url: String,
    created_at: DateTime<Utc>,
    status: TickStatus,
    latest_tick: Option<website_tick::Model>,
}

impl WebsiteSummary {
    fn new(website: crate::db::entities::website::Model, tick: Option<website_tick::Model>) -> Self {
        Self {
            id: website.id,
            url: website.url,
            created_at: website.created_at,
            status: tick.as_ref().map_or(TickStatus::Unknown, |t| t.status),
            latest_tick: tick,
        }
    }
}

/// Strips any scheme for consistent storage; URLs are kept scheme-less.
fn normalize_url(raw: &str) -> String {
    raw.trim()
        .strip_prefix("https://")
        .or_else(|| raw.trim().strip_prefix("http://"))
        .unwrap_or(raw.trim())
        .to_string()
}

#[axum::debug_handler]
async fn create_website(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(payload): Json<CreateWebsiteRequest>,
) -> Result<Json<CreateWebsiteResponse>, AppError> {
    let normalized = normalize_url(&payload.url);
    if normalized.is_empty() {
        return Err(AppError::InvalidInput("URL is required".to_string()));
    }

    // Validate by parsing with the scheme the prober will use.
    let parsed = reqwest::Url::parse(&format!("https://{normalized}"));
    if !parsed.is_ok_and(|u| u.host_str().is_some()) {
        return Err(AppError::InvalidInput(
            "Invalid URL format. Please enter a valid domain (e.g., example.com)".to_string(),
        ));
    }

    let existing =
        website_service::get_website_by_user_and_url(&app_state.db, user.id, &normalized).await?;
    if existing.is_some() {
        return Err(AppError::Conflict(
            "This website is already being monitored".to_string(),
        ));
    }

    let website = website_service::create_website(&app_state.db, user.id, &normalized).await?;
    Ok(Json(CreateWebsiteResponse {
        id: website.id,
        url: website.url,
        message: "Website added successfully and ready for monitoring!".to_string(),
    }))
}

#[axum::debug_handler]
async fn list_websites(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<serde_json::Value>, AppError> {
    let websites = website_service::get_websites_by_user_id(&app_state.db, user.id).await?;
    let ids: Vec<Uuid> = websites.iter().map(|w| w.id).collect();
    let mut latest = tick_service::get_latest_ticks_by_website(&app_state.db, &ids).await?;

    let summaries: Vec<WebsiteSummary> = websites
        .into_iter()
        .map(|website| {
            let tick = latest.remove(&website.id);
            WebsiteSummary::new(website, tick)
        })
        .collect();
    Ok(Json(serde_json::json!({ "websites": summaries })))
}

#[axum::debug_handler]
async fn website_status(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(website_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let website = website_service::get_website_by_id(&app_state.db, website_id)
        .await?
        .filter(|w| w.user_id == user.id)
        .ok_or_else(|| AppError::NotFound("Website not found".to_string()))?;

    let tick = tick_service::get_latest_tick(&app_state.db, website.id).await?;
    Ok(Json(
        serde_json::json!({ "website": WebsiteSummary::new(website, tick) }),
    ))
}

#[axum::debug_handler]
async fn delete_website(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(website_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let website = website_service::get_website_by_id(&app_state.db, website_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Website not found".to_string()))?;

    if website.user_id != user.id {
        return Err(AppError::Forbidden(
            "Unauthorized to delete this website".to_string(),
        ));
    }

    // Ticks go first; their history has no meaning without the website.
    website_service::delete_website_with_ticks(&app_state.db, website_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::entities::website;

    #[test]
    fn normalize_strips_schemes_and_whitespace() {
        assert_eq!(normalize_url("https://example.com"), "example.com");
        assert_eq!(normalize_url("http://example.com"), "example.com");
        assert_eq!(normalize_url("  example.com  "), "example.com");
        assert_eq!(normalize_url("example.com/health"), "example.com/health");
    }

    #[test]
    fn never_probed_website_displays_unknown() {
        let website = website::Model {
            id: Uuid::new_v4(),
            url: "example.com".to_string(),
            user_id: 1,
            created_at: Utc::now(),
        };
        let summary = WebsiteSummary::new(website, None);
        assert_eq!(summary.status, TickStatus::Unknown);
        assert!(summary.latest_tick.is_none());
    }
}
