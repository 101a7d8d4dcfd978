//! REST API handlers

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;
use validator::Validate;

use super::AppState;
use crate::metrics::{ConversionMetrics, DashboardSnapshot, DauMetrics, PopularItemsMetrics};
use crate::store::NewEvent;
use tracker_core::TrackerError;

/// HTTP-facing error wrapper; maps the service error taxonomy onto
/// status codes.
pub struct ApiError(TrackerError);

impl From<TrackerError> for ApiError {
    fn from(err: TrackerError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(serde_json::json!({
            "error": self.0.error_code(),
            "message": self.0.to_string(),
        }));
        (status, body).into_response()
    }
}

pub async fn health_check() -> &'static str {
    "OK"
}

pub async fn ready_check() -> &'static str {
    "OK"
}

/// Inbound event payload. Timestamp defaults to arrival time.
#[derive(Debug, Deserialize, Validate)]
pub struct EventRequest {
    #[validate(length(min = 1, max = 100))]
    pub event_type: String,
    #[validate(length(min = 1, max = 100))]
    pub user_id: String,
    #[validate(length(min = 1, max = 100))]
    pub session_id: String,
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub properties: serde_json::Map<String, Value>,
}

pub async fn track_event(
    State(state): State<AppState>,
    Json(req): Json<EventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()
        .map_err(|e| TrackerError::Validation(e.to_string()))?;

    let event = state
        .store
        .append(NewEvent {
            event_type: req.event_type,
            user_id: req.user_id,
            session_id: req.session_id,
            timestamp: req.timestamp,
            properties: req.properties,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(event)))
}

#[derive(Debug, Deserialize)]
pub struct CategoryQuery {
    pub category: Option<String>,
}

pub async fn get_dashboard_metrics(
    State(state): State<AppState>,
) -> Result<Json<DashboardSnapshot>, ApiError> {
    info!("Received request for dashboard metrics");
    Ok(Json(state.metrics.dashboard_metrics().await?))
}

pub async fn get_dau_metrics(State(state): State<AppState>) -> Result<Json<DauMetrics>, ApiError> {
    info!("Received request for DAU metrics");
    Ok(Json(state.metrics.dau_metrics().await?))
}

pub async fn get_conversion_metrics(
    State(state): State<AppState>,
    Query(query): Query<CategoryQuery>,
) -> Result<Json<ConversionMetrics>, ApiError> {
    info!(category = query.category.as_deref().unwrap_or("all"), "Received request for conversion metrics");
    Ok(Json(
        state
            .metrics
            .conversion_metrics(query.category.as_deref())
            .await?,
    ))
}

pub async fn get_popular_items_metrics(
    State(state): State<AppState>,
    Query(query): Query<CategoryQuery>,
) -> Result<Json<PopularItemsMetrics>, ApiError> {
    info!(category = query.category.as_deref().unwrap_or("all"), "Received request for popular items metrics");
    Ok(Json(
        state
            .metrics
            .popular_items_metrics(query.category.as_deref())
            .await?,
    ))
}

/// Out-of-band broadcast trigger; reuses the hub's timer push path.
pub async fn trigger_broadcast(State(state): State<AppState>) -> Json<Value> {
    state.hub.push_now().await;
    Json(serde_json::json!({
        "pushed_to": state.hub.connected_count(),
    }))
}
