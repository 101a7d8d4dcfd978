//! API module - REST and WebSocket

pub mod rest;
pub mod websocket;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::hub::DashboardHub;
use crate::service::MetricsService;
use crate::store::EventStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EventStore>,
    pub metrics: Arc<MetricsService>,
    pub hub: Arc<DashboardHub>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(rest::health_check))
        .route("/ready", get(rest::ready_check))
        // Event ingestion
        .route("/api/events", post(rest::track_event))
        // Dashboard metrics
        .route("/api/dashboard/metrics", get(rest::get_dashboard_metrics))
        .route("/api/dashboard/metrics/dau", get(rest::get_dau_metrics))
        .route(
            "/api/dashboard/metrics/conversion",
            get(rest::get_conversion_metrics),
        )
        .route(
            "/api/dashboard/metrics/popular-items",
            get(rest::get_popular_items_metrics),
        )
        .route(
            "/api/dashboard/metrics/broadcast",
            post(rest::trigger_broadcast),
        )
        // Live subscribers
        .route("/ws/dashboard", get(websocket::ws_handler))
        .with_state(state)
}
