//! Analytics Dashboard Microservice
//!
//! Event-tracking analytics for the food-ordering app:
//! - Cache-aside metrics service (DAU, conversion funnel, popular items)
//! - Pluggable TTL cache (in-process or Redis)
//! - Scheduled background refresh to keep the cache warm
//! - Live dashboard push over WebSocket

#![allow(dead_code)]

use std::sync::Arc;
use tracing::info;

use tracker_core::{
    DependencyStatus, HealthStatus, MicroserviceRuntime, ReadinessStatus, Result, TrackerService,
};

mod api;
mod cache;
mod config;
mod hub;
mod metrics;
mod refresh;
mod service;
mod store;

#[cfg(test)]
mod tests;

pub use config::DashboardConfig;

use cache::Cache;
use hub::DashboardHub;
use service::MetricsService;
use store::{EventStore, InMemoryEventStore};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("analytics_dashboard=debug".parse().unwrap()),
        )
        .json()
        .init();

    info!("Starting Analytics Dashboard microservice");

    let service = Arc::new(DashboardService::new().await?);
    MicroserviceRuntime::run(service).await
}

pub struct DashboardService {
    config: DashboardConfig,
    store: Arc<dyn EventStore>,
    metrics: Arc<MetricsService>,
    hub: Arc<DashboardHub>,
    start_time: std::time::Instant,
}

impl DashboardService {
    pub async fn new() -> Result<Self> {
        let config = DashboardConfig::from_env()?;

        let store: Arc<dyn EventStore> = Arc::new(InMemoryEventStore::new());
        let cache = Cache::from_config(&config).await?;
        let metrics = Arc::new(MetricsService::new(store.clone(), cache, &config));
        let hub = Arc::new(DashboardHub::new(metrics.clone()));

        Ok(Self {
            config,
            store,
            metrics,
            hub,
            start_time: std::time::Instant::now(),
        })
    }
}

#[async_trait::async_trait]
impl TrackerService for DashboardService {
    fn service_id(&self) -> &'static str {
        "analytics-dashboard"
    }

    async fn health(&self) -> HealthStatus {
        HealthStatus {
            healthy: true,
            service_id: self.service_id().to_string(),
            version: self.version().to_string(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    async fn ready(&self) -> ReadinessStatus {
        ReadinessStatus {
            ready: true,
            dependencies: vec![DependencyStatus {
                name: "event-store".to_string(),
                available: true,
                latency_ms: Some(1),
            }],
        }
    }

    async fn shutdown(&self) -> Result<()> {
        info!("Shutting down Analytics Dashboard service");
        Ok(())
    }

    async fn start(&self) -> Result<()> {
        info!(
            http = %self.config.http_bind,
            cache_backend = ?self.config.cache_backend,
            "Starting Analytics Dashboard servers"
        );

        refresh::spawn_refresh_tasks(self.metrics.clone(), &self.config);
        hub::spawn_broadcast_timer(self.hub.clone(), self.config.broadcast_interval);

        let app = api::create_router(api::AppState {
            store: self.store.clone(),
            metrics: self.metrics.clone(),
            hub: self.hub.clone(),
        });

        let listener = tokio::net::TcpListener::bind(&self.config.http_bind).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}
