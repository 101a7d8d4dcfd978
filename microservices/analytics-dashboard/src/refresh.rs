//! Scheduled cache refresher
//!
//! Four independent fixed-rate tasks keep the cache warm so user-facing
//! reads rarely miss. Each task has its own error boundary: a failed
//! cycle is logged and skipped without cancelling future runs or
//! affecting the other tasks. Refreshes go through the metrics service,
//! never the raw calculators, so a successful run populates the same
//! cache entries the read paths use.

use std::sync::Arc;
use tracing::{debug, error};

use crate::config::DashboardConfig;
use crate::service::MetricsService;

const REFRESH_CATEGORIES: [Option<&str>; 3] = [None, Some("pizza"), Some("burger")];

/// Spawn all refresh tasks. Fire-and-forget; nothing observes their
/// results beyond the cache they warm.
pub fn spawn_refresh_tasks(metrics: Arc<MetricsService>, config: &DashboardConfig) {
    spawn_dashboard_refresh(metrics.clone(), config);
    spawn_dau_refresh(metrics.clone(), config);
    spawn_conversion_refresh(metrics.clone(), config);
    spawn_popular_items_refresh(metrics, config);
}

fn spawn_dashboard_refresh(metrics: Arc<MetricsService>, config: &DashboardConfig) {
    let period = config.dashboard_refresh_interval;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            debug!("Refreshing dashboard metrics cache");
            if let Err(e) = metrics.dashboard_metrics().await {
                error!(error = %e, "Error refreshing dashboard metrics cache");
            }
        }
    });
}

fn spawn_dau_refresh(metrics: Arc<MetricsService>, config: &DashboardConfig) {
    let period = config.dau_refresh_interval;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            debug!("Refreshing DAU metrics cache");
            if let Err(e) = metrics.dau_metrics().await {
                error!(error = %e, "Error refreshing DAU metrics cache");
            }
        }
    });
}

fn spawn_conversion_refresh(metrics: Arc<MetricsService>, config: &DashboardConfig) {
    let period = config.conversion_refresh_interval;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            debug!("Refreshing conversion metrics cache");
            for category in REFRESH_CATEGORIES {
                if let Err(e) = metrics.conversion_metrics(category).await {
                    error!(
                        category = category.unwrap_or("all"),
                        error = %e,
                        "Error refreshing conversion metrics cache"
                    );
                }
            }
        }
    });
}

fn spawn_popular_items_refresh(metrics: Arc<MetricsService>, config: &DashboardConfig) {
    let period = config.popular_refresh_interval;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            debug!("Refreshing popular items metrics cache");
            for category in REFRESH_CATEGORIES {
                if let Err(e) = metrics.popular_items_metrics(category).await {
                    error!(
                        category = category.unwrap_or("all"),
                        error = %e,
                        "Error refreshing popular items metrics cache"
                    );
                }
            }
        }
    });
}
