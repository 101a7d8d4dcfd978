//! Metrics service - cache-aside layer over the calculators
//!
//! Every read path (HTTP, refresher, broadcast) goes through here and
//! shares the same cache keys. Concurrent misses for one key may both
//! recompute and both write; last write wins, which is harmless since
//! the results are equivalent within the TTL window.

use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::cache::Cache;
use crate::config::DashboardConfig;
use crate::metrics::{
    calculate_conversion_funnel, calculate_dashboard, calculate_dau, calculate_popular_items,
    ConversionMetrics, DashboardSnapshot, DauMetrics, PopularItemsMetrics,
};
use crate::store::EventStore;
use tracker_core::Result;

const DASHBOARD_METRICS_KEY: &str = "dashboard:metrics";
const DAU_METRICS_KEY: &str = "dashboard:dau";
const CONVERSION_METRICS_KEY: &str = "dashboard:conversion";
const POPULAR_ITEMS_METRICS_KEY: &str = "dashboard:popular_items";

pub struct MetricsService {
    store: Arc<dyn EventStore>,
    cache: Cache,
    cache_ttl: Duration,
    dau_realtime_window: chrono::Duration,
    dashboard_window: chrono::Duration,
}

impl MetricsService {
    pub fn new(store: Arc<dyn EventStore>, cache: Cache, config: &DashboardConfig) -> Self {
        Self {
            store,
            cache,
            cache_ttl: config.cache_ttl,
            dau_realtime_window: config.dau_realtime_window,
            dashboard_window: config.dashboard_window,
        }
    }

    pub async fn dashboard_metrics(&self) -> Result<DashboardSnapshot> {
        if let Some(cached) = self.cache.get(DASHBOARD_METRICS_KEY).await {
            info!("Cache hit for dashboard metrics");
            return Ok(cached);
        }

        info!("Cache miss for dashboard metrics, recalculating");
        let metrics = calculate_dashboard(self.store.as_ref(), self.dashboard_window).await?;
        self.cache
            .put(DASHBOARD_METRICS_KEY, &metrics, self.cache_ttl)
            .await;
        Ok(metrics)
    }

    pub async fn dau_metrics(&self) -> Result<DauMetrics> {
        if let Some(cached) = self.cache.get(DAU_METRICS_KEY).await {
            info!("Cache hit for DAU metrics");
            return Ok(cached);
        }

        info!("Cache miss for DAU metrics, recalculating");
        let metrics = calculate_dau(self.store.as_ref(), self.dau_realtime_window).await?;
        self.cache.put(DAU_METRICS_KEY, &metrics, self.cache_ttl).await;
        Ok(metrics)
    }

    pub async fn conversion_metrics(&self, category: Option<&str>) -> Result<ConversionMetrics> {
        let key = categorized_key(CONVERSION_METRICS_KEY, category);
        if let Some(cached) = self.cache.get(&key).await {
            info!(key = %key, "Cache hit for conversion metrics");
            return Ok(cached);
        }

        info!(key = %key, category = category.unwrap_or("all"), "Cache miss for conversion metrics, recalculating");
        let metrics =
            calculate_conversion_funnel(self.store.as_ref(), category, self.dashboard_window)
                .await?;
        self.cache.put(&key, &metrics, self.cache_ttl).await;
        Ok(metrics)
    }

    pub async fn popular_items_metrics(
        &self,
        category: Option<&str>,
    ) -> Result<PopularItemsMetrics> {
        let key = categorized_key(POPULAR_ITEMS_METRICS_KEY, category);
        if let Some(cached) = self.cache.get(&key).await {
            info!(key = %key, "Cache hit for popular items metrics");
            return Ok(cached);
        }

        info!(key = %key, category = category.unwrap_or("all"), "Cache miss for popular items metrics, recalculating");
        let metrics =
            calculate_popular_items(self.store.as_ref(), category, self.dashboard_window).await?;
        self.cache.put(&key, &metrics, self.cache_ttl).await;
        Ok(metrics)
    }
}

fn categorized_key(namespace: &str, category: Option<&str>) -> String {
    format!("{}:{}", namespace, category.unwrap_or("all"))
}
