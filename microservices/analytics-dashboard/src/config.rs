//! Analytics Dashboard Configuration

use std::time::Duration;
use tracker_core::{Result, TrackerError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    Local,
    Redis,
}

impl std::str::FromStr for CacheBackend {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "local" | "in-memory" => Ok(Self::Local),
            "redis" | "shared" => Ok(Self::Redis),
            other => Err(TrackerError::Config(format!(
                "Unknown cache backend: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub http_bind: String,
    pub cache_backend: CacheBackend,
    pub redis_url: String,
    pub redis_op_timeout: Duration,
    /// TTL applied to every cached metric kind.
    pub cache_ttl: Duration,
    pub dashboard_refresh_interval: Duration,
    pub dau_refresh_interval: Duration,
    pub conversion_refresh_interval: Duration,
    pub popular_refresh_interval: Duration,
    pub broadcast_interval: Duration,
    /// Lookback for the real-time DAU endpoint.
    pub dau_realtime_window: chrono::Duration,
    /// Lookback for dashboard, conversion and popular-items metrics.
    pub dashboard_window: chrono::Duration,
}

impl DashboardConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            http_bind: std::env::var("HTTP_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            cache_backend: std::env::var("CACHE_BACKEND")
                .unwrap_or_else(|_| "local".to_string())
                .parse()?,
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            redis_op_timeout: Duration::from_millis(env_u64("REDIS_TIMEOUT_MS", 2000)),
            cache_ttl: Duration::from_secs(env_u64("CACHE_TTL_SECS", 30)),
            dashboard_refresh_interval: Duration::from_secs(env_u64("DASHBOARD_REFRESH_SECS", 10)),
            dau_refresh_interval: Duration::from_secs(env_u64("DAU_REFRESH_SECS", 5)),
            conversion_refresh_interval: Duration::from_secs(env_u64("CONVERSION_REFRESH_SECS", 15)),
            popular_refresh_interval: Duration::from_secs(env_u64("POPULAR_REFRESH_SECS", 20)),
            broadcast_interval: Duration::from_secs(env_u64("BROADCAST_INTERVAL_SECS", 10)),
            dau_realtime_window: chrono::Duration::seconds(
                env_u64("DAU_REALTIME_WINDOW_SECS", 10) as i64
            ),
            dashboard_window: chrono::Duration::seconds(
                env_u64("DASHBOARD_WINDOW_SECS", 3600) as i64
            ),
        })
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
