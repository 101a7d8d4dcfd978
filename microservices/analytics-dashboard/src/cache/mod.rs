//! TTL cache - pluggable between an in-process map and Redis
//!
//! The backend stores `serde_json::Value`; the [`Cache`] wrapper converts
//! to and from the metric DTO types. A cached value that no longer
//! matches the requested type is treated as a miss, never as a fatal
//! error.

mod memory;
mod redis;

pub use memory::InMemoryCacheService;
pub use redis::RedisCacheService;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::config::{CacheBackend, DashboardConfig};
use tracker_core::Result;

/// Key-value cache with per-entry TTL.
///
/// `get` on a missing or expired key is "absent", not an error. `put`
/// always overwrites; the TTL is relative to insertion time.
#[async_trait]
pub trait CacheService: Send + Sync {
    async fn get(&self, key: &str) -> Option<Value>;

    async fn put(&self, key: &str, value: Value, ttl: Duration);

    async fn evict(&self, key: &str);

    /// Flush every entry. On the Redis backend this is a global flush of
    /// the server, not scoped to dashboard keys - use with caution.
    async fn clear(&self);
}

/// Typed facade over the selected backend.
#[derive(Clone)]
pub struct Cache {
    inner: Arc<dyn CacheService>,
}

impl Cache {
    pub fn new(inner: Arc<dyn CacheService>) -> Self {
        Self { inner }
    }

    /// Select and construct the configured backend once at startup.
    pub async fn from_config(config: &DashboardConfig) -> Result<Self> {
        let inner: Arc<dyn CacheService> = match config.cache_backend {
            CacheBackend::Local => Arc::new(InMemoryCacheService::new()),
            CacheBackend::Redis => Arc::new(
                RedisCacheService::connect(&config.redis_url, config.redis_op_timeout).await?,
            ),
        };
        Ok(Self::new(inner))
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.inner.get(key).await?;
        match serde_json::from_value(value) {
            Ok(typed) => Some(typed),
            Err(e) => {
                warn!(key, error = %e, "Cached value does not match requested type, treating as miss");
                None
            }
        }
    }

    pub async fn put<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        match serde_json::to_value(value) {
            Ok(json) => self.inner.put(key, json, ttl).await,
            Err(e) => warn!(key, error = %e, "Failed to serialize value for cache"),
        }
    }

    pub async fn evict(&self, key: &str) {
        self.inner.evict(key).await;
    }

    pub async fn clear(&self) {
        self.inner.clear().await;
    }
}
