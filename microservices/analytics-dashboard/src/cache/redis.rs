//! Redis cache backend
//!
//! Values cross the network as JSON strings. Backend failures degrade to
//! cache misses on reads and logged no-ops on writes, so a Redis outage
//! means "always recompute", never a crash. Every call is bounded by an
//! explicit operation timeout.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};

use super::CacheService;
use tracker_core::{Result, TrackerError};

pub struct RedisCacheService {
    conn: ConnectionManager,
    op_timeout: Duration,
}

impl RedisCacheService {
    pub async fn connect(url: &str, op_timeout: Duration) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| TrackerError::Cache(format!("Invalid Redis URL: {}", e)))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| TrackerError::Cache(format!("Redis connection failed: {}", e)))?;

        info!(url, "Connected to Redis cache");
        Ok(Self { conn, op_timeout })
    }

    /// Run a Redis call under the operation timeout, flattening timeout
    /// and backend errors into one logged outcome.
    async fn bounded<T, F>(&self, op: &str, key: &str, fut: F) -> Option<T>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match timeout(self.op_timeout, fut).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                warn!(op, key, error = %e, "Redis operation failed");
                None
            }
            Err(_) => {
                warn!(op, key, timeout_ms = self.op_timeout.as_millis() as u64, "Redis operation timed out");
                None
            }
        }
    }
}

#[async_trait]
impl CacheService for RedisCacheService {
    async fn get(&self, key: &str) -> Option<Value> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = self
            .bounded("GET", key, conn.get::<_, Option<String>>(key))
            .await?;
        let raw = raw?;

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "Cached payload is not valid JSON, treating as miss");
                None
            }
        }
    }

    async fn put(&self, key: &str, value: Value, ttl: Duration) {
        let raw = match serde_json::to_string(&value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key, error = %e, "Failed to serialize cache value");
                return;
            }
        };

        let mut conn = self.conn.clone();
        self.bounded("SETEX", key, conn.set_ex::<_, _, ()>(key, raw, ttl.as_secs()))
            .await;
    }

    async fn evict(&self, key: &str) {
        let mut conn = self.conn.clone();
        self.bounded("DEL", key, conn.del::<_, ()>(key)).await;
    }

    async fn clear(&self) {
        // Global server flush, not scoped to dashboard keys. A scoped
        // SCAN+DEL over the dashboard prefix would be the safer variant.
        warn!("Flushing entire Redis cache - use with caution in production");
        let mut conn = self.conn.clone();
        self.bounded(
            "FLUSHALL",
            "*",
            redis::cmd("FLUSHALL").query_async::<_, ()>(&mut conn),
        )
        .await;
    }
}
