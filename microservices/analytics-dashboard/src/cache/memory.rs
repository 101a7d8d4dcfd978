//! In-process cache backend

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::time::{Duration, Instant};

use super::CacheService;

struct CacheEntry {
    value: Value,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        Instant::now() > self.expires_at
    }
}

/// Concurrent in-process cache with lazy eviction: an expired entry is
/// purged the next time it is read or overwritten, not by a sweeper.
pub struct InMemoryCacheService {
    entries: DashMap<String, CacheEntry>,
}

impl InMemoryCacheService {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Number of entries currently held, expired or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for InMemoryCacheService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheService for InMemoryCacheService {
    async fn get(&self, key: &str) -> Option<Value> {
        let hit = {
            let entry = self.entries.get(key)?;
            if entry.is_expired() {
                None
            } else {
                Some(entry.value.clone())
            }
        };
        if hit.is_none() {
            self.entries.remove(key);
        }
        hit
    }

    async fn put(&self, key: &str, value: Value, ttl: Duration) {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    async fn evict(&self, key: &str) {
        self.entries.remove(key);
    }

    async fn clear(&self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let cache = InMemoryCacheService::new();
        cache
            .put("k", json!({"count": 7}), Duration::from_secs(30))
            .await;

        assert_eq!(cache.get("k").await, Some(json!({"count": 7})));
    }

    #[tokio::test]
    async fn get_after_ttl_is_absent_and_entry_is_purged() {
        let cache = InMemoryCacheService::new();
        cache.put("k", json!(1), Duration::from_millis(10)).await;

        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(cache.get("k").await, None);
        // lazy eviction removed it from storage, not just from view
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test]
    async fn put_overwrites_existing_value() {
        let cache = InMemoryCacheService::new();
        cache.put("k", json!("old"), Duration::from_secs(30)).await;
        cache.put("k", json!("new"), Duration::from_secs(30)).await;

        assert_eq!(cache.get("k").await, Some(json!("new")));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn evict_removes_key_and_tolerates_missing_key() {
        let cache = InMemoryCacheService::new();
        cache.put("k", json!(1), Duration::from_secs(30)).await;

        cache.evict("k").await;
        assert_eq!(cache.get("k").await, None);

        // evicting a key that was never inserted is a no-op
        cache.evict("missing").await;
    }

    #[tokio::test]
    async fn clear_empties_all_keys() {
        let cache = InMemoryCacheService::new();
        cache.put("a", json!(1), Duration::from_secs(30)).await;
        cache.put("b", json!(2), Duration::from_secs(30)).await;

        cache.clear().await;

        assert!(cache.is_empty());
        assert_eq!(cache.get("a").await, None);
        assert_eq!(cache.get("b").await, None);
    }
}
