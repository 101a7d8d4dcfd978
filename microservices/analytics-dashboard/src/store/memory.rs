//! In-memory event store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracker_core::Result;

use super::{Event, EventStore, NewEvent};

/// Append-only in-memory event log.
///
/// Queries scan the log; the dashboard only ever asks about a bounded
/// trailing window, so a linear pass is acceptable here.
pub struct InMemoryEventStore {
    events: RwLock<Vec<Event>>,
    next_id: AtomicU64,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self {
            events: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    fn matches_category(event: &Event, category: &str) -> bool {
        event
            .property_str("category")
            .is_some_and(|c| c == category)
    }
}

impl Default for InMemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, event: NewEvent) -> Result<Event> {
        let stored = Event {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            event_type: event.event_type,
            user_id: event.user_id,
            session_id: event.session_id,
            timestamp: event.timestamp.unwrap_or_else(Utc::now),
            properties: event.properties,
        };
        self.events.write().await.push(stored.clone());
        Ok(stored)
    }

    async fn count_distinct_users_since(&self, since: DateTime<Utc>) -> Result<u64> {
        let events = self.events.read().await;
        let users: HashSet<&str> = events
            .iter()
            .filter(|e| e.timestamp >= since)
            .map(|e| e.user_id.as_str())
            .collect();
        Ok(users.len() as u64)
    }

    async fn count_by_event_type_since(
        &self,
        event_type: &str,
        since: DateTime<Utc>,
    ) -> Result<u64> {
        let events = self.events.read().await;
        Ok(events
            .iter()
            .filter(|e| e.event_type == event_type && e.timestamp >= since)
            .count() as u64)
    }

    async fn count_by_event_type_and_category_since(
        &self,
        event_type: &str,
        category: &str,
        since: DateTime<Utc>,
    ) -> Result<u64> {
        let events = self.events.read().await;
        Ok(events
            .iter()
            .filter(|e| {
                e.event_type == event_type
                    && e.timestamp >= since
                    && Self::matches_category(e, category)
            })
            .count() as u64)
    }

    async fn find_by_event_type_since(
        &self,
        event_type: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Event>> {
        let events = self.events.read().await;
        Ok(events
            .iter()
            .filter(|e| e.event_type == event_type && e.timestamp >= since)
            .cloned()
            .collect())
    }

    async fn find_by_event_type_and_category_since(
        &self,
        event_type: &str,
        category: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Event>> {
        let events = self.events.read().await;
        Ok(events
            .iter()
            .filter(|e| {
                e.event_type == event_type
                    && e.timestamp >= since
                    && Self::matches_category(e, category)
            })
            .cloned()
            .collect())
    }

    async fn count_distinct_users_by_category_since(
        &self,
        category: &str,
        since: DateTime<Utc>,
    ) -> Result<u64> {
        let events = self.events.read().await;
        let users: HashSet<&str> = events
            .iter()
            .filter(|e| e.timestamp >= since && Self::matches_category(e, category))
            .map(|e| e.user_id.as_str())
            .collect();
        Ok(users.len() as u64)
    }

    async fn count_orders_by_category_since(
        &self,
        category: &str,
        since: DateTime<Utc>,
    ) -> Result<u64> {
        self.count_by_event_type_and_category_since("order_placed", category, since)
            .await
    }
}
