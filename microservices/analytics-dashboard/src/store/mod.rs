//! Event store - append-only event log and its read-only query surface

mod memory;

pub use memory::InMemoryEventStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracker_core::Result;

/// A single tracked user-behavior event. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: u64,
    pub event_type: String,
    pub user_id: String,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub properties: serde_json::Map<String, Value>,
}

impl Event {
    /// Read a property as a string, stringifying non-string scalars
    /// the same way the ingest side writes them.
    pub fn property_str(&self, name: &str) -> Option<String> {
        self.properties.get(name).map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

/// Payload for appending a new event; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub event_type: String,
    pub user_id: String,
    pub session_id: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub properties: serde_json::Map<String, Value>,
}

/// Read surface the dashboard core depends on, plus the thin append
/// interface used by event ingestion.
///
/// Category filters are property-equality matches on `properties.category`.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn append(&self, event: NewEvent) -> Result<Event>;

    async fn count_distinct_users_since(&self, since: DateTime<Utc>) -> Result<u64>;

    async fn count_by_event_type_since(&self, event_type: &str, since: DateTime<Utc>)
        -> Result<u64>;

    async fn count_by_event_type_and_category_since(
        &self,
        event_type: &str,
        category: &str,
        since: DateTime<Utc>,
    ) -> Result<u64>;

    async fn find_by_event_type_since(
        &self,
        event_type: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Event>>;

    async fn find_by_event_type_and_category_since(
        &self,
        event_type: &str,
        category: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Event>>;

    async fn count_distinct_users_by_category_since(
        &self,
        category: &str,
        since: DateTime<Utc>,
    ) -> Result<u64>;

    async fn count_orders_by_category_since(
        &self,
        category: &str,
        since: DateTime<Utc>,
    ) -> Result<u64>;
}
