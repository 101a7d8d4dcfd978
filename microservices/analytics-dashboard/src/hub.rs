//! Dashboard subscriber hub
//!
//! Owns the set of live WebSocket subscribers and the push logic. One
//! instance per process; the periodic timer, the on-connect push, the
//! "refresh" request and the out-of-band trigger all funnel through the
//! same snapshot-and-send path. A subscriber whose channel rejects a
//! send is dropped from the set without disturbing the rest.

use axum::extract::ws::Message;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::service::MetricsService;
use tracker_core::Result;

pub struct DashboardHub {
    metrics: Arc<MetricsService>,
    subscribers: DashMap<Uuid, mpsc::UnboundedSender<Message>>,
}

impl DashboardHub {
    pub fn new(metrics: Arc<MetricsService>) -> Self {
        Self {
            metrics,
            subscribers: DashMap::new(),
        }
    }

    /// Add a subscriber and immediately push the current snapshot to it.
    pub async fn subscribe(&self, id: Uuid, tx: mpsc::UnboundedSender<Message>) {
        self.subscribers.insert(id, tx);
        info!(
            subscriber = %id,
            connections = self.subscribers.len(),
            "Dashboard subscriber connected"
        );
        self.push_to(id).await;
    }

    /// Remove a subscriber (close, transport error, or failed send).
    pub fn unsubscribe(&self, id: Uuid) {
        if self.subscribers.remove(&id).is_some() {
            info!(
                subscriber = %id,
                connections = self.subscribers.len(),
                "Dashboard subscriber disconnected"
            );
        }
    }

    pub fn connected_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Push the current snapshot to a single subscriber.
    pub async fn push_to(&self, id: Uuid) {
        let payload = match self.snapshot_payload().await {
            Ok(payload) => payload,
            Err(e) => {
                error!(subscriber = %id, error = %e, "Failed to compute snapshot for subscriber");
                return;
            }
        };

        if let Some(tx) = self.subscribers.get(&id).map(|entry| entry.value().clone()) {
            if tx.send(Message::Text(payload.into())).is_err() {
                warn!(subscriber = %id, "Subscriber channel closed, removing");
                self.unsubscribe(id);
            }
        }
    }

    /// Push one identical snapshot payload to every subscriber,
    /// removing any whose send fails.
    pub async fn broadcast_snapshot(&self) -> Result<()> {
        let payload = self.snapshot_payload().await?;

        let mut failed = Vec::new();
        for entry in self.subscribers.iter() {
            if entry
                .value()
                .send(Message::Text(payload.clone().into()))
                .is_err()
            {
                failed.push(*entry.key());
            }
        }

        for id in failed {
            warn!(subscriber = %id, "Failed to push snapshot, removing subscriber");
            self.unsubscribe(id);
        }

        debug!(
            connections = self.subscribers.len(),
            "Pushed snapshot to subscribers"
        );
        Ok(())
    }

    /// Immediate out-of-band broadcast, same path as the timer.
    pub async fn push_now(&self) {
        if let Err(e) = self.broadcast_snapshot().await {
            error!(error = %e, "Error pushing immediate snapshot to subscribers");
        }
    }

    async fn snapshot_payload(&self) -> Result<String> {
        let snapshot = self.metrics.dashboard_metrics().await?;
        Ok(serde_json::to_string(&snapshot)?)
    }
}

/// Periodic push loop: every `period`, if anyone is connected, fetch the
/// snapshot once and broadcast it. Errors are logged and the next tick
/// proceeds normally.
pub fn spawn_broadcast_timer(hub: Arc<DashboardHub>, period: std::time::Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            if hub.connected_count() == 0 {
                continue;
            }
            if let Err(e) = hub.broadcast_snapshot().await {
                error!(error = %e, "Error pushing snapshot to subscribers");
            }
        }
    });
}
