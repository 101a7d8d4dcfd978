//! DAU calculator

use chrono::{Duration, Utc};
use tracker_core::Result;

use super::DauMetrics;
use crate::store::EventStore;

/// Count distinct users active within `window` ending now.
///
/// The real-time endpoint uses a 10 second window; the dashboard
/// snapshot counts the same thing over an hour. The window is a
/// parameter, not two copies of the logic.
pub async fn calculate_dau(store: &dyn EventStore, window: Duration) -> Result<DauMetrics> {
    let since = Utc::now() - window;
    let dau_count = store.count_distinct_users_since(since).await?;

    Ok(DauMetrics {
        dau_count,
        period: period_label(window),
        computed_at: Utc::now(),
    })
}

fn period_label(window: Duration) -> String {
    let secs = window.num_seconds();
    if secs % 3600 == 0 && secs > 0 {
        format!("last_{}_hours", secs / 3600)
    } else {
        format!("last_{}_seconds", secs)
    }
}
