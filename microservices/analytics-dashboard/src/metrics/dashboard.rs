//! Composite dashboard calculator

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tracker_core::Result;

use super::{rate_percent, CategoryMetrics, DashboardSnapshot};
use crate::store::EventStore;

// Per-category breakdown is computed for a fixed category set for now;
// open-ended category discovery would need a distinct-categories query
// on the store.
const BREAKDOWN_CATEGORIES: [&str; 2] = ["pizza", "burger"];

/// Compose the full dashboard snapshot: DAU over the window, overall
/// conversion rate, the popular-items map, and per-category breakdowns.
pub async fn calculate_dashboard(
    store: &dyn EventStore,
    window: Duration,
) -> Result<DashboardSnapshot> {
    let since = Utc::now() - window;

    let dau = store.count_distinct_users_since(since).await?;

    let sessions = store.count_by_event_type_since("app_opened", since).await?;
    let orders = store
        .count_by_event_type_since("order_placed", since)
        .await?;
    let conversion_rate = rate_percent(orders, sessions);

    let popular_items = popular_item_counts(store, since).await?;

    let mut category_metrics = HashMap::new();
    for category in BREAKDOWN_CATEGORIES {
        category_metrics.insert(
            category.to_string(),
            category_breakdown(store, category, since).await?,
        );
    }

    Ok(DashboardSnapshot {
        computed_at: Utc::now(),
        dau,
        conversion_rate,
        popular_items,
        category_metrics,
    })
}

async fn popular_item_counts(
    store: &dyn EventStore,
    since: DateTime<Utc>,
) -> Result<HashMap<String, u64>> {
    let events = store.find_by_event_type_since("item_viewed", since).await?;

    let mut counts: HashMap<String, u64> = HashMap::new();
    for event in &events {
        if let Some(item_name) = event.property_str("item_name") {
            *counts.entry(item_name).or_insert(0) += 1;
        }
    }
    Ok(counts)
}

async fn category_breakdown(
    store: &dyn EventStore,
    category: &str,
    since: DateTime<Utc>,
) -> Result<CategoryMetrics> {
    let dau = store
        .count_distinct_users_by_category_since(category, since)
        .await?;
    let conversions = store.count_orders_by_category_since(category, since).await?;

    let sessions = store
        .count_by_event_type_and_category_since("app_opened", category, since)
        .await?;
    let orders = store
        .count_by_event_type_and_category_since("order_placed", category, since)
        .await?;

    Ok(CategoryMetrics {
        dau,
        conversions,
        conversion_rate: rate_percent(orders, sessions),
    })
}
