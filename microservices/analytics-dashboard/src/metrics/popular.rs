//! Popular items calculator

use chrono::{Duration, Utc};
use std::collections::HashMap;
use tracker_core::Result;

use super::{PopularItem, PopularItemsMetrics};
use crate::store::EventStore;

const TOP_ITEMS: usize = 10;

/// Group `item_viewed` events of the trailing `window` by their
/// `item_name` property and rank by view count.
pub async fn calculate_popular_items(
    store: &dyn EventStore,
    category: Option<&str>,
    window: Duration,
) -> Result<PopularItemsMetrics> {
    let since = Utc::now() - window;

    let events = match category {
        Some(cat) => {
            store
                .find_by_event_type_and_category_since("item_viewed", cat, since)
                .await?
        }
        None => store.find_by_event_type_since("item_viewed", since).await?,
    };

    let mut view_counts: HashMap<String, u64> = HashMap::new();
    for event in &events {
        if let Some(item_name) = event.property_str("item_name") {
            *view_counts.entry(item_name).or_insert(0) += 1;
        }
    }

    let mut items: Vec<PopularItem> = view_counts
        .into_iter()
        .map(|(item_name, view_count)| PopularItem {
            item_name,
            view_count,
            popularity_score: view_count as f64,
        })
        .collect();
    items.sort_by(|a, b| b.view_count.cmp(&a.view_count));
    items.truncate(TOP_ITEMS);

    Ok(PopularItemsMetrics {
        category: category.map(str::to_string),
        items,
        computed_at: Utc::now(),
    })
}
