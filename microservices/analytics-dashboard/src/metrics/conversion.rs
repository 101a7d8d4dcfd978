//! Conversion funnel calculator

use chrono::{Duration, Utc};
use tracker_core::Result;

use super::{rate_percent, ConversionMetrics, ConversionStep};
use crate::store::EventStore;

/// The fixed user-journey funnel, in order. Total sessions are counted at
/// the first step, conversions at the last.
pub const FUNNEL_STEPS: [&str; 6] = [
    "app_opened",
    "screen_viewed",
    "item_viewed",
    "item_added_to_cart",
    "checkout_started",
    "order_placed",
];

/// Count each funnel step over the trailing `window`, optionally filtered
/// to a single category.
pub async fn calculate_conversion_funnel(
    store: &dyn EventStore,
    category: Option<&str>,
    window: Duration,
) -> Result<ConversionMetrics> {
    let since = Utc::now() - window;

    let mut step_counts = Vec::with_capacity(FUNNEL_STEPS.len());
    for step in FUNNEL_STEPS {
        let count = match category {
            Some(cat) => {
                store
                    .count_by_event_type_and_category_since(step, cat, since)
                    .await?
            }
            None => store.count_by_event_type_since(step, since).await?,
        };
        step_counts.push(count);
    }

    let total_sessions = step_counts[0];
    let conversions = step_counts[FUNNEL_STEPS.len() - 1];

    let steps = FUNNEL_STEPS
        .iter()
        .zip(&step_counts)
        .map(|(name, &count)| ConversionStep {
            step_name: name.to_string(),
            step_count: count,
            conversion_rate: rate_percent(count, total_sessions),
        })
        .collect();

    Ok(ConversionMetrics {
        category: category.map(str::to_string),
        total_sessions,
        conversions,
        conversion_rate: rate_percent(conversions, total_sessions),
        steps,
        computed_at: Utc::now(),
    })
}
