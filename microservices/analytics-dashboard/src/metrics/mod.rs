//! Metric DTOs and calculators
//!
//! Each calculator is a stateless pass over the event store for a fixed
//! trailing window. Caching is layered on top by the metrics service,
//! never inside a calculator.

mod conversion;
mod dashboard;
mod dau;
mod popular;

pub use conversion::{calculate_conversion_funnel, FUNNEL_STEPS};
pub use dashboard::calculate_dashboard;
pub use dau::calculate_dau;
pub use popular::calculate_popular_items;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Distinct active users within a lookback window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DauMetrics {
    pub dau_count: u64,
    pub period: String,
    pub computed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionStep {
    pub step_name: String,
    pub step_count: u64,
    pub conversion_rate: f64,
}

/// Funnel counts and rates over the trailing window.
///
/// `steps` always has exactly one entry per funnel step, in funnel order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionMetrics {
    pub category: Option<String>,
    pub total_sessions: u64,
    pub conversions: u64,
    pub conversion_rate: f64,
    pub steps: Vec<ConversionStep>,
    pub computed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopularItem {
    pub item_name: String,
    pub view_count: u64,
    /// Currently equal to the raw view count; kept separate so a
    /// weighted score can replace it without changing the wire shape.
    pub popularity_score: f64,
}

/// Top viewed items, sorted by view count descending, at most 10.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopularItemsMetrics {
    pub category: Option<String>,
    pub items: Vec<PopularItem>,
    pub computed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryMetrics {
    pub dau: u64,
    pub conversions: u64,
    pub conversion_rate: f64,
}

/// Composite snapshot pushed to dashboards and live subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub computed_at: DateTime<Utc>,
    pub dau: u64,
    pub conversion_rate: f64,
    pub popular_items: HashMap<String, u64>,
    pub category_metrics: HashMap<String, CategoryMetrics>,
}

/// Conversion/step rate with the divide-by-zero guard: zero sessions
/// always yields 0.0, never NaN or infinity.
pub(crate) fn rate_percent(count: u64, total: u64) -> f64 {
    if total > 0 {
        count as f64 / total as f64 * 100.0
    } else {
        0.0
    }
}
