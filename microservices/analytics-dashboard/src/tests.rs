//! Unit tests for the Analytics Dashboard service

use async_trait::async_trait;
use axum::extract::ws::Message;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::cache::{Cache, CacheService, InMemoryCacheService};
use crate::config::{CacheBackend, DashboardConfig};
use crate::hub::DashboardHub;
use crate::metrics::{
    calculate_conversion_funnel, calculate_dau, calculate_popular_items, DashboardSnapshot,
    DauMetrics, FUNNEL_STEPS,
};
use crate::service::MetricsService;
use crate::store::{Event, EventStore, InMemoryEventStore, NewEvent};
use tracker_core::Result;

fn test_config() -> DashboardConfig {
    DashboardConfig {
        http_bind: "127.0.0.1:0".to_string(),
        cache_backend: CacheBackend::Local,
        redis_url: "redis://127.0.0.1:6379".to_string(),
        redis_op_timeout: Duration::from_millis(100),
        cache_ttl: Duration::from_secs(30),
        dashboard_refresh_interval: Duration::from_secs(10),
        dau_refresh_interval: Duration::from_secs(5),
        conversion_refresh_interval: Duration::from_secs(15),
        popular_refresh_interval: Duration::from_secs(20),
        broadcast_interval: Duration::from_secs(10),
        dau_realtime_window: ChronoDuration::seconds(10),
        dashboard_window: ChronoDuration::hours(1),
    }
}

async fn seed(
    store: &InMemoryEventStore,
    event_type: &str,
    user_id: &str,
    category: Option<&str>,
    item_name: Option<&str>,
) {
    let mut properties = serde_json::Map::new();
    if let Some(cat) = category {
        properties.insert("category".to_string(), json!(cat));
    }
    if let Some(item) = item_name {
        properties.insert("item_name".to_string(), json!(item));
    }
    store
        .append(NewEvent {
            event_type: event_type.to_string(),
            user_id: user_id.to_string(),
            session_id: format!("session-{}", user_id),
            timestamp: Some(Utc::now() - ChronoDuration::seconds(5)),
            properties,
        })
        .await
        .unwrap();
}

async fn seed_n(store: &InMemoryEventStore, event_type: &str, n: usize, category: Option<&str>) {
    for i in 0..n {
        seed(store, event_type, &format!("user-{}", i), category, None).await;
    }
}

/// Store wrapper counting read queries, used to verify the cache-aside
/// hit path never reaches the calculators.
struct CountingStore {
    inner: Arc<InMemoryEventStore>,
    reads: AtomicUsize,
}

impl CountingStore {
    fn new(inner: Arc<InMemoryEventStore>) -> Self {
        Self {
            inner,
            reads: AtomicUsize::new(0),
        }
    }

    fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventStore for CountingStore {
    async fn append(&self, event: NewEvent) -> Result<Event> {
        self.inner.append(event).await
    }

    async fn count_distinct_users_since(&self, since: DateTime<Utc>) -> Result<u64> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.count_distinct_users_since(since).await
    }

    async fn count_by_event_type_since(
        &self,
        event_type: &str,
        since: DateTime<Utc>,
    ) -> Result<u64> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.count_by_event_type_since(event_type, since).await
    }

    async fn count_by_event_type_and_category_since(
        &self,
        event_type: &str,
        category: &str,
        since: DateTime<Utc>,
    ) -> Result<u64> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner
            .count_by_event_type_and_category_since(event_type, category, since)
            .await
    }

    async fn find_by_event_type_since(
        &self,
        event_type: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Event>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.find_by_event_type_since(event_type, since).await
    }

    async fn find_by_event_type_and_category_since(
        &self,
        event_type: &str,
        category: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Event>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner
            .find_by_event_type_and_category_since(event_type, category, since)
            .await
    }

    async fn count_distinct_users_by_category_since(
        &self,
        category: &str,
        since: DateTime<Utc>,
    ) -> Result<u64> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner
            .count_distinct_users_by_category_since(category, since)
            .await
    }

    async fn count_orders_by_category_since(
        &self,
        category: &str,
        since: DateTime<Utc>,
    ) -> Result<u64> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner
            .count_orders_by_category_since(category, since)
            .await
    }
}

mod calculators {
    use super::*;

    #[tokio::test]
    async fn dau_counts_only_users_inside_the_window() {
        let store = InMemoryEventStore::new();
        seed(&store, "app_opened", "recent-1", None, None).await;
        seed(&store, "app_opened", "recent-2", None, None).await;
        // same user twice still counts once
        seed(&store, "screen_viewed", "recent-1", None, None).await;
        // outside the 10 second window
        store
            .append(NewEvent {
                event_type: "app_opened".to_string(),
                user_id: "stale".to_string(),
                session_id: "session-stale".to_string(),
                timestamp: Some(Utc::now() - ChronoDuration::minutes(5)),
                properties: serde_json::Map::new(),
            })
            .await
            .unwrap();

        let metrics = calculate_dau(&store, ChronoDuration::seconds(10)).await.unwrap();

        assert_eq!(metrics.dau_count, 2);
        assert_eq!(metrics.period, "last_10_seconds");
    }

    #[tokio::test]
    async fn conversion_funnel_pizza_scenario() {
        let store = InMemoryEventStore::new();
        seed_n(&store, "app_opened", 10, Some("pizza")).await;
        seed_n(&store, "screen_viewed", 8, Some("pizza")).await;
        seed_n(&store, "item_viewed", 6, Some("pizza")).await;
        seed_n(&store, "item_added_to_cart", 4, Some("pizza")).await;
        seed_n(&store, "checkout_started", 3, Some("pizza")).await;
        seed_n(&store, "order_placed", 2, Some("pizza")).await;

        let metrics = calculate_conversion_funnel(&store, Some("pizza"), ChronoDuration::hours(1))
            .await
            .unwrap();

        assert_eq!(metrics.total_sessions, 10);
        assert_eq!(metrics.conversions, 2);
        assert_eq!(metrics.conversion_rate, 20.0);
        assert_eq!(metrics.category.as_deref(), Some("pizza"));

        let expected = [
            ("app_opened", 10, 100.0),
            ("screen_viewed", 8, 80.0),
            ("item_viewed", 6, 60.0),
            ("item_added_to_cart", 4, 40.0),
            ("checkout_started", 3, 30.0),
            ("order_placed", 2, 20.0),
        ];
        assert_eq!(metrics.steps.len(), expected.len());
        for (step, (name, count, rate)) in metrics.steps.iter().zip(expected) {
            assert_eq!(step.step_name, name);
            assert_eq!(step.step_count, count);
            assert_eq!(step.conversion_rate, rate);
        }
    }

    #[tokio::test]
    async fn conversion_funnel_with_zero_sessions_never_divides_by_zero() {
        let store = InMemoryEventStore::new();

        let metrics = calculate_conversion_funnel(&store, None, ChronoDuration::hours(1))
            .await
            .unwrap();

        assert_eq!(metrics.total_sessions, 0);
        assert_eq!(metrics.conversion_rate, 0.0);
        assert_eq!(metrics.steps.len(), FUNNEL_STEPS.len());
        for step in &metrics.steps {
            assert_eq!(step.conversion_rate, 0.0);
            assert!(step.conversion_rate.is_finite());
        }
    }

    #[tokio::test]
    async fn funnel_filters_by_category() {
        let store = InMemoryEventStore::new();
        seed_n(&store, "app_opened", 4, Some("pizza")).await;
        seed_n(&store, "app_opened", 7, Some("burger")).await;

        let pizza = calculate_conversion_funnel(&store, Some("pizza"), ChronoDuration::hours(1))
            .await
            .unwrap();
        let all = calculate_conversion_funnel(&store, None, ChronoDuration::hours(1))
            .await
            .unwrap();

        assert_eq!(pizza.total_sessions, 4);
        assert_eq!(all.total_sessions, 11);
    }

    #[tokio::test]
    async fn popular_items_ranks_by_view_count_descending() {
        let store = InMemoryEventStore::new();
        for (item, views) in [("pizza_a", 5), ("pizza_b", 3), ("pizza_c", 1)] {
            for i in 0..views {
                seed(
                    &store,
                    "item_viewed",
                    &format!("user-{}-{}", item, i),
                    None,
                    Some(item),
                )
                .await;
            }
        }

        let metrics = calculate_popular_items(&store, None, ChronoDuration::hours(1))
            .await
            .unwrap();

        let ranked: Vec<(&str, u64, f64)> = metrics
            .items
            .iter()
            .map(|i| (i.item_name.as_str(), i.view_count, i.popularity_score))
            .collect();
        assert_eq!(
            ranked,
            vec![("pizza_a", 5, 5.0), ("pizza_b", 3, 3.0), ("pizza_c", 1, 1.0)]
        );
    }

    #[tokio::test]
    async fn popular_items_caps_at_ten() {
        let store = InMemoryEventStore::new();
        for n in 0..12 {
            let item = format!("item-{}", n);
            for i in 0..=n {
                seed(
                    &store,
                    "item_viewed",
                    &format!("user-{}-{}", n, i),
                    None,
                    Some(&item),
                )
                .await;
            }
        }

        let metrics = calculate_popular_items(&store, None, ChronoDuration::hours(1))
            .await
            .unwrap();

        assert_eq!(metrics.items.len(), 10);
        for pair in metrics.items.windows(2) {
            assert!(pair[0].view_count >= pair[1].view_count);
        }
        // the two least-viewed items fell off the list
        assert_eq!(metrics.items.last().unwrap().view_count, 3);
    }

    #[tokio::test]
    async fn popular_items_ignores_events_without_item_name() {
        let store = InMemoryEventStore::new();
        seed(&store, "item_viewed", "u1", Some("pizza"), None).await;
        seed(&store, "item_viewed", "u2", Some("pizza"), Some("margherita")).await;

        let metrics = calculate_popular_items(&store, Some("pizza"), ChronoDuration::hours(1))
            .await
            .unwrap();

        assert_eq!(metrics.items.len(), 1);
        assert_eq!(metrics.items[0].item_name, "margherita");
    }
}

mod cache_aside {
    use super::*;

    fn build_service(
        store: Arc<CountingStore>,
        backend: Arc<InMemoryCacheService>,
    ) -> MetricsService {
        let cache = Cache::new(backend as Arc<dyn CacheService>);
        MetricsService::new(store, cache, &test_config())
    }

    #[tokio::test]
    async fn second_read_within_ttl_skips_the_store() {
        let store = Arc::new(CountingStore::new(Arc::new(InMemoryEventStore::new())));
        let backend = Arc::new(InMemoryCacheService::new());
        let service = build_service(store.clone(), backend);

        let first = service.dau_metrics().await.unwrap();
        let reads_after_miss = store.read_count();
        assert!(reads_after_miss > 0);

        let second = service.dau_metrics().await.unwrap();
        assert_eq!(store.read_count(), reads_after_miss);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn miss_path_leaves_the_returned_value_in_the_cache() {
        let store = Arc::new(CountingStore::new(Arc::new(InMemoryEventStore::new())));
        let backend = Arc::new(InMemoryCacheService::new());
        let cache = Cache::new(backend.clone() as Arc<dyn CacheService>);
        let service = MetricsService::new(store, cache.clone(), &test_config());

        let returned = service.dau_metrics().await.unwrap();

        let cached: DauMetrics = cache.get("dashboard:dau").await.unwrap();
        assert_eq!(cached, returned);
    }

    #[tokio::test]
    async fn category_variants_cache_independently() {
        let inner = Arc::new(InMemoryEventStore::new());
        seed_n(&inner, "app_opened", 3, Some("pizza")).await;
        seed_n(&inner, "app_opened", 5, Some("burger")).await;
        let store = Arc::new(CountingStore::new(inner));
        let backend = Arc::new(InMemoryCacheService::new());
        let service = build_service(store.clone(), backend);

        let pizza = service.conversion_metrics(Some("pizza")).await.unwrap();
        let burger = service.conversion_metrics(Some("burger")).await.unwrap();
        assert_eq!(pizza.total_sessions, 3);
        assert_eq!(burger.total_sessions, 5);

        // both now served from cache
        let reads = store.read_count();
        service.conversion_metrics(Some("pizza")).await.unwrap();
        service.conversion_metrics(Some("burger")).await.unwrap();
        assert_eq!(store.read_count(), reads);
    }

    #[tokio::test]
    async fn mismatched_cached_payload_degrades_to_recompute() {
        let store = Arc::new(CountingStore::new(Arc::new(InMemoryEventStore::new())));
        let backend = Arc::new(InMemoryCacheService::new());
        let cache = Cache::new(backend.clone() as Arc<dyn CacheService>);
        let service = MetricsService::new(store, cache, &test_config());

        // poison the key with a payload of the wrong shape
        backend
            .put("dashboard:dau", json!("not a dau payload"), Duration::from_secs(30))
            .await;

        let metrics = service.dau_metrics().await.unwrap();
        assert_eq!(metrics.dau_count, 0);
    }

    #[tokio::test]
    async fn dashboard_snapshot_breaks_out_fixed_categories() {
        let inner = Arc::new(InMemoryEventStore::new());
        seed_n(&inner, "app_opened", 4, Some("pizza")).await;
        seed_n(&inner, "order_placed", 1, Some("pizza")).await;
        let store = Arc::new(CountingStore::new(inner));
        let backend = Arc::new(InMemoryCacheService::new());
        let service = build_service(store, backend);

        let snapshot = service.dashboard_metrics().await.unwrap();

        assert!(snapshot.category_metrics.contains_key("pizza"));
        assert!(snapshot.category_metrics.contains_key("burger"));
        let pizza = &snapshot.category_metrics["pizza"];
        assert_eq!(pizza.conversions, 1);
        assert_eq!(pizza.conversion_rate, 25.0);
        let burger = &snapshot.category_metrics["burger"];
        assert_eq!(burger.dau, 0);
        assert_eq!(burger.conversion_rate, 0.0);
    }
}

mod broadcast {
    use super::*;

    fn build_hub() -> Arc<DashboardHub> {
        let store: Arc<dyn EventStore> = Arc::new(InMemoryEventStore::new());
        let cache = Cache::new(Arc::new(InMemoryCacheService::new()) as Arc<dyn CacheService>);
        let metrics = Arc::new(MetricsService::new(store, cache, &test_config()));
        Arc::new(DashboardHub::new(metrics))
    }

    fn expect_snapshot(msg: Message) -> DashboardSnapshot {
        match msg {
            Message::Text(text) => serde_json::from_str(&text).unwrap(),
            other => panic!("expected text push, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn new_subscriber_gets_exactly_one_initial_snapshot() {
        let hub = build_hub();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();

        assert_eq!(hub.connected_count(), 0);
        hub.subscribe(id, tx).await;
        assert_eq!(hub.connected_count(), 1);

        expect_snapshot(rx.try_recv().unwrap());
        assert!(rx.try_recv().is_err());

        hub.unsubscribe(id);
        assert_eq!(hub.connected_count(), 0);

        // no further pushes target a removed subscriber
        hub.broadcast_snapshot().await.unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn broadcast_reaches_every_open_subscriber_with_the_same_payload() {
        let hub = build_hub();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        hub.subscribe(Uuid::new_v4(), tx1).await;
        hub.subscribe(Uuid::new_v4(), tx2).await;
        // drain initial pushes
        rx1.try_recv().unwrap();
        rx2.try_recv().unwrap();

        hub.broadcast_snapshot().await.unwrap();

        let a = expect_snapshot(rx1.try_recv().unwrap());
        let b = expect_snapshot(rx2.try_recv().unwrap());
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn failed_send_removes_only_the_broken_subscriber() {
        let hub = build_hub();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, rx2) = mpsc::unbounded_channel();
        hub.subscribe(Uuid::new_v4(), tx1).await;
        hub.subscribe(Uuid::new_v4(), tx2).await;
        rx1.try_recv().unwrap();
        assert_eq!(hub.connected_count(), 2);

        // simulate a dead connection
        drop(rx2);

        hub.broadcast_snapshot().await.unwrap();

        assert_eq!(hub.connected_count(), 1);
        expect_snapshot(rx1.try_recv().unwrap());
    }

    #[tokio::test]
    async fn push_to_targets_a_single_subscriber() {
        let hub = build_hub();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        let id1 = Uuid::new_v4();
        hub.subscribe(id1, tx1).await;
        hub.subscribe(Uuid::new_v4(), tx2).await;
        rx1.try_recv().unwrap();
        rx2.try_recv().unwrap();

        hub.push_to(id1).await;

        expect_snapshot(rx1.try_recv().unwrap());
        assert!(rx2.try_recv().is_err());
    }
}
