use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Arc;

use post_pulse::baseline::BaselineEstimator;
use post_pulse::clock::FixedClock;
use post_pulse::config::{AnalyticsConfig, BaselineConfig};
use post_pulse::engine::AnalyticsEngine;
use post_pulse::ingest::{collapse_samples, RawSample, SampleKind};
use post_pulse::recommend::ThresholdType;
use post_pulse::store::{AnalyticsStore, MemoryStore};
use post_pulse::synthetic::generate_synthetic_channel;
use post_pulse::{AnalyticsError, Baseline, Channel, Datapoint, MediaItem, Post};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap()
}

fn engine(store: MemoryStore) -> AnalyticsEngine<MemoryStore> {
    AnalyticsEngine::with_clock(store, AnalyticsConfig::default(), Arc::new(FixedClock(now())))
}

fn sample(posted_at: DateTime<Utc>, offset_days: i64, views: u64, kind: SampleKind) -> RawSample {
    RawSample {
        timestamp: (posted_at + Duration::days(offset_days)).timestamp_millis(),
        views,
        preview_views: 0,
        interaction_time: views * 2_000,
        preview_interaction_time: 0,
        kind,
    }
}

async fn add_post(store: &MemoryStore, id: &str, days_ago: i64, analytics: bool) -> DateTime<Utc> {
    let posted_at = now() - Duration::days(days_ago);
    store
        .insert_post(Post {
            id: id.to_string(),
            channel_id: "chan".to_string(),
            posted_at,
            excluded_from_promotion: false,
        })
        .await
        .unwrap();
    store
        .insert_item(MediaItem {
            id: format!("{}_item", id),
            post_id: id.to_string(),
            media_id: format!("{}_media", id),
            analytics_id: analytics.then(|| format!("{}_analytics", id)),
            duration_seconds: 20.0,
        })
        .await
        .unwrap();
    posted_at
}

async fn store_with_channel() -> MemoryStore {
    let store = MemoryStore::new();
    store
        .insert_channel(Channel {
            id: "chan".to_string(),
            platform: "fansly".to_string(),
        })
        .await
        .unwrap();
    store
}

async fn ingest_daily(
    engine: &AnalyticsEngine<MemoryStore>,
    item_id: &str,
    posted_at: DateTime<Utc>,
    views: &[u64],
) {
    let batch: Vec<RawSample> = views
        .iter()
        .enumerate()
        .map(|(day, views)| sample(posted_at, day as i64, *views, SampleKind::Media))
        .collect();
    engine.ingest(item_id, &batch).await.unwrap();
}

#[test]
fn primary_samples_are_collapsed_per_timestamp() {
    let batch = vec![
        RawSample {
            timestamp: 1_000,
            views: 5,
            preview_views: 2,
            interaction_time: 4_000,
            preview_interaction_time: 500,
            kind: SampleKind::Media,
        },
        RawSample {
            timestamp: 1_000,
            views: 3,
            preview_views: 0,
            interaction_time: 1_000,
            preview_interaction_time: 0,
            kind: SampleKind::Media,
        },
        RawSample {
            timestamp: 1_000,
            views: 99,
            preview_views: 0,
            interaction_time: 99_000,
            preview_interaction_time: 0,
            kind: SampleKind::Bundle,
        },
        RawSample {
            timestamp: 2_000,
            views: 40,
            preview_views: 0,
            interaction_time: 40_000,
            preview_interaction_time: 0,
            kind: SampleKind::Other,
        },
    ];

    let datapoints = collapse_samples(&batch);
    assert_eq!(
        datapoints,
        vec![
            Datapoint {
                timestamp_ms: 1_000,
                views: 10,
                interaction_time_ms: 5_500,
            },
            Datapoint {
                timestamp_ms: 2_000,
                views: 0,
                interaction_time_ms: 0,
            },
        ]
    );
}

#[test]
fn sample_kind_deserializes_from_tags() {
    let batch: Vec<RawSample> = serde_json::from_str(
        r#"[
            {"timestamp": 1, "views": 3, "kind": "media"},
            {"timestamp": 2, "views": 4, "kind": "bundle"},
            {"timestamp": 3, "views": 5, "kind": "story"}
        ]"#,
    )
    .unwrap();

    let kinds: Vec<SampleKind> = batch.iter().map(|sample| sample.kind).collect();
    assert_eq!(kinds, vec![SampleKind::Media, SampleKind::Bundle, SampleKind::Other]);
    assert_eq!(batch[0].preview_views, 0);
}

#[test]
fn huge_counts_saturate_instead_of_overflowing() {
    let batch = vec![
        RawSample {
            timestamp: 1_000,
            views: u64::MAX,
            preview_views: 1,
            interaction_time: u64::MAX - 10,
            preview_interaction_time: 20,
            kind: SampleKind::Media,
        },
        RawSample {
            timestamp: 1_000,
            views: 7,
            preview_views: 0,
            interaction_time: 0,
            preview_interaction_time: 0,
            kind: SampleKind::Media,
        },
    ];

    let datapoints = collapse_samples(&batch);
    assert_eq!(datapoints.len(), 1);
    assert_eq!(datapoints[0].views, u64::MAX);
    assert_eq!(datapoints[0].interaction_time_ms, u64::MAX);
}

#[tokio::test]
async fn ingest_for_unknown_item_fails() {
    let engine = engine(store_with_channel().await);
    let result = engine.ingest("missing", &[]).await;

    assert!(matches!(result, Err(AnalyticsError::ItemNotFound(id)) if id == "missing"));
}

#[tokio::test]
async fn ingest_for_item_without_post_writes_nothing() {
    let store = store_with_channel().await;
    store
        .insert_item(MediaItem {
            id: "orphan_item".to_string(),
            post_id: "deleted".to_string(),
            media_id: "orphan_media".to_string(),
            analytics_id: Some("orphan_analytics".to_string()),
            duration_seconds: 20.0,
        })
        .await
        .unwrap();
    let engine = engine(store);

    let result = engine
        .ingest("orphan_item", &[sample(now(), 0, 10, SampleKind::Media)])
        .await;

    assert!(matches!(result, Err(AnalyticsError::PostNotFound(id)) if id == "deleted"));
    assert!(engine.store().find_datapoints("orphan_item").await.unwrap().is_empty());
    assert!(engine.store().find_aggregate("orphan_item").await.unwrap().is_none());
}

#[tokio::test]
async fn same_day_samples_keep_a_velocity() {
    let store = store_with_channel().await;
    let posted_at = add_post(&store, "p1", 3, true).await;
    let engine = engine(store);

    let batch: Vec<RawSample> = [1, 6, 11]
        .iter()
        .map(|hours| RawSample {
            timestamp: (posted_at + Duration::hours(*hours)).timestamp_millis(),
            ..sample(posted_at, 0, 100, SampleKind::Media)
        })
        .collect();
    engine.ingest("p1_item", &batch).await.unwrap();

    let series = engine.performance_series("p1_item").await.unwrap();
    assert_eq!(series.len(), 1);

    let aggregate = engine.store().find_aggregate("p1_item").await.unwrap().unwrap();
    assert_eq!(aggregate.total_views, 300);
    // ten hours of telemetry floor to a one-day span
    assert!((aggregate.metrics.view_velocity - 300.0).abs() < 1e-9);
}

#[tokio::test]
async fn ingest_persists_datapoints_and_aggregate() {
    let store = store_with_channel().await;
    let posted_at = add_post(&store, "p1", 10, true).await;
    let engine = engine(store);

    let batch = vec![
        sample(posted_at, 0, 50, SampleKind::Media),
        sample(posted_at, 1, 30, SampleKind::Media),
        sample(posted_at, 3, 20, SampleKind::Media),
    ];
    let written = engine.ingest("p1_item", &batch).await.unwrap();
    assert_eq!(written.len(), 3);

    let stored = engine.store().find_datapoints("p1_item").await.unwrap();
    assert_eq!(stored, written);

    let aggregate = engine.store().find_aggregate("p1_item").await.unwrap().unwrap();
    assert_eq!(aggregate.total_views, 100);
    assert!((aggregate.average_engagement_seconds - 2.0).abs() < 1e-9);
    assert!((aggregate.average_engagement_percent - 10.0).abs() < 1e-9);
    assert!(aggregate.performance_score >= 0.0 && aggregate.performance_score <= 100.0);
}

#[tokio::test]
async fn reingesting_the_same_batch_is_idempotent() {
    let store = store_with_channel().await;
    let posted_at = add_post(&store, "p1", 20, true).await;
    let other_posted = add_post(&store, "p2", 15, true).await;
    let engine = engine(store);

    engine
        .ingest("p2_item", &[sample(other_posted, 0, 300, SampleKind::Media)])
        .await
        .unwrap();

    let batch: Vec<RawSample> = (0..8)
        .map(|day| sample(posted_at, day, 100 / (day as u64 + 1), SampleKind::Media))
        .collect();
    engine.ingest("p1_item", &batch).await.unwrap();
    let first_points = engine.store().find_datapoints("p1_item").await.unwrap();
    let first_aggregate = engine.store().find_aggregate("p1_item").await.unwrap();

    engine.ingest("p1_item", &batch).await.unwrap();
    let second_points = engine.store().find_datapoints("p1_item").await.unwrap();
    let second_aggregate = engine.store().find_aggregate("p1_item").await.unwrap();

    assert_eq!(first_points, second_points);
    assert_eq!(first_aggregate, second_aggregate);
}

#[tokio::test]
async fn later_batch_overwrites_same_timestamp() {
    let store = store_with_channel().await;
    let posted_at = add_post(&store, "p1", 5, true).await;
    let engine = engine(store);

    engine
        .ingest("p1_item", &[sample(posted_at, 0, 10, SampleKind::Media)])
        .await
        .unwrap();
    engine
        .ingest(
            "p1_item",
            &[
                sample(posted_at, 0, 12, SampleKind::Media),
                sample(posted_at, 1, 4, SampleKind::Media),
            ],
        )
        .await
        .unwrap();

    let stored = engine.store().find_datapoints("p1_item").await.unwrap();
    let views: Vec<u64> = stored.iter().map(|datapoint| datapoint.views).collect();
    assert_eq!(views, vec![12, 4]);
    let aggregate = engine.store().find_aggregate("p1_item").await.unwrap().unwrap();
    assert_eq!(aggregate.total_views, 16);
}

#[tokio::test]
async fn baseline_without_history_is_cold_start() {
    let store = store_with_channel().await;
    add_post(&store, "p1", 5, true).await;

    let estimator = BaselineEstimator::new(&store, AnalyticsConfig::default().baseline);
    let baseline = estimator.estimate("chan", now(), None).await.unwrap();
    assert_eq!(baseline, Baseline::COLD_START);
}

#[tokio::test]
async fn baseline_averages_recent_aggregates_only() {
    let store = store_with_channel().await;
    let recent = add_post(&store, "recent", 10, true).await;
    let single = add_post(&store, "single", 5, true).await;
    let old = add_post(&store, "old", 120, true).await;
    let engine = engine(store);

    engine
        .ingest(
            "recent_item",
            &[
                sample(recent, 0, 300, SampleKind::Media),
                sample(recent, 4, 100, SampleKind::Media),
            ],
        )
        .await
        .unwrap();
    engine
        .ingest("single_item", &[sample(single, 0, 200, SampleKind::Media)])
        .await
        .unwrap();
    engine
        .ingest("old_item", &[sample(old, 0, 9_000, SampleKind::Media)])
        .await
        .unwrap();

    let estimator = BaselineEstimator::new(engine.store(), AnalyticsConfig::default().baseline);
    let baseline = estimator.estimate("chan", now(), None).await.unwrap();
    assert!((baseline.average_views - 300.0).abs() < 1e-9);
    assert!((baseline.average_engagement - 2.0).abs() < 1e-9);
    // 400 views over 4 days and 200 views over the one-day floor
    assert!((baseline.average_velocity - 150.0).abs() < 1e-9);

    let without_recent = estimator.estimate("chan", now(), Some("recent")).await.unwrap();
    assert!((without_recent.average_views - 200.0).abs() < 1e-9);
}

#[tokio::test]
async fn oversized_lookback_covers_all_history() {
    let store = store_with_channel().await;
    let old = add_post(&store, "old", 400, true).await;
    let engine = engine(store);
    engine
        .ingest("old_item", &[sample(old, 0, 500, SampleKind::Media)])
        .await
        .unwrap();

    let estimator = BaselineEstimator::new(
        engine.store(),
        BaselineConfig {
            lookback_days: i64::MAX,
        },
    );
    let baseline = estimator.estimate("chan", now(), None).await.unwrap();
    assert!((baseline.average_views - 500.0).abs() < 1e-9);

    let future_only = BaselineEstimator::new(engine.store(), BaselineConfig { lookback_days: -5 })
        .estimate("chan", now(), None)
        .await
        .unwrap();
    assert_eq!(future_only, Baseline::COLD_START);
}

#[tokio::test]
async fn backfill_computes_missing_aggregates_and_survives_failures() {
    let store = store_with_channel().await;
    let first = add_post(&store, "a", 10, true).await;
    let second = add_post(&store, "b", 12, true).await;
    let datapoint = |posted_at: DateTime<Utc>, views: u64| Datapoint {
        timestamp_ms: posted_at.timestamp_millis(),
        views,
        interaction_time_ms: views * 1_000,
    };
    store.upsert_datapoints("a_item", &[datapoint(first, 40)]).await.unwrap();
    store.upsert_datapoints("b_item", &[datapoint(second, 70)]).await.unwrap();
    // telemetry for an item that was never registered
    store.upsert_datapoints("ghost", &[datapoint(first, 5)]).await.unwrap();
    let engine = engine(store);

    let report = engine.backfill_aggregates().await.unwrap();
    assert_eq!(report.processed, 3);
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].item_id, "ghost");

    assert_eq!(
        engine.store().find_aggregate("a_item").await.unwrap().map(|agg| agg.total_views),
        Some(40)
    );
    assert_eq!(
        engine.store().find_aggregate("b_item").await.unwrap().map(|agg| agg.total_views),
        Some(70)
    );

    let rerun = engine.backfill_aggregates().await.unwrap();
    assert_eq!(rerun.processed, 1);
    assert_eq!(rerun.failed.len(), 1);
}

#[tokio::test]
async fn recommend_without_channel_returns_empty_result() {
    let engine = engine(MemoryStore::new());
    let result = engine.recommend(ThresholdType::Views, None).await.unwrap();

    assert_eq!(result.active_count, 0);
    assert_eq!(result.baseline_views, 0.0);
    assert_eq!(result.baseline_engagement, 0.0);
    assert!(result.consider_removing.is_empty());
    assert!(result.ready_to_repost.is_empty());
}

#[tokio::test]
async fn recommend_buckets_channel_posts() {
    let store = store_with_channel().await;
    let fresh = add_post(&store, "fresh", 30, true).await;
    let strong = add_post(&store, "strong", 10, true).await;
    let old = add_post(&store, "old", 120, true).await;
    let unmatched = add_post(&store, "unmatched", 5, false).await;
    let engine = engine(store);

    ingest_daily(&engine, "fresh_item", fresh, &[10, 1, 0, 0]).await;
    ingest_daily(&engine, "strong_item", strong, &[500, 300, 200]).await;
    ingest_daily(&engine, "old_item", old, &[1_000]).await;
    ingest_daily(&engine, "unmatched_item", unmatched, &[5, 0, 0]).await;

    let result = engine.recommend(ThresholdType::Views, None).await.unwrap();

    // baseline covers posts from the last 90 days, matched or not
    assert!((result.baseline_views - (11.0 + 1_000.0 + 5.0) / 3.0).abs() < 1e-9);
    assert_eq!(result.active_count, 2);

    assert_eq!(result.consider_removing.len(), 1);
    let flagged = &result.consider_removing[0];
    assert_eq!(flagged.post_id, "fresh");
    assert_eq!(flagged.media_id, "fresh_media");
    assert_eq!(flagged.total_views, 11);
    assert_eq!(flagged.plateau_days_since_posted, Some(2));
    assert_eq!(flagged.days_since_posted, 30);

    assert_eq!(result.ready_to_repost.len(), 1);
    assert_eq!(result.ready_to_repost[0].post_id, "old");
    assert!(result.ready_to_repost[0].percent_vs_average > 0.0);
}

#[tokio::test]
async fn display_series_is_trimmed_but_aggregate_uses_full_series() {
    let store = store_with_channel().await;
    let posted_at = add_post(&store, "p1", 50, true).await;
    let engine = engine(store);

    let mut batch = vec![
        sample(posted_at, 0, 400, SampleKind::Media),
        sample(posted_at, 1, 300, SampleKind::Media),
        sample(posted_at, 3, 200, SampleKind::Media),
    ];
    batch.extend((5..40).map(|day| sample(posted_at, day, 0, SampleKind::Media)));
    engine.ingest("p1_item", &batch).await.unwrap();

    let full = engine.performance_series("p1_item").await.unwrap();
    let display = engine.display_series("p1_item").await.unwrap();
    assert_eq!(full.len(), 40);
    assert!(display.len() < full.len());

    let analytics = engine.item_analytics("p1_item").await.unwrap();
    let aggregate = analytics.aggregate.unwrap();
    assert_eq!(aggregate.total_views, full.last().unwrap().cumulative_views);
    assert_eq!(analytics.series, display);
    assert_eq!(aggregate.plateau_detected_at, Some(now()));
}

#[tokio::test]
async fn store_round_trips_through_json_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("analytics.json");

    {
        let store = MemoryStore::load(path.clone()).await.unwrap();
        store
            .insert_channel(Channel {
                id: "chan".to_string(),
                platform: "fansly".to_string(),
            })
            .await
            .unwrap();
        store
            .upsert_datapoints(
                "item",
                &[
                    Datapoint {
                        timestamp_ms: 2_000,
                        views: 2,
                        interaction_time_ms: 0,
                    },
                    Datapoint {
                        timestamp_ms: 1_000,
                        views: 1,
                        interaction_time_ms: 0,
                    },
                ],
            )
            .await
            .unwrap();
    }

    let reloaded = MemoryStore::load(path).await.unwrap();
    let channel = reloaded.find_channel_by_platform("Fansly").await.unwrap();
    assert_eq!(channel.map(|channel| channel.id), Some("chan".to_string()));
    let timestamps: Vec<i64> = reloaded
        .find_datapoints("item")
        .await
        .unwrap()
        .iter()
        .map(|datapoint| datapoint.timestamp_ms)
        .collect();
    assert_eq!(timestamps, vec![1_000, 2_000]);
}

#[tokio::test]
async fn synthetic_channel_ingests_cleanly() {
    let synthetic = generate_synthetic_channel(42, "fansly", 12, now());
    let store = MemoryStore::new();
    store.insert_channel(synthetic.channel.clone()).await.unwrap();
    for post in synthetic.posts.clone() {
        store.insert_post(post).await.unwrap();
    }
    for item in synthetic.items.clone() {
        store.insert_item(item).await.unwrap();
    }
    let engine = engine(store);

    for (item_id, batch) in &synthetic.batches {
        engine.ingest(item_id, batch).await.unwrap();
        let series = engine.performance_series(item_id).await.unwrap();
        for pair in series.windows(2) {
            assert!(pair[0].cumulative_views <= pair[1].cumulative_views);
        }
    }

    let again = generate_synthetic_channel(42, "fansly", 12, now());
    assert_eq!(again.batches, synthetic.batches);

    let result = engine.recommend(ThresholdType::Views, None).await.unwrap();
    assert!(result.active_count <= synthetic.posts.len());
}
