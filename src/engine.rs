use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;

use crate::baseline::BaselineEstimator;
use crate::clock::{Clock, SystemClock};
use crate::config::AnalyticsConfig;
use crate::error::{AnalyticsError, Result};
use crate::ingest::{collapse_samples, RawSample};
use crate::recommend::{ItemPerformance, RecommendationClassifier, Recommendations, ThresholdType};
use crate::scoring::PerformanceScorer;
use crate::store::AnalyticsStore;
use crate::timeseries::TimeSeriesReconstructor;
use crate::{Aggregate, DailyPoint, Datapoint, MediaItem, Post};

#[derive(Debug, Clone, Serialize)]
pub struct BackfillFailure {
    pub item_id: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BackfillReport {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: Vec<BackfillFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemAnalytics {
    pub item_id: String,
    pub aggregate: Option<Aggregate>,
    pub series: Vec<DailyPoint>,
}

struct ItemContext {
    item: MediaItem,
    post: Post,
    datapoints: Vec<Datapoint>,
}

pub struct AnalyticsEngine<S: AnalyticsStore> {
    store: S,
    clock: Arc<dyn Clock>,
    config: AnalyticsConfig,
    scorer: PerformanceScorer,
}

impl<S: AnalyticsStore> AnalyticsEngine<S> {
    pub fn new(store: S, config: AnalyticsConfig) -> Self {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    pub fn with_clock(store: S, config: AnalyticsConfig, clock: Arc<dyn Clock>) -> Self {
        let scorer = PerformanceScorer::new(config.scoring.clone());
        Self {
            store,
            clock,
            config,
            scorer,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    pub async fn ingest(&self, item_id: &str, batch: &[RawSample]) -> Result<Vec<Datapoint>> {
        self.find_item_with_post(item_id).await?;

        let datapoints = collapse_samples(batch);
        if !datapoints.is_empty() {
            self.store.upsert_datapoints(item_id, &datapoints).await?;
        }
        tracing::info!(
            item = item_id,
            samples = batch.len(),
            datapoints = datapoints.len(),
            "ingested telemetry"
        );

        self.recompute_aggregate(item_id).await?;
        Ok(datapoints)
    }

    pub async fn recompute_aggregate(&self, item_id: &str) -> Result<Aggregate> {
        let context = self.load_context(item_id).await?;
        let now = self.clock.now();

        let series = self.reconstructor().reconstruct(
            context.post.posted_at,
            context.item.duration_seconds,
            &context.datapoints,
        );
        let baseline = BaselineEstimator::new(&self.store, self.config.baseline.clone())
            .estimate(&context.post.channel_id, now, Some(&context.post.id))
            .await?;
        let aggregate = self.scorer.aggregate(&series, &context.datapoints, &baseline, now);

        self.store.upsert_aggregate(item_id, &aggregate).await?;
        tracing::info!(
            item = item_id,
            total_views = aggregate.total_views,
            score = aggregate.performance_score,
            plateau_point = aggregate.metrics.plateau_point,
            "recomputed aggregate"
        );
        Ok(aggregate)
    }

    pub async fn backfill_aggregates(&self) -> Result<BackfillReport> {
        let pending = self.store.find_items_missing_aggregate().await?;
        let results = join_all(pending.iter().map(|item_id| async move {
            (item_id, self.recompute_aggregate(item_id).await)
        }))
        .await;

        let mut report = BackfillReport {
            processed: results.len(),
            ..BackfillReport::default()
        };
        for (item_id, result) in results {
            match result {
                Ok(_) => report.succeeded += 1,
                Err(err) => {
                    tracing::warn!(item = item_id.as_str(), error = %err, "aggregate backfill failed");
                    report.failed.push(BackfillFailure {
                        item_id: item_id.clone(),
                        error: err.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            processed = report.processed,
            succeeded = report.succeeded,
            failed = report.failed.len(),
            "aggregate backfill finished"
        );
        Ok(report)
    }

    pub async fn recommend(
        &self,
        threshold_type: ThresholdType,
        threshold_value: Option<f64>,
    ) -> Result<Recommendations> {
        let platform = &self.config.recommendation.platform;
        let Some(channel) = self.store.find_channel_by_platform(platform).await? else {
            tracing::info!(platform = platform.as_str(), "no channel configured for platform");
            return Ok(Recommendations::default());
        };

        let now = self.clock.now();
        let baseline = BaselineEstimator::new(&self.store, self.config.baseline.clone())
            .estimate(&channel.id, now, None)
            .await?;

        let mut items = Vec::new();
        for post in self.store.find_posts_by_channel(&channel.id, None, None).await? {
            for item in self.store.find_items_by_post(&post.id).await? {
                if item.analytics_id.is_none() {
                    continue;
                }
                let Some(aggregate) = self.store.find_aggregate(&item.id).await? else {
                    continue;
                };
                let plateau_days_since_posted = self
                    .plateau_days_since_posted(&post, &item, &aggregate)
                    .await?;
                items.push(ItemPerformance {
                    post_id: post.id.clone(),
                    posted_at: post.posted_at,
                    media_id: item.media_id.clone(),
                    total_views: aggregate.total_views,
                    average_engagement_seconds: aggregate.average_engagement_seconds,
                    excluded_from_promotion: post.excluded_from_promotion,
                    plateau_days_since_posted,
                });
            }
        }

        let classifier = RecommendationClassifier::new(
            self.config.recommendation.clone(),
            threshold_type,
            threshold_value,
        );
        let recommendations = classifier.classify(&items, &baseline, now);
        tracing::info!(
            channel = channel.id.as_str(),
            threshold = threshold_type.label(),
            active = recommendations.active_count,
            remove = recommendations.consider_removing.len(),
            repost = recommendations.ready_to_repost.len(),
            "built recommendations"
        );
        Ok(recommendations)
    }

    pub async fn performance_series(&self, item_id: &str) -> Result<Vec<DailyPoint>> {
        let context = self.load_context(item_id).await?;
        Ok(self.reconstructor().reconstruct(
            context.post.posted_at,
            context.item.duration_seconds,
            &context.datapoints,
        ))
    }

    pub async fn display_series(&self, item_id: &str) -> Result<Vec<DailyPoint>> {
        let context = self.load_context(item_id).await?;
        Ok(self.reconstructor().reconstruct_trimmed(
            context.post.posted_at,
            context.item.duration_seconds,
            &context.datapoints,
        ))
    }

    pub async fn item_analytics(&self, item_id: &str) -> Result<ItemAnalytics> {
        let series = self.display_series(item_id).await?;
        let aggregate = self.store.find_aggregate(item_id).await?;
        Ok(ItemAnalytics {
            item_id: item_id.to_string(),
            aggregate,
            series,
        })
    }

    async fn plateau_days_since_posted(
        &self,
        post: &Post,
        item: &MediaItem,
        aggregate: &Aggregate,
    ) -> Result<Option<i64>> {
        if aggregate.metrics.plateau_point == 0 {
            return Ok(None);
        }
        let datapoints = self.store.find_datapoints(&item.id).await?;
        if datapoints.is_empty() {
            return Ok(None);
        }
        let series = self
            .reconstructor()
            .reconstruct(post.posted_at, item.duration_seconds, &datapoints);
        Ok(series
            .get(aggregate.metrics.plateau_point)
            .map(|point| point.days_since_post))
    }

    async fn load_context(&self, item_id: &str) -> Result<ItemContext> {
        let (item, post) = self.find_item_with_post(item_id).await?;
        let datapoints = self.store.find_datapoints(item_id).await?;
        Ok(ItemContext {
            item,
            post,
            datapoints,
        })
    }

    async fn find_item_with_post(&self, item_id: &str) -> Result<(MediaItem, Post)> {
        let item = self
            .store
            .find_item(item_id)
            .await?
            .ok_or_else(|| AnalyticsError::ItemNotFound(item_id.to_string()))?;
        let post = self
            .store
            .find_post(&item.post_id)
            .await?
            .ok_or_else(|| AnalyticsError::PostNotFound(item.post_id.clone()))?;
        Ok((item, post))
    }

    fn reconstructor(&self) -> TimeSeriesReconstructor {
        TimeSeriesReconstructor::new(self.clock.now().date_naive())
    }
}
