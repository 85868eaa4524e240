use chrono::{DateTime, Duration, Utc};

use crate::config::BaselineConfig;
use crate::error::Result;
use crate::scoring::time_span_days;
use crate::store::AnalyticsStore;
use crate::{mean, Baseline};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaselineSample {
    pub total_views: u64,
    pub engagement_seconds: f64,
    pub velocity: Option<f64>,
}

pub fn baseline_from_samples(samples: &[BaselineSample]) -> Baseline {
    if samples.is_empty() {
        return Baseline::COLD_START;
    }

    let views: Vec<f64> = samples.iter().map(|sample| sample.total_views as f64).collect();
    let engagement: Vec<f64> = samples.iter().map(|sample| sample.engagement_seconds).collect();
    let velocities: Vec<f64> = samples.iter().filter_map(|sample| sample.velocity).collect();

    Baseline {
        average_views: mean(&views),
        average_velocity: if velocities.is_empty() {
            Baseline::COLD_START.average_velocity
        } else {
            mean(&velocities)
        },
        average_engagement: mean(&engagement),
    }
}

pub struct BaselineEstimator<'a, S: AnalyticsStore + ?Sized> {
    store: &'a S,
    config: BaselineConfig,
}

impl<'a, S: AnalyticsStore + ?Sized> BaselineEstimator<'a, S> {
    pub fn new(store: &'a S, config: BaselineConfig) -> Self {
        Self { store, config }
    }

    pub async fn estimate(
        &self,
        channel_id: &str,
        now: DateTime<Utc>,
        exclude_post: Option<&str>,
    ) -> Result<Baseline> {
        let from = Duration::try_days(self.config.lookback_days)
            .and_then(|lookback| now.checked_sub_signed(lookback))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let posts = self
            .store
            .find_posts_by_channel(channel_id, Some(from), Some(now))
            .await?;

        let mut samples = Vec::new();
        for post in posts {
            if exclude_post == Some(post.id.as_str()) {
                continue;
            }
            for item in self.store.find_items_by_post(&post.id).await? {
                let Some(aggregate) = self.store.find_aggregate(&item.id).await? else {
                    continue;
                };
                let datapoints = self.store.find_datapoints(&item.id).await?;
                let velocity = if datapoints.is_empty() {
                    None
                } else {
                    let timestamps: Vec<i64> =
                        datapoints.iter().map(|datapoint| datapoint.timestamp_ms).collect();
                    Some(aggregate.total_views as f64 / time_span_days(&timestamps).max(1.0))
                };
                samples.push(BaselineSample {
                    total_views: aggregate.total_views,
                    engagement_seconds: aggregate.average_engagement_seconds,
                    velocity,
                });
            }
        }

        let baseline = baseline_from_samples(&samples);
        tracing::debug!(
            channel = channel_id,
            samples = samples.len(),
            average_views = baseline.average_views,
            "estimated baseline"
        );
        Ok(baseline)
    }
}
