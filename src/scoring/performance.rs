use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ScoringConfig;
use crate::scoring::metrics::{find_plateau_day, sustained_growth, time_span_days, view_velocity};
use crate::{Aggregate, Baseline, DailyPoint, Datapoint, PerformanceMetrics};

// Absolute reach dominates, then early velocity, then watch depth.
const VIEW_WEIGHT: f64 = 50.0;
const VELOCITY_WEIGHT: f64 = 30.0;
const ENGAGEMENT_WEIGHT: f64 = 20.0;
const SUB_SCORE_CAP: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub view_score: f64,
    pub velocity_score: f64,
    pub engagement_score: f64,
    pub total: f64,
}

#[derive(Debug, Clone, Default)]
pub struct PerformanceScorer {
    config: ScoringConfig,
}

impl PerformanceScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn metrics(
        &self,
        series: &[DailyPoint],
        datapoints: &[Datapoint],
        baseline: &Baseline,
    ) -> PerformanceMetrics {
        let total_views = series.last().map(|point| point.cumulative_views).unwrap_or(0) as f64;
        let mut timestamps: Vec<i64> = datapoints.iter().map(|datapoint| datapoint.timestamp_ms).collect();
        timestamps.sort_unstable();
        let views: Vec<f64> = series.iter().map(|point| point.cumulative_views as f64).collect();

        PerformanceMetrics {
            view_velocity: view_velocity(total_views, time_span_days(&timestamps)),
            sustained_growth: sustained_growth(&views),
            plateau_point: find_plateau_day(&views, self.config.plateau_growth_percent),
            is_underperforming: total_views < baseline.average_views * self.config.underperforming_ratio,
        }
    }

    pub fn score(
        &self,
        total_views: f64,
        view_velocity: f64,
        avg_engagement_seconds: f64,
        baseline: &Baseline,
    ) -> ScoreBreakdown {
        let view_score = relative_score(total_views, baseline.average_views, VIEW_WEIGHT);
        let velocity_score = relative_score(view_velocity, baseline.average_velocity, VELOCITY_WEIGHT);
        let engagement_score =
            relative_score(avg_engagement_seconds, baseline.average_engagement, ENGAGEMENT_WEIGHT);
        let sum = view_score + velocity_score + engagement_score;

        ScoreBreakdown {
            view_score,
            velocity_score,
            engagement_score,
            total: if sum.is_nan() { 0.0 } else { sum.clamp(0.0, 100.0) },
        }
    }

    pub fn aggregate(
        &self,
        series: &[DailyPoint],
        datapoints: &[Datapoint],
        baseline: &Baseline,
        now: DateTime<Utc>,
    ) -> Aggregate {
        let last = series.last();
        let total_views = last.map(|point| point.cumulative_views).unwrap_or(0);
        let average_engagement_seconds = last.map(|point| point.avg_watch_seconds).unwrap_or(0.0);
        let average_engagement_percent = last.map(|point| point.avg_watch_percent).unwrap_or(0.0);

        let metrics = self.metrics(series, datapoints, baseline);
        let breakdown = self.score(
            total_views as f64,
            metrics.view_velocity,
            average_engagement_seconds,
            baseline,
        );

        Aggregate {
            total_views,
            average_engagement_seconds,
            average_engagement_percent,
            performance_score: breakdown.total,
            plateau_detected_at: (metrics.plateau_point > 0).then_some(now),
            metrics,
        }
    }
}

fn relative_score(value: f64, average: f64, weight: f64) -> f64 {
    let ratio = value / average.max(1.0);
    if ratio.is_nan() {
        return 0.0;
    }
    (ratio * weight).min(SUB_SCORE_CAP)
}
