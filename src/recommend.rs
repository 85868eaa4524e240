use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::config::RecommendationConfig;
use crate::Baseline;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdType {
    #[default]
    Views,
    Engagement,
}

impl ThresholdType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "views" | "view" => Some(ThresholdType::Views),
            "engagement" | "watch" => Some(ThresholdType::Engagement),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ThresholdType::Views => "views",
            ThresholdType::Engagement => "engagement",
        }
    }

    pub fn baseline_value(self, baseline: &Baseline) -> f64 {
        match self {
            ThresholdType::Views => baseline.average_views,
            ThresholdType::Engagement => baseline.average_engagement,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemPerformance {
    pub post_id: String,
    pub posted_at: DateTime<Utc>,
    pub media_id: String,
    pub total_views: u64,
    pub average_engagement_seconds: f64,
    pub excluded_from_promotion: bool,
    pub plateau_days_since_posted: Option<i64>,
}

impl ItemPerformance {
    pub fn actual_value(&self, threshold_type: ThresholdType) -> f64 {
        match threshold_type {
            ThresholdType::Views => self.total_views as f64,
            ThresholdType::Engagement => self.average_engagement_seconds,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemAssessment {
    pub days_since_posted: i64,
    pub is_within_window: bool,
    pub was_manually_excluded: bool,
    pub plateau_days_since_posted: Option<i64>,
    pub actual_value: f64,
    pub average_value: f64,
    pub percent_vs_average: f64,
    pub below_threshold: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationItem {
    pub post_id: String,
    pub posted_at: DateTime<Utc>,
    pub media_id: String,
    pub total_views: u64,
    pub average_engagement_seconds: f64,
    pub percent_vs_average: f64,
    pub plateau_days_since_posted: Option<i64>,
    pub days_since_posted: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recommendations {
    pub baseline_views: f64,
    pub baseline_engagement: f64,
    pub active_count: usize,
    pub consider_removing: Vec<RecommendationItem>,
    pub ready_to_repost: Vec<RecommendationItem>,
}

pub fn percent_vs_average(actual: f64, average: f64) -> f64 {
    if average == 0.0 {
        -100.0
    } else {
        (actual - average) / average * 100.0
    }
}

#[derive(Debug, Clone)]
pub struct RecommendationClassifier {
    config: RecommendationConfig,
    threshold_type: ThresholdType,
    threshold_value: Option<f64>,
}

impl RecommendationClassifier {
    pub fn new(
        config: RecommendationConfig,
        threshold_type: ThresholdType,
        threshold_value: Option<f64>,
    ) -> Self {
        Self {
            config,
            threshold_type,
            threshold_value,
        }
    }

    pub fn threshold_type(&self) -> ThresholdType {
        self.threshold_type
    }

    pub fn threshold(&self, baseline: &Baseline) -> f64 {
        self.threshold_value.unwrap_or_else(|| {
            self.threshold_type.baseline_value(baseline) * self.config.default_threshold_ratio
        })
    }

    pub fn assess(&self, item: &ItemPerformance, baseline: &Baseline, now: DateTime<Utc>) -> ItemAssessment {
        let days_since_posted = (now - item.posted_at).num_days();
        let actual_value = item.actual_value(self.threshold_type);
        let average_value = self.threshold_type.baseline_value(baseline);

        ItemAssessment {
            days_since_posted,
            is_within_window: days_since_posted <= self.config.active_window_days,
            was_manually_excluded: item.excluded_from_promotion,
            plateau_days_since_posted: item.plateau_days_since_posted,
            actual_value,
            average_value,
            percent_vs_average: percent_vs_average(actual_value, average_value),
            below_threshold: actual_value < self.threshold(baseline),
        }
    }

    pub fn classify(
        &self,
        items: &[ItemPerformance],
        baseline: &Baseline,
        now: DateTime<Utc>,
    ) -> Recommendations {
        let mut recommendations = Recommendations {
            baseline_views: baseline.average_views,
            baseline_engagement: baseline.average_engagement,
            ..Recommendations::default()
        };

        for item in items {
            let assessment = self.assess(item, baseline, now);
            if assessment.was_manually_excluded {
                continue;
            }

            if assessment.is_within_window {
                recommendations.active_count += 1;
                if assessment.plateau_days_since_posted.is_some() && assessment.below_threshold {
                    recommendations
                        .consider_removing
                        .push(to_recommendation(item, &assessment));
                }
            } else if assessment.percent_vs_average > 0.0 {
                recommendations
                    .ready_to_repost
                    .push(to_recommendation(item, &assessment));
            }
        }

        recommendations.consider_removing.sort_by(compare_percent);
        recommendations
            .ready_to_repost
            .sort_by(|a, b| compare_percent(b, a));

        recommendations
    }
}

fn to_recommendation(item: &ItemPerformance, assessment: &ItemAssessment) -> RecommendationItem {
    RecommendationItem {
        post_id: item.post_id.clone(),
        posted_at: item.posted_at,
        media_id: item.media_id.clone(),
        total_views: item.total_views,
        average_engagement_seconds: item.average_engagement_seconds,
        percent_vs_average: assessment.percent_vs_average,
        plateau_days_since_posted: assessment.plateau_days_since_posted,
        days_since_posted: assessment.days_since_posted,
    }
}

fn compare_percent(a: &RecommendationItem, b: &RecommendationItem) -> Ordering {
    a.percent_vs_average
        .partial_cmp(&b.percent_vs_average)
        .unwrap_or(Ordering::Equal)
}
