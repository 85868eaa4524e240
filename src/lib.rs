pub mod baseline;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod recommend;
pub mod scoring;
pub mod store;
pub mod synthetic;
pub mod timeseries;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub use crate::error::{AnalyticsError, Result};

pub const DAY_MS: i64 = 86_400_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub platform: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub channel_id: String,
    pub posted_at: DateTime<Utc>,
    #[serde(default)]
    pub excluded_from_promotion: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: String,
    pub post_id: String,
    pub media_id: String,
    #[serde(default)]
    pub analytics_id: Option<String>,
    #[serde(default)]
    pub duration_seconds: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Datapoint {
    pub timestamp_ms: i64,
    pub views: u64,
    pub interaction_time_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub view_velocity: f64,
    pub sustained_growth: f64,
    pub plateau_point: usize,
    pub is_underperforming: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    pub total_views: u64,
    pub average_engagement_seconds: f64,
    pub average_engagement_percent: f64,
    pub performance_score: f64,
    pub metrics: PerformanceMetrics,
    pub plateau_detected_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub average_views: f64,
    pub average_velocity: f64,
    pub average_engagement: f64,
}

impl Baseline {
    pub const COLD_START: Baseline = Baseline {
        average_views: 100.0,
        average_velocity: 10.0,
        average_engagement: 30.0,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub days_since_post: i64,
    pub cumulative_views: u64,
    pub avg_watch_seconds: f64,
    pub avg_watch_percent: f64,
}

impl DailyPoint {
    pub fn zero(date: NaiveDate, days_since_post: i64) -> Self {
        Self {
            date,
            days_since_post,
            cumulative_views: 0,
            avg_watch_seconds: 0.0,
            avg_watch_percent: 0.0,
        }
    }

    pub fn timestamp_ms(&self) -> i64 {
        self.date
            .and_hms_opt(0, 0, 0)
            .map(|start| start.and_utc().timestamp_millis())
            .unwrap_or(0)
    }
}

pub fn percent_growth(previous: f64, current: f64) -> f64 {
    if previous <= 0.0 {
        if current > previous {
            100.0
        } else {
            0.0
        }
    } else {
        (current - previous) / previous * 100.0
    }
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn format_number(value: f64) -> String {
    let rounded = value.round().max(0.0) as i64;
    let mut chars: Vec<char> = rounded.to_string().chars().collect();
    let mut result = String::new();
    let mut count = 0usize;

    while let Some(ch) = chars.pop() {
        if count == 3 {
            result.push(',');
            count = 0;
        }
        result.push(ch);
        count += 1;
    }

    result.chars().rev().collect()
}

pub fn format_signed_percent(value: f64) -> String {
    format!("{:+.1}%", value)
}

pub fn format_float(value: f64, digits: usize) -> String {
    format!("{:.1$}", value, digits)
}
