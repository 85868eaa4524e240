use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeMap;

use crate::timeseries::plateau::trim_plateau;
use crate::{DailyPoint, Datapoint};

#[derive(Debug, Clone, Copy)]
pub struct TimeSeriesReconstructor {
    today: NaiveDate,
}

impl TimeSeriesReconstructor {
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }

    pub fn reconstruct(
        &self,
        posted_at: DateTime<Utc>,
        duration_seconds: f64,
        datapoints: &[Datapoint],
    ) -> Vec<DailyPoint> {
        let post_day = posted_at.date_naive();
        if datapoints.is_empty() {
            return vec![DailyPoint::zero(post_day, 0)];
        }

        let mut days = observed_days(post_day, duration_seconds, datapoints);
        self.fill_gaps(post_day, &mut days);

        let mut series: Vec<DailyPoint> = days.into_values().collect();
        enforce_monotonic(&mut series);

        tracing::debug!(
            observed = datapoints.len(),
            days = series.len(),
            "reconstructed daily series"
        );
        series
    }

    pub fn reconstruct_trimmed(
        &self,
        posted_at: DateTime<Utc>,
        duration_seconds: f64,
        datapoints: &[Datapoint],
    ) -> Vec<DailyPoint> {
        trim_plateau(self.reconstruct(posted_at, duration_seconds, datapoints))
    }

    fn fill_gaps(&self, post_day: NaiveDate, days: &mut BTreeMap<NaiveDate, DailyPoint>) {
        let Some(last_observed) = days.keys().next_back().copied() else {
            return;
        };
        let end = last_observed.min(self.today);

        let mut day = post_day;
        while day <= end {
            if !days.contains_key(&day) {
                let prior = days.range(..day).next_back().map(|(_, point)| *point);
                let next = days.range(day..).next().map(|(_, point)| *point);
                let days_since_post = (day - post_day).num_days();

                let filled = match (prior, next) {
                    (Some(prior), Some(next)) => Some(interpolate(&prior, &next, day, days_since_post)),
                    (Some(prior), None) => Some(DailyPoint {
                        date: day,
                        days_since_post,
                        ..prior
                    }),
                    _ => None,
                };

                // written back so the next gap day interpolates from it
                if let Some(point) = filled {
                    days.insert(day, point);
                }
            }

            match day.succ_opt() {
                Some(next_day) => day = next_day,
                None => break,
            }
        }
    }
}

fn observed_days(
    post_day: NaiveDate,
    duration_seconds: f64,
    datapoints: &[Datapoint],
) -> BTreeMap<NaiveDate, DailyPoint> {
    let mut ordered = datapoints.to_vec();
    ordered.sort_by_key(|datapoint| datapoint.timestamp_ms);

    let mut days = BTreeMap::new();
    let mut cumulative_views = 0u64;
    let mut cumulative_interaction_ms = 0u64;

    for datapoint in &ordered {
        cumulative_views = cumulative_views.saturating_add(datapoint.views);
        cumulative_interaction_ms =
            cumulative_interaction_ms.saturating_add(datapoint.interaction_time_ms);

        let Some(at) = DateTime::<Utc>::from_timestamp_millis(datapoint.timestamp_ms) else {
            continue;
        };
        let date = at.date_naive();
        let avg_watch_seconds = if cumulative_views == 0 {
            0.0
        } else {
            cumulative_interaction_ms as f64 / 1000.0 / cumulative_views as f64
        };

        days.insert(
            date,
            DailyPoint {
                date,
                days_since_post: (date - post_day).num_days(),
                cumulative_views,
                avg_watch_seconds,
                avg_watch_percent: watch_percent(avg_watch_seconds, duration_seconds),
            },
        );
    }

    days
}

fn interpolate(prior: &DailyPoint, next: &DailyPoint, day: NaiveDate, days_since_post: i64) -> DailyPoint {
    let span = (next.date - prior.date).num_days() as f64;
    let ratio = if span <= 0.0 {
        0.0
    } else {
        (day - prior.date).num_days() as f64 / span
    };
    let lerp = |from: f64, to: f64| from + (to - from) * ratio;

    let views = lerp(prior.cumulative_views as f64, next.cumulative_views as f64)
        .round()
        .max(0.0) as u64;

    DailyPoint {
        date: day,
        days_since_post,
        cumulative_views: views.max(prior.cumulative_views),
        avg_watch_seconds: lerp(prior.avg_watch_seconds, next.avg_watch_seconds),
        avg_watch_percent: lerp(prior.avg_watch_percent, next.avg_watch_percent),
    }
}

fn enforce_monotonic(series: &mut [DailyPoint]) {
    let mut running_max = 0u64;
    for point in series.iter_mut() {
        running_max = running_max.max(point.cumulative_views);
        point.cumulative_views = running_max;
    }
}

fn watch_percent(avg_watch_seconds: f64, duration_seconds: f64) -> f64 {
    if duration_seconds <= 0.0 {
        0.0
    } else {
        avg_watch_seconds / duration_seconds * 100.0
    }
}
