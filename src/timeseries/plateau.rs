use crate::{percent_growth, DailyPoint};

const MOVING_AVERAGE_WINDOW: usize = 3;
const WARMUP_POINTS: usize = 7;
const MAX_CONSECUTIVE_REQUIRED: usize = 4;
const MAX_LOW_GROWTH_PERCENT: f64 = 1.5;
const TRIM_OFFSET: usize = 2;
const MIN_TRIMMED_POINTS: usize = 2;

pub fn trim_plateau(mut series: Vec<DailyPoint>) -> Vec<DailyPoint> {
    if let Some(length) = find_trim_length(&series) {
        series.truncate(length);
    }
    series
}

/// Number of points to keep, or `None` when the series should stay whole.
///
/// Low growth is judged on a trailing moving average of day-over-day growth
/// against `min(5% of the largest daily growth, 1.5%)`. The first run of low
/// days that starts after the warmup and lasts long enough sets the cut.
pub fn find_trim_length(series: &[DailyPoint]) -> Option<usize> {
    let total = series.len();
    if total < MIN_TRIMMED_POINTS {
        return None;
    }

    let growth = daily_growth(series);
    let smoothed = trailing_average(&growth, MOVING_AVERAGE_WINDOW);
    let max_growth = growth.iter().copied().fold(0.0_f64, f64::max);
    let threshold = (max_growth * 0.05).min(MAX_LOW_GROWTH_PERCENT);
    let consecutive_required = ((total as f64 * 0.1).ceil() as usize).clamp(1, MAX_CONSECUTIVE_REQUIRED);
    let warmup = total.min(WARMUP_POINTS);

    let mut run_start = 0usize;
    let mut run_length = 0usize;
    for (index, value) in smoothed.iter().enumerate().skip(warmup) {
        if *value < threshold {
            if run_length == 0 {
                run_start = index;
            }
            run_length += 1;
            if run_length >= consecutive_required {
                let keep = run_start + TRIM_OFFSET + 1;
                if keep >= MIN_TRIMMED_POINTS && keep < total {
                    return Some(keep);
                }
                return None;
            }
        } else {
            run_length = 0;
        }
    }

    None
}

fn daily_growth(series: &[DailyPoint]) -> Vec<f64> {
    let mut growth = Vec::with_capacity(series.len());
    growth.push(0.0);
    for pair in series.windows(2) {
        growth.push(percent_growth(
            pair[0].cumulative_views as f64,
            pair[1].cumulative_views as f64,
        ));
    }
    growth
}

fn trailing_average(values: &[f64], window: usize) -> Vec<f64> {
    values
        .iter()
        .enumerate()
        .map(|(index, _)| {
            let start = (index + 1).saturating_sub(window);
            crate::mean(&values[start..=index])
        })
        .collect()
}
