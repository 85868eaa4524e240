use crate::{mean, percent_growth, DAY_MS};

pub fn time_span_days(timestamps_ms: &[i64]) -> f64 {
    match (timestamps_ms.first(), timestamps_ms.last()) {
        (Some(first), Some(last)) if timestamps_ms.len() >= 2 => {
            ((last - first) as f64 / DAY_MS as f64).max(1.0)
        }
        _ => 0.0,
    }
}

pub fn view_velocity(total_views: f64, span_days: f64) -> f64 {
    if span_days <= 0.0 {
        0.0
    } else {
        total_views / span_days
    }
}

pub fn step_growth(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .map(|pair| percent_growth(pair[0], pair[1]))
        .collect()
}

pub fn sustained_growth(values: &[f64]) -> f64 {
    if values.len() < 3 {
        return 0.0;
    }
    mean(&step_growth(values)).max(0.0)
}

/// Index of the point where the first run of two or more low-growth steps begins.
///
/// Step `i` compares value `i` with value `i + 1`; a run starting at step `i`
/// is reported as point `i + 1`, the first point that grew too little. Returns
/// zero when there are fewer than three values or no such run.
pub fn find_plateau_day(values: &[f64], low_growth_percent: f64) -> usize {
    if values.len() < 3 {
        return 0;
    }

    let growth = step_growth(values);
    let mut run_start = 0usize;
    let mut run_length = 0usize;
    for (step, value) in growth.iter().enumerate() {
        if *value < low_growth_percent {
            if run_length == 0 {
                run_start = step;
            }
            run_length += 1;
            if run_length >= 2 {
                return run_start + 1;
            }
        } else {
            run_length = 0;
        }
    }

    0
}
