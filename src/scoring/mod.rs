pub mod metrics;
pub mod performance;

pub use metrics::{find_plateau_day, step_growth, sustained_growth, time_span_days, view_velocity};
pub use performance::{PerformanceScorer, ScoreBreakdown};
