use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::Datapoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleKind {
    Media,
    Bundle,
    #[serde(other)]
    Other,
}

impl SampleKind {
    pub fn is_primary(self) -> bool {
        matches!(self, SampleKind::Media)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    pub timestamp: i64,
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub preview_views: u64,
    #[serde(default)]
    pub interaction_time: u64,
    #[serde(default)]
    pub preview_interaction_time: u64,
    pub kind: SampleKind,
}

pub fn collapse_samples(batch: &[RawSample]) -> Vec<Datapoint> {
    let mut by_timestamp: BTreeMap<i64, Datapoint> = BTreeMap::new();

    for sample in batch {
        let entry = by_timestamp.entry(sample.timestamp).or_insert(Datapoint {
            timestamp_ms: sample.timestamp,
            views: 0,
            interaction_time_ms: 0,
        });
        if !sample.kind.is_primary() {
            continue;
        }
        entry.views = entry
            .views
            .saturating_add(sample.views)
            .saturating_add(sample.preview_views);
        entry.interaction_time_ms = entry
            .interaction_time_ms
            .saturating_add(sample.interaction_time)
            .saturating_add(sample.preview_interaction_time);
    }

    by_timestamp.into_values().collect()
}
