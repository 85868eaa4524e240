use chrono::{DateTime, Duration, Utc};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::ingest::{RawSample, SampleKind};
use crate::{Channel, MediaItem, Post};

const POST_SPACING_DAYS: i64 = 4;
const TRACKED_DAYS: i64 = 60;
const SAMPLE_SKIP_RATE: f64 = 0.3;

#[derive(Debug, Clone)]
pub struct SyntheticChannel {
    pub channel: Channel,
    pub posts: Vec<Post>,
    pub items: Vec<MediaItem>,
    pub batches: Vec<(String, Vec<RawSample>)>,
}

pub fn generate_synthetic_channel(
    seed: u64,
    platform: &str,
    post_count: usize,
    now: DateTime<Utc>,
) -> SyntheticChannel {
    let mut rng = StdRng::seed_from_u64(seed);
    let channel = Channel {
        id: format!("channel_{}", platform),
        platform: platform.to_string(),
    };

    let mut posts = Vec::with_capacity(post_count);
    let mut items = Vec::with_capacity(post_count);
    let mut batches = Vec::with_capacity(post_count);

    for idx in 0..post_count {
        let posted_at = now - Duration::days(1 + idx as i64 * POST_SPACING_DAYS);
        let post = Post {
            id: format!("post_{}", idx),
            channel_id: channel.id.clone(),
            posted_at,
            excluded_from_promotion: rng.gen::<f64>() < 0.05,
        };
        let item = MediaItem {
            id: format!("item_{}", idx),
            post_id: post.id.clone(),
            media_id: format!("media_{}", idx),
            analytics_id: Some(format!("analytics_{}", rng.gen_range(100_000..999_999))),
            duration_seconds: rng.gen_range(8.0..90.0),
        };

        let batch = sample_curve(&mut rng, posted_at, now, item.duration_seconds);
        batches.push((item.id.clone(), batch));
        posts.push(post);
        items.push(item);
    }

    SyntheticChannel {
        channel,
        posts,
        items,
        batches,
    }
}

fn sample_curve(
    rng: &mut StdRng,
    posted_at: DateTime<Utc>,
    now: DateTime<Utc>,
    duration_seconds: f64,
) -> Vec<RawSample> {
    let reach = rng.gen_range(200.0..5_000.0);
    let decay = rng.gen_range(0.08..0.6);
    let watch_fraction = rng.gen_range(0.2..0.9);
    let preview_share = rng.gen_range(0.0..0.3);

    let tracked_days = (now - posted_at).num_days().min(TRACKED_DAYS);
    let mut samples = Vec::new();
    let mut pending_views = 0.0;

    for day in 0..=tracked_days {
        let day_f = day as f64;
        pending_views += reach * ((-decay * day_f).exp() - (-decay * (day_f + 1.0)).exp());

        let last_day = day == tracked_days;
        if !last_day && day > 0 && rng.gen::<f64>() < SAMPLE_SKIP_RATE {
            continue;
        }

        let views = pending_views.round().max(0.0) as u64;
        pending_views = 0.0;
        let preview_views = (views as f64 * preview_share).round() as u64;
        let full_views = views - preview_views.min(views);
        let watch_ms = duration_seconds * watch_fraction * 1000.0;
        let timestamp = (posted_at + Duration::days(day) + Duration::hours(rng.gen_range(0..12)))
            .timestamp_millis();

        samples.push(RawSample {
            timestamp,
            views: full_views,
            preview_views,
            interaction_time: (full_views as f64 * watch_ms) as u64,
            preview_interaction_time: (preview_views as f64 * watch_ms * 0.5) as u64,
            kind: SampleKind::Media,
        });

        if rng.gen::<f64>() < 0.1 {
            samples.push(RawSample {
                timestamp,
                views: rng.gen_range(0..50),
                preview_views: 0,
                interaction_time: 0,
                preview_interaction_time: 0,
                kind: SampleKind::Bundle,
            });
        }
    }

    samples
}
