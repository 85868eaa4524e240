pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::{Aggregate, Channel, Datapoint, MediaItem, Post};

pub use memory::MemoryStore;

#[async_trait]
pub trait AnalyticsStore: Send + Sync {
    async fn find_channel_by_platform(&self, platform: &str) -> Result<Option<Channel>>;

    async fn find_post(&self, post_id: &str) -> Result<Option<Post>>;

    async fn find_posts_by_channel(
        &self,
        channel_id: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<Post>>;

    async fn find_item(&self, item_id: &str) -> Result<Option<MediaItem>>;

    async fn find_items_by_post(&self, post_id: &str) -> Result<Vec<MediaItem>>;

    async fn find_datapoints(&self, item_id: &str) -> Result<Vec<Datapoint>>;

    async fn upsert_datapoints(&self, item_id: &str, datapoints: &[Datapoint]) -> Result<()>;

    async fn find_aggregate(&self, item_id: &str) -> Result<Option<Aggregate>>;

    async fn upsert_aggregate(&self, item_id: &str, aggregate: &Aggregate) -> Result<()>;

    async fn find_items_missing_aggregate(&self) -> Result<Vec<String>>;
}
