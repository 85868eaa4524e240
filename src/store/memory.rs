use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

use crate::error::Result;
use crate::store::AnalyticsStore;
use crate::{Aggregate, Channel, Datapoint, MediaItem, Post};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreState {
    pub channels: BTreeMap<String, Channel>,
    pub posts: BTreeMap<String, Post>,
    pub items: BTreeMap<String, MediaItem>,
    pub datapoints: BTreeMap<String, Vec<Datapoint>>,
    pub aggregates: BTreeMap<String, Aggregate>,
}

pub struct MemoryStore {
    path: Option<PathBuf>,
    state: RwLock<StoreState>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            path: None,
            state: RwLock::new(StoreState::default()),
        }
    }

    pub async fn load(path: PathBuf) -> Result<Self> {
        let state = if path.exists() {
            let data = tokio::fs::read_to_string(&path).await?;
            if data.trim().is_empty() {
                StoreState::default()
            } else {
                serde_json::from_str(&data)?
            }
        } else {
            StoreState::default()
        };

        Ok(Self {
            path: Some(path),
            state: RwLock::new(state),
        })
    }

    pub async fn insert_channel(&self, channel: Channel) -> Result<()> {
        let mut guard = self.state.write().await;
        guard.channels.insert(channel.id.clone(), channel);
        self.persist(&guard).await
    }

    pub async fn insert_post(&self, post: Post) -> Result<()> {
        let mut guard = self.state.write().await;
        guard.posts.insert(post.id.clone(), post);
        self.persist(&guard).await
    }

    pub async fn insert_item(&self, item: MediaItem) -> Result<()> {
        let mut guard = self.state.write().await;
        guard.items.insert(item.id.clone(), item);
        self.persist(&guard).await
    }

    pub async fn snapshot(&self) -> StoreState {
        self.state.read().await.clone()
    }

    async fn persist(&self, state: &StoreState) -> Result<()> {
        let Some(path) = self.path.as_ref() else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            ensure_dir(parent).await?;
        }
        let payload = serde_json::to_string_pretty(state)?;
        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, payload).await?;
        tokio::fs::rename(&tmp_path, path).await?;
        Ok(())
    }
}

#[async_trait]
impl AnalyticsStore for MemoryStore {
    async fn find_channel_by_platform(&self, platform: &str) -> Result<Option<Channel>> {
        let guard = self.state.read().await;
        Ok(guard
            .channels
            .values()
            .find(|channel| channel.platform.eq_ignore_ascii_case(platform))
            .cloned())
    }

    async fn find_post(&self, post_id: &str) -> Result<Option<Post>> {
        let guard = self.state.read().await;
        Ok(guard.posts.get(post_id).cloned())
    }

    async fn find_posts_by_channel(
        &self,
        channel_id: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<Post>> {
        let guard = self.state.read().await;
        let mut posts: Vec<Post> = guard
            .posts
            .values()
            .filter(|post| post.channel_id == channel_id)
            .filter(|post| from.map_or(true, |from| post.posted_at >= from))
            .filter(|post| to.map_or(true, |to| post.posted_at <= to))
            .cloned()
            .collect();
        posts.sort_by_key(|post| post.posted_at);
        Ok(posts)
    }

    async fn find_item(&self, item_id: &str) -> Result<Option<MediaItem>> {
        let guard = self.state.read().await;
        Ok(guard.items.get(item_id).cloned())
    }

    async fn find_items_by_post(&self, post_id: &str) -> Result<Vec<MediaItem>> {
        let guard = self.state.read().await;
        Ok(guard
            .items
            .values()
            .filter(|item| item.post_id == post_id)
            .cloned()
            .collect())
    }

    async fn find_datapoints(&self, item_id: &str) -> Result<Vec<Datapoint>> {
        let guard = self.state.read().await;
        Ok(guard.datapoints.get(item_id).cloned().unwrap_or_default())
    }

    async fn upsert_datapoints(&self, item_id: &str, datapoints: &[Datapoint]) -> Result<()> {
        let mut guard = self.state.write().await;
        let stored = guard.datapoints.entry(item_id.to_string()).or_default();
        for datapoint in datapoints {
            match stored.binary_search_by_key(&datapoint.timestamp_ms, |existing| existing.timestamp_ms) {
                Ok(index) => stored[index] = *datapoint,
                Err(index) => stored.insert(index, *datapoint),
            }
        }
        self.persist(&guard).await
    }

    async fn find_aggregate(&self, item_id: &str) -> Result<Option<Aggregate>> {
        let guard = self.state.read().await;
        Ok(guard.aggregates.get(item_id).cloned())
    }

    async fn upsert_aggregate(&self, item_id: &str, aggregate: &Aggregate) -> Result<()> {
        let mut guard = self.state.write().await;
        guard.aggregates.insert(item_id.to_string(), aggregate.clone());
        self.persist(&guard).await
    }

    async fn find_items_missing_aggregate(&self) -> Result<Vec<String>> {
        let guard = self.state.read().await;
        Ok(guard
            .datapoints
            .iter()
            .filter(|(item_id, datapoints)| {
                !datapoints.is_empty() && !guard.aggregates.contains_key(item_id.as_str())
            })
            .map(|(item_id, _)| item_id.clone())
            .collect())
    }
}

async fn ensure_dir(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() || path.exists() {
        return Ok(());
    }
    tokio::fs::create_dir_all(path).await?;
    Ok(())
}
