use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("post media item not found: {0}")]
    ItemNotFound(String),

    #[error("post not found: {0}")]
    PostNotFound(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;
