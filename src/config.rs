use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{AnalyticsError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationConfig {
    pub platform: String,
    pub active_window_days: i64,
    pub default_threshold_ratio: f64,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            platform: "fansly".to_string(),
            active_window_days: 90,
            default_threshold_ratio: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BaselineConfig {
    pub lookback_days: i64,
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self { lookback_days: 90 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub plateau_growth_percent: f64,
    pub underperforming_ratio: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            plateau_growth_percent: 5.0,
            underperforming_ratio: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/analytics.json"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub recommendation: RecommendationConfig,
    pub baseline: BaselineConfig,
    pub scoring: ScoringConfig,
    pub store: StoreConfig,
}

impl AnalyticsConfig {
    pub fn load(path: Option<PathBuf>) -> Result<(Self, Option<PathBuf>)> {
        let config_path = path.or_else(default_config_path);
        let mut config = match config_path.as_ref() {
            Some(path) if path.exists() => {
                let contents = std::fs::read_to_string(path)
                    .map_err(|err| AnalyticsError::Config(format!("failed to read config: {}", err)))?;
                toml::from_str(&contents)
                    .map_err(|err| AnalyticsError::Config(format!("failed to parse config: {}", err)))?
            }
            _ => AnalyticsConfig::default(),
        };

        config.apply_env_overrides();
        Ok((config, config_path))
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let payload = toml::to_string_pretty(self)
            .map_err(|err| AnalyticsError::Config(format!("failed to serialize config: {}", err)))?;
        std::fs::write(path, payload)?;
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(platform) = env::var("ANALYTICS_PLATFORM") {
            if !platform.trim().is_empty() {
                self.recommendation.platform = platform;
            }
        }
        if let Ok(days) = env::var("ANALYTICS_WINDOW_DAYS") {
            if let Ok(value) = days.parse::<i64>() {
                self.recommendation.active_window_days = value;
            }
        }
        if let Ok(days) = env::var("ANALYTICS_LOOKBACK_DAYS") {
            if let Ok(value) = days.parse::<i64>() {
                self.baseline.lookback_days = value;
            }
        }
        if let Ok(path) = env::var("ANALYTICS_STORE_PATH") {
            if !path.trim().is_empty() {
                self.store.path = PathBuf::from(path);
            }
        }
    }
}

fn default_config_path() -> Option<PathBuf> {
    env::var("ANALYTICS_CONFIG_PATH")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
        .or_else(|| Some(PathBuf::from("config/analytics.toml")))
}
