//! Service configuration loaded from `ARTRECS_*` environment variables

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Prefix shared by every configuration variable
pub const ENV_PREFIX: &str = "ARTRECS_";

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Directory holding the `.dat` files
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Hours between scheduled model rebuilds
    #[serde(default = "default_rebuild_interval_hours")]
    pub rebuild_interval_hours: u64,

    /// Personalized over-fetch multiplier, clamped to [1.5, 2.0]
    #[serde(default = "default_overfetch_factor")]
    pub overfetch_factor: f32,

    /// Neighbours kept per item by the kNN trainer
    #[serde(default = "default_knn_neighbors")]
    pub knn_neighbors: usize,

    /// Hard cap on candidates per scoring signal (never above 50)
    #[serde(default = "default_signal_cap")]
    pub signal_cap: usize,

    /// Recent browses whose tags feed the history signal
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Browse rows considered when applying the viewed penalty
    #[serde(default = "default_viewed_lookback")]
    pub viewed_lookback: usize,

    /// Browse and like rows read to exclude already-seen posts
    #[serde(default = "default_exclusion_lookback")]
    pub exclusion_lookback: usize,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data/sample")
}

fn default_rebuild_interval_hours() -> u64 {
    48
}

fn default_overfetch_factor() -> f32 {
    2.0
}

fn default_knn_neighbors() -> usize {
    20
}

fn default_signal_cap() -> usize {
    50
}

fn default_history_window() -> usize {
    10
}

fn default_viewed_lookback() -> usize {
    200
}

fn default_exclusion_lookback() -> usize {
    5_000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            rebuild_interval_hours: default_rebuild_interval_hours(),
            overfetch_factor: default_overfetch_factor(),
            knn_neighbors: default_knn_neighbors(),
            signal_cap: default_signal_cap(),
            history_window: default_history_window(),
            viewed_lookback: default_viewed_lookback(),
            exclusion_lookback: default_exclusion_lookback(),
        }
    }
}

impl Config {
    /// Load configuration from the environment (and `.env`, if present)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    /// Load configuration from an explicit set of variables
    pub fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Result<Self> {
        envy::prefixed(ENV_PREFIX)
            .from_iter(vars)
            .context("Failed to load config")
    }

    pub fn rebuild_interval(&self) -> Duration {
        Duration::from_secs(self.rebuild_interval_hours.max(1) * 60 * 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_vars(Vec::new()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.rebuild_interval(), Duration::from_secs(48 * 3600));
    }

    #[test]
    fn test_prefixed_overrides() {
        let config = Config::from_vars(vars(&[
            ("ARTRECS_DATA_DIR", "/srv/data"),
            ("ARTRECS_SIGNAL_CAP", "25"),
            ("ARTRECS_OVERFETCH_FACTOR", "1.5"),
            ("ARTRECS_EXCLUSION_LOOKBACK", "800"),
            ("SIGNAL_CAP", "99"),
        ]))
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/srv/data"));
        assert_eq!(config.signal_cap, 25);
        assert_eq!(config.overfetch_factor, 1.5);
        assert_eq!(config.history_window, 10);
        assert_eq!(config.exclusion_lookback, 800);
    }

    #[test]
    fn test_invalid_value_is_an_error() {
        let result = Config::from_vars(vars(&[("ARTRECS_KNN_NEIGHBORS", "many")]));
        assert!(result.is_err());
    }
}
