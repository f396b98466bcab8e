use std::path::PathBuf;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::SusumeError;

const DEFAULT_CONFIG: &str = include_str!("../../../config/default.toml");

/// Tunable parameters for the recommendation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendConfig {
    pub fusion: FusionConfig,
    pub matching: MatchingConfig,
    pub limits: LimitsConfig,
}

/// Weights used when combining content and collaborative scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionConfig {
    pub content_weight: f64,
    pub collab_weight: f64,
    /// Maximum genre-overlap bonus added to the collab score of an item
    /// surfaced by both methods.
    pub genre_bonus: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Minimum fuzzy confidence (0.0-1.0) to accept a title match.
    pub fuzzy_cutoff: f64,
    /// How many fuzzy candidates to consider before picking the best.
    pub max_fuzzy_candidates: usize,
    /// Minimum series-key similarity to treat two titles as one series.
    pub series_threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    pub default_n: usize,
    /// Requested result counts are clamped to [1, max_n], never rejected.
    pub max_n: usize,
    /// Upper bound on the hybrid overfetch working set.
    pub overfetch_cap: usize,
}

impl RecommendConfig {
    /// Load config: user file (if exists) merged over built-in defaults.
    pub fn load() -> Result<Self, SusumeError> {
        let user_path = Self::config_path();
        if user_path.exists() {
            let user_str = std::fs::read_to_string(&user_path)
                .map_err(|e| SusumeError::Config(e.to_string()))?;
            let user: RecommendConfig =
                toml::from_str(&user_str).map_err(|e| SusumeError::Config(e.to_string()))?;
            Ok(user)
        } else {
            toml::from_str(DEFAULT_CONFIG).map_err(|e| SusumeError::Config(e.to_string()))
        }
    }

    /// Path to the user config file (XDG on Linux, AppData on Windows).
    pub fn config_path() -> PathBuf {
        ProjectDirs::from("", "", "susume")
            .map(|d| d.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Default database location in the per-user data directory.
    pub fn db_path() -> PathBuf {
        ProjectDirs::from("", "", "susume")
            .map(|d| d.data_dir().join("susume.db"))
            .unwrap_or_else(|| PathBuf::from("susume.db"))
    }

    /// Clamp a requested result count to the configured [1, max_n] range.
    pub fn clamp_n(&self, n: usize) -> usize {
        n.clamp(1, self.limits.max_n)
    }
}

impl Default for RecommendConfig {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG).expect("built-in default config is valid TOML")
    }
}
