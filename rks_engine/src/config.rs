use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::judgment::JudgmentConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Leaderboard and rating settings. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Slots in the best-N list
    pub best_n: usize,
    /// Slots in the perfect-score list
    pub phi_n: usize,
    /// Records fetched per page
    pub page_size: usize,
    /// Hit windows used when rating new plays
    pub judgment: JudgmentConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            best_n: 27,
            phi_n: 3,
            page_size: 30,
            judgment: JudgmentConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::Invalid("page_size must be at least 1".to_string()));
        }
        let windows = [self.judgment.perfect_window_ms, self.judgment.good_window_ms];
        if windows.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ConfigError::Invalid(
                "judgment windows must be finite and non-negative".to_string(),
            ));
        }
        Ok(())
    }
}
