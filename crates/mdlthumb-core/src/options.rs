//! Configuration options for the thumbnail pipeline.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::caps::FeatureLevel;

/// Configuration for a thumbnail render.
///
/// Every field has a default, so a JSON file only needs the keys it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Clear color of the frame (linear RGBA).
    pub background_color: [f32; 4],

    /// Smallest edge length the host adapter will request.
    pub min_thumbnail_size: u32,

    /// Feature levels to request, broadest first.
    pub feature_levels: Vec<FeatureLevel>,

    /// Whether to enable driver validation and log uncaptured device errors.
    pub debug_validation: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            background_color: [0.2, 0.5, 0.698, 1.0],
            min_thumbnail_size: 64,
            feature_levels: FeatureLevel::ALL.to_vec(),
            debug_validation: cfg!(debug_assertions),
        }
    }
}

impl Options {
    /// Parses options from a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let options: Options = serde_json::from_str(json)?;
        options.check()?;
        Ok(options)
    }

    /// Loads options from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let options = Self::from_json_str(&text)?;
        log::debug!("loaded options from {}", path.display());
        Ok(options)
    }

    fn check(&self) -> Result<(), ConfigError> {
        if self.feature_levels.is_empty() {
            return Err(ConfigError::Invalid(
                "feature_levels must list at least one level".to_string(),
            ));
        }
        if self.min_thumbnail_size == 0 {
            return Err(ConfigError::Invalid(
                "min_thumbnail_size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Errors raised while loading [`Options`].
#[derive(Error, Debug)]
pub enum ConfigError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A value is out of range.
    #[error("invalid option: {0}")]
    Invalid(String),
}
