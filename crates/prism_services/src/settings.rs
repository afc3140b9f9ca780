//! Settings management

use prism_core::{TierThresholds, WiringMode};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Host settings. Every field is optional in the file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub graphics: GraphicsSettings,
    pub motion: MotionSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphicsSettings {
    /// Always present scenes as static content.
    pub disable_3d: bool,
    pub visibility_threshold: f32,
    pub wiring: WiringMode,
    pub tier_thresholds: TierThresholds,
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    /// Hero image path; `{width}` is replaced by the selected asset width.
    pub hero_image: Option<String>,
}

impl Default for GraphicsSettings {
    fn default() -> Self {
        Self {
            disable_3d: false,
            visibility_threshold: 0.15,
            wiring: WiringMode::default(),
            tier_thresholds: TierThresholds::default(),
            window_title: "Prism".to_string(),
            window_width: 1280,
            window_height: 720,
            hero_image: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionSettings {
    /// Overrides the OS reduced-motion preference when set.
    pub reduced_motion: Option<bool>,
}

impl Settings {
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_json(&json)?;
        tracing::info!(path = %path.display(), "settings loaded");
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
