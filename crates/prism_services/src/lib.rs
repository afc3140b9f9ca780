//! Prism Services Layer
//!
//! Host-facing configuration: settings and settings loading.

pub mod settings;

pub use settings::{GraphicsSettings, MotionSettings, Settings, SettingsError};
