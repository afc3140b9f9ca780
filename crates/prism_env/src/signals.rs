//! Raw capability signals
//!
//! Every field is best-effort: a browser host fills them from `navigator`,
//! `matchMedia` and `devicePixelRatio`, a native host from [`HostResources`].
//! Nothing here is interpreted; classification happens in `prism_core`.

use crate::memory::HostResources;
use crate::user_agent;
use serde::{Deserialize, Serialize};

/// Result of trying to obtain a hardware-accelerated 3D context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GraphicsSignal {
    /// No probe has run yet.
    #[default]
    Unknown,
    /// Neither the preferred nor the legacy context could be created.
    Unavailable,
    Accelerated {
        max_texture_dimension: u32,
        /// The backend reported a software or otherwise degraded adapter.
        #[serde(default)]
        performance_caveat: bool,
    },
}

/// Effective connection type (`navigator.connection.effectiveType`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectionClass {
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
    #[serde(rename = "slow-2g")]
    Slow2g,
    #[serde(rename = "2g")]
    TwoG,
    #[serde(rename = "3g")]
    ThreeG,
    #[serde(rename = "4g")]
    FourG,
}

/// Everything the capability probe reads, in one place.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSignals {
    pub device_memory_gb: Option<f32>,
    pub logical_cores: Option<u32>,
    pub user_agent: Option<String>,
    pub pixel_density: Option<f32>,
    pub graphics: GraphicsSignal,
    pub connection: ConnectionClass,
    pub save_data: bool,
    pub prefers_reduced_motion: bool,
}

impl DeviceSignals {
    /// Collect what the native host can tell us. Pixel density and graphics
    /// support are only known once a window and adapter exist; callers add them
    /// with [`with_pixel_density`](Self::with_pixel_density) and
    /// [`with_graphics`](Self::with_graphics).
    pub fn detect() -> Self {
        let resources = HostResources::detect();
        let signals = Self {
            device_memory_gb: resources.device_memory_gb(),
            logical_cores: resources.logical_cores,
            user_agent: Some(user_agent::native_user_agent()),
            ..Self::default()
        };
        tracing::debug!(
            memory_gb = ?signals.device_memory_gb,
            cores = ?signals.logical_cores,
            user_agent = ?signals.user_agent,
            "collected host signals"
        );
        signals
    }

    pub fn with_graphics(mut self, graphics: GraphicsSignal) -> Self {
        self.graphics = graphics;
        self
    }

    pub fn with_pixel_density(mut self, pixel_density: f64) -> Self {
        self.pixel_density = Some(pixel_density as f32);
        self
    }

    pub fn with_reduced_motion(mut self, reduced: bool) -> Self {
        self.prefers_reduced_motion = reduced;
        self
    }

    pub fn is_mobile_user_agent(&self) -> bool {
        self.user_agent
            .as_deref()
            .map(user_agent::is_mobile_user_agent)
            .unwrap_or(false)
    }

    /// Slow links and data-saver mode both ask for the lightest assets.
    pub fn constrained_network(&self) -> bool {
        let slow_link = matches!(self.connection, ConnectionClass::Slow2g | ConnectionClass::TwoG);
        self.save_data || slow_link
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_browser_blob() {
        let json = r#"{
            "device_memory_gb": 8,
            "logical_cores": 8,
            "user_agent": "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) Mobile/15E148",
            "pixel_density": 3.0,
            "graphics": { "kind": "accelerated", "max_texture_dimension": 4096 },
            "connection": "3g"
        }"#;
        let signals: DeviceSignals = serde_json::from_str(json).unwrap();
        assert_eq!(signals.device_memory_gb, Some(8.0));
        assert_eq!(
            signals.graphics,
            GraphicsSignal::Accelerated {
                max_texture_dimension: 4096,
                performance_caveat: false
            }
        );
        assert_eq!(signals.connection, ConnectionClass::ThreeG);
        assert!(signals.is_mobile_user_agent());
        assert!(!signals.prefers_reduced_motion);
        assert!(!signals.constrained_network());
    }

    #[test]
    fn empty_blob_means_nothing_reported() {
        let signals: DeviceSignals = serde_json::from_str("{}").unwrap();
        assert_eq!(signals, DeviceSignals::default());
        assert_eq!(signals.graphics, GraphicsSignal::Unknown);
        assert!(!signals.is_mobile_user_agent());
    }

    #[test]
    fn save_data_and_2g_are_constrained() {
        let slow = DeviceSignals {
            connection: ConnectionClass::Slow2g,
            ..Default::default()
        };
        let saver = DeviceSignals {
            save_data: true,
            connection: ConnectionClass::FourG,
            ..Default::default()
        };
        assert!(slow.constrained_network());
        assert!(saver.constrained_network());
    }

    #[test]
    fn builders_fill_late_signals() {
        let signals = DeviceSignals::default()
            .with_pixel_density(2.0)
            .with_reduced_motion(true)
            .with_graphics(GraphicsSignal::Unavailable);
        assert_eq!(signals.pixel_density, Some(2.0));
        assert!(signals.prefers_reduced_motion);
        assert_eq!(signals.graphics, GraphicsSignal::Unavailable);
    }
}
