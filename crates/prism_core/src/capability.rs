//! Capability probe
//!
//! Turns best-effort [`DeviceSignals`] into an immutable [`CapabilityRecord`].
//! Every missing signal has a conservative default, so probing never fails.

use prism_env::{DeviceSignals, GraphicsSignal};
use serde::{Deserialize, Serialize};

/// Assumed when `deviceMemory` is not reported.
pub const DEFAULT_MEMORY_GB: f32 = 4.0;
/// Assumed when `hardwareConcurrency` is not reported.
pub const DEFAULT_CORES: u32 = 4;
/// Texture ceiling when no graphics context could be queried.
pub const DEFAULT_MAX_TEXTURE_DIMENSION: u32 = 2048;

/// Coarse performance classification, derived once per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PerformanceTier {
    Low,
    Medium,
    High,
}

/// Classification thresholds. These are heuristics, not benchmarked values,
/// so they can be overridden from settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierThresholds {
    /// Mobile devices below this memory are low tier.
    pub mobile_min_memory_gb: f32,
    /// Mobile devices below this core count are low tier.
    pub mobile_min_cores: u32,
    /// Any device at or below this memory is low tier.
    pub low_max_memory_gb: f32,
    /// Any device at or below this core count is low tier.
    pub low_max_cores: u32,
    /// At or below this memory (and not low) is medium tier.
    pub medium_max_memory_gb: f32,
    /// At or below this core count (and not low) is medium tier.
    pub medium_max_cores: u32,
    /// Below this memory the device is flagged low-end regardless of tier.
    pub low_end_min_memory_gb: f32,
    /// Below this core count the device is flagged low-end regardless of tier.
    pub low_end_min_cores: u32,
    /// Parallel budget for low-end devices.
    pub low_end_concurrency: u32,
    /// Parallel budget for everything else.
    pub max_concurrency: u32,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            mobile_min_memory_gb: 4.0,
            mobile_min_cores: 4,
            low_max_memory_gb: 2.0,
            low_max_cores: 2,
            medium_max_memory_gb: 8.0,
            medium_max_cores: 6,
            low_end_min_memory_gb: 4.0,
            low_end_min_cores: 4,
            low_end_concurrency: 2,
            max_concurrency: 8,
        }
    }
}

impl TierThresholds {
    pub fn classify(&self, memory_gb: f32, cores: u32, mobile: bool) -> PerformanceTier {
        let weak_mobile =
            mobile && (memory_gb < self.mobile_min_memory_gb || cores < self.mobile_min_cores);
        if weak_mobile || memory_gb <= self.low_max_memory_gb || cores <= self.low_max_cores {
            PerformanceTier::Low
        } else if memory_gb <= self.medium_max_memory_gb || cores <= self.medium_max_cores {
            PerformanceTier::Medium
        } else {
            PerformanceTier::High
        }
    }
}

/// What this client can do, computed once and never mutated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapabilityRecord {
    performance_tier: PerformanceTier,
    is_mobile_form_factor: bool,
    supports_accelerated_graphics: bool,
    max_texture_dimension: u32,
    pixel_density: f32,
    concurrency_budget: u32,
    is_low_end_device: bool,
    particle_budget_multiplier: f32,
    device_memory_gb: f32,
    logical_cores: u32,
}

impl CapabilityRecord {
    pub fn probe(signals: &DeviceSignals) -> Self {
        Self::probe_with(signals, &TierThresholds::default())
    }

    pub fn probe_with(signals: &DeviceSignals, thresholds: &TierThresholds) -> Self {
        let device_memory_gb = signals
            .device_memory_gb
            .filter(|gb| gb.is_finite() && *gb > 0.0)
            .unwrap_or(DEFAULT_MEMORY_GB);
        let logical_cores = signals.logical_cores.filter(|&n| n > 0).unwrap_or(DEFAULT_CORES);
        let is_mobile_form_factor = signals.is_mobile_user_agent();

        // An unknown or caveated context counts as unaccelerated.
        let (supports_accelerated_graphics, max_texture_dimension) = match signals.graphics {
            GraphicsSignal::Accelerated { max_texture_dimension, performance_caveat } => {
                let dimension = if max_texture_dimension > 0 {
                    max_texture_dimension
                } else {
                    DEFAULT_MAX_TEXTURE_DIMENSION
                };
                (!performance_caveat, dimension)
            }
            GraphicsSignal::Unavailable | GraphicsSignal::Unknown => {
                (false, DEFAULT_MAX_TEXTURE_DIMENSION)
            }
        };

        let pixel_density = signals
            .pixel_density
            .filter(|d| d.is_finite() && *d > 0.0)
            .unwrap_or(1.0);

        let performance_tier =
            thresholds.classify(device_memory_gb, logical_cores, is_mobile_form_factor);

        let is_low_end_device = performance_tier == PerformanceTier::Low
            || !supports_accelerated_graphics
            || device_memory_gb < thresholds.low_end_min_memory_gb
            || logical_cores < thresholds.low_end_min_cores;

        let particle_budget_multiplier =
            if performance_tier == PerformanceTier::High && supports_accelerated_graphics {
                1.5
            } else if performance_tier == PerformanceTier::Low || !supports_accelerated_graphics {
                0.5
            } else {
                1.0
            };

        let concurrency_cap = if is_low_end_device {
            thresholds.low_end_concurrency
        } else {
            thresholds.max_concurrency
        };

        Self {
            performance_tier,
            is_mobile_form_factor,
            supports_accelerated_graphics,
            max_texture_dimension,
            pixel_density,
            concurrency_budget: logical_cores.min(concurrency_cap).max(1),
            is_low_end_device,
            particle_budget_multiplier,
            device_memory_gb,
            logical_cores,
        }
    }

    pub fn performance_tier(&self) -> PerformanceTier {
        self.performance_tier
    }

    pub fn is_mobile_form_factor(&self) -> bool {
        self.is_mobile_form_factor
    }

    pub fn supports_accelerated_graphics(&self) -> bool {
        self.supports_accelerated_graphics
    }

    pub fn max_texture_dimension(&self) -> u32 {
        self.max_texture_dimension
    }

    pub fn pixel_density(&self) -> f32 {
        self.pixel_density
    }

    pub fn concurrency_budget(&self) -> u32 {
        self.concurrency_budget
    }

    pub fn is_low_end_device(&self) -> bool {
        self.is_low_end_device
    }

    pub fn particle_budget_multiplier(&self) -> f32 {
        self.particle_budget_multiplier
    }

    /// Memory used for classification, after defaults.
    pub fn device_memory_gb(&self) -> f32 {
        self.device_memory_gb
    }

    /// Core count used for classification, after defaults.
    pub fn logical_cores(&self) -> u32 {
        self.logical_cores
    }

    /// Largest pixel extent any asset or render target should use. Shared by the
    /// scene surface and image selection.
    pub fn resolution_ceiling(&self) -> u32 {
        self.max_texture_dimension
    }

    /// Apply the particle multiplier to a base count. Always floors, so a
    /// given tier yields the same count everywhere.
    pub fn scaled_particle_count(&self, base: u32) -> u32 {
        (base as f64 * self.particle_budget_multiplier as f64).floor() as u32
    }
}

impl Default for CapabilityRecord {
    /// The record for a client that reported nothing: medium tier with
    /// conservative flags.
    fn default() -> Self {
        Self::probe(&DeviceSignals::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DESKTOP_UA: &str =
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 Chrome/120.0 Safari/537.36";
    const MOBILE_UA: &str =
        "Mozilla/5.0 (Linux; Android 10; K) AppleWebKit/537.36 Chrome/120.0 Mobile Safari/537.36";

    fn signals(
        memory: Option<f32>,
        cores: Option<u32>,
        ua: &str,
        graphics: GraphicsSignal,
    ) -> DeviceSignals {
        DeviceSignals {
            device_memory_gb: memory,
            logical_cores: cores,
            user_agent: Some(ua.to_string()),
            graphics,
            ..Default::default()
        }
    }

    fn accelerated(max_texture_dimension: u32) -> GraphicsSignal {
        GraphicsSignal::Accelerated {
            max_texture_dimension,
            performance_caveat: false,
        }
    }

    #[test]
    fn weak_mobile_without_graphics_is_low() {
        let input = signals(Some(2.0), Some(2), MOBILE_UA, GraphicsSignal::Unavailable);
        let caps = CapabilityRecord::probe(&input);
        assert_eq!(caps.performance_tier(), PerformanceTier::Low);
        assert!(caps.is_low_end_device());
        assert!(caps.is_mobile_form_factor());
        assert!(!caps.supports_accelerated_graphics());
        assert_eq!(caps.particle_budget_multiplier(), 0.5);
        assert_eq!(caps.max_texture_dimension(), DEFAULT_MAX_TEXTURE_DIMENSION);
        assert_eq!(caps.concurrency_budget(), 2);
    }

    #[test]
    fn strong_desktop_is_high() {
        let input = signals(Some(16.0), Some(12), DESKTOP_UA, accelerated(8192));
        let caps = CapabilityRecord::probe(&input);
        assert_eq!(caps.performance_tier(), PerformanceTier::High);
        assert!(!caps.is_low_end_device());
        assert_eq!(caps.particle_budget_multiplier(), 1.5);
        assert_eq!(caps.max_texture_dimension(), 8192);
        assert_eq!(caps.concurrency_budget(), 8);
    }

    #[test]
    fn unreported_desktop_defaults_to_medium_every_time() {
        let input = signals(None, None, DESKTOP_UA, accelerated(4096));
        let first = CapabilityRecord::probe(&input);
        for _ in 0..10 {
            assert_eq!(CapabilityRecord::probe(&input), first);
        }
        assert_eq!(first.performance_tier(), PerformanceTier::Medium);
        assert_eq!(first.device_memory_gb(), DEFAULT_MEMORY_GB);
        assert_eq!(first.logical_cores(), DEFAULT_CORES);
        assert!(!first.is_low_end_device());
        assert_eq!(first.particle_budget_multiplier(), 1.0);
        assert_eq!(first.concurrency_budget(), 4);
    }

    #[test]
    fn mobile_ua_tightens_low_threshold() {
        let desktop =
            CapabilityRecord::probe(&signals(Some(3.0), Some(8), DESKTOP_UA, accelerated(4096)));
        let mobile =
            CapabilityRecord::probe(&signals(Some(3.0), Some(8), MOBILE_UA, accelerated(4096)));
        assert_eq!(desktop.performance_tier(), PerformanceTier::Medium);
        assert_eq!(mobile.performance_tier(), PerformanceTier::Low);
        // memory < 4 flags low-end even when the tier is medium
        assert!(desktop.is_low_end_device());
    }

    #[test]
    fn high_tier_without_graphics_gets_low_multiplier() {
        let unavailable = GraphicsSignal::Unavailable;
        let input = signals(Some(16.0), Some(16), DESKTOP_UA, unavailable);
        let caps = CapabilityRecord::probe(&input);
        assert_eq!(caps.performance_tier(), PerformanceTier::High);
        assert!(caps.is_low_end_device());
        assert_eq!(caps.particle_budget_multiplier(), 0.5);
        assert_eq!(caps.concurrency_budget(), 2);
    }

    #[test]
    fn performance_caveat_counts_as_unaccelerated() {
        let caveat = GraphicsSignal::Accelerated {
            max_texture_dimension: 4096,
            performance_caveat: true,
        };
        let caps = CapabilityRecord::probe(&signals(Some(16.0), Some(12), DESKTOP_UA, caveat));
        assert!(!caps.supports_accelerated_graphics());
        assert!(caps.is_low_end_device());
        assert_eq!(caps.max_texture_dimension(), 4096);
    }

    #[test]
    fn nonsense_signals_fall_back_to_defaults() {
        let input = DeviceSignals {
            device_memory_gb: Some(f32::NAN),
            logical_cores: Some(0),
            pixel_density: Some(-2.0),
            graphics: accelerated(0),
            ..Default::default()
        };
        let caps = CapabilityRecord::probe(&input);
        assert_eq!(caps.device_memory_gb(), DEFAULT_MEMORY_GB);
        assert_eq!(caps.logical_cores(), DEFAULT_CORES);
        assert_eq!(caps.pixel_density(), 1.0);
        assert_eq!(caps.max_texture_dimension(), DEFAULT_MAX_TEXTURE_DIMENSION);
    }

    #[test]
    fn default_record_is_conservative_medium() {
        let caps = CapabilityRecord::default();
        assert_eq!(caps.performance_tier(), PerformanceTier::Medium);
        assert!(!caps.supports_accelerated_graphics());
        assert!(caps.is_low_end_device());
    }

    #[test]
    fn particle_counts_are_floored() {
        let low = CapabilityRecord::probe(&signals(
            Some(2.0),
            Some(2),
            MOBILE_UA,
            GraphicsSignal::Unavailable,
        ));
        let high = CapabilityRecord::probe(&signals(
            Some(16.0),
            Some(12),
            DESKTOP_UA,
            accelerated(8192),
        ));
        assert_eq!(low.scaled_particle_count(101), 50);
        assert_eq!(high.scaled_particle_count(101), 151);
        assert_eq!(high.scaled_particle_count(0), 0);
    }

    #[test]
    fn custom_thresholds_shift_classification() {
        let strict = TierThresholds {
            medium_max_memory_gb: 16.0,
            ..Default::default()
        };
        let input = signals(Some(16.0), Some(12), DESKTOP_UA, accelerated(8192));
        let caps = CapabilityRecord::probe_with(&input, &strict);
        assert_eq!(caps.performance_tier(), PerformanceTier::Medium);
    }
}
