//! Performance policy
//!
//! The single place where a performance tier turns into rendering decisions.
//! Consumers read a [`RenderPolicy`]; none of them branch on the tier.

use crate::capability::{CapabilityRecord, PerformanceTier};
use std::time::Duration;

/// Clamp applied to a surface's device pixel ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRatioRange {
    pub min: f32,
    pub max: f32,
}

impl PixelRatioRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn clamp(&self, device_pixel_ratio: f32) -> f32 {
        if !device_pixel_ratio.is_finite() {
            return self.min;
        }
        device_pixel_ratio.clamp(self.min, self.max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameLoopMode {
    /// Draw on every display refresh.
    Continuous,
    /// Draw only when scene state changed.
    OnDemand,
}

/// Animation budget for motion-bearing effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionBudget {
    pub duration: Duration,
    /// Delay between consecutive items of a staggered entrance.
    pub stagger: Duration,
}

impl MotionBudget {
    /// No motion at all.
    pub const NONE: Self = Self {
        duration: Duration::ZERO,
        stagger: Duration::ZERO,
    };

    pub const fn new(duration_ms: u64, stagger_ms: u64) -> Self {
        Self {
            duration: Duration::from_millis(duration_ms),
            stagger: Duration::from_millis(stagger_ms),
        }
    }

    pub fn is_still(&self) -> bool {
        self.duration.is_zero() && self.stagger.is_zero()
    }

    /// Start delay of the `index`-th item in a staggered group.
    pub fn delay_for(&self, index: u32) -> Duration {
        self.stagger.saturating_mul(index)
    }
}

/// Concrete rendering configuration, a pure function of a [`CapabilityRecord`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderPolicy {
    pub pixel_ratio_range: PixelRatioRange,
    pub shadows_enabled: bool,
    pub post_processing_enabled: bool,
    pub frame_loop_mode: FrameLoopMode,
    pub motion: MotionBudget,
}

struct TierRow {
    pixel_ratio_range: PixelRatioRange,
    shadows: bool,
    post_processing: bool,
    frame_loop_mode: FrameLoopMode,
    motion: MotionBudget,
}

const LOW: TierRow = TierRow {
    pixel_ratio_range: PixelRatioRange::new(0.5, 1.0),
    shadows: false,
    post_processing: false,
    frame_loop_mode: FrameLoopMode::OnDemand,
    motion: MotionBudget::new(200, 0),
};

const MEDIUM: TierRow = TierRow {
    pixel_ratio_range: PixelRatioRange::new(1.0, 1.5),
    shadows: false,
    post_processing: false,
    frame_loop_mode: FrameLoopMode::Continuous,
    motion: MotionBudget::new(400, 50),
};

const HIGH: TierRow = TierRow {
    pixel_ratio_range: PixelRatioRange::new(1.0, 2.0),
    shadows: true,
    post_processing: true,
    frame_loop_mode: FrameLoopMode::Continuous,
    motion: MotionBudget::new(600, 80),
};

fn row(tier: PerformanceTier) -> &'static TierRow {
    match tier {
        PerformanceTier::Low => &LOW,
        PerformanceTier::Medium => &MEDIUM,
        PerformanceTier::High => &HIGH,
    }
}

impl RenderPolicy {
    pub fn derive(capabilities: &CapabilityRecord) -> Self {
        let row = row(capabilities.performance_tier());
        // Low-end devices never get the fill-rate heavy features, whatever the tier.
        let low_end = capabilities.is_low_end_device();
        Self {
            pixel_ratio_range: row.pixel_ratio_range,
            shadows_enabled: row.shadows && !low_end,
            post_processing_enabled: row.post_processing && !low_end,
            frame_loop_mode: if low_end { FrameLoopMode::OnDemand } else { row.frame_loop_mode },
            motion: row.motion,
        }
    }
}

impl Default for RenderPolicy {
    fn default() -> Self {
        Self::derive(&CapabilityRecord::default())
    }
}
