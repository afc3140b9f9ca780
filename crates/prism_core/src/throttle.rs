//! Interaction throttles
//!
//! The lighter-weight side of the performance policy, for everything outside
//! the 3D surface: scroll handling, image resolution and motion.

use crate::capability::CapabilityRecord;
use crate::policy::{MotionBudget, RenderPolicy};
use crate::time::FrameClock;
use std::time::Duration;

/// Coalesces scroll events so the handler runs at most once per frame, with
/// the latest offset.
#[derive(Debug, Default)]
pub struct ScrollThrottle {
    pending: Option<f32>,
    last_flushed_frame: Option<u64>,
}

impl ScrollThrottle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a scroll event. Cheap; never runs the handler.
    pub fn on_scroll(&mut self, offset: f32) {
        self.pending = Some(offset);
    }

    /// Run `handler` with the latest offset if there is one and the handler has
    /// not run during this frame yet. Returns whether it ran.
    pub fn flush(&mut self, clock: &FrameClock, handler: impl FnOnce(f32)) -> bool {
        let frame = clock.frame_index();
        if self.last_flushed_frame == Some(frame) {
            return false;
        }
        match self.pending.take() {
            Some(offset) => {
                self.last_flushed_frame = Some(frame);
                handler(offset);
                true
            }
            None => false,
        }
    }
}

/// Widths (in physical pixels) image assets are published at.
pub const DEFAULT_IMAGE_WIDTHS: &[u32] = &[320, 640, 768, 1024, 1280, 1536, 1920, 2560, 3840];

/// Pick the image width to request for a slot `viewport_width` logical pixels
/// wide.
///
/// The display density is capped by the policy's pixel-ratio ceiling (the same
/// clamp the 3D surface uses) and dropped to 1.0 on constrained networks. The
/// result never exceeds the device's resolution ceiling; `None` when no
/// candidate fits under it.
pub fn select_image_width(
    viewport_width: f32,
    capabilities: &CapabilityRecord,
    policy: &RenderPolicy,
    constrained_network: bool,
    candidates: &[u32],
) -> Option<u32> {
    let density = if constrained_network {
        1.0
    } else {
        policy.pixel_ratio_range.clamp(capabilities.pixel_density())
    };
    let ceiling = capabilities.resolution_ceiling();
    let target = ((viewport_width.max(0.0) * density).ceil() as u32).min(ceiling);

    let mut fitting: Vec<u32> = candidates.iter().copied().filter(|&w| w <= ceiling).collect();
    fitting.sort_unstable();
    fitting
        .iter()
        .copied()
        .find(|&w| w >= target)
        .or_else(|| fitting.last().copied())
}

/// Bounded exponential backoff for image loads. Graphics-context creation is
/// never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Delay before the next attempt after `failed_attempts` failures, or `None`
    /// once the budget is spent.
    pub fn next_delay(&self, failed_attempts: u32) -> Option<Duration> {
        if failed_attempts == 0 {
            return Some(Duration::ZERO);
        }
        if failed_attempts >= self.max_attempts {
            return None;
        }
        let factor = 1u32 << (failed_attempts - 1).min(16);
        Some(self.base_delay.saturating_mul(factor).min(self.max_delay))
    }

    /// Run `attempt` until it succeeds or the attempt budget is spent, calling
    /// `sleep` with the backoff between tries. Returns the last error.
    pub fn run<T, E: std::fmt::Display>(
        &self,
        mut attempt: impl FnMut(u32) -> Result<T, E>,
        mut sleep: impl FnMut(Duration),
    ) -> Result<T, E> {
        let mut failed = 0;
        loop {
            let error = match attempt(failed) {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };
            failed += 1;
            let Some(delay) = self.next_delay(failed) else {
                return Err(error);
            };
            tracing::debug!(attempt = failed, error = %error, ?delay, "retrying asset load");
            sleep(delay);
        }
    }
}

/// Motion budget an effect may use. A reduced-motion preference always wins
/// over the tier.
pub fn effective_motion(policy: &RenderPolicy, prefers_reduced_motion: bool) -> MotionBudget {
    if prefers_reduced_motion {
        MotionBudget::NONE
    } else {
        policy.motion
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_env::{DeviceSignals, GraphicsSignal};

    fn caps(memory: f32, cores: u32, density: f32, max_texture_dimension: u32) -> CapabilityRecord {
        CapabilityRecord::probe(&DeviceSignals {
            device_memory_gb: Some(memory),
            logical_cores: Some(cores),
            pixel_density: Some(density),
            graphics: GraphicsSignal::Accelerated {
                max_texture_dimension,
                performance_caveat: false,
            },
            ..Default::default()
        })
    }

    #[test]
    fn scroll_handler_runs_once_per_frame() {
        let mut clock = FrameClock::default();
        let mut throttle = ScrollThrottle::new();
        let mut seen = Vec::new();

        throttle.on_scroll(10.0);
        throttle.on_scroll(20.0);
        assert!(throttle.flush(&clock, |o| seen.push(o)));
        throttle.on_scroll(30.0);
        assert!(!throttle.flush(&clock, |o| seen.push(o)));

        clock.advance();
        assert!(throttle.flush(&clock, |o| seen.push(o)));
        clock.advance();
        assert!(!throttle.flush(&clock, |o| seen.push(o)));

        assert_eq!(seen, vec![20.0, 30.0]);
    }

    #[test]
    fn image_width_follows_viewport_and_density() {
        let high = caps(16.0, 12, 2.0, 8192);
        let policy = RenderPolicy::derive(&high);
        assert_eq!(
            select_image_width(375.0, &high, &policy, false, DEFAULT_IMAGE_WIDTHS),
            Some(768)
        );
        assert_eq!(
            select_image_width(1200.0, &high, &policy, false, DEFAULT_IMAGE_WIDTHS),
            Some(2560)
        );
    }

    #[test]
    fn density_is_capped_by_policy() {
        // Medium tier caps density at 1.5 even on a 3x display.
        let medium = caps(8.0, 8, 3.0, 8192);
        let policy = RenderPolicy::derive(&medium);
        assert_eq!(
            select_image_width(400.0, &medium, &policy, false, DEFAULT_IMAGE_WIDTHS),
            Some(640)
        );
    }

    #[test]
    fn constrained_network_requests_one_x() {
        let high = caps(16.0, 12, 2.0, 8192);
        let policy = RenderPolicy::derive(&high);
        assert_eq!(
            select_image_width(1000.0, &high, &policy, true, DEFAULT_IMAGE_WIDTHS),
            Some(1024)
        );
    }

    #[test]
    fn never_exceeds_texture_ceiling() {
        let small_gpu = caps(16.0, 12, 2.0, 2048);
        let policy = RenderPolicy::derive(&small_gpu);
        assert_eq!(
            select_image_width(1920.0, &small_gpu, &policy, false, DEFAULT_IMAGE_WIDTHS),
            Some(1920)
        );
        assert_eq!(
            select_image_width(100.0, &small_gpu, &policy, false, &[4096]),
            None
        );
        assert_eq!(
            select_image_width(100.0, &small_gpu, &policy, false, &[]),
            None
        );
    }

    #[test]
    fn retry_backoff_is_bounded() {
        let retry = RetryPolicy::default();
        assert_eq!(retry.next_delay(0), Some(Duration::ZERO));
        assert_eq!(retry.next_delay(1), Some(Duration::from_millis(250)));
        assert_eq!(retry.next_delay(2), Some(Duration::from_millis(500)));
        assert_eq!(retry.next_delay(3), None);

        let long = RetryPolicy {
            max_attempts: 10,
            ..RetryPolicy::default()
        };
        assert_eq!(long.next_delay(9), Some(Duration::from_secs(2)));
    }

    #[test]
    fn run_gives_up_after_budget() {
        let mut attempts = Vec::new();
        let mut slept = Vec::new();
        let result: Result<(), &str> = RetryPolicy::default().run(
            |attempt| {
                attempts.push(attempt);
                Err("offline")
            },
            |delay| slept.push(delay),
        );
        assert_eq!(result, Err("offline"));
        assert_eq!(attempts, vec![0, 1, 2]);
        assert_eq!(
            slept,
            vec![Duration::from_millis(250), Duration::from_millis(500)]
        );
    }

    #[test]
    fn run_stops_at_first_success() {
        let mut slept = 0;
        let result = RetryPolicy::default().run(
            |attempt| if attempt == 0 { Err("flaky") } else { Ok(attempt) },
            |_| slept += 1,
        );
        assert_eq!(result, Ok(1));
        assert_eq!(slept, 1);
    }

    #[test]
    fn reduced_motion_overrides_every_tier() {
        for (memory, cores) in [(1.0, 1), (8.0, 8), (32.0, 32)] {
            let policy = RenderPolicy::derive(&caps(memory, cores, 1.0, 4096));
            let motion = effective_motion(&policy, true);
            assert!(motion.is_still());
            assert_eq!(motion.delay_for(10), Duration::ZERO);
            assert_eq!(effective_motion(&policy, false), policy.motion);
        }
    }
}
