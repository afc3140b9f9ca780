//! Performance context
//!
//! Holds the capability record for one page/process lifetime and hands out the
//! derived policy. Constructed once at the root and passed down by handle;
//! clones share the same record.
//!
//! Readers that arrive before the probe has published get the default record
//! and can poll [`PerformanceContext::is_resolved`] to upgrade later. The
//! record is published at most once, so every reader observes the same values
//! afterwards.

use crate::capability::{CapabilityRecord, TierThresholds};
use crate::error::ContextError;
use crate::policy::RenderPolicy;
use once_cell::sync::{Lazy, OnceCell};
use prism_env::DeviceSignals;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Published {
    capabilities: CapabilityRecord,
    policy: RenderPolicy,
}

impl Published {
    fn new(capabilities: CapabilityRecord) -> Self {
        Self {
            policy: RenderPolicy::derive(&capabilities),
            capabilities,
        }
    }
}

static DEFAULTS: Lazy<Published> = Lazy::new(|| Published::new(CapabilityRecord::default()));

/// How to treat a consumer that was built without a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WiringMode {
    /// Panic: the component tree is wired wrong.
    Strict,
    /// Log a warning and run on the default record.
    Lenient,
}

impl Default for WiringMode {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            WiringMode::Strict
        } else {
            WiringMode::Lenient
        }
    }
}

/// Shared, read-only handle to the session's capabilities.
#[derive(Debug, Clone, Default)]
pub struct PerformanceContext {
    published: Arc<OnceCell<Published>>,
}

impl PerformanceContext {
    /// A context whose capabilities are not known yet.
    pub fn pending() -> Self {
        Self::default()
    }

    /// Probe and publish in one step.
    pub fn initialize(signals: &DeviceSignals) -> Self {
        Self::initialize_with(signals, &TierThresholds::default())
    }

    pub fn initialize_with(signals: &DeviceSignals, thresholds: &TierThresholds) -> Self {
        let context = Self::pending();
        // A fresh context cannot already be published.
        let _ = context.publish(CapabilityRecord::probe_with(signals, thresholds));
        context
    }

    /// Publish the probed record. Only the first call takes effect.
    pub fn publish(&self, capabilities: CapabilityRecord) -> Result<(), ContextError> {
        self.published
            .set(Published::new(capabilities))
            .map_err(|_| ContextError::AlreadyPublished)?;

        let policy = self.policy();
        tracing::info!(
            tier = ?capabilities.performance_tier(),
            low_end = capabilities.is_low_end_device(),
            mobile = capabilities.is_mobile_form_factor(),
            accelerated = capabilities.supports_accelerated_graphics(),
            max_texture = capabilities.max_texture_dimension(),
            memory_gb = capabilities.device_memory_gb(),
            cores = capabilities.logical_cores(),
            "capabilities published"
        );
        tracing::info!(
            pixel_ratio = ?(policy.pixel_ratio_range.min, policy.pixel_ratio_range.max),
            shadows = policy.shadows_enabled,
            post_processing = policy.post_processing_enabled,
            frame_loop = ?policy.frame_loop_mode,
            "render policy derived"
        );
        Ok(())
    }

    pub fn is_resolved(&self) -> bool {
        self.published.get().is_some()
    }

    pub fn capabilities(&self) -> CapabilityRecord {
        self.current().capabilities
    }

    pub fn policy(&self) -> RenderPolicy {
        self.current().policy
    }

    fn current(&self) -> &Published {
        self.published.get().unwrap_or(&*DEFAULTS)
    }
}

/// Resolve the context a consumer was given. A missing context is a wiring
/// defect: strict mode panics, lenient mode warns and runs on defaults.
pub fn resolve(
    context: Option<&PerformanceContext>,
    mode: WiringMode,
    consumer: &str,
) -> PerformanceContext {
    match context {
        Some(context) => context.clone(),
        None => {
            let error = ContextError::Unwired {
                consumer: consumer.to_string(),
            };
            match mode {
                WiringMode::Strict => panic!("{error}"),
                WiringMode::Lenient => {
                    tracing::warn!("{error}; using default capabilities");
                    PerformanceContext::pending()
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::PerformanceTier;
    use crate::policy::FrameLoopMode;
    use prism_env::GraphicsSignal;

    fn high_end() -> DeviceSignals {
        DeviceSignals {
            device_memory_gb: Some(16.0),
            logical_cores: Some(12),
            user_agent: Some("Mozilla/5.0 (Windows NT 10.0; Win64; x64)".to_string()),
            graphics: GraphicsSignal::Accelerated {
                max_texture_dimension: 8192,
                performance_caveat: false,
            },
            ..Default::default()
        }
    }

    #[test]
    fn pending_context_serves_defaults() {
        let context = PerformanceContext::pending();
        assert!(!context.is_resolved());
        assert_eq!(context.capabilities(), CapabilityRecord::default());
        assert_eq!(context.policy(), RenderPolicy::default());
        assert_eq!(
            context.capabilities().performance_tier(),
            PerformanceTier::Medium
        );
    }

    #[test]
    fn clones_observe_the_published_record() {
        let root = PerformanceContext::pending();
        let child = root.clone();
        root.publish(CapabilityRecord::probe(&high_end())).unwrap();
        assert!(child.is_resolved());
        assert_eq!(child.policy(), root.policy());
        assert_eq!(child.policy().frame_loop_mode, FrameLoopMode::Continuous);
        assert!(child.policy().shadows_enabled);
    }

    #[test]
    fn second_publish_is_rejected() {
        let context = PerformanceContext::initialize(&high_end());
        let weak = CapabilityRecord::probe(&DeviceSignals {
            device_memory_gb: Some(1.0),
            logical_cores: Some(1),
            ..Default::default()
        });
        assert_eq!(context.publish(weak), Err(ContextError::AlreadyPublished));
        assert_eq!(
            context.capabilities().performance_tier(),
            PerformanceTier::High
        );
    }

    #[test]
    fn concurrent_readers_see_identical_policy() {
        let context = PerformanceContext::initialize(&high_end());
        let expected = context.policy();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let context = context.clone();
                std::thread::spawn(move || context.policy())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    }

    #[test]
    fn lenient_wiring_falls_back_to_defaults() {
        let context = resolve(None, WiringMode::Lenient, "hero-scene");
        assert!(!context.is_resolved());
        assert_eq!(context.policy(), RenderPolicy::default());
    }

    #[test]
    #[should_panic(expected = "hero-scene")]
    fn strict_wiring_panics() {
        resolve(None, WiringMode::Strict, "hero-scene");
    }

    #[test]
    fn wired_context_is_shared() {
        let context = PerformanceContext::initialize(&high_end());
        let resolved = resolve(Some(&context), WiringMode::Strict, "hero-scene");
        assert!(resolved.is_resolved());
        assert_eq!(resolved.policy(), context.policy());
    }
}
