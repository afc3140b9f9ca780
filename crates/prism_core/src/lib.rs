//! Prism Core
//!
//! The decision layer of adaptive rendering:
//! - Capability probe and tier classification
//! - Performance policy table
//! - Shared performance context
//! - Visibility gate
//! - Interaction throttles (scroll, images, motion)

pub mod capability;
pub mod context;
pub mod error;
pub mod math;
pub mod policy;
pub mod throttle;
pub mod time;
pub mod visibility;

pub use capability::{CapabilityRecord, PerformanceTier, TierThresholds};
pub use context::{resolve, PerformanceContext, WiringMode};
pub use error::{ContextError, VisibilityError};
pub use policy::{FrameLoopMode, MotionBudget, PixelRatioRange, RenderPolicy};
pub use visibility::{SurfaceId, VisibilityGate, VisibilityObserver};

pub use glam;
pub use prism_env;

/// Prism version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
