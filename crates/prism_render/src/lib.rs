//! Prism render layer
//!
//! Adaptive 3D surfaces that scale with the device and fall back to static
//! content when they cannot render.

pub mod backend;
pub mod content;
pub mod controls;
pub mod error;
pub mod particles;
pub mod surface;
pub mod wgpu_backend;
pub mod window;

pub use backend::{
    probe_graphics, probe_graphics_with, AdapterSummary, BackendType, FrameInfo, GraphicsProbe,
    LightingSetup, SceneBackend, SurfaceConfig,
};
pub use content::{FallbackCard, FallbackView, SceneContent, SceneItem};
pub use controls::{CameraPose, OrbitControls};
pub use error::RenderError;
pub use particles::{ParticleField, ParticleInstance};
pub use surface::{
    should_draw, AdaptiveSurface, FallbackReason, FrameOutcome, Presentation, SurfaceOptions,
    SurfaceState,
};
pub use wgpu_backend::WgpuBackend;
pub use window::{window_attributes, WindowConfig};

pub use wgpu;
pub use winit;
