//! Rendering backend abstraction
//!
//! The graphics probe feeds the capability record; [`SceneBackend`] is the
//! seam between the adaptive surface and whatever actually draws.

use crate::controls::CameraPose;
use crate::particles::ParticleInstance;
use prism_core::RenderPolicy;
use prism_env::GraphicsSignal;

/// Rendering backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// Metal (macOS, iOS)
    Metal,
    /// DirectX 12 (Windows)
    DirectX12,
    /// Vulkan (cross-platform)
    Vulkan,
    /// OpenGL / WebGL (legacy fallback)
    OpenGL,
    /// WebGPU (browser)
    WebGpu,
}

impl BackendType {
    fn from_wgpu(backend: wgpu::Backend) -> Option<Self> {
        match backend {
            wgpu::Backend::Metal => Some(Self::Metal),
            wgpu::Backend::Dx12 => Some(Self::DirectX12),
            wgpu::Backend::Vulkan => Some(Self::Vulkan),
            wgpu::Backend::Gl => Some(Self::OpenGL),
            wgpu::Backend::BrowserWebGpu => Some(Self::WebGpu),
            wgpu::Backend::Empty => None,
        }
    }
}

/// Graphics probe result
#[derive(Debug, Clone, PartialEq)]
pub struct GraphicsProbe {
    pub signal: GraphicsSignal,
    pub backend: Option<BackendType>,
    pub adapter_name: Option<String>,
}

/// What the probe needs to know about an adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterSummary {
    pub name: String,
    pub backend: wgpu::Backend,
    pub device_type: wgpu::DeviceType,
    pub max_texture_dimension: u32,
}

/// Backend sets tried in order: preferred first, then legacy GL.
const PROBE_ORDER: [(&str, wgpu::Backends); 2] = [
    ("preferred", wgpu::Backends::PRIMARY),
    ("legacy", wgpu::Backends::GL),
];

/// Try to obtain an off-screen adapter: preferred backends first, then the
/// legacy GL backend, before concluding there is no accelerated graphics.
pub fn probe_graphics() -> GraphicsProbe {
    probe_graphics_with(|backends| {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends,
            ..Default::default()
        });
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: None,
            force_fallback_adapter: false,
        }))?;
        let info = adapter.get_info();
        Some(AdapterSummary {
            name: info.name,
            backend: info.backend,
            device_type: info.device_type,
            max_texture_dimension: adapter.limits().max_texture_dimension_2d,
        })
    })
}

/// Probe ordering and caveat detection over any adapter lookup.
pub fn probe_graphics_with(
    mut request: impl FnMut(wgpu::Backends) -> Option<AdapterSummary>,
) -> GraphicsProbe {
    for (tier, backends) in PROBE_ORDER {
        let Some(adapter) = request(backends) else {
            tracing::debug!(tier, "no adapter on backend set");
            continue;
        };

        // Software rasterizers are the native analogue of failIfMajorPerformanceCaveat.
        let performance_caveat = adapter.device_type == wgpu::DeviceType::Cpu;
        tracing::info!(
            tier,
            adapter = %adapter.name,
            backend = ?adapter.backend,
            device_type = ?adapter.device_type,
            max_texture_dimension = adapter.max_texture_dimension,
            "graphics adapter found"
        );
        return GraphicsProbe {
            signal: GraphicsSignal::Accelerated {
                max_texture_dimension: adapter.max_texture_dimension,
                performance_caveat,
            },
            backend: BackendType::from_wgpu(adapter.backend),
            adapter_name: Some(adapter.name),
        };
    }

    tracing::warn!("no graphics adapter available, 3D surfaces will use their fallback");
    GraphicsProbe {
        signal: GraphicsSignal::Unavailable,
        backend: None,
        adapter_name: None,
    }
}

/// Lighting complexity, chosen once when a surface starts rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightingSetup {
    pub shadows: bool,
    pub post_processing: bool,
    pub light_count: u32,
    /// Zero when shadows are off.
    pub shadow_map_size: u32,
}

impl LightingSetup {
    pub fn from_policy(policy: &RenderPolicy) -> Self {
        if policy.shadows_enabled {
            Self {
                shadows: true,
                post_processing: policy.post_processing_enabled,
                light_count: 3,
                shadow_map_size: 2048,
            }
        } else {
            Self {
                shadows: false,
                post_processing: policy.post_processing_enabled,
                light_count: 1,
                shadow_map_size: 0,
            }
        }
    }
}

/// Everything a backend needs to build its graphics context.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceConfig<'a> {
    /// Physical pixels, already clamped.
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f32,
    pub lighting: LightingSetup,
    pub particles: &'a [ParticleInstance],
}

/// Per-frame input.
#[derive(Debug, Clone, Copy)]
pub struct FrameInfo {
    pub frame_index: u64,
    pub camera: CameraPose,
}

/// Something that can draw a scene.
pub trait SceneBackend {
    /// Create the graphics context. Called at most once per surface; an error
    /// sends the surface to its fallback for good.
    fn acquire(&mut self, config: &SurfaceConfig<'_>) -> Result<(), crate::RenderError>;

    /// Physical size changed.
    fn resize(&mut self, width: u32, height: u32);

    fn draw(&mut self, frame: &FrameInfo) -> Result<(), crate::RenderError>;

    /// Free the graphics context. Must be safe to call after a failed acquire.
    fn release(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::{FrameLoopMode, MotionBudget, PixelRatioRange};

    fn policy(shadows: bool, post_processing: bool) -> RenderPolicy {
        RenderPolicy {
            pixel_ratio_range: PixelRatioRange::new(1.0, 2.0),
            shadows_enabled: shadows,
            post_processing_enabled: post_processing,
            frame_loop_mode: FrameLoopMode::Continuous,
            motion: MotionBudget::NONE,
        }
    }

    #[test]
    fn shadowed_lighting_uses_more_lights() {
        let rich = LightingSetup::from_policy(&policy(true, true));
        assert!(rich.shadows && rich.post_processing);
        assert_eq!(rich.light_count, 3);
        assert_eq!(rich.shadow_map_size, 2048);

        let plain = LightingSetup::from_policy(&policy(false, false));
        assert_eq!(plain.light_count, 1);
        assert_eq!(plain.shadow_map_size, 0);
    }

    fn adapter(device_type: wgpu::DeviceType, backend: wgpu::Backend) -> AdapterSummary {
        AdapterSummary {
            name: "test adapter".to_string(),
            backend,
            device_type,
            max_texture_dimension: 8192,
        }
    }

    #[test]
    fn preferred_adapter_skips_legacy() {
        let mut asked = Vec::new();
        let probe = probe_graphics_with(|backends| {
            asked.push(backends);
            let discrete = wgpu::DeviceType::DiscreteGpu;
            Some(adapter(discrete, wgpu::Backend::Vulkan))
        });
        assert_eq!(asked, vec![wgpu::Backends::PRIMARY]);
        assert_eq!(
            probe.signal,
            GraphicsSignal::Accelerated {
                max_texture_dimension: 8192,
                performance_caveat: false,
            }
        );
        assert_eq!(probe.backend, Some(BackendType::Vulkan));
        assert_eq!(probe.adapter_name.as_deref(), Some("test adapter"));
    }

    #[test]
    fn missing_preferred_falls_back_to_legacy() {
        let mut asked = Vec::new();
        let probe = probe_graphics_with(|backends| {
            asked.push(backends);
            let integrated = wgpu::DeviceType::IntegratedGpu;
            (backends == wgpu::Backends::GL).then(|| adapter(integrated, wgpu::Backend::Gl))
        });
        assert_eq!(asked, vec![wgpu::Backends::PRIMARY, wgpu::Backends::GL]);
        assert_eq!(probe.backend, Some(BackendType::OpenGL));
        assert!(matches!(probe.signal, GraphicsSignal::Accelerated { .. }));
    }

    #[test]
    fn no_adapter_is_unavailable() {
        let mut attempts = 0;
        let probe = probe_graphics_with(|_| {
            attempts += 1;
            None
        });
        assert_eq!(attempts, 2);
        assert_eq!(probe.signal, GraphicsSignal::Unavailable);
        assert_eq!(probe.backend, None);
        assert_eq!(probe.adapter_name, None);
    }

    #[test]
    fn software_adapter_reports_caveat() {
        let software = adapter(wgpu::DeviceType::Cpu, wgpu::Backend::Vulkan);
        let probe = probe_graphics_with(|_| Some(software.clone()));
        assert_eq!(
            probe.signal,
            GraphicsSignal::Accelerated {
                max_texture_dimension: 8192,
                performance_caveat: true,
            }
        );
    }

    #[test]
    fn wgpu_backends_map_to_types() {
        assert_eq!(
            BackendType::from_wgpu(wgpu::Backend::Gl),
            Some(BackendType::OpenGL)
        );
        assert_eq!(
            BackendType::from_wgpu(wgpu::Backend::Vulkan),
            Some(BackendType::Vulkan)
        );
        assert_eq!(BackendType::from_wgpu(wgpu::Backend::Empty), None);
    }
}
