//! wgpu scene backend
//!
//! Draws the particle field as a point cloud around an orbiting camera.

use crate::backend::{FrameInfo, LightingSetup, SceneBackend, SurfaceConfig};
use crate::controls::CameraPose;
use crate::particles::ParticleInstance;
use crate::RenderError;
use glam::{Mat4, Vec3};
use std::sync::Arc;
use wgpu::util::DeviceExt;
use winit::window::Window;

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct Globals {
    view_proj: [[f32; 4]; 4],
    tint: [f32; 4],
}

struct GpuState {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    pipeline: wgpu::RenderPipeline,
    globals: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    particles: wgpu::Buffer,
    particle_count: u32,
    lighting: LightingSetup,
    max_dimension: u32,
}

impl GpuState {
    fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
    }
}

/// Renders into a winit window. The GPU context only exists between
/// `acquire` and `release`.
pub struct WgpuBackend {
    window: Arc<Window>,
    gpu: Option<GpuState>,
}

impl WgpuBackend {
    pub fn new(window: Arc<Window>) -> Self {
        Self { window, gpu: None }
    }

    async fn create(
        window: Arc<Window>,
        config: &SurfaceConfig<'_>,
    ) -> Result<GpuState, RenderError> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RenderError::NoAdapter)?;

        let info = adapter.get_info();
        if info.device_type == wgpu::DeviceType::Cpu {
            return Err(RenderError::PerformanceCaveat(info.name));
        }

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("prism scene device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_webgl2_defaults()
                        .using_resolution(adapter.limits()),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or(RenderError::UnsupportedSurface)?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .ok_or(RenderError::UnsupportedSurface)?;

        let max_dimension = device.limits().max_texture_dimension_2d;
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: config.width.clamp(1, max_dimension),
            height: config.height.clamp(1, max_dimension),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("particle shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/particles.wgsl").into()),
        });

        let globals = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("scene globals"),
            size: std::mem::size_of::<Globals>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("scene globals layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("scene globals"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("particle pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("particle pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<ParticleInstance>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Instance,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32],
                }],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::PointList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let particles = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("particle instances"),
            contents: bytemuck::cast_slice(config.particles),
            usage: wgpu::BufferUsages::VERTEX,
        });

        tracing::info!(
            adapter = %info.name,
            backend = ?info.backend,
            format = ?format,
            width = surface_config.width,
            height = surface_config.height,
            "scene context created"
        );

        Ok(GpuState {
            surface,
            device,
            queue,
            config: surface_config,
            pipeline,
            globals,
            bind_group,
            particles,
            particle_count: config.particles.len() as u32,
            lighting: config.lighting,
            max_dimension,
        })
    }
}

impl SceneBackend for WgpuBackend {
    fn acquire(&mut self, config: &SurfaceConfig<'_>) -> Result<(), RenderError> {
        let gpu = pollster::block_on(Self::create(self.window.clone(), config))?;
        self.gpu = Some(gpu);
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        if let Some(gpu) = &mut self.gpu {
            gpu.config.width = width.clamp(1, gpu.max_dimension);
            gpu.config.height = height.clamp(1, gpu.max_dimension);
            gpu.reconfigure();
        }
    }

    fn draw(&mut self, frame: &FrameInfo) -> Result<(), RenderError> {
        let gpu = self.gpu.as_mut().ok_or(RenderError::NotAcquired)?;

        let aspect = gpu.config.width as f32 / gpu.config.height.max(1) as f32;
        let globals = Globals {
            view_proj: view_projection(&frame.camera, aspect).to_cols_array_2d(),
            tint: particle_tint(&gpu.lighting),
        };
        gpu.queue.write_buffer(&gpu.globals, 0, bytemuck::bytes_of(&globals));

        let output = match gpu.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                tracing::debug!("surface outdated, reconfiguring");
                gpu.reconfigure();
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("scene encoder"),
        });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear_color(&gpu.lighting)),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            if gpu.particle_count > 0 {
                pass.set_pipeline(&gpu.pipeline);
                pass.set_bind_group(0, &gpu.bind_group, &[]);
                pass.set_vertex_buffer(0, gpu.particles.slice(..));
                pass.draw(0..1, 0..gpu.particle_count);
            }
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    fn release(&mut self) {
        if self.gpu.take().is_some() {
            tracing::debug!("scene context released");
        }
    }
}

fn view_projection(camera: &CameraPose, aspect: f32) -> Mat4 {
    let projection = Mat4::perspective_rh(45f32.to_radians(), aspect.max(0.01), 0.1, 100.0);
    let view = Mat4::look_at_rh(camera.eye, camera.target, Vec3::Y);
    projection * view
}

/// Shadowed scenes get a warmer key light.
fn particle_tint(lighting: &LightingSetup) -> [f32; 4] {
    let intensity = 0.4 + 0.2 * lighting.light_count as f32;
    if lighting.shadows {
        [intensity, intensity * 0.85, intensity * 0.6, 1.0]
    } else {
        [intensity, intensity, intensity, 1.0]
    }
}

fn clear_color(lighting: &LightingSetup) -> wgpu::Color {
    if lighting.post_processing {
        wgpu::Color {
            r: 0.02,
            g: 0.02,
            b: 0.06,
            a: 1.0,
        }
    } else {
        wgpu::Color {
            r: 0.1,
            g: 0.1,
            b: 0.1,
            a: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lighting(shadows: bool) -> LightingSetup {
        LightingSetup {
            shadows,
            post_processing: shadows,
            light_count: if shadows { 3 } else { 1 },
            shadow_map_size: if shadows { 2048 } else { 0 },
        }
    }

    #[test]
    fn target_projects_to_screen_center() {
        let camera = CameraPose {
            eye: Vec3::new(0.0, 2.0, 8.0),
            target: Vec3::ZERO,
        };
        let clip = view_projection(&camera, 16.0 / 9.0) * Vec3::ZERO.extend(1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-5);
        assert!(ndc.y.abs() < 1e-5);
        assert!((0.0..=1.0).contains(&ndc.z));
    }

    #[test]
    fn richer_lighting_is_brighter() {
        let rich = particle_tint(&lighting(true));
        let plain = particle_tint(&lighting(false));
        assert!(rich[0] > plain[0]);
        assert_eq!(plain[0], plain[2]);
    }

    #[test]
    fn globals_match_uniform_layout() {
        assert_eq!(std::mem::size_of::<Globals>(), 80);
        assert_ne!(clear_color(&lighting(true)), clear_color(&lighting(false)));
    }
}
