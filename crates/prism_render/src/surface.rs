//! Adaptive scene surface
//!
//! Decides, frame by frame, whether a 3D scene renders at all and how.
//!
//! ```text
//! Uninitialized --(visible && capabilities resolved)--> Rendering
//! Rendering --(hidden)--> Paused --(visible)--> Rendering
//! any --(low-end | disabled | context failure)--> Fallback   (terminal)
//! ```
//!
//! State changes are picked up at the start of [`AdaptiveSurface::frame`], so
//! a surface that goes off-screen issues no backend work from the next frame
//! on. Scene construction is deferred to the first eligible frame rather than
//! done when visibility changes.

use crate::backend::{FrameInfo, LightingSetup, SceneBackend, SurfaceConfig};
use crate::content::{FallbackView, SceneContent};
use crate::controls::OrbitControls;
use crate::particles::ParticleField;
use crate::RenderError;
use glam::Vec2;
use prism_core::{
    resolve, FrameLoopMode, PerformanceContext, SurfaceId, VisibilityGate, VisibilityObserver,
    WiringMode,
};
use winit::dpi::{LogicalSize, PhysicalSize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    LowEndDevice,
    Disabled,
    ContextUnavailable,
    PerformanceCaveat,
    ContextLost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceState {
    Uninitialized,
    Rendering,
    Paused,
    Fallback(FallbackReason),
}

/// What a call to [`AdaptiveSurface::frame`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Drawn,
    /// Rendering, but nothing changed (on-demand loop).
    Idle,
    /// Not yet visible or capabilities not resolved.
    Waiting,
    Paused,
    Fallback,
}

/// What the host should show for this surface right now.
#[derive(Debug, Clone, PartialEq)]
pub enum Presentation<'a> {
    Scene(&'a SceneContent),
    Static(FallbackView<'a>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceOptions {
    /// Share of the surface that must be on screen to count as visible.
    pub visibility_threshold: f32,
    /// Never render 3D for this surface.
    pub disabled: bool,
    pub wiring: WiringMode,
    /// Seed for the ambient particle field.
    pub seed: u64,
}

impl Default for SurfaceOptions {
    fn default() -> Self {
        Self {
            visibility_threshold: 0.15,
            disabled: false,
            wiring: WiringMode::default(),
            seed: 0x5EED,
        }
    }
}

/// Whether a rendering surface should draw this frame.
pub fn should_draw(mode: FrameLoopMode, needs_redraw: bool) -> bool {
    match mode {
        FrameLoopMode::Continuous => true,
        FrameLoopMode::OnDemand => needs_redraw,
    }
}

pub struct AdaptiveSurface<B: SceneBackend> {
    id: SurfaceId,
    context: PerformanceContext,
    observer: VisibilityObserver,
    backend: B,
    content: SceneContent,
    disabled: bool,
    seed: u64,
    state: SurfaceState,
    visible: bool,
    acquired: bool,
    needs_redraw: bool,
    pending_resize: bool,
    lighting: Option<LightingSetup>,
    controls: OrbitControls,
    particles: ParticleField,
    logical_size: LogicalSize<f32>,
    device_pixel_ratio: f32,
    frames_drawn: u64,
}

impl<B: SceneBackend> AdaptiveSurface<B> {
    /// Mount a surface. The visibility registration lives exactly as long as
    /// the surface.
    pub fn new(
        id: SurfaceId,
        context: Option<&PerformanceContext>,
        gate: &VisibilityGate,
        backend: B,
        content: SceneContent,
        options: SurfaceOptions,
    ) -> Result<Self, RenderError> {
        let context = resolve(context, options.wiring, &content.title);
        let observer = gate.observe(id, options.visibility_threshold)?;
        Ok(Self {
            id,
            context,
            observer,
            backend,
            content,
            disabled: options.disabled,
            seed: options.seed,
            state: SurfaceState::Uninitialized,
            visible: false,
            acquired: false,
            needs_redraw: false,
            pending_resize: false,
            lighting: None,
            controls: OrbitControls::default(),
            particles: ParticleField::default(),
            logical_size: LogicalSize::new(1.0, 1.0),
            device_pixel_ratio: 1.0,
            frames_drawn: 0,
        })
    }

    pub fn state(&self) -> SurfaceState {
        self.state
    }

    /// Lighting picked when rendering started; fixed for the surface's lifetime.
    pub fn lighting(&self) -> Option<LightingSetup> {
        self.lighting
    }

    pub fn controls(&self) -> &OrbitControls {
        &self.controls
    }

    pub fn presentation(&self) -> Presentation<'_> {
        match self.state {
            SurfaceState::Rendering | SurfaceState::Paused => Presentation::Scene(&self.content),
            SurfaceState::Uninitialized | SurfaceState::Fallback(_) => {
                Presentation::Static(self.content.fallback_view())
            }
        }
    }

    /// Scene state changed; an on-demand loop draws on the next frame.
    pub fn invalidate(&mut self) {
        self.needs_redraw = true;
    }

    pub fn orbit(&mut self, delta: Vec2) {
        self.controls.rotate(delta);
        self.invalidate();
    }

    pub fn zoom(&mut self, delta: f32) {
        self.controls.zoom(delta);
        self.invalidate();
    }

    /// Explicitly switch this surface to its fallback.
    pub fn disable(&mut self) {
        self.disabled = true;
        self.enter_fallback(FallbackReason::Disabled);
    }

    /// Record a new logical size and display density. The density is clamped to
    /// the policy range and the result to the device's resolution ceiling.
    ///
    /// A paused surface only records the size; the backend sees it on resume.
    pub fn resize(
        &mut self,
        logical: LogicalSize<f32>,
        device_pixel_ratio: f32,
    ) -> PhysicalSize<u32> {
        self.logical_size = logical;
        self.device_pixel_ratio = device_pixel_ratio;
        let physical = self.physical_size();
        match self.state {
            SurfaceState::Rendering => {
                self.backend.resize(physical.width, physical.height);
                self.needs_redraw = true;
            }
            SurfaceState::Paused => self.pending_resize = true,
            SurfaceState::Uninitialized | SurfaceState::Fallback(_) => {}
        }
        tracing::debug!(
            surface = ?self.id,
            width = physical.width,
            height = physical.height,
            "surface resized"
        );
        physical
    }

    fn pixel_ratio(&self) -> f32 {
        self.context.policy().pixel_ratio_range.clamp(self.device_pixel_ratio)
    }

    fn physical_size(&self) -> PhysicalSize<u32> {
        let ratio = self.pixel_ratio();
        let ceiling = self.context.capabilities().resolution_ceiling();
        let scale =
            |logical: f32| ((logical.max(0.0) * ratio).round() as u32).clamp(1, ceiling.max(1));
        let LogicalSize { width, height } = self.logical_size;
        PhysicalSize::new(scale(width), scale(height))
    }

    /// Drive one frame.
    pub fn frame(&mut self) -> FrameOutcome {
        self.sync_visibility();
        self.check_fallback();

        match self.state {
            SurfaceState::Fallback(_) => FrameOutcome::Fallback,
            SurfaceState::Paused => FrameOutcome::Paused,
            SurfaceState::Uninitialized => {
                if !self.visible || !self.context.is_resolved() {
                    return FrameOutcome::Waiting;
                }
                self.start();
                match self.state {
                    SurfaceState::Rendering => self.draw(),
                    _ => FrameOutcome::Fallback,
                }
            }
            SurfaceState::Rendering => {
                if should_draw(self.context.policy().frame_loop_mode, self.needs_redraw) {
                    self.draw()
                } else {
                    FrameOutcome::Idle
                }
            }
        }
    }

    fn sync_visibility(&mut self) {
        while let Some(visible) = self.observer.next_transition() {
            self.visible = visible;
            match (self.state, visible) {
                (SurfaceState::Rendering, false) => {
                    self.state = SurfaceState::Paused;
                    tracing::debug!(surface = ?self.id, "paused");
                }
                (SurfaceState::Paused, true) => {
                    self.state = SurfaceState::Rendering;
                    self.needs_redraw = true;
                    if std::mem::take(&mut self.pending_resize) {
                        let physical = self.physical_size();
                        self.backend.resize(physical.width, physical.height);
                    }
                    tracing::debug!(surface = ?self.id, "resumed");
                }
                _ => {}
            }
        }
    }

    fn check_fallback(&mut self) {
        if matches!(self.state, SurfaceState::Fallback(_)) {
            return;
        }
        if self.disabled {
            self.enter_fallback(FallbackReason::Disabled);
        } else if self.context.is_resolved() && self.context.capabilities().is_low_end_device() {
            self.enter_fallback(FallbackReason::LowEndDevice);
        }
    }

    fn start(&mut self) {
        let capabilities = self.context.capabilities();
        let lighting = LightingSetup::from_policy(&self.context.policy());
        self.controls = OrbitControls::for_form_factor(capabilities.is_mobile_form_factor());
        let generated =
            ParticleField::generate(self.content.base_particles, &capabilities, self.seed);
        self.particles = match generated {
            Ok(field) => field,
            Err(e) => {
                tracing::warn!(surface = ?self.id, error = %e, "particle field unavailable");
                ParticleField::default()
            }
        };

        let physical = self.physical_size();
        let config = SurfaceConfig {
            width: physical.width,
            height: physical.height,
            pixel_ratio: self.pixel_ratio(),
            lighting,
            particles: self.particles.instances(),
        };

        // One attempt per mount: a failed context is not retried.
        self.acquired = true;
        match self.backend.acquire(&config) {
            Ok(()) => {
                self.lighting = Some(lighting);
                self.state = SurfaceState::Rendering;
                self.needs_redraw = true;
                tracing::info!(
                    surface = ?self.id,
                    width = physical.width,
                    height = physical.height,
                    shadows = lighting.shadows,
                    post_processing = lighting.post_processing,
                    particles = self.particles.len(),
                    "rendering started"
                );
            }
            Err(e) => {
                tracing::warn!(surface = ?self.id, error = %e, "graphics context unavailable");
                let reason = match e {
                    RenderError::PerformanceCaveat(_) => FallbackReason::PerformanceCaveat,
                    _ => FallbackReason::ContextUnavailable,
                };
                self.enter_fallback(reason);
            }
        }
    }

    fn draw(&mut self) -> FrameOutcome {
        let info = FrameInfo {
            frame_index: self.frames_drawn,
            camera: self.controls.pose(),
        };
        match self.backend.draw(&info) {
            Ok(()) => {
                self.frames_drawn += 1;
                self.needs_redraw = false;
                FrameOutcome::Drawn
            }
            Err(e) => {
                tracing::warn!(surface = ?self.id, error = %e, "frame failed");
                self.enter_fallback(FallbackReason::ContextLost);
                FrameOutcome::Fallback
            }
        }
    }

    fn enter_fallback(&mut self, reason: FallbackReason) {
        if matches!(self.state, SurfaceState::Fallback(_)) {
            return;
        }
        if self.acquired {
            self.backend.release();
            self.acquired = false;
        }
        self.state = SurfaceState::Fallback(reason);
        tracing::warn!(surface = ?self.id, ?reason, "switched to fallback presentation");
    }
}

impl<B: SceneBackend> Drop for AdaptiveSurface<B> {
    fn drop(&mut self) {
        if self.acquired {
            self.backend.release();
        }
    }
}
