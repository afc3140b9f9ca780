//! Prism Runtime
//!
//! Native host: probes the machine once, publishes the capability record and
//! drives one adaptive scene surface from the winit event loop.

use anyhow::{Context as _, Result};
use prism_core::throttle::{
    effective_motion, select_image_width, RetryPolicy, ScrollThrottle, DEFAULT_IMAGE_WIDTHS,
};
use prism_core::glam::Vec2;
use prism_core::time::FrameClock;
use prism_core::{CapabilityRecord, FrameLoopMode, PerformanceContext, SurfaceId, VisibilityGate};
use prism_env::DeviceSignals;
use prism_render::{
    probe_graphics, window_attributes, AdaptiveSurface, FrameOutcome, Presentation, SceneContent,
    SceneItem, SurfaceOptions, WgpuBackend, WindowConfig,
};
use prism_services::Settings;
use std::sync::Arc;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalPosition,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

const SCENE: SurfaceId = SurfaceId(1);
const PIXELS_PER_LINE: f32 = 40.0;

fn showcase() -> SceneContent {
    SceneContent {
        title: "What we build".to_string(),
        items: vec![
            SceneItem::new("Web platforms", "Sites, storefronts and dashboards"),
            SceneItem::new("Mobile apps", "Native and cross-platform iOS and Android"),
            SceneItem::new("Cloud", "Infrastructure, pipelines and operations"),
            SceneItem::new("Design", "Product and brand design systems"),
        ],
        base_particles: 2_000,
    }
}

struct App {
    settings: Settings,
    context: PerformanceContext,
    gate: VisibilityGate,
    window: Option<Arc<Window>>,
    surface: Option<AdaptiveSurface<WgpuBackend>>,
    clock: FrameClock,
    scroll: ScrollThrottle,
    scroll_offset: f32,
    applied_scroll: f32,
    dragging: bool,
    cursor: Option<PhysicalPosition<f64>>,
    reduced_motion: bool,
    reported_fallback: bool,
    fatal: Option<anyhow::Error>,
}

impl App {
    fn new(settings: Settings) -> Self {
        Self {
            settings,
            context: PerformanceContext::pending(),
            gate: VisibilityGate::new(),
            window: None,
            surface: None,
            clock: FrameClock::new(),
            scroll: ScrollThrottle::new(),
            scroll_offset: 0.0,
            applied_scroll: 0.0,
            dragging: false,
            cursor: None,
            reduced_motion: false,
            reported_fallback: false,
            fatal: None,
        }
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let graphics = &self.settings.graphics;
        let config = WindowConfig {
            title: graphics.window_title.clone(),
            width: graphics.window_width,
            height: graphics.window_height,
        };
        let window = Arc::new(
            event_loop
                .create_window(window_attributes(&config))
                .context("failed to create window")?,
        );

        let probe = probe_graphics();
        let signals = DeviceSignals::detect()
            .with_pixel_density(window.scale_factor())
            .with_graphics(probe.signal.clone());
        let reduced_motion = self
            .settings
            .motion
            .reduced_motion
            .unwrap_or(signals.prefers_reduced_motion);
        let signals = signals.with_reduced_motion(reduced_motion);
        let constrained_network = signals.constrained_network();
        self.reduced_motion = reduced_motion;

        let capabilities = CapabilityRecord::probe_with(&signals, &graphics.tier_thresholds);
        self.context.publish(capabilities)?;
        tracing::info!(
            backend = ?probe.backend,
            adapter = probe.adapter_name.as_deref().unwrap_or("none"),
            memory_gb = capabilities.device_memory_gb(),
            cores = capabilities.logical_cores(),
            "device probed"
        );

        let policy = self.context.policy();
        let motion = effective_motion(&policy, reduced_motion);
        let logical_width = window.inner_size().to_logical::<f32>(window.scale_factor()).width;
        let hero_width = select_image_width(
            logical_width,
            &capabilities,
            &policy,
            constrained_network,
            DEFAULT_IMAGE_WIDTHS,
        );
        tracing::info!(
            ?hero_width,
            motion_ms = motion.duration.as_millis() as u64,
            reduced_motion,
            "asset and motion budget selected"
        );
        if let (Some(template), Some(width)) = (&graphics.hero_image, hero_width) {
            load_hero_image(&template.replace("{width}", &width.to_string()));
        }

        let options = SurfaceOptions {
            visibility_threshold: graphics.visibility_threshold,
            disabled: graphics.disable_3d,
            wiring: graphics.wiring,
            ..SurfaceOptions::default()
        };
        let mut surface = AdaptiveSurface::new(
            SCENE,
            Some(&self.context),
            &self.gate,
            WgpuBackend::new(window.clone()),
            showcase(),
            options,
        )?;
        let scale = window.scale_factor();
        surface.resize(window.inner_size().to_logical(scale), scale as f32);

        // A freshly created window is fully on screen.
        self.gate.report_fraction(SCENE, 1.0);
        window.request_redraw();

        self.surface = Some(surface);
        self.window = Some(window);
        Ok(())
    }

    fn redraw(&mut self) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        self.clock.advance();

        let applied = &mut self.applied_scroll;
        self.scroll.flush(&self.clock, |offset| {
            surface.zoom(offset - *applied);
            *applied = offset;
        });

        match surface.frame() {
            FrameOutcome::Drawn | FrameOutcome::Idle => {
                if self.context.policy().frame_loop_mode == FrameLoopMode::Continuous {
                    if let Some(window) = &self.window {
                        window.request_redraw();
                    }
                }
            }
            FrameOutcome::Fallback if !self.reported_fallback => {
                self.reported_fallback = true;
                self.report_fallback();
            }
            FrameOutcome::Fallback | FrameOutcome::Paused | FrameOutcome::Waiting => {}
        }
    }

    /// Without a DOM, the static presentation goes to the log, each card with
    /// its reveal delay.
    fn report_fallback(&self) {
        let Some(surface) = &self.surface else {
            return;
        };
        if let Presentation::Static(view) = surface.presentation() {
            let motion = effective_motion(&self.context.policy(), self.reduced_motion);
            tracing::info!(
                state = ?surface.state(),
                "presenting static content\n{}",
                view.to_text()
            );
            for (index, card) in view.cards.iter().enumerate() {
                tracing::debug!(
                    card = card.title,
                    delay_ms = motion.delay_for(index as u32).as_millis() as u64,
                    "card reveal"
                );
            }
        }
    }

    fn request_redraw(&self) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn resize_to_window(&mut self) {
        let (Some(window), Some(surface)) = (&self.window, self.surface.as_mut()) else {
            return;
        };
        let scale = window.scale_factor();
        surface.resize(window.inner_size().to_logical(scale), scale as f32);
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.start(event_loop) {
            self.fatal = Some(e);
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                // Drop the surface (and its GPU context) before the window.
                self.surface = None;
                event_loop.exit();
            }
            WindowEvent::Occluded(occluded) => {
                self.gate.report_fraction(SCENE, if occluded { 0.0 } else { 1.0 });
                self.request_redraw();
            }
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                self.resize_to_window();
                self.request_redraw();
            }
            WindowEvent::MouseInput { state, button: MouseButton::Left, .. } => {
                self.dragging = state == ElementState::Pressed;
            }
            WindowEvent::CursorMoved { position, .. } => {
                let last = self.cursor.replace(position);
                let Some(last) = last.filter(|_| self.dragging) else {
                    return;
                };
                if let Some(surface) = self.surface.as_mut() {
                    let (dx, dy) = (position.x - last.x, position.y - last.y);
                    surface.orbit(Vec2::new(dx as f32, dy as f32));
                }
                self.request_redraw();
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(position) => position.y as f32 / PIXELS_PER_LINE,
                };
                self.scroll_offset -= lines * PIXELS_PER_LINE;
                self.scroll.on_scroll(self.scroll_offset);
                self.request_redraw();
            }
            WindowEvent::RedrawRequested => self.redraw(),
            _ => {}
        }
    }
}

/// Image loads are the only thing retried; a failed graphics context never is.
fn load_hero_image(path: &str) {
    match RetryPolicy::default().run(|_| std::fs::read(path), std::thread::sleep) {
        Ok(bytes) => tracing::info!(path, bytes = bytes.len(), "hero image loaded"),
        Err(e) => tracing::warn!(path, error = %e, "hero image unavailable"),
    }
}

fn load_settings() -> Settings {
    let Ok(path) = std::env::var("PRISM_SETTINGS") else {
        return Settings::default();
    };
    match Settings::load(&path) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!(error = %e, "using default settings");
            Settings::default()
        }
    }
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    tracing::info!("Prism v{}", prism_core::VERSION);
    let settings = load_settings();

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App::new(settings);
    event_loop.run_app(&mut app)?;

    match app.fatal.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
