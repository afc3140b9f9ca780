//! Orbit camera controls
//!
//! Touch gestures produce much larger deltas than a mouse, so mobile form
//! factors get damped rotate/zoom speeds.

use glam::{Vec2, Vec3};
use std::f32::consts::FRAC_PI_2;

const RADIANS_PER_PIXEL: f32 = 0.005;
const ZOOM_PER_UNIT: f32 = 0.001;
const PITCH_LIMIT: f32 = FRAC_PI_2 - 0.05;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub eye: Vec3,
    pub target: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitControls {
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    yaw: f32,
    pitch: f32,
    distance: f32,
}

impl OrbitControls {
    pub fn for_form_factor(is_mobile: bool) -> Self {
        let (rotate_speed, zoom_speed) = if is_mobile { (0.5, 0.5) } else { (1.0, 1.0) };
        Self {
            rotate_speed,
            zoom_speed,
            min_distance: 2.0,
            max_distance: 20.0,
            yaw: 0.0,
            pitch: 0.3,
            distance: 8.0,
        }
    }

    /// Drag by `delta` pixels.
    pub fn rotate(&mut self, delta: Vec2) {
        let scaled = delta * RADIANS_PER_PIXEL * self.rotate_speed;
        self.yaw += scaled.x;
        self.pitch = (self.pitch + scaled.y).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    /// Wheel/pinch by `delta` units; positive zooms out.
    pub fn zoom(&mut self, delta: f32) {
        let factor = (1.0 + delta * ZOOM_PER_UNIT * self.zoom_speed).max(0.1);
        self.distance = (self.distance * factor).clamp(self.min_distance, self.max_distance);
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn pose(&self) -> CameraPose {
        let eye = Vec3::new(
            self.distance * self.pitch.cos() * self.yaw.sin(),
            self.distance * self.pitch.sin(),
            self.distance * self.pitch.cos() * self.yaw.cos(),
        );
        CameraPose {
            eye,
            target: Vec3::ZERO,
        }
    }
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self::for_form_factor(false)
    }
}
