//! Visibility gate
//!
//! Tracks whether each rendering surface is inside the viewport so expensive
//! render loops only run for on-screen content.
//!
//! The host reports geometry (or a ready-made intersection ratio); each
//! surface holds a [`VisibilityObserver`] that yields visibility *transitions*.
//! Dropping the observer disconnects it.

use crate::error::VisibilityError;
use crate::math::Rect;
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::{Rc, Weak};

/// Identifies one rendering surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub u64);

struct Registration {
    token: u64,
    threshold: f32,
    visible: bool,
    pending: VecDeque<bool>,
}

#[derive(Default)]
struct GateState {
    next_token: u64,
    surfaces: HashMap<SurfaceId, Registration>,
}

/// Viewport observer shared by every surface on the page.
#[derive(Clone, Default)]
pub struct VisibilityGate {
    state: Rc<RefCell<GateState>>,
}

impl VisibilityGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start observing `surface`. It counts as visible once at least
    /// `threshold` of its area is inside the viewport.
    ///
    /// Observing a surface that is already registered replaces the old
    /// registration, so re-mounting never leaves two observers behind. The new
    /// observer inherits the known visibility; a surface that is already on
    /// screen delivers `true` as its first transition.
    pub fn observe(
        &self,
        surface: SurfaceId,
        threshold: f32,
    ) -> Result<VisibilityObserver, VisibilityError> {
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(VisibilityError::InvalidThreshold { threshold });
        }

        let mut state = self.state.borrow_mut();
        state.next_token += 1;
        let token = state.next_token;
        let visible = state.surfaces.get(&surface).is_some_and(|r| r.visible);
        let mut pending = VecDeque::new();
        if visible {
            pending.push_back(true);
        }
        let registration = Registration {
            token,
            threshold,
            visible,
            pending,
        };
        if state.surfaces.insert(surface, registration).is_some() {
            tracing::debug!(?surface, visible, "replaced existing visibility registration");
        }

        Ok(VisibilityObserver {
            gate: Rc::downgrade(&self.state),
            surface,
            token,
        })
    }

    /// Report the surface's bounds against the current viewport.
    pub fn report(&self, surface: SurfaceId, bounds: Rect, viewport: Rect) {
        self.report_fraction(surface, bounds.visible_fraction(&viewport));
    }

    /// Report an already computed intersection ratio. Unknown surfaces are ignored.
    pub fn report_fraction(&self, surface: SurfaceId, fraction: f32) {
        let mut state = self.state.borrow_mut();
        let Some(registration) = state.surfaces.get_mut(&surface) else {
            return;
        };
        let visible = fraction >= registration.threshold;
        if visible != registration.visible {
            registration.visible = visible;
            registration.pending.push_back(visible);
            tracing::debug!(?surface, visible, fraction, "visibility changed");
        }
    }

    /// Number of live registrations.
    pub fn observer_count(&self) -> usize {
        self.state.borrow().surfaces.len()
    }
}

/// One surface's view of the gate. Yields visibility transitions in order,
/// starting from the state the gate already knew ("not visible" for a new surface).
pub struct VisibilityObserver {
    gate: Weak<RefCell<GateState>>,
    surface: SurfaceId,
    token: u64,
}

impl VisibilityObserver {
    /// Current state; `false` once the gate is gone or the registration was
    /// replaced.
    pub fn is_visible(&self) -> bool {
        self.with_registration(|r| r.visible).unwrap_or(false)
    }

    pub fn next_transition(&mut self) -> Option<bool> {
        self.with_registration(|r| r.pending.pop_front()).flatten()
    }

    /// Drop queued transitions and replay the current state as the next one.
    pub fn restart(&mut self) {
        self.with_registration(|r| {
            r.pending.clear();
            r.pending.push_back(r.visible);
        });
    }

    fn with_registration<R>(&self, f: impl FnOnce(&mut Registration) -> R) -> Option<R> {
        let gate = self.gate.upgrade()?;
        let mut state = gate.borrow_mut();
        let registration = state
            .surfaces
            .get_mut(&self.surface)
            .filter(|r| r.token == self.token)?;
        Some(f(registration))
    }
}

impl Iterator for VisibilityObserver {
    type Item = bool;

    fn next(&mut self) -> Option<bool> {
        self.next_transition()
    }
}

impl Drop for VisibilityObserver {
    fn drop(&mut self) {
        let Some(gate) = self.gate.upgrade() else {
            return;
        };
        let mut state = gate.borrow_mut();
        // A newer registration for the same surface belongs to someone else.
        if state.surfaces.get(&self.surface).is_some_and(|r| r.token == self.token) {
            state.surfaces.remove(&self.surface);
            tracing::debug!(surface = ?self.surface, "visibility observer disconnected");
        }
    }
}
