//! Frame cadence
//!
//! Display-aligned frame counter. Throttled handlers key off the frame index so
//! they run at most once per refresh.

#[derive(Debug, Default)]
pub struct FrameClock {
    frame_index: u64,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Called once per display refresh.
    pub fn advance(&mut self) -> u64 {
        self.frame_index += 1;
        self.frame_index
    }
}
