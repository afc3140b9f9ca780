//! Window management
//!
//! Cross-platform window creation via winit

use winit::dpi::LogicalSize;
use winit::window::{Window, WindowAttributes};

#[derive(Debug, Clone, PartialEq)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Prism".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

/// Create window attributes from config
pub fn window_attributes(config: &WindowConfig) -> WindowAttributes {
    Window::default_attributes()
        .with_title(config.title.clone())
        .with_inner_size(LogicalSize::new(config.width.max(1), config.height.max(1)))
}
