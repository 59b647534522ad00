//! Platform layer for the renderer:
//! - Window management via winit
//! - Vulkan surface creation and required-extension enumeration

mod window;

pub use window::{Surface, Window, required_extensions};
