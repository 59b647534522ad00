//! Vulkan abstraction layer built on `ash`.
//!
//! This crate covers the pieces a minimal presentation pipeline needs:
//! - Instance creation with optional validation diagnostics
//! - Physical device and queue family selection
//! - Logical device and queue retrieval
//! - Swapchain lifecycle (images, views, framebuffers)
//! - Render pass, fixed graphics pipeline, and shader modules
//! - Command pool/buffer recording
//! - Synchronization primitives

mod error;

pub mod command;
pub mod device;
pub mod instance;
pub mod physical_device;
pub mod pipeline;
pub mod render_pass;
pub mod shader;
pub mod swapchain;
pub mod sync;

pub use error::{RhiError, RhiResult};

// Re-export ash types that users might need
pub use ash::vk;
