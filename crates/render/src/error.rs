//! Renderer error types.

use thiserror::Error;

use tri_rhi::RhiError;
use tri_rhi::vk;

use crate::frame::SlotState;

/// Renderer error type.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Error from the Vulkan abstraction layer
    #[error(transparent)]
    Rhi(#[from] RhiError),

    /// Raw Vulkan error from acquire/present paths
    #[error("Vulkan error: {0}")]
    Vulkan(#[from] vk::Result),

    /// A frame slot was driven through an illegal state transition
    #[error("Illegal frame slot transition: {from:?} -> {to:?}")]
    InvalidSlotTransition {
        /// State the slot was in.
        from: SlotState,
        /// State the caller tried to enter.
        to: SlotState,
    },

    /// Window or surface error
    #[error("Window error: {0}")]
    Window(String),
}

/// Result type alias for renderer operations.
pub type RenderResult<T> = std::result::Result<T, RenderError>;
