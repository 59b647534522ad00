//! Error types for the renderer.

use thiserror::Error;

/// Top-level error type for window and application concerns.
#[derive(Error, Debug)]
pub enum Error {
    /// Vulkan-related errors surfaced outside the RHI layer
    #[error("Vulkan error: {0}")]
    Vulkan(String),

    /// Window creation or management errors
    #[error("Window error: {0}")]
    Window(String),

    /// IO errors (shader files, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),
}

/// Result type alias using the renderer's Error type.
pub type Result<T> = std::result::Result<T, Error>;
