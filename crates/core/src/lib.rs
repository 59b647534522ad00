//! Core utilities shared across the renderer workspace:
//! - Error types and result aliases
//! - Logging initialization
//! - Run configuration

mod config;
mod error;
mod logging;

pub use config::RenderConfig;
pub use error::{Error, Result};
pub use logging::init_logging;
