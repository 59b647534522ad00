//! Logging initialization and configuration.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the logging system with tracing.
///
/// Filtering is driven by `RUST_LOG`; without it, the workspace crates
/// log at debug and everything else at info.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tri_rhi=debug,tri_render=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .init();
}
