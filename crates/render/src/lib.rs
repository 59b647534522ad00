//! Frame pacing, command recording, and renderer orchestration.
//!
//! The core of this crate is the frame-in-flight protocol in [`frame`]: a
//! fixed ring of synchronization slots that bounds CPU lead over the GPU,
//! paired with the stale-swapchain recovery logic in [`renderer`].

mod error;

pub mod frame;
pub mod recorder;
pub mod renderer;
pub mod resize;

pub use error::{RenderError, RenderResult};
pub use renderer::Renderer;

/// Number of frames the CPU may record ahead of the GPU.
///
/// Two slots let the CPU prepare frame N+1 while the GPU renders frame N;
/// more would add latency without improving throughput here.
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;
