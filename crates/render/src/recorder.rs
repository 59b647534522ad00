//! Triangle pass command recording.

use ash::vk;

use tri_rhi::command::CommandBuffer;

use crate::error::RenderResult;

/// Clear color for the pass (dark blue-grey).
pub const CLEAR_COLOR: [f32; 4] = [0.1, 0.2, 0.3, 1.0];

/// Records the full triangle pass into `cmd`.
///
/// Resets the buffer, begins recording, runs a single render pass instance
/// that clears the target, binds the pipeline, sets the dynamic viewport and
/// scissor to the full extent, draws the three hardcoded vertices, and ends
/// recording.
///
/// The caller guarantees the GPU is done with this buffer (fence retired)
/// before calling.
///
/// # Errors
///
/// Returns an error if any recording step fails.
pub fn record_triangle_pass(
    cmd: &CommandBuffer,
    render_pass: vk::RenderPass,
    framebuffer: vk::Framebuffer,
    extent: vk::Extent2D,
    pipeline: vk::Pipeline,
) -> RenderResult<()> {
    cmd.reset()?;
    cmd.begin()?;

    let clear_values = [vk::ClearValue {
        color: vk::ClearColorValue {
            float32: CLEAR_COLOR,
        },
    }];

    cmd.begin_render_pass(render_pass, framebuffer, extent, &clear_values);
    cmd.bind_pipeline(vk::PipelineBindPoint::GRAPHICS, pipeline);
    cmd.set_viewport(&full_viewport(extent));
    cmd.set_scissor(&full_scissor(extent));
    cmd.draw(3, 1, 0, 0);
    cmd.end_render_pass();

    cmd.end()?;
    Ok(())
}

/// Viewport covering the whole extent with the standard 0..1 depth range.
pub fn full_viewport(extent: vk::Extent2D) -> vk::Viewport {
    vk::Viewport {
        x: 0.0,
        y: 0.0,
        width: extent.width as f32,
        height: extent.height as f32,
        min_depth: 0.0,
        max_depth: 1.0,
    }
}

/// Scissor rectangle covering the whole extent.
pub fn full_scissor(extent: vk::Extent2D) -> vk::Rect2D {
    vk::Rect2D {
        offset: vk::Offset2D { x: 0, y: 0 },
        extent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewport_covers_extent() {
        let extent = vk::Extent2D {
            width: 800,
            height: 600,
        };
        let viewport = full_viewport(extent);
        assert_eq!(viewport.x, 0.0);
        assert_eq!(viewport.y, 0.0);
        assert_eq!(viewport.width, 800.0);
        assert_eq!(viewport.height, 600.0);
        assert_eq!(viewport.min_depth, 0.0);
        assert_eq!(viewport.max_depth, 1.0);
    }

    #[test]
    fn scissor_covers_extent() {
        let extent = vk::Extent2D {
            width: 1024,
            height: 768,
        };
        let scissor = full_scissor(extent);
        assert_eq!(scissor.offset.x, 0);
        assert_eq!(scissor.offset.y, 0);
        assert_eq!(scissor.extent.width, 1024);
        assert_eq!(scissor.extent.height, 768);
    }

    #[test]
    fn clear_color_is_opaque() {
        assert_eq!(CLEAR_COLOR[3], 1.0);
    }
}
