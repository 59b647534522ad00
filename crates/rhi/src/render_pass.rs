//! Render pass creation.
//!
//! A single-subpass pass with one color attachment matching the swapchain
//! format. The attachment is cleared on load and left in PRESENT_SRC_KHR,
//! ready for the presentation engine without a separate barrier.

use std::sync::Arc;

use ash::vk;
use tracing::{debug, info};

use crate::device::Device;
use crate::error::RhiResult;

/// Vulkan render pass wrapper.
///
/// Immutable after creation; survives swapchain recreation as long as the
/// surface format does not change.
pub struct RenderPass {
    /// Reference to the logical device.
    device: Arc<Device>,
    /// Vulkan render pass handle.
    render_pass: vk::RenderPass,
}

impl RenderPass {
    /// Creates a single-subpass render pass for the given color format.
    ///
    /// The subpass carries an external dependency on the color-attachment
    /// output stage so the layout transition from UNDEFINED waits for the
    /// acquired image to actually become available.
    ///
    /// # Errors
    ///
    /// Returns an error if render pass creation fails.
    pub fn new(device: Arc<Device>, color_format: vk::Format) -> RhiResult<Self> {
        let color_attachment = vk::AttachmentDescription::default()
            .format(color_format)
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .final_layout(vk::ImageLayout::PRESENT_SRC_KHR);

        let color_attachment_ref = vk::AttachmentReference::default()
            .attachment(0)
            .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);

        let color_refs = [color_attachment_ref];
        let subpass = vk::SubpassDescription::default()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&color_refs);

        // Delay the implicit UNDEFINED -> COLOR_ATTACHMENT_OPTIMAL transition
        // until the presentation engine has released the image.
        let dependency = vk::SubpassDependency::default()
            .src_subpass(vk::SUBPASS_EXTERNAL)
            .dst_subpass(0)
            .src_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
            .src_access_mask(vk::AccessFlags::empty())
            .dst_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
            .dst_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE);

        let attachments = [color_attachment];
        let subpasses = [subpass];
        let dependencies = [dependency];

        let create_info = vk::RenderPassCreateInfo::default()
            .attachments(&attachments)
            .subpasses(&subpasses)
            .dependencies(&dependencies);

        let render_pass = unsafe { device.handle().create_render_pass(&create_info, None)? };

        info!("Render pass created for format {:?}", color_format);

        Ok(Self {
            device,
            render_pass,
        })
    }

    /// Returns the Vulkan render pass handle.
    #[inline]
    pub fn handle(&self) -> vk::RenderPass {
        self.render_pass
    }
}

impl Drop for RenderPass {
    fn drop(&mut self) {
        unsafe {
            self.device
                .handle()
                .destroy_render_pass(self.render_pass, None);
        }
        debug!("Render pass destroyed");
    }
}
