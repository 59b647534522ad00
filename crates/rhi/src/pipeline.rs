//! Graphics pipeline and pipeline layout management.
//!
//! The triangle pipeline is deliberately fixed: no vertex input (positions
//! and colors live in the vertex shader), triangle-list topology, fill mode,
//! back-face culling, no blending, no depth. Viewport and scissor are the
//! only dynamic state so the pipeline survives swapchain recreation.

use std::sync::Arc;

use ash::vk;
use tracing::{debug, info};

use crate::device::Device;
use crate::error::RhiResult;
use crate::shader::Shader;

/// Vulkan pipeline layout wrapper.
///
/// The triangle uses an empty layout — no descriptor sets, no push
/// constants — but the wrapper accepts both for completeness.
pub struct PipelineLayout {
    /// Reference to the logical device.
    device: Arc<Device>,
    /// Vulkan pipeline layout handle.
    layout: vk::PipelineLayout,
}

impl PipelineLayout {
    /// Creates a new pipeline layout.
    ///
    /// # Errors
    ///
    /// Returns an error if pipeline layout creation fails.
    pub fn new(
        device: Arc<Device>,
        descriptor_set_layouts: &[vk::DescriptorSetLayout],
        push_constant_ranges: &[vk::PushConstantRange],
    ) -> RhiResult<Self> {
        let create_info = vk::PipelineLayoutCreateInfo::default()
            .set_layouts(descriptor_set_layouts)
            .push_constant_ranges(push_constant_ranges);

        let layout = unsafe { device.handle().create_pipeline_layout(&create_info, None)? };

        debug!(
            "Created pipeline layout with {} descriptor set layout(s) and {} push constant range(s)",
            descriptor_set_layouts.len(),
            push_constant_ranges.len()
        );

        Ok(Self { device, layout })
    }

    /// Returns the Vulkan pipeline layout handle.
    #[inline]
    pub fn handle(&self) -> vk::PipelineLayout {
        self.layout
    }
}

impl Drop for PipelineLayout {
    fn drop(&mut self) {
        unsafe {
            self.device
                .handle()
                .destroy_pipeline_layout(self.layout, None);
        }
        debug!("Pipeline layout destroyed");
    }
}

/// Vulkan graphics pipeline wrapper.
///
/// Immutable after creation and shareable between threads.
pub struct Pipeline {
    /// Reference to the logical device.
    device: Arc<Device>,
    /// Vulkan pipeline handle.
    pipeline: vk::Pipeline,
}

impl Pipeline {
    /// Creates the triangle graphics pipeline.
    ///
    /// Viewport and scissor are dynamic; the placeholder counts in the
    /// viewport state only tell the driver how many to expect at record
    /// time.
    ///
    /// # Errors
    ///
    /// Returns an error if pipeline creation fails.
    pub fn create_graphics(
        device: Arc<Device>,
        vertex_shader: &Shader,
        fragment_shader: &Shader,
        layout: &PipelineLayout,
        render_pass: vk::RenderPass,
    ) -> RhiResult<Self> {
        let shader_stages = [
            vertex_shader.stage_create_info(),
            fragment_shader.stage_create_info(),
        ];

        // No vertex buffers; the shader synthesizes geometry from
        // gl_VertexIndex.
        let vertex_input = vk::PipelineVertexInputStateCreateInfo::default();

        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
            .primitive_restart_enable(false);

        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewport_count(1)
            .scissor_count(1);

        let rasterizer = vk::PipelineRasterizationStateCreateInfo::default()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(vk::PolygonMode::FILL)
            .line_width(1.0)
            .cull_mode(vk::CullModeFlags::BACK)
            .front_face(vk::FrontFace::CLOCKWISE)
            .depth_bias_enable(false);

        let multisampling = vk::PipelineMultisampleStateCreateInfo::default()
            .sample_shading_enable(false)
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);

        let color_blend_attachment = vk::PipelineColorBlendAttachmentState::default()
            .color_write_mask(vk::ColorComponentFlags::RGBA)
            .blend_enable(false);

        let blend_attachments = [color_blend_attachment];
        let color_blending = vk::PipelineColorBlendStateCreateInfo::default()
            .logic_op_enable(false)
            .attachments(&blend_attachments);

        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state =
            vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

        let create_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterizer)
            .multisample_state(&multisampling)
            .color_blend_state(&color_blending)
            .dynamic_state(&dynamic_state)
            .layout(layout.handle())
            .render_pass(render_pass)
            .subpass(0);

        let pipeline = unsafe {
            device
                .handle()
                .create_graphics_pipelines(vk::PipelineCache::null(), &[create_info], None)
                .map_err(|(_, result)| result)?[0]
        };

        info!("Graphics pipeline created");

        Ok(Self { device, pipeline })
    }

    /// Returns the Vulkan pipeline handle.
    #[inline]
    pub fn handle(&self) -> vk::Pipeline {
        self.pipeline
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_pipeline(self.pipeline, None);
        }
        info!("Graphics pipeline destroyed");
    }
}
