//! Renderer orchestration.
//!
//! [`Renderer`] owns the whole Vulkan resource graph and drives one frame
//! per [`render_frame`](Renderer::render_frame) call: admission wait, image
//! acquisition, command recording, submission, presentation, and the
//! stale-swapchain recovery that follows acquire/present errors and window
//! resizes.
//!
//! # Resource destruction order
//!
//! Teardown must run against an idle device and in reverse dependency
//! order: frame sync and command pool, then pipeline, layout, and render
//! pass, then the swapchain, then the device, surface, and instance.
//! `ManuallyDrop` pins that order in [`Drop`].

use std::mem::ManuallyDrop;
use std::path::Path;
use std::sync::Arc;

use ash::vk;
use tracing::{debug, error, info, warn};

use tri_core::RenderConfig;
use tri_platform::{Surface, Window, required_extensions};
use tri_rhi::command::{CommandBuffer, CommandPool};
use tri_rhi::device::Device;
use tri_rhi::instance::Instance;
use tri_rhi::physical_device::select_physical_device;
use tri_rhi::pipeline::{Pipeline, PipelineLayout};
use tri_rhi::render_pass::RenderPass;
use tri_rhi::shader::{Shader, ShaderStage};
use tri_rhi::swapchain::Swapchain;

use crate::MAX_FRAMES_IN_FLIGHT;
use crate::error::{RenderError, RenderResult};
use crate::frame::FrameSynchronizer;
use crate::recorder::record_triangle_pass;
use crate::resize::ResizeCoordinator;

/// Default vertex shader path, relative to the working directory.
const VERTEX_SHADER_PATH: &str = "shaders/triangle.vert.spv";
/// Default fragment shader path, relative to the working directory.
const FRAGMENT_SHADER_PATH: &str = "shaders/triangle.frag.spv";

/// Owns all Vulkan resources and renders one triangle per frame.
pub struct Renderer {
    /// Vulkan instance (destroyed last).
    instance: ManuallyDrop<Instance>,
    /// Window surface (destroyed after the device, before the instance).
    surface: ManuallyDrop<Surface>,
    /// Logical device (released after everything created from it).
    device: ManuallyDrop<Arc<Device>>,
    /// Swapchain with its views and framebuffers.
    swapchain: ManuallyDrop<Swapchain>,
    /// Render pass (outlives swapchain rebuilds).
    render_pass: ManuallyDrop<RenderPass>,
    /// Pipeline layout (empty for the triangle).
    pipeline_layout: ManuallyDrop<PipelineLayout>,
    /// Fixed graphics pipeline.
    pipeline: ManuallyDrop<Pipeline>,
    /// Command pool for the graphics family.
    command_pool: ManuallyDrop<CommandPool>,
    /// One command buffer per swapchain image, re-recorded every frame.
    command_buffers: Vec<CommandBuffer>,
    /// Frame-in-flight slot ring.
    frame_sync: ManuallyDrop<FrameSynchronizer>,
    /// Resize and minimize tracking.
    resize: ResizeCoordinator,
}

impl Renderer {
    /// Creates a renderer targeting the given window.
    ///
    /// # Errors
    ///
    /// Returns an error if any Vulkan resource creation fails, no suitable
    /// GPU is found, or the shader files cannot be loaded.
    pub fn new(window: &Window, config: &RenderConfig) -> RenderResult<Self> {
        let (width, height) = window.framebuffer_size();

        info!("Initializing renderer ({}x{})", width, height);

        let display_handle = window
            .display_handle()
            .map_err(|e| RenderError::Window(format!("Failed to get display handle: {}", e)))?;
        let surface_extensions = required_extensions(display_handle.as_raw())
            .map_err(|e| RenderError::Window(e.to_string()))?;

        let instance = Instance::new(config.validation, &surface_extensions)?;

        let surface = window
            .create_surface(instance.entry(), instance.handle())
            .map_err(|e| RenderError::Window(e.to_string()))?;

        let physical_device_info =
            select_physical_device(instance.handle(), surface.handle(), surface.loader())?;

        let device = Device::new(&instance, &physical_device_info)?;

        let mut swapchain =
            Swapchain::new(&instance, device.clone(), surface.handle(), width, height)?;

        let render_pass = RenderPass::new(device.clone(), swapchain.format())?;
        swapchain.create_framebuffers(render_pass.handle())?;

        let (pipeline, pipeline_layout) =
            Self::create_triangle_pipeline(device.clone(), &render_pass)?;

        let graphics_family = device
            .queue_families()
            .graphics_family
            .ok_or(tri_rhi::RhiError::NoSuitableGpu)?;
        let command_pool = CommandPool::new(device.clone(), graphics_family)?;

        let command_buffers =
            Self::allocate_command_buffers(&device, &command_pool, swapchain.image_count())?;

        let frame_sync = FrameSynchronizer::new(device.clone())?;

        info!(
            "Renderer ready: {} swapchain images, {} frames in flight",
            swapchain.image_count(),
            MAX_FRAMES_IN_FLIGHT
        );

        Ok(Self {
            instance: ManuallyDrop::new(instance),
            surface: ManuallyDrop::new(surface),
            device: ManuallyDrop::new(device),
            swapchain: ManuallyDrop::new(swapchain),
            render_pass: ManuallyDrop::new(render_pass),
            pipeline_layout: ManuallyDrop::new(pipeline_layout),
            pipeline: ManuallyDrop::new(pipeline),
            command_pool: ManuallyDrop::new(command_pool),
            command_buffers,
            frame_sync: ManuallyDrop::new(frame_sync),
            resize: ResizeCoordinator::new(width, height),
        })
    }

    /// Records a window size change from the event loop.
    pub fn handle_resize(&mut self, width: u32, height: u32) {
        self.resize.note_resized(width, height);
    }

    /// Renders and presents one frame.
    ///
    /// Skips the frame entirely while minimized. A stale swapchain reported
    /// by acquire or present is not an error: the frame is dropped (or
    /// still presented, for suboptimal) and the chain is rebuilt.
    ///
    /// # Errors
    ///
    /// Returns an error on genuine device failures, not on out-of-date or
    /// suboptimal swapchain conditions.
    pub fn render_frame(&mut self) -> RenderResult<()> {
        // Zero-sized framebuffer: nothing can be rendered or rebuilt.
        if self.resize.is_minimized() {
            return Ok(());
        }

        if self.resize.resize_pending() {
            self.recreate_swapchain()?;
        }

        // Admission: at most MAX_FRAMES_IN_FLIGHT frames between here and
        // fence retirement.
        self.frame_sync.begin_frame()?;

        let acquire_semaphore = self.frame_sync.current_slot().image_available_handle();
        let (image_index, acquire_suboptimal) =
            match self.swapchain.acquire_next_image(acquire_semaphore) {
                Ok(result) => result,
                Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                    // Fence was not reset; the slot can be reused as-is.
                    debug!("Swapchain out of date at acquire, rebuilding");
                    self.frame_sync.abort_acquire()?;
                    self.resize.request_rebuild();
                    self.recreate_swapchain()?;
                    return Ok(());
                }
                Err(e) => return Err(RenderError::Vulkan(e)),
            };

        // Only now is it safe to reset the fence: the acquired image
        // guarantees this slot's submission will happen and re-signal it.
        self.frame_sync.image_acquired()?;

        let cmd = &self.command_buffers[image_index as usize];
        record_triangle_pass(
            cmd,
            self.render_pass.handle(),
            self.swapchain.framebuffer(image_index as usize),
            self.swapchain.extent(),
            self.pipeline.handle(),
        )?;

        self.frame_sync
            .submit(self.device.graphics_queue(), cmd.handle())?;

        self.frame_sync.presenting()?;
        let render_finished = self.frame_sync.current_slot().render_finished_handle();
        let present_stale = match self.swapchain.present(
            self.device.present_queue(),
            image_index,
            render_finished,
        ) {
            Ok(suboptimal) => suboptimal,
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => true,
            Err(e) => return Err(RenderError::Vulkan(e)),
        };

        self.frame_sync.end_frame()?;

        if present_stale || acquire_suboptimal || self.resize.resize_pending() {
            self.recreate_swapchain()?;
        }

        Ok(())
    }

    /// Rebuilds the swapchain, framebuffers, and command buffers at the
    /// current window size.
    ///
    /// Deferred silently while minimized; the restore resize triggers the
    /// rebuild instead.
    fn recreate_swapchain(&mut self) -> RenderResult<()> {
        let (width, height) = self.resize.size();
        if width == 0 || height == 0 {
            return Ok(());
        }

        self.swapchain.recreate(
            &self.instance,
            self.surface.handle(),
            self.render_pass.handle(),
            width,
            height,
        )?;

        // The driver may return a different image count for the new chain.
        if self.swapchain.image_count() != self.command_buffers.len() {
            warn!(
                "Swapchain image count changed: {} -> {}",
                self.command_buffers.len(),
                self.swapchain.image_count()
            );
            let handles: Vec<vk::CommandBuffer> =
                self.command_buffers.iter().map(|c| c.handle()).collect();
            self.command_pool.free_command_buffers(&handles);
            self.command_buffers = Self::allocate_command_buffers(
                &self.device,
                &self.command_pool,
                self.swapchain.image_count(),
            )?;
        }

        self.resize.resize_handled();
        Ok(())
    }

    fn create_triangle_pipeline(
        device: Arc<Device>,
        render_pass: &RenderPass,
    ) -> RenderResult<(Pipeline, PipelineLayout)> {
        let vertex_shader = Shader::from_spirv_file(
            device.clone(),
            Path::new(VERTEX_SHADER_PATH),
            ShaderStage::Vertex,
            "main",
        )?;
        let fragment_shader = Shader::from_spirv_file(
            device.clone(),
            Path::new(FRAGMENT_SHADER_PATH),
            ShaderStage::Fragment,
            "main",
        )?;

        let layout = PipelineLayout::new(device.clone(), &[], &[])?;
        let pipeline = Pipeline::create_graphics(
            device,
            &vertex_shader,
            &fragment_shader,
            &layout,
            render_pass.handle(),
        )?;

        // Shader modules may be destroyed once the pipeline exists; they
        // drop here.
        Ok((pipeline, layout))
    }

    fn allocate_command_buffers(
        device: &Arc<Device>,
        pool: &CommandPool,
        count: usize,
    ) -> RenderResult<Vec<CommandBuffer>> {
        let handles = pool.allocate_command_buffers(count as u32)?;
        Ok(handles
            .into_iter()
            .map(|handle| CommandBuffer::from_handle(device.clone(), handle))
            .collect())
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        if let Err(e) = self.device.wait_idle() {
            error!("Failed to wait for device idle during drop: {:?}", e);
        }

        // Command buffers are freed with their pool.
        self.command_buffers.clear();

        unsafe {
            ManuallyDrop::drop(&mut self.frame_sync);
            ManuallyDrop::drop(&mut self.command_pool);
            ManuallyDrop::drop(&mut self.pipeline);
            ManuallyDrop::drop(&mut self.pipeline_layout);
            ManuallyDrop::drop(&mut self.render_pass);
            ManuallyDrop::drop(&mut self.swapchain);
            // Last Arc reference: destroys the logical device.
            ManuallyDrop::drop(&mut self.device);
            ManuallyDrop::drop(&mut self.surface);
            ManuallyDrop::drop(&mut self.instance);
        }

        info!("Renderer destroyed");
    }
}
