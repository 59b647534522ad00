//! Swapchain management.
//!
//! This module owns the VkSwapchainKHR lifecycle: creation from a fresh
//! surface-capability snapshot, per-frame image acquisition, presentation,
//! and wholesale teardown/recreation when the chain goes stale.
//!
//! The swapchain owns three per-image resource arrays — images, views, and
//! framebuffers — released in reverse dependency order (framebuffers, then
//! views, then the chain handle). Recreation never mutates the chain in
//! place: everything is destroyed and rebuilt against a new snapshot.

use std::sync::Arc;

use ash::vk;
use tracing::{debug, info};

use crate::device::Device;
use crate::error::RhiError;
use crate::instance::Instance;

/// Preferred surface pixel format.
const PREFERRED_FORMAT: vk::Format = vk::Format::B8G8R8A8_UNORM;
/// Preferred surface color space.
const PREFERRED_COLOR_SPACE: vk::ColorSpaceKHR = vk::ColorSpaceKHR::SRGB_NONLINEAR;

/// Swapchain surface support snapshot.
///
/// Recomputed every time the chain is (re)built; never cached across resizes.
#[derive(Debug, Clone)]
pub struct SwapchainSupportDetails {
    /// Surface capabilities (min/max image count, extents, transforms, etc.)
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    /// Supported surface formats (format and color space combinations)
    pub formats: Vec<vk::SurfaceFormatKHR>,
    /// Supported present modes (FIFO, MAILBOX, IMMEDIATE, etc.)
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SwapchainSupportDetails {
    /// Queries swapchain support details for a physical device and surface.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the surface queries fail.
    pub fn query(
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        surface_loader: &ash::khr::surface::Instance,
    ) -> Result<Self, RhiError> {
        let capabilities = unsafe {
            surface_loader.get_physical_device_surface_capabilities(physical_device, surface)?
        };

        let formats = unsafe {
            surface_loader.get_physical_device_surface_formats(physical_device, surface)?
        };

        let present_modes = unsafe {
            surface_loader.get_physical_device_surface_present_modes(physical_device, surface)?
        };

        debug!(
            "Swapchain support: {} formats, {} present modes, image count {}-{}",
            formats.len(),
            present_modes.len(),
            capabilities.min_image_count,
            capabilities.max_image_count,
        );

        Ok(Self {
            capabilities,
            formats,
            present_modes,
        })
    }

    /// True if at least one format and one present mode are available.
    #[inline]
    pub fn is_adequate(&self) -> bool {
        !self.formats.is_empty() && !self.present_modes.is_empty()
    }
}

/// Raw handles produced by one chain build. No Drop; ownership transfers
/// into [`Swapchain`].
struct ChainResources {
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    format: vk::Format,
    extent: vk::Extent2D,
    present_mode: vk::PresentModeKHR,
}

/// Vulkan swapchain wrapper.
///
/// Owns the chain handle and the per-image views and framebuffers. Not
/// thread-safe; driven from the single frame-loop thread only.
pub struct Swapchain {
    /// Reference to the logical device
    device: Arc<Device>,
    /// Swapchain extension loader
    swapchain_loader: ash::khr::swapchain::Device,
    /// Swapchain handle
    swapchain: vk::SwapchainKHR,
    /// Swapchain images (owned by the swapchain handle)
    images: Vec<vk::Image>,
    /// One image view per swapchain image
    image_views: Vec<vk::ImageView>,
    /// One framebuffer per image view, bound to the render pass
    framebuffers: Vec<vk::Framebuffer>,
    /// Swapchain image format
    format: vk::Format,
    /// Swapchain extent (resolution)
    extent: vk::Extent2D,
    /// Present mode
    present_mode: vk::PresentModeKHR,
}

impl Swapchain {
    /// Creates a new swapchain sized against the given window framebuffer
    /// dimensions.
    ///
    /// Framebuffers are not created here — call
    /// [`create_framebuffers`](Self::create_framebuffers) once the render
    /// pass exists.
    ///
    /// # Errors
    ///
    /// Returns an error if surface queries, swapchain creation, or image
    /// view creation fail.
    pub fn new(
        instance: &Instance,
        device: Arc<Device>,
        surface: vk::SurfaceKHR,
        width: u32,
        height: u32,
    ) -> Result<Self, RhiError> {
        let swapchain_loader = ash::khr::swapchain::Device::new(instance.handle(), device.handle());
        let surface_loader = ash::khr::surface::Instance::new(instance.entry(), instance.handle());

        let resources = build_chain(
            &device,
            &swapchain_loader,
            &surface_loader,
            surface,
            width,
            height,
        )?;

        Ok(Self {
            device,
            swapchain_loader,
            swapchain: resources.swapchain,
            images: resources.images,
            image_views: resources.image_views,
            framebuffers: Vec::new(),
            format: resources.format,
            extent: resources.extent,
            present_mode: resources.present_mode,
        })
    }

    /// Creates one framebuffer per image view, bound to `render_pass`.
    ///
    /// Any previous framebuffers are destroyed first, so this is safe to call
    /// again after recreation.
    ///
    /// # Errors
    ///
    /// Returns an error if framebuffer creation fails.
    pub fn create_framebuffers(&mut self, render_pass: vk::RenderPass) -> Result<(), RhiError> {
        self.destroy_framebuffers();

        let mut framebuffers = Vec::with_capacity(self.image_views.len());
        for &view in &self.image_views {
            let attachments = [view];
            let create_info = vk::FramebufferCreateInfo::default()
                .render_pass(render_pass)
                .attachments(&attachments)
                .width(self.extent.width)
                .height(self.extent.height)
                .layers(1);

            let framebuffer =
                unsafe { self.device.handle().create_framebuffer(&create_info, None)? };
            framebuffers.push(framebuffer);
        }

        debug!("Created {} framebuffers", framebuffers.len());
        self.framebuffers = framebuffers;
        Ok(())
    }

    /// Tears the chain down and rebuilds it from a fresh support snapshot.
    ///
    /// Waits for the device to go idle, then releases framebuffers, views,
    /// and the chain handle before allocating their replacements. The render
    /// pass, pipeline, and command pool are untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if teardown synchronization or any creation step
    /// fails.
    pub fn recreate(
        &mut self,
        instance: &Instance,
        surface: vk::SurfaceKHR,
        render_pass: vk::RenderPass,
        width: u32,
        height: u32,
    ) -> Result<(), RhiError> {
        self.device.wait_idle()?;

        info!("Recreating swapchain for new size: {}x{}", width, height);

        // Release everything before building anew (no resource reuse).
        self.destroy_framebuffers();
        self.destroy_image_views();
        unsafe {
            self.swapchain_loader.destroy_swapchain(self.swapchain, None);
        }
        self.swapchain = vk::SwapchainKHR::null();
        self.images.clear();

        let surface_loader = ash::khr::surface::Instance::new(instance.entry(), instance.handle());
        let resources = build_chain(
            &self.device,
            &self.swapchain_loader,
            &surface_loader,
            surface,
            width,
            height,
        )?;

        self.swapchain = resources.swapchain;
        self.images = resources.images;
        self.image_views = resources.image_views;
        self.format = resources.format;
        self.extent = resources.extent;
        self.present_mode = resources.present_mode;

        self.create_framebuffers(render_pass)
    }

    /// Acquires the next swapchain image for rendering.
    ///
    /// `semaphore` is signaled by the presentation engine once the image is
    /// actually ready for writing.
    ///
    /// # Returns
    ///
    /// `(image_index, suboptimal)` on success. `ERROR_OUT_OF_DATE_KHR`
    /// signals that the chain must be recreated before any further use.
    pub fn acquire_next_image(&self, semaphore: vk::Semaphore) -> Result<(u32, bool), vk::Result> {
        unsafe {
            self.swapchain_loader.acquire_next_image(
                self.swapchain,
                u64::MAX,
                semaphore,
                vk::Fence::null(),
            )
        }
    }

    /// Presents the rendered image on the given queue, waiting on
    /// `wait_semaphore` first.
    ///
    /// # Returns
    ///
    /// `true` if the chain is suboptimal and should be recreated.
    /// `ERROR_OUT_OF_DATE_KHR` signals a stale chain.
    pub fn present(
        &self,
        queue: vk::Queue,
        image_index: u32,
        wait_semaphore: vk::Semaphore,
    ) -> Result<bool, vk::Result> {
        let swapchains = [self.swapchain];
        let image_indices = [image_index];
        let wait_semaphores = [wait_semaphore];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        unsafe { self.swapchain_loader.queue_present(queue, &present_info) }
    }

    /// Returns the swapchain image format.
    #[inline]
    pub fn format(&self) -> vk::Format {
        self.format
    }

    /// Returns the swapchain extent (resolution).
    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    /// Returns the present mode.
    #[inline]
    pub fn present_mode(&self) -> vk::PresentModeKHR {
        self.present_mode
    }

    /// Returns the number of swapchain images.
    #[inline]
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Returns the framebuffer for the given image index.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds or framebuffers have not been
    /// created yet.
    #[inline]
    pub fn framebuffer(&self, index: usize) -> vk::Framebuffer {
        self.framebuffers[index]
    }

    fn destroy_framebuffers(&mut self) {
        for &framebuffer in &self.framebuffers {
            unsafe {
                self.device.handle().destroy_framebuffer(framebuffer, None);
            }
        }
        self.framebuffers.clear();
    }

    fn destroy_image_views(&mut self) {
        for &view in &self.image_views {
            unsafe {
                self.device.handle().destroy_image_view(view, None);
            }
        }
        self.image_views.clear();
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        // Reverse dependency order: framebuffers, views, then the chain.
        self.destroy_framebuffers();
        self.destroy_image_views();

        if self.swapchain != vk::SwapchainKHR::null() {
            unsafe {
                self.swapchain_loader.destroy_swapchain(self.swapchain, None);
            }
            info!(
                "Swapchain destroyed (was {}x{}, {} images)",
                self.extent.width,
                self.extent.height,
                self.images.len()
            );
        }
    }
}

/// Builds a chain, its images, and its views from a fresh support snapshot.
fn build_chain(
    device: &Arc<Device>,
    swapchain_loader: &ash::khr::swapchain::Device,
    surface_loader: &ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
    width: u32,
    height: u32,
) -> Result<ChainResources, RhiError> {
    let support = SwapchainSupportDetails::query(device.physical_device(), surface, surface_loader)?;

    if !support.is_adequate() {
        return Err(RhiError::SwapchainError(
            "Inadequate swapchain support (no formats or present modes)".to_string(),
        ));
    }

    let surface_format = choose_surface_format(&support.formats);
    let present_mode = choose_present_mode(&support.present_modes);
    let extent = choose_extent(&support.capabilities, width, height);
    let image_count = determine_image_count(&support.capabilities);

    info!(
        "Creating swapchain: {}x{}, format {:?}, present mode {:?}, {} images",
        extent.width, extent.height, surface_format.format, present_mode, image_count
    );

    let queue_families = device.queue_families();
    let graphics_family = queue_families
        .graphics_family
        .ok_or(RhiError::NoSuitableGpu)?;
    let present_family = queue_families
        .present_family
        .ok_or(RhiError::NoSuitableGpu)?;
    let queue_family_indices = [graphics_family, present_family];

    let (sharing_mode, queue_family_indices_slice) = if graphics_family != present_family {
        debug!(
            "Using CONCURRENT sharing between graphics ({}) and present ({}) families",
            graphics_family, present_family
        );
        (vk::SharingMode::CONCURRENT, queue_family_indices.as_slice())
    } else {
        (vk::SharingMode::EXCLUSIVE, &[][..])
    };

    // Full rebuild each time: old_swapchain stays null.
    let create_info = vk::SwapchainCreateInfoKHR::default()
        .surface(surface)
        .min_image_count(image_count)
        .image_format(surface_format.format)
        .image_color_space(surface_format.color_space)
        .image_extent(extent)
        .image_array_layers(1)
        .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
        .image_sharing_mode(sharing_mode)
        .queue_family_indices(queue_family_indices_slice)
        .pre_transform(support.capabilities.current_transform)
        .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
        .present_mode(present_mode)
        .clipped(true);

    let swapchain = unsafe { swapchain_loader.create_swapchain(&create_info, None)? };

    // The driver may hand back more images than requested.
    let images = unsafe { swapchain_loader.get_swapchain_images(swapchain)? };
    info!("Swapchain created with {} images", images.len());

    let image_views = create_image_views(device, &images, surface_format.format)?;

    Ok(ChainResources {
        swapchain,
        images,
        image_views,
        format: surface_format.format,
        extent,
        present_mode,
    })
}

/// Chooses the surface format.
///
/// Prefers an exact match on B8G8R8A8_UNORM with SRGB_NONLINEAR; otherwise
/// the first reported format. A single UNDEFINED entry is the legacy way for
/// a surface to report "any format works" and also yields the preferred pair.
fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> vk::SurfaceFormatKHR {
    if formats.len() == 1 && formats[0].format == vk::Format::UNDEFINED {
        return vk::SurfaceFormatKHR {
            format: PREFERRED_FORMAT,
            color_space: PREFERRED_COLOR_SPACE,
        };
    }

    formats
        .iter()
        .copied()
        .find(|f| f.format == PREFERRED_FORMAT && f.color_space == PREFERRED_COLOR_SPACE)
        .unwrap_or(formats[0])
}

/// Chooses the present mode.
///
/// MAILBOX (low latency, non-blocking) when offered, then IMMEDIATE, then
/// FIFO, the only mode every implementation must support.
fn choose_present_mode(present_modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    if present_modes.contains(&vk::PresentModeKHR::MAILBOX) {
        return vk::PresentModeKHR::MAILBOX;
    }
    if present_modes.contains(&vk::PresentModeKHR::IMMEDIATE) {
        return vk::PresentModeKHR::IMMEDIATE;
    }
    vk::PresentModeKHR::FIFO
}

/// Chooses the swapchain extent.
///
/// Surfaces that fix their extent report it in `current_extent`; the
/// `u32::MAX` sentinel means the client picks, clamped into the surface's
/// allowed bounds.
fn choose_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    width: u32,
    height: u32,
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        return capabilities.current_extent;
    }

    vk::Extent2D {
        width: width.clamp(
            capabilities.min_image_extent.width,
            capabilities.max_image_extent.width,
        ),
        height: height.clamp(
            capabilities.min_image_extent.height,
            capabilities.max_image_extent.height,
        ),
    }
}

/// One more image than the minimum so acquisition rarely blocks on the
/// driver, clamped to the maximum when the surface reports one (0 = none).
fn determine_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let preferred = capabilities.min_image_count + 1;

    if capabilities.max_image_count > 0 {
        preferred.min(capabilities.max_image_count)
    } else {
        preferred
    }
}

/// Creates a 2-D, identity-swizzle, single-mip view for each image.
fn create_image_views(
    device: &Device,
    images: &[vk::Image],
    format: vk::Format,
) -> Result<Vec<vk::ImageView>, RhiError> {
    let mut image_views = Vec::with_capacity(images.len());

    for &image in images {
        let create_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .components(vk::ComponentMapping {
                r: vk::ComponentSwizzle::IDENTITY,
                g: vk::ComponentSwizzle::IDENTITY,
                b: vk::ComponentSwizzle::IDENTITY,
                a: vk::ComponentSwizzle::IDENTITY,
            })
            .subresource_range(
                vk::ImageSubresourceRange::default()
                    .aspect_mask(vk::ImageAspectFlags::COLOR)
                    .base_mip_level(0)
                    .level_count(1)
                    .base_array_layer(0)
                    .layer_count(1),
            );

        let view = unsafe { device.handle().create_image_view(&create_info, None)? };
        image_views.push(view);
    }

    debug!("Created {} image views", image_views.len());
    Ok(image_views)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surface_format_prefers_bgra_unorm_srgb_nonlinear() {
        let formats = vec![
            vk::SurfaceFormatKHR {
                format: vk::Format::R8G8B8A8_UNORM,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
            vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_UNORM,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
        ];

        let selected = choose_surface_format(&formats);
        assert_eq!(selected.format, vk::Format::B8G8R8A8_UNORM);
        assert_eq!(selected.color_space, vk::ColorSpaceKHR::SRGB_NONLINEAR);
    }

    #[test]
    fn surface_format_falls_back_to_first_reported() {
        let formats = vec![
            vk::SurfaceFormatKHR {
                format: vk::Format::R8G8B8A8_SRGB,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
            vk::SurfaceFormatKHR {
                format: vk::Format::R8G8B8A8_UNORM,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
        ];

        let selected = choose_surface_format(&formats);
        assert_eq!(selected.format, vk::Format::R8G8B8A8_SRGB);
    }

    #[test]
    fn surface_format_single_undefined_entry_means_free_choice() {
        let formats = vec![vk::SurfaceFormatKHR {
            format: vk::Format::UNDEFINED,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        }];

        let selected = choose_surface_format(&formats);
        assert_eq!(selected.format, vk::Format::B8G8R8A8_UNORM);
        assert_eq!(selected.color_space, vk::ColorSpaceKHR::SRGB_NONLINEAR);
    }

    #[test]
    fn present_mode_prefers_mailbox() {
        let modes = vec![vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX];
        assert_eq!(choose_present_mode(&modes), vk::PresentModeKHR::MAILBOX);
    }

    #[test]
    fn present_mode_immediate_before_fifo() {
        let modes = vec![vk::PresentModeKHR::FIFO, vk::PresentModeKHR::IMMEDIATE];
        assert_eq!(choose_present_mode(&modes), vk::PresentModeKHR::IMMEDIATE);
    }

    #[test]
    fn present_mode_fifo_as_baseline() {
        let modes = vec![vk::PresentModeKHR::FIFO];
        assert_eq!(choose_present_mode(&modes), vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn extent_uses_current_when_defined() {
        let capabilities = vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D {
                width: 1920,
                height: 1080,
            },
            min_image_extent: vk::Extent2D { width: 1, height: 1 },
            max_image_extent: vk::Extent2D {
                width: 4096,
                height: 4096,
            },
            ..Default::default()
        };

        let extent = choose_extent(&capabilities, 800, 600);
        assert_eq!(extent.width, 1920);
        assert_eq!(extent.height, 1080);
    }

    #[test]
    fn extent_sentinel_clamps_window_size() {
        let capabilities = vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D {
                width: u32::MAX,
                height: u32::MAX,
            },
            min_image_extent: vk::Extent2D {
                width: 100,
                height: 100,
            },
            max_image_extent: vk::Extent2D {
                width: 2000,
                height: 2000,
            },
            ..Default::default()
        };

        let extent = choose_extent(&capabilities, 3000, 3000);
        assert_eq!(extent.width, 2000);
        assert_eq!(extent.height, 2000);

        let extent = choose_extent(&capabilities, 50, 50);
        assert_eq!(extent.width, 100);
        assert_eq!(extent.height, 100);

        let extent = choose_extent(&capabilities, 800, 600);
        assert_eq!(extent.width, 800);
        assert_eq!(extent.height, 600);
    }

    #[test]
    fn image_count_min_plus_one_clamped_to_max() {
        let capabilities = vk::SurfaceCapabilitiesKHR {
            min_image_count: 2,
            max_image_count: 3,
            ..Default::default()
        };
        assert_eq!(determine_image_count(&capabilities), 3);

        let tight = vk::SurfaceCapabilitiesKHR {
            min_image_count: 2,
            max_image_count: 2,
            ..Default::default()
        };
        assert_eq!(determine_image_count(&tight), 2);
    }

    #[test]
    fn image_count_unbounded_when_max_is_zero() {
        let capabilities = vk::SurfaceCapabilitiesKHR {
            min_image_count: 3,
            max_image_count: 0,
            ..Default::default()
        };
        assert_eq!(determine_image_count(&capabilities), 4);
    }

    #[test]
    fn support_details_adequacy() {
        let adequate = SwapchainSupportDetails {
            capabilities: vk::SurfaceCapabilitiesKHR::default(),
            formats: vec![vk::SurfaceFormatKHR::default()],
            present_modes: vec![vk::PresentModeKHR::FIFO],
        };
        assert!(adequate.is_adequate());

        let no_formats = SwapchainSupportDetails {
            capabilities: vk::SurfaceCapabilitiesKHR::default(),
            formats: vec![],
            present_modes: vec![vk::PresentModeKHR::FIFO],
        };
        assert!(!no_formats.is_adequate());

        let no_modes = SwapchainSupportDetails {
            capabilities: vk::SurfaceCapabilitiesKHR::default(),
            formats: vec![vk::SurfaceFormatKHR::default()],
            present_modes: vec![],
        };
        assert!(!no_modes.is_adequate());
    }
}
