//! Window management using winit.
//!
//! This module provides window creation and Vulkan surface creation.

use std::sync::Arc;

use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use winit::dpi::PhysicalSize;
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window as WinitWindow, WindowAttributes};

use tri_core::{Error, Result};

/// RAII wrapper for a Vulkan surface.
///
/// Owns a `vk::SurfaceKHR` handle together with the surface extension loader
/// needed for capability queries and cleanup. The surface is destroyed when
/// this struct is dropped; the caller must ensure the Vulkan instance
/// outlives it.
pub struct Surface {
    handle: vk::SurfaceKHR,
    loader: ash::khr::surface::Instance,
}

impl Surface {
    /// Get the raw Vulkan surface handle.
    ///
    /// Valid only as long as this `Surface` instance exists.
    #[inline]
    pub fn handle(&self) -> vk::SurfaceKHR {
        self.handle
    }

    /// Get the surface extension loader, used for querying surface
    /// capabilities, formats, and present modes.
    #[inline]
    pub fn loader(&self) -> &ash::khr::surface::Instance {
        &self.loader
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        // SAFETY: The handle was created by ash_window::create_surface and the
        // loader comes from the same instance; this is the only destroy site.
        unsafe {
            self.loader.destroy_surface(self.handle, None);
        }
        tracing::debug!("Vulkan surface destroyed");
    }
}

/// A window wrapper that provides access to the underlying winit window
/// and raw handles for Vulkan surface creation.
pub struct Window {
    window: Arc<WinitWindow>,
}

impl Window {
    /// Create a new resizable window with the given dimensions and title.
    pub fn new(event_loop: &ActiveEventLoop, width: u32, height: u32, title: &str) -> Result<Self> {
        let attrs = WindowAttributes::default()
            .with_title(title)
            .with_inner_size(PhysicalSize::new(width, height))
            .with_resizable(true);

        let window = event_loop
            .create_window(attrs)
            .map_err(|e| Error::Window(e.to_string()))?;

        tracing::info!("Window created: {}x{}", width, height);

        Ok(Self {
            window: Arc::new(window),
        })
    }

    /// Get a reference to the underlying winit window.
    pub fn inner(&self) -> &WinitWindow {
        &self.window
    }

    /// Current framebuffer size in pixels. Reports `0x0` while minimized.
    pub fn framebuffer_size(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width, size.height)
    }

    /// Request a redraw of the window.
    pub fn request_redraw(&self) {
        self.window.request_redraw();
    }

    /// Get the display handle for Vulkan surface creation.
    pub fn display_handle(
        &self,
    ) -> std::result::Result<raw_window_handle::DisplayHandle<'_>, raw_window_handle::HandleError>
    {
        self.window.display_handle()
    }

    /// Create a Vulkan surface for this window.
    ///
    /// Returns a RAII [`Surface`] that destroys the surface on drop.
    ///
    /// # Errors
    /// Returns an error if the window/display handles are unavailable or if
    /// Vulkan surface creation fails.
    pub fn create_surface(&self, entry: &ash::Entry, instance: &ash::Instance) -> Result<Surface> {
        let display_handle = self
            .window
            .display_handle()
            .map_err(|e| Error::Window(format!("Failed to get display handle: {}", e)))?;

        let window_handle = self
            .window
            .window_handle()
            .map_err(|e| Error::Window(format!("Failed to get window handle: {}", e)))?;

        // SAFETY: entry and instance are valid references provided by the
        // caller, and the handles come from a live winit window. The surface
        // is destroyed in Surface::drop.
        let handle = unsafe {
            ash_window::create_surface(
                entry,
                instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| Error::Vulkan(format!("Failed to create Vulkan surface: {}", e)))?
        };

        let loader = ash::khr::surface::Instance::new(entry, instance);

        tracing::info!("Vulkan surface created");

        Ok(Surface { handle, loader })
    }
}

/// Get the Vulkan instance extensions required for surface creation on the
/// current platform.
///
/// The returned pointers reference static strings owned by the Vulkan loader
/// and remain valid for the lifetime of the program.
///
/// # Errors
/// Returns an error if the required extensions cannot be enumerated.
pub fn required_extensions(
    display_handle: raw_window_handle::RawDisplayHandle,
) -> Result<Vec<*const std::ffi::c_char>> {
    let extensions = ash_window::enumerate_required_extensions(display_handle)
        .map_err(|e| Error::Vulkan(format!("Failed to enumerate required extensions: {}", e)))?;

    tracing::debug!(
        "Required surface extensions: {:?}",
        extensions
            .iter()
            // SAFETY: ash_window guarantees valid, null-terminated C strings.
            .map(|&ext| unsafe { std::ffi::CStr::from_ptr(ext) })
            .collect::<Vec<_>>()
    );

    Ok(extensions.to_vec())
}
