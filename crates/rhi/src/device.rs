//! Vulkan logical device and queue management.
//!
//! The [`Device`] wraps the logical device plus the graphics and present
//! queues retrieved from it. The two queues may come from the same family.

use std::sync::Arc;

use ash::vk;
use tracing::{debug, info};

use crate::error::RhiError;
use crate::instance::Instance;
use crate::physical_device::{DEVICE_EXTENSIONS, PhysicalDeviceInfo, QueueFamilyIndices};

/// Vulkan logical device wrapper.
///
/// Shared across the renderer via `Arc`; owning structs hold a reference so
/// their `Drop` impls can destroy handles against the right device.
pub struct Device {
    /// Vulkan logical device handle.
    device: ash::Device,
    /// Physical device handle.
    physical_device: vk::PhysicalDevice,
    /// Graphics queue handle.
    graphics_queue: vk::Queue,
    /// Presentation queue handle (may equal the graphics queue).
    present_queue: vk::Queue,
    /// Queue family indices.
    queue_families: QueueFamilyIndices,
}

impl Device {
    /// Creates a logical device with the swapchain extension enabled and
    /// retrieves one queue per unique queue family.
    ///
    /// # Errors
    ///
    /// Returns an error if device creation fails.
    pub fn new(
        instance: &Instance,
        physical_device_info: &PhysicalDeviceInfo,
    ) -> Result<Arc<Self>, RhiError> {
        let queue_families = &physical_device_info.queue_families;

        let unique_families = queue_families.unique_families();
        let queue_priorities = [1.0f32];

        let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = unique_families
            .iter()
            .map(|&family| {
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(family)
                    .queue_priorities(&queue_priorities)
            })
            .collect();

        debug!(
            "Creating {} queue(s) for families: {:?}",
            queue_create_infos.len(),
            unique_families
        );

        let features = vk::PhysicalDeviceFeatures::default();

        let extension_names: Vec<*const std::ffi::c_char> =
            DEVICE_EXTENSIONS.iter().map(|ext| ext.as_ptr()).collect();

        let create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&extension_names)
            .enabled_features(&features);

        let device = unsafe {
            instance
                .handle()
                .create_device(physical_device_info.device, &create_info, None)?
        };

        info!(
            "Logical device created with {} extension(s)",
            DEVICE_EXTENSIONS.len()
        );

        let graphics_family = queue_families
            .graphics_family
            .ok_or(RhiError::NoSuitableGpu)?;
        let present_family = queue_families
            .present_family
            .ok_or(RhiError::NoSuitableGpu)?;

        let graphics_queue = unsafe { device.get_device_queue(graphics_family, 0) };
        let present_queue = unsafe { device.get_device_queue(present_family, 0) };
        debug!(
            "Queues retrieved (graphics family {}, present family {})",
            graphics_family, present_family
        );

        Ok(Arc::new(Self {
            device,
            physical_device: physical_device_info.device,
            graphics_queue,
            present_queue,
            queue_families: physical_device_info.queue_families,
        }))
    }

    /// Returns the Vulkan logical device handle.
    #[inline]
    pub fn handle(&self) -> &ash::Device {
        &self.device
    }

    /// Returns the physical device handle.
    #[inline]
    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    /// Returns the graphics queue handle.
    #[inline]
    pub fn graphics_queue(&self) -> vk::Queue {
        self.graphics_queue
    }

    /// Returns the presentation queue handle.
    #[inline]
    pub fn present_queue(&self) -> vk::Queue {
        self.present_queue
    }

    /// Returns the queue family indices.
    #[inline]
    pub fn queue_families(&self) -> &QueueFamilyIndices {
        &self.queue_families
    }

    /// Waits for the device to become idle.
    ///
    /// Blocks until all outstanding operations on all queues have completed.
    /// Required before destroying resources that in-flight frames may still
    /// reference.
    ///
    /// # Errors
    ///
    /// Returns an error if the wait fails.
    pub fn wait_idle(&self) -> Result<(), RhiError> {
        unsafe { self.device.device_wait_idle()? };
        Ok(())
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        unsafe {
            if let Err(e) = self.device.device_wait_idle() {
                tracing::error!("Failed to wait for device idle during drop: {:?}", e);
            }
            self.device.destroy_device(None);
        }
        info!("Logical device destroyed");
    }
}

// Safety: ash::Device is Send+Sync and the queue/physical-device handles are
// plain Copy handles.
unsafe impl Send for Device {}
unsafe impl Sync for Device {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_device_extensions() {
        assert_eq!(DEVICE_EXTENSIONS, &[ash::khr::swapchain::NAME]);
    }

    #[test]
    fn device_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Device>();
    }
}
