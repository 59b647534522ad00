//! Physical device (GPU) selection.
//!
//! Enumerates the available GPUs and picks the first one that can drive the
//! presentation pipeline:
//! 1. A graphics-capable queue family exists
//! 2. A queue family can present to the target surface
//! 3. The required device extensions (swapchain) are supported
//! 4. The surface reports at least one format and one present mode
//!
//! Selection is first-match in enumeration order; there is no scoring and no
//! fallback beyond that. Nothing is created here — the selector only reads
//! device properties.

use std::ffi::CStr;

use ash::vk;
use tracing::{debug, info};

use crate::error::RhiError;
use crate::swapchain::SwapchainSupportDetails;

/// Required device extensions: presentation/swapchain support only.
pub const DEVICE_EXTENSIONS: &[&CStr] = &[ash::khr::swapchain::NAME];

/// Queue family indices for graphics submission and surface presentation.
///
/// The two indices may coincide or differ; both must be known for a device
/// to be usable.
#[derive(Clone, Copy, Debug, Default)]
pub struct QueueFamilyIndices {
    /// Index of the queue family that supports graphics operations.
    pub graphics_family: Option<u32>,
    /// Index of the queue family that supports presentation to the surface.
    pub present_family: Option<u32>,
}

impl QueueFamilyIndices {
    /// Checks if both required queue families are known.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.graphics_family.is_some() && self.present_family.is_some()
    }

    /// Returns the unique queue family indices.
    ///
    /// Useful when creating the logical device to avoid requesting duplicate
    /// queues for the same family.
    pub fn unique_families(&self) -> Vec<u32> {
        let mut families = Vec::with_capacity(2);

        if let Some(graphics) = self.graphics_family {
            families.push(graphics);
        }
        if let Some(present) = self.present_family
            && !families.contains(&present)
        {
            families.push(present);
        }

        families
    }
}

/// Information about a selected physical device.
#[derive(Clone)]
pub struct PhysicalDeviceInfo {
    /// Vulkan physical device handle.
    pub device: vk::PhysicalDevice,
    /// Device properties (name, limits, API version, etc.).
    pub properties: vk::PhysicalDeviceProperties,
    /// Queue family indices for graphics and presentation.
    pub queue_families: QueueFamilyIndices,
}

impl PhysicalDeviceInfo {
    /// Returns the device name as a string.
    pub fn device_name(&self) -> &str {
        unsafe {
            CStr::from_ptr(self.properties.device_name.as_ptr())
                .to_str()
                .unwrap_or("Unknown Device")
        }
    }
}

impl std::fmt::Debug for PhysicalDeviceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhysicalDeviceInfo")
            .field("name", &self.device_name())
            .field("queue_families", &self.queue_families)
            .finish()
    }
}

/// Selects the first physical device eligible for rendering and presentation.
///
/// # Errors
///
/// Returns [`RhiError::NoSuitableGpu`] if no device satisfies all four
/// eligibility conditions.
pub fn select_physical_device(
    instance: &ash::Instance,
    surface: vk::SurfaceKHR,
    surface_loader: &ash::khr::surface::Instance,
) -> Result<PhysicalDeviceInfo, RhiError> {
    let devices = unsafe { instance.enumerate_physical_devices()? };

    if devices.is_empty() {
        return Err(RhiError::NoSuitableGpu);
    }

    info!("Found {} GPU(s)", devices.len());

    for device in devices {
        if let Some(selected) = check_device_suitability(instance, device, surface, surface_loader)
        {
            info!(
                "Selected GPU: '{}' (graphics family {}, present family {})",
                selected.device_name(),
                selected.queue_families.graphics_family.unwrap_or(u32::MAX),
                selected.queue_families.present_family.unwrap_or(u32::MAX),
            );
            return Ok(selected);
        }
    }

    Err(RhiError::NoSuitableGpu)
}

/// Checks whether a physical device satisfies all eligibility conditions.
fn check_device_suitability(
    instance: &ash::Instance,
    device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
    surface_loader: &ash::khr::surface::Instance,
) -> Option<PhysicalDeviceInfo> {
    let properties = unsafe { instance.get_physical_device_properties(device) };

    let device_name = unsafe {
        CStr::from_ptr(properties.device_name.as_ptr())
            .to_str()
            .unwrap_or("Unknown")
    };

    let queue_families = find_queue_families(instance, device, surface, surface_loader);
    if !queue_families.is_complete() {
        debug!(
            "GPU '{}' skipped: missing queue families (graphics={}, present={})",
            device_name,
            queue_families.graphics_family.is_some(),
            queue_families.present_family.is_some()
        );
        return None;
    }

    let available = unsafe {
        instance
            .enumerate_device_extension_properties(device)
            .unwrap_or_default()
    };
    if !supports_required_extensions(&available, DEVICE_EXTENSIONS) {
        debug!("GPU '{}' skipped: missing swapchain extension", device_name);
        return None;
    }

    // Extension support alone is not enough; the surface must report at
    // least one format and one present mode.
    let support = SwapchainSupportDetails::query(device, surface, surface_loader).ok()?;
    if !support.is_adequate() {
        debug!(
            "GPU '{}' skipped: inadequate swapchain support",
            device_name
        );
        return None;
    }

    Some(PhysicalDeviceInfo {
        device,
        properties,
        queue_families,
    })
}

/// Finds queue family indices for graphics and presentation.
fn find_queue_families(
    instance: &ash::Instance,
    device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
    surface_loader: &ash::khr::surface::Instance,
) -> QueueFamilyIndices {
    let queue_families = unsafe { instance.get_physical_device_queue_family_properties(device) };

    let mut indices = QueueFamilyIndices::default();

    for (i, family) in queue_families.iter().enumerate() {
        let i = i as u32;

        if family.queue_count == 0 {
            continue;
        }

        if indices.graphics_family.is_none()
            && family.queue_flags.contains(vk::QueueFlags::GRAPHICS)
        {
            indices.graphics_family = Some(i);
        }

        if indices.present_family.is_none() {
            let present_support = unsafe {
                surface_loader
                    .get_physical_device_surface_support(device, i, surface)
                    .unwrap_or(false)
            };
            if present_support {
                indices.present_family = Some(i);
            }
        }

        if indices.is_complete() {
            break;
        }
    }

    indices
}

/// Checks that every required extension name appears in the available set.
fn supports_required_extensions(
    available: &[vk::ExtensionProperties],
    required: &[&CStr],
) -> bool {
    required.iter().all(|&needed| {
        available.iter().any(|ext| {
            let name = unsafe { CStr::from_ptr(ext.extension_name.as_ptr()) };
            name == needed
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extension_properties(name: &CStr) -> vk::ExtensionProperties {
        let mut props = vk::ExtensionProperties::default();
        for (i, &byte) in name.to_bytes_with_nul().iter().enumerate() {
            props.extension_name[i] = byte as std::ffi::c_char;
        }
        props
    }

    #[test]
    fn indices_default_incomplete() {
        let indices = QueueFamilyIndices::default();
        assert!(indices.graphics_family.is_none());
        assert!(indices.present_family.is_none());
        assert!(!indices.is_complete());
    }

    #[test]
    fn indices_require_both_families() {
        let graphics_only = QueueFamilyIndices {
            graphics_family: Some(0),
            present_family: None,
        };
        assert!(!graphics_only.is_complete());

        let present_only = QueueFamilyIndices {
            graphics_family: None,
            present_family: Some(0),
        };
        assert!(!present_only.is_complete());

        let both = QueueFamilyIndices {
            graphics_family: Some(0),
            present_family: Some(1),
        };
        assert!(both.is_complete());
    }

    #[test]
    fn unique_families_deduplicates_shared_index() {
        let shared = QueueFamilyIndices {
            graphics_family: Some(0),
            present_family: Some(0),
        };
        assert_eq!(shared.unique_families(), vec![0]);

        let distinct = QueueFamilyIndices {
            graphics_family: Some(0),
            present_family: Some(2),
        };
        assert_eq!(distinct.unique_families(), vec![0, 2]);
    }

    #[test]
    fn required_extensions_present() {
        let available = vec![
            extension_properties(c"VK_KHR_swapchain"),
            extension_properties(c"VK_EXT_debug_marker"),
        ];
        assert!(supports_required_extensions(&available, DEVICE_EXTENSIONS));
    }

    #[test]
    fn required_extensions_missing() {
        let available = vec![extension_properties(c"VK_EXT_debug_marker")];
        assert!(!supports_required_extensions(&available, DEVICE_EXTENSIONS));
    }
}
