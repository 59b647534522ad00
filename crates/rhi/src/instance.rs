//! Vulkan instance management.
//!
//! This module handles VkInstance creation, the validation layer, and the
//! debug messenger that routes validation output into `tracing`.

use std::ffi::CStr;

use ash::{Entry, vk};
use tracing::{error, info, warn};

use crate::error::RhiError;

/// The Khronos validation layer name.
const VALIDATION_LAYER_NAME: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Vulkan instance wrapper with optional validation layer support.
///
/// Whether validation is requested is an injected runtime flag, not a
/// compile-time switch. When the Khronos layer is unavailable the instance is
/// still created and a warning is logged.
pub struct Instance {
    /// Vulkan entry point loader
    entry: Entry,
    /// Vulkan instance handle
    instance: ash::Instance,
    /// Debug utils extension loader (only present when validation is enabled)
    debug_utils: Option<ash::ext::debug_utils::Instance>,
    /// Debug messenger handle (only present when validation is enabled)
    debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
}

impl Instance {
    /// Creates a new Vulkan instance.
    ///
    /// # Arguments
    ///
    /// * `enable_validation` - request the validation layer and debug messenger
    /// * `surface_extensions` - instance extensions required for surface
    ///   creation on the current platform (from the windowing layer)
    ///
    /// # Errors
    ///
    /// Returns an error if the Vulkan library cannot be loaded or instance
    /// creation fails.
    pub fn new(
        enable_validation: bool,
        surface_extensions: &[*const std::ffi::c_char],
    ) -> Result<Self, RhiError> {
        let entry = unsafe { Entry::load()? };

        let validation_available =
            enable_validation && Self::is_validation_layer_available(&entry)?;
        if enable_validation && !validation_available {
            warn!("Validation layer requested but not available, proceeding without it");
        }

        let app_info = vk::ApplicationInfo::default()
            .application_name(c"Vulkan Triangle")
            .application_version(vk::make_api_version(0, 1, 0, 0))
            .engine_name(c"No Engine")
            .engine_version(vk::make_api_version(0, 1, 0, 0))
            .api_version(vk::API_VERSION_1_0);

        let mut extensions = surface_extensions.to_vec();
        if validation_available {
            extensions.push(ash::ext::debug_utils::NAME.as_ptr());
        }

        let layers = if validation_available {
            vec![VALIDATION_LAYER_NAME.as_ptr()]
        } else {
            vec![]
        };

        let create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_extension_names(&extensions)
            .enabled_layer_names(&layers);

        let instance = unsafe {
            entry
                .create_instance(&create_info, None)
                .map_err(RhiError::from)?
        };

        info!("Vulkan instance created");

        let (debug_utils, debug_messenger) = if validation_available {
            let debug_utils = ash::ext::debug_utils::Instance::new(&entry, &instance);
            let messenger = Self::setup_debug_messenger(&debug_utils)?;
            info!("Validation layer and debug messenger enabled");
            (Some(debug_utils), Some(messenger))
        } else {
            (None, None)
        };

        Ok(Self {
            entry,
            instance,
            debug_utils,
            debug_messenger,
        })
    }

    /// Returns the Vulkan instance handle.
    #[inline]
    pub fn handle(&self) -> &ash::Instance {
        &self.instance
    }

    /// Returns the Vulkan entry point loader.
    #[inline]
    pub fn entry(&self) -> &Entry {
        &self.entry
    }

    /// Returns whether validation layers are active.
    #[inline]
    pub fn has_validation(&self) -> bool {
        self.debug_messenger.is_some()
    }

    /// Checks if the Khronos validation layer is available.
    fn is_validation_layer_available(entry: &Entry) -> Result<bool, RhiError> {
        let available_layers = unsafe { entry.enumerate_instance_layer_properties()? };

        let validation_layer_name = VALIDATION_LAYER_NAME.to_bytes_with_nul();

        let found = available_layers.iter().any(|layer| {
            let layer_name = unsafe { CStr::from_ptr(layer.layer_name.as_ptr()) };
            layer_name.to_bytes_with_nul() == validation_layer_name
        });

        Ok(found)
    }

    /// Sets up the debug messenger for validation layer callbacks.
    fn setup_debug_messenger(
        debug_utils: &ash::ext::debug_utils::Instance,
    ) -> Result<vk::DebugUtilsMessengerEXT, RhiError> {
        let create_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(debug_callback));

        let messenger = unsafe {
            debug_utils
                .create_debug_utils_messenger(&create_info, None)
                .map_err(RhiError::from)?
        };

        Ok(messenger)
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        unsafe {
            // Destroy debug messenger before instance
            if let (Some(debug_utils), Some(messenger)) = (&self.debug_utils, self.debug_messenger)
            {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }
            self.instance.destroy_instance(None);
        }
        info!("Vulkan instance destroyed");
    }
}

/// Debug callback invoked by the validation layer.
///
/// # Safety
///
/// Called from the Vulkan driver; must follow the Vulkan specification for
/// debug callbacks.
unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() {
        return vk::FALSE;
    }

    let callback_data = unsafe { &*p_callback_data };
    let message = if callback_data.p_message.is_null() {
        std::borrow::Cow::Borrowed("(no message)")
    } else {
        unsafe { CStr::from_ptr(callback_data.p_message).to_string_lossy() }
    };

    let type_str = match message_type {
        vk::DebugUtilsMessageTypeFlagsEXT::GENERAL => "General",
        vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION => "Validation",
        vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE => "Performance",
        _ => "Unknown",
    };

    match message_severity {
        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR => {
            error!("[Vulkan {}] {}", type_str, message);
        }
        vk::DebugUtilsMessageSeverityFlagsEXT::WARNING => {
            warn!("[Vulkan {}] {}", type_str, message);
        }
        _ => {
            info!("[Vulkan {}] {}", type_str, message);
        }
    }

    // VK_FALSE: do not abort the triggering call
    vk::FALSE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_creation_without_validation() {
        // Requires a Vulkan loader on the machine; skip gracefully otherwise.
        match Instance::new(false, &[ash::khr::surface::NAME.as_ptr()]) {
            Ok(instance) => assert!(!instance.has_validation()),
            Err(e) => eprintln!("Skipping test, Vulkan unavailable: {e}"),
        }
    }
}
