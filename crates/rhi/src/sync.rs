//! Synchronization primitives.
//!
//! - [`Semaphore`] — GPU-to-GPU ordering between queue operations
//! - [`Fence`] — GPU-to-CPU completion signaling the host can wait on
//!
//! Both are thin RAII wrappers; the frame-pacing protocol built on top of
//! them lives in the renderer crate.

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::device::Device;
use crate::error::{RhiError, RhiResult};

/// Binary semaphore wrapper.
///
/// Created unsignaled. Used to order swapchain acquisition, rendering, and
/// presentation against each other on the GPU timeline.
pub struct Semaphore {
    /// Reference to the logical device.
    device: Arc<Device>,
    /// Vulkan semaphore handle.
    semaphore: vk::Semaphore,
}

impl Semaphore {
    /// Creates a new unsignaled semaphore.
    ///
    /// # Errors
    ///
    /// Returns an error if semaphore creation fails.
    pub fn new(device: Arc<Device>) -> RhiResult<Self> {
        let create_info = vk::SemaphoreCreateInfo::default();

        let semaphore = unsafe { device.handle().create_semaphore(&create_info, None)? };

        Ok(Self { device, semaphore })
    }

    /// Returns the Vulkan semaphore handle.
    #[inline]
    pub fn handle(&self) -> vk::Semaphore {
        self.semaphore
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_semaphore(self.semaphore, None);
        }
    }
}

/// Fence wrapper for host-side waiting on GPU completion.
pub struct Fence {
    /// Reference to the logical device.
    device: Arc<Device>,
    /// Vulkan fence handle.
    fence: vk::Fence,
}

impl Fence {
    /// Creates a new fence.
    ///
    /// `signaled` creates the fence pre-signaled, which a frame-in-flight
    /// fence needs so the very first wait returns immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if fence creation fails.
    pub fn new(device: Arc<Device>, signaled: bool) -> RhiResult<Self> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };

        let create_info = vk::FenceCreateInfo::default().flags(flags);

        let fence = unsafe { device.handle().create_fence(&create_info, None)? };

        debug!(
            "Created fence ({})",
            if signaled { "signaled" } else { "unsignaled" }
        );

        Ok(Self { device, fence })
    }

    /// Returns the Vulkan fence handle.
    #[inline]
    pub fn handle(&self) -> vk::Fence {
        self.fence
    }

    /// Blocks until the fence is signaled or `timeout` (nanoseconds) expires.
    ///
    /// # Errors
    ///
    /// Returns an error if the wait times out or fails.
    pub fn wait(&self, timeout: u64) -> Result<(), RhiError> {
        let fences = [self.fence];
        unsafe {
            self.device
                .handle()
                .wait_for_fences(&fences, true, timeout)?
        };
        Ok(())
    }

    /// Resets the fence to the unsignaled state.
    ///
    /// Must not be called while the fence is pending on a queue submission.
    ///
    /// # Errors
    ///
    /// Returns an error if the reset fails.
    pub fn reset(&self) -> Result<(), RhiError> {
        let fences = [self.fence];
        unsafe { self.device.handle().reset_fences(&fences)? };
        Ok(())
    }

    /// Non-blocking signaled-state check.
    pub fn is_signaled(&self) -> bool {
        let result = unsafe { self.device.handle().get_fence_status(self.fence) };
        matches!(result, Ok(true))
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_fence(self.fence, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn semaphore_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Semaphore>();
    }

    #[test]
    fn fence_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Fence>();
    }
}
