//! Frame-in-flight synchronization protocol.
//!
//! A fixed ring of [`FrameSlot`]s bounds how far the CPU can run ahead of
//! the GPU. Each slot owns one image-available semaphore, one
//! render-finished semaphore, and one in-flight fence, and tracks where in
//! the per-frame protocol it currently is:
//!
//! ```text
//! Idle -> Acquiring -> Recording -> Submitted -> Presenting -> Idle
//!             \______________________________________________/
//!              (failed acquire returns the slot to Idle)
//! ```
//!
//! The fence is reset only after a successful image acquisition. If the
//! acquire fails (stale swapchain), the fence stays signaled so the next
//! attempt on this slot does not deadlock on a wait that nothing will
//! satisfy.

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use tri_rhi::device::Device;
use tri_rhi::sync::{Fence, Semaphore};

use crate::MAX_FRAMES_IN_FLIGHT;
use crate::error::{RenderError, RenderResult};

/// Where a frame slot is in the per-frame protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotState {
    /// Slot is free; its fence is signaled (or will be by prior GPU work).
    Idle,
    /// Fence wait passed; an image acquisition is in progress.
    Acquiring,
    /// Image acquired and fence reset; commands are being recorded.
    Recording,
    /// Work submitted to the graphics queue.
    Submitted,
    /// Presentation has been requested on the present queue.
    Presenting,
}

impl SlotState {
    /// Whether the protocol permits moving from `self` to `next`.
    pub fn can_advance_to(self, next: SlotState) -> bool {
        matches!(
            (self, next),
            (SlotState::Idle, SlotState::Acquiring)
                | (SlotState::Acquiring, SlotState::Recording)
                | (SlotState::Acquiring, SlotState::Idle)
                | (SlotState::Recording, SlotState::Submitted)
                | (SlotState::Submitted, SlotState::Presenting)
                | (SlotState::Presenting, SlotState::Idle)
        )
    }
}

/// Synchronization objects for one in-flight frame.
pub struct FrameSlot {
    /// Signaled by the presentation engine when the acquired image is ready.
    image_available: Semaphore,
    /// Signaled by the graphics queue when rendering completes.
    render_finished: Semaphore,
    /// Signaled by the graphics queue when this slot's work retires.
    in_flight: Fence,
    /// Protocol position.
    state: SlotState,
}

impl FrameSlot {
    /// Creates a slot with its fence pre-signaled so the first admission
    /// wait returns immediately.
    fn new(device: Arc<Device>) -> RenderResult<Self> {
        let image_available = Semaphore::new(device.clone())?;
        let render_finished = Semaphore::new(device.clone())?;
        let in_flight = Fence::new(device, true)?;

        Ok(Self {
            image_available,
            render_finished,
            in_flight,
            state: SlotState::Idle,
        })
    }

    /// Returns the slot's current protocol state.
    #[inline]
    pub fn state(&self) -> SlotState {
        self.state
    }

    /// Returns the image-available semaphore handle.
    #[inline]
    pub fn image_available_handle(&self) -> vk::Semaphore {
        self.image_available.handle()
    }

    /// Returns the render-finished semaphore handle.
    #[inline]
    pub fn render_finished_handle(&self) -> vk::Semaphore {
        self.render_finished.handle()
    }

    /// Returns the in-flight fence handle.
    #[inline]
    pub fn in_flight_handle(&self) -> vk::Fence {
        self.in_flight.handle()
    }

    fn advance_to(&mut self, next: SlotState) -> RenderResult<()> {
        if !self.state.can_advance_to(next) {
            return Err(RenderError::InvalidSlotTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }
}

/// Ring of frame slots driving the frames-in-flight protocol.
///
/// At most [`MAX_FRAMES_IN_FLIGHT`] frames are ever between admission and
/// fence retirement; the admission wait in [`begin_frame`] enforces the
/// bound.
///
/// [`begin_frame`]: FrameSynchronizer::begin_frame
pub struct FrameSynchronizer {
    /// Reference to the logical device.
    device: Arc<Device>,
    /// The slot ring.
    slots: Vec<FrameSlot>,
    /// Index of the slot serving the frame being prepared.
    current: usize,
}

impl FrameSynchronizer {
    /// Creates the slot ring.
    ///
    /// # Errors
    ///
    /// Returns an error if any synchronization object creation fails.
    pub fn new(device: Arc<Device>) -> RenderResult<Self> {
        let slots = (0..MAX_FRAMES_IN_FLIGHT)
            .map(|_| FrameSlot::new(device.clone()))
            .collect::<RenderResult<Vec<_>>>()?;

        debug!("Created {} frame slots", slots.len());

        Ok(Self {
            device,
            slots,
            current: 0,
        })
    }

    /// Returns the index of the current slot.
    #[inline]
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Returns the current slot.
    #[inline]
    pub fn current_slot(&self) -> &FrameSlot {
        &self.slots[self.current]
    }

    /// Admission: blocks until the current slot's previous frame has
    /// retired on the GPU.
    ///
    /// # Errors
    ///
    /// Returns an error if the fence wait fails or the slot is not idle.
    pub fn begin_frame(&mut self) -> RenderResult<()> {
        let slot = &mut self.slots[self.current];
        slot.advance_to(SlotState::Acquiring)?;
        slot.in_flight.wait(u64::MAX)?;
        Ok(())
    }

    /// Marks a successful image acquisition and resets the fence.
    ///
    /// The reset happens here, not during admission, so a failed acquire
    /// leaves the fence signaled.
    ///
    /// # Errors
    ///
    /// Returns an error if the fence reset fails or the slot was not
    /// acquiring.
    pub fn image_acquired(&mut self) -> RenderResult<()> {
        let slot = &mut self.slots[self.current];
        slot.advance_to(SlotState::Recording)?;
        slot.in_flight.reset()?;
        Ok(())
    }

    /// Returns the slot to idle after a failed acquisition.
    ///
    /// The fence stays signaled, so the slot's next admission wait returns
    /// immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot was not acquiring.
    pub fn abort_acquire(&mut self) -> RenderResult<()> {
        self.slots[self.current].advance_to(SlotState::Idle)
    }

    /// Submits recorded work to the graphics queue.
    ///
    /// The submission waits on the image-available semaphore at the
    /// color-attachment-output stage (vertex work may start before the image
    /// is ready), signals the render-finished semaphore, and signals the
    /// slot's fence on retirement.
    ///
    /// # Errors
    ///
    /// Returns an error if the submission fails or the slot was not
    /// recording.
    pub fn submit(
        &mut self,
        queue: vk::Queue,
        command_buffer: vk::CommandBuffer,
    ) -> RenderResult<()> {
        let slot = &mut self.slots[self.current];
        slot.advance_to(SlotState::Submitted)?;

        let wait_semaphores = [slot.image_available.handle()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [command_buffer];
        let signal_semaphores = [slot.render_finished.handle()];

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        unsafe {
            self.device
                .handle()
                .queue_submit(queue, &[submit_info], slot.in_flight.handle())
                .map_err(RenderError::Vulkan)?;
        }

        Ok(())
    }

    /// Marks that presentation has been requested for this slot.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot was not submitted.
    pub fn presenting(&mut self) -> RenderResult<()> {
        self.slots[self.current].advance_to(SlotState::Presenting)
    }

    /// Retires the slot and advances the ring to the next one.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot was not presenting.
    pub fn end_frame(&mut self) -> RenderResult<()> {
        self.slots[self.current].advance_to(SlotState::Idle)?;
        self.current = next_slot(self.current);
        Ok(())
    }
}

/// Next slot index in the ring.
#[inline]
fn next_slot(current: usize) -> usize {
    (current + 1) % MAX_FRAMES_IN_FLIGHT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nominal_frame_transitions_are_legal() {
        assert!(SlotState::Idle.can_advance_to(SlotState::Acquiring));
        assert!(SlotState::Acquiring.can_advance_to(SlotState::Recording));
        assert!(SlotState::Recording.can_advance_to(SlotState::Submitted));
        assert!(SlotState::Submitted.can_advance_to(SlotState::Presenting));
        assert!(SlotState::Presenting.can_advance_to(SlotState::Idle));
    }

    #[test]
    fn failed_acquire_returns_to_idle() {
        assert!(SlotState::Acquiring.can_advance_to(SlotState::Idle));
    }

    #[test]
    fn protocol_rejects_skipped_stages() {
        assert!(!SlotState::Idle.can_advance_to(SlotState::Recording));
        assert!(!SlotState::Idle.can_advance_to(SlotState::Submitted));
        assert!(!SlotState::Acquiring.can_advance_to(SlotState::Submitted));
        assert!(!SlotState::Recording.can_advance_to(SlotState::Presenting));
        assert!(!SlotState::Recording.can_advance_to(SlotState::Idle));
        assert!(!SlotState::Submitted.can_advance_to(SlotState::Idle));
    }

    #[test]
    fn protocol_rejects_backward_motion() {
        assert!(!SlotState::Recording.can_advance_to(SlotState::Acquiring));
        assert!(!SlotState::Submitted.can_advance_to(SlotState::Recording));
        assert!(!SlotState::Presenting.can_advance_to(SlotState::Submitted));
        assert!(!SlotState::Idle.can_advance_to(SlotState::Idle));
    }

    #[test]
    fn slot_ring_wraps_at_frame_limit() {
        let mut index = 0;
        for _ in 0..MAX_FRAMES_IN_FLIGHT {
            index = next_slot(index);
        }
        assert_eq!(index, 0);

        assert_eq!(next_slot(MAX_FRAMES_IN_FLIGHT - 1), 0);
    }
}
