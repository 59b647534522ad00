//! Window resize and minimize tracking.
//!
//! The event loop reports size changes asynchronously; the frame loop
//! consumes them at well-defined points. [`ResizeCoordinator`] carries two
//! pieces of state across that boundary: a pending-resize flag checked after
//! presentation, and a deferral latch that skips frames entirely while the
//! framebuffer is zero-sized (minimized), since a zero-extent swapchain
//! cannot be built.

use tracing::debug;

/// Tracks pending resizes and minimize deferral for the frame loop.
#[derive(Debug, Default)]
pub struct ResizeCoordinator {
    /// Set by resize events, cleared when the swapchain is rebuilt.
    resize_pending: bool,
    /// Last size reported by the window, in physical pixels.
    width: u32,
    height: u32,
}

impl ResizeCoordinator {
    /// Creates a coordinator with the initial framebuffer size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            resize_pending: false,
            width,
            height,
        }
    }

    /// Records a size change from the event loop.
    ///
    /// A transition to zero size (minimize) only latches deferral; it does
    /// not request a rebuild, since there is nothing to rebuild against.
    pub fn note_resized(&mut self, width: u32, height: u32) {
        if width == self.width && height == self.height {
            return;
        }

        debug!(
            "Framebuffer size change: {}x{} -> {}x{}",
            self.width, self.height, width, height
        );

        self.width = width;
        self.height = height;

        if !self.is_minimized() {
            self.resize_pending = true;
        }
    }

    /// True while the framebuffer has zero area and frames must be skipped.
    #[inline]
    pub fn is_minimized(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// True when the swapchain should be rebuilt before or after the next
    /// frame.
    #[inline]
    pub fn resize_pending(&self) -> bool {
        self.resize_pending
    }

    /// Marks that the swapchain has been rebuilt at the current size.
    pub fn resize_handled(&mut self) {
        self.resize_pending = false;
    }

    /// Forces a rebuild request, used when acquire/present report a stale
    /// chain without an accompanying resize event.
    pub fn request_rebuild(&mut self) {
        if !self.is_minimized() {
            self.resize_pending = true;
        }
    }

    /// Current framebuffer size.
    #[inline]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_sets_pending_flag() {
        let mut coordinator = ResizeCoordinator::new(800, 600);
        assert!(!coordinator.resize_pending());

        coordinator.note_resized(1024, 768);
        assert!(coordinator.resize_pending());
        assert_eq!(coordinator.size(), (1024, 768));

        coordinator.resize_handled();
        assert!(!coordinator.resize_pending());
    }

    #[test]
    fn unchanged_size_is_ignored() {
        let mut coordinator = ResizeCoordinator::new(800, 600);
        coordinator.note_resized(800, 600);
        assert!(!coordinator.resize_pending());
    }

    #[test]
    fn minimize_defers_without_requesting_rebuild() {
        let mut coordinator = ResizeCoordinator::new(800, 600);

        coordinator.note_resized(0, 0);
        assert!(coordinator.is_minimized());
        assert!(!coordinator.resize_pending());
    }

    #[test]
    fn restore_after_minimize_requests_rebuild() {
        let mut coordinator = ResizeCoordinator::new(800, 600);

        coordinator.note_resized(0, 0);
        coordinator.note_resized(800, 600);

        assert!(!coordinator.is_minimized());
        assert!(coordinator.resize_pending());
    }

    #[test]
    fn stale_chain_rebuild_request_respects_minimize() {
        let mut coordinator = ResizeCoordinator::new(800, 600);

        coordinator.request_rebuild();
        assert!(coordinator.resize_pending());

        coordinator.resize_handled();
        coordinator.note_resized(0, 0);
        coordinator.request_rebuild();
        assert!(!coordinator.resize_pending());
    }

    #[test]
    fn zero_width_or_height_counts_as_minimized() {
        let mut coordinator = ResizeCoordinator::new(800, 600);
        coordinator.note_resized(0, 600);
        assert!(coordinator.is_minimized());

        coordinator.note_resized(800, 0);
        assert!(coordinator.is_minimized());
    }
}
