// SPDX-License-Identifier: GPL-3.0-only

//! Latest-frame slot fed by the active stream
//!
//! The [`VideoElement`] always holds the most recent frame (or nothing). It
//! is backed by a `watch` channel so consumers can either sample it on their
//! own schedule or await the next frame.
//!
//! Every stream publishes through a [`FrameSink`] tagged with the generation
//! it was attached at. Attaching a new sink, or clearing the slot, retires
//! all earlier sinks so a stream that is still winding down can never
//! overwrite frames from its successor.

use super::types::CameraFrame;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;
use tracing::trace;

type Slot = watch::Sender<Option<Arc<CameraFrame>>>;

/// Receiver side of the frame slot
pub type FrameReceiver = watch::Receiver<Option<Arc<CameraFrame>>>;

#[derive(Clone)]
pub struct VideoElement {
    slot: Arc<Slot>,
    generation: Arc<AtomicU64>,
}

impl VideoElement {
    pub fn new() -> Self {
        let (slot, _) = watch::channel(None);
        Self {
            slot: Arc::new(slot),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Retire previous sinks and return one bound to the current generation
    pub fn attach(&self) -> FrameSink {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        FrameSink {
            slot: Arc::clone(&self.slot),
            generation: Arc::clone(&self.generation),
            attached_at: generation,
        }
    }

    /// Drop the current frame and retire every sink
    pub fn clear(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.slot.send_replace(None);
    }

    /// The most recent frame, if any
    pub fn current_frame(&self) -> Option<Arc<CameraFrame>> {
        self.slot.borrow().clone()
    }

    /// Dimensions of the current frame; (0, 0) before the first frame
    pub fn dimensions(&self) -> (u32, u32) {
        self.slot
            .borrow()
            .as_ref()
            .map(|frame| (frame.width, frame.height))
            .unwrap_or((0, 0))
    }

    /// Whether a frame with non-zero dimensions is available
    pub fn has_video(&self) -> bool {
        self.slot
            .borrow()
            .as_ref()
            .is_some_and(|frame| !frame.is_empty())
    }

    /// Subscribe to frame updates
    pub fn subscribe(&self) -> FrameReceiver {
        self.slot.subscribe()
    }
}

impl Default for VideoElement {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for VideoElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoElement")
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .field("dimensions", &self.dimensions())
            .finish()
    }
}

/// Write handle given to a stream
#[derive(Clone)]
pub struct FrameSink {
    slot: Arc<Slot>,
    generation: Arc<AtomicU64>,
    attached_at: u64,
}

impl FrameSink {
    /// Whether this sink may still publish
    pub fn is_current(&self) -> bool {
        self.generation.load(Ordering::SeqCst) == self.attached_at
    }

    /// Publish a frame; returns false once the sink has been retired
    pub fn publish(&self, frame: CameraFrame) -> bool {
        if !self.is_current() {
            trace!(generation = self.attached_at, "Dropping frame from retired sink");
            return false;
        }
        self.slot.send_replace(Some(Arc::new(frame)));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(width: u32, height: u32) -> CameraFrame {
        CameraFrame::from_rgba(width, height, vec![0; (width * height * 4) as usize])
    }

    #[test]
    fn test_empty_element_has_zero_dimensions() {
        let video = VideoElement::new();
        assert_eq!(video.dimensions(), (0, 0));
        assert!(!video.has_video());
        assert!(video.current_frame().is_none());
    }

    #[test]
    fn test_publish_updates_slot() {
        let video = VideoElement::new();
        let sink = video.attach();
        assert!(sink.publish(frame(4, 3)));
        assert_eq!(video.dimensions(), (4, 3));
        assert!(video.has_video());
    }

    #[test]
    fn test_reattach_retires_old_sink() {
        let video = VideoElement::new();
        let old = video.attach();
        let new = video.attach();

        assert!(!old.publish(frame(8, 8)));
        assert_eq!(video.dimensions(), (0, 0));
        assert!(new.publish(frame(2, 2)));
        assert_eq!(video.dimensions(), (2, 2));
    }

    #[test]
    fn test_clear_retires_sink_and_frame() {
        let video = VideoElement::new();
        let sink = video.attach();
        sink.publish(frame(2, 2));
        video.clear();
        assert!(!sink.is_current());
        assert!(video.current_frame().is_none());
    }

    #[tokio::test]
    async fn test_subscriber_sees_new_frames() {
        let video = VideoElement::new();
        let mut rx = video.subscribe();
        let sink = video.attach();
        sink.publish(frame(5, 5));
        rx.changed().await.unwrap();
        let seen = rx.borrow_and_update().clone().unwrap();
        assert_eq!((seen.width, seen.height), (5, 5));
    }
}
