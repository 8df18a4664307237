// SPDX-License-Identifier: MPL-2.0

//! Camera platform abstraction
//!
//! A [`MediaPlatform`] lists devices and hands out [`MediaStream`]s; the
//! [`session::CaptureSession`] owns at most one stream at a time and
//! exposes its frames through a [`video::VideoElement`].
//!
//! ```text
//! ┌─────────────────────┐
//! │     CameraApp       │
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │   CaptureSession    │  ← stream ownership, canvases, zoom/torch
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │ MediaPlatform Trait │  ← enumeration, stream acquisition
//! └──────────┬──────────┘
//!            │
//!      ┌─────┴─────┐
//!      ▼           ▼
//!  ┌───────┐   ┌───────┐
//!  │Virtual│   │ V4L2  │
//!  └───────┘   └───────┘
//! ```

pub mod enumeration;
pub mod frame_loop;
pub mod session;
pub mod types;
#[cfg(feature = "v4l2")]
pub mod v4l2;
pub mod v4l2_controls;
pub mod video;

pub use enumeration::{DeviceList, default_device_index, is_rear_facing, list_video_inputs};
pub use session::{CaptureSession, SessionStats, TrackControls, ZoomDirection};
pub use types::*;
pub use video::{FrameSink, VideoElement};

use std::sync::Arc;

/// Source of camera devices and streams
pub trait MediaPlatform: Send + Sync {
    /// Which backend this platform implements
    fn backend_type(&self) -> BackendType;

    /// List every media device the platform knows about, of any kind
    ///
    /// Fails when the platform refuses enumeration (for example, missing
    /// permissions).
    fn enumerate_devices(&self) -> BackendResult<Vec<RawDevice>>;

    /// Acquire a video-only stream
    ///
    /// Frames are published through `sink` until the returned stream is
    /// stopped. The first frame should be published before returning when
    /// the device can produce one synchronously.
    fn open_stream(
        &self,
        request: &StreamRequest,
        sink: FrameSink,
    ) -> BackendResult<Box<dyn MediaStream>>;
}

/// A live video track, exclusively owned by its holder
pub trait MediaStream: Send {
    /// Identifier of the device backing this stream
    fn device_id(&self) -> &str;

    /// Native frame dimensions
    fn resolution(&self) -> (u32, u32);

    /// Hardware capabilities, fixed for the lifetime of the stream
    fn capabilities(&self) -> TrackCapabilities;

    /// Live settings as currently applied
    fn settings(&self) -> TrackSettings;

    /// Apply a single constraint to the track
    fn apply_constraint(&mut self, constraint: TrackConstraint) -> BackendResult<()>;

    /// Stop the track and release the device
    ///
    /// Must be idempotent.
    fn stop(&mut self);

    /// Whether the track is still producing frames
    fn is_active(&self) -> bool;
}

/// Create the platform for a backend type
pub fn get_platform(backend: BackendType) -> BackendResult<Arc<dyn MediaPlatform>> {
    match backend {
        BackendType::Virtual => Ok(Arc::new(
            crate::backends::virtual_camera::VirtualPlatform::with_default_devices(),
        )),
        #[cfg(feature = "v4l2")]
        BackendType::V4l2 => Ok(Arc::new(v4l2::V4l2Platform::new())),
        #[cfg(not(feature = "v4l2"))]
        BackendType::V4l2 => Err(BackendError::NotAvailable(
            "built without the v4l2 feature".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_virtual_platform_always_available() {
        let platform = get_platform(BackendType::Virtual).unwrap();
        assert_eq!(platform.backend_type(), BackendType::Virtual);
        assert!(!platform.enumerate_devices().unwrap().is_empty());
    }

    #[cfg(not(feature = "v4l2"))]
    #[test]
    fn test_v4l2_requires_feature() {
        assert!(matches!(
            get_platform(BackendType::V4l2),
            Err(BackendError::NotAvailable(_))
        ));
    }
}
