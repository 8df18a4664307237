// SPDX-License-Identifier: GPL-3.0-only

//! Capture session: exclusive stream ownership and canvas geometry
//!
//! The session holds at most one live stream. Opening a device always
//! stops the previous stream first so the hardware is released before it
//! is acquired again. Canvases follow the native resolution of whatever
//! stream is open.

use super::types::{FacingMode, StreamRequest, TrackCapabilities, TrackConstraint};
use super::video::VideoElement;
use super::{MediaPlatform, MediaStream};
use crate::constants::session::DEFAULT_ZOOM_STEP;
use crate::errors::{Capability, DeviceError, SessionError};
use crate::media::canvas::{self, SharedCanvas};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Zoom step direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomDirection {
    In,
    Out,
}

impl ZoomDirection {
    fn sign(self) -> f64 {
        match self {
            ZoomDirection::In => 1.0,
            ZoomDirection::Out => -1.0,
        }
    }
}

/// Which track-dependent controls the open stream supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrackControls {
    pub flash_enabled: bool,
    pub zoom_enabled: bool,
}

/// Stream accounting for this session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionStats {
    pub opened: usize,
    pub stopped: usize,
}

impl SessionStats {
    pub fn active(&self) -> usize {
        self.opened - self.stopped
    }
}

pub struct CaptureSession {
    platform: Arc<dyn MediaPlatform>,
    stream: Option<Box<dyn MediaStream>>,
    video: VideoElement,
    overlay: SharedCanvas,
    scan_buffer: SharedCanvas,
    capabilities: TrackCapabilities,
    torch_on: bool,
    stats: SessionStats,
}

impl CaptureSession {
    pub fn new(platform: Arc<dyn MediaPlatform>) -> Self {
        Self {
            platform,
            stream: None,
            video: VideoElement::new(),
            overlay: canvas::shared(0, 0),
            scan_buffer: canvas::shared(0, 0),
            capabilities: TrackCapabilities::default(),
            torch_on: false,
            stats: SessionStats::default(),
        }
    }

    /// Open a camera, replacing any stream that is currently open
    ///
    /// Without an id the platform picks a device, preferring a rear camera.
    /// On failure the session is left without a stream and the canvases
    /// keep their previous geometry.
    pub fn open(&mut self, device_id: Option<&str>) -> Result<(), SessionError> {
        self.release();

        let request = match device_id {
            Some(id) => StreamRequest::Exact(id.to_string()),
            None => StreamRequest::Facing(FacingMode::Environment),
        };
        debug!(?request, "Requesting video stream");

        let sink = self.video.attach();
        let stream = match self.platform.open_stream(&request, sink) {
            Ok(stream) => stream,
            Err(e) => {
                warn!(?request, error = %e, "Failed to open camera");
                self.video.clear();
                return Err(e.into());
            }
        };

        let (width, height) = stream.resolution();
        canvas::write(&self.overlay).resize(width, height);
        canvas::write(&self.scan_buffer).resize(width, height);

        self.capabilities = stream.capabilities();
        self.torch_on = false;
        self.stats.opened += 1;

        info!(
            device = stream.device_id(),
            width,
            height,
            torch = self.capabilities.torch,
            zoom = self.capabilities.zoom.is_some(),
            "Camera opened"
        );

        self.stream = Some(stream);
        Ok(())
    }

    /// Stop and drop the current stream, if any
    pub fn close(&mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            debug!(device = stream.device_id(), "Stopping previous stream");
            stream.stop();
            self.stats.stopped += 1;
        }
        self.video.clear();
        self.capabilities = TrackCapabilities::default();
        self.torch_on = false;
    }

    /// Flip the torch, returning the new state
    pub fn toggle_torch(&mut self) -> Result<bool, SessionError> {
        let stream = self.stream.as_mut().ok_or(DeviceError::NoActiveStream)?;
        if !self.capabilities.torch {
            return Err(SessionError::CapabilityUnsupported(Capability::Torch));
        }

        let next = !self.torch_on;
        stream.apply_constraint(TrackConstraint::Torch(next))?;
        self.torch_on = next;
        info!(torch = next, "Torch toggled");
        Ok(next)
    }

    /// Step the zoom one increment, returning the level applied
    pub fn adjust_zoom(&mut self, direction: ZoomDirection) -> Result<f64, SessionError> {
        let stream = self.stream.as_mut().ok_or(DeviceError::NoActiveStream)?;
        let range = self
            .capabilities
            .zoom
            .ok_or(SessionError::CapabilityUnsupported(Capability::Zoom))?;

        let current = stream.settings().zoom.unwrap_or(range.min);
        let step = range.step.unwrap_or(DEFAULT_ZOOM_STEP);
        let next = range.clamp(current + direction.sign() * step);

        stream.apply_constraint(TrackConstraint::Zoom(next))?;
        debug!(from = current, to = next, "Zoom adjusted");
        Ok(next)
    }

    pub fn controls(&self) -> TrackControls {
        let open = self.stream.is_some();
        TrackControls {
            flash_enabled: open && self.capabilities.torch,
            zoom_enabled: open && self.capabilities.zoom.is_some(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    pub fn device_id(&self) -> Option<&str> {
        self.stream.as_ref().map(|stream| stream.device_id())
    }

    pub fn capabilities(&self) -> TrackCapabilities {
        self.capabilities
    }

    pub fn torch_on(&self) -> bool {
        self.torch_on
    }

    /// Current zoom level as reported by the track
    pub fn zoom_level(&self) -> Option<f64> {
        self.stream.as_ref().and_then(|stream| stream.settings().zoom)
    }

    pub fn video(&self) -> &VideoElement {
        &self.video
    }

    pub fn overlay(&self) -> &SharedCanvas {
        &self.overlay
    }

    pub fn scan_buffer(&self) -> &SharedCanvas {
        &self.scan_buffer
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.release();
    }
}
