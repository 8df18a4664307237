// SPDX-License-Identifier: GPL-3.0-only

//! Virtual camera platform
//!
//! Software cameras with configurable resolution, capabilities and
//! failure modes. It is the default backend when no hardware access is
//! wanted, and what the test suite drives the session through.
//!
//! ```text
//! VirtualPlatform ── open_stream ──▶ VirtualStream
//!                                         │
//!                          render (pattern / solid / image) + zoom crop
//!                                         │
//!                                         ▼
//!                                     FrameSink ──▶ VideoElement
//! ```
//!
//! The platform counts streams it has handed out and how many were
//! stopped, which makes the one-stream-at-a-time rule observable.

mod file_source;

pub use file_source::{FrameSource, apply_zoom, load_image_as_frame, render};

use crate::backends::camera::frame_loop::{CaptureLoopController, LoopAction};
use crate::backends::camera::types::{
    BackendError, BackendResult, BackendType, CameraFrame, DeviceKind, FacingMode, RawDevice,
    StreamRequest, TrackCapabilities, TrackConstraint, TrackSettings, ZoomRange,
};
use crate::backends::camera::{FrameSink, MediaPlatform, MediaStream, is_rear_facing};
use crate::constants::virtual_camera::PATTERN_FRAME_INTERVAL;
use image::RgbaImage;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info};

/// A software camera definition
#[derive(Debug, Clone)]
pub struct VirtualDevice {
    pub id: String,
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub source: FrameSource,
    pub torch: bool,
    pub zoom: Option<ZoomRange>,
    /// Error returned instead of a stream when this device is opened
    pub failure: Option<BackendError>,
}

impl VirtualDevice {
    /// Animated color bars
    pub fn pattern(id: &str, label: &str, width: u32, height: u32) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            width,
            height,
            source: FrameSource::TestPattern,
            torch: false,
            zoom: None,
            failure: None,
        }
    }

    /// A single flat color
    pub fn solid(id: &str, label: &str, width: u32, height: u32, color: [u8; 3]) -> Self {
        Self {
            source: FrameSource::Solid(color),
            ..Self::pattern(id, label, width, height)
        }
    }

    /// A still image; resolution is taken from the file when opened
    pub fn image(id: &str, label: &str, path: &Path) -> Self {
        Self {
            source: FrameSource::Image(path.to_path_buf()),
            ..Self::pattern(id, label, 0, 0)
        }
    }

    pub fn with_torch(mut self) -> Self {
        self.torch = true;
        self
    }

    pub fn with_zoom(mut self, range: ZoomRange) -> Self {
        self.zoom = Some(range);
        self
    }

    pub fn failing(mut self, error: BackendError) -> Self {
        self.failure = Some(error);
        self
    }
}

#[derive(Debug, Default)]
struct StreamCounters {
    opened: AtomicUsize,
    stopped: AtomicUsize,
}

pub struct VirtualPlatform {
    devices: Vec<VirtualDevice>,
    other_devices: Vec<RawDevice>,
    enumeration_error: Option<BackendError>,
    /// Frame period for live streams; `None` publishes only on open and on zoom
    frame_interval: Option<Duration>,
    counters: Arc<StreamCounters>,
}

impl VirtualPlatform {
    /// An empty platform with static (non-live) streams
    pub fn new() -> Self {
        Self {
            devices: Vec::new(),
            other_devices: Vec::new(),
            enumeration_error: None,
            frame_interval: None,
            counters: Arc::new(StreamCounters::default()),
        }
    }

    /// A front and a rear camera plus a microphone, streaming live
    pub fn with_default_devices() -> Self {
        Self::new()
            .with_device(VirtualDevice::pattern(
                "virtual-front",
                "Virtual Front Camera",
                640,
                480,
            ))
            .with_device(
                VirtualDevice::pattern("virtual-back", "Virtual Back Camera", 1280, 720)
                    .with_torch()
                    .with_zoom(ZoomRange::new(1.0, 4.0, Some(0.5))),
            )
            .with_other_device(RawDevice {
                id: "virtual-mic".to_string(),
                label: "Virtual Microphone".to_string(),
                kind: DeviceKind::AudioInput,
            })
            .live(PATTERN_FRAME_INTERVAL)
    }

    /// Default devices followed by one camera per image file
    pub fn with_images(paths: &[PathBuf]) -> Self {
        paths
            .iter()
            .enumerate()
            .fold(Self::with_default_devices(), |platform, (i, path)| {
                let label = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| format!("Image {}", i + 1));
                platform.with_device(VirtualDevice::image(
                    &format!("virtual-image-{}", i),
                    &label,
                    path,
                ))
            })
    }

    pub fn with_device(mut self, device: VirtualDevice) -> Self {
        self.devices.push(device);
        self
    }

    /// Add a non-camera entry to the enumeration
    pub fn with_other_device(mut self, device: RawDevice) -> Self {
        self.other_devices.push(device);
        self
    }

    /// Make enumeration fail with this error
    pub fn deny_enumeration(mut self, error: BackendError) -> Self {
        self.enumeration_error = Some(error);
        self
    }

    /// Keep publishing frames at this period while a stream is open
    pub fn live(mut self, interval: Duration) -> Self {
        self.frame_interval = Some(interval);
        self
    }

    /// Streams handed out and not yet stopped
    pub fn active_streams(&self) -> usize {
        self.opened_streams() - self.stopped_streams()
    }

    pub fn opened_streams(&self) -> usize {
        self.counters.opened.load(Ordering::SeqCst)
    }

    pub fn stopped_streams(&self) -> usize {
        self.counters.stopped.load(Ordering::SeqCst)
    }

    fn resolve(&self, request: &StreamRequest) -> BackendResult<&VirtualDevice> {
        match request {
            StreamRequest::Exact(id) => self
                .devices
                .iter()
                .find(|device| &device.id == id)
                .ok_or_else(|| BackendError::DeviceNotFound(id.clone())),
            StreamRequest::Facing(facing) => {
                let wants_rear = *facing == FacingMode::Environment;
                self.devices
                    .iter()
                    .find(|device| is_rear_facing(&device.label) == wants_rear)
                    .or_else(|| self.devices.first())
                    .ok_or_else(|| BackendError::DeviceNotFound("no video input".to_string()))
            }
        }
    }
}

impl Default for VirtualPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaPlatform for VirtualPlatform {
    fn backend_type(&self) -> BackendType {
        BackendType::Virtual
    }

    fn enumerate_devices(&self) -> BackendResult<Vec<RawDevice>> {
        if let Some(error) = &self.enumeration_error {
            return Err(error.clone());
        }
        let cameras = self.devices.iter().map(|device| RawDevice {
            id: device.id.clone(),
            label: device.label.clone(),
            kind: DeviceKind::VideoInput,
        });
        Ok(self.other_devices.iter().cloned().chain(cameras).collect())
    }

    fn open_stream(
        &self,
        request: &StreamRequest,
        sink: FrameSink,
    ) -> BackendResult<Box<dyn MediaStream>> {
        let device = self.resolve(request)?;
        if let Some(error) = &device.failure {
            return Err(error.clone());
        }

        let still = match &device.source {
            FrameSource::Image(path) => {
                let frame = load_image_as_frame(path)?;
                let image = frame
                    .to_rgba_image()
                    .ok_or_else(|| BackendError::Other("empty image".to_string()))?;
                Some(Arc::new(image))
            }
            _ => None,
        };
        let (width, height) = still
            .as_ref()
            .map(|image| image.dimensions())
            .unwrap_or((device.width, device.height));

        let renderer = Renderer {
            source: device.source.clone(),
            still,
            width,
            height,
            frame_index: Arc::new(AtomicU64::new(0)),
        };
        let track = Arc::new(Mutex::new(TrackSettings {
            width,
            height,
            zoom: device.zoom.map(|range| range.min),
            torch: device.torch.then_some(false),
        }));

        sink.publish(renderer.next_frame(&track));

        let producer = self.frame_interval.map(|interval| {
            let renderer = renderer.clone();
            let track = Arc::clone(&track);
            let sink = sink.clone();
            let name = format!("virtual-{}", device.id);
            CaptureLoopController::start_paced(&name, interval, move || {
                if sink.publish(renderer.next_frame(&track)) {
                    LoopAction::Continue
                } else {
                    LoopAction::Stop
                }
            })
        });

        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        info!(device = %device.id, width, height, "Virtual stream opened");

        Ok(Box::new(VirtualStream {
            device_id: device.id.clone(),
            capabilities: TrackCapabilities {
                torch: device.torch,
                zoom: device.zoom,
            },
            renderer,
            track,
            sink,
            producer,
            counters: Arc::clone(&self.counters),
            active: true,
        }))
    }
}

#[derive(Clone)]
struct Renderer {
    source: FrameSource,
    still: Option<Arc<RgbaImage>>,
    width: u32,
    height: u32,
    frame_index: Arc<AtomicU64>,
}

impl Renderer {
    fn next_frame(&self, track: &Mutex<TrackSettings>) -> CameraFrame {
        let zoom = track
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .zoom
            .unwrap_or(1.0);
        let index = self.frame_index.fetch_add(1, Ordering::Relaxed);

        let base = match &self.still {
            Some(image) => image.as_ref().clone(),
            None => render(&self.source, self.width, self.height, index),
        };
        CameraFrame::from_image(apply_zoom(&base, zoom))
    }
}

struct VirtualStream {
    device_id: String,
    capabilities: TrackCapabilities,
    renderer: Renderer,
    track: Arc<Mutex<TrackSettings>>,
    sink: FrameSink,
    producer: Option<CaptureLoopController>,
    counters: Arc<StreamCounters>,
    active: bool,
}

impl MediaStream for VirtualStream {
    fn device_id(&self) -> &str {
        &self.device_id
    }

    fn resolution(&self) -> (u32, u32) {
        (self.renderer.width, self.renderer.height)
    }

    fn capabilities(&self) -> TrackCapabilities {
        self.capabilities
    }

    fn settings(&self) -> TrackSettings {
        *self.track.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply_constraint(&mut self, constraint: TrackConstraint) -> BackendResult<()> {
        if !self.active {
            return Err(BackendError::StreamEnded);
        }
        {
            let mut track = self.track.lock().unwrap_or_else(PoisonError::into_inner);
            match constraint {
                TrackConstraint::Torch(on) => {
                    if !self.capabilities.torch {
                        return Err(BackendError::ConstraintRejected("torch".to_string()));
                    }
                    track.torch = Some(on);
                }
                TrackConstraint::Zoom(level) => {
                    let range = self
                        .capabilities
                        .zoom
                        .ok_or_else(|| BackendError::ConstraintRejected("zoom".to_string()))?;
                    track.zoom = Some(range.clamp(level));
                }
            }
        }
        debug!(device = %self.device_id, ?constraint, "Constraint applied");

        // Static streams only change when told to
        if matches!(constraint, TrackConstraint::Zoom(_)) && self.producer.is_none() {
            self.sink.publish(self.renderer.next_frame(&self.track));
        }
        Ok(())
    }

    fn stop(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if let Some(mut producer) = self.producer.take() {
            producer.stop();
        }
        self.counters.stopped.fetch_add(1, Ordering::SeqCst);
        info!(device = %self.device_id, "Virtual stream stopped");
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

impl Drop for VirtualStream {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::VideoElement;

    #[test]
    fn test_enumeration_lists_all_kinds() {
        let platform = VirtualPlatform::with_default_devices();
        let devices = platform.enumerate_devices().unwrap();
        assert_eq!(devices.len(), 3);
        assert_eq!(
            devices
                .iter()
                .filter(|d| d.kind == DeviceKind::VideoInput)
                .count(),
            2
        );
    }

    #[test]
    fn test_open_publishes_first_frame() {
        let platform = VirtualPlatform::new().with_device(VirtualDevice::solid(
            "cam",
            "Cam",
            8,
            6,
            [10, 20, 30],
        ));
        let video = VideoElement::new();
        let stream = platform
            .open_stream(&StreamRequest::Exact("cam".into()), video.attach())
            .unwrap();

        assert_eq!(stream.resolution(), (8, 6));
        let frame = video.current_frame().unwrap();
        assert_eq!(&frame.data[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn test_facing_request_falls_back_to_first() {
        let platform = VirtualPlatform::new()
            .with_device(VirtualDevice::pattern("a", "USB Camera", 4, 4))
            .with_device(VirtualDevice::pattern("b", "Webcam", 4, 4));
        let stream = platform
            .open_stream(
                &StreamRequest::Facing(FacingMode::Environment),
                VideoElement::new().attach(),
            )
            .unwrap();
        assert_eq!(stream.device_id(), "a");
    }

    #[test]
    fn test_unknown_device() {
        let platform = VirtualPlatform::new();
        let result = platform.open_stream(
            &StreamRequest::Exact("nope".into()),
            VideoElement::new().attach(),
        );
        assert!(matches!(result, Err(BackendError::DeviceNotFound(_))));
    }

    #[test]
    fn test_stop_is_counted_once() {
        let platform = VirtualPlatform::new().with_device(VirtualDevice::pattern("a", "A", 4, 4));
        let mut stream = platform
            .open_stream(&StreamRequest::Exact("a".into()), VideoElement::new().attach())
            .unwrap();
        assert_eq!(platform.active_streams(), 1);
        stream.stop();
        stream.stop();
        drop(stream);
        assert_eq!(platform.active_streams(), 0);
        assert_eq!(platform.stopped_streams(), 1);
    }

    #[test]
    fn test_constraints_respect_capabilities() {
        let platform = VirtualPlatform::new().with_device(
            VirtualDevice::pattern("z", "Zoomer", 16, 16).with_zoom(ZoomRange::new(1.0, 3.0, None)),
        );
        let mut stream = platform
            .open_stream(&StreamRequest::Exact("z".into()), VideoElement::new().attach())
            .unwrap();

        assert!(matches!(
            stream.apply_constraint(TrackConstraint::Torch(true)),
            Err(BackendError::ConstraintRejected(_))
        ));
        stream.apply_constraint(TrackConstraint::Zoom(9.0)).unwrap();
        assert_eq!(stream.settings().zoom, Some(3.0));

        stream.stop();
        assert!(matches!(
            stream.apply_constraint(TrackConstraint::Zoom(2.0)),
            Err(BackendError::StreamEnded)
        ));
    }

    #[test]
    fn test_live_stream_keeps_publishing() {
        let platform = VirtualPlatform::new()
            .with_device(VirtualDevice::pattern("live", "Live", 8, 8))
            .live(Duration::from_millis(5));
        let video = VideoElement::new();
        let mut stream = platform
            .open_stream(&StreamRequest::Exact("live".into()), video.attach())
            .unwrap();

        let first = video.current_frame().unwrap().captured_at;
        std::thread::sleep(Duration::from_millis(50));
        let later = video.current_frame().unwrap().captured_at;
        assert!(later > first);
        stream.stop();
    }
}
