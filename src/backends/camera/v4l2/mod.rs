// SPDX-License-Identifier: GPL-3.0-only

//! Video4Linux2 platform
//!
//! Cameras are the `/dev/video*` nodes that advertise video capture. Each
//! open stream runs a capture loop over memory-mapped buffers and
//! converts YUYV, MJPG or RGB3 frames to RGBA. Zoom maps to
//! `V4L2_CID_ZOOM_ABSOLUTE`; the torch uses `V4L2_CID_FLASH_LED_MODE` when
//! the sensor has it and sysfs flash LEDs otherwise.

use super::types::{
    BackendError, BackendResult, BackendType, CameraFrame, DeviceKind, FacingMode, RawDevice,
    StreamRequest, TrackCapabilities, TrackConstraint, TrackSettings,
};
use super::v4l2_controls::{
    self, V4L2_CID_FLASH_LED_MODE, V4L2_CID_ZOOM_ABSOLUTE, V4L2_FLASH_LED_MODE_NONE,
    V4L2_FLASH_LED_MODE_TORCH,
};
use super::frame_loop::{CaptureLoopController, LoopAction};
use super::{FrameSink, MediaPlatform, MediaStream, is_rear_facing};
use crate::flash::{self, FlashDevice};
use crate::media::convert;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};
use v4l::FourCC;
use v4l::buffer::Type;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;

const YUYV: [u8; 4] = *b"YUYV";
const MJPG: [u8; 4] = *b"MJPG";
const RGB3: [u8; 4] = *b"RGB3";

pub struct V4l2Platform;

impl V4l2Platform {
    pub fn new() -> Self {
        Self
    }

    fn capture_nodes(&self) -> Vec<RawDevice> {
        v4l::context::enum_devices()
            .into_iter()
            .filter_map(|node| {
                let path = node.path().to_string_lossy().to_string();
                let (card, is_capture) = v4l2_controls::query_capture_caps(&path)?;
                if !is_capture {
                    debug!(path = %path, "Skipping non-capture node");
                    return None;
                }
                Some(RawDevice {
                    label: node.name().unwrap_or(card),
                    id: path,
                    kind: DeviceKind::VideoInput,
                })
            })
            .collect()
    }
}

impl Default for V4l2Platform {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaPlatform for V4l2Platform {
    fn backend_type(&self) -> BackendType {
        BackendType::V4l2
    }

    fn enumerate_devices(&self) -> BackendResult<Vec<RawDevice>> {
        // Unreadable /dev means we were not allowed to look
        std::fs::read_dir("/dev")?;
        Ok(self.capture_nodes())
    }

    fn open_stream(
        &self,
        request: &StreamRequest,
        sink: FrameSink,
    ) -> BackendResult<Box<dyn MediaStream>> {
        let path = match request {
            StreamRequest::Exact(path) => path.clone(),
            StreamRequest::Facing(facing) => {
                let nodes = self.capture_nodes();
                let wants_rear = *facing == FacingMode::Environment;
                nodes
                    .iter()
                    .find(|node| is_rear_facing(&node.label) == wants_rear)
                    .or_else(|| nodes.first())
                    .map(|node| node.id.clone())
                    .ok_or_else(|| BackendError::DeviceNotFound("no video input".to_string()))?
            }
        };

        let dev = Device::with_path(&path)?;
        let format = negotiate_format(&dev)?;
        info!(
            path = %path,
            width = format.width,
            height = format.height,
            fourcc = %format.fourcc,
            "Opened V4L2 device"
        );

        let zoom = v4l2_controls::query_control(&path, V4L2_CID_ZOOM_ABSOLUTE)
            .and_then(|info| info.as_zoom_range());
        let torch = if v4l2_controls::has_control(&path, V4L2_CID_FLASH_LED_MODE) {
            Some(TorchControl::Sensor)
        } else {
            let leds = FlashDevice::discover();
            (!leds.is_empty()).then_some(TorchControl::Leds(leds))
        };

        let (width, height, fourcc) = (format.width, format.height, format.fourcc);
        let capture = CaptureLoopController::start_with_init(
            &format!("v4l2-{}", path),
            move || {
                MmapStream::with_buffers(&dev, Type::VideoCapture, 4)
                    .map_err(|e| format!("Failed to create buffer stream: {}", e))
            },
            move |stream: &mut MmapStream<'static>| {
                capture_frame(stream, width, height, fourcc, &sink)
            },
        );

        Ok(Box::new(V4l2Stream {
            path,
            width,
            height,
            capabilities: TrackCapabilities {
                torch: torch.is_some(),
                zoom,
            },
            torch,
            torch_on: false,
            capture: Some(capture),
        }))
    }
}

/// Prefer YUYV at the current size, accept MJPG or RGB3 if that is what sticks
fn negotiate_format(dev: &Device) -> BackendResult<v4l::Format> {
    let mut format = dev.format()?;
    let current = format.fourcc;
    format.fourcc = FourCC::new(&YUYV);

    let applied = match dev.set_format(&format) {
        Ok(applied) => applied,
        Err(e) => {
            warn!(error = %e, current = %current, "Could not set YUYV, keeping device format");
            dev.format()?
        }
    };

    if [YUYV, MJPG, RGB3].contains(&applied.fourcc.repr) {
        Ok(applied)
    } else {
        Err(BackendError::FormatNotSupported(applied.fourcc.to_string()))
    }
}

/// Dequeue, convert and publish one frame
fn capture_frame(
    stream: &mut MmapStream<'static>,
    width: u32,
    height: u32,
    fourcc: FourCC,
    sink: &FrameSink,
) -> LoopAction {
    static FRAME_COUNTER: AtomicU64 = AtomicU64::new(0);

    let (buf, meta) = match stream.next() {
        Ok(next) => next,
        Err(e) => {
            warn!(error = %e, "Failed to capture frame");
            std::thread::sleep(Duration::from_millis(10));
            return LoopAction::Continue;
        }
    };

    let frame = match &fourcc.repr {
        b"YUYV" => Some(CameraFrame::from_rgba(
            width,
            height,
            convert::yuyv_to_rgba(buf, width, height),
        )),
        b"RGB3" => Some(CameraFrame::from_rgba(width, height, convert::rgb_to_rgba(buf))),
        _ => convert::mjpeg_to_rgba(&buf[..meta.bytesused as usize])
            .map(|(w, h, rgba)| CameraFrame::from_rgba(w, h, rgba)),
    };

    let frame_num = FRAME_COUNTER.fetch_add(1, Ordering::Relaxed);
    let Some(frame) = frame else {
        debug!(frame = frame_num, "Dropped undecodable frame");
        return LoopAction::Continue;
    };
    if !sink.publish(frame) {
        debug!("Sink retired, ending capture");
        return LoopAction::Stop;
    }
    if frame_num % 60 == 0 {
        debug!(frame = frame_num, sequence = meta.sequence, "Frame captured");
    }
    LoopAction::Continue
}

enum TorchControl {
    Sensor,
    Leds(Vec<FlashDevice>),
}

struct V4l2Stream {
    path: String,
    width: u32,
    height: u32,
    capabilities: TrackCapabilities,
    torch: Option<TorchControl>,
    torch_on: bool,
    /// `None` once stopped
    capture: Option<CaptureLoopController>,
}

impl V4l2Stream {
    fn set_torch(&self, on: bool) -> BackendResult<()> {
        match &self.torch {
            Some(TorchControl::Sensor) => {
                let mode = if on {
                    V4L2_FLASH_LED_MODE_TORCH
                } else {
                    V4L2_FLASH_LED_MODE_NONE
                };
                v4l2_controls::set_control(&self.path, V4L2_CID_FLASH_LED_MODE, mode)
                    .map_err(BackendError::ConstraintRejected)
            }
            Some(TorchControl::Leds(leds)) => flash::set_all(leds, on).map_err(BackendError::from),
            None => Err(BackendError::ConstraintRejected("torch".to_string())),
        }
    }
}

impl MediaStream for V4l2Stream {
    fn device_id(&self) -> &str {
        &self.path
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn capabilities(&self) -> TrackCapabilities {
        self.capabilities
    }

    fn settings(&self) -> TrackSettings {
        let zoom = self
            .capabilities
            .zoom
            .and_then(|_| v4l2_controls::get_control(&self.path, V4L2_CID_ZOOM_ABSOLUTE))
            .map(f64::from);
        TrackSettings {
            width: self.width,
            height: self.height,
            zoom,
            torch: self.capabilities.torch.then_some(self.torch_on),
        }
    }

    fn apply_constraint(&mut self, constraint: TrackConstraint) -> BackendResult<()> {
        if !self.is_active() {
            return Err(BackendError::StreamEnded);
        }
        match constraint {
            TrackConstraint::Zoom(level) => {
                let range = self
                    .capabilities
                    .zoom
                    .ok_or_else(|| BackendError::ConstraintRejected("zoom".to_string()))?;
                let value = range.clamp(level).round() as i32;
                v4l2_controls::set_control(&self.path, V4L2_CID_ZOOM_ABSOLUTE, value)
                    .map_err(BackendError::ConstraintRejected)
            }
            TrackConstraint::Torch(on) => {
                self.set_torch(on)?;
                self.torch_on = on;
                Ok(())
            }
        }
    }

    fn stop(&mut self) {
        let Some(mut capture) = self.capture.take() else {
            return;
        };
        if self.torch_on && self.set_torch(false).is_ok() {
            self.torch_on = false;
        }
        capture.stop();
        info!(path = %self.path, "V4L2 stream stopped");
    }

    fn is_active(&self) -> bool {
        self.capture.is_some()
    }
}

impl Drop for V4l2Stream {
    fn drop(&mut self) {
        self.stop();
    }
}
