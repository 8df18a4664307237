// SPDX-License-Identifier: MPL-2.0

//! WebM (VP8) encoding through GStreamer
//!
//! ```text
//! appsrc (RGBA) → videoconvert → vp8enc → webmmux (streamable) → appsink
//! ```
//!
//! The muxer runs in streamable mode so it never seeks back; every buffer
//! reaching the appsink is a self-contained chunk of the final file.

use super::recorder::{MediaRecorder, RecorderFactory};
use crate::constants::BitratePreset;
use crate::errors::RecordingError;
use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app as gst_app;
use gstreamer_video as gst_video;
use image::RgbaImage;
use std::time::Duration;
use tracing::{debug, error, info, warn};

const REQUIRED_ELEMENTS: [&str; 5] = ["appsrc", "videoconvert", "vp8enc", "webmmux", "appsink"];

/// How long `finish` waits for each trailing chunk
const DRAIN_TIMEOUT_SECS: u64 = 5;

/// Whether every element of the WebM pipeline is installed
pub fn is_available() -> bool {
    if gst::init().is_err() {
        return false;
    }
    REQUIRED_ELEMENTS.iter().all(|name| {
        let found = gst::ElementFactory::find(name).is_some();
        if !found {
            warn!(element = name, "GStreamer element missing");
        }
        found
    })
}

/// Creates VP8/WebM recorders at a bitrate preset
#[derive(Debug, Clone, Copy, Default)]
pub struct WebmRecorderFactory {
    bitrate: BitratePreset,
}

impl WebmRecorderFactory {
    pub fn new(bitrate: BitratePreset) -> Self {
        Self { bitrate }
    }
}

impl RecorderFactory for WebmRecorderFactory {
    fn create(
        &self,
        width: u32,
        height: u32,
        fps: u32,
    ) -> Result<Box<dyn MediaRecorder>, RecordingError> {
        let recorder = WebmRecorder::new(width, height, fps, self.bitrate)?;
        Ok(Box::new(recorder))
    }
}

/// One recording's GStreamer pipeline
pub struct WebmRecorder {
    pipeline: gst::Pipeline,
    appsrc: gst_app::AppSrc,
    appsink: gst_app::AppSink,
    frame_duration: gst::ClockTime,
}

fn make(name: &str) -> Result<gst::Element, RecordingError> {
    gst::ElementFactory::make(name)
        .build()
        .map_err(|e| RecordingError::EncoderNotAvailable(format!("{}: {}", name, e)))
}

impl WebmRecorder {
    pub fn new(
        width: u32,
        height: u32,
        fps: u32,
        bitrate: BitratePreset,
    ) -> Result<Self, RecordingError> {
        gst::init().map_err(|e| {
            RecordingError::EncoderNotAvailable(format!("Failed to initialize GStreamer: {}", e))
        })?;

        let fps = fps.max(1);
        let info = gst_video::VideoInfo::builder(gst_video::VideoFormat::Rgba, width, height)
            .fps(gst::Fraction::new(fps as i32, 1))
            .build()
            .map_err(|e| RecordingError::StartFailed(e.to_string()))?;
        let caps = info
            .to_caps()
            .map_err(|e| RecordingError::StartFailed(e.to_string()))?;

        let appsrc = gst_app::AppSrc::builder()
            .caps(&caps)
            .format(gst::Format::Time)
            .build();

        let videoconvert = make("videoconvert")?;

        let kbps = bitrate.bitrate_kbps(width);
        let encoder = make("vp8enc")?;
        // Realtime deadline; the compositing clock cannot wait for best quality
        encoder.set_property("deadline", 1i64);
        encoder.set_property("target-bitrate", (kbps * 1000) as i32);

        let muxer = make("webmmux")?;
        muxer.set_property("streamable", true);

        let appsink = gst_app::AppSink::builder().sync(false).build();

        let pipeline = gst::Pipeline::new();
        pipeline
            .add_many([
                appsrc.upcast_ref::<gst::Element>(),
                &videoconvert,
                &encoder,
                &muxer,
                appsink.upcast_ref::<gst::Element>(),
            ])
            .map_err(|e| RecordingError::StartFailed(format!("Failed to build pipeline: {}", e)))?;
        gst::Element::link_many([
            appsrc.upcast_ref::<gst::Element>(),
            &videoconvert,
            &encoder,
            &muxer,
            appsink.upcast_ref::<gst::Element>(),
        ])
        .map_err(|e| RecordingError::StartFailed(format!("Failed to link pipeline: {}", e)))?;

        pipeline
            .set_state(gst::State::Playing)
            .map_err(|e| RecordingError::StartFailed(format!("Failed to start pipeline: {}", e)))?;

        info!(width, height, fps, bitrate_kbps = kbps, "WebM recorder ready");

        Ok(Self {
            pipeline,
            appsrc,
            appsink,
            frame_duration: gst::ClockTime::from_nseconds(1_000_000_000 / fps as u64),
        })
    }

    /// Pull whatever the muxer has produced so far without blocking
    fn drain_ready(&self) -> Vec<Vec<u8>> {
        let mut chunks = Vec::new();
        while let Some(sample) = self.appsink.try_pull_sample(gst::ClockTime::ZERO) {
            chunks.push(sample_bytes(&sample));
        }
        chunks
    }

    /// First error posted on the bus, if any
    fn bus_error(&self) -> Option<String> {
        let bus = self.pipeline.bus()?;
        let msg = bus.pop_filtered(&[gst::MessageType::Error])?;
        match msg.view() {
            gst::MessageView::Error(err) => {
                error!(
                    error = %err.error(),
                    debug = ?err.debug(),
                    source = ?err.src().map(|s| s.name()),
                    "GStreamer error while recording"
                );
                Some(err.error().to_string())
            }
            _ => None,
        }
    }
}

fn sample_bytes(sample: &gst::Sample) -> Vec<u8> {
    sample
        .buffer()
        .and_then(|buffer| buffer.map_readable().ok())
        .map(|map| map.as_slice().to_vec())
        .unwrap_or_default()
}

impl MediaRecorder for WebmRecorder {
    fn write_frame(
        &mut self,
        frame: &RgbaImage,
        timestamp: Duration,
    ) -> Result<Vec<Vec<u8>>, RecordingError> {
        if let Some(message) = self.bus_error() {
            return Err(RecordingError::PipelineError(message));
        }

        let mut buffer = gst::Buffer::from_mut_slice(frame.as_raw().clone());
        if let Some(buffer) = buffer.get_mut() {
            buffer.set_pts(gst::ClockTime::from_nseconds(timestamp.as_nanos() as u64));
            buffer.set_duration(self.frame_duration);
        }
        self.appsrc
            .push_buffer(buffer)
            .map_err(|e| RecordingError::PipelineError(format!("push failed: {:?}", e)))?;

        Ok(self.drain_ready())
    }

    fn finish(&mut self) -> Result<Vec<Vec<u8>>, RecordingError> {
        debug!("Sending EOS to WebM pipeline");
        self.appsrc
            .end_of_stream()
            .map_err(|e| RecordingError::StopFailed(format!("EOS failed: {:?}", e)))?;

        let mut chunks = Vec::new();
        while let Some(sample) = self
            .appsink
            .try_pull_sample(gst::ClockTime::from_seconds(DRAIN_TIMEOUT_SECS))
        {
            chunks.push(sample_bytes(&sample));
        }
        if !self.appsink.is_eos() {
            warn!("WebM pipeline did not reach EOS; recording may be truncated");
        }

        let error = self.bus_error();
        self.pipeline
            .set_state(gst::State::Null)
            .map_err(|e| RecordingError::StopFailed(format!("Failed to stop pipeline: {}", e)))?;
        if let Some(message) = error {
            return Err(RecordingError::PipelineError(message));
        }

        debug!(chunks = chunks.len(), "WebM pipeline drained");
        Ok(chunks)
    }
}

impl Drop for WebmRecorder {
    fn drop(&mut self) {
        let _ = self.pipeline.set_state(gst::State::Null);
    }
}
