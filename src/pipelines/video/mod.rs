// SPDX-License-Identifier: MPL-2.0

//! Video recording of the composited feed
//!
//! The controller owns the start/stop state machine and the compositing
//! task; encoding sits behind [`RecorderFactory`] so the WebM encoder is
//! only compiled with the `gstreamer` feature.

pub mod recorder;
#[cfg(feature = "gstreamer")]
pub mod webm;

pub use recorder::{
    ChunkCollector, MediaRecorder, RecordController, RecordToggle, RecorderFactory,
    RecordingState, UnavailableRecorderFactory,
};

use crate::constants::BitratePreset;
use std::sync::Arc;

/// Best recorder this build can offer
#[cfg(feature = "gstreamer")]
pub fn default_recorder_factory(bitrate: BitratePreset) -> Arc<dyn RecorderFactory> {
    if webm::is_available() {
        Arc::new(webm::WebmRecorderFactory::new(bitrate))
    } else {
        tracing::warn!("WebM encoder unavailable; recording disabled");
        Arc::new(UnavailableRecorderFactory)
    }
}

/// Best recorder this build can offer
#[cfg(not(feature = "gstreamer"))]
pub fn default_recorder_factory(_bitrate: BitratePreset) -> Arc<dyn RecorderFactory> {
    Arc::new(UnavailableRecorderFactory)
}
