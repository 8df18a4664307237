// SPDX-License-Identifier: GPL-3.0-only

//! Application state shared with front-ends

use crate::app::frame_processor::{BrowserNavigator, Navigator, QrDecoder, RqrrDecoder};
use crate::app::readout::Readout;
use crate::backends::camera::{MediaPlatform, get_platform};
use crate::config::Config;
use crate::constants::overlay::NO_DETECTION;
use crate::errors::AppResult;
use crate::pipelines::annotation::{NullEstimator, PoseEstimator, ProcessEstimator};
use crate::pipelines::video::{RecorderFactory, default_recorder_factory};
use std::sync::Arc;

/// The three text lines next to the preview
#[derive(Debug, Clone)]
pub struct Readouts {
    /// Names of the eyes currently detected, or "None"
    pub detected: Readout,
    /// Last decoded QR payload
    pub qr: Readout,
    /// Last camera or capture error
    pub error: Readout,
}

impl Default for Readouts {
    fn default() -> Self {
        Self {
            detected: Readout::new(NO_DETECTION),
            qr: Readout::new(""),
            error: Readout::new(""),
        }
    }
}

/// Which controls are enabled right now
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ControlState {
    /// More than one camera is listed
    pub switch_enabled: bool,
    /// The open track supports torch
    pub flash_enabled: bool,
    /// The open track supports zoom (both directions)
    pub zoom_enabled: bool,
    pub torch_on: bool,
    pub zoom_level: Option<f64>,
    pub recording: bool,
}

/// External collaborators the app is wired to
pub struct AppServices {
    pub platform: Arc<dyn MediaPlatform>,
    pub estimator: Box<dyn PoseEstimator>,
    pub decoder: Arc<dyn QrDecoder>,
    pub navigator: Arc<dyn Navigator>,
    pub recorder: Arc<dyn RecorderFactory>,
}

impl AppServices {
    /// Production collaborators as selected by the config
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let platform = get_platform(config.backend)
            .map_err(|e| crate::errors::AppError::Config(e.to_string()))?;
        Ok(Self::with_platform(platform, config))
    }

    /// Production collaborators around an explicit platform
    pub fn with_platform(platform: Arc<dyn MediaPlatform>, config: &Config) -> Self {
        let estimator: Box<dyn PoseEstimator> = if config.pose_helper.is_empty() {
            Box::new(NullEstimator)
        } else {
            Box::new(ProcessEstimator::new(config.pose_helper.clone(), config.pose))
        };
        Self {
            platform,
            estimator,
            decoder: Arc::new(RqrrDecoder::new()),
            navigator: Arc::new(BrowserNavigator),
            recorder: default_recorder_factory(config.bitrate_preset),
        }
    }
}
