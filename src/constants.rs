// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Recording bitrate presets
///
/// Target bitrate for the VP8 encoder, scaled by the composite width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BitratePreset {
    /// Smaller files, reduced quality
    Low,
    /// Balanced quality and file size (default)
    #[default]
    Medium,
    /// Larger files, better quality
    High,
}

impl BitratePreset {
    pub const ALL: [BitratePreset; 3] = [
        BitratePreset::Low,
        BitratePreset::Medium,
        BitratePreset::High,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            BitratePreset::Low => "Low",
            BitratePreset::Medium => "Medium",
            BitratePreset::High => "High",
        }
    }

    /// Target bitrate in kbps for a composite of the given width
    pub fn bitrate_kbps(&self, width: u32) -> u32 {
        // Medium tier per width class; Low halves it, High doubles it
        let medium = match width {
            w if w >= 3840 => 30_000,
            w if w >= 1920 => 8_000,
            w if w >= 1280 => 5_000,
            _ => 2_000,
        };
        match self {
            BitratePreset::Low => medium / 2,
            BitratePreset::Medium => medium,
            BitratePreset::High => medium * 2,
        }
    }
}

/// Capture session defaults
pub mod session {
    /// Zoom increment when the track does not report a step
    pub const DEFAULT_ZOOM_STEP: f64 = 0.2;
}

/// Landmark overlay rendering
pub mod overlay {
    /// Keypoints at or below this visibility are not drawn
    pub const VISIBILITY_THRESHOLD: f32 = 0.5;

    /// Marker ring radius in overlay pixels
    pub const MARKER_RADIUS: f32 = 10.0;

    /// Marker ring stroke width in overlay pixels
    pub const MARKER_LINE_WIDTH: f32 = 3.0;

    /// Lime
    pub const MARKER_COLOR: [u8; 4] = [0, 255, 0, 255];

    /// Readout text when no keypoint qualifies
    pub const NO_DETECTION: &str = "None";
}

/// Pose estimator options
pub mod pose {
    pub const MODEL_COMPLEXITY: u8 = 1;
    pub const MIN_DETECTION_CONFIDENCE: f32 = 0.6;
    pub const MIN_TRACKING_CONFIDENCE: f32 = 0.6;
}

/// QR scan loop
pub mod scan {
    use super::Duration;

    /// Time between scan ticks
    pub const SCAN_INTERVAL: Duration = Duration::from_millis(300);

    /// Frames larger than this (longest side) are downscaled before decoding
    pub const MAX_DECODE_DIMENSION: u32 = 640;
}

/// Photo and video artifacts
pub mod capture {
    pub const PHOTO_FILE_NAME: &str = "photo.png";
    pub const PHOTO_MIME: &str = "image/png";
    pub const VIDEO_FILE_NAME: &str = "video.webm";
    pub const VIDEO_MIME: &str = "video/webm";

    /// Compositing rate while recording
    pub const RECORD_FPS: u32 = 25;
}

/// Supported image formats for file-backed virtual cameras
pub mod file_formats {
    pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];

    /// Check if a file extension is a supported image format
    pub fn is_image_extension(ext: &str) -> bool {
        IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str())
    }
}

/// Virtual camera timing
pub mod virtual_camera {
    use super::Duration;

    /// Frame period of a live test pattern (~30 fps)
    pub const PATTERN_FRAME_INTERVAL: Duration = Duration::from_millis(33);
}

/// Application information utilities
pub mod app_info {
    /// Directory name under the user config dir
    pub const APP_DIR: &str = "eyecam";

    /// Config file name inside [`APP_DIR`]
    pub const CONFIG_FILE: &str = "config.json";

    /// Build version, including the git hash when available
    pub fn version() -> &'static str {
        env!("EYECAM_BUILD_VERSION")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_extension_case_insensitive() {
        assert!(file_formats::is_image_extension("PNG"));
        assert!(!file_formats::is_image_extension("webm"));
    }

    #[test]
    fn test_marker_is_lime() {
        assert_eq!(overlay::MARKER_COLOR, [0, 255, 0, 255]);
    }
}
