// SPDX-License-Identifier: GPL-3.0-only

//! User configuration
//!
//! Stored as JSON in `~/.config/eyecam/config.json`. Missing fields take
//! their defaults, so older files keep loading as fields are added.

use crate::backends::camera::types::BackendType;
use crate::constants::{BitratePreset, app_info, capture, overlay, scan};
use crate::errors::{AppError, AppResult};
use crate::pipelines::annotation::{MarkerStyle, PoseOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Camera backend to use (virtual or v4l2)
    pub backend: BackendType,
    /// Device opened last; preferred on the next start when still present
    pub last_camera_id: Option<String>,
    /// Time between QR scan ticks
    pub scan_interval_ms: u64,
    /// Minimum keypoint visibility for a marker (exclusive)
    pub landmark_threshold: f32,
    /// Marker ring radius in overlay pixels
    pub marker_radius: f32,
    /// Options forwarded to the pose estimator
    pub pose: PoseOptions,
    /// Helper program for pose estimation; empty disables annotation
    pub pose_helper: Vec<String>,
    /// Compositing rate while recording
    pub record_fps: u32,
    /// Where photos and videos are saved; defaults to the download dir
    pub output_dir: Option<PathBuf>,
    /// Open http(s) QR payloads in the browser
    pub navigate_on_url: bool,
    /// Video encoder bitrate preset (Low, Medium, High)
    pub bitrate_preset: BitratePreset,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendType::default(),
            last_camera_id: None,
            scan_interval_ms: scan::SCAN_INTERVAL.as_millis() as u64,
            landmark_threshold: overlay::VISIBILITY_THRESHOLD,
            marker_radius: overlay::MARKER_RADIUS,
            pose: PoseOptions::default(),
            pose_helper: Vec::new(),
            record_fps: capture::RECORD_FPS,
            output_dir: None,
            navigate_on_url: true,
            bitrate_preset: BitratePreset::default(),
        }
    }
}

impl Config {
    /// Default config file location
    pub fn path() -> Option<PathBuf> {
        crate::storage::config_dir().map(|dir| dir.join(app_info::CONFIG_FILE))
    }

    /// Load from the default location, falling back to defaults
    pub fn load() -> Self {
        match Self::path() {
            Some(path) => Self::load_from(&path),
            None => {
                warn!("No config directory; using defaults");
                Self::default()
            }
        }
    }

    /// Load from `path`; a missing or malformed file yields defaults
    pub fn load_from(path: &Path) -> Self {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No config file; using defaults");
                return Self::default();
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read config; using defaults");
                return Self::default();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(config) => {
                debug!(path = %path.display(), "Loaded config");
                config
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Malformed config; using defaults");
                Self::default()
            }
        }
    }

    /// Write to the default location
    pub fn save(&self) -> AppResult<()> {
        let path = Self::path().ok_or_else(|| AppError::Config("no config directory".into()))?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json =
            serde_json::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(path, json)?;
        info!(path = %path.display(), "Config saved");
        Ok(())
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms.max(1))
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(crate::storage::default_output_dir)
    }

    pub fn marker_style(&self) -> MarkerStyle {
        MarkerStyle {
            threshold: self.landmark_threshold,
            radius: self.marker_radius,
            ..MarkerStyle::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.json"));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_malformed_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(Config::load_from(&path), Config::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"scan_interval_ms": 500, "backend": "V4l2"}"#).unwrap();

        let config = Config::load_from(&path);
        assert_eq!(config.scan_interval(), Duration::from_millis(500));
        assert_eq!(config.backend, BackendType::V4l2);
        assert_eq!(config.record_fps, 25);
        assert!(config.navigate_on_url);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = Config {
            last_camera_id: Some("virtual-back".into()),
            pose_helper: vec!["pose-helper".into(), "--fast".into()],
            ..Config::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path), config);
    }

    #[test]
    fn test_marker_style_follows_config() {
        let config = Config {
            landmark_threshold: 0.7,
            marker_radius: 12.0,
            ..Config::default()
        };
        let style = config.marker_style();
        assert_eq!(style.threshold, 0.7);
        assert_eq!(style.radius, 12.0);
        assert_eq!(style.line_width, 3.0);
    }
}
