// SPDX-License-Identifier: GPL-3.0-only
// Shared types for media platform abstraction

//! Shared types for camera backends

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Camera backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum BackendType {
    /// Built-in synthetic/file-backed cameras
    #[default]
    Virtual,
    /// Video4Linux2 devices under /dev/video*
    V4l2,
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendType::Virtual => write!(f, "virtual"),
            BackendType::V4l2 => write!(f, "v4l2"),
        }
    }
}

impl std::str::FromStr for BackendType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "virtual" => Ok(BackendType::Virtual),
            "v4l2" => Ok(BackendType::V4l2),
            other => Err(format!("unknown backend '{}'", other)),
        }
    }
}

/// Kind of media device reported by a platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    VideoInput,
    AudioInput,
    AudioOutput,
}

/// Unfiltered device entry as listed by a platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDevice {
    pub id: String,
    pub label: String,
    pub kind: DeviceKind,
}

/// A selectable camera: identifier plus human-readable label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub id: String,
    pub label: String,
}

impl std::fmt::Display for DeviceDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.label.is_empty() {
            write!(f, "{}", self.id)
        } else {
            write!(f, "{} ({})", self.label, self.id)
        }
    }
}

/// Preferred camera direction when no explicit device is requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacingMode {
    /// Front camera, facing the user
    User,
    /// Rear camera, facing away from the user
    Environment,
}

/// Video-only stream acquisition request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamRequest {
    /// Open exactly this device or fail
    Exact(String),
    /// Any device, preferring the given direction
    Facing(FacingMode),
}

/// Bounds of an optical zoom control
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomRange {
    pub min: f64,
    pub max: f64,
    /// Increment per zoom step; platforms may not report one
    pub step: Option<f64>,
}

impl ZoomRange {
    /// Create a range, swapping bounds given in the wrong order
    pub fn new(min: f64, max: f64, step: Option<f64>) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        let step = step.filter(|s| s.is_finite() && *s > 0.0);
        Self { min, max, step }
    }

    /// Clamp a zoom level into the range
    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.min).min(self.max)
    }
}

/// Hardware capabilities of a video track
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TrackCapabilities {
    pub torch: bool,
    pub zoom: Option<ZoomRange>,
}

/// Live settings of a video track
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TrackSettings {
    pub width: u32,
    pub height: u32,
    pub zoom: Option<f64>,
    pub torch: Option<bool>,
}

/// A single constraint applied to a live track
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackConstraint {
    Torch(bool),
    Zoom(f64),
}

/// A single RGBA frame from the camera
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    /// RGBA pixels, `stride` bytes per row
    pub data: Arc<[u8]>,
    /// Row stride in bytes (may include padding)
    pub stride: u32,
    /// Timestamp when frame was captured
    pub captured_at: Instant,
}

impl CameraFrame {
    /// Wrap tightly packed RGBA pixels
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data: Arc::from(data),
            stride: width * 4,
            captured_at: Instant::now(),
        }
    }

    /// Wrap an RGBA image buffer
    pub fn from_image(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self::from_rgba(width, height, image.into_raw())
    }

    /// A frame with no pixels has not produced video yet
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Copy the pixels into an image buffer, dropping stride padding
    pub fn to_rgba_image(&self) -> Option<RgbaImage> {
        if self.is_empty() {
            return None;
        }
        let row_bytes = self.width as usize * 4;
        let stride = self.stride as usize;
        if stride == row_bytes {
            return RgbaImage::from_raw(self.width, self.height, self.data.to_vec());
        }

        let mut packed = Vec::with_capacity(row_bytes * self.height as usize);
        for y in 0..self.height as usize {
            let start = y * stride;
            let row = self.data.get(start..start + row_bytes)?;
            packed.extend_from_slice(row);
        }
        RgbaImage::from_raw(self.width, self.height, packed)
    }
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Error types for platform operations
#[derive(Debug, Clone)]
pub enum BackendError {
    /// Backend is not available on this system or build
    NotAvailable(String),
    /// The platform refused access
    PermissionDenied(String),
    /// Camera device not found
    DeviceNotFound(String),
    /// No usable pixel format
    FormatNotSupported(String),
    /// The track rejected a constraint
    ConstraintRejected(String),
    /// The stream has already been stopped
    StreamEnded,
    /// General I/O error
    IoError(String),
    /// Other errors
    Other(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::NotAvailable(msg) => write!(f, "Backend not available: {}", msg),
            BackendError::PermissionDenied(msg) => write!(f, "Permission denied: {}", msg),
            BackendError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            BackendError::FormatNotSupported(msg) => write!(f, "Format not supported: {}", msg),
            BackendError::ConstraintRejected(msg) => write!(f, "Constraint rejected: {}", msg),
            BackendError::StreamEnded => write!(f, "Stream has ended"),
            BackendError::IoError(msg) => write!(f, "I/O error: {}", msg),
            BackendError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => BackendError::PermissionDenied(err.to_string()),
            std::io::ErrorKind::NotFound => BackendError::DeviceNotFound(err.to_string()),
            _ => BackendError::IoError(err.to_string()),
        }
    }
}
