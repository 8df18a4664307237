// SPDX-License-Identifier: MPL-2.0

//! Error types for the camera utility
//!
//! Session behavior uses a small closed set of kinds ([`SessionError`]) so
//! every control can report exactly what went wrong; the rest of the crate
//! funnels into [`AppError`].

use crate::backends::camera::types::BackendError;
use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main application error type
#[derive(Debug, Clone)]
pub enum AppError {
    /// Camera session errors
    Camera(SessionError),
    /// Recording-related errors
    Recording(RecordingError),
    /// Photo capture errors
    Photo(PhotoError),
    /// Configuration errors
    Config(String),
    /// Storage/filesystem errors
    Storage(String),
    /// Generic error with message
    Other(String),
}

/// Hardware capability that a control depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Flash LED in torch mode
    Torch,
    /// Optical zoom
    Zoom,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Torch => write!(f, "Torch"),
            Capability::Zoom => write!(f, "Zoom"),
        }
    }
}

/// Errors raised by the capture session and its consumers
#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    /// Device access denied or hardware fault; the operation was aborted
    Device(DeviceError),
    /// The active device lacks the capability; the call was a no-op
    CapabilityUnsupported(Capability),
    /// A decode or estimation cycle produced no result
    DecodeMiss,
}

/// Device access failures
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceError {
    /// No video input devices are present
    NoDevices,
    /// The platform refused access to the device
    Denied(String),
    /// The requested device does not exist
    NotFound(String),
    /// The device failed while opening or applying a constraint
    Hardware(String),
    /// No stream is currently open
    NoActiveStream,
}

/// Recording-specific errors
#[derive(Debug, Clone)]
pub enum RecordingError {
    /// Failed to start recording
    StartFailed(String),
    /// Failed to stop recording
    StopFailed(String),
    /// Encoder not available
    EncoderNotAvailable(String),
    /// Encoder failed while recording
    PipelineError(String),
}

/// Photo capture errors
#[derive(Debug, Clone)]
pub enum PhotoError {
    /// No frame available for capture
    NoFrameAvailable,
    /// Encoding failed
    EncodingFailed(String),
    /// Save failed
    SaveFailed(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Camera(e) => write!(f, "Camera error: {}", e),
            AppError::Recording(e) => write!(f, "Recording error: {}", e),
            AppError::Photo(e) => write!(f, "Photo error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Device(e) => write!(f, "{}", e),
            SessionError::CapabilityUnsupported(cap) => write!(f, "{} not supported", cap),
            SessionError::DecodeMiss => write!(f, "No result this cycle"),
        }
    }
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::NoDevices => write!(f, "No camera devices found"),
            DeviceError::Denied(msg) => write!(f, "Camera access denied: {}", msg),
            DeviceError::NotFound(msg) => write!(f, "Camera not found: {}", msg),
            DeviceError::Hardware(msg) => write!(f, "Camera error: {}", msg),
            DeviceError::NoActiveStream => write!(f, "No camera is open"),
        }
    }
}

impl fmt::Display for RecordingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordingError::StartFailed(msg) => write!(f, "Failed to start recording: {}", msg),
            RecordingError::StopFailed(msg) => write!(f, "Failed to stop recording: {}", msg),
            RecordingError::EncoderNotAvailable(msg) => write!(f, "Encoder not available: {}", msg),
            RecordingError::PipelineError(msg) => write!(f, "Pipeline error: {}", msg),
        }
    }
}

impl fmt::Display for PhotoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhotoError::NoFrameAvailable => write!(f, "No frame available for capture"),
            PhotoError::EncodingFailed(msg) => write!(f, "Encoding failed: {}", msg),
            PhotoError::SaveFailed(msg) => write!(f, "Save failed: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for SessionError {}
impl std::error::Error for DeviceError {}
impl std::error::Error for RecordingError {}
impl std::error::Error for PhotoError {}

impl From<DeviceError> for SessionError {
    fn from(err: DeviceError) -> Self {
        SessionError::Device(err)
    }
}

/// Platform failures all surface as device errors at the session boundary
impl From<BackendError> for DeviceError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::PermissionDenied(msg) => DeviceError::Denied(msg),
            BackendError::DeviceNotFound(msg) => DeviceError::NotFound(msg),
            BackendError::StreamEnded => DeviceError::NoActiveStream,
            other => DeviceError::Hardware(other.to_string()),
        }
    }
}

impl From<BackendError> for SessionError {
    fn from(err: BackendError) -> Self {
        SessionError::Device(err.into())
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        AppError::Camera(err)
    }
}

impl From<DeviceError> for AppError {
    fn from(err: DeviceError) -> Self {
        AppError::Camera(SessionError::Device(err))
    }
}

impl From<RecordingError> for AppError {
    fn from(err: RecordingError) -> Self {
        AppError::Recording(err)
    }
}

impl From<PhotoError> for AppError {
    fn from(err: PhotoError) -> Self {
        AppError::Photo(err)
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<std::io::Error> for PhotoError {
    fn from(err: std::io::Error) -> Self {
        PhotoError::SaveFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_errors_map_to_device_kinds() {
        let denied: SessionError = BackendError::PermissionDenied("busy".into()).into();
        assert_eq!(
            denied,
            SessionError::Device(DeviceError::Denied("busy".into()))
        );

        let missing: SessionError = BackendError::DeviceNotFound("cam9".into()).into();
        assert_eq!(
            missing,
            SessionError::Device(DeviceError::NotFound("cam9".into()))
        );

        let io: SessionError = BackendError::IoError("EIO".into()).into();
        assert!(matches!(io, SessionError::Device(DeviceError::Hardware(_))));
    }

    #[test]
    fn test_capability_message() {
        let err = SessionError::CapabilityUnsupported(Capability::Torch);
        assert_eq!(err.to_string(), "Torch not supported");
    }
}
