// SPDX-License-Identifier: MPL-2.0

//! eyecam - camera utility with an eye landmark overlay and QR scanning
//!
//! This library previews a live camera feed, marks the eyes found by an
//! external pose estimator, scans QR codes and captures photos and
//! videos of the annotated feed.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`app`]: Application controller, user controls and readouts
//! - [`backends`]: Camera platforms, capture session and enumeration
//! - [`media`]: Drawing surfaces and pixel format conversion
//! - [`pipelines`]: Annotation, photo and video pipelines
//! - [`config`]: User configuration handling
//! - [`storage`]: Saving capture artifacts
//! - [`terminal`]: Interactive terminal viewer
//!
//! # Example
//!
//! ```ignore
//! let config = eyecam::Config::load();
//! let services = eyecam::AppServices::from_config(&config)?;
//! let mut app = eyecam::CameraApp::new(config, services);
//! app.start().await?;
//! let photo = app.capture_photo()?;
//! app.save_artifact(&photo).await?;
//! ```

pub mod app;
pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod flash;
pub mod media;
pub mod pipelines;
pub mod storage;
pub mod terminal;

// Re-export commonly used types
pub use app::frame_processor::{QrPayload, ScanOutcome};
pub use app::{AppServices, CameraApp, ControlState, Readouts};
pub use config::Config;
pub use constants::BitratePreset;
pub use pipelines::{ArtifactKind, CaptureArtifact};
