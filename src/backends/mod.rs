// SPDX-License-Identifier: MPL-2.0

//! Backend abstraction layer for camera capture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │           CaptureSession / App               │
//! └────────────────────┬────────────────────────┘
//!                      │ MediaPlatform / MediaStream
//! ┌────────────────────┴────────────────────────┐
//! │  ┌─────────────────┐  ┌──────────────────┐  │
//! │  │ Virtual Camera  │  │      V4L2        │  │
//! │  │ (pattern/image) │  │  (/dev/video*)   │  │
//! │  └─────────────────┘  └──────────────────┘  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`camera`]: Platform traits, session, enumeration and the V4L2 backend
//! - [`virtual_camera`]: Synthetic devices for tests and machines without a camera

pub mod camera;
pub mod virtual_camera;
