// SPDX-License-Identifier: MPL-2.0

//! Pixel surfaces and color conversion
//!
//! Camera frames arrive as YUYV, UYVY, MJPEG or packed RGB and are turned
//! into RGBA by [`convert`] before they reach the video element. Everything
//! downstream draws on a [`canvas::Canvas`]: the landmark overlay, the QR
//! scan buffer and the capture composites.
//!
//! # Modules
//!
//! - [`canvas`]: RGBA drawing surface shared between loops
//! - [`convert`]: Packed YUV and MJPEG to RGBA conversion

pub mod canvas;
pub mod convert;

pub use canvas::{Canvas, SharedCanvas};
