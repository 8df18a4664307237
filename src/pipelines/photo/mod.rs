// SPDX-License-Identifier: MPL-2.0

//! Photo capture
//!
//! ```text
//! VideoElement ─┐
//!               ├─▶ Composite (overlay resolution) ─▶ PNG ─▶ photo.png
//! Overlay ──────┘
//! ```
//!
//! Capture is synchronous: the composite reflects exactly the frame and
//! overlay on screen when the control was pressed.

pub mod capture;
pub mod encoding;

pub use capture::{capture_photo, composite, composite_into};
pub use encoding::encode_png;
