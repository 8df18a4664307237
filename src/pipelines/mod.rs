// SPDX-License-Identifier: MPL-2.0

//! Consumers of the live frame
//!
//! ```text
//! VideoElement ─┬─▶ Annotation Loop ─▶ Overlay canvas ─┐
//!               │                                      │
//!               └─▶ Photo / Recorder ◀─────────────────┘
//!                        │
//!                        └─▶ photo.png / video.webm
//! ```
//!
//! The overlay is written only by the annotation loop; capture and
//! recording only read it.
//!
//! # Modules
//!
//! - [`annotation`]: pose estimation and landmark markers
//! - [`photo`]: still composites encoded as PNG
//! - [`video`]: recorded composites encoded as WebM

pub mod annotation;
pub mod artifact;
pub mod photo;
pub mod video;

pub use artifact::{ArtifactKind, CaptureArtifact};
