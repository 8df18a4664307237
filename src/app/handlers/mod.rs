// SPDX-License-Identifier: GPL-3.0-only

//! User control handlers
//!
//! Handlers are grouped by domain; each one is an `impl CameraApp` block.

pub mod camera;
pub mod capture;
