// SPDX-License-Identifier: MPL-2.0

//! Frame sampling for QR scanning
//!
//! The scan loop samples the live frame on a fixed timer, independently of
//! the annotation loop's frame-driven cadence.

pub mod scanner;
pub mod tasks;
pub mod types;

pub use scanner::{BrowserNavigator, Navigator, ScanLoop, Scanner};
pub use tasks::{QrDecoder, RqrrDecoder};
pub use types::{QrPayload, ScanOutcome, is_navigable_url};
