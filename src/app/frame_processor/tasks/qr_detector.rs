// SPDX-License-Identifier: GPL-3.0-only

//! QR code decoding
//!
//! Frames are converted to grayscale, downscaled if large, and handed to
//! rqrr. Only the first code that decodes is reported.

use crate::constants::scan::MAX_DECODE_DIMENSION;
use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbaImage};
use tracing::{debug, trace};

/// Extracts a text payload from raw RGBA pixels
pub trait QrDecoder: Send + Sync {
    /// `rgba` is tightly packed, `width * height * 4` bytes
    fn decode(&self, rgba: &[u8], width: u32, height: u32) -> Option<String>;
}

/// Decoder backed by rqrr
pub struct RqrrDecoder {
    /// Frames are downscaled so neither side exceeds this
    max_dimension: u32,
}

impl Default for RqrrDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl RqrrDecoder {
    pub fn new() -> Self {
        Self {
            max_dimension: MAX_DECODE_DIMENSION,
        }
    }

    pub fn with_max_dimension(max_dimension: u32) -> Self {
        Self { max_dimension }
    }
}

impl QrDecoder for RqrrDecoder {
    fn decode(&self, rgba: &[u8], width: u32, height: u32) -> Option<String> {
        let start = std::time::Instant::now();
        let image = RgbaImage::from_raw(width, height, rgba.to_vec())?;

        let longest = width.max(height);
        let image = if self.max_dimension > 0 && longest > self.max_dimension {
            let scale = longest as f32 / self.max_dimension as f32;
            let new_width = ((width as f32 / scale) as u32).max(1);
            let new_height = ((height as f32 / scale) as u32).max(1);
            imageops::resize(&image, new_width, new_height, FilterType::Triangle)
        } else {
            image
        };
        let gray = DynamicImage::ImageRgba8(image).to_luma8();

        let mut prepared = rqrr::PreparedImage::prepare(gray);
        let grids = prepared.detect_grids();
        trace!(
            grids = grids.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "QR grid detection"
        );

        for grid in grids {
            match grid.decode() {
                Ok((_, content)) => {
                    debug!(content = %content, "Decoded QR code");
                    return Some(content);
                }
                Err(e) => debug!(error = ?e, "Found QR grid but failed to decode"),
            }
        }
        None
    }
}

/// Renders `text` as a black-on-white QR code with a four module quiet zone
#[cfg(test)]
pub(crate) fn render_qr(text: &str, module_px: u32) -> RgbaImage {
    let code = qrcode::QrCode::new(text.as_bytes()).expect("payload fits a QR code");
    let modules = code.width() as u32;
    let colors = code.to_colors();
    let side = (modules + 8) * module_px;

    RgbaImage::from_fn(side, side, |x, y| {
        let (mx, my) = (x / module_px, y / module_px);
        let dark = (4..modules + 4).contains(&mx)
            && (4..modules + 4).contains(&my)
            && colors[((my - 4) * modules + (mx - 4)) as usize] == qrcode::Color::Dark;
        if dark {
            image::Rgba([0, 0, 0, 255])
        } else {
            image::Rgba([255, 255, 255, 255])
        }
    })
}
