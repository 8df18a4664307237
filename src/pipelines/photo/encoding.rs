// SPDX-License-Identifier: GPL-3.0-only

//! Still image encoding

use crate::errors::PhotoError;
use image::{ImageFormat, RgbaImage};
use std::io::Cursor;
use tracing::debug;

/// Encode a composite as PNG, keeping the alpha channel
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, PhotoError> {
    let start = std::time::Instant::now();
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| PhotoError::EncodingFailed(e.to_string()))?;

    debug!(
        width = image.width(),
        height = image.height(),
        size = bytes.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Encoded PNG"
    );
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_png_decodes_back() {
        let image = RgbaImage::from_pixel(4, 3, Rgba([10, 20, 30, 255]));
        let bytes = encode_png(&image).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");

        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (4, 3));
        assert_eq!(decoded.get_pixel(2, 1), &Rgba([10, 20, 30, 255]));
    }
}
