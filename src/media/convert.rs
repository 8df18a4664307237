// SPDX-License-Identifier: GPL-3.0-only

//! Pixel format conversion to RGBA
//!
//! Camera sensors hand out packed YUV, RGB24 or MJPEG; everything
//! downstream of a platform works on RGBA.

/// Convert YUYV (YUV 4:2:2) to RGBA
///
/// YUYV format: Y0 U0 Y1 V0 - each 4-byte group encodes 2 pixels.
pub fn yuyv_to_rgba(data: &[u8], width: u32, height: u32) -> Vec<u8> {
    let pixel_count = (width * height) as usize;
    let mut rgba = Vec::with_capacity(pixel_count * 4);

    for chunk in data.chunks_exact(4) {
        let [y0, u, y1, v] = [chunk[0], chunk[1], chunk[2], chunk[3]];
        for luma in [y0, y1] {
            if rgba.len() >= pixel_count * 4 {
                break;
            }
            let (r, g, b) = yuv_to_rgb(luma, u, v);
            rgba.extend_from_slice(&[r, g, b, 255]);
        }
    }

    // Short buffers from truncated frames are padded with black
    rgba.resize(pixel_count * 4, 0);
    rgba
}

/// Convert UYVY (YUV 4:2:2) to RGBA
///
/// UYVY format: U0 Y0 V0 Y1 - each 4-byte group encodes 2 pixels.
pub fn uyvy_to_rgba(data: &[u8], width: u32, height: u32) -> Vec<u8> {
    let pixel_count = (width * height) as usize;
    let mut rgba = Vec::with_capacity(pixel_count * 4);

    for chunk in data.chunks_exact(4) {
        let [u, y0, v, y1] = [chunk[0], chunk[1], chunk[2], chunk[3]];
        for luma in [y0, y1] {
            if rgba.len() >= pixel_count * 4 {
                break;
            }
            let (r, g, b) = yuv_to_rgb(luma, u, v);
            rgba.extend_from_slice(&[r, g, b, 255]);
        }
    }

    rgba.resize(pixel_count * 4, 0);
    rgba
}

/// Convert packed RGB24 to RGBA
pub fn rgb_to_rgba(rgb: &[u8]) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(rgb.len() / 3 * 4);
    for px in rgb.chunks_exact(3) {
        rgba.extend_from_slice(&[px[0], px[1], px[2], 255]);
    }
    rgba
}

/// Decode one MJPEG frame to RGBA, returning its dimensions
pub fn mjpeg_to_rgba(data: &[u8]) -> Option<(u32, u32, Vec<u8>)> {
    let decoded = image::load_from_memory_with_format(data, image::ImageFormat::Jpeg).ok()?;
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    Some((width, height, rgba.into_raw()))
}

/// Convert YUV (BT.601) to RGB
fn yuv_to_rgb(y: u8, u: u8, v: u8) -> (u8, u8, u8) {
    let y = y as f32;
    let u = u as f32 - 128.0;
    let v = v as f32 - 128.0;

    let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
    let g = (y - 0.344136 * u - 0.714136 * v).clamp(0.0, 255.0) as u8;
    let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;

    (r, g, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yuyv_gray() {
        // Neutral chroma yields gray pixels equal to luma
        let data = [100u8, 128, 200, 128];
        let rgba = yuyv_to_rgba(&data, 2, 1);
        assert_eq!(rgba, vec![100, 100, 100, 255, 200, 200, 200, 255]);
    }

    #[test]
    fn test_yuyv_pads_truncated_frame() {
        let rgba = yuyv_to_rgba(&[50, 128, 50, 128], 2, 2);
        assert_eq!(rgba.len(), 16);
        assert_eq!(&rgba[8..], &[0; 8]);
    }

    #[test]
    fn test_uyvy_gray() {
        let data = [128u8, 10, 128, 20];
        let rgba = uyvy_to_rgba(&data, 2, 1);
        assert_eq!(rgba, vec![10, 10, 10, 255, 20, 20, 20, 255]);
    }

    #[test]
    fn test_rgb_to_rgba() {
        assert_eq!(rgb_to_rgba(&[1, 2, 3, 4, 5, 6]), vec![1, 2, 3, 255, 4, 5, 6, 255]);
    }

    #[test]
    fn test_mjpeg_rejects_garbage() {
        assert!(mjpeg_to_rgba(&[0, 1, 2, 3]).is_none());
    }
}
