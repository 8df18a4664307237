// SPDX-License-Identifier: GPL-3.0-only

//! Frame sources for virtual cameras
//!
//! A virtual camera either renders an animated test pattern, fills a solid
//! color, or replays a still image loaded from disk.

use crate::backends::camera::types::{BackendError, BackendResult, CameraFrame};
use crate::constants::file_formats;
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use std::path::{Path, PathBuf};
use tracing::info;

/// SMPTE-style bar colors
const BARS: [[u8; 3]; 7] = [
    [192, 192, 192],
    [192, 192, 0],
    [0, 192, 192],
    [0, 192, 0],
    [192, 0, 192],
    [192, 0, 0],
    [0, 0, 192],
];

/// What a virtual camera shows
#[derive(Debug, Clone, PartialEq)]
pub enum FrameSource {
    /// Color bars that scroll one column per frame
    TestPattern,
    /// A single opaque color
    Solid([u8; 3]),
    /// A still image; the device takes the image's resolution
    Image(PathBuf),
}

/// Load an image file as a tightly packed RGBA frame
pub fn load_image_as_frame(path: &Path) -> BackendResult<CameraFrame> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    if !file_formats::is_image_extension(extension) {
        return Err(BackendError::FormatNotSupported(format!(
            "Unsupported file format: {}",
            path.display()
        )));
    }

    info!(path = %path.display(), "Loading image file");
    let image = image::open(path).map_err(|e| match e {
        image::ImageError::IoError(io) => BackendError::from(io),
        other => BackendError::Other(format!(
            "Failed to load image '{}': {}",
            path.display(),
            other
        )),
    })?;

    Ok(CameraFrame::from_image(image.to_rgba8()))
}

/// Render one frame of a generated source
pub fn render(source: &FrameSource, width: u32, height: u32, frame_index: u64) -> RgbaImage {
    match source {
        FrameSource::Solid([r, g, b]) => {
            RgbaImage::from_pixel(width, height, Rgba([*r, *g, *b, 255]))
        }
        // Image sources are loaded once at open time; render a neutral
        // placeholder if asked directly
        FrameSource::Image(_) => RgbaImage::from_pixel(width, height, Rgba([16, 16, 16, 255])),
        FrameSource::TestPattern => {
            let band = (width / BARS.len() as u32).max(1);
            let offset = (frame_index % width.max(1) as u64) as u32;
            RgbaImage::from_fn(width, height, |x, _| {
                let column = (x + offset) % width.max(1);
                let [r, g, b] = BARS[((column / band) as usize).min(BARS.len() - 1)];
                Rgba([r, g, b, 255])
            })
        }
    }
}

/// Simulate optical zoom by cropping the centre and scaling back up
pub fn apply_zoom(image: &RgbaImage, zoom: f64) -> RgbaImage {
    if zoom <= 1.0 {
        return image.clone();
    }
    let (width, height) = image.dimensions();
    let crop_w = ((width as f64 / zoom).round() as u32).clamp(1, width);
    let crop_h = ((height as f64 / zoom).round() as u32).clamp(1, height);
    let x = (width - crop_w) / 2;
    let y = (height - crop_h) / 2;

    let cropped = imageops::crop_imm(image, x, y, crop_w, crop_h).to_image();
    imageops::resize(&cropped, width, height, FilterType::Triangle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_dimensions_and_scroll() {
        let first = render(&FrameSource::TestPattern, 70, 10, 0);
        let next = render(&FrameSource::TestPattern, 70, 10, 10);
        assert_eq!(first.dimensions(), (70, 10));
        // Shifting by one band moves the second bar into column 0
        assert_eq!(next.get_pixel(0, 0), first.get_pixel(10, 0));
    }

    #[test]
    fn test_solid_fill() {
        let image = render(&FrameSource::Solid([1, 2, 3]), 4, 4, 0);
        assert!(image.pixels().all(|p| p.0 == [1, 2, 3, 255]));
    }

    #[test]
    fn test_zoom_preserves_dimensions() {
        let image = render(&FrameSource::TestPattern, 64, 32, 0);
        assert_eq!(apply_zoom(&image, 2.5).dimensions(), (64, 32));
        assert_eq!(apply_zoom(&image, 1.0), image);
    }

    #[test]
    fn test_load_image_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("still.png");
        RgbaImage::from_pixel(3, 2, Rgba([9, 8, 7, 255]))
            .save(&path)
            .unwrap();

        let frame = load_image_as_frame(&path).unwrap();
        assert_eq!((frame.width, frame.height), (3, 2));
        assert_eq!(&frame.data[..4], &[9, 8, 7, 255]);
    }

    #[test]
    fn test_load_rejects_unknown_extension() {
        assert!(matches!(
            load_image_as_frame(Path::new("clip.webm")),
            Err(BackendError::FormatNotSupported(_))
        ));
    }

    #[test]
    fn test_load_missing_file_is_not_found() {
        assert!(matches!(
            load_image_as_frame(Path::new("/nonexistent/eyecam/still.png")),
            Err(BackendError::DeviceNotFound(_))
        ));
    }
}
