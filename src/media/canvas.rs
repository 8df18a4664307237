// SPDX-License-Identifier: MPL-2.0

//! RGBA drawing surfaces
//!
//! A [`Canvas`] is the native stand-in for an HTML canvas: a straight-alpha
//! RGBA buffer that can receive a scaled camera frame, another canvas
//! composited on top, and anti-aliased vector strokes (via tiny-skia).

use crate::backends::camera::types::CameraFrame;
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tiny_skia::{ColorU8, IntSize, Paint, PathBuilder, Pixmap, Stroke, Transform};

/// Canvas shared between a single writer and any number of readers
pub type SharedCanvas = Arc<RwLock<Canvas>>;

/// Create an empty shared canvas
pub fn shared(width: u32, height: u32) -> SharedCanvas {
    Arc::new(RwLock::new(Canvas::new(width, height)))
}

/// Lock a shared canvas for reading; a panicked writer leaves pixels usable
pub fn read(canvas: &SharedCanvas) -> RwLockReadGuard<'_, Canvas> {
    canvas.read().unwrap_or_else(PoisonError::into_inner)
}

/// Lock a shared canvas for writing
pub fn write(canvas: &SharedCanvas) -> RwLockWriteGuard<'_, Canvas> {
    canvas.write().unwrap_or_else(PoisonError::into_inner)
}

/// Straight-alpha RGBA drawing surface
#[derive(Debug, Clone)]
pub struct Canvas {
    image: RgbaImage,
}

impl Canvas {
    /// Create a fully transparent canvas
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width, height),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Resize the surface; like setting a canvas' width/height, this discards its content
    pub fn resize(&mut self, width: u32, height: u32) {
        self.image = RgbaImage::new(width, height);
    }

    /// Clear every pixel to transparent
    pub fn clear(&mut self) {
        for pixel in self.image.pixels_mut() {
            *pixel = Rgba([0, 0, 0, 0]);
        }
    }

    /// Draw a camera frame stretched over the whole canvas
    ///
    /// Returns false when the frame has no pixels yet.
    pub fn draw_frame(&mut self, frame: &CameraFrame) -> bool {
        if self.image.width() == 0 || self.image.height() == 0 {
            return false;
        }
        let Some(source) = frame.to_rgba_image() else {
            return false;
        };

        if source.dimensions() == self.image.dimensions() {
            self.image = source;
        } else {
            let scaled = imageops::resize(
                &source,
                self.image.width(),
                self.image.height(),
                FilterType::Triangle,
            );
            imageops::overlay(&mut self.image, &scaled, 0, 0);
        }
        true
    }

    /// Composite another canvas on top of this one, stretched to fit
    pub fn draw_canvas(&mut self, other: &Canvas) {
        if other.width() == 0 || other.height() == 0 {
            return;
        }
        if other.dimensions() == self.dimensions() {
            imageops::overlay(&mut self.image, &other.image, 0, 0);
        } else {
            let scaled = imageops::resize(
                &other.image,
                self.image.width(),
                self.image.height(),
                FilterType::Triangle,
            );
            imageops::overlay(&mut self.image, &scaled, 0, 0);
        }
    }

    /// Stroke a circle outline centred at (`cx`, `cy`)
    pub fn stroke_ring(&mut self, cx: f32, cy: f32, radius: f32, line_width: f32, color: [u8; 4]) {
        let Some(path) = PathBuilder::from_circle(cx, cy, radius) else {
            return;
        };

        let mut paint = Paint::default();
        paint.set_color_rgba8(color[0], color[1], color[2], color[3]);
        paint.anti_alias = true;

        let stroke = Stroke {
            width: line_width,
            ..Stroke::default()
        };

        with_pixmap(&mut self.image, |pixmap| {
            pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
        });
    }

    /// Raw RGBA pixels, tightly packed
    pub fn pixels(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }
}

/// Run a tiny-skia drawing closure against a straight-alpha image
///
/// tiny-skia works in premultiplied alpha, so pixels are converted on the
/// way in and back out.
fn with_pixmap(image: &mut RgbaImage, f: impl FnOnce(&mut Pixmap)) {
    let (width, height) = image.dimensions();
    let Some(size) = IntSize::from_wh(width, height) else {
        return;
    };

    let mut data = Vec::with_capacity(image.as_raw().len());
    for pixel in image.pixels() {
        let [r, g, b, a] = pixel.0;
        let premultiplied = ColorU8::from_rgba(r, g, b, a).premultiply();
        data.extend_from_slice(&[
            premultiplied.red(),
            premultiplied.green(),
            premultiplied.blue(),
            premultiplied.alpha(),
        ]);
    }

    let Some(mut pixmap) = Pixmap::from_vec(data, size) else {
        return;
    };

    f(&mut pixmap);

    for (dst, src) in image.pixels_mut().zip(pixmap.pixels()) {
        let color = src.demultiply();
        *dst = Rgba([color.red(), color.green(), color.blue(), color.alpha()]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_frame(width: u32, height: u32, rgba: [u8; 4]) -> CameraFrame {
        let data = rgba
            .iter()
            .copied()
            .cycle()
            .take((width * height * 4) as usize)
            .collect();
        CameraFrame::from_rgba(width, height, data)
    }

    #[test]
    fn test_resize_discards_content() {
        let mut canvas = Canvas::new(4, 4);
        canvas.draw_frame(&solid_frame(4, 4, [10, 20, 30, 255]));
        canvas.resize(8, 2);
        assert_eq!(canvas.dimensions(), (8, 2));
        assert!(canvas.pixels().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_draw_frame_scales_to_canvas() {
        let mut canvas = Canvas::new(4, 2);
        assert!(canvas.draw_frame(&solid_frame(8, 4, [200, 100, 50, 255])));
        assert_eq!(canvas.dimensions(), (4, 2));
        assert_eq!(canvas.image().get_pixel(3, 1).0, [200, 100, 50, 255]);
    }

    #[test]
    fn test_draw_frame_rejects_empty_frame() {
        let mut canvas = Canvas::new(4, 4);
        assert!(!canvas.draw_frame(&CameraFrame::from_rgba(0, 0, Vec::new())));
    }

    #[test]
    fn test_ring_has_transparent_center() {
        let mut canvas = Canvas::new(64, 64);
        canvas.stroke_ring(32.0, 32.0, 10.0, 3.0, [0, 255, 0, 255]);

        // On the ring
        assert!(canvas.image().get_pixel(42, 32).0[3] > 0);
        assert!(canvas.image().get_pixel(42, 32).0[1] > 200);
        // Center and far corner untouched
        assert_eq!(canvas.image().get_pixel(32, 32).0[3], 0);
        assert_eq!(canvas.image().get_pixel(0, 0).0[3], 0);
    }

    #[test]
    fn test_draw_canvas_keeps_background_under_transparency() {
        let mut composite = Canvas::new(16, 16);
        composite.draw_frame(&solid_frame(16, 16, [0, 0, 255, 255]));

        let mut overlay = Canvas::new(16, 16);
        overlay.stroke_ring(8.0, 8.0, 4.0, 2.0, [0, 255, 0, 255]);

        composite.draw_canvas(&overlay);
        assert_eq!(composite.image().get_pixel(0, 0).0, [0, 0, 255, 255]);
        assert!(composite.image().get_pixel(12, 8).0[1] > 100);
    }
}
