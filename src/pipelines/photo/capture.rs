// SPDX-License-Identifier: GPL-3.0-only

//! Compositing the live frame with the landmark overlay

use crate::backends::camera::VideoElement;
use crate::errors::PhotoError;
use crate::media::canvas::{self, Canvas, SharedCanvas};
use crate::pipelines::artifact::CaptureArtifact;
use tracing::info;

/// Redraw `target` from the current video frame and overlay
///
/// The frame is stretched to the target's size first, then the overlay on
/// top. Returns false when the video has no frame; `target` is left as it
/// was.
pub fn composite_into(target: &mut Canvas, video: &VideoElement, overlay: &SharedCanvas) -> bool {
    let Some(frame) = video.current_frame() else {
        return false;
    };
    if !target.draw_frame(&frame) {
        return false;
    }
    target.draw_canvas(&canvas::read(overlay));
    true
}

/// Fresh composite at overlay resolution
pub fn composite(video: &VideoElement, overlay: &SharedCanvas) -> Result<Canvas, PhotoError> {
    let (width, height) = canvas::read(overlay).dimensions();
    if width == 0 || height == 0 {
        return Err(PhotoError::NoFrameAvailable);
    }

    let mut target = Canvas::new(width, height);
    if !composite_into(&mut target, video, overlay) {
        return Err(PhotoError::NoFrameAvailable);
    }
    Ok(target)
}

/// Take a still of what is on screen and encode it as `photo.png`
pub fn capture_photo(
    video: &VideoElement,
    overlay: &SharedCanvas,
) -> Result<CaptureArtifact, PhotoError> {
    let composite = composite(video, overlay)?;
    let bytes = super::encoding::encode_png(composite.image())?;
    info!(
        width = composite.width(),
        height = composite.height(),
        size = bytes.len(),
        "Photo captured"
    );
    Ok(CaptureArtifact::photo(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::types::CameraFrame;
    use image::Rgba;

    fn video_with(width: u32, height: u32, rgb: [u8; 3]) -> VideoElement {
        let video = VideoElement::new();
        let data = [rgb[0], rgb[1], rgb[2], 255].repeat((width * height) as usize);
        video
            .attach()
            .publish(CameraFrame::from_rgba(width, height, data));
        video
    }

    #[test]
    fn test_no_frame_is_an_error() {
        let overlay = canvas::shared(4, 4);
        assert!(matches!(
            capture_photo(&VideoElement::new(), &overlay),
            Err(PhotoError::NoFrameAvailable)
        ));
    }

    #[test]
    fn test_zero_sized_overlay_is_an_error() {
        let video = video_with(4, 4, [1, 2, 3]);
        assert!(matches!(
            composite(&video, &canvas::shared(0, 0)),
            Err(PhotoError::NoFrameAvailable)
        ));
    }

    #[test]
    fn test_composite_uses_overlay_resolution() {
        let video = video_with(16, 12, [0, 0, 255]);
        let overlay = canvas::shared(8, 6);
        canvas::write(&overlay).stroke_ring(2.0, 2.0, 1.0, 1.0, [0, 255, 0, 255]);

        let result = composite(&video, &overlay).unwrap();
        assert_eq!(result.dimensions(), (8, 6));
        // Far corner is outside the ring, so the video shows through
        assert_eq!(result.image().get_pixel(7, 5), &Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn test_photo_artifact() {
        let video = video_with(4, 4, [200, 100, 50]);
        let overlay = canvas::shared(4, 4);

        let artifact = capture_photo(&video, &overlay).unwrap();
        assert_eq!(artifact.file_name(), "photo.png");

        let decoded = image::load_from_memory(&artifact.bytes).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (4, 4));
        assert_eq!(decoded.get_pixel(0, 0), &Rgba([200, 100, 50, 255]));
    }
}
