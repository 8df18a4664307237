// SPDX-License-Identifier: GPL-3.0-only

//! Landmark markers on the overlay canvas

use super::landmarks::{Keypoint, LandmarkResult};
use crate::app::readout::Readout;
use crate::constants::overlay;
use crate::media::canvas::{self, SharedCanvas};
use tracing::trace;

/// How keypoint markers are drawn
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerStyle {
    /// Keypoints must be strictly more visible than this
    pub threshold: f32,
    pub radius: f32,
    pub line_width: f32,
    pub color: [u8; 4],
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self {
            threshold: overlay::VISIBILITY_THRESHOLD,
            radius: overlay::MARKER_RADIUS,
            line_width: overlay::MARKER_LINE_WIDTH,
            color: overlay::MARKER_COLOR,
        }
    }
}

/// Redraws the overlay and the detected-name readout from landmark results
#[derive(Clone)]
pub struct OverlayRenderer {
    overlay: SharedCanvas,
    readout: Readout,
    style: MarkerStyle,
}

impl OverlayRenderer {
    pub fn new(overlay: SharedCanvas, readout: Readout, style: MarkerStyle) -> Self {
        Self {
            overlay,
            readout,
            style,
        }
    }

    /// Replace the overlay contents with markers for `result`
    ///
    /// Returns the keypoints that were drawn.
    pub fn on_landmarks(&self, result: &LandmarkResult) -> Vec<Keypoint> {
        let mut drawn = Vec::new();
        {
            let mut canvas = canvas::write(&self.overlay);
            canvas.clear();
            let (width, height) = (canvas.width() as f32, canvas.height() as f32);

            for keypoint in Keypoint::ALL {
                let Some(landmark) = result.keypoint(keypoint) else {
                    continue;
                };
                if landmark.visibility <= self.style.threshold {
                    continue;
                }
                canvas.stroke_ring(
                    landmark.x * width,
                    landmark.y * height,
                    self.style.radius,
                    self.style.line_width,
                    self.style.color,
                );
                drawn.push(keypoint);
            }
        }

        let text = if drawn.is_empty() {
            overlay::NO_DETECTION.to_string()
        } else {
            drawn
                .iter()
                .map(|kp| kp.display_name())
                .collect::<Vec<_>>()
                .join(", ")
        };
        trace!(detected = %text, "Overlay redrawn");
        self.readout.set(text);
        drawn
    }

    pub fn overlay(&self) -> &SharedCanvas {
        &self.overlay
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipelines::annotation::landmarks::Landmark;

    fn renderer(width: u32, height: u32) -> (OverlayRenderer, Readout) {
        let readout = Readout::new("");
        let renderer = OverlayRenderer::new(
            canvas::shared(width, height),
            readout.clone(),
            MarkerStyle::default(),
        );
        (renderer, readout)
    }

    fn eye(x: f32, y: f32, visibility: f32) -> Landmark {
        Landmark { x, y, visibility }
    }

    #[test]
    fn test_only_visible_keypoints_drawn() {
        let (renderer, readout) = renderer(200, 100);
        let result = LandmarkResult::with_keypoints(&[
            (Keypoint::LeftEye, eye(0.25, 0.5, 0.9)),
            (Keypoint::RightEye, eye(0.75, 0.5, 0.3)),
        ]);

        assert_eq!(renderer.on_landmarks(&result), vec![Keypoint::LeftEye]);
        assert_eq!(readout.get(), "Left Eye");

        let overlay = canvas::read(renderer.overlay());
        // Ring around (50, 50) at radius 10
        assert!(overlay.image().get_pixel(60, 50).0[3] > 0);
        // Nothing near the right eye
        assert_eq!(overlay.image().get_pixel(160, 50).0[3], 0);
    }

    #[test]
    fn test_both_eyes_listed_in_order() {
        let (renderer, readout) = renderer(100, 100);
        let result = LandmarkResult::with_keypoints(&[
            (Keypoint::RightEye, eye(0.6, 0.4, 0.8)),
            (Keypoint::LeftEye, eye(0.4, 0.4, 0.95)),
        ]);
        renderer.on_landmarks(&result);
        assert_eq!(readout.get(), "Left Eye, Right Eye");
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let (renderer, readout) = renderer(50, 50);
        let result = LandmarkResult::with_keypoints(&[(Keypoint::LeftEye, eye(0.5, 0.5, 0.5))]);
        assert!(renderer.on_landmarks(&result).is_empty());
        assert_eq!(readout.get(), "None");
    }

    #[test]
    fn test_empty_result_clears_previous_markers() {
        let (renderer, readout) = renderer(100, 100);
        renderer.on_landmarks(&LandmarkResult::with_keypoints(&[(
            Keypoint::LeftEye,
            eye(0.5, 0.5, 1.0),
        )]));
        renderer.on_landmarks(&LandmarkResult::default());

        assert_eq!(readout.get(), "None");
        assert!(canvas::read(renderer.overlay()).pixels().iter().all(|&b| b == 0));
    }
}
