// SPDX-License-Identifier: GPL-3.0-only

//! Pose landmark data returned by an estimator

use serde::{Deserialize, Serialize};

/// Keypoints drawn on the overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keypoint {
    LeftEye,
    RightEye,
}

impl Keypoint {
    /// Drawn in this order; the readout lists names in the same order
    pub const ALL: [Keypoint; 2] = [Keypoint::LeftEye, Keypoint::RightEye];

    /// Index in the 33-point body pose topology
    pub fn landmark_index(self) -> usize {
        match self {
            Keypoint::LeftEye => 2,
            Keypoint::RightEye => 5,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Keypoint::LeftEye => "Left Eye",
            Keypoint::RightEye => "Right Eye",
        }
    }
}

impl std::fmt::Display for Keypoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// One landmark in normalized image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    /// 0.0 = left edge, 1.0 = right edge
    pub x: f32,
    /// 0.0 = top edge, 1.0 = bottom edge
    pub y: f32,
    /// Estimator confidence that the point is visible
    #[serde(default)]
    pub visibility: f32,
}

/// Landmarks for one frame, addressed by topology index
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LandmarkResult {
    #[serde(default)]
    pub landmarks: Vec<Landmark>,
}

impl LandmarkResult {
    pub fn new(landmarks: Vec<Landmark>) -> Self {
        Self { landmarks }
    }

    pub fn get(&self, index: usize) -> Option<&Landmark> {
        self.landmarks.get(index)
    }

    pub fn keypoint(&self, keypoint: Keypoint) -> Option<&Landmark> {
        self.get(keypoint.landmark_index())
    }

    /// Build a result with only the given keypoints set; other slots are invisible
    pub fn with_keypoints(points: &[(Keypoint, Landmark)]) -> Self {
        let len = points
            .iter()
            .map(|(kp, _)| kp.landmark_index() + 1)
            .max()
            .unwrap_or(0);
        let mut landmarks = vec![
            Landmark {
                x: 0.0,
                y: 0.0,
                visibility: 0.0,
            };
            len
        ];
        for (kp, landmark) in points {
            landmarks[kp.landmark_index()] = *landmark;
        }
        Self { landmarks }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypoint_indices() {
        assert_eq!(Keypoint::LeftEye.landmark_index(), 2);
        assert_eq!(Keypoint::RightEye.landmark_index(), 5);
    }

    #[test]
    fn test_missing_visibility_defaults_to_zero() {
        let lm: Landmark = serde_json::from_str(r#"{"x":0.5,"y":0.25}"#).unwrap();
        assert_eq!(lm.visibility, 0.0);
    }

    #[test]
    fn test_with_keypoints_places_by_index() {
        let eye = Landmark {
            x: 0.1,
            y: 0.2,
            visibility: 0.9,
        };
        let result = LandmarkResult::with_keypoints(&[(Keypoint::RightEye, eye)]);
        assert_eq!(result.landmarks.len(), 6);
        assert_eq!(result.keypoint(Keypoint::RightEye), Some(&eye));
        assert_eq!(result.keypoint(Keypoint::LeftEye).map(|l| l.visibility), Some(0.0));
    }
}
