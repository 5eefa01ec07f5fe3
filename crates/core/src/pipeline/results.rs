use serde::Serialize;

use crate::keypoints::domain::keypoint::{self, Keypoint};
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// Confidence reported for every face until the detector exposes scores.
pub const DEFAULT_CONFIDENCE: f32 = 1.0;

/// Keypoints for one detected face, all in original-image pixels.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FaceKeypointsResult {
    pub bounding_box: BoundingBox,
    pub keypoints: Vec<Keypoint>,
    pub confidence: f32,
}

impl FaceKeypointsResult {
    pub fn new(bounding_box: BoundingBox, keypoints: Vec<Keypoint>) -> Self {
        Self {
            bounding_box,
            keypoints,
            confidence: DEFAULT_CONFIDENCE,
        }
    }

    /// `[x0, y0, x1, y1, …]`
    pub fn keypoints_flat(&self) -> Vec<f32> {
        keypoint::flatten(&self.keypoints)
    }
}

/// Outcome of processing one image: the decoded image plus every face found,
/// in detector order.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineResult {
    pub image: Frame,
    pub faces: Vec<FaceKeypointsResult>,
}

impl PipelineResult {
    pub fn n_faces(&self) -> usize {
        self.faces.len()
    }

    pub fn keypoints_flat(&self) -> Vec<Vec<f32>> {
        self.faces.iter().map(|f| f.keypoints_flat()).collect()
    }
}
