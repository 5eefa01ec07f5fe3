use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::detection::domain::face_classifier::{FaceClassifier, ScanParams};
use crate::shared::bounding_box::BoundingBox;
use crate::shared::constants::MIN_FACE_SIZE;
use crate::shared::error::KeypointsError;
use crate::shared::frame::Frame;

/// Score each merged neighbour contributes to a SeetaFace detection.
const SCORE_PER_NEIGHBOR: f64 = 0.4;

/// Legal range of the engine's image pyramid step.
const MIN_PYRAMID_STEP: f32 = 0.01;
const MAX_PYRAMID_STEP: f32 = 0.99;

const SLIDE_WINDOW_STEP: u32 = 4;

/// Face classifier backed by the `rustface` crate (SeetaFace funnel cascade).
///
/// The model is parsed once at construction and shared by every scan.
pub struct SeetaFaceClassifier {
    model: rustface::Model,
    min_face_size: u32,
}

impl SeetaFaceClassifier {
    /// Load a SeetaFace model file (e.g. `seeta_fd_frontal_v1.0.bin`).
    pub fn new(model_path: &Path, min_face_size: u32) -> Result<Self, KeypointsError> {
        if !model_path.exists() {
            return Err(KeypointsError::detector_load(
                model_path,
                "classifier file not found",
            ));
        }
        let file = File::open(model_path)
            .map_err(|e| KeypointsError::detector_load(model_path, e))?;
        let model = rustface::read_model(BufReader::new(file))
            .map_err(|e| KeypointsError::detector_load(model_path, e))?;

        log::info!("Loaded face classifier from {}", model_path.display());
        Ok(Self {
            model,
            min_face_size: min_face_size.max(MIN_FACE_SIZE),
        })
    }
}

/// Pyramid step for the engine, which shrinks the image instead of growing
/// the window.
fn pyramid_step(scale_factor: f64) -> f32 {
    ((1.0 / scale_factor) as f32).clamp(MIN_PYRAMID_STEP, MAX_PYRAMID_STEP)
}

fn score_threshold(min_neighbors: u32) -> f64 {
    min_neighbors as f64 * SCORE_PER_NEIGHBOR
}

impl FaceClassifier for SeetaFaceClassifier {
    fn detect_multi_scale(
        &mut self,
        gray: &Frame,
        params: &ScanParams,
    ) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>> {
        if gray.channels() != 1 {
            return Err(format!("expected 1-channel frame, got {}", gray.channels()).into());
        }
        // The engine cannot build a pyramid for images smaller than its window.
        if gray.width() < self.min_face_size || gray.height() < self.min_face_size {
            return Ok(Vec::new());
        }

        let mut detector = rustface::create_detector_with_model(self.model.clone());
        detector.set_min_face_size(self.min_face_size);
        detector.set_score_thresh(score_threshold(params.min_neighbors));
        detector.set_pyramid_scale_factor(pyramid_step(params.scale_factor));
        detector.set_slide_window_step(SLIDE_WINDOW_STEP, SLIDE_WINDOW_STEP);

        let faces = detector.detect(&rustface::ImageData::new(
            gray.data(),
            gray.width(),
            gray.height(),
        ));

        Ok(faces
            .iter()
            .map(|face| {
                let bbox = face.bbox();
                BoundingBox::new(bbox.x(), bbox.y(), bbox.width(), bbox.height())
            })
            .collect())
    }
}
