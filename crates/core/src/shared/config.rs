use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::shared::constants::{
    DEFAULT_CASCADE_PATH, DEFAULT_IMAGE_SIZE, DEFAULT_MIN_NEIGHBORS, DEFAULT_MODEL_PATH,
    DEFAULT_NUM_KEYPOINTS, DEFAULT_SCALE_FACTOR, MIN_FACE_SIZE,
};
use crate::shared::error::KeypointsError;

/// Accepted model input sizes (square, in pixels).
pub const IMAGE_SIZE_RANGE: std::ops::RangeInclusive<u32> = 32..=512;

/// Construction-time settings for a pipeline.
///
/// Missing fields fall back to their defaults when deserialized, so a
/// settings file only needs to name what it overrides.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub cascade_path: PathBuf,
    pub model_path: PathBuf,
    pub scale_factor: f64,
    pub min_neighbors: u32,
    pub min_face_size: u32,
    pub image_size: u32,
    pub num_keypoints: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cascade_path: PathBuf::from(DEFAULT_CASCADE_PATH),
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            scale_factor: DEFAULT_SCALE_FACTOR,
            min_neighbors: DEFAULT_MIN_NEIGHBORS,
            min_face_size: MIN_FACE_SIZE,
            image_size: DEFAULT_IMAGE_SIZE,
            num_keypoints: DEFAULT_NUM_KEYPOINTS,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), KeypointsError> {
        validate_scan_params(self.scale_factor, self.min_neighbors)?;
        if self.min_face_size < MIN_FACE_SIZE {
            return Err(KeypointsError::InvalidConfig(format!(
                "min face size must be at least {MIN_FACE_SIZE}, got {}",
                self.min_face_size
            )));
        }
        if !IMAGE_SIZE_RANGE.contains(&self.image_size) {
            return Err(KeypointsError::InvalidConfig(format!(
                "image size must be between {} and {}, got {}",
                IMAGE_SIZE_RANGE.start(),
                IMAGE_SIZE_RANGE.end(),
                self.image_size
            )));
        }
        if self.num_keypoints == 0 {
            return Err(KeypointsError::InvalidConfig(
                "number of keypoints must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Shared check for stored defaults and per-call detector overrides.
pub fn validate_scan_params(scale_factor: f64, min_neighbors: u32) -> Result<(), KeypointsError> {
    if !scale_factor.is_finite() || scale_factor <= 1.0 {
        return Err(KeypointsError::InvalidConfig(format!(
            "scale factor must be greater than 1.0, got {scale_factor}"
        )));
    }
    if min_neighbors < 1 {
        return Err(KeypointsError::InvalidConfig(
            "min neighbors must be at least 1".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.scale_factor, 1.2);
        assert_eq!(config.min_neighbors, 5);
        assert_eq!(config.image_size, 96);
        assert_eq!(config.num_keypoints, 15);
        assert!(config.validate().is_ok());
    }

    #[rstest]
    #[case::scale_one(PipelineConfig { scale_factor: 1.0, ..Default::default() })]
    #[case::scale_below_one(PipelineConfig { scale_factor: 0.5, ..Default::default() })]
    #[case::scale_nan(PipelineConfig { scale_factor: f64::NAN, ..Default::default() })]
    #[case::zero_neighbors(PipelineConfig { min_neighbors: 0, ..Default::default() })]
    #[case::tiny_faces(PipelineConfig { min_face_size: 10, ..Default::default() })]
    #[case::image_too_small(PipelineConfig { image_size: 16, ..Default::default() })]
    #[case::image_too_large(PipelineConfig { image_size: 1024, ..Default::default() })]
    #[case::no_keypoints(PipelineConfig { num_keypoints: 0, ..Default::default() })]
    fn test_validate_rejects(#[case] config: PipelineConfig) {
        assert!(matches!(
            config.validate(),
            Err(KeypointsError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"scale_factor": 1.5, "model_path": "m.onnx"}"#).unwrap();
        assert_eq!(config.scale_factor, 1.5);
        assert_eq!(config.model_path, PathBuf::from("m.onnx"));
        assert_eq!(config.min_neighbors, DEFAULT_MIN_NEIGHBORS);
        assert_eq!(config.cascade_path, PathBuf::from(DEFAULT_CASCADE_PATH));
    }
}
