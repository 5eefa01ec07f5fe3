use std::path::PathBuf;

use thiserror::Error;

/// Every failure the detection/prediction pipeline can surface.
///
/// A box whose crop turns out empty is not an error: the pipeline skips it.
#[derive(Error, Debug)]
pub enum KeypointsError {
    #[error("invalid image: {0}")]
    InvalidImage(String),
    #[error("failed to load face classifier {}: {reason}", path.display())]
    DetectorLoad { path: PathBuf, reason: String },
    #[error("failed to load keypoint model {}: {reason}", path.display())]
    ModelLoad { path: PathBuf, reason: String },
    #[error("no face detected")]
    NoFaceDetected,
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("face detection failed: {0}")]
    Detection(String),
    #[error("keypoint inference failed: {0}")]
    Inference(String),
    #[error("keypoint model produced {actual} values, expected {expected}")]
    ModelOutput { expected: usize, actual: usize },
    #[error("batch worker failed: {0}")]
    Worker(String),
}

impl KeypointsError {
    pub(crate) fn detector_load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::DetectorLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn model_load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::ModelLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
