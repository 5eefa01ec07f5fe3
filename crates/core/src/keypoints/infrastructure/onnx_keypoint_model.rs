use std::path::Path;

use ndarray::ArrayView4;

use crate::keypoints::domain::keypoint_model::KeypointModel;
use crate::keypoints::infrastructure::execution_provider::{
    preferred_execution_providers, preferred_provider_name,
};
use crate::shared::error::KeypointsError;

/// Keypoint regressor exported to ONNX, run through ONNX Runtime via `ort`.
///
/// Expects one NHWC float input and reads the first output, whatever its
/// shape (`[1, 30]`, `[30]` and `[1, 15, 2]` all flatten to the same vector).
pub struct OnnxKeypointModel {
    session: ort::session::Session,
}

impl OnnxKeypointModel {
    pub fn new(model_path: &Path) -> Result<Self, KeypointsError> {
        if !model_path.exists() {
            return Err(KeypointsError::model_load(model_path, "model file not found"));
        }
        let session =
            build_session(model_path).map_err(|e| KeypointsError::model_load(model_path, e))?;
        log::info!(
            "Loaded keypoint model from {} ({} provider requested)",
            model_path.display(),
            preferred_provider_name()
        );
        Ok(Self { session })
    }
}

fn build_session(model_path: &Path) -> Result<ort::session::Session, Box<dyn std::error::Error>> {
    let session = ort::session::Session::builder()?
        .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)?
        .with_intra_threads(1)?
        .with_execution_providers(preferred_execution_providers())?
        .commit_from_file(model_path)?;
    Ok(session)
}

impl KeypointModel for OnnxKeypointModel {
    fn forward(
        &mut self,
        batch: ArrayView4<'_, f32>,
    ) -> Result<Vec<f32>, Box<dyn std::error::Error>> {
        let input_value = ort::value::Tensor::from_array(batch.to_owned())?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("keypoint model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        Ok(tensor.iter().copied().collect())
    }
}
