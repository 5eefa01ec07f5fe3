use std::path::PathBuf;

use crate::pipeline::facial_keypoints_pipeline::FacialKeypointsPipeline;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::pipeline::results::PipelineResult;
use crate::shared::error::KeypointsError;

/// Result for one input of a batch.
#[derive(Debug)]
pub struct BatchOutcome {
    pub path: PathBuf,
    pub result: Result<PipelineResult, KeypointsError>,
}

/// Runs many images through already-built pipelines.
///
/// Implementations return exactly one outcome per input, in input order.
/// A failing image is reported in its outcome and never aborts the rest.
pub trait BatchExecutor: Send {
    fn execute(
        &self,
        pipelines: Vec<FacialKeypointsPipeline>,
        inputs: Vec<PathBuf>,
        detect_all: bool,
        logger: &mut dyn PipelineLogger,
    ) -> Result<Vec<BatchOutcome>, KeypointsError>;
}
