use std::path::PathBuf;
use std::thread::JoinHandle;

use crate::pipeline::batch_executor::{BatchExecutor, BatchOutcome};
use crate::pipeline::facial_keypoints_pipeline::FacialKeypointsPipeline;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::shared::error::KeypointsError;

const DEFAULT_CHANNEL_CAPACITY: usize = 16;

type Job = (usize, PathBuf);

/// Processes a batch with one OS thread per pipeline.
///
/// Layout: `feeder → [worker pipeline × N] → main (collect, progress)`
///
/// Workers pull from a shared bounded queue, so faster workers take more
/// images. Outcomes are re-ordered by input index before returning.
pub struct ThreadedBatchExecutor {
    channel_capacity: usize,
}

impl ThreadedBatchExecutor {
    pub fn new() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    pub fn with_channel_capacity(channel_capacity: usize) -> Self {
        Self {
            channel_capacity: channel_capacity.max(1),
        }
    }
}

impl Default for ThreadedBatchExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchExecutor for ThreadedBatchExecutor {
    fn execute(
        &self,
        pipelines: Vec<FacialKeypointsPipeline>,
        inputs: Vec<PathBuf>,
        detect_all: bool,
        logger: &mut dyn PipelineLogger,
    ) -> Result<Vec<BatchOutcome>, KeypointsError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        if pipelines.is_empty() {
            return Err(KeypointsError::InvalidConfig(
                "at least one pipeline is required".into(),
            ));
        }

        let total = inputs.len();
        logger.info(&format!(
            "Processing {total} image(s) with {} worker(s)",
            pipelines.len()
        ));

        let (job_tx, job_rx) = crossbeam_channel::bounded::<Job>(self.channel_capacity);
        let (done_tx, done_rx) = crossbeam_channel::unbounded::<(usize, BatchOutcome)>();

        let feeder = spawn_feeder(inputs.clone(), job_tx);
        let workers: Vec<_> = pipelines
            .into_iter()
            .enumerate()
            .map(|(id, pipeline)| {
                spawn_worker(id, pipeline, job_rx.clone(), done_tx.clone(), detect_all)
            })
            .collect();
        drop(job_rx);
        drop(done_tx);

        let mut slots: Vec<Option<BatchOutcome>> = (0..total).map(|_| None).collect();
        let mut finished = 0;
        for (index, outcome) in done_rx {
            slots[index] = Some(outcome);
            finished += 1;
            logger.progress(finished, total);
        }

        join_threads(feeder, workers);

        Ok(slots
            .into_iter()
            .zip(inputs)
            .map(|(slot, path)| {
                slot.unwrap_or_else(|| BatchOutcome {
                    result: Err(KeypointsError::Worker(format!(
                        "no result for {}: worker thread panicked",
                        path.display()
                    ))),
                    path,
                })
            })
            .collect())
    }
}

fn spawn_feeder(inputs: Vec<PathBuf>, job_tx: crossbeam_channel::Sender<Job>) -> JoinHandle<()> {
    std::thread::spawn(move || {
        for job in inputs.into_iter().enumerate() {
            // Every worker is gone; nothing left to feed.
            if job_tx.send(job).is_err() {
                break;
            }
        }
    })
}

fn spawn_worker(
    id: usize,
    mut pipeline: FacialKeypointsPipeline,
    job_rx: crossbeam_channel::Receiver<Job>,
    done_tx: crossbeam_channel::Sender<(usize, BatchOutcome)>,
    detect_all: bool,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        for (index, path) in job_rx {
            let result = pipeline.process(path.as_path(), detect_all);
            if let Err(ref e) = result {
                log::warn!("Worker {id}: {}: {e}", path.display());
            }
            if done_tx.send((index, BatchOutcome { path, result })).is_err() {
                break;
            }
        }
        log::debug!("Worker {id} finished");
    })
}

fn join_threads(feeder: JoinHandle<()>, workers: Vec<JoinHandle<()>>) {
    if feeder.join().is_err() {
        log::error!("Feeder thread panicked");
    }
    for (id, worker) in workers.into_iter().enumerate() {
        if worker.join().is_err() {
            log::error!("Worker {id} panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::face_classifier::{FaceClassifier, ScanParams};
    use crate::detection::domain::face_detector::FaceDetector;
    use crate::imaging::domain::image_reader::ImageReader;
    use crate::keypoints::domain::keypoint_model::KeypointModel;
    use crate::keypoints::domain::keypoint_predictor::KeypointPredictor;
    use crate::pipeline::pipeline_logger::{LogPipelineLogger, NullPipelineLogger};
    use crate::shared::bounding_box::BoundingBox;
    use crate::shared::frame::Frame;
    use std::path::Path;
    use std::time::Duration;

    // --- Stubs ---

    struct OneFaceClassifier;

    impl FaceClassifier for OneFaceClassifier {
        fn detect_multi_scale(
            &mut self,
            _gray: &Frame,
            _params: &ScanParams,
        ) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>> {
            Ok(vec![BoundingBox::new(0, 0, 20, 20)])
        }
    }

    struct ZeroModel;

    impl KeypointModel for ZeroModel {
        fn forward(
            &mut self,
            _batch: ndarray::ArrayView4<'_, f32>,
        ) -> Result<Vec<f32>, Box<dyn std::error::Error>> {
            Ok(vec![0.0; 30])
        }
    }

    /// `img_<n>.png` decodes to a `(40 + n) × 40` frame; `missing` fails and
    /// `panic` panics. Even-numbered images are slow so completion order
    /// differs from input order.
    struct NumberedReader;

    impl ImageReader for NumberedReader {
        fn read(&self, path: &Path) -> Result<Frame, Box<dyn std::error::Error>> {
            let name = path.to_string_lossy();
            if name.contains("panic") {
                panic!("decoder crashed");
            }
            if name.contains("missing") {
                return Err("no such file".into());
            }
            let n: u32 = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.strip_prefix("img_"))
                .and_then(|s| s.parse().ok())
                .ok_or("bad name")?;
            if n % 2 == 0 {
                std::thread::sleep(Duration::from_millis(5));
            }
            let width = 40 + n;
            Ok(Frame::new(vec![0; (width * 40) as usize], width, 40, 1))
        }
    }

    // --- Helpers ---

    fn pipelines(n: usize) -> Vec<FacialKeypointsPipeline> {
        (0..n)
            .map(|_| {
                let detector = FaceDetector::new(Box::new(OneFaceClassifier), 1.2, 5).unwrap();
                let predictor = KeypointPredictor::new(Box::new(ZeroModel), 96, 15).unwrap();
                FacialKeypointsPipeline::new(Box::new(NumberedReader), detector, predictor)
            })
            .collect()
    }

    fn inputs(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    // --- Tests ---

    #[test]
    fn test_outcomes_follow_input_order() {
        let names: Vec<String> = (0..12).map(|i| format!("img_{i}.png")).collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        let executor = ThreadedBatchExecutor::with_channel_capacity(2);

        let outcomes = executor
            .execute(pipelines(3), inputs(&names), true, &mut NullPipelineLogger)
            .unwrap();

        assert_eq!(outcomes.len(), 12);
        for (i, outcome) in outcomes.iter().enumerate() {
            assert_eq!(outcome.path, PathBuf::from(format!("img_{i}.png")));
            let result = outcome.result.as_ref().unwrap();
            assert_eq!(result.image.width(), 40 + i as u32);
            assert_eq!(result.n_faces(), 1);
        }
    }

    #[test]
    fn test_failed_input_does_not_stop_others() {
        let executor = ThreadedBatchExecutor::new();
        let outcomes = executor
            .execute(
                pipelines(2),
                inputs(&["img_1.png", "missing.png", "img_3.png"]),
                true,
                &mut NullPipelineLogger,
            )
            .unwrap();

        assert!(outcomes[0].result.is_ok());
        assert!(matches!(
            outcomes[1].result,
            Err(KeypointsError::InvalidImage(_))
        ));
        assert!(outcomes[2].result.is_ok());
    }

    #[test]
    fn test_panicking_worker_is_reported_per_input() {
        let executor = ThreadedBatchExecutor::new();
        let outcomes = executor
            .execute(
                pipelines(2),
                inputs(&["img_1.png", "panic.png", "img_3.png", "img_5.png"]),
                true,
                &mut NullPipelineLogger,
            )
            .unwrap();

        assert_eq!(outcomes.len(), 4);
        assert!(matches!(outcomes[1].result, Err(KeypointsError::Worker(_))));
        assert!(outcomes[0].result.is_ok());
        assert!(outcomes[2].result.is_ok());
        assert!(outcomes[3].result.is_ok());
    }

    #[test]
    fn test_single_face_mode_is_forwarded() {
        let executor = ThreadedBatchExecutor::new();
        let outcomes = executor
            .execute(
                pipelines(1),
                inputs(&["img_2.png"]),
                false,
                &mut NullPipelineLogger,
            )
            .unwrap();
        assert_eq!(outcomes[0].result.as_ref().unwrap().n_faces(), 1);
    }

    #[test]
    fn test_empty_batch() {
        let outcomes = ThreadedBatchExecutor::new()
            .execute(pipelines(0), vec![], true, &mut NullPipelineLogger)
            .unwrap();
        assert!(outcomes.is_empty());
    }

    #[test]
    fn test_no_pipelines_is_config_error() {
        let result = ThreadedBatchExecutor::new().execute(
            vec![],
            inputs(&["img_1.png"]),
            true,
            &mut NullPipelineLogger,
        );
        assert!(matches!(result, Err(KeypointsError::InvalidConfig(_))));
    }

    #[test]
    fn test_progress_reaches_total() {
        let mut logger = LogPipelineLogger::new(1);
        ThreadedBatchExecutor::new()
            .execute(
                pipelines(2),
                inputs(&["img_1.png", "img_2.png", "img_3.png"]),
                true,
                &mut logger,
            )
            .unwrap();
        logger.timing("detect", 1.0);
        assert!(logger
            .summary_string()
            .unwrap()
            .contains("Pipeline summary (3 images"));
    }
}
