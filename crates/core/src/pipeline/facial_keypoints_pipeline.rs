use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::detection::domain::face_detector::{crop_region, FaceDetector};
use crate::detection::infrastructure::seeta_face_classifier::SeetaFaceClassifier;
use crate::imaging::domain::image_reader::ImageReader;
use crate::imaging::infrastructure::image_file_reader::ImageFileReader;
use crate::keypoints::domain::keypoint_predictor::KeypointPredictor;
use crate::keypoints::infrastructure::onnx_keypoint_model::OnnxKeypointModel;
use crate::pipeline::pipeline_logger::{NullPipelineLogger, PipelineLogger};
use crate::pipeline::results::{FaceKeypointsResult, PipelineResult};
use crate::shared::config::PipelineConfig;
use crate::shared::error::KeypointsError;
use crate::shared::frame::Frame;

/// What [`FacialKeypointsPipeline::process`] accepts: pixels already in
/// memory, or a file to decode.
#[derive(Clone, Debug)]
pub enum ImageSource {
    Frame(Frame),
    Path(PathBuf),
}

impl From<Frame> for ImageSource {
    fn from(frame: Frame) -> Self {
        Self::Frame(frame)
    }
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for ImageSource {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<&str> for ImageSource {
    fn from(path: &str) -> Self {
        Self::Path(PathBuf::from(path))
    }
}

/// Whole-image pipeline: decode → detect → crop → predict → remap.
///
/// Keeps no state between calls other than the loaded models. Use one
/// instance per thread.
pub struct FacialKeypointsPipeline {
    reader: Box<dyn ImageReader>,
    detector: FaceDetector,
    predictor: KeypointPredictor,
    logger: Box<dyn PipelineLogger>,
}

impl FacialKeypointsPipeline {
    pub fn new(
        reader: Box<dyn ImageReader>,
        detector: FaceDetector,
        predictor: KeypointPredictor,
    ) -> Self {
        Self {
            reader,
            detector,
            predictor,
            logger: Box::new(NullPipelineLogger),
        }
    }

    /// Validates `config` and loads the SeetaFace classifier and the ONNX
    /// keypoint model it names.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, KeypointsError> {
        config.validate()?;
        let classifier = SeetaFaceClassifier::new(&config.cascade_path, config.min_face_size)?;
        let detector = FaceDetector::new(
            Box::new(classifier),
            config.scale_factor,
            config.min_neighbors,
        )?;
        let model = OnnxKeypointModel::new(&config.model_path)?;
        let predictor =
            KeypointPredictor::new(Box::new(model), config.image_size, config.num_keypoints)?;
        Ok(Self::new(Box::new(ImageFileReader::new()), detector, predictor))
    }

    pub fn with_logger(mut self, logger: Box<dyn PipelineLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn detector(&self) -> &FaceDetector {
        &self.detector
    }

    pub fn predictor(&self) -> &KeypointPredictor {
        &self.predictor
    }

    /// Finds faces and their keypoints in original-image pixels.
    ///
    /// With `detect_all` every face is returned (possibly none); otherwise
    /// only the largest, failing with [`KeypointsError::NoFaceDetected`] when
    /// there is none. Boxes whose crop would be empty are skipped.
    ///
    /// With `detect_all`, a face whose model call fails
    /// ([`KeypointsError::Inference`]) is logged and left out while the
    /// other faces are still returned. An output of the wrong length
    /// ([`KeypointsError::ModelOutput`]) fails the whole image, as does any
    /// failure on the single face of `detect_all = false`.
    pub fn process(
        &mut self,
        source: impl Into<ImageSource>,
        detect_all: bool,
    ) -> Result<PipelineResult, KeypointsError> {
        let image = self.load(source.into())?;

        let t = Instant::now();
        let boxes = if detect_all {
            self.detector.detect(&image, None, None)?
        } else {
            vec![self.detector.detect_single(&image, None, None)?]
        };
        self.logger.timing("detect", elapsed_ms(t));

        let mut faces = Vec::with_capacity(boxes.len());
        for bbox in boxes {
            let Some(region) = crop_region(image.width(), image.height(), &bbox, 0.0) else {
                log::debug!("Skipping face {bbox:?}: crop is empty");
                continue;
            };
            let crop = image.crop(region.x as u32, region.y as u32, region.width, region.height);

            let t = Instant::now();
            let prediction = self
                .predictor
                .predict_on_original(&crop, region.x, region.y, crop.shape());
            self.logger.timing("predict", elapsed_ms(t));

            let keypoints = match prediction {
                Ok(keypoints) => keypoints,
                Err(KeypointsError::Inference(e)) if detect_all => {
                    log::warn!("Skipping face {bbox:?}: {e}");
                    continue;
                }
                Err(e) => return Err(e),
            };

            log::debug!("Predicted {} keypoints for face {bbox:?}", keypoints.len());
            faces.push(FaceKeypointsResult::new(bbox, keypoints));
        }

        self.logger.metric("faces", faces.len() as f64);
        Ok(PipelineResult { image, faces })
    }

    /// The largest face only.
    pub fn process_single(
        &mut self,
        source: impl Into<ImageSource>,
    ) -> Result<FaceKeypointsResult, KeypointsError> {
        self.process(source, false)?
            .faces
            .into_iter()
            .next()
            .ok_or(KeypointsError::NoFaceDetected)
    }

    /// Emits the logger's end-of-run summary.
    pub fn finish(&self) {
        self.logger.summary();
    }

    fn load(&mut self, source: ImageSource) -> Result<Frame, KeypointsError> {
        let image = match source {
            ImageSource::Frame(frame) => frame,
            ImageSource::Path(path) => {
                let t = Instant::now();
                let frame = self.reader.read(&path).map_err(|e| {
                    KeypointsError::InvalidImage(format!(
                        "could not load image {}: {e}",
                        path.display()
                    ))
                })?;
                self.logger.timing("load", elapsed_ms(t));
                frame
            }
        };
        image.validate()?;
        if image.is_empty() {
            return Err(KeypointsError::InvalidImage("empty image provided".into()));
        }
        Ok(image)
    }
}

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}
