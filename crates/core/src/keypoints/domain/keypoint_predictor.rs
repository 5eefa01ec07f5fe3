use image::imageops::FilterType;
use ndarray::Array4;
use serde::Serialize;

use crate::keypoints::domain::keypoint::{self, Keypoint};
use crate::keypoints::domain::keypoint_model::KeypointModel;
use crate::shared::error::KeypointsError;
use crate::shared::frame::Frame;

/// Output of a single forward pass.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct KeypointPrediction {
    /// One point per landmark, in model-input pixels when denormalized,
    /// otherwise in normalized space.
    pub keypoints: Vec<Keypoint>,
    /// Flattened model output before any denormalization.
    pub raw_output: Vec<f32>,
}

/// Maps face crops to keypoint coordinates.
///
/// Coordinate spaces, in the order a prediction passes through them:
/// normalized `[-1, 1]` model output, pixels of the fixed `size × size`
/// model input, then pixels of the original image once rescaled to the
/// crop and shifted by its origin.
pub struct KeypointPredictor {
    model: Box<dyn KeypointModel>,
    image_size: u32,
    num_keypoints: usize,
}

impl KeypointPredictor {
    pub fn new(
        model: Box<dyn KeypointModel>,
        image_size: u32,
        num_keypoints: usize,
    ) -> Result<Self, KeypointsError> {
        if image_size == 0 {
            return Err(KeypointsError::InvalidConfig(
                "image size must be positive".into(),
            ));
        }
        if num_keypoints == 0 {
            return Err(KeypointsError::InvalidConfig(
                "number of keypoints must be at least 1".into(),
            ));
        }
        Ok(Self {
            model,
            image_size,
            num_keypoints,
        })
    }

    pub fn image_size(&self) -> u32 {
        self.image_size
    }

    pub fn num_keypoints(&self) -> usize {
        self.num_keypoints
    }

    /// Grayscale, resize to `size × size` (bilinear), scale to `[0, 1]` and
    /// frame as a `(1, size, size, 1)` batch.
    pub fn preprocess(&self, image: &Frame) -> Result<Array4<f32>, KeypointsError> {
        image.validate()?;
        if image.is_empty() {
            return Err(KeypointsError::InvalidImage(
                "cannot preprocess an empty image".into(),
            ));
        }
        let size = self.image_size;
        let resized =
            image::imageops::resize(&image.to_gray_image(), size, size, FilterType::Triangle);

        let s = size as usize;
        Ok(Array4::from_shape_fn((1, s, s, 1), |(_, y, x, _)| {
            resized.get_pixel(x as u32, y as u32)[0] as f32 / 255.0
        }))
    }

    /// Runs the model on one face crop.
    ///
    /// With `denormalize` the points are in model-input pixels
    /// (`v * 48 + 48`); otherwise they are the raw normalized values.
    pub fn predict(
        &mut self,
        image: &Frame,
        denormalize: bool,
    ) -> Result<KeypointPrediction, KeypointsError> {
        let batch = self.preprocess(image)?;
        let raw_output = self
            .model
            .forward(batch.view())
            .map_err(|e| KeypointsError::Inference(e.to_string()))?;

        let expected = self.num_keypoints * 2;
        if raw_output.len() != expected {
            return Err(KeypointsError::ModelOutput {
                expected,
                actual: raw_output.len(),
            });
        }

        let values: Vec<f32> = if denormalize {
            raw_output.iter().map(|&v| keypoint::denormalize(v)).collect()
        } else {
            raw_output.clone()
        };

        Ok(KeypointPrediction {
            keypoints: keypoint::pairs(&values),
            raw_output,
        })
    }

    /// Predicts on `face_crop` and maps the points into the image it was cut
    /// from.
    ///
    /// `original_shape` is the crop's `(height, width)` in that image. Each
    /// axis is scaled by `crop dimension / image_size` and then shifted by the
    /// crop origin.
    pub fn predict_on_original(
        &mut self,
        face_crop: &Frame,
        bbox_x: i32,
        bbox_y: i32,
        original_shape: (u32, u32),
    ) -> Result<Vec<Keypoint>, KeypointsError> {
        let prediction = self.predict(face_crop, true)?;

        let (height, width) = original_shape;
        let scale_x = width as f32 / self.image_size as f32;
        let scale_y = height as f32 / self.image_size as f32;

        Ok(prediction
            .keypoints
            .into_iter()
            .map(|k| {
                Keypoint::new(
                    k.x * scale_x + bbox_x as f32,
                    k.y * scale_y + bbox_y as f32,
                )
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::sync::{Arc, Mutex};

    // --- Stubs ---

    struct StubModel {
        output: Vec<f32>,
        shapes: Arc<Mutex<Vec<Vec<usize>>>>,
    }

    impl StubModel {
        fn new(output: Vec<f32>) -> Self {
            Self {
                output,
                shapes: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl KeypointModel for StubModel {
        fn forward(
            &mut self,
            batch: ndarray::ArrayView4<'_, f32>,
        ) -> Result<Vec<f32>, Box<dyn std::error::Error>> {
            self.shapes.lock().unwrap().push(batch.shape().to_vec());
            Ok(self.output.clone())
        }
    }

    struct FailingModel;

    impl KeypointModel for FailingModel {
        fn forward(
            &mut self,
            _batch: ndarray::ArrayView4<'_, f32>,
        ) -> Result<Vec<f32>, Box<dyn std::error::Error>> {
            Err("session closed".into())
        }
    }

    // --- Helpers ---

    fn predictor(output: Vec<f32>) -> KeypointPredictor {
        KeypointPredictor::new(Box::new(StubModel::new(output)), 96, 15).unwrap()
    }

    fn gray(w: u32, h: u32, value: u8) -> Frame {
        Frame::new(vec![value; (w * h) as usize], w, h, 1)
    }

    /// Distinct values in [-1, 1] so every point lands somewhere different.
    fn spread_output() -> Vec<f32> {
        (0..30).map(|i| (i as f32 - 15.0) / 15.0).collect()
    }

    // --- Tests ---

    #[test]
    fn test_new_rejects_zero_sizes() {
        assert!(KeypointPredictor::new(Box::new(StubModel::new(vec![])), 0, 15).is_err());
        assert!(KeypointPredictor::new(Box::new(StubModel::new(vec![])), 96, 0).is_err());
    }

    #[test]
    fn test_preprocess_shape() {
        let p = predictor(vec![0.0; 30]);
        let batch = p.preprocess(&gray(200, 150, 10)).unwrap();
        assert_eq!(batch.shape(), &[1, 96, 96, 1]);
    }

    #[test]
    fn test_preprocess_color_input_shape() {
        let p = predictor(vec![0.0; 30]);
        let color = Frame::new(vec![90; 40 * 30 * 3], 40, 30, 3);
        assert_eq!(p.preprocess(&color).unwrap().shape(), &[1, 96, 96, 1]);
    }

    #[test]
    fn test_preprocess_scales_to_unit_range() {
        let p = predictor(vec![0.0; 30]);
        let white = p.preprocess(&gray(50, 50, 255)).unwrap();
        let black = p.preprocess(&gray(50, 50, 0)).unwrap();
        assert!(white.iter().all(|&v| (v - 1.0).abs() < 1e-6));
        assert!(black.iter().all(|&v| v == 0.0));

        let data = (0..64 * 64).map(|i| (i % 251) as u8).collect();
        let noisy = p.preprocess(&Frame::new(data, 64, 64, 1)).unwrap();
        assert!(noisy.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_preprocess_is_deterministic() {
        let p = predictor(vec![0.0; 30]);
        let data: Vec<u8> = (0..70 * 55).map(|i| (i * 7 % 256) as u8).collect();
        let frame = Frame::new(data, 70, 55, 1);
        assert_eq!(p.preprocess(&frame).unwrap(), p.preprocess(&frame).unwrap());
    }

    #[test]
    fn test_preprocess_malformed_frame_is_invalid() {
        let p = predictor(vec![0.0; 30]);
        assert!(matches!(
            p.preprocess(&Frame::new(vec![0; 50], 96, 96, 3)),
            Err(KeypointsError::InvalidImage(_))
        ));
    }

    #[test]
    fn test_preprocess_empty_is_invalid() {
        let p = predictor(vec![0.0; 30]);
        assert!(matches!(
            p.preprocess(&Frame::empty(1)),
            Err(KeypointsError::InvalidImage(_))
        ));
    }

    #[test]
    fn test_predict_feeds_model_a_single_batch() {
        let model = StubModel::new(vec![0.0; 30]);
        let shapes = model.shapes.clone();
        let mut p = KeypointPredictor::new(Box::new(model), 96, 15).unwrap();
        p.predict(&gray(30, 30, 1), true).unwrap();
        assert_eq!(*shapes.lock().unwrap(), vec![vec![1, 96, 96, 1]]);
    }

    #[test]
    fn test_predict_denormalizes() {
        let mut p = predictor(spread_output());
        let prediction = p.predict(&gray(96, 96, 0), true).unwrap();
        assert_eq!(prediction.keypoints.len(), 15);
        assert_eq!(prediction.raw_output, spread_output());
        // First pair is (-1.0, -14/15)
        assert_abs_diff_eq!(prediction.keypoints[0].x, 0.0, epsilon = 1e-4);
        assert_abs_diff_eq!(
            prediction.keypoints[0].y,
            -14.0 / 15.0 * 48.0 + 48.0,
            epsilon = 1e-4
        );
    }

    #[test]
    fn test_predict_without_denormalize_keeps_raw_values() {
        let mut p = predictor(spread_output());
        let prediction = p.predict(&gray(96, 96, 0), false).unwrap();
        assert_eq!(keypoint::flatten(&prediction.keypoints), spread_output());
    }

    #[test]
    fn test_predict_wrong_output_length_is_model_output_error() {
        let mut p = predictor(vec![0.0; 28]);
        assert!(matches!(
            p.predict(&gray(96, 96, 0), true),
            Err(KeypointsError::ModelOutput {
                expected: 30,
                actual: 28
            })
        ));
    }

    #[test]
    fn test_model_failure_is_inference_error() {
        let mut p = KeypointPredictor::new(Box::new(FailingModel), 96, 15).unwrap();
        let err = p.predict(&gray(96, 96, 0), true).unwrap_err();
        assert!(matches!(err, KeypointsError::Inference(ref m) if m == "session closed"));
    }

    #[test]
    fn test_predict_on_original_scales_then_translates() {
        let output = spread_output();
        let mut p = predictor(output.clone());
        let (bx, by, w, h) = (37, 12, 120u32, 80u32);
        let crop = gray(w, h, 100);

        let keypoints = p.predict_on_original(&crop, bx, by, (h, w)).unwrap();

        for (i, k) in keypoints.iter().enumerate() {
            let expected_x = (output[2 * i] * 48.0 + 48.0) * (w as f32 / 96.0) + bx as f32;
            let expected_y = (output[2 * i + 1] * 48.0 + 48.0) * (h as f32 / 96.0) + by as f32;
            assert_abs_diff_eq!(k.x, expected_x, epsilon = 1e-4);
            assert_abs_diff_eq!(k.y, expected_y, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_predict_on_original_zero_output_lands_on_crop_center() {
        let mut p = predictor(vec![0.0; 30]);
        let keypoints = p
            .predict_on_original(&gray(50, 50, 0), 10, 10, (50, 50))
            .unwrap();
        assert_eq!(keypoints.len(), 15);
        for k in keypoints {
            assert_abs_diff_eq!(k.x, 35.0, epsilon = 1e-4);
            assert_abs_diff_eq!(k.y, 35.0, epsilon = 1e-4);
        }
    }
}
