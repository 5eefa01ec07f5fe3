use crate::detection::domain::face_classifier::{FaceClassifier, ScanParams};
use crate::shared::bounding_box::BoundingBox;
use crate::shared::config::validate_scan_params;
use crate::shared::error::KeypointsError;
use crate::shared::frame::Frame;

/// Locates face regions in whole images.
///
/// Wraps an opaque [`FaceClassifier`] together with the scan defaults used
/// when a call does not override them.
pub struct FaceDetector {
    classifier: Box<dyn FaceClassifier>,
    scale_factor: f64,
    min_neighbors: u32,
}

impl FaceDetector {
    pub fn new(
        classifier: Box<dyn FaceClassifier>,
        scale_factor: f64,
        min_neighbors: u32,
    ) -> Result<Self, KeypointsError> {
        validate_scan_params(scale_factor, min_neighbors)?;
        Ok(Self {
            classifier,
            scale_factor,
            min_neighbors,
        })
    }

    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    pub fn min_neighbors(&self) -> u32 {
        self.min_neighbors
    }

    /// Returns every face region found, in the classifier's scan order.
    ///
    /// `scale_factor` and `min_neighbors` override the stored defaults for
    /// this call only. Finding nothing is not an error.
    pub fn detect(
        &mut self,
        image: &Frame,
        scale_factor: Option<f64>,
        min_neighbors: Option<u32>,
    ) -> Result<Vec<BoundingBox>, KeypointsError> {
        image.validate()?;
        if image.is_empty() {
            return Err(KeypointsError::InvalidImage("empty image provided".into()));
        }

        let params = ScanParams {
            scale_factor: scale_factor.unwrap_or(self.scale_factor),
            min_neighbors: min_neighbors.unwrap_or(self.min_neighbors),
        };
        validate_scan_params(params.scale_factor, params.min_neighbors)?;

        let gray = image.to_grayscale();
        let boxes = self
            .classifier
            .detect_multi_scale(&gray, &params)
            .map_err(|e| KeypointsError::Detection(e.to_string()))?;

        log::debug!(
            "Detected {} face(s) in {}x{} image (scale {}, neighbors {})",
            boxes.len(),
            image.width(),
            image.height(),
            params.scale_factor,
            params.min_neighbors
        );
        Ok(boxes)
    }

    /// Returns the largest face by area. Ties go to the first one scanned.
    pub fn detect_single(
        &mut self,
        image: &Frame,
        scale_factor: Option<f64>,
        min_neighbors: Option<u32>,
    ) -> Result<BoundingBox, KeypointsError> {
        let boxes = self.detect(image, scale_factor, min_neighbors)?;
        largest(&boxes).ok_or(KeypointsError::NoFaceDetected)
    }

    /// Cuts the box out of `image`, grown by `padding` times its size on
    /// every side and clamped to the image. See [`crop_region`].
    pub fn crop_face(&self, image: &Frame, bbox: &BoundingBox, padding: f64) -> Frame {
        match crop_region(image.width(), image.height(), bbox, padding) {
            Some(region) => {
                image.crop(region.x as u32, region.y as u32, region.width, region.height)
            }
            None => Frame::empty(image.channels()),
        }
    }
}

/// Image-space rectangle covered by `bbox` after padding and clamping to a
/// `width × height` image, or `None` when nothing of it lies inside.
///
/// Padding per axis is `padding × box dimension`, truncated to whole pixels.
pub fn crop_region(
    width: u32,
    height: u32,
    bbox: &BoundingBox,
    padding: f64,
) -> Option<BoundingBox> {
    let pad_x = (bbox.width as f64 * padding) as i64;
    let pad_y = (bbox.height as f64 * padding) as i64;

    let x1 = (bbox.x as i64 - pad_x).max(0);
    let y1 = (bbox.y as i64 - pad_y).max(0);
    let x2 = (bbox.x as i64 + bbox.width as i64 + pad_x).min(width as i64);
    let y2 = (bbox.y as i64 + bbox.height as i64 + pad_y).min(height as i64);

    if x1 >= x2 || y1 >= y2 {
        return None;
    }
    Some(BoundingBox::new(
        x1 as i32,
        y1 as i32,
        (x2 - x1) as u32,
        (y2 - y1) as u32,
    ))
}

fn largest(boxes: &[BoundingBox]) -> Option<BoundingBox> {
    boxes
        .iter()
        .copied()
        .fold(None, |best: Option<BoundingBox>, b| match best {
            Some(current) if current.area() >= b.area() => Some(current),
            _ => Some(b),
        })
}
