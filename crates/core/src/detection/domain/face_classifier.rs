use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// Multi-scale scan settings for a single detection call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScanParams {
    /// Growth factor between successive window sizes. Always > 1.0.
    pub scale_factor: f64,
    /// How many overlapping candidates must agree before a region is kept.
    pub min_neighbors: u32,
}

/// Domain interface for the region-proposal engine behind [`FaceDetector`].
///
/// Callers guarantee `gray` is a non-empty single-channel frame.
/// Implementations may keep scratch state between scans, hence `&mut self`.
///
/// [`FaceDetector`]: crate::detection::domain::face_detector::FaceDetector
pub trait FaceClassifier: Send {
    fn detect_multi_scale(
        &mut self,
        gray: &Frame,
        params: &ScanParams,
    ) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>>;
}
