use serde::{Deserialize, Serialize};

/// Side of the square images the regressor was trained on.
pub const TRAINING_IMAGE_SIZE: u32 = 96;
/// Pixel coordinate that maps to 0 in normalized space.
pub const KEYPOINT_CENTER: f32 = 48.0;
/// Pixels per normalized unit.
pub const KEYPOINT_SCALE: f32 = 48.0;

/// A single facial landmark position.
///
/// Which coordinate space it is in (normalized, model-input pixels or
/// original-image pixels) depends on where it came from; see
/// [`KeypointPredictor`](crate::keypoints::domain::keypoint_predictor::KeypointPredictor).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
}

impl Keypoint {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn to_tuple(&self) -> (f32, f32) {
        (self.x, self.y)
    }
}

/// Normalized `[-1, 1]` to model-input pixels `[0, 96]`.
pub fn denormalize(value: f32) -> f32 {
    value * KEYPOINT_SCALE + KEYPOINT_CENTER
}

/// Inverse of [`denormalize`].
pub fn normalize(pixel: f32) -> f32 {
    (pixel - KEYPOINT_CENTER) / KEYPOINT_SCALE
}

/// Groups a flat `[x0, y0, x1, y1, …]` vector into points. A trailing
/// unpaired value is dropped.
pub fn pairs(flat: &[f32]) -> Vec<Keypoint> {
    flat.chunks_exact(2)
        .map(|xy| Keypoint::new(xy[0], xy[1]))
        .collect()
}

/// Inverse of [`pairs`].
pub fn flatten(keypoints: &[Keypoint]) -> Vec<f32> {
    keypoints.iter().flat_map(|k| [k.x, k.y]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[rstest]
    #[case::center(0.0, 48.0)]
    #[case::low(-1.0, 0.0)]
    #[case::high(1.0, 96.0)]
    #[case::quarter(0.5, 72.0)]
    fn test_denormalize(#[case] value: f32, #[case] expected: f32) {
        assert_relative_eq!(denormalize(value), expected);
    }

    #[rstest]
    #[case(-1.0)]
    #[case(-0.37)]
    #[case(0.0)]
    #[case(0.81)]
    #[case(1.0)]
    fn test_normalize_inverts_denormalize(#[case] value: f32) {
        assert_relative_eq!(normalize(denormalize(value)), value, epsilon = 1e-6);
    }

    #[test]
    fn test_pairs_interleaves_x_then_y() {
        let points = pairs(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(points, vec![Keypoint::new(1.0, 2.0), Keypoint::new(3.0, 4.0)]);
        assert_eq!(flatten(&points), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_pairs_drops_unpaired_tail() {
        assert_eq!(pairs(&[1.0, 2.0, 3.0]).len(), 1);
    }

    #[test]
    fn test_serializes_as_xy_object() {
        let json = serde_json::to_string(&Keypoint::new(1.5, 2.0)).unwrap();
        assert_eq!(json, r#"{"x":1.5,"y":2.0}"#);
    }
}
