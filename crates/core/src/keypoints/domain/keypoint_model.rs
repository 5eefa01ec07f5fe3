use ndarray::ArrayView4;

/// Domain interface for the learned keypoint regressor.
///
/// `batch` is NHWC: `(1, size, size, 1)` grayscale intensities in `[0, 1]`.
/// Returns the model's output flattened to one vector, normally `2 × K`
/// values in the normalized `[-1, 1]` range with x/y interleaved.
pub trait KeypointModel: Send {
    fn forward(
        &mut self,
        batch: ArrayView4<'_, f32>,
    ) -> Result<Vec<f32>, Box<dyn std::error::Error>>;
}
