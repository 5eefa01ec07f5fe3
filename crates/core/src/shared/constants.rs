pub const DEFAULT_CASCADE_PATH: &str = "models/seeta_fd_frontal_v1.0.bin";
pub const DEFAULT_MODEL_PATH: &str = "models/keypoints.onnx";

/// Multi-scale scan step between pyramid levels (must be > 1.0).
pub const DEFAULT_SCALE_FACTOR: f64 = 1.2;
/// Overlapping candidate windows that must agree before a face is accepted.
pub const DEFAULT_MIN_NEIGHBORS: u32 = 5;
/// Smallest face, in pixels, the SeetaFace engine can scan for.
pub const MIN_FACE_SIZE: u32 = 20;

/// Square input size of the keypoint regression model.
pub const DEFAULT_IMAGE_SIZE: u32 = 96;
pub const DEFAULT_NUM_KEYPOINTS: usize = 15;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
