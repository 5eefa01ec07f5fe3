pub mod execution_provider;
pub mod onnx_keypoint_model;
