pub mod keypoint;
pub mod keypoint_model;
pub mod keypoint_predictor;
