pub mod face_classifier;
pub mod face_detector;
