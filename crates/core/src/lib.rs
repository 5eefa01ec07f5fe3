//! Face detection plus facial keypoint regression.
//!
//! [`FacialKeypointsPipeline`](pipeline::facial_keypoints_pipeline::FacialKeypointsPipeline)
//! finds faces with a SeetaFace cascade, crops each one, runs an ONNX keypoint
//! regressor on the crop and maps the predicted points back into the pixel
//! coordinates of the original image.

pub mod detection;
pub mod imaging;
pub mod keypoints;
pub mod pipeline;
pub mod shared;
