pub mod batch_executor;
pub mod facial_keypoints_pipeline;
pub mod infrastructure;
pub mod pipeline_logger;
pub mod results;
