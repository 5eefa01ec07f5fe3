use std::path::Path;

use crate::shared::frame::Frame;

/// Decodes an image file into a [`Frame`].
///
/// Grayscale sources should come back single-channel and everything else as
/// 3-channel color, so callers never see alpha or 16-bit samples.
pub trait ImageReader: Send {
    fn read(&self, path: &Path) -> Result<Frame, Box<dyn std::error::Error>>;
}
