use std::path::Path;

use crate::imaging::domain::image_reader::ImageReader;
use crate::shared::frame::Frame;

/// Reads any still-image format the `image` crate can decode.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImageFileReader;

impl ImageFileReader {
    pub fn new() -> Self {
        Self
    }
}

impl ImageReader for ImageFileReader {
    fn read(&self, path: &Path) -> Result<Frame, Box<dyn std::error::Error>> {
        let decoded = image::ImageReader::open(path)?
            .with_guessed_format()?
            .decode()?;
        log::debug!(
            "Decoded {} ({}x{}, {:?})",
            path.display(),
            decoded.width(),
            decoded.height(),
            decoded.color()
        );
        Ok(Frame::from_dynamic_image(decoded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_rgb_image(dir: &Path, width: u32, height: u32) -> PathBuf {
        let path = dir.join("face.png");
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([50, 100, 200]));
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn test_reads_color_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_rgb_image(dir.path(), 100, 80);

        let frame = ImageFileReader::new().read(&path).unwrap();
        assert_eq!(frame.shape(), (80, 100));
        assert_eq!(frame.channels(), 3);
        assert_eq!(&frame.data()[..3], &[50, 100, 200]);
    }

    #[test]
    fn test_reads_grayscale_as_single_channel() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gray.png");
        image::GrayImage::from_pixel(30, 20, image::Luma([77]))
            .save(&path)
            .unwrap();

        let frame = ImageFileReader::new().read(&path).unwrap();
        assert_eq!(frame.channels(), 1);
        assert_eq!(frame.shape(), (20, 30));
        assert!(frame.data().iter().all(|&p| p == 77));
    }

    #[test]
    fn test_format_detected_from_content() {
        let dir = tempfile::tempdir().unwrap();
        let png = write_rgb_image(dir.path(), 8, 8);
        let misnamed = dir.path().join("face.jpg");
        std::fs::rename(&png, &misnamed).unwrap();

        assert!(ImageFileReader::new().read(&misnamed).is_ok());
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(ImageFileReader::new()
            .read(Path::new("/nonexistent/face.png"))
            .is_err());
    }

    #[test]
    fn test_garbage_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noise.png");
        std::fs::write(&path, b"definitely not an image").unwrap();
        assert!(ImageFileReader::new().read(&path).is_err());
    }
}
