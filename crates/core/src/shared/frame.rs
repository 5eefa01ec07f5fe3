use image::{DynamicImage, GrayImage, RgbImage};
use ndarray::{s, ArrayView3};

use crate::shared::error::KeypointsError;

/// An 8-bit image: contiguous bytes in row-major `(height, width, channels)`
/// order, with either one (grayscale) or three (color) channels.
///
/// Format conversion happens at I/O boundaries only; detection and
/// prediction work on `Frame`s directly.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
}

impl Frame {
    /// Wraps `data` as-is. Buffers from outside the crate should go through
    /// [`Frame::try_new`]; the detection and prediction entry points call
    /// [`Frame::validate`] before touching pixels.
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8) -> Self {
        Self {
            data,
            width,
            height,
            channels,
        }
    }

    /// Checked constructor for buffers coming from outside the crate.
    pub fn try_new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        channels: u8,
    ) -> Result<Self, KeypointsError> {
        let frame = Self::new(data, width, height, channels);
        frame.validate()?;
        Ok(frame)
    }

    /// Fails with [`KeypointsError::InvalidImage`] unless the frame has 1 or
    /// 3 channels and exactly `width * height * channels` bytes.
    pub fn validate(&self) -> Result<(), KeypointsError> {
        let channels = self.channels;
        if channels != 1 && channels != 3 {
            return Err(KeypointsError::InvalidImage(format!(
                "unsupported channel count {channels} (expected 1 or 3)"
            )));
        }
        let (width, height) = (self.width, self.height);
        let expected = (width as usize) * (height as usize) * (channels as usize);
        if self.data.len() != expected {
            return Err(KeypointsError::InvalidImage(format!(
                "buffer holds {} bytes, {width}x{height}x{channels} needs {expected}",
                self.data.len()
            )));
        }
        Ok(())
    }

    /// A zero-sized frame. Used for crops that fall outside the source image.
    pub fn empty(channels: u8) -> Self {
        Self::new(Vec::new(), 0, 0, channels)
    }

    pub fn from_gray_image(image: GrayImage) -> Self {
        let (width, height) = image.dimensions();
        Self::new(image.into_raw(), width, height, 1)
    }

    pub fn from_rgb_image(image: RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self::new(image.into_raw(), width, height, 3)
    }

    /// Grayscale sources stay single-channel; everything else becomes RGB.
    pub fn from_dynamic_image(image: DynamicImage) -> Self {
        match image {
            DynamicImage::ImageLuma8(gray) => Self::from_gray_image(gray),
            other if other.color().has_color() => Self::from_rgb_image(other.to_rgb8()),
            other => Self::from_gray_image(other.to_luma8()),
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// `(height, width)`, matching the row/column order of the pixel buffer.
    pub fn shape(&self) -> (u32, u32) {
        (self.height, self.width)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.data.is_empty()
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.dims(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Single-channel copy. Color frames are reduced with the `image` crate's
    /// luma weights; grayscale frames are returned unchanged.
    pub fn to_grayscale(&self) -> Frame {
        if self.channels == 1 {
            return self.clone();
        }
        Self::from_gray_image(image::imageops::grayscale(&self.to_rgb_image()))
    }

    /// View of a single-channel frame as an `image` buffer.
    pub fn to_gray_image(&self) -> GrayImage {
        let gray = self.to_grayscale();
        GrayImage::from_raw(gray.width, gray.height, gray.data)
            .expect("Frame data length must match dimensions")
    }

    /// Copies the `width × height` block whose top-left corner is `(x, y)`.
    ///
    /// The block is intersected with the frame bounds first; a block with no
    /// overlap yields an empty frame.
    pub fn crop(&self, x: u32, y: u32, width: u32, height: u32) -> Frame {
        let x2 = x.saturating_add(width).min(self.width);
        let y2 = y.saturating_add(height).min(self.height);
        if x >= x2 || y >= y2 {
            return Frame::empty(self.channels);
        }
        let view = self.as_ndarray();
        let block = view.slice(s![y as usize..y2 as usize, x as usize..x2 as usize, ..]);
        let data: Vec<u8> = block.iter().copied().collect();
        Frame::new(data, x2 - x, y2 - y, self.channels)
    }

    fn to_rgb_image(&self) -> RgbImage {
        RgbImage::from_raw(self.width, self.height, self.data.clone())
            .expect("Frame data length must match dimensions")
    }

    fn dims(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}
