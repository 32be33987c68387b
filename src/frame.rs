use crate::error::{Error, Result};

use std::fmt;
use image::ImageFormat;

/// Row-major RGBA samples, four bytes per pixel.
pub type PixelBuffer = Vec<u8>;

pub const CHANNELS: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dimensions {
    width: u32,
    height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::invalid_dimensions(format!(
                "width and height must be positive, got {}x{}",
                width, height
            )));
        }
        Ok(Self { width, height })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn buffer_len(&self) -> usize {
        self.width as usize * self.height as usize * CHANNELS
    }

    pub fn scaled(&self, scale: ScaleFactor) -> Result<Self> {
        match (self.width.checked_mul(scale.get()), self.height.checked_mul(scale.get())) {
            (Some(width), Some(height)) => Ok(Self { width, height }),
            _ => Err(Error::invalid_dimensions(format!("{} scaled by {} overflows", self, scale))),
        }
    }

    /// Fails with `FrameFormat` unless `buffer` holds exactly one frame of these dimensions.
    pub fn check_buffer(&self, buffer: &[u8]) -> Result<()> {
        if buffer.len() != self.buffer_len() {
            return Err(Error::frame_format(format!(
                "buffer of {} bytes does not match {} ({} bytes expected)",
                buffer.len(),
                self,
                self.buffer_len()
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Integer enlargement factor accepted by a job.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScaleFactor(u32);

impl ScaleFactor {
    pub const MIN: u32 = 2;
    pub const MAX: u32 = 4;

    pub fn new(value: i64) -> Result<Self> {
        if value < i64::from(Self::MIN) || value > i64::from(Self::MAX) {
            return Err(Error::invalid_dimensions(format!(
                "scale must be between {} and {}, got {}",
                Self::MIN,
                Self::MAX,
                value
            )));
        }
        Ok(Self(value as u32))
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl Default for ScaleFactor {
    fn default() -> Self {
        Self(Self::MIN)
    }
}

impl fmt::Display for ScaleFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.0)
    }
}

pub struct Frame {
    pub index: usize,
    pub dimensions: Dimensions,
    pub data: PixelBuffer,
}

impl Frame {
    pub fn new(index: usize, dimensions: Dimensions, data: PixelBuffer) -> Self {
        Self { index, dimensions, data }
    }

    pub fn from_png_bytes(index: usize, bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory_with_format(bytes, ImageFormat::Png)?.to_rgba8();
        let dimensions = Dimensions::new(image.width(), image.height())?;
        Ok(Self::new(index, dimensions, image.into_raw()))
    }

    pub fn is_well_formed(&self) -> bool {
        self.data.len() == self.dimensions.buffer_len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Cursor;
    use image::{Rgba, RgbaImage};

    #[test]
    fn zero_sized_dimensions_are_rejected() {
        assert!(matches!(Dimensions::new(0, 4), Err(Error::InvalidDimensions(_))));
        assert!(matches!(Dimensions::new(4, 0), Err(Error::InvalidDimensions(_))));
        assert!(Dimensions::new(1, 1).is_ok());
    }

    #[test]
    fn scale_outside_supported_range_is_rejected() {
        for value in [-3, -1, 0, 1, 5, 16] {
            assert!(
                matches!(ScaleFactor::new(value), Err(Error::InvalidDimensions(_))),
                "scale {} should be rejected",
                value
            );
        }
        for value in 2..=4 {
            assert_eq!(ScaleFactor::new(value).unwrap().get(), value as u32);
        }
    }

    #[test]
    fn scaled_dimensions_multiply_componentwise() {
        let dims = Dimensions::new(320, 180).unwrap();
        let scaled = dims.scaled(ScaleFactor::new(3).unwrap()).unwrap();
        assert_eq!((scaled.width(), scaled.height()), (960, 540));
    }

    #[test]
    fn scaling_past_u32_is_invalid_dimensions() {
        let dims = Dimensions::new(u32::MAX / 2, 10).unwrap();
        let err = dims.scaled(ScaleFactor::new(4).unwrap()).unwrap_err();
        assert!(matches!(err, Error::InvalidDimensions(_)));
    }

    #[test]
    fn check_buffer_reports_length_mismatch() {
        let dims = Dimensions::new(2, 2).unwrap();
        assert!(dims.check_buffer(&[0; 16]).is_ok());
        assert!(matches!(dims.check_buffer(&[0; 15]), Err(Error::FrameFormat(_))));
    }

    #[test]
    fn png_bytes_decode_to_rgba_frame() {
        let image = RgbaImage::from_pixel(3, 2, Rgba([10, 20, 30, 255]));
        let mut cursor = Cursor::new(Vec::new());
        image.write_to(&mut cursor, ImageFormat::Png).unwrap();

        let frame = Frame::from_png_bytes(7, cursor.get_ref()).unwrap();
        assert_eq!(frame.index, 7);
        assert_eq!(frame.dimensions, Dimensions::new(3, 2).unwrap());
        assert!(frame.is_well_formed());
        assert_eq!(&frame.data[..4], &[10, 20, 30, 255]);
    }
}
