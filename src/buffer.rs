//! Fixed-size RGBA8 raster shared by every pipeline stage.

use image::{Rgba, RgbaImage};

use crate::error::Error;

/// An owned RGBA8 raster with non-zero dimensions.
///
/// Cloning always produces an independent copy of the pixel storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    image: RgbaImage,
}

impl PixelBuffer {
    /// Allocate a transparent-black raster.
    ///
    /// # Errors
    /// Returns [`Error::InvalidDimensions`] if either dimension is zero.
    pub fn new(width: u32, height: u32) -> Result<Self, Error> {
        Self::from_pixel(width, height, [0, 0, 0, 0])
    }

    /// Allocate a raster filled with a single colour.
    ///
    /// # Errors
    /// Returns [`Error::InvalidDimensions`] if either dimension is zero.
    pub fn from_pixel(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self, Error> {
        check_dimensions(width, height)?;
        Ok(Self {
            image: RgbaImage::from_pixel(width, height, Rgba(rgba)),
        })
    }

    /// Wrap raw row-major RGBA8 bytes.
    ///
    /// # Errors
    /// Returns [`Error::InvalidDimensions`] for a zero dimension and
    /// [`Error::BufferSize`] when `pixels` is not exactly `width * height * 4` bytes.
    pub fn from_raw(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, Error> {
        check_dimensions(width, height)?;
        let expected = byte_len(width, height);
        let actual = pixels.len();
        if actual != expected {
            return Err(Error::BufferSize { expected, actual });
        }
        let image = RgbaImage::from_raw(width, height, pixels)
            .ok_or(Error::BufferSize { expected, actual })?;
        Ok(Self { image })
    }

    /// Adopt a decoded `image` buffer.
    ///
    /// # Errors
    /// Returns [`Error::InvalidDimensions`] if the image has zero area.
    pub fn from_image(image: RgbaImage) -> Result<Self, Error> {
        check_dimensions(image.width(), image.height())?;
        Ok(Self { image })
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Read one pixel, or `None` outside the raster.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.image.get_pixel_checked(x, y).map(|p| p.0)
    }

    /// Overwrite one pixel.
    ///
    /// # Errors
    /// Returns [`Error::OutOfBounds`] if `(x, y)` lies outside the raster.
    pub fn put_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) -> Result<(), Error> {
        let pixel = self
            .image
            .get_pixel_mut_checked(x, y)
            .ok_or(Error::OutOfBounds { x, y })?;
        pixel.0 = rgba;
        Ok(())
    }

    /// Bulk copy-in of row-major RGBA8 bytes.
    ///
    /// # Errors
    /// Returns [`Error::BufferSize`] if `pixels` does not cover the raster exactly.
    pub fn copy_from_slice(&mut self, pixels: &[u8]) -> Result<(), Error> {
        let expected = byte_len(self.width(), self.height());
        if pixels.len() != expected {
            return Err(Error::BufferSize {
                expected,
                actual: pixels.len(),
            });
        }
        let raw: &mut [u8] = &mut self.image;
        raw.copy_from_slice(pixels);
        Ok(())
    }

    /// Bulk copy-out of the pixel bytes.
    #[must_use]
    pub fn to_vec(&self) -> Vec<u8> {
        self.image.as_raw().clone()
    }

    /// Borrow the pixel bytes (read-only).
    #[must_use]
    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    #[must_use]
    pub fn as_image(&self) -> &RgbaImage {
        &self.image
    }

    pub(crate) fn as_image_mut(&mut self) -> &mut RgbaImage {
        &mut self.image
    }
}

fn check_dimensions(width: u32, height: u32) -> Result<(), Error> {
    if width == 0 || height == 0 {
        return Err(Error::InvalidDimensions { width, height });
    }
    Ok(())
}

fn byte_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * 4
}
