//! Canvas backend on the `image` crate's raster operations.

use image::imageops::{self, FilterType};

use crate::canvas::{Canvas, decode_rgba, encode_rgba};
use crate::foundation::error::{MontageError, MontageResult};
use crate::probe::ImageFormat;

/// Pure-raster canvas; decode, resample, blit and encode all go through the
/// `image` crate.
///
/// Resampling uses the `Triangle` filter for every composite, so identical
/// inputs always produce identical pixels. Alpha masks that do not match the
/// canvas size are clipped to the smaller of the two extents.
pub struct RasterCanvas {
    width: u32,
    height: u32,
    surface: Option<image::RgbaImage>,
}

impl RasterCanvas {
    /// Allocate a transparent surface. Dimensions are validated by the
    /// factory.
    pub(crate) fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            surface: Some(image::RgbaImage::new(width, height)),
        }
    }

    fn live(&self) -> MontageResult<&image::RgbaImage> {
        self.surface.as_ref().ok_or_else(already_destroyed)
    }

    fn live_mut(&mut self) -> MontageResult<&mut image::RgbaImage> {
        self.surface.as_mut().ok_or_else(already_destroyed)
    }
}

fn already_destroyed() -> MontageError {
    MontageError::used_outside_scope("canvas has been destroyed")
}

impl Canvas for RasterCanvas {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn composite(
        &mut self,
        image_bytes: &[u8],
        x: i64,
        y: i64,
        width: u32,
        height: u32,
    ) -> MontageResult<()> {
        self.live()?;
        let decoded = decode_rgba(image_bytes)?;
        let resampled = if decoded.dimensions() == (width, height) {
            decoded
        } else {
            imageops::resize(&decoded, width, height, FilterType::Triangle)
        };
        imageops::overlay(self.live_mut()?, &resampled, x, y);
        Ok(())
    }

    fn alpha_mask(&mut self, mask_bytes: &[u8]) -> MontageResult<()> {
        self.live()?;
        let mask = decode_rgba(mask_bytes)?;
        let surface = self.live_mut()?;

        let width = surface.width().min(mask.width());
        let height = surface.height().min(mask.height());
        for y in 0..height {
            for x in 0..width {
                let red = mask.get_pixel(x, y).0[0];
                surface.get_pixel_mut(x, y).0[3] = red;
            }
        }
        Ok(())
    }

    fn encode(&self, format: ImageFormat) -> MontageResult<Vec<u8>> {
        encode_rgba(self.live()?, format)
    }

    fn destroy(&mut self) {
        self.surface = None;
    }

    fn is_destroyed(&self) -> bool {
        self.surface.is_none()
    }
}
