//! Canvas capability interface and the interchangeable backends behind it.
//!
//! A canvas is a mutable transparent drawing surface owned by exactly one
//! compositing session. Both backends satisfy the same observable contract;
//! which one runs is a single factory decision made when the session opens.

pub mod raster;
pub mod vello;

use std::io::Cursor;

use crate::foundation::error::{MontageError, MontageResult};
use crate::probe::ImageFormat;

/// Mutable drawing surface with a bounded lifetime.
///
/// A canvas is `live` from creation until [`destroy`](Canvas::destroy) runs,
/// after which every drawing or encoding call fails with
/// [`MontageError::UsedOutsideScope`]. `destroy` itself is idempotent.
///
/// `composite`, `alpha_mask` and `encode` carry default bodies that report
/// [`MontageError::NotImplemented`]; a conforming backend overrides all
/// three. This keeps backend completeness a checkable runtime property
/// rather than a silent gap.
pub trait Canvas {
    /// Canvas width in pixels.
    fn width(&self) -> u32;

    /// Canvas height in pixels.
    fn height(&self) -> u32;

    /// Decode `image_bytes`, resample to `width` x `height` with the
    /// backend's fixed deterministic filter, and draw at `(x, y)` with
    /// source-over blending. Content outside the canvas is clipped; negative
    /// coordinates are allowed.
    ///
    /// Fails with [`MontageError::Format`] when the bytes do not decode.
    fn composite(
        &mut self,
        image_bytes: &[u8],
        x: i64,
        y: i64,
        width: u32,
        height: u32,
    ) -> MontageResult<()> {
        let _ = (image_bytes, x, y, width, height);
        Err(MontageError::not_implemented("composite"))
    }

    /// Decode the mask image and replace the canvas alpha channel with the
    /// mask's red channel, discarding the mask's own alpha.
    ///
    /// When the mask and canvas sizes differ, both backends clip to the
    /// smaller of the two extents.
    fn alpha_mask(&mut self, mask_bytes: &[u8]) -> MontageResult<()> {
        let _ = mask_bytes;
        Err(MontageError::not_implemented("alpha_mask"))
    }

    /// Serialize the current pixel state into `format`.
    ///
    /// An idempotent read: calling it repeatedly yields the same bytes and
    /// never mutates the canvas. Fails with
    /// [`MontageError::UnsupportedFormat`] for non encode targets.
    fn encode(&self, format: ImageFormat) -> MontageResult<Vec<u8>> {
        let _ = format;
        Err(MontageError::not_implemented("encode"))
    }

    /// Release backend resources. Calling this again after the canvas is
    /// already destroyed is a no-op.
    fn destroy(&mut self);

    /// Whether [`destroy`](Canvas::destroy) has run.
    fn is_destroyed(&self) -> bool;
}

/// Available canvas backends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BackendKind {
    /// Pure-raster backend on the `image` crate. Always available.
    #[default]
    Raster,
    /// Vector-rasterizer backend on `vello_cpu`.
    Vello,
}

/// Create a live transparent canvas of the given pixel dimensions.
///
/// Fails with [`MontageError::InvalidArgument`] when either dimension is
/// zero.
pub fn create_canvas(
    kind: BackendKind,
    width: u32,
    height: u32,
) -> MontageResult<Box<dyn Canvas>> {
    if width == 0 || height == 0 {
        return Err(MontageError::invalid_argument(
            "canvas dimensions must be positive",
        ));
    }
    match kind {
        BackendKind::Raster => Ok(Box::new(raster::RasterCanvas::new(width, height))),
        BackendKind::Vello => Ok(Box::new(vello::VelloCanvas::new(width, height)?)),
    }
}

/// Decode image bytes into straight-alpha RGBA8.
pub(crate) fn decode_rgba(bytes: &[u8]) -> MontageResult<image::RgbaImage> {
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| MontageError::format(format!("undecodable image data: {e}")))?;
    Ok(dyn_img.to_rgba8())
}

/// Encode a straight-alpha RGBA8 surface into `format`.
///
/// Shared by both backends so encode behavior is identical across them.
pub(crate) fn encode_rgba(surface: &image::RgbaImage, format: ImageFormat) -> MontageResult<Vec<u8>> {
    if !format.is_encode_target() {
        return Err(MontageError::unsupported_format(format!(
            "'{format}' is not a supported encode target"
        )));
    }

    let mut buf = Vec::new();
    match format {
        ImageFormat::Png => surface
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .map_err(|e| MontageError::Other(anyhow::anyhow!("png encode failed: {e}")))?,
        ImageFormat::Gif => surface
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Gif)
            .map_err(|e| MontageError::Other(anyhow::anyhow!("gif encode failed: {e}")))?,
        ImageFormat::Jpeg => {
            // The JPEG encoder has no alpha channel to carry.
            let rgb = image::DynamicImage::ImageRgba8(surface.clone()).to_rgb8();
            rgb.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Jpeg)
                .map_err(|e| MontageError::Other(anyhow::anyhow!("jpeg encode failed: {e}")))?;
        }
        ImageFormat::WebP | ImageFormat::Bmp | ImageFormat::Tiff => unreachable!(),
    }
    Ok(buf)
}
