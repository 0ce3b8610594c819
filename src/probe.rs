//! Image probing: intrinsic dimensions and format tag from raw bytes.
//!
//! Sniffing is delegated to the `image` crate; only the header is inspected,
//! the pixel data is never decoded here.

use std::fmt;
use std::io::Cursor;
use std::path::Path;

use crate::foundation::error::{MontageError, MontageResult};

/// Recognized raster image formats.
///
/// Probing recognizes all variants; only [`Jpeg`](ImageFormat::Jpeg),
/// [`Png`](ImageFormat::Png) and [`Gif`](ImageFormat::Gif) are encode
/// targets. There is no "unknown" variant; unrecognized data is an error, not
/// a value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// JPEG/JFIF.
    Jpeg,
    /// Portable Network Graphics.
    Png,
    /// Graphics Interchange Format.
    Gif,
    /// WebP (probe only).
    WebP,
    /// Windows bitmap (probe only).
    Bmp,
    /// Tagged Image File Format (probe only).
    Tiff,
}

impl ImageFormat {
    /// Map the sniffer's format tag to the canonical enum.
    ///
    /// Returns `None` for formats this crate does not recognize.
    pub(crate) fn from_sniffed(format: image::ImageFormat) -> Option<Self> {
        match format {
            image::ImageFormat::Jpeg => Some(Self::Jpeg),
            image::ImageFormat::Png => Some(Self::Png),
            image::ImageFormat::Gif => Some(Self::Gif),
            image::ImageFormat::WebP => Some(Self::WebP),
            image::ImageFormat::Bmp => Some(Self::Bmp),
            image::ImageFormat::Tiff => Some(Self::Tiff),
            _ => None,
        }
    }

    /// Map a file extension to a format, ASCII-case-insensitively.
    ///
    /// `jpg` and `jpeg` are the same format.
    pub fn from_extension(ext: &str) -> Option<Self> {
        let matches = |s: &str| ext.eq_ignore_ascii_case(s);
        if matches("jpg") || matches("jpeg") {
            Some(Self::Jpeg)
        } else if matches("png") {
            Some(Self::Png)
        } else if matches("gif") {
            Some(Self::Gif)
        } else if matches("webp") {
            Some(Self::WebP)
        } else if matches("bmp") {
            Some(Self::Bmp)
        } else if matches("tif") || matches("tiff") {
            Some(Self::Tiff)
        } else {
            None
        }
    }

    /// Whether a canvas can encode into this format.
    pub fn is_encode_target(self) -> bool {
        matches!(self, Self::Jpeg | Self::Png | Self::Gif)
    }

    /// Lowercase canonical name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::WebP => "webp",
            Self::Bmp => "bmp",
            Self::Tiff => "tiff",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Intrinsic metadata of an image buffer.
///
/// Produced fresh per probe call and never cached. Width and height are
/// always positive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ImageInfo {
    /// Intrinsic width in pixels.
    pub width: u32,
    /// Intrinsic height in pixels.
    pub height: u32,
    /// Recognized format tag.
    pub format: ImageFormat,
}

/// Probe raw image bytes for intrinsic size and format.
///
/// Fails with [`MontageError::Format`] when the data cannot be classified as
/// a recognized image format.
pub fn info(bytes: &[u8]) -> MontageResult<ImageInfo> {
    let reader = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| MontageError::format(format!("failed to sniff image data: {e}")))?;

    let sniffed = reader
        .format()
        .ok_or_else(|| MontageError::format("unrecognized image data"))?;
    let format = ImageFormat::from_sniffed(sniffed)
        .ok_or_else(|| MontageError::format(format!("unrecognized image format {sniffed:?}")))?;

    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| MontageError::format(format!("failed to read image header: {e}")))?;
    if width == 0 || height == 0 {
        return Err(MontageError::format("image header reports empty dimensions"));
    }

    Ok(ImageInfo {
        width,
        height,
        format,
    })
}

/// Probe an image file for intrinsic size and format.
///
/// Reads the file fully into memory and delegates to [`info`].
pub fn file_info(path: impl AsRef<Path>) -> MontageResult<ImageInfo> {
    let bytes = std::fs::read(path)?;
    info(&bytes)
}
