//! One-call thumbnail generation on top of probe, fit and sessions.

use std::path::Path;

use crate::canvas::BackendKind;
use crate::foundation::error::MontageResult;
use crate::foundation::geometry::{Size, fit};
use crate::probe::{self, ImageFormat};
use crate::session::{CompositeOptions, CompositeSession, SessionOpts};

/// Options controlling thumbnail generation.
#[derive(Clone, Copy, Debug)]
pub struct ThumbnailOpts {
    /// Bound width of the thumbnail.
    pub width: u32,
    /// Bound height of the thumbnail.
    pub height: u32,
    /// Keep the source width/height ratio when scaling (default true).
    pub preserve_aspect_ratio: bool,
    /// Output encode format (default PNG).
    pub format: ImageFormat,
    /// Canvas backend (default raster).
    pub backend: BackendKind,
}

impl ThumbnailOpts {
    /// Options for a thumbnail bounded by `width` x `height`, preserving
    /// aspect ratio and encoding to PNG.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            preserve_aspect_ratio: true,
            format: ImageFormat::Png,
            backend: BackendKind::default(),
        }
    }

    /// Return options with aspect-ratio preservation toggled.
    pub fn with_preserve_aspect_ratio(mut self, preserve: bool) -> Self {
        self.preserve_aspect_ratio = preserve;
        self
    }

    /// Return options with the given encode format.
    pub fn with_format(mut self, format: ImageFormat) -> Self {
        self.format = format;
        self
    }

    /// Return options with the given canvas backend.
    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }
}

/// Produce an encoded thumbnail of `image_bytes`.
///
/// Probes the source, fits it within the requested bounds, runs a session of
/// exactly the fitted size and composites the source filling the whole
/// canvas. The ratio is already resolved by the fit, so the inner composite
/// scales literally.
#[tracing::instrument(skip(image_bytes), err)]
pub fn thumbnail(image_bytes: &[u8], opts: ThumbnailOpts) -> MontageResult<Vec<u8>> {
    let info = probe::info(image_bytes)?;
    let source = Size::new(info.width, info.height)?;
    let bounds = Size::new(opts.width, opts.height)?;
    let target = fit(source, bounds, opts.preserve_aspect_ratio)?;

    CompositeSession::run_with(
        SessionOpts {
            backend: opts.backend,
        },
        target.width,
        target.height,
        |session| {
            session.composite(
                image_bytes,
                CompositeOptions::default()
                    .with_size(target.width, target.height)
                    .with_preserve_aspect_ratio(false),
            )?;
            session.encode(opts.format)
        },
    )
}

/// Read `input`, produce a thumbnail and write it to `output`.
///
/// The encode format comes from the options, not from the output path.
pub fn thumbnail_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    opts: ThumbnailOpts,
) -> MontageResult<()> {
    let bytes = std::fs::read(input)?;
    let out = thumbnail(&bytes, opts)?;
    std::fs::write(output, out)?;
    Ok(())
}
