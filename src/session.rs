//! Resource-scoped compositing sessions.
//!
//! A session owns exactly one canvas for the duration of a unit of work.
//! The canvas is live while the work runs and is destroyed unconditionally
//! when the work returns, fails or unwinds; afterwards every call on the
//! handle fails with [`MontageError::UsedOutsideScope`].

use std::path::Path;

use crate::canvas::{BackendKind, Canvas, create_canvas};
use crate::foundation::error::{MontageError, MontageResult};
use crate::foundation::geometry::{Size, fit};
use crate::probe::{self, ImageFormat};

/// Placement and scaling options for one composite call.
///
/// `width`/`height` default to the source image's intrinsic size; with
/// `preserve_aspect_ratio` (the default) they act as bounds for an
/// aspect-preserving fit, otherwise they are taken literally.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CompositeOptions {
    /// X coordinate of the upper-left corner of the image.
    pub x: i64,
    /// Y coordinate of the upper-left corner of the image.
    pub y: i64,
    /// Bound width; `None` means the source's intrinsic width.
    pub width: Option<u32>,
    /// Bound height; `None` means the source's intrinsic height.
    pub height: Option<u32>,
    /// Keep the source width/height ratio when scaling.
    pub preserve_aspect_ratio: bool,
}

impl Default for CompositeOptions {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
            width: None,
            height: None,
            preserve_aspect_ratio: true,
        }
    }
}

impl CompositeOptions {
    /// Return options with the given placement.
    pub fn with_position(mut self, x: i64, y: i64) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    /// Return options with explicit scaling bounds.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Return options with aspect-ratio preservation toggled.
    pub fn with_preserve_aspect_ratio(mut self, preserve: bool) -> Self {
        self.preserve_aspect_ratio = preserve;
        self
    }
}

/// Options controlling session construction.
#[derive(Clone, Copy, Debug, Default)]
pub struct SessionOpts {
    /// Canvas backend used for the session's surface.
    pub backend: BackendKind,
}

/// Session handle passed to the unit of work.
///
/// Constructed only through [`CompositeSession::run`] or
/// [`CompositeSession::run_with`]; the handle cannot outlive the work
/// closure, and the live flag additionally rejects any call made after the
/// session ended.
pub struct CompositeSession {
    canvas: Box<dyn Canvas>,
    live: bool,
}

impl CompositeSession {
    /// Run `work` against a fresh canvas of the given size on the default
    /// backend.
    pub fn run<T>(
        width: u32,
        height: u32,
        work: impl FnOnce(&mut CompositeSession) -> MontageResult<T>,
    ) -> MontageResult<T> {
        Self::run_with(SessionOpts::default(), width, height, work)
    }

    /// Run `work` against a fresh canvas of the given size.
    ///
    /// The canvas is destroyed when `work` completes, whether it returns,
    /// errors or unwinds; the session result is the work's result.
    #[tracing::instrument(skip(work), err)]
    pub fn run_with<T>(
        opts: SessionOpts,
        width: u32,
        height: u32,
        work: impl FnOnce(&mut CompositeSession) -> MontageResult<T>,
    ) -> MontageResult<T> {
        if width == 0 || height == 0 {
            return Err(MontageError::invalid_argument(
                "session dimensions must be positive",
            ));
        }
        let canvas = create_canvas(opts.backend, width, height)?;
        let mut session = Self { canvas, live: true };
        let out = work(&mut session);
        session.finish();
        out
    }

    fn finish(&mut self) {
        self.live = false;
        self.canvas.destroy();
    }

    fn ensure_live(&self) -> MontageResult<()> {
        if self.live {
            Ok(())
        } else {
            Err(MontageError::used_outside_scope(
                "session has already ended",
            ))
        }
    }

    /// Canvas width in pixels.
    pub fn width(&self) -> u32 {
        self.canvas.width()
    }

    /// Canvas height in pixels.
    pub fn height(&self) -> u32 {
        self.canvas.height()
    }

    /// Composite raw image bytes onto the canvas.
    ///
    /// The source is probed for its intrinsic size, the options are merged
    /// over their defaults, and the resolved geometry is handed to the
    /// canvas.
    pub fn composite(&mut self, image_bytes: &[u8], opts: CompositeOptions) -> MontageResult<()> {
        self.ensure_live()?;

        let info = probe::info(image_bytes)?;
        let source = Size::new(info.width, info.height)?;
        let bounds = Size::new(
            opts.width.unwrap_or(info.width),
            opts.height.unwrap_or(info.height),
        )?;
        let target = fit(source, bounds, opts.preserve_aspect_ratio)?;

        tracing::debug!(
            source_width = source.width,
            source_height = source.height,
            x = opts.x,
            y = opts.y,
            width = target.width,
            height = target.height,
            "composite"
        );
        self.canvas
            .composite(image_bytes, opts.x, opts.y, target.width, target.height)
    }

    /// Composite an image file onto the canvas. Accepts the same options as
    /// [`composite`](Self::composite).
    pub fn composite_file(
        &mut self,
        path: impl AsRef<Path>,
        opts: CompositeOptions,
    ) -> MontageResult<()> {
        self.ensure_live()?;
        let bytes = std::fs::read(path)?;
        self.composite(&bytes, opts)
    }

    /// Apply raw mask bytes as the canvas alpha channel.
    pub fn alpha_mask(&mut self, mask_bytes: &[u8]) -> MontageResult<()> {
        self.ensure_live()?;
        self.canvas.alpha_mask(mask_bytes)
    }

    /// Apply a mask file as the canvas alpha channel.
    pub fn alpha_mask_file(&mut self, path: impl AsRef<Path>) -> MontageResult<()> {
        self.ensure_live()?;
        let bytes = std::fs::read(path)?;
        self.alpha_mask(&bytes)
    }

    /// Encode the current canvas state into `format`.
    pub fn encode(&self, format: ImageFormat) -> MontageResult<Vec<u8>> {
        self.ensure_live()?;
        self.canvas.encode(format)
    }

    /// Encode the canvas into the format named by `path`'s extension and
    /// write it out.
    ///
    /// Fails with [`MontageError::UnsupportedFormat`] when the extension is
    /// missing or not an encode target, and with [`MontageError::Io`] when
    /// the write fails.
    pub fn write(&self, path: impl AsRef<Path>) -> MontageResult<()> {
        self.ensure_live()?;
        let path = path.as_ref();

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| {
                MontageError::unsupported_format("output path has no file extension")
            })?;
        let format = ImageFormat::from_extension(ext)
            .filter(|f| f.is_encode_target())
            .ok_or_else(|| {
                MontageError::unsupported_format(format!(
                    "'{ext}' is not a supported encode target"
                ))
            })?;

        let bytes = self.canvas.encode(format)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

impl Drop for CompositeSession {
    // Cleanup must also run when the work unit unwinds.
    fn drop(&mut self) {
        if self.live {
            self.finish();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::path::PathBuf;

    use super::*;
    use crate::probe;

    fn solid_png(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    struct TempPath(PathBuf);

    impl TempPath {
        fn new(name: &str) -> Self {
            Self(std::env::temp_dir().join(format!("montage_session_{}_{name}", std::process::id())))
        }
    }

    impl Drop for TempPath {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.0);
        }
    }

    #[test]
    fn run_rejects_empty_dimensions() {
        let out = CompositeSession::run(0, 10, |_| Ok(()));
        assert!(matches!(out, Err(MontageError::InvalidArgument(_))));
        let out = CompositeSession::run(10, 0, |_| Ok(()));
        assert!(matches!(out, Err(MontageError::InvalidArgument(_))));
    }

    #[test]
    fn run_returns_work_result_and_propagates_errors() {
        let out = CompositeSession::run(4, 4, |s| s.encode(ImageFormat::Png)).unwrap();
        let info = probe::info(&out).unwrap();
        assert_eq!((info.width, info.height), (4, 4));

        let err = CompositeSession::run(4, 4, |s| s.composite(b"garbage", CompositeOptions::default()));
        assert!(matches!(err, Err(MontageError::Format(_))));
    }

    #[test]
    fn default_options_use_intrinsic_size() {
        // A 6x2 source on a 4x4 canvas with default options keeps its
        // intrinsic size; the canvas clips the overflow.
        let out = CompositeSession::run(4, 4, |s| {
            s.composite(&solid_png(6, 2, [255, 0, 0, 255]), CompositeOptions::default())?;
            s.encode(ImageFormat::Png)
        })
        .unwrap();

        let img = image::load_from_memory(&out).unwrap().to_rgba8();
        assert_eq!(img.get_pixel(3, 0).0, [255, 0, 0, 255]);
        assert_eq!(img.get_pixel(0, 2).0, [0, 0, 0, 0]);
    }

    #[test]
    fn explicit_bounds_fit_preserving_aspect() {
        // 100x50 source bounded to 40x40 keeps the 2:1 ratio -> 40x20.
        let out = CompositeSession::run(64, 64, |s| {
            s.composite(
                &solid_png(100, 50, [0, 0, 255, 255]),
                CompositeOptions::default().with_size(40, 40),
            )?;
            s.encode(ImageFormat::Png)
        })
        .unwrap();

        let img = image::load_from_memory(&out).unwrap().to_rgba8();
        assert_eq!(img.get_pixel(39, 19).0[3], 255);
        assert_eq!(img.get_pixel(39, 21).0[3], 0);
        assert_eq!(img.get_pixel(41, 0).0[3], 0);
    }

    #[test]
    fn partial_bounds_default_to_intrinsic_dimension() {
        // Only a height bound: the width bound defaults to the intrinsic
        // width, so the fit is height-constrained.
        let out = CompositeSession::run(64, 64, |s| {
            s.composite(
                &solid_png(50, 50, [0, 255, 0, 255]),
                CompositeOptions {
                    height: Some(10),
                    ..Default::default()
                },
            )?;
            s.encode(ImageFormat::Png)
        })
        .unwrap();

        let img = image::load_from_memory(&out).unwrap().to_rgba8();
        assert_eq!(img.get_pixel(9, 9).0[3], 255);
        assert_eq!(img.get_pixel(11, 11).0[3], 0);
    }

    #[test]
    fn zero_option_bound_is_invalid_argument() {
        let err = CompositeSession::run(8, 8, |s| {
            s.composite(
                &solid_png(4, 4, [1, 2, 3, 255]),
                CompositeOptions::default().with_size(0, 10),
            )
        });
        assert!(matches!(err, Err(MontageError::InvalidArgument(_))));
    }

    #[test]
    fn handle_is_unusable_after_session_ends() {
        let mut session = CompositeSession {
            canvas: create_canvas(BackendKind::Raster, 2, 2).unwrap(),
            live: true,
        };
        session.finish();

        assert!(matches!(
            session.composite(&solid_png(1, 1, [0, 0, 0, 255]), CompositeOptions::default()),
            Err(MontageError::UsedOutsideScope(_))
        ));
        assert!(matches!(
            session.alpha_mask(&solid_png(1, 1, [0, 0, 0, 255])),
            Err(MontageError::UsedOutsideScope(_))
        ));
        assert!(matches!(
            session.encode(ImageFormat::Png),
            Err(MontageError::UsedOutsideScope(_))
        ));
        assert!(matches!(
            session.write("out.png"),
            Err(MontageError::UsedOutsideScope(_))
        ));
    }

    #[test]
    fn work_errors_propagate_unchanged() {
        let err = CompositeSession::run(4, 4, |_| -> MontageResult<()> {
            Err(MontageError::format("forced failure"))
        });
        assert!(matches!(err, Err(MontageError::Format(_))));
    }

    #[test]
    fn write_derives_format_from_extension() {
        let png_path = TempPath::new("write.png");
        let text_path = TempPath::new("write.txt");

        CompositeSession::run(9, 6, |s| {
            s.composite(&solid_png(9, 6, [5, 6, 7, 255]), CompositeOptions::default())?;

            assert!(matches!(
                s.write(&text_path.0),
                Err(MontageError::UnsupportedFormat(_))
            ));
            assert!(matches!(
                s.write(std::env::temp_dir().join("montage_noext")),
                Err(MontageError::UnsupportedFormat(_))
            ));

            s.write(&png_path.0)
        })
        .unwrap();

        let info = probe::file_info(&png_path.0).unwrap();
        assert_eq!((info.width, info.height), (9, 6));
        assert_eq!(info.format, ImageFormat::Png);
    }

    #[test]
    fn composite_file_and_alpha_mask_file_read_from_disk() {
        let src_path = TempPath::new("source.png");
        let mask_path = TempPath::new("mask.png");
        std::fs::write(&src_path.0, solid_png(3, 3, [50, 60, 70, 255])).unwrap();
        std::fs::write(&mask_path.0, solid_png(3, 3, [128, 0, 0, 255])).unwrap();

        let out = CompositeSession::run(3, 3, |s| {
            s.composite_file(&src_path.0, CompositeOptions::default())?;
            s.alpha_mask_file(&mask_path.0)?;
            s.encode(ImageFormat::Png)
        })
        .unwrap();

        let img = image::load_from_memory(&out).unwrap().to_rgba8();
        assert!(img.pixels().all(|p| p.0[3] == 128));

        let missing = CompositeSession::run(3, 3, |s| {
            s.composite_file("/nonexistent/montage.png", CompositeOptions::default())
        });
        assert!(matches!(missing, Err(MontageError::Io(_))));
    }
}
