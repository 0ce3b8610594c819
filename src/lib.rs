//! Montage is a small image-composition facade.
//!
//! Given a target canvas size it composites source images at specified
//! positions, optionally rescaling each one to fit within bounds while
//! preserving its aspect ratio, applies an optional alpha mask, and encodes
//! the result. The public API is session-oriented:
//!
//! - Probe bytes or files with [`info`] / [`file_info`]
//! - Open a scoped [`CompositeSession`] and composite, mask and encode inside
//!   its unit of work; the canvas is destroyed on every exit path
//! - Or call [`thumbnail`] / [`thumbnail_file`] for the one-shot case
//!
//! Pixel work (decoding, resampling, blending, encoding) is delegated to the
//! rendering backends behind the [`Canvas`] capability interface; this crate
//! decides what geometry they receive and when their resources go away.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

pub mod canvas;
pub mod probe;
pub mod session;
pub mod thumbnail;

pub use crate::canvas::{BackendKind, Canvas, create_canvas};
pub use crate::foundation::error::{MontageError, MontageResult};
pub use crate::foundation::geometry::{Size, fit};
pub use crate::probe::{ImageFormat, ImageInfo, file_info, info};
pub use crate::session::{CompositeOptions, CompositeSession, SessionOpts};
pub use crate::thumbnail::{ThumbnailOpts, thumbnail, thumbnail_file};
