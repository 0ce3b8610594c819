use crate::foundation::error::{MontageError, MontageResult};

/// Integer pixel dimensions of an image, canvas or fit target.
///
/// The aspect ratio is always recomputed from the current width and height so
/// it can never drift out of sync with them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Size {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Size {
    /// Create a validated size with both dimensions positive.
    pub fn new(width: u32, height: u32) -> MontageResult<Self> {
        if width == 0 || height == 0 {
            return Err(MontageError::invalid_argument(
                "size dimensions must be positive",
            ));
        }
        Ok(Self { width, height })
    }

    /// Width over height as a real number.
    pub fn aspect_ratio(self) -> f64 {
        f64::from(self.width) / f64::from(self.height)
    }

    /// Truncate real-valued dimensions to integer pixels.
    ///
    /// Truncation happens here and nowhere earlier. Extreme aspect ratios can
    /// truncate a dimension to zero; a fit result never collapses below one
    /// pixel.
    fn from_f64(width: f64, height: f64) -> MontageResult<Self> {
        if !width.is_finite() || !height.is_finite() || width < 0.0 || height < 0.0 {
            return Err(MontageError::invalid_argument(
                "computed size is not a finite non-negative value",
            ));
        }
        Ok(Self {
            width: (width.trunc() as u32).max(1),
            height: (height.trunc() as u32).max(1),
        })
    }
}

/// Compute output dimensions that fit `source` within `bounds`.
///
/// With `preserve_aspect_ratio` the result keeps the source width/height ratio
/// and satisfies `width <= bounds.width` and `height <= bounds.height`; the
/// tightest bound wins, and an exact tie selects the height-constrained
/// branch. Without it the result is exactly `bounds`.
pub fn fit(source: Size, bounds: Size, preserve_aspect_ratio: bool) -> MontageResult<Size> {
    if source.width == 0 || source.height == 0 {
        return Err(MontageError::invalid_argument(
            "fit source dimensions must be positive",
        ));
    }
    if bounds.width == 0 || bounds.height == 0 {
        return Err(MontageError::invalid_argument(
            "fit bounds dimensions must be positive",
        ));
    }

    if !preserve_aspect_ratio {
        return Ok(bounds);
    }

    let aspect = source.aspect_ratio();

    // Width the result would have if it matched the bound height exactly.
    let naive_width = f64::from(bounds.height) * aspect;
    let (width, height) = if naive_width <= f64::from(bounds.width) {
        (naive_width, naive_width / aspect)
    } else {
        let height = f64::from(bounds.width) / aspect;
        (height * aspect, height)
    };

    Size::from_f64(width, height)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn size(w: u32, h: u32) -> Size {
        Size::new(w, h).unwrap()
    }

    #[test]
    fn no_preserve_returns_bounds_exactly() {
        let out = fit(size(1327, 1260), size(115, 95), false).unwrap();
        assert_eq!(out, size(115, 95));
    }

    #[test]
    fn height_constrained_branch() {
        // 1327x1260 into 800x400: the height is the tightest bound.
        let out = fit(size(1327, 1260), size(800, 400), true).unwrap();
        assert_eq!(out, size(421, 400));
    }

    #[test]
    fn width_constrained_branch() {
        // 100x50 into 80x400: the width is the tightest bound.
        let out = fit(size(100, 50), size(80, 400), true).unwrap();
        assert_eq!(out, size(80, 40));
    }

    #[test]
    fn exact_tie_selects_height_branch() {
        // naive_width == bounds.width exactly.
        let out = fit(size(2, 1), size(200, 100), true).unwrap();
        assert_eq!(out, size(200, 100));
    }

    #[test]
    fn truncates_only_at_result_construction() {
        // 3x2 into 100x100: height = 100 / 1.5 = 66.66.. -> 66,
        // width recovered as 66.66.. * 1.5 = 100.0 -> 100.
        let out = fit(size(3, 2), size(100, 100), true).unwrap();
        assert_eq!(out, size(100, 66));
    }

    #[test]
    fn preserved_fit_stays_within_bounds_and_keeps_ratio() {
        let sources = [(1, 1), (1327, 1260), (1920, 1080), (3, 999), (999, 3)];
        let bounds = [(1, 1), (115, 95), (800, 400), (400, 800), (64, 64)];
        for &(sw, sh) in &sources {
            for &(bw, bh) in &bounds {
                let out = fit(size(sw, sh), size(bw, bh), true).unwrap();
                assert!(out.width <= bw, "{sw}x{sh} into {bw}x{bh} -> {out:?}");
                assert!(out.height <= bh, "{sw}x{sh} into {bw}x{bh} -> {out:?}");

                // Skip ratio checks at tiny outputs: truncation loses up to
                // one pixel per axis, which dominates the ratio below ~32px.
                if out.width.min(out.height) >= 32 {
                    let got = out.aspect_ratio();
                    let want = size(sw, sh).aspect_ratio();
                    assert!(
                        (got - want).abs() / want < 0.05,
                        "{sw}x{sh} into {bw}x{bh} -> {out:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        let zero = Size {
            width: 0,
            height: 10,
        };
        assert!(matches!(
            fit(zero, size(10, 10), true),
            Err(MontageError::InvalidArgument(_))
        ));
        assert!(matches!(
            fit(size(10, 10), Size { width: 10, height: 0 }, true),
            Err(MontageError::InvalidArgument(_))
        ));
        assert!(matches!(
            Size::new(0, 0),
            Err(MontageError::InvalidArgument(_))
        ));
    }
}
