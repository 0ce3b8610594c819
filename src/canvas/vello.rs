//! Canvas backend on the `vello_cpu` rasterizer.
//!
//! The surface is a premultiplied RGBA8 pixmap. Each composite rasterizes the
//! decoded source through a fresh `RenderContext` into a transparent layer of
//! canvas size, then accumulates the layer onto the surface with a
//! premultiplied source-over blend. Straight alpha is restored at the encode
//! boundary so both backends share one encode path.

use std::sync::Arc;

use vello_cpu::kurbo::{Affine, Rect};

use crate::canvas::{Canvas, decode_rgba, encode_rgba};
use crate::foundation::error::{MontageError, MontageResult};
use crate::probe::ImageFormat;

/// Vector-rasterizer canvas. Alpha masks that do not match the canvas size
/// are clipped to the smaller of the two extents, same as the raster backend.
pub struct VelloCanvas {
    width: u32,
    height: u32,
    surface: Option<vello_cpu::Pixmap>,
}

impl VelloCanvas {
    /// Allocate a transparent surface. The pixmap coordinate space is u16, so
    /// dimensions above 65535 are rejected.
    pub(crate) fn new(width: u32, height: u32) -> MontageResult<Self> {
        let surface = transparent_pixmap(width, height)?;
        Ok(Self {
            width,
            height,
            surface: Some(surface),
        })
    }

    fn live(&self) -> MontageResult<&vello_cpu::Pixmap> {
        self.surface.as_ref().ok_or_else(already_destroyed)
    }

    fn live_mut(&mut self) -> MontageResult<&mut vello_cpu::Pixmap> {
        self.surface.as_mut().ok_or_else(already_destroyed)
    }
}

fn already_destroyed() -> MontageError {
    MontageError::used_outside_scope("canvas has been destroyed")
}

impl Canvas for VelloCanvas {
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
        let (src_width, src_height) = decoded.dimensions();

        let mut premul = decoded.into_raw();
        premultiply_rgba8_in_place(&mut premul);
        let src = pixmap_from_premul_bytes(&premul, src_width, src_height)?;
        let paint = vello_cpu::Image {
            image: vello_cpu::ImageSource::Pixmap(Arc::new(src)),
            sampler: vello_cpu::peniko::ImageSampler::default(),
        };

        let (w16, h16) = dims_u16(self.width, self.height)?;
        let mut ctx = vello_cpu::RenderContext::new(w16, h16);
        let scale_x = f64::from(width) / f64::from(src_width);
        let scale_y = f64::from(height) / f64::from(src_height);
        ctx.set_transform(
            Affine::translate((x as f64, y as f64)) * Affine::scale_non_uniform(scale_x, scale_y),
        );
        ctx.set_paint(paint);
        ctx.fill_rect(&Rect::new(
            0.0,
            0.0,
            f64::from(src_width),
            f64::from(src_height),
        ));
        ctx.flush();

        // `vello_cpu` renders into a fresh buffer, so render into a temp
        // layer and premul-over onto the surface.
        let mut layer = transparent_pixmap(self.width, self.height)?;
        ctx.render_to_pixmap(&mut layer);

        let surface = self.live_mut()?;
        premul_over_in_place(surface.data_as_u8_slice_mut(), layer.data_as_u8_slice())
    }

    fn alpha_mask(&mut self, mask_bytes: &[u8]) -> MontageResult<()> {
        self.live()?;
        let mask = decode_rgba(mask_bytes)?;

        let canvas_width = self.width;
        let width = canvas_width.min(mask.width());
        let height = self.height.min(mask.height());
        let surface = self.live_mut()?;
        let data = surface.data_as_u8_slice_mut();

        let stride = canvas_width as usize * 4;
        for y in 0..height {
            for x in 0..width {
                let i = y as usize * stride + x as usize * 4;
                let straight = unpremultiply_px([data[i], data[i + 1], data[i + 2], data[i + 3]]);
                let alpha = mask.get_pixel(x, y).0[0];
                let out = premultiply_px([straight[0], straight[1], straight[2], alpha]);
                data[i..i + 4].copy_from_slice(&out);
            }
        }
        Ok(())
    }

    fn encode(&self, format: ImageFormat) -> MontageResult<Vec<u8>> {
        let surface = self.live()?;
        let mut bytes = surface.data_as_u8_slice().to_vec();
        for px in bytes.chunks_exact_mut(4) {
            let straight = unpremultiply_px([px[0], px[1], px[2], px[3]]);
            px.copy_from_slice(&straight);
        }
        let img = image::RgbaImage::from_raw(self.width, self.height, bytes).ok_or_else(|| {
            MontageError::Other(anyhow::anyhow!("surface buffer size mismatch"))
        })?;
        encode_rgba(&img, format)
    }

    fn destroy(&mut self) {
        self.surface = None;
    }

    fn is_destroyed(&self) -> bool {
        self.surface.is_none()
    }
}

fn dims_u16(width: u32, height: u32) -> MontageResult<(u16, u16)> {
    let w: u16 = width
        .try_into()
        .map_err(|_| MontageError::invalid_argument("vello canvas width exceeds 65535"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| MontageError::invalid_argument("vello canvas height exceeds 65535"))?;
    Ok((w, h))
}

fn transparent_pixmap(width: u32, height: u32) -> MontageResult<vello_cpu::Pixmap> {
    let zeroed = vec![0u8; (width as usize) * (height as usize) * 4];
    pixmap_from_premul_bytes(&zeroed, width, height)
}

fn pixmap_from_premul_bytes(
    bytes: &[u8],
    width: u32,
    height: u32,
) -> MontageResult<vello_cpu::Pixmap> {
    let (w, h) = dims_u16(width, height)?;
    if bytes.len()
        != (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(4)
    {
        return Err(MontageError::Other(anyhow::anyhow!(
            "pixmap byte length mismatch"
        )));
    }
    let mut pixels = Vec::<vello_cpu::peniko::color::PremulRgba8>::with_capacity(
        (width as usize) * (height as usize),
    );
    for px in bytes.chunks_exact(4) {
        pixels.push(vello_cpu::peniko::color::PremulRgba8::from_u8_array([
            px[0], px[1], px[2], px[3],
        ]));
    }
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels, w, h, true,
    ))
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let out = premultiply_px([px[0], px[1], px[2], px[3]]);
        px.copy_from_slice(&out);
    }
}

fn premultiply_px(straight: [u8; 4]) -> [u8; 4] {
    let a = u16::from(straight[3]);
    if a == 0 {
        return [0, 0, 0, 0];
    }
    let premul = |c: u8| ((u16::from(c) * a + 127) / 255) as u8;
    [
        premul(straight[0]),
        premul(straight[1]),
        premul(straight[2]),
        straight[3],
    ]
}

fn unpremultiply_px(premul: [u8; 4]) -> [u8; 4] {
    let a = u32::from(premul[3]);
    if a == 0 {
        return [0, 0, 0, 0];
    }
    let straight = |c: u8| ((u32::from(c) * 255 + a / 2) / a).min(255) as u8;
    [
        straight(premul[0]),
        straight(premul[1]),
        straight(premul[2]),
        premul[3],
    ]
}

fn premul_over_in_place(dst: &mut [u8], src: &[u8]) -> MontageResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(MontageError::Other(anyhow::anyhow!(
            "source-over blend expects equal-length rgba8 buffers"
        )));
    }
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let sa = u16::from(s[3]);
        if sa == 0 {
            continue;
        }
        let inv = 255u16 - sa;
        for i in 0..4 {
            let dc = ((u32::from(d[i]) * u32::from(inv) + 127) / 255) as u8;
            d[i] = s[i].saturating_add(dc);
        }
    }
    Ok(())
}
