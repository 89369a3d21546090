//! Vector overlay surface for contour and barb layers.
//!
//! Layers are stroked onto a transparent tiny-skia pixmap sized 1:1 with the
//! fill field and then blended source-over onto the straight-alpha fill
//! image. Geographic grids are indexed south to north while image rows run
//! north to south, so points go through [`OverlayCanvas::to_pixel`] instead
//! of a flipping transform (which would mirror label glyphs).

use crate::color::Rgba;
use crate::error::{RenderError, Result};
use tiny_skia::{Paint, Pixmap};

pub struct OverlayCanvas {
    pixmap: Pixmap,
    nx: usize,
    ny: usize,
}

impl OverlayCanvas {
    /// Transparent canvas for an `ny` x `nx` grid.
    pub fn new(nx: usize, ny: usize) -> Result<Self> {
        let pixmap = Pixmap::new(nx as u32, ny as u32).ok_or(RenderError::Canvas {
            width: nx,
            height: ny,
        })?;
        Ok(Self { pixmap, nx, ny })
    }

    pub fn width(&self) -> usize {
        self.nx
    }

    pub fn height(&self) -> usize {
        self.ny
    }

    /// Grid (column, row) with row 0 at the south edge to pixel-center coordinates.
    #[inline]
    pub fn to_pixel(&self, col: f32, row: f32) -> (f32, f32) {
        (col + 0.5, self.ny as f32 - 0.5 - row)
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub fn pixmap_mut(&mut self) -> &mut Pixmap {
        &mut self.pixmap
    }

    /// Whether anything has been drawn.
    pub fn is_blank(&self) -> bool {
        self.pixmap.pixels().iter().all(|p| p.alpha() == 0)
    }

    /// Blend this layer source-over onto a straight RGBA image of the same size.
    pub fn composite_onto(&self, base: &mut [u8]) -> Result<()> {
        let expected = self.nx * self.ny * 4;
        if base.len() != expected {
            return Err(RenderError::BufferSize {
                width: self.nx,
                height: self.ny,
                expected,
                actual: base.len(),
            });
        }

        for (dst, src) in base.chunks_exact_mut(4).zip(self.pixmap.pixels()) {
            let src_a = src.alpha();
            if src_a == 0 {
                continue;
            }
            // tiny-skia stores premultiplied color
            let src_a_f = src_a as f32 / 255.0;
            let dst_a_f = dst[3] as f32 / 255.0;
            let out_a = src_a_f + dst_a_f * (1.0 - src_a_f);
            let keep = dst_a_f * (1.0 - src_a_f);

            let blend = |s: u8, d: u8| -> u8 {
                ((s as f32 + d as f32 * keep) / out_a).round().min(255.0) as u8
            };
            dst[0] = blend(src.red(), dst[0]);
            dst[1] = blend(src.green(), dst[1]);
            dst[2] = blend(src.blue(), dst[2]);
            dst[3] = (out_a * 255.0).round() as u8;
        }
        Ok(())
    }
}

/// Anti-aliased solid paint from straight RGBA.
pub(crate) fn solid_paint(color: Rgba) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(color[0], color[1], color[2], color[3]);
    paint.anti_alias = true;
    paint
}
