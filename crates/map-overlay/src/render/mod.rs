//! Output paths for a reprojected field: raw floats, flat PNG, composite PNG.

pub mod binary;
pub mod composite;
pub mod flat;

use crate::fields::FieldSpec;
use crate::units::apply_transform;
use overlay_common::{field::finite_range, Field2D, OverlayError, Result};

/// Stand-in for missing cells in binary payloads.
pub const NAN_SENTINEL: f32 = -9999.0;

/// Fill opacity when the caller gives none.
pub const DEFAULT_OPACITY: f32 = 0.8;

/// Overlay line widths are given in points at 100 dpi.
pub(crate) const POINTS_TO_PIXELS: f32 = 100.0 / 72.0;

/// Field values in display units.
pub(crate) fn to_display_units(mut field: Field2D, spec: &FieldSpec) -> Field2D {
    apply_transform(spec.transform, field.data_mut());
    field
}

/// Observed finite range, or `fallback` when nothing is finite.
pub(crate) fn observed_range(values: &[f32], fallback: (f32, f32)) -> (f32, f32) {
    finite_range(values).unwrap_or(fallback)
}

/// Reverse pixel rows so row 0 is the northern edge.
pub(crate) fn flip_pixel_rows(pixels: &mut [u8], nx: usize) {
    let stride = nx * 4;
    if stride == 0 {
        return;
    }
    let ny = pixels.len() / stride;
    for row in 0..ny / 2 {
        let other = ny - 1 - row;
        let (head, tail) = pixels.split_at_mut(other * stride);
        head[row * stride..(row + 1) * stride].swap_with_slice(&mut tail[..stride]);
    }
}

/// Ramp-colored straight RGBA, north row first.
pub(crate) fn fill_pixels(
    field: &Field2D,
    ramp_name: &str,
    range: (f32, f32),
    opacity: f32,
    transparent_below: Option<f32>,
) -> Vec<u8> {
    let lut = renderer::ramp(ramp_name);
    let mut pixels = renderer::colorize(field.data(), &lut, range.0, range.1, opacity, transparent_below);
    flip_pixel_rows(&mut pixels, field.nx());
    pixels
}

pub(crate) fn encode(pixels: &[u8], nx: usize, ny: usize) -> Result<Vec<u8>> {
    renderer::encode_png(pixels, nx, ny).map_err(|e| OverlayError::Encode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flip_pixel_rows() {
        let mut px: Vec<u8> = (0..3u8).flat_map(|r| [r; 8]).collect();
        flip_pixel_rows(&mut px, 2);
        assert_eq!(&px[..8], &[2; 8]);
        assert_eq!(&px[16..], &[0; 8]);
    }

    #[test]
    fn test_observed_range_fallback() {
        assert_eq!(observed_range(&[f32::NAN], (1.0, 2.0)), (1.0, 2.0));
        assert_eq!(observed_range(&[5.0, f32::NAN, -1.0], (1.0, 2.0)), (-1.0, 5.0));
    }
}
