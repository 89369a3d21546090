//! Single-field color image.

use super::{encode, fill_pixels, observed_range, to_display_units, DEFAULT_OPACITY};
use crate::fields::FieldSpec;
use crate::reproject::Reprojected;
use crate::result::{ContentKind, OverlayResult};
use overlay_common::Result;

/// Display overrides for a flat image.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatImageOptions {
    /// Ramp name; the field default when `None`
    pub ramp: Option<String>,
    /// Display range; the field default when `None`
    pub range: Option<(f32, f32)>,
    pub opacity: f32,
}

impl Default for FlatImageOptions {
    fn default() -> Self {
        Self {
            ramp: None,
            range: None,
            opacity: DEFAULT_OPACITY,
        }
    }
}

pub fn render(reprojected: Reprojected, spec: &FieldSpec, options: &FlatImageOptions) -> Result<OverlayResult> {
    let Reprojected { field, bounds } = reprojected;
    let (ny, nx) = field.shape();
    let field = to_display_units(field, spec);

    let ramp = options.ramp.as_deref().unwrap_or(spec.default_ramp);
    let range = options.range.unwrap_or(spec.default_range);
    let (vmin, vmax) = observed_range(field.data(), range);

    let pixels = fill_pixels(&field, ramp, range, options.opacity, spec.transparent_below);
    let data = encode(&pixels, nx, ny)?;

    Ok(OverlayResult {
        data,
        content_kind: ContentKind::Png,
        nx,
        ny,
        bounds,
        vmin,
        vmax,
        units: spec.units.to_string(),
        nan_value: None,
    })
}
