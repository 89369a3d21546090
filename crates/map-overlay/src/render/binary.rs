//! Raw float payload for client-side rendering.

use super::{observed_range, to_display_units, NAN_SENTINEL};
use crate::fields::FieldSpec;
use crate::reproject::Reprojected;
use crate::result::{ContentKind, OverlayResult};

/// Little-endian f32 values, south row first, missing cells as the sentinel.
pub fn render(reprojected: Reprojected, spec: &FieldSpec) -> OverlayResult {
    let Reprojected { field, bounds } = reprojected;
    let (ny, nx) = field.shape();
    let values = to_display_units(field, spec).into_data();
    let (vmin, vmax) = observed_range(&values, spec.default_range);

    let mut data = Vec::with_capacity(values.len() * 4);
    for v in values {
        let v = if v.is_finite() { v } else { NAN_SENTINEL };
        data.extend_from_slice(&v.to_le_bytes());
    }

    OverlayResult {
        data,
        content_kind: ContentKind::Binary,
        nx,
        ny,
        bounds,
        vmin,
        vmax,
        units: spec.units.to_string(),
        nan_value: Some(NAN_SENTINEL),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::field;
    use overlay_common::{Field2D, GeoBounds};

    fn reprojected(data: Vec<f32>) -> Reprojected {
        Reprojected {
            field: Field2D::new(1, data.len(), data).unwrap(),
            bounds: GeoBounds::new(30.0, 31.0, -100.0, -99.0),
        }
    }

    #[test]
    fn test_values_transformed_and_sentinel() {
        let spec = field("t2m").unwrap();
        let out = render(reprojected(vec![273.15, f32::NAN, 283.15]), spec);
        let values = out.values().unwrap();
        assert_eq!(values[1], NAN_SENTINEL);
        assert!((values[2] - 10.0).abs() < 1e-4);
        assert!((out.vmax - 10.0).abs() < 1e-4);
        assert_eq!(out.nan_value, Some(NAN_SENTINEL));
        assert_eq!(out.units, "°C");
    }

    #[test]
    fn test_all_missing_falls_back_to_default_range() {
        let spec = field("mslp").unwrap();
        let out = render(reprojected(vec![f32::NAN; 4]), spec);
        assert!(out.values().unwrap().iter().all(|&v| v == NAN_SENTINEL));
        assert_eq!((out.vmin, out.vmax), spec.default_range);
    }
}
