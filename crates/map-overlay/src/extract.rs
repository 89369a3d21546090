//! Pull a native 2-D field out of a forecast hour.
//!
//! Values come back in native units; display transforms are applied by the
//! render paths.

use crate::derive::{self, HdwProfile};
use crate::fields::{Derivation, FieldSource, FieldSpec};
use overlay_common::{Field2D, FieldArray, ForecastHour, OverlayError, Result};
use tracing::debug;

/// Tolerance when matching a requested level against recorded pressures.
const LEVEL_TOLERANCE_HPA: f64 = 1.0;

/// Index of the first recorded pressure level within 1 hPa of `level`.
pub fn level_index(fh: &dyn ForecastHour, level: f64) -> Option<usize> {
    let levels = fh.lookup("pressure_levels")?.as_axis()?;
    levels
        .iter()
        .position(|&p| (p as f64 - level).abs() < LEVEL_TOLERANCE_HPA)
}

/// Reduce an attribute to one 2-D slice.
///
/// 2-D arrays pass through whatever the level. 3-D arrays need a level that
/// resolves against `pressure_levels`.
pub fn select_level(fh: &dyn ForecastHour, name: &str, array: &FieldArray, level: Option<f64>) -> Result<Field2D> {
    match array {
        FieldArray::Grid2(field) => Ok(field.clone()),
        FieldArray::Grid3(stack) => {
            let Some(level) = level else {
                return Err(OverlayError::missing(format!("{} is 3-D and no level was requested", name)));
            };
            let k = level_index(fh, level)
                .ok_or_else(|| OverlayError::missing(format!("{} has no {} hPa level", name, level)))?;
            stack
                .level(k)
                .ok_or_else(|| OverlayError::missing(format!("{} level index {} out of range", name, k)))
        }
        FieldArray::Axis(_) => Err(OverlayError::missing(format!("{} is not a gridded field", name))),
    }
}

/// An attribute at a level, with no unit conversion. Used for wind barbs.
pub fn extract_raw(fh: &dyn ForecastHour, attr: &str, level: Option<f64>) -> Result<Field2D> {
    let array = fh.field(attr).ok_or_else(|| OverlayError::missing(attr))?;
    select_level(fh, attr, &array, level)
}

/// A registered field at a level, computing derived fields from components.
pub fn extract_field(fh: &dyn ForecastHour, spec: &FieldSpec, level: Option<f64>) -> Result<Field2D> {
    match spec.source {
        FieldSource::Attribute(attr) => extract_raw(fh, attr, level),
        FieldSource::Derived { recipe, components } => derive_field(fh, spec, recipe, components, level),
    }
}

fn derive_field(
    fh: &dyn ForecastHour,
    spec: &FieldSpec,
    recipe: Derivation,
    components: &[&str],
    level: Option<f64>,
) -> Result<Field2D> {
    let arrays = components
        .iter()
        .map(|name| extract_raw(fh, name, level))
        .collect::<Result<Vec<_>>>()?;

    let shape = arrays[0].shape();
    if let Some(other) = arrays.iter().find(|a| a.shape() != shape) {
        return Err(OverlayError::NativeShapeMismatch {
            expected: shape.0 * shape.1,
            actual: other.len(),
        });
    }

    let slices: Vec<&[f32]> = arrays.iter().map(Field2D::data).collect();
    let profile = match recipe {
        Derivation::Hdw(_) => hdw_profile(fh),
        _ => None,
    };
    let values = derive::apply(recipe, &slices, profile)
        .ok_or_else(|| OverlayError::missing(format!("{}: wrong component count", spec.id)))?;
    debug!(field = spec.id, ny = shape.0, nx = shape.1, "Derived field");
    Field2D::new(shape.0, shape.1, values)
}

/// The isobaric profile HDW scans, when every piece is resident.
pub fn hdw_profile(fh: &dyn ForecastHour) -> Option<HdwProfile<'_>> {
    Some(HdwProfile {
        pressure_levels: fh.lookup("pressure_levels")?.as_axis()?,
        temperature: fh.lookup("temperature")?.as_grid3()?,
        dew_point: fh.lookup("dew_point")?.as_grid3()?,
        u_wind: fh.lookup("u_wind")?.as_grid3()?,
        v_wind: fh.lookup("v_wind")?.as_grid3()?,
        surface_pressure: fh.lookup("surface_pressure")?.as_grid2()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::field;
    use overlay_common::{Field3D, MemoryForecastHour};

    fn isobaric_hour() -> MemoryForecastHour {
        let levels = vec![1000.0f32, 850.0, 500.0];
        let stack = Field3D::from_levels(
            levels.iter().map(|&p| Field2D::filled(2, 3, p / 10.0)).collect(),
        )
        .unwrap();
        MemoryForecastHour::new()
            .with("pressure_levels", levels)
            .with("geopotential_height", stack)
            .with("t2m", Field2D::filled(2, 3, 280.0))
    }

    #[test]
    fn test_level_index_tolerance() {
        let fh = isobaric_hour();
        assert_eq!(level_index(&fh, 850.0), Some(1));
        assert_eq!(level_index(&fh, 500.6), Some(2));
        assert_eq!(level_index(&fh, 700.0), None);
        assert_eq!(level_index(&MemoryForecastHour::new(), 500.0), None);
    }

    #[test]
    fn test_3d_field_needs_level() {
        let fh = isobaric_hour();
        let spec = field("geopotential_height").unwrap();
        let err = extract_field(&fh, spec, None).unwrap_err();
        assert!(err.is_no_data());

        let f = extract_field(&fh, spec, Some(500.0)).unwrap();
        assert_eq!(f.shape(), (2, 3));
        assert_eq!(f.get(0, 0), 50.0);

        assert!(extract_field(&fh, spec, Some(700.0)).unwrap_err().is_no_data());
    }

    #[test]
    fn test_2d_field_ignores_level() {
        let fh = isobaric_hour();
        let f = extract_field(&fh, field("t2m").unwrap(), Some(500.0)).unwrap();
        assert_eq!(f.get(1, 2), 280.0);
    }

    #[test]
    fn test_missing_component_is_missing() {
        let fh = isobaric_hour().with("u10m", Field2D::filled(2, 3, 3.0));
        let err = extract_field(&fh, field("wind_speed_10m").unwrap(), None).unwrap_err();
        assert!(matches!(err, OverlayError::MissingData(_)));
    }

    #[test]
    fn test_component_shape_mismatch() {
        let fh = MemoryForecastHour::new()
            .with("u10m", Field2D::filled(2, 3, 3.0))
            .with("v10m", Field2D::filled(3, 2, 4.0));
        let err = extract_field(&fh, field("wind_speed_10m").unwrap(), None).unwrap_err();
        assert!(matches!(err, OverlayError::NativeShapeMismatch { .. }));
    }

    #[test]
    fn test_derived_wind_speed() {
        let fh = MemoryForecastHour::new()
            .with("u10m", Field2D::filled(2, 2, 3.0))
            .with("v10m", Field2D::filled(2, 2, 4.0));
        let f = extract_field(&fh, field("wind_speed_10m").unwrap(), None).unwrap();
        assert!(f.data().iter().all(|&v| v == 5.0));
    }
}
