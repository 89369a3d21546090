//! Tests for the output grid, bounds and forecast-hour containers.

use overlay_common::field::finite_range;
use overlay_common::{
    Field2D, Field3D, FieldArray, ForecastHour, GeoBounds, MemoryForecastHour, OutputGrid,
};

// ============================================================================
// OutputGrid
// ============================================================================

#[test]
fn test_conus_grid_shape() {
    let grid = OutputGrid::new(21.0, 53.0, -135.0, -60.0, 0.03, 0.03).unwrap();
    assert_eq!(grid.shape(), (1068, 2501));
    assert_eq!(grid.len(), 1068 * 2501);
}

#[test]
fn test_coordinate_arrays_match_shape() {
    let grid = OutputGrid::conus();
    let lats = grid.lats();
    let lons = grid.lons();
    assert_eq!(lats.len(), grid.ny());
    assert_eq!(lons.len(), grid.nx());
    assert!(lats.windows(2).all(|w| w[1] > w[0]));
    assert!(lons.windows(2).all(|w| w[1] > w[0]));
    assert_eq!(lats[0], 21.0);
    assert_eq!(lons[0], -135.0);
    // inclusive end: last point within half a step of the bound
    assert!((lats[lats.len() - 1] - 53.0).abs() < 0.015 + 1e-9);
    assert!((lons[lons.len() - 1] - -60.0).abs() < 0.015 + 1e-9);
}

#[test]
fn test_coarse_grid_inclusive_end() {
    let grid = OutputGrid::new(0.0, 10.0, 0.0, 10.0, 2.5, 5.0).unwrap();
    assert_eq!(grid.lats(), vec![0.0, 2.5, 5.0, 7.5, 10.0]);
    assert_eq!(grid.lons(), vec![0.0, 5.0, 10.0]);
}

#[test]
fn test_grid_serde_roundtrip() {
    let grid = OutputGrid::conus();
    let json = serde_json::to_string(&grid).unwrap();
    let back: OutputGrid = serde_json::from_str(&json).unwrap();
    assert_eq!(grid, back);
}

#[test]
fn test_grid_rejects_inverted_bounds() {
    let err = OutputGrid::new(53.0, 21.0, -135.0, -60.0, 0.03, 0.03).unwrap_err();
    assert!(err.to_string().contains("south"));
}

// ============================================================================
// GeoBounds
// ============================================================================

#[test]
fn test_bounds_width_height() {
    let b = GeoBounds::new(30.0, 40.0, -100.0, -80.0);
    assert_eq!(b.width(), 20.0);
    assert_eq!(b.height(), 10.0);
}

#[test]
fn test_bounds_intersection() {
    let conus = OutputGrid::conus().bounds();
    assert!(conus.intersects(&GeoBounds::new(30.0, 35.0, -100.0, -95.0)));
    assert!(!conus.intersects(&GeoBounds::new(-10.0, 0.0, 10.0, 20.0)));
    // touching edges still intersect
    assert!(conus.intersects(&GeoBounds::new(53.0, 60.0, -60.0, -50.0)));
}

// ============================================================================
// Forecast-hour containers
// ============================================================================

#[test]
fn test_memory_forecast_hour_lookup() {
    let fh = MemoryForecastHour::new()
        .with("pressure_levels", vec![1000.0, 850.0, 500.0])
        .with("t2m", Field2D::filled(2, 2, 290.0));

    let levels = fh.field("pressure_levels").unwrap();
    assert_eq!(levels.as_axis(), Some(&[1000.0, 850.0, 500.0][..]));
    assert_eq!(fh.field("t2m").unwrap().ndim(), 2);
    assert!(fh.field("temperature").is_none());
}

#[test]
fn test_field3d_shape_checked() {
    assert!(Field3D::new(2, 2, 2, vec![0.0; 8]).is_ok());
    assert!(Field3D::new(2, 2, 2, vec![0.0; 7]).is_err());

    let mismatched = Field3D::from_levels(vec![Field2D::filled(2, 2, 0.0), Field2D::filled(3, 2, 0.0)]);
    assert!(mismatched.is_err());
}

#[test]
fn test_field_array_values() {
    let stack = Field3D::new(2, 1, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
    let arr = FieldArray::from(stack);
    assert_eq!(arr.ndim(), 3);
    assert_eq!(arr.values(), &[1.0, 2.0, 3.0, 4.0]);
    assert_eq!(arr.as_grid3().unwrap().level_data(1), Some(&[3.0, 4.0][..]));
    assert!(arr.as_grid2().is_none());
}

#[test]
fn test_finite_range_all_nan() {
    let f = Field2D::filled(3, 3, f32::NAN);
    assert_eq!(f.finite_range(), None);
    assert_eq!(finite_range(&[]), None);
}
