//! Nearest-neighbor index built against a coarse Lambert conformal grid.

use overlay_common::OutputGrid;
use projection::{
    build_index_map, degrees_to_chord, great_circle_degrees, LambertConformal, LambertGrid,
};

/// HRRR geometry at 30 km so the tests stay fast.
fn coarse_hrrr() -> (LambertConformal, Vec<f32>, Vec<f32>) {
    let proj = LambertConformal::new(LambertGrid::hrrr().decimate(10));
    let (lats, lons) = proj.coordinates();
    (proj, lats, lons)
}

fn coarse_conus() -> OutputGrid {
    OutputGrid::new(21.0, 53.0, -135.0, -60.0, 0.25, 0.25).unwrap()
}

#[test]
fn test_domain_threshold_holds_for_every_cell() {
    let (_, lats, lons) = coarse_hrrr();
    let grid = coarse_conus();
    let threshold_deg = 0.5;
    let map = build_index_map(&lats, &lons, &grid, degrees_to_chord(threshold_deg)).unwrap();

    let out_lats = grid.lats();
    let out_lons = grid.lons();
    let nx = out_lons.len();
    for (cell, (&idx, &masked)) in map.indices().iter().zip(map.out_of_domain()).enumerate() {
        let target = (out_lats[cell / nx], out_lons[cell % nx]);
        let native = (lats[idx as usize] as f64, lons[idx as usize] as f64);
        let dist = great_circle_degrees(target, native);
        if masked {
            assert!(dist > threshold_deg - 1e-6, "masked cell {} only {}° away", cell, dist);
        } else {
            assert!(dist <= threshold_deg + 1e-6, "kept cell {} is {}° away", cell, dist);
        }
    }
}

#[test]
fn test_cells_inside_native_domain_are_kept() {
    let (proj, lats, lons) = coarse_hrrr();
    let grid = coarse_conus();
    let map = build_index_map(&lats, &lons, &grid, degrees_to_chord(0.5)).unwrap();
    let (ny, nx) = proj.shape();

    let out_lats = grid.lats();
    let out_lons = grid.lons();
    let mut inside = 0;
    for (r, &lat) in out_lats.iter().enumerate() {
        for (c, &lon) in out_lons.iter().enumerate() {
            let (i, j) = proj.geo_to_grid(lat, lon);
            if i >= 0.0 && i <= (nx - 1) as f64 && j >= 0.0 && j <= (ny - 1) as f64 {
                inside += 1;
                assert!(!map.out_of_domain()[r * out_lons.len() + c], "({}, {}) wrongly masked", lat, lon);
            }
        }
    }
    assert!(inside > 0);
    // CONUS grid corners lie outside HRRR
    assert!(map.out_of_domain()[0]);
    assert!(map.masked_count() > 0);
}

#[test]
fn test_selected_point_is_the_nearest() {
    let (_, lats, lons) = coarse_hrrr();
    let grid = coarse_conus();
    let map = build_index_map(&lats, &lons, &grid, degrees_to_chord(0.5)).unwrap();

    let out_lats = grid.lats();
    let out_lons = grid.lons();
    let nx = out_lons.len();
    for cell in (0..map.len()).step_by(997) {
        let target = (out_lats[cell / nx], out_lons[cell % nx]);
        let chosen = map.indices()[cell] as usize;
        let chosen_dist = great_circle_degrees(target, (lats[chosen] as f64, lons[chosen] as f64));
        let best = lats
            .iter()
            .zip(&lons)
            .map(|(&la, &lo)| great_circle_degrees(target, (la as f64, lo as f64)))
            .fold(f64::INFINITY, f64::min);
        assert!((chosen_dist - best).abs() < 1e-9, "cell {}: {} vs {}", cell, chosen_dist, best);
    }
}

#[test]
fn test_rebuild_is_deterministic() {
    let (_, lats, lons) = coarse_hrrr();
    let grid = OutputGrid::new(30.0, 40.0, -100.0, -90.0, 0.5, 0.5).unwrap();
    let a = build_index_map(&lats, &lons, &grid, 0.01).unwrap();
    let b = build_index_map(&lats, &lons, &grid, 0.01).unwrap();
    assert_eq!(a, b);
}
