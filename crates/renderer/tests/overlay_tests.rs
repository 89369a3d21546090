//! Contour and barb layers drawn on a canvas and blended onto a fill.

use renderer::barbs::{draw_barbs, thin, Barb, BarbStyle};
use renderer::canvas::OverlayCanvas;
use renderer::colormap::{ramp, RAMP_SIZE};
use renderer::contour::{contour_levels, draw_contours, ContourStyle};
use std::sync::Arc;
use std::thread;

/// Radial bowl centered in the grid, rows south to north.
fn bowl(nx: usize, ny: usize) -> Vec<f32> {
    let (cx, cy) = (nx as f32 / 2.0, ny as f32 / 2.0);
    (0..nx * ny)
        .map(|i| {
            let (row, col) = ((i / nx) as f32, (i % nx) as f32);
            ((col - cx).powi(2) + (row - cy).powi(2)).sqrt()
        })
        .collect()
}

fn opaque_base(nx: usize, ny: usize, rgba: [u8; 4]) -> Vec<u8> {
    rgba.iter().copied().cycle().take(nx * ny * 4).collect()
}

// ============================================================================
// Contours
// ============================================================================

#[test]
fn test_contours_draw_rings() {
    let (nx, ny) = (120, 90);
    let data = bowl(nx, ny);
    let levels = contour_levels(0.0, 40.0, 10.0);
    let mut canvas = OverlayCanvas::new(nx, ny).unwrap();
    let style = ContourStyle {
        labels: false,
        ..ContourStyle::default()
    };
    let drawn = draw_contours(&mut canvas, &data, &levels, &style);
    // rings at 10, 20, 30, 40 (0 only touches the center point)
    assert!(drawn >= 4, "drew {}", drawn);

    let mut base = opaque_base(nx, ny, [255, 255, 255, 255]);
    canvas.composite_onto(&mut base).unwrap();
    // the 20-ring crosses the middle row at col 40 (image row 45 or 44)
    let row = ny - 1 - 45;
    let dark = (36..44).any(|col| base[(row * nx + col) * 4] < 128);
    assert!(dark, "expected a contour pixel near the 20-ring");
    // the far corner stays untouched
    assert_eq!(&base[..4], &[255, 255, 255, 255]);
}

#[test]
fn test_all_nan_field_draws_nothing() {
    let data = vec![f32::NAN; 50 * 40];
    let mut canvas = OverlayCanvas::new(50, 40).unwrap();
    assert_eq!(draw_contours(&mut canvas, &data, &[1.0, 2.0], &ContourStyle::default()), 0);
    assert!(canvas.is_blank());
}

#[test]
fn test_labels_knock_out_line() {
    let (nx, ny) = (400, 300);
    let data = bowl(nx, ny);
    let style = ContourStyle {
        labels: false,
        ..ContourStyle::default()
    };
    let mut plain = OverlayCanvas::new(nx, ny).unwrap();
    draw_contours(&mut plain, &data, &[100.0], &style);

    let labeled_style = ContourStyle {
        labels: true,
        ..style
    };
    let mut labeled = OverlayCanvas::new(nx, ny).unwrap();
    draw_contours(&mut labeled, &data, &[100.0], &labeled_style);

    assert_ne!(plain.pixmap().data(), labeled.pixmap().data());
}

// ============================================================================
// Barbs
// ============================================================================

#[test]
fn test_thinned_barbs_cover_grid() {
    let (nx, ny) = (100, 80);
    let u = vec![15.0f32; nx * ny];
    let v = vec![-5.0f32; nx * ny];
    let stride = 25;
    let (tu, tny, tnx) = thin(&u, ny, nx, stride);
    let (tv, _, _) = thin(&v, ny, nx, stride);
    assert_eq!((tny, tnx), (4, 4));

    let barbs: Vec<Barb> = (0..tny * tnx)
        .map(|i| Barb {
            col: ((i % tnx) * stride) as f32,
            row: ((i / tnx) * stride) as f32,
            u: tu[i],
            v: tv[i],
        })
        .collect();

    let mut canvas = OverlayCanvas::new(nx, ny).unwrap();
    let style = BarbStyle {
        color: [51, 51, 51, 255],
        ..BarbStyle::default()
    };
    assert_eq!(draw_barbs(&mut canvas, &barbs, &style), 16);
    assert!(!canvas.is_blank());
}

#[test]
fn test_calm_barb_draws_circle() {
    let mut canvas = OverlayCanvas::new(40, 40).unwrap();
    let barb = Barb {
        col: 19.5,
        row: 19.5,
        u: 0.5,
        v: 0.5,
    };
    assert_eq!(draw_barbs(&mut canvas, &[barb], &BarbStyle::default()), 1);
    // ring, not a staff: the station center stays clear
    let center = canvas.pixmap().pixel(20, 20).map(|p| p.alpha()).unwrap_or(255);
    assert_eq!(center, 0);
    assert!(!canvas.is_blank());
}

// ============================================================================
// Ramp cache
// ============================================================================

#[test]
fn test_ramp_cache_concurrent_first_access() {
    let handles: Vec<_> = (0..8)
        .map(|_| thread::spawn(|| ramp("YlOrRd")))
        .collect();
    let ramps: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for r in &ramps[1..] {
        assert_eq!(r[..], ramps[0][..]);
    }
    let cached = ramp("YlOrRd");
    assert!(ramps.iter().filter(|r| Arc::ptr_eq(r, &cached)).count() >= 1);
    assert_eq!(cached.len(), RAMP_SIZE);
}
