//! Meteorological wind barbs drawn as vector paths.
//!
//! Speeds are in knots and rounded to the nearest 5 kt. A barb's staff points
//! into the wind, with 50 kt flags, 10 kt full barbs and 5 kt half barbs
//! stacked inward from the tip on the right-hand side of the staff. Speeds
//! that round to zero draw a calm circle.

use crate::canvas::{solid_paint, OverlayCanvas};
use crate::color::Rgba;
use tiny_skia::{FillRule, LineCap, LineJoin, PathBuilder, Stroke, Transform};

pub const HALF_BARB_KT: f32 = 5.0;
pub const FULL_BARB_KT: f32 = 10.0;
pub const FLAG_KT: f32 = 50.0;

/// Pixels of staff per unit of barb length.
const PIXELS_PER_LENGTH: f32 = 4.0;

#[derive(Debug, Clone)]
pub struct BarbStyle {
    pub color: Rgba,
    /// Barb size; the staff is `length * 4` pixels
    pub length: f32,
    /// Stroke width in pixels
    pub line_width: f32,
}

impl Default for BarbStyle {
    fn default() -> Self {
        Self {
            color: [0, 0, 0, 255],
            length: 5.5,
            line_width: 1.0,
        }
    }
}

/// A barb anchored at a grid (column, row) position, components in knots.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Barb {
    pub col: f32,
    pub row: f32,
    pub u: f32,
    pub v: f32,
}

/// Decomposition of a wind speed into barb features.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarbCounts {
    pub flags: u32,
    pub full: u32,
    pub half: bool,
}

impl BarbCounts {
    pub fn is_calm(&self) -> bool {
        self.flags == 0 && self.full == 0 && !self.half
    }
}

/// Round to the nearest half-barb increment and split into features.
pub fn barb_counts(speed_kt: f32) -> BarbCounts {
    let rounded = HALF_BARB_KT * (speed_kt.max(0.0) / HALF_BARB_KT + 0.5).floor();
    let flags = (rounded / FLAG_KT).floor();
    let rest = rounded - flags * FLAG_KT;
    let full = (rest / FULL_BARB_KT).floor();
    let rest = rest - full * FULL_BARB_KT;
    BarbCounts {
        flags: flags as u32,
        full: full as u32,
        half: rest >= HALF_BARB_KT,
    }
}

/// Meteorological speed and direction the wind blows from (degrees, 0 = north).
pub fn speed_direction(u: f32, v: f32) -> (f32, f32) {
    let speed = (u * u + v * v).sqrt();
    let mut dir = (-u).atan2(-v).to_degrees();
    if dir < 0.0 {
        dir += 360.0;
    }
    (speed, dir)
}

/// Subsample a row-major grid with a `[::stride, ::stride]` step.
///
/// Returns the thinned values with their `(ny, nx)` shape.
pub fn thin(data: &[f32], ny: usize, nx: usize, stride: usize) -> (Vec<f32>, usize, usize) {
    let stride = stride.max(1);
    if data.len() != ny * nx || ny == 0 || nx == 0 {
        return (Vec::new(), 0, 0);
    }
    let tny = ny.div_ceil(stride);
    let tnx = nx.div_ceil(stride);
    let mut out = Vec::with_capacity(tny * tnx);
    for row in (0..ny).step_by(stride) {
        for col in (0..nx).step_by(stride) {
            out.push(data[row * nx + col]);
        }
    }
    (out, tny, tnx)
}

/// Draw barbs onto the canvas, skipping non-finite winds.
///
/// Returns the number of barbs drawn.
pub fn draw_barbs(canvas: &mut OverlayCanvas, barbs: &[Barb], style: &BarbStyle) -> usize {
    let paint = solid_paint(style.color);
    let stroke = Stroke {
        width: style.line_width.max(0.25),
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Stroke::default()
    };
    let staff = style.length * PIXELS_PER_LENGTH;

    let mut lines = PathBuilder::new();
    let mut flags = PathBuilder::new();
    let mut drawn = 0;

    for barb in barbs {
        if !barb.u.is_finite() || !barb.v.is_finite() {
            continue;
        }
        let (x, y) = canvas.to_pixel(barb.col, barb.row);
        let (speed, _) = speed_direction(barb.u, barb.v);
        let counts = barb_counts(speed);

        if counts.is_calm() {
            lines.push_circle(x, y, staff * 0.15);
            drawn += 1;
            continue;
        }

        // Into the wind, in screen space (rows grow downward)
        let (dx, dy) = (-barb.u / speed, barb.v / speed);
        // Right of the staff direction
        let (px, py) = (-dy, dx);
        let tip = (x + dx * staff, y + dy * staff);
        lines.move_to(x, y);
        lines.line_to(tip.0, tip.1);

        let spacing = staff * 0.125;
        let height = staff * 0.4;
        let flag_width = staff * 0.25;
        let mut along = 0.0;
        let at = |d: f32| (tip.0 - dx * d, tip.1 - dy * d);

        for _ in 0..counts.flags {
            let (ax, ay) = at(along);
            let (bx, by) = at(along + flag_width);
            let (cx, cy) = at(along + flag_width / 2.0);
            flags.move_to(ax, ay);
            flags.line_to(cx + px * height, cy + py * height);
            flags.line_to(bx, by);
            flags.close();
            along += flag_width + spacing * 0.5;
        }
        for _ in 0..counts.full {
            let (ax, ay) = at(along);
            lines.move_to(ax, ay);
            lines.line_to(ax + px * height + dx * height * 0.25, ay + py * height + dy * height * 0.25);
            along += spacing;
        }
        if counts.half {
            // A lone half barb sits one step in from the tip
            if along == 0.0 {
                along = spacing;
            }
            let (ax, ay) = at(along);
            let half = height / 2.0;
            lines.move_to(ax, ay);
            lines.line_to(ax + px * half + dx * half * 0.25, ay + py * half + dy * half * 0.25);
        }
        drawn += 1;
    }

    let pixmap = canvas.pixmap_mut();
    if let Some(path) = lines.finish() {
        pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    }
    if let Some(path) = flags.finish() {
        pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
        pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    }

    tracing::debug!(requested = barbs.len(), drawn, "Drew wind barbs");
    drawn
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_barb_counts() {
        assert!(barb_counts(2.4).is_calm());
        assert_eq!(barb_counts(2.5), BarbCounts { flags: 0, full: 0, half: true });
        assert_eq!(barb_counts(15.0), BarbCounts { flags: 0, full: 1, half: true });
        assert_eq!(barb_counts(64.0), BarbCounts { flags: 1, full: 1, half: true });
        assert_eq!(barb_counts(103.0), BarbCounts { flags: 2, full: 0, half: true });
        assert_eq!(barb_counts(-3.0), barb_counts(0.0));
    }

    #[test]
    fn test_speed_direction() {
        let (s, d) = speed_direction(0.0, -10.0);
        assert!((s - 10.0).abs() < 1e-6);
        assert!(d.abs() < 1e-4, "north wind blows from 0°, got {}", d);
        let (_, d) = speed_direction(10.0, 0.0);
        assert!((d - 270.0).abs() < 1e-4, "westerly blows from 270°, got {}", d);
    }

    #[test]
    fn test_thin_takes_every_nth() {
        let data: Vec<f32> = (0..20).map(|v| v as f32).collect();
        let (t, ny, nx) = thin(&data, 4, 5, 2);
        assert_eq!((ny, nx), (2, 3));
        assert_eq!(t, vec![0.0, 2.0, 4.0, 10.0, 12.0, 14.0]);
    }

    #[test]
    fn test_draws_skip_missing() {
        let mut canvas = OverlayCanvas::new(64, 64).unwrap();
        let barbs = [
            Barb { col: 32.0, row: 32.0, u: 20.0, v: 5.0 },
            Barb { col: 10.0, row: 10.0, u: f32::NAN, v: 1.0 },
        ];
        assert_eq!(draw_barbs(&mut canvas, &barbs, &BarbStyle::default()), 1);
        assert!(!canvas.is_blank());
    }

    #[test]
    fn test_staff_points_into_wind() {
        // Southerly wind: staff extends south of the station, i.e. down the image
        let mut canvas = OverlayCanvas::new(64, 64).unwrap();
        let barb = Barb { col: 31.5, row: 31.5, u: 0.0, v: 20.0 };
        draw_barbs(&mut canvas, &[barb], &BarbStyle::default());
        let alpha = |x: u32, y: u32| canvas.pixmap().pixel(x, y).map(|p| p.alpha()).unwrap_or(0);
        assert!(alpha(32, 45) > 0);
        assert_eq!(alpha(32, 18), 0);
    }
}
