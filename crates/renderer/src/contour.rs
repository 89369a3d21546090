//! Contour line (isoline) rendering using the marching squares algorithm.
//!
//! Contours are extracted in grid coordinates (x = column, y = row with row
//! 0 at the south edge) and stroked onto an [`OverlayCanvas`], optionally
//! with inline numeric labels that knock out the line beneath them.

use crate::canvas::{solid_paint, OverlayCanvas};
use crate::color::Rgba;
use tiny_skia::{BlendMode, FillRule, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Stroke, Transform};

/// Tolerance for joining segment endpoints
const JOIN_EPSILON: f32 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    fn near(&self, other: &Point) -> bool {
        (self.x - other.x).abs() < JOIN_EPSILON && (self.y - other.y).abs() < JOIN_EPSILON
    }
}

#[derive(Debug, Clone)]
pub struct Segment {
    pub start: Point,
    pub end: Point,
}

/// A connected polyline at one level.
#[derive(Debug, Clone)]
pub struct Contour {
    pub level: f32,
    pub points: Vec<Point>,
    pub closed: bool,
}

/// Stroke and label styling for one contour layer.
#[derive(Debug, Clone)]
pub struct ContourStyle {
    pub color: Rgba,
    /// Line width in pixels
    pub line_width: f32,
    pub labels: bool,
    pub label_font_size: f32,
}

impl Default for ContourStyle {
    fn default() -> Self {
        Self {
            color: [0, 0, 0, 255],
            line_width: 1.0,
            labels: true,
            label_font_size: 8.0,
        }
    }
}

/// Label font size for a grid `ny` rows tall.
pub fn label_font_size(ny: usize) -> f32 {
    (ny as f32 / 120.0).clamp(6.0, 8.0)
}

/// Interval-aligned levels covering `[min, max]`.
///
/// Runs from `floor(min/interval)*interval` up to and including
/// `ceil(max/interval)*interval`.
pub fn contour_levels(min: f32, max: f32, interval: f32) -> Vec<f32> {
    if !(interval > 0.0) || !min.is_finite() || !max.is_finite() || max < min {
        return vec![];
    }
    let lo = (min / interval).floor() as f64 * interval as f64;
    let hi = (max / interval).ceil() as f64 * interval as f64 + interval as f64 / 2.0;
    let count = ((hi - lo) / interval as f64).ceil().max(0.0) as usize;
    (0..count)
        .map(|k| (lo + k as f64 * interval as f64) as f32)
        .collect()
}

/// Format a level like C's `%g`: six significant digits, trailing zeros trimmed.
pub fn format_level(value: f32) -> String {
    let v = value as f64;
    if v == 0.0 {
        return "0".to_string();
    }
    if !v.is_finite() {
        return format!("{}", v);
    }
    let exp = v.abs().log10().floor() as i32;
    if !(-4..6).contains(&exp) {
        let mantissa = format!("{:.5e}", v);
        let (m, e) = mantissa.split_once('e').unwrap_or((mantissa.as_str(), "0"));
        let e: i32 = e.parse().unwrap_or(0);
        let sign = if e < 0 { '-' } else { '+' };
        return format!("{}e{}{:02}", trim_zeros(m), sign, e.abs());
    }
    let decimals = (5 - exp).max(0) as usize;
    trim_zeros(&format!("{:.*}", decimals, v)).to_string()
}

fn trim_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// Segments of the `level` isoline over a row-major `width` x `height` grid.
///
/// Cells with any NaN corner produce nothing.
pub fn march_squares(data: &[f32], width: usize, height: usize, level: f32) -> Vec<Segment> {
    if width < 2 || height < 2 || data.len() != width * height {
        return vec![];
    }

    let mut segments = Vec::new();
    for y in 0..(height - 1) {
        for x in 0..(width - 1) {
            let tl = data[y * width + x];
            let tr = data[y * width + x + 1];
            let bl = data[(y + 1) * width + x];
            let br = data[(y + 1) * width + x + 1];

            if tl.is_nan() || tr.is_nan() || bl.is_nan() || br.is_nan() {
                continue;
            }

            let mut case = 0u8;
            if tl >= level {
                case |= 1;
            }
            if tr >= level {
                case |= 2;
            }
            if br >= level {
                case |= 4;
            }
            if bl >= level {
                case |= 8;
            }
            if case == 0 || case == 15 {
                continue;
            }

            let (x, y) = (x as f32, y as f32);
            let top = interpolate_edge((x, y), (x + 1.0, y), tl, tr, level);
            let right = interpolate_edge((x + 1.0, y), (x + 1.0, y + 1.0), tr, br, level);
            let bottom = interpolate_edge((x, y + 1.0), (x + 1.0, y + 1.0), bl, br, level);
            let left = interpolate_edge((x, y), (x, y + 1.0), tl, bl, level);

            let mut push = |start, end| segments.push(Segment { start, end });
            match case {
                1 | 14 => push(left, top),
                2 | 13 => push(top, right),
                3 | 12 => push(left, right),
                4 | 11 => push(right, bottom),
                6 | 9 => push(top, bottom),
                7 | 8 => push(left, bottom),
                5 => {
                    push(left, top);
                    push(right, bottom);
                }
                10 => {
                    push(top, right);
                    push(left, bottom);
                }
                _ => {}
            }
        }
    }
    segments
}

fn interpolate_edge(p1: (f32, f32), p2: (f32, f32), v1: f32, v2: f32, level: f32) -> Point {
    if (v2 - v1).abs() < 1e-6 {
        return Point::new((p1.0 + p2.0) / 2.0, (p1.1 + p2.1) / 2.0);
    }
    let t = ((level - v1) / (v2 - v1)).clamp(0.0, 1.0);
    Point::new(p1.0 + t * (p2.0 - p1.0), p1.1 + t * (p2.1 - p1.1))
}

/// Join unordered segments into polylines, growing each line at both ends.
pub fn connect_segments(segments: &[Segment], level: f32) -> Vec<Contour> {
    let mut used = vec![false; segments.len()];
    let mut contours = Vec::new();

    for start in 0..segments.len() {
        if used[start] {
            continue;
        }
        used[start] = true;
        let mut points = vec![segments[start].start, segments[start].end];

        for at_front in [false, true] {
            loop {
                let end = if at_front { points[0] } else { points[points.len() - 1] };
                let next = (0..segments.len()).find_map(|i| {
                    if used[i] {
                        None
                    } else if segments[i].start.near(&end) {
                        Some((i, segments[i].end))
                    } else if segments[i].end.near(&end) {
                        Some((i, segments[i].start))
                    } else {
                        None
                    }
                });
                match next {
                    Some((i, p)) => {
                        used[i] = true;
                        if at_front {
                            points.insert(0, p);
                        } else {
                            points.push(p);
                        }
                    }
                    None => break,
                }
            }
        }

        let closed = points.len() > 2 && points[0].near(&points[points.len() - 1]);
        contours.push(Contour {
            level,
            points,
            closed,
        });
    }
    contours
}

/// Extract all contours for `levels`.
pub fn generate_contours(
    data: &[f32],
    width: usize,
    height: usize,
    levels: &[f32],
) -> Vec<Contour> {
    levels
        .iter()
        .flat_map(|&level| connect_segments(&march_squares(data, width, height, level), level))
        .collect()
}

/// Extract and draw contours of a grid the size of `canvas`.
///
/// Returns the number of polylines drawn.
pub fn draw_contours(
    canvas: &mut OverlayCanvas,
    data: &[f32],
    levels: &[f32],
    style: &ContourStyle,
) -> usize {
    let (nx, ny) = (canvas.width(), canvas.height());
    let contours = generate_contours(data, nx, ny, levels);

    let paint = solid_paint(style.color);
    let stroke = Stroke {
        width: style.line_width.max(0.25),
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Stroke::default()
    };

    let mut labels: Vec<Label> = Vec::new();
    let mut drawn = 0;
    for contour in &contours {
        let pixels: Vec<Point> = contour
            .points
            .iter()
            .map(|p| {
                let (px, py) = canvas.to_pixel(p.x, p.y);
                Point::new(px, py)
            })
            .collect();

        let mut pb = PathBuilder::new();
        pb.move_to(pixels[0].x, pixels[0].y);
        for p in &pixels[1..] {
            pb.line_to(p.x, p.y);
        }
        if contour.closed {
            pb.close();
        }
        if let Some(path) = pb.finish() {
            canvas
                .pixmap_mut()
                .stroke_path(&path, &paint, &stroke, Transform::identity(), None);
            drawn += 1;
        }

        if style.labels {
            place_labels(&pixels, contour.level, style.label_font_size, nx, ny, &mut labels);
        }
    }

    for label in &labels {
        draw_label(canvas.pixmap_mut(), label, style);
    }

    tracing::debug!(
        levels = levels.len(),
        contours = drawn,
        labels = labels.len(),
        "Drew contour layer"
    );
    drawn
}

#[derive(Debug, Clone)]
struct Label {
    x: f32,
    y: f32,
    angle: f32,
    text: String,
}

/// One label per polyline at its arc-length midpoint, skipping short lines,
/// lines near the edge and spots crowding an earlier label.
fn place_labels(
    points: &[Point],
    level: f32,
    font_size: f32,
    width: usize,
    height: usize,
    labels: &mut Vec<Label>,
) {
    let text = format_level(level);
    let label_width = text.len() as f32 * font_size * 0.7;

    let lengths: Vec<f32> = points
        .windows(2)
        .map(|w| ((w[1].x - w[0].x).powi(2) + (w[1].y - w[0].y).powi(2)).sqrt())
        .collect();
    let total: f32 = lengths.iter().sum();
    if total < label_width * 3.0 {
        return;
    }

    let target = total / 2.0;
    let mut walked = 0.0;
    for (i, &len) in lengths.iter().enumerate() {
        if walked + len < target || len <= 0.0 {
            walked += len;
            continue;
        }
        let t = (target - walked) / len;
        let (p1, p2) = (points[i], points[i + 1]);
        let x = p1.x + t * (p2.x - p1.x);
        let y = p1.y + t * (p2.y - p1.y);

        let margin = font_size * 1.5;
        if x < margin || y < margin || x > width as f32 - margin || y > height as f32 - margin {
            return;
        }
        let min_dist = label_width.max(font_size * 4.0);
        if labels
            .iter()
            .any(|l| (l.x - x).powi(2) + (l.y - y).powi(2) < min_dist * min_dist)
        {
            return;
        }

        let mut angle = (p2.y - p1.y).atan2(p2.x - p1.x);
        // keep text upright
        if angle.abs() > std::f32::consts::FRAC_PI_2 {
            angle += std::f32::consts::PI;
        }
        labels.push(Label { x, y, angle, text });
        return;
    }
}

fn draw_label(pixmap: &mut Pixmap, label: &Label, style: &ContourStyle) {
    let size = style.label_font_size;
    let char_w = size * 0.55;
    let advance = size * 0.7;
    let text_w = label.text.chars().count() as f32 * advance;
    let (sin_a, cos_a) = label.angle.sin_cos();
    let rotate = |px: f32, py: f32| (px * cos_a - py * sin_a + label.x, px * sin_a + py * cos_a + label.y);

    // Knock out the line under the text
    let (hw, hh) = (text_w / 2.0 + size * 0.2, size / 2.0 + size * 0.2);
    let mut pb = PathBuilder::new();
    for (i, (cx, cy)) in [(-hw, -hh), (hw, -hh), (hw, hh), (-hw, hh)].into_iter().enumerate() {
        let (rx, ry) = rotate(cx, cy);
        if i == 0 {
            pb.move_to(rx, ry);
        } else {
            pb.line_to(rx, ry);
        }
    }
    pb.close();
    if let Some(path) = pb.finish() {
        let mut clear = Paint::default();
        clear.blend_mode = BlendMode::Clear;
        pixmap.fill_path(&path, &clear, FillRule::Winding, Transform::identity(), None);
    }

    let paint = solid_paint(style.color);
    let stroke = Stroke {
        width: (size * 0.12).max(0.75),
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Stroke::default()
    };

    let start = -text_w / 2.0 + advance / 2.0;
    for (i, ch) in label.text.chars().enumerate() {
        let cx = start + i as f32 * advance;
        let mut pb = PathBuilder::new();
        for ((x1, y1), (x2, y2)) in glyph_strokes(ch, char_w / 2.0, size / 2.0) {
            let (ax, ay) = rotate(cx + x1, y1);
            let (bx, by) = rotate(cx + x2, y2);
            pb.move_to(ax, ay);
            pb.line_to(bx, by);
        }
        if let Some(path) = pb.finish() {
            pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
        }
    }
}

type GlyphLine = ((f32, f32), (f32, f32));

/// Seven-segment style strokes for the characters `%g` produces.
fn glyph_strokes(ch: char, w: f32, h: f32) -> Vec<GlyphLine> {
    let top = ((-w, -h), (w, -h));
    let mid = ((-w, 0.0), (w, 0.0));
    let bot = ((-w, h), (w, h));
    let tl = ((-w, -h), (-w, 0.0));
    let tr = ((w, -h), (w, 0.0));
    let bl = ((-w, 0.0), (-w, h));
    let br = ((w, 0.0), (w, h));

    match ch {
        '0' => vec![top, tr, br, bot, bl, tl],
        '1' => vec![((0.0, -h), (0.0, h))],
        '2' => vec![top, tr, mid, bl, bot],
        '3' => vec![top, tr, mid, br, bot],
        '4' => vec![tl, mid, tr, br],
        '5' => vec![top, tl, mid, br, bot],
        '6' => vec![top, tl, bl, bot, br, mid],
        '7' => vec![top, ((w, -h), (0.0, h))],
        '8' => vec![top, tr, br, bot, bl, tl, mid],
        '9' => vec![mid, tl, top, tr, br, bot],
        '-' => vec![((-w * 0.7, 0.0), (w * 0.7, 0.0))],
        '+' => vec![((-w * 0.7, 0.0), (w * 0.7, 0.0)), ((0.0, -h * 0.6), (0.0, h * 0.6))],
        '.' => vec![((0.0, h * 0.8), (0.0, h))],
        'e' => vec![mid, tr, ((-w, -h), (w, -h)), bl, bot],
        _ => vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contour_levels_are_interval_aligned() {
        assert_eq!(contour_levels(1001.3, 1010.2, 4.0), vec![1000.0, 1004.0, 1008.0, 1012.0]);
        assert_eq!(contour_levels(0.0, 20.0, 5.0), vec![0.0, 5.0, 10.0, 15.0, 20.0]);
        assert_eq!(contour_levels(-3.0, -1.0, 2.0), vec![-4.0, -2.0, 0.0]);
    }

    #[test]
    fn test_contour_levels_degenerate() {
        assert!(contour_levels(0.0, 10.0, 0.0).is_empty());
        assert!(contour_levels(f32::NAN, 10.0, 1.0).is_empty());
        // constant field still yields its aligned level
        assert_eq!(contour_levels(8.0, 8.0, 4.0), vec![8.0]);
    }

    #[test]
    fn test_format_level_matches_printf_g() {
        assert_eq!(format_level(1012.0), "1012");
        assert_eq!(format_level(-4.0), "-4");
        assert_eq!(format_level(0.0), "0");
        assert_eq!(format_level(2.5), "2.5");
        assert_eq!(format_level(576.0), "576");
        assert_eq!(format_level(1.0e6), "1e+06");
    }

    #[test]
    fn test_label_font_size_bounds() {
        assert_eq!(label_font_size(100), 6.0);
        assert_eq!(label_font_size(840), 7.0);
        assert_eq!(label_font_size(1068), 8.0);
    }

    #[test]
    fn test_interpolate_edge_midpoint() {
        let p = interpolate_edge((0.0, 0.0), (1.0, 0.0), 0.0, 10.0, 5.0);
        assert!((p.x - 0.5).abs() < 1e-6);
        assert_eq!(p.y, 0.0);
    }

    #[test]
    fn test_nan_cells_skipped() {
        let data = vec![0.0, 10.0, f32::NAN, 0.0, 10.0, 10.0];
        // the right cell touches the NaN corner
        let segs = march_squares(&data, 3, 2, 5.0);
        assert_eq!(segs.len(), 1);
    }

    #[test]
    fn test_peak_forms_closed_ring() {
        let data = vec![
            0.0, 0.0, 0.0, //
            0.0, 10.0, 0.0, //
            0.0, 0.0, 0.0,
        ];
        let segs = march_squares(&data, 3, 3, 5.0);
        assert_eq!(segs.len(), 4);
        let contours = connect_segments(&segs, 5.0);
        assert_eq!(contours.len(), 1);
        assert!(contours[0].closed);
    }

    #[test]
    fn test_vertices_stay_on_cell_edges() {
        let (w, h) = (6, 5);
        let data: Vec<f32> = (0..w * h)
            .map(|i| {
                let (x, y) = ((i % w) as f32 - 2.5, (i / w) as f32 - 2.0);
                x * x + y * y
            })
            .collect();
        let contours = generate_contours(&data, w, h, &[2.0]);
        assert!(!contours.is_empty());
        for p in contours.iter().flat_map(|c| &c.points) {
            assert!(p.x.fract() == 0.0 || p.y.fract() == 0.0, "vertex {:?} off the grid lines", p);
        }
    }
}
