//! Composite map products: ramp fill, contour lines and wind barbs.
//!
//! The image is the fill field's own shape, one pixel per cell. Contour and
//! barb layers each draw onto their own canvas, which is blended over the
//! fill. A layer that cannot be built is logged and left out.

use super::{encode, fill_pixels, observed_range, to_display_units, POINTS_TO_PIXELS};
use crate::extract::{extract_field, extract_raw};
use crate::fields::{field as lookup_field, FieldSpec};
use crate::metrics::OverlayMetrics;
use crate::products::{BarbSpec, CompositeSpec, ContourSpec};
use crate::reproject::Reprojector;
use crate::result::{ContentKind, OverlayResult};
use crate::units::MS_TO_KT;
use overlay_common::{Field2D, ForecastHour, GeoBounds, OverlayError, Result};
use renderer::barbs::thin;
use renderer::contour::label_font_size;
use renderer::{contour_levels, draw_barbs, draw_contours, parse_color, Barb, BarbStyle, ContourStyle, OverlayCanvas, Rgba};
use tracing::{debug, warn};

const BLACK: Rgba = [0, 0, 0, 255];
/// Barb stroke width in points.
const BARB_LINE_WIDTH_PT: f32 = 0.5;

/// Everything a composite render reads.
pub struct CompositeContext<'a> {
    pub fh: &'a dyn ForecastHour,
    pub reprojector: Reprojector<'a>,
    pub bbox: Option<&'a GeoBounds>,
    pub metrics: &'a OverlayMetrics,
}

impl CompositeContext<'_> {
    /// Extract, reproject and convert one registered field.
    fn display_field(&self, spec: &FieldSpec, level: Option<f64>) -> Result<(Field2D, GeoBounds)> {
        let native = extract_field(self.fh, spec, level)?;
        let reprojected = self.reprojector.reproject(&native, self.bbox)?;
        Ok((to_display_units(reprojected.field, spec), reprojected.bounds))
    }

    fn raw_field(&self, attr: &str, level: Option<f64>) -> Result<Field2D> {
        let native = extract_raw(self.fh, attr, level)?;
        Ok(self.reprojector.reproject(&native, self.bbox)?.field)
    }
}

fn color_or_black(spec: &str) -> Rgba {
    parse_color(spec).unwrap_or_else(|| {
        warn!(color = spec, "Unrecognized color, using black");
        BLACK
    })
}

fn check_shape(layer: &str, actual: (usize, usize), expected: (usize, usize)) -> Result<()> {
    if actual != expected {
        return Err(OverlayError::LayerShapeMismatch {
            layer: layer.to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}

/// Blend one built layer over the fill pixels.
///
/// A layer that failed to build, or whose canvas is not the fill's shape, is
/// logged and counted as skipped. Returns whether the layer was drawn.
fn blend_layer(
    metrics: &OverlayMetrics,
    pixels: &mut [u8],
    shape: (usize, usize),
    kind: &'static str,
    name: &str,
    layer: Result<OverlayCanvas>,
) -> Result<bool> {
    let checked = layer.and_then(|canvas| {
        check_shape(name, (canvas.height(), canvas.width()), shape)?;
        Ok(canvas)
    });
    match checked {
        Ok(canvas) => {
            canvas
                .composite_onto(pixels)
                .map_err(|e| OverlayError::Encode(e.to_string()))?;
            Ok(true)
        }
        Err(e) => {
            debug!(layer = name, kind, error = %e, "Skipping composite layer");
            metrics.record_layer_skipped(kind);
            Ok(false)
        }
    }
}

pub fn render(ctx: &CompositeContext<'_>, product: &CompositeSpec, opacity: f32) -> Result<OverlayResult> {
    let fill_spec =
        lookup_field(product.fill_field).ok_or_else(|| OverlayError::UnknownField(product.fill_field.to_string()))?;
    let (fill, bounds) = ctx.display_field(fill_spec, product.level)?;
    let (ny, nx) = fill.shape();
    if fill.is_empty() {
        return Err(OverlayError::EmptyReprojection);
    }

    let ramp = product.fill_ramp.unwrap_or(fill_spec.default_ramp);
    let range = product.fill_range.unwrap_or(fill_spec.default_range);
    let mut pixels = fill_pixels(&fill, ramp, range, opacity, fill_spec.transparent_below);

    let mut drawn_layers = 0;
    for cspec in &product.contours {
        let layer = contour_layer(ctx, cspec, product.level);
        if blend_layer(ctx.metrics, &mut pixels, (ny, nx), "contour", cspec.field, layer)? {
            drawn_layers += 1;
        }
    }

    if let Some(bspec) = &product.barbs {
        let layer = barb_layer(ctx, bspec, product.level);
        if blend_layer(ctx.metrics, &mut pixels, (ny, nx), "barbs", bspec.u_attr, layer)? {
            drawn_layers += 1;
        }
    }

    let data = encode(&pixels, nx, ny)?;
    let (vmin, vmax) = observed_range(fill.data(), range);
    debug!(product = product.id, nx, ny, layers = drawn_layers, "Rendered composite");

    Ok(OverlayResult {
        data,
        content_kind: ContentKind::Png,
        nx,
        ny,
        bounds,
        vmin,
        vmax,
        units: fill_spec.units.to_string(),
        nan_value: None,
    })
}

fn contour_layer(
    ctx: &CompositeContext<'_>,
    cspec: &ContourSpec,
    product_level: Option<f64>,
) -> Result<OverlayCanvas> {
    let spec = lookup_field(cspec.field).ok_or_else(|| OverlayError::UnknownField(cspec.field.to_string()))?;
    let level = if spec.needs_level { product_level } else { None };
    let (field, _) = ctx.display_field(spec, level)?;
    let shape = field.shape();

    let levels = match &cspec.levels {
        Some(explicit) if !explicit.is_empty() => explicit.clone(),
        _ => {
            let (lo, hi) = field
                .finite_range()
                .ok_or_else(|| OverlayError::missing(format!("{} has no finite values", cspec.field)))?;
            let levels = contour_levels(lo, hi, cspec.interval);
            if levels.len() < 2 {
                return Err(OverlayError::missing(format!("{} is too flat to contour", cspec.field)));
            }
            levels
        }
    };

    let style = ContourStyle {
        color: color_or_black(cspec.color),
        line_width: cspec.linewidth * POINTS_TO_PIXELS,
        labels: cspec.label,
        label_font_size: label_font_size(shape.0),
        ..ContourStyle::default()
    };
    let mut canvas = OverlayCanvas::new(shape.1, shape.0).map_err(|e| OverlayError::Encode(e.to_string()))?;
    let lines = draw_contours(&mut canvas, field.data(), &levels, &style);
    debug!(field = cspec.field, levels = levels.len(), lines, "Drew contour layer");
    Ok(canvas)
}

fn barb_layer(
    ctx: &CompositeContext<'_>,
    bspec: &BarbSpec,
    product_level: Option<f64>,
) -> Result<OverlayCanvas> {
    let level = bspec.level.or(product_level);
    let u = ctx.raw_field(bspec.u_attr, level)?;
    let v = ctx.raw_field(bspec.v_attr, level)?;
    check_shape(bspec.v_attr, v.shape(), u.shape())?;

    let (ny, nx) = u.shape();
    let stride = bspec.thin.max(1);
    let (u_thin, tny, tnx) = thin(u.data(), ny, nx, stride);
    let (v_thin, _, _) = thin(v.data(), ny, nx, stride);
    let rows = tny.min(ny.div_ceil(stride));
    let cols = tnx.min(nx.div_ceil(stride));

    let mut barbs = Vec::with_capacity(rows * cols);
    for i in 0..rows {
        for j in 0..cols {
            let k = i * tnx + j;
            barbs.push(Barb {
                col: (j * stride) as f32,
                row: (i * stride) as f32,
                u: u_thin[k] * MS_TO_KT,
                v: v_thin[k] * MS_TO_KT,
            });
        }
    }

    let style = BarbStyle {
        color: color_or_black(bspec.color),
        length: bspec.length,
        line_width: BARB_LINE_WIDTH_PT * POINTS_TO_PIXELS,
    };
    let mut canvas = OverlayCanvas::new(nx, ny).map_err(|e| OverlayError::Encode(e.to_string()))?;
    let drawn = draw_barbs(&mut canvas, &barbs, &style);
    debug!(drawn, stride, "Drew barb layer");
    Ok(canvas)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opaque(ny: usize, nx: usize) -> Vec<u8> {
        [255u8, 255, 255, 255].repeat(ny * nx)
    }

    #[test]
    fn test_mismatched_layer_is_skipped() {
        let metrics = OverlayMetrics::new();
        let mut pixels = opaque(4, 6);
        let before = pixels.clone();
        let canvas = OverlayCanvas::new(6, 5).unwrap();

        let drawn = blend_layer(&metrics, &mut pixels, (4, 6), "contour", "mslp", Ok(canvas)).unwrap();
        assert!(!drawn);
        assert_eq!(pixels, before);
        assert_eq!(metrics.snapshot().layers_skipped, 1);
    }

    #[test]
    fn test_failed_layer_is_skipped() {
        let metrics = OverlayMetrics::new();
        let mut pixels = opaque(4, 6);
        let failed = Err(OverlayError::missing("no u10"));

        assert!(!blend_layer(&metrics, &mut pixels, (4, 6), "barbs", "u10", failed).unwrap());
        assert_eq!(metrics.snapshot().layers_skipped, 1);
    }

    #[test]
    fn test_matching_layer_is_drawn() {
        let metrics = OverlayMetrics::new();
        let mut pixels = opaque(4, 6);
        let canvas = OverlayCanvas::new(6, 4).unwrap();

        assert!(blend_layer(&metrics, &mut pixels, (4, 6), "contour", "mslp", Ok(canvas)).unwrap());
        assert_eq!(metrics.snapshot().layers_skipped, 0);
    }

    #[test]
    fn test_shape_mismatch_names_layer() {
        let err = check_shape("v10", (3, 3), (3, 4)).unwrap_err();
        match err {
            OverlayError::LayerShapeMismatch { layer, expected, actual } => {
                assert_eq!(layer, "v10");
                assert_eq!(expected, (3, 4));
                assert_eq!(actual, (3, 3));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }
}
