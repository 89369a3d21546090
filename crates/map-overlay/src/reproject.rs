//! Native model field → output grid, with optional bbox crop.
//!
//! Curvilinear grids gather through the nearest-neighbor index map. Regular
//! grids are sliced by coordinate and, when coarser than the output grid,
//! upsampled with a bilinear zoom that keeps missing cells missing.

use overlay_common::{Field2D, GeoBounds, OutputGrid, OverlayError, Result};
use projection::{IndexMap, ProjectionMap, RegularAxes};
use rayon::prelude::*;
use tracing::debug;

/// A field on the output grid (or a crop of it), rows south to north.
#[derive(Debug, Clone, PartialEq)]
pub struct Reprojected {
    pub field: Field2D,
    pub bounds: GeoBounds,
}

/// Stateless view pairing a built projection with its output grid.
#[derive(Debug, Clone, Copy)]
pub struct Reprojector<'a> {
    grid: &'a OutputGrid,
    map: &'a ProjectionMap,
}

impl<'a> Reprojector<'a> {
    pub fn new(grid: &'a OutputGrid, map: &'a ProjectionMap) -> Self {
        Self { grid, map }
    }

    pub fn reproject(&self, field: &Field2D, bbox: Option<&GeoBounds>) -> Result<Reprojected> {
        match self.map {
            ProjectionMap::Curvilinear(index) => self.reproject_curvilinear(index, field, bbox),
            ProjectionMap::Regular(axes) => self.reproject_regular(axes, field, bbox),
        }
    }

    fn reproject_curvilinear(&self, index: &IndexMap, field: &Field2D, bbox: Option<&GeoBounds>) -> Result<Reprojected> {
        let (ny, nx) = index.shape();
        let gathered = Field2D::new(ny, nx, index.apply(field.data())?)?;
        match bbox {
            None => Ok(Reprojected {
                field: gathered,
                bounds: self.grid.bounds(),
            }),
            Some(bbox) => crop_to_bbox(self.grid, &gathered, bbox),
        }
    }

    fn reproject_regular(&self, axes: &RegularAxes, field: &Field2D, bbox: Option<&GeoBounds>) -> Result<Reprojected> {
        if field.shape() != (axes.lats.len(), axes.lons.len()) {
            return Err(OverlayError::NativeShapeMismatch {
                expected: axes.lats.len() * axes.lons.len(),
                actual: field.len(),
            });
        }

        let b = bbox.copied().unwrap_or_else(|| self.grid.bounds());
        let rows = inclusive_span(&axes.lats, b.south, b.north).ok_or(OverlayError::EmptyReprojection)?;
        let cols = inclusive_span(&axes.lons, b.west, b.east).ok_or(OverlayError::EmptyReprojection)?;

        let mut out = field.slice(rows.clone(), cols.clone());
        let lats = &axes.lats[rows];
        let lons = &axes.lons[cols];

        let (mut south, mut north) = (lats[0], lats[lats.len() - 1]);
        if south > north {
            // native rows run north to south
            out.flip_rows();
            std::mem::swap(&mut south, &mut north);
        }
        let bounds = GeoBounds::new(south, north, lons[0], lons[lons.len() - 1]);

        let target_ny = ((b.north - b.south) / self.grid.dlat).round().max(1.0) as usize;
        let target_nx = ((b.east - b.west) / self.grid.dlon).round().max(1.0) as usize;
        let (src_ny, src_nx) = out.shape();
        if src_ny < target_ny || src_nx < target_nx {
            debug!(src_ny, src_nx, target_ny, target_nx, "Upsampling regular grid");
            out = zoom_preserving_nan(&out, target_ny, target_nx)?;
        }

        Ok(Reprojected { field: out, bounds })
    }
}

/// First..=last index whose value lies in `[lo, hi]`.
fn inclusive_span(axis: &[f64], lo: f64, hi: f64) -> Option<std::ops::Range<usize>> {
    let inside = |v: &f64| *v >= lo && *v <= hi;
    let first = axis.iter().position(inside)?;
    let last = axis.iter().rposition(inside)?;
    Some(first..last + 1)
}

/// Crop an output-grid field to the cells whose coordinates fall in `bbox`.
///
/// Reported bounds are the coordinates of the first and last kept cells.
pub fn crop_to_bbox(grid: &OutputGrid, field: &Field2D, bbox: &GeoBounds) -> Result<Reprojected> {
    let lats = grid.lats();
    let lons = grid.lons();
    let rows = inclusive_span(&lats, bbox.south, bbox.north).ok_or(OverlayError::EmptyReprojection)?;
    let cols = inclusive_span(&lons, bbox.west, bbox.east).ok_or(OverlayError::EmptyReprojection)?;
    let bounds = GeoBounds::new(lats[rows.start], lats[rows.end - 1], lons[cols.start], lons[cols.end - 1]);
    Ok(Reprojected {
        field: field.slice(rows, cols),
        bounds,
    })
}

/// Source coordinate for output index `o` when resizing `input` → `output`
/// samples with both end points aligned.
#[inline]
fn source_coord(o: usize, input: usize, output: usize) -> f64 {
    if output <= 1 {
        0.0
    } else {
        o as f64 * (input - 1) as f64 / (output - 1) as f64
    }
}

/// Bilinear resize with aligned corners.
pub fn zoom_bilinear(src: &Field2D, out_ny: usize, out_nx: usize) -> Result<Field2D> {
    let (in_ny, in_nx) = src.shape();
    let x_taps: Vec<(usize, usize, f32)> = (0..out_nx)
        .map(|o| {
            let x = source_coord(o, in_nx, out_nx);
            let x0 = (x.floor() as usize).min(in_nx - 1);
            let x1 = (x0 + 1).min(in_nx - 1);
            (x0, x1, (x - x0 as f64) as f32)
        })
        .collect();

    let mut data = vec![0.0f32; out_ny * out_nx];
    data.par_chunks_mut(out_nx).enumerate().for_each(|(row, out_row)| {
        let y = source_coord(row, in_ny, out_ny);
        let y0 = (y.floor() as usize).min(in_ny - 1);
        let y1 = (y0 + 1).min(in_ny - 1);
        let fy = (y - y0 as f64) as f32;
        let (r0, r1) = (src.row(y0), src.row(y1));
        for (out, &(x0, x1, fx)) in out_row.iter_mut().zip(&x_taps) {
            let top = r0[x0] * (1.0 - fx) + r0[x1] * fx;
            let bottom = r1[x0] * (1.0 - fx) + r1[x1] * fx;
            *out = top * (1.0 - fy) + bottom * fy;
        }
    });
    Field2D::new(out_ny, out_nx, data)
}

/// Nearest-neighbor resize with aligned corners.
pub fn zoom_nearest(src: &Field2D, out_ny: usize, out_nx: usize) -> Field2D {
    let (in_ny, in_nx) = src.shape();
    let nearest = |o: usize, input: usize, output: usize| -> usize {
        ((source_coord(o, input, output) + 0.5).floor() as usize).min(input - 1)
    };
    let cols: Vec<usize> = (0..out_nx).map(|o| nearest(o, in_nx, out_nx)).collect();
    Field2D::from_fn(out_ny, out_nx, |row, col| src.get(nearest(row, in_ny, out_ny), cols[col]))
}

/// Bilinear resize that keeps missing cells missing.
///
/// Values are zoomed with missing cells zero-filled; a 0/1 missing indicator
/// is zoomed with nearest-neighbor, and cells where it exceeds 0.5 are set
/// back to NaN.
pub fn zoom_preserving_nan(src: &Field2D, out_ny: usize, out_nx: usize) -> Result<Field2D> {
    if src.data().iter().all(|v| v.is_finite()) {
        return zoom_bilinear(src, out_ny, out_nx);
    }

    let mut filled = src.clone();
    filled.map_inplace(|v| if v.is_finite() { v } else { 0.0 });
    let mut missing = src.clone();
    missing.map_inplace(|v| if v.is_finite() { 0.0 } else { 1.0 });

    let mut out = zoom_bilinear(&filled, out_ny, out_nx)?;
    let mask = zoom_nearest(&missing, out_ny, out_nx);
    for (v, &m) in out.data_mut().iter_mut().zip(mask.data()) {
        if m > 0.5 {
            *v = f32::NAN;
        }
    }
    Ok(out)
}
