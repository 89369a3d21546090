//! Native grid → output grid nearest-neighbor index.

use crate::error::{ProjectionError, Result};
use crate::sphere::to_unit_sphere;
use overlay_common::OutputGrid;
use rayon::prelude::*;
use rstar::primitives::GeomWithData;
use rstar::{PointDistance, RTree};
use std::time::Instant;
use tracing::{debug, info};

/// A native grid point on the unit sphere, tagged with its flat native index.
type NativePoint = GeomWithData<[f64; 3], u32>;

/// For every output cell: the flat index of the nearest native point and
/// whether that point is too far away to count as inside the model domain.
///
/// Immutable once built; concurrent readers need no synchronization.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexMap {
    ny: usize,
    nx: usize,
    native_len: usize,
    indices: Vec<u32>,
    out_of_domain: Vec<bool>,
}

impl IndexMap {
    /// Assemble a map from stored parts, checking every index is in range.
    pub fn from_parts(
        shape: (usize, usize),
        native_len: usize,
        indices: Vec<u32>,
        out_of_domain: Vec<bool>,
    ) -> Result<Self> {
        let (ny, nx) = shape;
        let cells = ny * nx;
        if indices.len() != cells {
            return Err(ProjectionError::InvalidSize {
                expected: cells,
                actual: indices.len(),
            });
        }
        if out_of_domain.len() != cells {
            return Err(ProjectionError::InvalidSize {
                expected: cells,
                actual: out_of_domain.len(),
            });
        }
        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= native_len) {
            return Err(ProjectionError::NativeMismatch {
                cached: bad as usize + 1,
                actual: native_len,
            });
        }
        Ok(Self {
            ny,
            nx,
            native_len,
            indices,
            out_of_domain,
        })
    }

    /// Output grid shape `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.ny, self.nx)
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Number of native points the map was built against.
    pub fn native_len(&self) -> usize {
        self.native_len
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn out_of_domain(&self) -> &[bool] {
        &self.out_of_domain
    }

    pub fn masked_count(&self) -> usize {
        self.out_of_domain.iter().filter(|&&m| m).count()
    }

    /// Gather a flattened native field onto the output grid.
    ///
    /// Out-of-domain cells come back as NaN.
    pub fn apply(&self, native: &[f32]) -> Result<Vec<f32>> {
        if native.len() != self.native_len {
            return Err(ProjectionError::FieldSize {
                expected: self.native_len,
                actual: native.len(),
            });
        }
        Ok(self
            .indices
            .par_iter()
            .zip(self.out_of_domain.par_iter())
            .map(|(&idx, &masked)| if masked { f32::NAN } else { native[idx as usize] })
            .collect())
    }
}

/// Native 1-D coordinate axes of an already-regular model grid.
#[derive(Debug, Clone, PartialEq)]
pub struct RegularAxes {
    pub lats: Vec<f64>,
    pub lons: Vec<f64>,
}

/// How a model's native grid reaches the output grid.
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectionMap {
    /// Curvilinear native grid: gather through a nearest-neighbor index.
    Curvilinear(IndexMap),
    /// Regular native grid: slice the native axes directly, no index needed.
    Regular(RegularAxes),
}

impl ProjectionMap {
    pub fn regular(lats: &[f32], lons: &[f32]) -> Self {
        ProjectionMap::Regular(RegularAxes {
            lats: lats.iter().map(|&v| v as f64).collect(),
            lons: lons.iter().map(|&v| v as f64).collect(),
        })
    }

    pub fn is_regular(&self) -> bool {
        matches!(self, ProjectionMap::Regular(_))
    }

    pub fn index_map(&self) -> Option<&IndexMap> {
        match self {
            ProjectionMap::Curvilinear(map) => Some(map),
            ProjectionMap::Regular(_) => None,
        }
    }

    pub fn regular_axes(&self) -> Option<&RegularAxes> {
        match self {
            ProjectionMap::Regular(axes) => Some(axes),
            ProjectionMap::Curvilinear(_) => None,
        }
    }
}

/// Build the nearest-neighbor index from flattened native lat/lon arrays.
///
/// Native points with non-finite coordinates are left out of the tree.
/// Output cells whose nearest native point lies further than `threshold`
/// (chord length on the unit sphere) are flagged out-of-domain.
pub fn build_index_map(
    lats: &[f32],
    lons: &[f32],
    grid: &OutputGrid,
    threshold: f64,
) -> Result<IndexMap> {
    if lats.len() != lons.len() {
        return Err(ProjectionError::CoordinateMismatch {
            lats: lats.len(),
            lons: lons.len(),
        });
    }
    if lats.len() > u32::MAX as usize {
        return Err(ProjectionError::TooManyPoints(lats.len()));
    }

    let start = Instant::now();
    let points: Vec<NativePoint> = lats
        .iter()
        .zip(lons)
        .enumerate()
        .filter(|(_, (lat, lon))| lat.is_finite() && lon.is_finite())
        .map(|(i, (&lat, &lon))| GeomWithData::new(to_unit_sphere(lat as f64, lon as f64), i as u32))
        .collect();
    if points.is_empty() {
        return Err(ProjectionError::EmptyNativeGrid);
    }
    debug!(points = points.len(), "Bulk loading native grid tree");
    let tree = RTree::bulk_load(points);

    let out_lats = grid.lats();
    let out_lons = grid.lons();
    let (ny, nx) = (out_lats.len(), out_lons.len());
    let threshold_sq = threshold * threshold;

    let (indices, out_of_domain): (Vec<u32>, Vec<bool>) = (0..ny * nx)
        .into_par_iter()
        .map(|cell| {
            let query = to_unit_sphere(out_lats[cell / nx], out_lons[cell % nx]);
            match tree.nearest_neighbor(&query) {
                Some(nearest) => (nearest.data, nearest.distance_2(&query) > threshold_sq),
                None => (0, true),
            }
        })
        .unzip();

    let map = IndexMap {
        ny,
        nx,
        native_len: lats.len(),
        indices,
        out_of_domain,
    };
    info!(
        ny,
        nx,
        native_points = lats.len(),
        masked = map.masked_count(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Built projection index"
    );
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regular_native(south: f32, west: f32, step: f32, ny: usize, nx: usize) -> (Vec<f32>, Vec<f32>) {
        let mut lats = Vec::with_capacity(ny * nx);
        let mut lons = Vec::with_capacity(ny * nx);
        for r in 0..ny {
            for c in 0..nx {
                lats.push(south + r as f32 * step);
                lons.push(west + c as f32 * step);
            }
        }
        (lats, lons)
    }

    #[test]
    fn test_identical_grids_map_one_to_one() {
        let grid = OutputGrid::new(30.0, 31.0, -100.0, -99.0, 0.25, 0.25).unwrap();
        let (lats, lons) = regular_native(30.0, -100.0, 0.25, 5, 5);
        let map = build_index_map(&lats, &lons, &grid, 0.002).unwrap();

        assert_eq!(map.shape(), (5, 5));
        assert_eq!(map.masked_count(), 0);
        let expected: Vec<u32> = (0..25).collect();
        assert_eq!(map.indices(), &expected[..]);
    }

    #[test]
    fn test_cells_outside_native_domain_are_masked() {
        // native covers the southern half only
        let grid = OutputGrid::new(30.0, 32.0, -100.0, -99.0, 0.05, 0.05).unwrap();
        let (lats, lons) = regular_native(30.0, -100.0, 0.05, 21, 21);
        let map = build_index_map(&lats, &lons, &grid, 0.002).unwrap();

        let (ny, nx) = map.shape();
        let out_lats = grid.lats();
        for r in 0..ny {
            for c in 0..nx {
                let masked = map.out_of_domain()[r * nx + c];
                if out_lats[r] <= 31.0 + 1e-6 {
                    assert!(!masked, "row {} should be in domain", r);
                } else if out_lats[r] > 31.2 {
                    assert!(masked, "row {} should be out of domain", r);
                }
            }
        }
    }

    #[test]
    fn test_apply_masks_and_gathers() {
        let map = IndexMap::from_parts((1, 3), 2, vec![1, 0, 1], vec![false, false, true]).unwrap();
        let out = map.apply(&[10.0, 20.0]).unwrap();
        assert_eq!(out[0], 20.0);
        assert_eq!(out[1], 10.0);
        assert!(out[2].is_nan());

        assert!(matches!(
            map.apply(&[1.0, 2.0, 3.0]),
            Err(ProjectionError::FieldSize { expected: 2, actual: 3 })
        ));
    }

    #[test]
    fn test_from_parts_rejects_out_of_range() {
        assert!(IndexMap::from_parts((1, 2), 2, vec![0, 2], vec![false, false]).is_err());
        assert!(IndexMap::from_parts((1, 2), 2, vec![0], vec![false, false]).is_err());
    }

    #[test]
    fn test_coordinate_errors() {
        let grid = OutputGrid::new(0.0, 1.0, 0.0, 1.0, 0.5, 0.5).unwrap();
        assert!(matches!(
            build_index_map(&[0.0, 1.0], &[0.0], &grid, 0.002),
            Err(ProjectionError::CoordinateMismatch { .. })
        ));
        assert!(matches!(
            build_index_map(&[f32::NAN], &[f32::NAN], &grid, 0.002),
            Err(ProjectionError::EmptyNativeGrid)
        ));
    }

    #[test]
    fn test_nan_native_points_skipped() {
        let grid = OutputGrid::new(0.0, 0.0001, 0.0, 0.0001, 1.0, 1.0).unwrap();
        let map = build_index_map(&[f32::NAN, 0.0], &[f32::NAN, 0.0], &grid, 0.002).unwrap();
        assert_eq!(map.indices(), &[1]);
    }
}
