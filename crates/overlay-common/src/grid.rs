//! The regular lat/lon grid every overlay is rendered onto.

use crate::{GeoBounds, OverlayError, Result};
use serde::{Deserialize, Serialize};

/// Regular lat/lon output grid.
///
/// Coordinates run south to north and west to east, with both ends included
/// (the last point may overshoot `north`/`east` by less than half a step).
/// One instance lives for the whole deployment; nothing mutates it after
/// construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutputGrid {
    pub south: f64,
    pub north: f64,
    pub west: f64,
    pub east: f64,
    /// Latitude spacing in degrees
    pub dlat: f64,
    /// Longitude spacing in degrees
    pub dlon: f64,
}

impl OutputGrid {
    /// Create a validated grid.
    pub fn new(south: f64, north: f64, west: f64, east: f64, dlat: f64, dlon: f64) -> Result<Self> {
        let grid = Self {
            south,
            north,
            west,
            east,
            dlat,
            dlon,
        };
        grid.validate()?;
        Ok(grid)
    }

    /// Default CONUS grid at 0.03°.
    pub fn conus() -> Self {
        Self {
            south: 21.0,
            north: 53.0,
            west: -135.0,
            east: -60.0,
            dlat: 0.03,
            dlon: 0.03,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let finite = [self.south, self.north, self.west, self.east, self.dlat, self.dlon]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err(OverlayError::InvalidGrid("non-finite grid parameter".into()));
        }
        if self.south >= self.north {
            return Err(OverlayError::InvalidGrid(format!(
                "south {} must be < north {}",
                self.south, self.north
            )));
        }
        if self.west >= self.east {
            return Err(OverlayError::InvalidGrid(format!(
                "west {} must be < east {}",
                self.west, self.east
            )));
        }
        if self.dlat <= 0.0 || self.dlon <= 0.0 {
            return Err(OverlayError::InvalidGrid(format!(
                "spacing must be positive (dlat={}, dlon={})",
                self.dlat, self.dlon
            )));
        }
        Ok(())
    }

    /// Number of latitude rows.
    pub fn ny(&self) -> usize {
        axis_len(self.south, self.north, self.dlat)
    }

    /// Number of longitude columns.
    pub fn nx(&self) -> usize {
        axis_len(self.west, self.east, self.dlon)
    }

    /// `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.ny(), self.nx())
    }

    pub fn len(&self) -> usize {
        self.ny() * self.nx()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ascending latitudes, south to north.
    pub fn lats(&self) -> Vec<f64> {
        (0..self.ny()).map(|i| self.south + i as f64 * self.dlat).collect()
    }

    /// Ascending longitudes, west to east.
    pub fn lons(&self) -> Vec<f64> {
        (0..self.nx()).map(|i| self.west + i as f64 * self.dlon).collect()
    }

    pub fn bounds(&self) -> GeoBounds {
        GeoBounds::new(self.south, self.north, self.west, self.east)
    }
}

impl Default for OutputGrid {
    fn default() -> Self {
        Self::conus()
    }
}

/// Length of an inclusive-end arange: `ceil((stop + step/2 - start) / step)`.
fn axis_len(start: f64, stop: f64, step: f64) -> usize {
    let n = ((stop + step / 2.0 - start) / step).ceil();
    if n.is_finite() && n > 0.0 {
        n as usize
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conus_shape() {
        let grid = OutputGrid::new(21.0, 53.0, -135.0, -60.0, 0.03, 0.03).unwrap();
        assert_eq!(grid.shape(), (1068, 2501));
        assert_eq!(OutputGrid::conus().shape(), (1068, 2501));
    }

    #[test]
    fn test_coordinates_ascend() {
        let grid = OutputGrid::new(30.0, 31.0, -100.0, -99.0, 0.25, 0.5).unwrap();
        assert_eq!(grid.lats(), vec![30.0, 30.25, 30.5, 30.75, 31.0]);
        assert_eq!(grid.lons(), vec![-100.0, -99.5, -99.0]);
        assert_eq!(grid.shape(), (5, 3));
    }

    #[test]
    fn test_invalid_grids_rejected() {
        assert!(OutputGrid::new(53.0, 21.0, -135.0, -60.0, 0.03, 0.03).is_err());
        assert!(OutputGrid::new(21.0, 53.0, -60.0, -135.0, 0.03, 0.03).is_err());
        assert!(OutputGrid::new(21.0, 53.0, -135.0, -60.0, 0.0, 0.03).is_err());
        assert!(OutputGrid::new(21.0, 53.0, -135.0, -60.0, 0.03, -1.0).is_err());
        assert!(OutputGrid::new(f64::NAN, 53.0, -135.0, -60.0, 0.03, 0.03).is_err());
    }

    #[test]
    fn test_bounds_match_grid() {
        let b = OutputGrid::conus().bounds();
        assert_eq!((b.south, b.north, b.west, b.east), (21.0, 53.0, -135.0, -60.0));
    }
}
