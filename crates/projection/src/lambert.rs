//! Lambert conformal conic native grids.
//!
//! Regional models such as HRRR publish their fields on a Lambert conformal
//! grid. Only the grid definition ships with a model run, so this module
//! turns that definition into the per-cell lat/lon arrays the projection
//! index is built from.

use rayon::prelude::*;
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

/// Mean earth radius used by NCEP Lambert grids (meters).
const EARTH_RADIUS: f64 = 6_371_229.0;

/// Lambert conformal grid definition as carried in GRIB2 section 3.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LambertGrid {
    /// Latitude of the first grid point (degrees)
    pub lat1: f64,
    /// Longitude of the first grid point (degrees east, -180..180)
    pub lon1: f64,
    /// Orientation meridian, LoV (degrees)
    pub lov: f64,
    pub latin1: f64,
    pub latin2: f64,
    /// Grid spacing in meters
    pub dx: f64,
    pub dy: f64,
    pub nx: usize,
    pub ny: usize,
}

impl LambertGrid {
    /// HRRR CONUS: 1799 x 1059 at 3 km, tangent at 38.5°N.
    pub fn hrrr() -> Self {
        Self {
            lat1: 21.138123,
            lon1: -122.719528,
            lov: -97.5,
            latin1: 38.5,
            latin2: 38.5,
            dx: 3000.0,
            dy: 3000.0,
            nx: 1799,
            ny: 1059,
        }
    }

    /// Keep every `factor`-th point in both directions.
    pub fn decimate(&self, factor: usize) -> Self {
        let factor = factor.max(1);
        Self {
            dx: self.dx * factor as f64,
            dy: self.dy * factor as f64,
            nx: (self.nx.saturating_sub(1)) / factor + 1,
            ny: (self.ny.saturating_sub(1)) / factor + 1,
            ..*self
        }
    }
}

/// Forward and inverse Lambert conformal conic projection for one grid.
#[derive(Debug, Clone)]
pub struct LambertConformal {
    grid: LambertGrid,
    lon0: f64,
    /// Cone constant
    n: f64,
    /// Radius-scaled F constant
    rf: f64,
    /// Polar radius at the first grid point
    rho0: f64,
    /// Projected position of the first grid point
    x0: f64,
    y0: f64,
}

impl LambertConformal {
    pub fn new(grid: LambertGrid) -> Self {
        let latin1 = grid.latin1.to_radians();
        let latin2 = grid.latin2.to_radians();
        let lat1 = grid.lat1.to_radians();
        let lon0 = grid.lov.to_radians();

        let n = if (latin1 - latin2).abs() < 1e-10 {
            latin1.sin()
        } else {
            (latin1.cos() / latin2.cos()).ln()
                / ((FRAC_PI_4 + latin2 / 2.0).tan() / (FRAC_PI_4 + latin1 / 2.0).tan()).ln()
        };
        let rf = EARTH_RADIUS * latin1.cos() * (FRAC_PI_4 + latin1 / 2.0).tan().powf(n) / n;
        let rho0 = rf / (FRAC_PI_4 + lat1 / 2.0).tan().powf(n);

        let theta0 = n * wrap_pi(grid.lon1.to_radians() - lon0);
        let x0 = rho0 * theta0.sin();
        let y0 = rho0 - rho0 * theta0.cos();

        Self {
            grid,
            lon0,
            n,
            rf,
            rho0,
            x0,
            y0,
        }
    }

    pub fn hrrr() -> Self {
        Self::new(LambertGrid::hrrr())
    }

    pub fn grid(&self) -> &LambertGrid {
        &self.grid
    }

    /// `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.grid.ny, self.grid.nx)
    }

    /// Geographic degrees → fractional grid position `(i, j)` (column, row).
    pub fn geo_to_grid(&self, lat_deg: f64, lon_deg: f64) -> (f64, f64) {
        let lat = lat_deg.to_radians();
        let rho = self.rf / (FRAC_PI_4 + lat / 2.0).tan().powf(self.n);
        let theta = self.n * wrap_pi(lon_deg.to_radians() - self.lon0);
        let x = rho * theta.sin();
        let y = self.rho0 - rho * theta.cos();
        ((x - self.x0) / self.grid.dx, (y - self.y0) / self.grid.dy)
    }

    /// Grid position `(i, j)` → geographic `(lat, lon)` degrees.
    pub fn grid_to_geo(&self, i: f64, j: f64) -> (f64, f64) {
        let x = self.x0 + i * self.grid.dx;
        let dy = self.rho0 - (self.y0 + j * self.grid.dy);
        let rho = (x * x + dy * dy).sqrt().copysign(self.n);
        let theta = (x / dy).atan();
        let lat = 2.0 * (self.rf / rho).powf(1.0 / self.n).atan() - FRAC_PI_2;
        let lon = wrap_pi(self.lon0 + theta / self.n);
        (lat.to_degrees(), lon.to_degrees())
    }

    /// Row-major per-cell latitudes and longitudes for the whole grid.
    pub fn coordinates(&self) -> (Vec<f32>, Vec<f32>) {
        let (ny, nx) = self.shape();
        let rows: Vec<(Vec<f32>, Vec<f32>)> = (0..ny)
            .into_par_iter()
            .map(|j| {
                (0..nx)
                    .map(|i| {
                        let (lat, lon) = self.grid_to_geo(i as f64, j as f64);
                        (lat as f32, lon as f32)
                    })
                    .unzip()
            })
            .collect();

        let mut lats = Vec::with_capacity(ny * nx);
        let mut lons = Vec::with_capacity(ny * nx);
        for (row_lats, row_lons) in rows {
            lats.extend(row_lats);
            lons.extend(row_lons);
        }
        (lats, lons)
    }
}

fn wrap_pi(mut angle: f64) -> f64 {
    while angle > PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}
