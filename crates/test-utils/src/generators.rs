//! Synthetic forecast hours.
//!
//! Every field is a smooth analytic function of latitude and longitude, so a
//! value read back after reprojection can be checked against the formula at
//! the native point it came from.

use overlay_common::{Field2D, Field3D, MemoryForecastHour, OutputGrid};
use projection::{degrees_to_chord, LambertConformal, LambertGrid};

/// Isobaric levels carried by every synthetic hour (hPa, surface first).
pub const PRESSURE_LEVELS: [f32; 6] = [1000.0, 925.0, 850.0, 700.0, 500.0, 250.0];

/// Decimation of the HRRR grid used by most tests (60 km spacing, 90 x 53).
pub const TEST_DECIMATION: usize = 20;

/// 2 m temperature (K): warm south, cold north, a gentle zonal wave.
pub fn t2m_at(lat: f32, lon: f32) -> f32 {
    300.0 - 0.6 * (lat - 25.0) + 2.0 * (lon / 5.0).sin()
}

/// 2 m dew point (K), always below [`t2m_at`].
pub fn d2m_at(lat: f32, lon: f32) -> f32 {
    t2m_at(lat, lon) - 4.0 - 0.15 * (lat - 25.0).abs()
}

/// 10 m wind (m/s).
pub fn wind10_at(lat: f32, lon: f32) -> (f32, f32) {
    (8.0 * (lat / 6.0).sin() + 2.0, 6.0 * (lon / 8.0).cos())
}

/// Sea-level pressure (hPa).
pub fn mslp_at(lat: f32, lon: f32) -> f32 {
    1012.0 + 14.0 * (lat / 7.0).sin() * (lon / 9.0).cos()
}

/// Composite reflectivity (dBZ): one storm over Kansas, clear air elsewhere.
pub fn refc_at(lat: f32, lon: f32) -> f32 {
    let d2 = (lat - 38.0).powi(2) + (lon + 97.0).powi(2);
    65.0 * (-d2 / 12.0).exp() - 10.0
}

/// Surface pressure (hPa), between 920 and 1000.
pub fn surface_pressure_at(lat: f32, lon: f32) -> f32 {
    960.0 + 40.0 * (lon / 10.0).cos() * (lat / 15.0).cos().abs()
}

/// Isobaric temperature (K) with a dry-adiabat-like decrease aloft.
pub fn temperature_at(lat: f32, lon: f32, p: f32) -> f32 {
    t2m_at(lat, lon) * (p / 1000.0).powf(0.19)
}

pub fn dew_point_at(lat: f32, lon: f32, p: f32) -> f32 {
    temperature_at(lat, lon, p) - 3.0 - (1000.0 - p) / 40.0
}

/// Isobaric wind (m/s), increasing with height.
pub fn wind_at(lat: f32, lon: f32, p: f32) -> (f32, f32) {
    let (u, v) = wind10_at(lat, lon);
    let shear = 1.0 + (1000.0 - p) / 150.0;
    (u * shear + 5.0, v * shear)
}

/// Geopotential height (gpm) from the standard atmosphere plus a ridge.
pub fn geopotential_height_at(lat: f32, lon: f32, p: f32) -> f32 {
    44_330.0 * (1.0 - (p / 1013.25).powf(0.1903)) + 150.0 * (lon / 12.0).sin() - 8.0 * (lat - 40.0)
}

/// Per-cell coordinates of a native grid, row-major.
#[derive(Debug, Clone)]
pub struct NativeGrid {
    pub ny: usize,
    pub nx: usize,
    pub lats: Vec<f32>,
    pub lons: Vec<f32>,
}

impl NativeGrid {
    /// HRRR geometry kept every `decimation`-th point.
    pub fn lambert(decimation: usize) -> Self {
        let proj = LambertConformal::new(LambertGrid::hrrr().decimate(decimation));
        let (ny, nx) = proj.shape();
        let (lats, lons) = proj.coordinates();
        Self { ny, nx, lats, lons }
    }

    /// Regular grid from explicit axes.
    pub fn from_axes(lat_axis: &[f32], lon_axis: &[f32]) -> Self {
        let (ny, nx) = (lat_axis.len(), lon_axis.len());
        let mut lats = Vec::with_capacity(ny * nx);
        let mut lons = Vec::with_capacity(ny * nx);
        for &lat in lat_axis {
            for &lon in lon_axis {
                lats.push(lat);
                lons.push(lon);
            }
        }
        Self { ny, nx, lats, lons }
    }

    pub fn surface(&self, f: impl Fn(f32, f32) -> f32) -> Field2D {
        Field2D::from_fn(self.ny, self.nx, |i, j| {
            let k = i * self.nx + j;
            f(self.lats[k], self.lons[k])
        })
    }

    pub fn isobaric(&self, f: impl Fn(f32, f32, f32) -> f32) -> Field3D {
        let levels = PRESSURE_LEVELS
            .iter()
            .map(|&p| self.surface(|lat, lon| f(lat, lon, p)))
            .collect();
        Field3D::from_levels(levels).expect("levels share one shape")
    }

    /// Every surface and isobaric field the overlay registry reads.
    pub fn populate(&self, fh: &mut MemoryForecastHour) {
        fh.insert("t2m", self.surface(t2m_at));
        fh.insert("d2m", self.surface(d2m_at));
        fh.insert("u10m", self.surface(|lat, lon| wind10_at(lat, lon).0));
        fh.insert("v10m", self.surface(|lat, lon| wind10_at(lat, lon).1));
        fh.insert("mslp", self.surface(mslp_at));
        fh.insert("refc", self.surface(refc_at));
        fh.insert("cape_sfc", self.surface(|lat, lon| (refc_at(lat, lon) * 50.0).max(0.0)));
        fh.insert("vis", self.surface(|lat, _| 16_000.0 - 100.0 * (lat - 25.0)));
        fh.insert("gust", self.surface(|lat, lon| 1.5 * wind10_at(lat, lon).0.abs()));
        fh.insert("prate", self.surface(|lat, lon| (refc_at(lat, lon) / 20.0).max(0.0) * 1e-3));
        fh.insert("surface_pressure", self.surface(surface_pressure_at));

        fh.insert("pressure_levels", PRESSURE_LEVELS.to_vec());
        fh.insert("temperature", self.isobaric(temperature_at));
        fh.insert("dew_point", self.isobaric(dew_point_at));
        fh.insert("u_wind", self.isobaric(|lat, lon, p| wind_at(lat, lon, p).0));
        fh.insert("v_wind", self.isobaric(|lat, lon, p| wind_at(lat, lon, p).1));
        fh.insert("geopotential_height", self.isobaric(geopotential_height_at));
        fh.insert("rh", self.isobaric(|lat, _, p| (40.0 + lat + (p - 250.0) / 25.0).min(100.0)));
        fh.insert("vorticity", self.isobaric(|lat, lon, _| 1e-4 * (lat / 5.0).sin() * (lon / 5.0).cos()));
        fh.insert("omega", self.isobaric(|lat, lon, _| 0.5 * (lat / 4.0).cos() * (lon / 6.0).sin()));
        fh.insert("theta", self.isobaric(|lat, lon, p| {
            temperature_at(lat, lon, p) * (1000.0 / p).powf(0.286)
        }));
    }
}

/// A complete hour on the decimated HRRR Lambert grid, 2-D coordinates.
pub fn lambert_hour(decimation: usize) -> MemoryForecastHour {
    let grid = NativeGrid::lambert(decimation);
    let mut fh = MemoryForecastHour::new()
        .with("lats", Field2D::new(grid.ny, grid.nx, grid.lats.clone()).expect("coordinate shape"))
        .with("lons", Field2D::new(grid.ny, grid.nx, grid.lons.clone()).expect("coordinate shape"));
    grid.populate(&mut fh);
    fh
}

/// Latitude and longitude axes at `step` degrees, inclusive of both ends.
/// Latitudes run north to south when `descending`.
pub fn regular_axes(south: f32, north: f32, west: f32, east: f32, step: f32, descending: bool) -> (Vec<f32>, Vec<f32>) {
    let axis = |lo: f32, hi: f32| -> Vec<f32> {
        let n = ((hi - lo) / step).round() as usize + 1;
        (0..n).map(|i| lo + i as f32 * step).collect()
    };
    let mut lats = axis(south, north);
    if descending {
        lats.reverse();
    }
    (lats, axis(west, east))
}

/// A complete hour on a regular lat/lon grid with 1-D coordinate axes.
pub fn regular_hour(south: f32, north: f32, west: f32, east: f32, step: f32, descending: bool) -> MemoryForecastHour {
    let (lat_axis, lon_axis) = regular_axes(south, north, west, east, step, descending);
    let grid = NativeGrid::from_axes(&lat_axis, &lon_axis);
    let mut fh = MemoryForecastHour::new().with("lats", lat_axis).with("lons", lon_axis);
    grid.populate(&mut fh);
    fh
}

/// Coarse output grid at 0.5°, 71 x 141, wider than the HRRR domain on every side.
pub fn test_output_grid() -> OutputGrid {
    OutputGrid::new(20.0, 55.0, -130.0, -60.0, 0.5, 0.5).expect("valid test grid")
}

/// Domain threshold (chord) for a decimated HRRR grid: one native spacing.
pub fn lambert_threshold(decimation: usize) -> f64 {
    let spacing_deg = 3.0 * decimation as f64 / 111.2;
    degrees_to_chord(spacing_deg)
}
