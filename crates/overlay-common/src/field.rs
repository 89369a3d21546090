//! Gridded arrays and the read-only forecast-hour capability.
//!
//! The decoder that produces forecast-hour data lives outside this workspace.
//! The engine only needs named lookups that may come back empty, so the
//! contract is a single trait with an `Option` return.

use crate::{OverlayError, Result};
use std::borrow::Cow;
use std::collections::HashMap;

/// A 2-D row-major array. Row 0 is the first row of the source array.
#[derive(Debug, Clone, PartialEq)]
pub struct Field2D {
    ny: usize,
    nx: usize,
    data: Vec<f32>,
}

impl Field2D {
    pub fn new(ny: usize, nx: usize, data: Vec<f32>) -> Result<Self> {
        if data.len() != ny * nx {
            return Err(OverlayError::NativeShapeMismatch {
                expected: ny * nx,
                actual: data.len(),
            });
        }
        Ok(Self { ny, nx, data })
    }

    pub fn filled(ny: usize, nx: usize, value: f32) -> Self {
        Self {
            ny,
            nx,
            data: vec![value; ny * nx],
        }
    }

    /// Build from a function of `(row, col)`.
    pub fn from_fn(ny: usize, nx: usize, f: impl Fn(usize, usize) -> f32) -> Self {
        let mut data = Vec::with_capacity(ny * nx);
        for row in 0..ny {
            for col in 0..nx {
                data.push(f(row, col));
            }
        }
        Self { ny, nx, data }
    }

    pub fn ny(&self) -> usize {
        self.ny
    }

    pub fn nx(&self) -> usize {
        self.nx
    }

    /// `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.ny, self.nx)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[row * self.nx + col]
    }

    pub fn row(&self, row: usize) -> &[f32] {
        &self.data[row * self.nx..(row + 1) * self.nx]
    }

    /// Apply `f` to every element in place.
    pub fn map_inplace(&mut self, f: impl Fn(f32) -> f32) {
        for v in &mut self.data {
            *v = f(*v);
        }
    }

    /// Copy of the sub-rectangle `rows x cols` (half-open ranges).
    pub fn slice(&self, rows: std::ops::Range<usize>, cols: std::ops::Range<usize>) -> Field2D {
        let ny = rows.len();
        let nx = cols.len();
        let mut data = Vec::with_capacity(ny * nx);
        for row in rows {
            let start = row * self.nx;
            data.extend_from_slice(&self.data[start + cols.start..start + cols.end]);
        }
        Field2D { ny, nx, data }
    }

    /// Reverse the row order (south-up ⇄ north-up).
    pub fn flip_rows(&mut self) {
        let (ny, nx) = (self.ny, self.nx);
        for row in 0..ny / 2 {
            let other = ny - 1 - row;
            let (head, tail) = self.data.split_at_mut(other * nx);
            head[row * nx..(row + 1) * nx].swap_with_slice(&mut tail[..nx]);
        }
    }

    /// Min and max over finite values, `None` when nothing is finite.
    pub fn finite_range(&self) -> Option<(f32, f32)> {
        finite_range(&self.data)
    }
}

/// Min and max over finite values of a slice.
pub fn finite_range(values: &[f32]) -> Option<(f32, f32)> {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// A stack of 2-D levels, `[level][row][col]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Field3D {
    nz: usize,
    ny: usize,
    nx: usize,
    data: Vec<f32>,
}

impl Field3D {
    pub fn new(nz: usize, ny: usize, nx: usize, data: Vec<f32>) -> Result<Self> {
        if data.len() != nz * ny * nx {
            return Err(OverlayError::NativeShapeMismatch {
                expected: nz * ny * nx,
                actual: data.len(),
            });
        }
        Ok(Self { nz, ny, nx, data })
    }

    /// Stack equally shaped levels.
    pub fn from_levels(levels: Vec<Field2D>) -> Result<Self> {
        let Some(first) = levels.first() else {
            return Err(OverlayError::missing("empty level stack"));
        };
        let (ny, nx) = first.shape();
        let mut data = Vec::with_capacity(levels.len() * ny * nx);
        for level in &levels {
            if level.shape() != (ny, nx) {
                return Err(OverlayError::NativeShapeMismatch {
                    expected: ny * nx,
                    actual: level.len(),
                });
            }
            data.extend_from_slice(level.data());
        }
        Ok(Self {
            nz: levels.len(),
            ny,
            nx,
            data,
        })
    }

    pub fn nz(&self) -> usize {
        self.nz
    }

    pub fn level_shape(&self) -> (usize, usize) {
        (self.ny, self.nx)
    }

    /// Borrow one level's values.
    pub fn level_data(&self, k: usize) -> Option<&[f32]> {
        if k >= self.nz {
            return None;
        }
        let n = self.ny * self.nx;
        Some(&self.data[k * n..(k + 1) * n])
    }

    /// Copy one level out as a 2-D field.
    pub fn level(&self, k: usize) -> Option<Field2D> {
        self.level_data(k).map(|d| Field2D {
            ny: self.ny,
            nx: self.nx,
            data: d.to_vec(),
        })
    }
}

/// Any named array a forecast hour may expose.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldArray {
    /// 1-D: pressure levels, or regular-grid coordinate axes
    Axis(Vec<f32>),
    /// 2-D: surface fields, curvilinear coordinates
    Grid2(Field2D),
    /// 3-D: isobaric fields
    Grid3(Field3D),
}

impl FieldArray {
    pub fn ndim(&self) -> usize {
        match self {
            FieldArray::Axis(_) => 1,
            FieldArray::Grid2(_) => 2,
            FieldArray::Grid3(_) => 3,
        }
    }

    pub fn as_axis(&self) -> Option<&[f32]> {
        match self {
            FieldArray::Axis(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_grid2(&self) -> Option<&Field2D> {
        match self {
            FieldArray::Grid2(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_grid3(&self) -> Option<&Field3D> {
        match self {
            FieldArray::Grid3(f) => Some(f),
            _ => None,
        }
    }

    /// Flattened values regardless of dimensionality.
    pub fn values(&self) -> &[f32] {
        match self {
            FieldArray::Axis(v) => v,
            FieldArray::Grid2(f) => f.data(),
            FieldArray::Grid3(f) => &f.data,
        }
    }
}

impl From<Field2D> for FieldArray {
    fn from(f: Field2D) -> Self {
        FieldArray::Grid2(f)
    }
}

impl From<Field3D> for FieldArray {
    fn from(f: Field3D) -> Self {
        FieldArray::Grid3(f)
    }
}

impl From<Vec<f32>> for FieldArray {
    fn from(v: Vec<f32>) -> Self {
        FieldArray::Axis(v)
    }
}

/// Read-only view of one model forecast hour.
///
/// Conventional names: `temperature`, `u_wind`, `v_wind`, `rh`, `dew_point`,
/// `geopotential_height`, `surface_pressure` (hPa), `pressure_levels` (hPa),
/// `lats`, `lons`, and surface analogues such as `t2m`, `d2m`, `u10m`, `v10m`.
/// Every attribute is optional.
pub trait ForecastHour: Send + Sync {
    /// Arrays already resident in memory.
    fn lookup(&self, name: &str) -> Option<&FieldArray>;

    /// Hook for surface fields decoded on first use. Default: none.
    fn load_surface_field(&self, _name: &str) -> Option<FieldArray> {
        None
    }

    /// Resident lookup first, then the lazy surface hook.
    fn field(&self, name: &str) -> Option<Cow<'_, FieldArray>> {
        match self.lookup(name) {
            Some(arr) => Some(Cow::Borrowed(arr)),
            None => self.load_surface_field(name).map(Cow::Owned),
        }
    }
}

/// String-keyed in-memory forecast hour.
#[derive(Debug, Clone, Default)]
pub struct MemoryForecastHour {
    arrays: HashMap<String, FieldArray>,
}

impl MemoryForecastHour {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, array: impl Into<FieldArray>) -> Self {
        self.insert(name, array);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, array: impl Into<FieldArray>) {
        self.arrays.insert(name.into(), array.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldArray> {
        self.arrays.remove(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.arrays.keys().map(String::as_str)
    }
}

impl ForecastHour for MemoryForecastHour {
    fn lookup(&self, name: &str) -> Option<&FieldArray> {
        self.arrays.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field2d_shape_checked() {
        assert!(Field2D::new(2, 3, vec![0.0; 6]).is_ok());
        assert!(Field2D::new(2, 3, vec![0.0; 5]).is_err());
    }

    #[test]
    fn test_flip_rows() {
        let mut f = Field2D::from_fn(3, 2, |r, c| (r * 10 + c) as f32);
        f.flip_rows();
        assert_eq!(f.data(), &[20.0, 21.0, 10.0, 11.0, 0.0, 1.0]);

        let mut even = Field2D::from_fn(2, 2, |r, _| r as f32);
        even.flip_rows();
        assert_eq!(even.data(), &[1.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_slice() {
        let f = Field2D::from_fn(4, 4, |r, c| (r * 4 + c) as f32);
        let s = f.slice(1..3, 2..4);
        assert_eq!(s.shape(), (2, 2));
        assert_eq!(s.data(), &[6.0, 7.0, 10.0, 11.0]);
    }

    #[test]
    fn test_finite_range_skips_nan() {
        assert_eq!(finite_range(&[f32::NAN, 3.0, -1.0, f32::INFINITY]), Some((-1.0, 3.0)));
        assert_eq!(finite_range(&[f32::NAN, f32::NAN]), None);
    }

    #[test]
    fn test_field3d_levels() {
        let a = Field2D::filled(2, 2, 1.0);
        let b = Field2D::filled(2, 2, 2.0);
        let stack = Field3D::from_levels(vec![a, b.clone()]).unwrap();
        assert_eq!(stack.nz(), 2);
        assert_eq!(stack.level(1).unwrap(), b);
        assert!(stack.level(2).is_none());
    }

    #[test]
    fn test_absent_attribute_is_none() {
        let fh = MemoryForecastHour::new().with("t2m", Field2D::filled(1, 1, 280.0));
        assert!(fh.field("t2m").is_some());
        assert!(fh.field("d2m").is_none());
    }

    struct LazySurface;

    impl ForecastHour for LazySurface {
        fn lookup(&self, _name: &str) -> Option<&FieldArray> {
            None
        }

        fn load_surface_field(&self, name: &str) -> Option<FieldArray> {
            (name == "gust").then(|| Field2D::filled(1, 1, 12.0).into())
        }
    }

    #[test]
    fn test_lazy_surface_hook() {
        let fh = LazySurface;
        assert!(matches!(fh.field("gust"), Some(Cow::Owned(_))));
        assert!(fh.field("vis").is_none());
    }
}
