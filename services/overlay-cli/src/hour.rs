//! Forecast hour backed by a directory of raw arrays.
//!
//! Layout:
//!
//! ```text
//! hour/
//!   manifest.yaml      arrays: { lats: [ny, nx], temperature: [nz, ny, nx], ... }
//!   lats.f32           little-endian f32, row-major
//!   ...
//! ```
//!
//! Coordinates, 1-D and 3-D arrays are read up front. 2-D fields other than
//! the coordinates are read when first requested.

use anyhow::{bail, Context, Result};
use overlay_common::{Field2D, Field3D, FieldArray, ForecastHour};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const MANIFEST: &str = "manifest.yaml";
const COORDINATES: [&str; 2] = ["lats", "lons"];

/// Read exactly `expected` little-endian f32 values from `path`.
pub fn read_f32_le(path: impl AsRef<Path>, expected: usize) -> Result<Vec<f32>> {
    let path = path.as_ref();
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    if bytes.len() != expected * 4 {
        bail!("{}: expected {} values, file holds {} bytes", path.display(), expected, bytes.len());
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

#[derive(Debug, Deserialize)]
struct Manifest {
    arrays: BTreeMap<String, Vec<usize>>,
}

#[derive(Debug)]
pub struct DirectoryHour {
    dir: PathBuf,
    resident: HashMap<String, FieldArray>,
    /// Lazily read surface fields and their shapes.
    surface: HashMap<String, (usize, usize)>,
}

impl DirectoryHour {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let manifest_path = dir.join(MANIFEST);
        let contents = fs::read_to_string(&manifest_path)
            .with_context(|| format!("reading {}", manifest_path.display()))?;
        let manifest: Manifest = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing {}", manifest_path.display()))?;

        let mut hour = Self {
            dir,
            resident: HashMap::new(),
            surface: HashMap::new(),
        };
        for (name, shape) in manifest.arrays {
            match shape.as_slice() {
                [ny, nx] if !COORDINATES.contains(&name.as_str()) => {
                    hour.surface.insert(name, (*ny, *nx));
                }
                _ => {
                    let array = hour.read_array(&name, &shape)?;
                    hour.resident.insert(name, array);
                }
            }
        }
        debug!(
            dir = %hour.dir.display(),
            resident = hour.resident.len(),
            lazy = hour.surface.len(),
            "Opened forecast hour"
        );
        Ok(hour)
    }

    /// Every array the manifest lists.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .resident
            .keys()
            .chain(self.surface.keys())
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names
    }

    fn read_array(&self, name: &str, shape: &[usize]) -> Result<FieldArray> {
        let len = shape.iter().product();
        let values = read_f32_le(self.dir.join(format!("{}.f32", name)), len)?;
        let array = match *shape {
            [_] => FieldArray::Axis(values),
            [ny, nx] => FieldArray::Grid2(Field2D::new(ny, nx, values)?),
            [nz, ny, nx] => FieldArray::Grid3(Field3D::new(nz, ny, nx, values)?),
            _ => bail!("{}: unsupported rank {}", name, shape.len()),
        };
        Ok(array)
    }
}

impl ForecastHour for DirectoryHour {
    fn lookup(&self, name: &str) -> Option<&FieldArray> {
        self.resident.get(name)
    }

    fn load_surface_field(&self, name: &str) -> Option<FieldArray> {
        let &(ny, nx) = self.surface.get(name)?;
        match self.read_array(name, &[ny, nx]) {
            Ok(array) => Some(array),
            Err(e) => {
                warn!(field = name, error = %e, "Failed to load surface field");
                None
            }
        }
    }
}
