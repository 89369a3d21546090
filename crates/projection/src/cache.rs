//! On-disk persistence of projection index maps.
//!
//! Each model gets a directory holding an artifact pair:
//!
//! - `_projection_map.bin`: `OVPM`, version, ny, nx, native point count,
//!   build parameters, then one little-endian `u32` native index per output
//!   cell
//! - `_projection_mask.bin`: `OVPK`, version, ny, nx, build parameters, then
//!   one byte per output cell (1 = out of domain)
//!
//! The build parameters are the domain threshold followed by the output
//! grid's south, north, west, east, dlat and dlon, as little-endian `f64`.
//!
//! The pair is only used when both files load and agree with each other and
//! with the current [`CacheKey`]. Anything else is deleted so the next build writes
//! a fresh pair. Cache failures are logged and never fatal.

use crate::error::{ProjectionError, Result};
use crate::index::IndexMap;
use overlay_common::OutputGrid;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const MAP_FILE: &str = "_projection_map.bin";
pub const MASK_FILE: &str = "_projection_mask.bin";

const MAP_MAGIC: &[u8; 4] = b"OVPM";
const MASK_MAGIC: &[u8; 4] = b"OVPK";
const VERSION: u32 = 2;
const PARAM_COUNT: usize = 7;
const MAP_HEADER: usize = 24 + PARAM_COUNT * 8;
const MASK_HEADER: usize = 16 + PARAM_COUNT * 8;

/// Artifact pair location for one model.
#[derive(Debug, Clone)]
pub struct ProjectionCache {
    dir: PathBuf,
}

impl ProjectionCache {
    /// Cache for `model` under `cache_root/<model>/`.
    pub fn new(cache_root: impl AsRef<Path>, model: &str) -> Self {
        Self {
            dir: cache_root.as_ref().join(model),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn map_path(&self) -> PathBuf {
        self.dir.join(MAP_FILE)
    }

    pub fn mask_path(&self) -> PathBuf {
        self.dir.join(MASK_FILE)
    }

    /// Load a persisted map built for exactly `key`.
    ///
    /// Returns `None` when there is nothing usable on disk; stale or corrupt
    /// artifacts are removed on the way.
    pub fn load(&self, key: &CacheKey) -> Option<IndexMap> {
        let map_path = self.map_path();
        let mask_path = self.mask_path();

        match (map_path.exists(), mask_path.exists()) {
            (false, false) => {
                debug!(dir = %self.dir.display(), "No cached projection");
                None
            }
            (true, false) => {
                warn!(
                    path = %map_path.display(),
                    "Stale projection cache: index without mask, rebuilding"
                );
                self.discard();
                None
            }
            (false, true) => {
                debug!(path = %mask_path.display(), "Orphan projection mask, removing");
                self.discard();
                None
            }
            (true, true) => match self.read_pair(key) {
                Ok(map) => {
                    info!(
                        dir = %self.dir.display(),
                        ny = key.shape.0,
                        nx = key.shape.1,
                        masked = map.masked_count(),
                        "Loaded cached projection"
                    );
                    Some(map)
                }
                Err(e) => {
                    warn!(dir = %self.dir.display(), error = %e, "Discarding unusable projection cache");
                    self.discard();
                    None
                }
            },
        }
    }

    /// Persist a map, replacing any existing pair.
    pub fn store(&self, map: &IndexMap, key: &CacheKey) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        // Mask first, so an interrupted write never leaves a map with a
        // mask from a different build.
        write_atomic(&self.mask_path(), &encode_mask(map, key))?;
        write_atomic(&self.map_path(), &encode_map(map, key))?;
        info!(dir = %self.dir.display(), cells = map.len(), "Stored projection cache");
        Ok(())
    }

    /// Remove both artifacts, ignoring ones already gone.
    pub fn discard(&self) {
        for path in [self.map_path(), self.mask_path()] {
            if let Err(e) = fs::remove_file(&path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %path.display(), error = %e, "Failed to remove projection artifact");
                }
            }
        }
    }

    fn read_pair(&self, key: &CacheKey) -> Result<IndexMap> {
        let map_bytes = read_file(&self.map_path())?;
        let mask_bytes = read_file(&self.mask_path())?;
        let (map_header, cached_native, indices) = decode_map(&map_bytes)?;
        let (mask_header, out_of_domain) = decode_mask(&mask_bytes)?;

        if map_header != mask_header {
            return Err(ProjectionError::PairMismatch {
                index: map_header.shape,
                mask: mask_header.shape,
            });
        }
        if map_header.shape != key.shape {
            return Err(ProjectionError::GridMismatch {
                cached: map_header.shape,
                expected: key.shape,
            });
        }
        if cached_native != key.native_len {
            return Err(ProjectionError::NativeMismatch {
                cached: cached_native,
                actual: key.native_len,
            });
        }
        if !key.same_params(&map_header.params) {
            return Err(ProjectionError::ParamsMismatch {
                cached: map_header.params,
                expected: key.params(),
            });
        }
        IndexMap::from_parts(key.shape, key.native_len, indices, out_of_domain)
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    fs::File::open(path)?.read_to_end(&mut bytes)?;
    Ok(bytes)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

/// What a persisted map was built for. A cached pair is only reused when
/// every field matches the current deployment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheKey {
    pub shape: (usize, usize),
    pub native_len: usize,
    pub threshold: f64,
    /// south, north, west, east, dlat, dlon
    pub grid: [f64; 6],
}

impl CacheKey {
    pub fn new(grid: &OutputGrid, native_len: usize, threshold: f64) -> Self {
        Self {
            shape: grid.shape(),
            native_len,
            threshold,
            grid: [grid.south, grid.north, grid.west, grid.east, grid.dlat, grid.dlon],
        }
    }

    fn params(&self) -> [f64; PARAM_COUNT] {
        let g = self.grid;
        [self.threshold, g[0], g[1], g[2], g[3], g[4], g[5]]
    }

    fn same_params(&self, params: &[f64; PARAM_COUNT]) -> bool {
        self.params().iter().zip(params).all(|(a, b)| a.to_bits() == b.to_bits())
    }
}

/// Decoded artifact header.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Header {
    pub shape: (usize, usize),
    /// Threshold then the six grid parameters.
    pub params: [f64; PARAM_COUNT],
}

fn put_params(bytes: &mut Vec<u8>, key: &CacheKey) {
    for p in key.params() {
        bytes.extend_from_slice(&p.to_le_bytes());
    }
}

/// Serialize the index artifact.
pub fn encode_map(map: &IndexMap, key: &CacheKey) -> Vec<u8> {
    let (ny, nx) = map.shape();
    let mut bytes = Vec::with_capacity(MAP_HEADER + map.len() * 4);
    bytes.extend_from_slice(MAP_MAGIC);
    bytes.extend_from_slice(&VERSION.to_le_bytes());
    bytes.extend_from_slice(&(ny as u32).to_le_bytes());
    bytes.extend_from_slice(&(nx as u32).to_le_bytes());
    bytes.extend_from_slice(&(map.native_len() as u64).to_le_bytes());
    put_params(&mut bytes, key);
    for &idx in map.indices() {
        bytes.extend_from_slice(&idx.to_le_bytes());
    }
    bytes
}

/// Serialize the mask artifact.
pub fn encode_mask(map: &IndexMap, key: &CacheKey) -> Vec<u8> {
    let (ny, nx) = map.shape();
    let mut bytes = Vec::with_capacity(MASK_HEADER + map.len());
    bytes.extend_from_slice(MASK_MAGIC);
    bytes.extend_from_slice(&VERSION.to_le_bytes());
    bytes.extend_from_slice(&(ny as u32).to_le_bytes());
    bytes.extend_from_slice(&(nx as u32).to_le_bytes());
    put_params(&mut bytes, key);
    bytes.extend(map.out_of_domain().iter().map(|&m| m as u8));
    bytes
}

/// Parse the index artifact into `(header, native_len, indices)`.
pub fn decode_map(bytes: &[u8]) -> Result<(Header, usize, Vec<u32>)> {
    let mut reader = ByteReader::new(bytes);
    if reader.take(4)? != MAP_MAGIC {
        return Err(ProjectionError::InvalidMagic(MAP_FILE));
    }
    check_version(reader.u32()?)?;
    let ny = reader.u32()? as usize;
    let nx = reader.u32()? as usize;
    let native_len = reader.u64()? as usize;
    let params = reader.params()?;

    let body = reader.rest();
    let expected = ny * nx * 4;
    if body.len() != expected {
        return Err(ProjectionError::InvalidSize {
            expected: MAP_HEADER + expected,
            actual: bytes.len(),
        });
    }
    let indices = body
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    Ok((Header { shape: (ny, nx), params }, native_len, indices))
}

/// Parse the mask artifact into `(header, out_of_domain)`.
pub fn decode_mask(bytes: &[u8]) -> Result<(Header, Vec<bool>)> {
    let mut reader = ByteReader::new(bytes);
    if reader.take(4)? != MASK_MAGIC {
        return Err(ProjectionError::InvalidMagic(MASK_FILE));
    }
    check_version(reader.u32()?)?;
    let ny = reader.u32()? as usize;
    let nx = reader.u32()? as usize;
    let params = reader.params()?;

    let body = reader.rest();
    if body.len() != ny * nx {
        return Err(ProjectionError::InvalidSize {
            expected: MASK_HEADER + ny * nx,
            actual: bytes.len(),
        });
    }
    Ok((Header { shape: (ny, nx), params }, body.iter().map(|&b| b != 0).collect()))
}

fn check_version(version: u32) -> Result<()> {
    if version != VERSION {
        return Err(ProjectionError::UnsupportedVersion(version));
    }
    Ok(())
}

/// Little-endian cursor over an artifact header.
struct ByteReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.offset + n;
        if end > self.bytes.len() {
            return Err(ProjectionError::InvalidSize {
                expected: end,
                actual: self.bytes.len(),
            });
        }
        let slice = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    fn u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&mut self) -> Result<u64> {
        let b = self.take(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(b);
        Ok(u64::from_le_bytes(buf))
    }

    fn f64(&mut self) -> Result<f64> {
        Ok(f64::from_bits(self.u64()?))
    }

    fn params(&mut self) -> Result<[f64; PARAM_COUNT]> {
        let mut params = [0.0; PARAM_COUNT];
        for p in params.iter_mut() {
            *p = self.f64()?;
        }
        Ok(params)
    }

    fn rest(&self) -> &'a [u8] {
        &self.bytes[self.offset..]
    }
}
