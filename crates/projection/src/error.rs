use overlay_common::OverlayError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProjectionError>;

/// Errors raised while building, persisting or applying a projection map.
#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid magic bytes in {0}")]
    InvalidMagic(&'static str),

    #[error("Unsupported cache version: {0}")]
    UnsupportedVersion(u32),

    #[error("Invalid artifact size: expected {expected} bytes, got {actual}")]
    InvalidSize { expected: usize, actual: usize },

    #[error("Index and mask disagree: index {index:?}, mask {mask:?}")]
    PairMismatch {
        index: (usize, usize),
        mask: (usize, usize),
    },

    #[error("Cached map shape {cached:?} does not match output grid {expected:?}")]
    GridMismatch {
        cached: (usize, usize),
        expected: (usize, usize),
    },

    #[error("Cached map was built for {cached} native points, grid has {actual}")]
    NativeMismatch { cached: usize, actual: usize },

    #[error("Cached map was built with threshold and grid {cached:?}, current is {expected:?}")]
    ParamsMismatch { cached: [f64; 7], expected: [f64; 7] },

    #[error("Native coordinates disagree: {lats} latitudes, {lons} longitudes")]
    CoordinateMismatch { lats: usize, lons: usize },

    #[error("Native grid has no finite coordinates")]
    EmptyNativeGrid,

    #[error("Native grid too large for 32-bit indices: {0} points")]
    TooManyPoints(usize),

    #[error("Field has {actual} points, projection expects {expected}")]
    FieldSize { expected: usize, actual: usize },
}

impl From<ProjectionError> for OverlayError {
    fn from(err: ProjectionError) -> Self {
        match err {
            ProjectionError::Io(e) => OverlayError::Io(e),
            ProjectionError::FieldSize { expected, actual } => {
                OverlayError::NativeShapeMismatch { expected, actual }
            }
            other => OverlayError::Projection(other.to_string()),
        }
    }
}
