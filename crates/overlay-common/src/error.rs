//! Error types for map overlay rendering.

use thiserror::Error;

/// Result type alias using OverlayError.
pub type Result<T> = std::result::Result<T, OverlayError>;

/// Primary error type for overlay operations.
///
/// The first group of variants are "no data" outcomes: the request was valid
/// but there is nothing to draw. Callers map them to an explicit empty
/// response rather than a server failure (see [`OverlayError::is_no_data`]).
#[derive(Debug, Error)]
pub enum OverlayError {
    // === No-data outcomes ===
    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Unknown product: {0}")]
    UnknownProduct(String),

    #[error("Missing data: {0}")]
    MissingData(String),

    #[error("Requested bbox does not intersect the output grid")]
    EmptyReprojection,

    // === Layer outcomes (composite rendering continues) ===
    #[error("Layer '{layer}' shape {actual:?} does not match fill shape {expected:?}")]
    LayerShapeMismatch {
        layer: String,
        expected: (usize, usize),
        actual: (usize, usize),
    },

    // === Cache ===
    #[error("Stale projection cache: {0}")]
    StaleCache(String),

    #[error("Cache error: {0}")]
    Cache(String),

    // === Input / configuration ===
    #[error("Invalid output grid: {0}")]
    InvalidGrid(String),

    #[error("Native field has {actual} points, projection expects {expected}")]
    NativeShapeMismatch { expected: usize, actual: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    // === Rendering ===
    #[error("Encoding failed: {0}")]
    Encode(String),

    #[error("Projection error: {0}")]
    Projection(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl OverlayError {
    /// Whether this error means "nothing to render" as opposed to a failure.
    pub fn is_no_data(&self) -> bool {
        matches!(
            self,
            OverlayError::UnknownField(_)
                | OverlayError::UnknownProduct(_)
                | OverlayError::MissingData(_)
                | OverlayError::EmptyReprojection
        )
    }

    /// HTTP status an outer handler should answer with.
    pub fn http_status_code(&self) -> u16 {
        match self {
            OverlayError::UnknownField(_) | OverlayError::UnknownProduct(_) => 404,
            OverlayError::MissingData(_) | OverlayError::EmptyReprojection => 204,
            OverlayError::InvalidGrid(_) | OverlayError::Config(_) => 400,
            _ => 500,
        }
    }

    pub fn missing(what: impl Into<String>) -> Self {
        Self::MissingData(what.into())
    }
}

impl From<serde_json::Error> for OverlayError {
    fn from(err: serde_json::Error) -> Self {
        OverlayError::Config(format!("JSON error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_data_classification() {
        assert!(OverlayError::UnknownField("x".into()).is_no_data());
        assert!(OverlayError::UnknownProduct("x".into()).is_no_data());
        assert!(OverlayError::missing("t2m").is_no_data());
        assert!(OverlayError::EmptyReprojection.is_no_data());

        assert!(!OverlayError::Encode("boom".into()).is_no_data());
        assert!(!OverlayError::Cache("disk".into()).is_no_data());
    }

    #[test]
    fn test_http_status() {
        assert_eq!(OverlayError::UnknownField("x".into()).http_status_code(), 404);
        assert_eq!(OverlayError::EmptyReprojection.http_status_code(), 204);
        assert_eq!(OverlayError::Encode("x".into()).http_status_code(), 500);
    }
}
