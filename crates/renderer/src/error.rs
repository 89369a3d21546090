use thiserror::Error;

pub type Result<T> = std::result::Result<T, RenderError>;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Pixel buffer has {actual} bytes, expected {expected} for {width}x{height}")]
    BufferSize {
        width: usize,
        height: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Cannot allocate a {width}x{height} canvas")]
    Canvas { width: usize, height: usize },

    #[error("PNG compression failed: {0}")]
    Compression(#[from] std::io::Error),
}
