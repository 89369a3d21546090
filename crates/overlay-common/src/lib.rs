//! Common types shared across the map overlay crates.

pub mod bbox;
pub mod error;
pub mod field;
pub mod grid;

pub use bbox::GeoBounds;
pub use error::{OverlayError, Result};
pub use field::{Field2D, Field3D, FieldArray, ForecastHour, MemoryForecastHour};
pub use grid::OutputGrid;
