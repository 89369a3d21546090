//! Weather-model field overlays for web maps.
//!
//! Fields are pulled from a forecast hour, reprojected onto a regular lat/lon
//! output grid, and rendered as raw floats, a ramp-colored PNG, or a composite
//! product with contour lines and wind barbs.

pub mod config;
pub mod derive;
pub mod engine;
pub mod extract;
pub mod fields;
pub mod metrics;
pub mod products;
pub mod render;
pub mod reproject;
pub mod result;
pub mod units;

pub use config::{ModelConfigRegistry, ModelOverlayConfig, OverlayConfig};
pub use engine::MapOverlayEngine;
pub use fields::{field, fields, Derivation, FieldCategory, FieldMetadata, FieldSpec, HdwMode};
pub use products::{product, products, BarbSpec, CompositeSpec, ContourSpec, ProductMetadata};
pub use render::flat::FlatImageOptions;
pub use render::{DEFAULT_OPACITY, NAN_SENTINEL};
pub use result::{ContentKind, OverlayResult, EXPOSED_HEADERS};
pub use units::UnitTransform;

pub use overlay_common::{ForecastHour, GeoBounds, OutputGrid, OverlayError, Result};
pub use projection::ProjectionState;
