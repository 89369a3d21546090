//! Nearest-neighbor projection from native model grids onto the output grid.
//!
//! Native and output coordinates are placed on the unit sphere and matched
//! with an R*-tree. The resulting index map is cached on disk per model and
//! held in memory behind a build-once cell.

pub mod cache;
pub mod error;
pub mod index;
pub mod lambert;
pub mod lazy;
pub mod sphere;

pub use cache::{CacheKey, ProjectionCache};
pub use error::{ProjectionError, Result};
pub use index::{build_index_map, IndexMap, ProjectionMap, RegularAxes};
pub use lambert::{LambertConformal, LambertGrid};
pub use lazy::{LazyProjection, ProjectionState};
pub use sphere::{
    chord_to_degrees, degrees_to_chord, great_circle_degrees, to_unit_sphere,
    DEFAULT_DOMAIN_THRESHOLD,
};
