//! Raster output for map overlays.
//!
//! - Color ramps with a process-wide cache
//! - PNG encoding (indexed or RGBA)
//! - Contour lines (marching squares) with inline labels
//! - Wind barbs
//! - Overlay compositing onto a straight-alpha fill

pub mod barbs;
pub mod canvas;
pub mod color;
pub mod colormap;
pub mod contour;
pub mod error;
pub mod png;

pub use barbs::{draw_barbs, Barb, BarbStyle};
pub use canvas::OverlayCanvas;
pub use color::{parse_color, Rgba};
pub use colormap::{colorize, ramp, value_to_index, Ramp};
pub use contour::{contour_levels, draw_contours, ContourStyle};
pub use error::{RenderError, Result};
pub use png::encode_png;
