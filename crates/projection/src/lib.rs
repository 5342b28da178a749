//! Coordinate reconstruction for spatially subsetted grids.
//!
//! Converts grid indices into projected coordinates with a GDAL-style
//! affine [`Geotransform`], producing the values of `x`/`y` dimension
//! variables from a subset start index and a dimension size.

pub mod error;
pub mod geotransform;

pub use error::{ProjectionError, ProjectionResult};
pub use geotransform::{compute_dimension_scale, Geotransform, SpatialAxis};
