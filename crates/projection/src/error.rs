//! Error types for geotransform operations.

use thiserror::Error;

/// Result type for projection operations.
pub type ProjectionResult<T> = Result<T, ProjectionError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProjectionError {
    /// Spatial dimension type is not "x" or "y"
    #[error("Invalid spatial dimension type: \"{0}\"")]
    InvalidSpatialDimensionType(String),

    /// Geotransform coefficients are malformed
    #[error("Invalid geotransform: {0}")]
    InvalidGeotransform(String),

    /// Start index plus size does not fit in a grid index
    #[error("Index range starting at {start} with {size} cells is out of range")]
    IndexOutOfRange { start: usize, size: usize },
}
