//! Error types for tree operations and file engines.

use thiserror::Error;

/// Result type for tree operations.
pub type TreeResult<T> = Result<T, TreeError>;

/// Error types for building, loading and saving trees.
#[derive(Error, Debug)]
pub enum TreeError {
    /// File I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Snapshot (de)serialization error
    #[error("JSON snapshot error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Path is not absolute or contains empty segments
    #[error("Invalid node path: {0}")]
    InvalidPath(String),

    /// A node was expected at this path
    #[error("No node at path: {0}")]
    MissingNode(String),

    /// Node exists but is of the wrong kind (group vs variable)
    #[error("Node at {path} is not a {expected}")]
    WrongNodeKind { path: String, expected: &'static str },

    /// A node already exists at this path
    #[error("Node already exists: {0}")]
    DuplicatePath(String),

    /// A variable refers to a dimension that no enclosing group declares
    #[error("Dimension '{dimension}' of {variable} is not declared in any enclosing group")]
    UndeclaredDimension { variable: String, dimension: String },

    /// Variable values do not fit the declared shape
    #[error("Variable {path} has {actual} values but its shape holds {expected}")]
    ShapeMismatch {
        path: String,
        expected: usize,
        actual: usize,
    },

    /// Invalid data format
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    /// No engine is available for the file type
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// Error from the native NetCDF library
    #[cfg(feature = "netcdf")]
    #[error("NetCDF error: {0}")]
    NetCdf(#[from] netcdf::Error),
}
