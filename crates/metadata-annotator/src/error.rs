//! Error types for the metadata-annotator crate.

use netcdf_tree::TreeError;
use projection::ProjectionError;
use thiserror::Error;

/// Errors that abort annotation of a granule.
#[derive(Error, Debug)]
pub enum AnnotatorError {
    #[error("Missing attribute \"{attribute}\" on {path}")]
    MissingDimensionAttribute { path: String, attribute: String },

    #[error("Invalid value \"{value}\" for attribute \"{attribute}\" on {path}")]
    InvalidDimensionAttribute {
        path: String,
        attribute: String,
        value: String,
    },

    #[error("Grid mapping variable \"{reference}\" referred to by {path} does not exist")]
    InvalidGridMappingReference { path: String, reference: String },

    #[error("Subset index reference \"{reference}\" referred to by {path} does not exist")]
    MissingSubsetIndexReference { path: String, reference: String },

    #[error("Subset index reference {path} has shape {shape:?}, need at least 2 non-empty dimensions")]
    InvalidSubsetIndexShape { path: String, shape: Vec<usize> },

    #[error("No subset start index configuration for dimension {0}")]
    MissingStartIndexConfiguration(String),

    #[error("{path} has {rank} dimensions but {configured} were configured")]
    InvalidDimensionsConfiguration {
        path: String,
        rank: usize,
        configured: usize,
    },

    #[error("Dimension variable {0} does not exist")]
    MissingDimensionVariable(String),

    #[error("Invalid rule pattern \"{pattern}\": {source}")]
    InvalidRulePattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Geotransform failures, including `InvalidSpatialDimensionType`.
    #[error(transparent)]
    Projection(#[from] ProjectionError),

    #[error("Tree error: {0}")]
    Tree(#[from] TreeError),

    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for annotation operations.
pub type Result<T> = std::result::Result<T, AnnotatorError>;
