//! Rule-driven metadata annotation of hierarchical granules.
//!
//! Rewrites group and variable attributes of a NetCDF-4/HDF5 style granule
//! from a per-collection set of override rules, and rebuilds the coordinate
//! values of spatial dimensions for granules that were subset upstream.
//!
//! # Pipeline
//!
//! 1. Match rule patterns against every group and variable path
//! 2. Apply attribute edits and rename pseudo-dimensions
//! 3. Create missing dimension variables and referenced variables
//! 4. Recover subset start indices and compute `x`/`y` scales from the
//!    grid mapping's geotransform
//! 5. Append a line to the global history
//!
//! A collection without rules is copied through unchanged.

pub mod annotate;
pub mod attributes;
pub mod config;
pub mod dimensions;
pub mod error;
pub mod history;
pub mod provenance;
pub mod references;
pub mod rules;
pub mod spatial;
pub mod subset;
pub mod synthesize;

// Re-exports
pub use annotate::{annotate_granule, annotate_tree, Annotation, AnnotationState, GranuleOutcome};
pub use attributes::{apply_edits, ScratchAttributes};
pub use config::{
    is_temporary, temporary, AttributeEdit, OverrideRule, RuleConfig, HISTORY_SUBSET_INDEX_RANGES,
    TEMPORARY_PREFIX,
};
pub use dimensions::rename_pseudo_dimensions;
pub use error::{AnnotatorError, Result};
pub use history::{update_history, PROGRAM, VERSION};
pub use provenance::{index_range_substring, parse_index_ranges, IndexRanges};
pub use rules::{is_exact_path, MatchSet, RuleSet};
pub use subset::{get_dimension_index_map, subset_start_index, SubsetIndexMap};
pub use synthesize::{create_dimension_variable, create_variable};
