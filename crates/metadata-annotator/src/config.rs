//! Override rule configuration.
//!
//! Rules are grouped by collection short name. Each rule pairs a path
//! pattern with the attribute edits to apply to every matching group or
//! variable:
//!
//! ```json
//! {
//!   "SPL3FTP": [
//!     {"pattern": "/Freeze_Thaw_Retrieval_Data_Global/x",
//!      "attributes": {"standard_name": "projection_x_coordinate", "comment": null}}
//!   ]
//! }
//! ```
//!
//! A `null` value deletes the attribute. Attribute names starting with
//! [`TEMPORARY_PREFIX`] carry engine configuration and are never written to
//! the output.

use std::collections::BTreeMap;
use std::path::Path;

use netcdf_tree::AttributeValue;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::rules::RuleSet;

/// Prefix marking an attribute as temporary engine configuration.
pub const TEMPORARY_PREFIX: &str = "_*";

/// Names of the recognised temporary attributes.
pub mod temporary {
    /// Path of a variable holding the original row or column indices.
    pub const SUBSET_INDEX_REFERENCE: &str = "_*subset_index_reference";
    /// Start index strategy flag; see [`super::HISTORY_SUBSET_INDEX_RANGES`].
    pub const CORNER_POINT_OFFSETS: &str = "_*corner_point_offsets";
    /// Six GDAL-ordered geotransform coefficients on a grid mapping variable.
    pub const GEOTRANSFORM: &str = "_*geotransform";
    /// Numeric type of computed dimension values.
    pub const DIMENSION_VALUE_DTYPE: &str = "_*dimension_value_dtype";
    /// Grid mapping reference that is not written to the output.
    pub const GRID_MAPPING: &str = "_*grid_mapping";
}

/// `_*corner_point_offsets` value selecting the history provenance strategy.
pub const HISTORY_SUBSET_INDEX_RANGES: &str = "history_subset_index_ranges";

pub fn is_temporary(attribute_name: &str) -> bool {
    attribute_name.starts_with(TEMPORARY_PREFIX)
}

/// One configured attribute change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Option<AttributeValue>", into = "Option<AttributeValue>")]
pub enum AttributeEdit {
    /// Set or overwrite the attribute.
    Set(AttributeValue),
    /// Remove the attribute if present.
    Delete,
}

impl From<Option<AttributeValue>> for AttributeEdit {
    fn from(value: Option<AttributeValue>) -> Self {
        match value {
            Some(value) => AttributeEdit::Set(value),
            None => AttributeEdit::Delete,
        }
    }
}

impl From<AttributeEdit> for Option<AttributeValue> {
    fn from(edit: AttributeEdit) -> Self {
        match edit {
            AttributeEdit::Set(value) => Some(value),
            AttributeEdit::Delete => None,
        }
    }
}

/// A path pattern and the attribute edits for every match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideRule {
    /// Regular expression matched against the whole node path.
    pub pattern: String,

    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeEdit>,
}

impl OverrideRule {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Add an edit, builder style.
    pub fn with(mut self, attribute: &str, edit: AttributeEdit) -> Self {
        self.attributes.insert(attribute.to_string(), edit);
        self
    }
}

/// Rules for every configured collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleConfig {
    collections: BTreeMap<String, Vec<OverrideRule>>,
}

impl RuleConfig {
    /// Parse a JSON rule document.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a JSON rule document from disk.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_json(&contents)?;
        debug!(
            path = %path.display(),
            collections = config.collections.len(),
            "Loaded override rules"
        );
        Ok(config)
    }

    /// Add rules for a collection, appending to any already configured.
    pub fn insert(&mut self, short_name: &str, rules: Vec<OverrideRule>) {
        self.collections
            .entry(short_name.to_string())
            .or_default()
            .extend(rules);
    }

    pub fn collections(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }

    /// Rules configured for one collection, in configuration order.
    pub fn rules_for(&self, short_name: &str) -> &[OverrideRule] {
        self.collections
            .get(short_name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Compile the live rule set for a collection.
    pub fn rule_set(&self, short_name: &str) -> Result<RuleSet> {
        RuleSet::compile(self.rules_for(short_name))
    }
}
