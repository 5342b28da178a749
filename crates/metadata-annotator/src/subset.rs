//! Recovering the start index of subsetted spatial dimensions.
//!
//! A dimension variable selects one of two strategies through temporary
//! attributes:
//!
//! - `_*subset_index_reference` names a variable of original row or column
//!   indices; its first element is the start index.
//! - `_*corner_point_offsets = "history_subset_index_ranges"` reads the
//!   start index from the subset request in the global history.
//!
//! When both are configured the index reference is used.

use std::collections::BTreeMap;

use netcdf_tree::{path, Tree};
use tracing::debug;

use crate::attributes::{lookup, lookup_str, ScratchAttributes};
use crate::config::{temporary, HISTORY_SUBSET_INDEX_RANGES};
use crate::error::{AnnotatorError, Result};
use crate::history::read_history;
use crate::provenance::{parse_index_ranges, IndexRanges};
use crate::references::resolve_reference;

/// Start index keyed by dimension path.
pub type SubsetIndexMap = BTreeMap<String, usize>;

/// Variables grouped by the ordered dimension paths they span.
pub type VariableDimensionMap = BTreeMap<Vec<String>, Vec<String>>;

/// Start index strategy configured on a dimension variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartIndexStrategy {
    /// Path of the index-reference variable
    IndexReference(String),
    HistoryRanges,
}

/// The strategy configured for a dimension variable.
pub fn start_index_strategy(
    tree: &Tree,
    scratch: &ScratchAttributes,
    dimension_path: &str,
) -> Result<StartIndexStrategy> {
    if let Some(reference) =
        lookup_str(tree, scratch, dimension_path, temporary::SUBSET_INDEX_REFERENCE)
    {
        return Ok(StartIndexStrategy::IndexReference(resolve_reference(
            tree,
            dimension_path,
            reference,
        )));
    }

    match lookup(tree, scratch, dimension_path, temporary::CORNER_POINT_OFFSETS) {
        Some(value) if value.as_str() == Some(HISTORY_SUBSET_INDEX_RANGES) => {
            Ok(StartIndexStrategy::HistoryRanges)
        }
        Some(value) => Err(AnnotatorError::InvalidDimensionAttribute {
            path: dimension_path.to_string(),
            attribute: temporary::CORNER_POINT_OFFSETS.to_string(),
            value: value.to_string(),
        }),
        None => Err(AnnotatorError::MissingStartIndexConfiguration(
            dimension_path.to_string(),
        )),
    }
}

fn uses_history_ranges(tree: &Tree, scratch: &ScratchAttributes, dimension_path: &str) -> bool {
    lookup_str(tree, scratch, dimension_path, temporary::CORNER_POINT_OFFSETS)
        == Some(HISTORY_SUBSET_INDEX_RANGES)
}

/// Group variables by the dimension paths they span.
///
/// Only variables spanning every dimension used in their group are kept, so
/// each signature lists the group's dimensions in the variable's order.
pub fn variable_dimension_map<'a, I>(tree: &Tree, variables: I) -> VariableDimensionMap
where
    I: IntoIterator<Item = &'a str>,
{
    let mut map = VariableDimensionMap::new();

    for variable_path in variables {
        let Some(data) = tree.variable(variable_path) else {
            continue;
        };
        let group_dimensions = tree.group_dimension_names(path::parent(variable_path));
        if data.rank() == 0 || data.rank() != group_dimensions.len() {
            continue;
        }

        map.entry(tree.dimension_paths(variable_path))
            .or_default()
            .push(variable_path.to_string());
    }
    map
}

/// Combine grouped variables with parsed index ranges.
///
/// For each signature, the first variable with a recorded range supplies
/// the start index of every dimension in the signature, position by
/// position.
pub fn compose_index_map(
    variable_dimensions: &VariableDimensionMap,
    ranges: &IndexRanges,
) -> SubsetIndexMap {
    let mut index_map = SubsetIndexMap::new();

    for (dimensions, variables) in variable_dimensions {
        let Some(starts) = variables.iter().find_map(|variable| ranges.get(variable)) else {
            continue;
        };
        for (dimension, start) in dimensions.iter().zip(starts) {
            index_map.insert(dimension.clone(), *start);
        }
    }
    index_map
}

/// Build the start index map for the requested dimension variables.
///
/// Returns an empty map when none of them reads from history.
pub fn get_dimension_index_map(
    tree: &Tree,
    scratch: &ScratchAttributes,
    dimension_variables: &[String],
) -> Result<SubsetIndexMap> {
    if let Some(missing) = dimension_variables
        .iter()
        .find(|dimension| !tree.is_variable(dimension))
    {
        return Err(AnnotatorError::MissingDimensionVariable(missing.clone()));
    }

    if !dimension_variables
        .iter()
        .any(|dimension| uses_history_ranges(tree, scratch, dimension))
    {
        return Ok(SubsetIndexMap::new());
    }

    let (_, history) = read_history(tree);
    let ranges = history
        .as_deref()
        .map(parse_index_ranges)
        .unwrap_or_default();

    let variable_dimensions = variable_dimension_map(tree, tree.variable_paths());
    let index_map = compose_index_map(&variable_dimensions, &ranges);

    debug!(
        ranges = ranges.len(),
        dimensions = index_map.len(),
        "Resolved subset index ranges from history"
    );
    Ok(index_map)
}

/// Start index of one dimension from a built index map; absent means 0.
pub fn subset_start_index_for_dimension(index_map: &SubsetIndexMap, dimension_path: &str) -> usize {
    index_map.get(dimension_path).copied().unwrap_or(0)
}

/// Resolve the start index of a spatial dimension variable.
pub fn subset_start_index(
    tree: &Tree,
    scratch: &ScratchAttributes,
    dimension_path: &str,
    index_map: &SubsetIndexMap,
) -> Result<usize> {
    match start_index_strategy(tree, scratch, dimension_path)? {
        StartIndexStrategy::IndexReference(reference) => {
            index_reference_start(tree, dimension_path, &reference)
        }
        StartIndexStrategy::HistoryRanges => {
            Ok(subset_start_index_for_dimension(index_map, dimension_path))
        }
    }
}

/// First element of an index-reference variable, i.e. the value at (0, 0)
/// of its trailing two axes.
fn index_reference_start(tree: &Tree, dimension_path: &str, reference: &str) -> Result<usize> {
    let data = tree.variable(reference).ok_or_else(|| {
        AnnotatorError::MissingSubsetIndexReference {
            path: dimension_path.to_string(),
            reference: reference.to_string(),
        }
    })?;

    let shape = tree.variable_shape(reference)?;
    let first = match data.values.first() {
        Some(first) if shape.len() >= 2 => *first,
        _ => {
            return Err(AnnotatorError::InvalidSubsetIndexShape {
                path: reference.to_string(),
                shape,
            })
        }
    };

    if !(first.is_finite() && first >= 0.0 && first < usize::MAX as f64) {
        return Err(AnnotatorError::InvalidDimensionAttribute {
            path: reference.to_string(),
            attribute: "values".to_string(),
            value: first.to_string(),
        });
    }
    Ok(first as usize)
}
