//! Creating variables that rules configure but the granule lacks.

use std::collections::{BTreeMap, BTreeSet};

use netcdf_tree::{path, AttributeValue, DataType, Tree};
use tracing::debug;

use crate::attributes::{apply_edits, lookup, ScratchAttributes};
use crate::config::{temporary, AttributeEdit};
use crate::error::{AnnotatorError, Result};

/// How a missing exact path should be handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissingVariable {
    /// Names a dimension used in its parent group.
    Dimension { dimension: String, len: usize },
    /// Referenced by another variable's reference attribute.
    Referenced,
    /// Neither; never created.
    Unreferenced,
}

/// Classify a missing path against the current tree and references.
pub fn classify_missing(
    tree: &Tree,
    variable_path: &str,
    references: &BTreeSet<String>,
) -> MissingVariable {
    let (group, name) = path::split(variable_path);

    if tree.is_group(group) && !name.is_empty() {
        let declared_here = tree
            .declared_dimensions(group)
            .is_some_and(|dims| dims.contains_key(name));
        let used_here = tree.group_dimension_names(group).iter().any(|d| d == name);

        if declared_here || used_here {
            if let Some(len) = tree.dimension_len(group, name) {
                return MissingVariable::Dimension {
                    dimension: name.to_string(),
                    len,
                };
            }
        }
    }

    if references.contains(variable_path) {
        MissingVariable::Referenced
    } else {
        MissingVariable::Unreferenced
    }
}

/// Create an attribute-only variable and apply its edits.
pub fn create_variable(
    tree: &mut Tree,
    variable_path: &str,
    edits: &BTreeMap<String, AttributeEdit>,
    scratch: &mut ScratchAttributes,
) -> Result<()> {
    tree.add_variable(variable_path, &[], DataType::Char, Vec::new())?;
    if let Some(node) = tree.node_mut(variable_path) {
        apply_edits(node, variable_path, edits, scratch);
    }
    debug!(variable = variable_path, "Created referenced variable");
    Ok(())
}

/// Create a 1-D dimension variable and apply its edits.
///
/// Values are the placeholder index scale `0..len`, stored in the type named
/// by `_*dimension_value_dtype` or `float64`.
pub fn create_dimension_variable(
    tree: &mut Tree,
    variable_path: &str,
    dimension: &str,
    len: usize,
    edits: &BTreeMap<String, AttributeEdit>,
    scratch: &mut ScratchAttributes,
) -> Result<()> {
    tree.add_variable(variable_path, &[dimension], DataType::Float64, Vec::new())?;
    if let Some(node) = tree.node_mut(variable_path) {
        apply_edits(node, variable_path, edits, scratch);
    }

    let dtype = configured_dtype(tree, scratch, variable_path)?.unwrap_or(DataType::Float64);
    let values = (0..len).map(|index| dtype.coerce(index as f64)).collect();
    tree.set_variable_values(variable_path, dtype, values)?;

    debug!(
        variable = variable_path,
        dimension,
        len,
        dtype = %dtype,
        "Created dimension variable"
    );
    Ok(())
}

/// Dtype configured by `_*dimension_value_dtype`, if any.
pub fn configured_dtype(
    tree: &Tree,
    scratch: &ScratchAttributes,
    variable_path: &str,
) -> Result<Option<DataType>> {
    let Some(value) = lookup(tree, scratch, variable_path, temporary::DIMENSION_VALUE_DTYPE)
    else {
        return Ok(None);
    };

    value
        .as_str()
        .and_then(DataType::from_name)
        .filter(DataType::is_numeric)
        .map(Some)
        .ok_or_else(|| invalid_dtype(variable_path, value))
}

fn invalid_dtype(variable_path: &str, value: &AttributeValue) -> AnnotatorError {
    AnnotatorError::InvalidDimensionAttribute {
        path: variable_path.to_string(),
        attribute: temporary::DIMENSION_VALUE_DTYPE.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netcdf_tree::AttributeStore;
    use test_utils::index_reference_granule;

    fn edits(entries: &[(&str, &str)]) -> BTreeMap<String, AttributeEdit> {
        entries
            .iter()
            .map(|(name, value)| {
                (
                    name.to_string(),
                    AttributeEdit::Set(AttributeValue::from(*value)),
                )
            })
            .collect()
    }

    #[test]
    fn test_classify_missing() {
        let tree = index_reference_granule();
        let references: BTreeSet<String> = ["/crs".to_string()].into_iter().collect();

        assert_eq!(
            classify_missing(&tree, "/x", &references),
            MissingVariable::Dimension {
                dimension: "x".to_string(),
                len: 3
            }
        );
        assert_eq!(classify_missing(&tree, "/crs", &references), MissingVariable::Referenced);
        assert_eq!(
            classify_missing(&tree, "/typo_variable", &references),
            MissingVariable::Unreferenced
        );
        assert_eq!(
            classify_missing(&tree, "/no_group/x", &references),
            MissingVariable::Unreferenced
        );
    }

    #[test]
    fn test_create_variable_is_attribute_only() {
        let mut tree = Tree::new();
        let mut scratch = ScratchAttributes::default();

        create_variable(
            &mut tree,
            "/crs",
            &edits(&[
                ("grid_mapping_name", "lambert_azimuthal_equal_area"),
                (temporary::GEOTRANSFORM, "ignored here"),
            ]),
            &mut scratch,
        )
        .unwrap();

        let node = tree.node("/crs").unwrap();
        let data = node.as_variable().unwrap();
        assert_eq!(data.rank(), 0);
        assert!(data.values.is_empty());
        assert!(node.has_attribute("grid_mapping_name"));
        assert!(!node.has_attribute(temporary::GEOTRANSFORM));
        assert!(scratch.get("/crs", temporary::GEOTRANSFORM).is_some());
    }

    #[test]
    fn test_create_dimension_variable_uses_configured_dtype() {
        let mut tree = index_reference_granule();
        let mut scratch = ScratchAttributes::default();

        create_dimension_variable(
            &mut tree,
            "/y",
            "y",
            3,
            &edits(&[
                ("units", "m"),
                (temporary::DIMENSION_VALUE_DTYPE, "int16"),
            ]),
            &mut scratch,
        )
        .unwrap();

        let data = tree.variable("/y").unwrap();
        assert_eq!(data.dimensions, vec!["y"]);
        assert_eq!(data.dtype, DataType::Int16);
        assert_eq!(data.values, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_create_dimension_variable_defaults_to_float64() {
        let mut tree = index_reference_granule();
        let mut scratch = ScratchAttributes::default();

        create_dimension_variable(&mut tree, "/x", "x", 3, &BTreeMap::new(), &mut scratch)
            .unwrap();
        assert_eq!(tree.variable("/x").unwrap().dtype, DataType::Float64);
    }

    #[test]
    fn test_unknown_dtype_is_invalid_attribute() {
        let mut tree = index_reference_granule();
        let mut scratch = ScratchAttributes::default();

        let result = create_dimension_variable(
            &mut tree,
            "/x",
            "x",
            3,
            &edits(&[(temporary::DIMENSION_VALUE_DTYPE, "quaternion")]),
            &mut scratch,
        );
        assert!(matches!(
            result,
            Err(AnnotatorError::InvalidDimensionAttribute { ref value, .. }) if value == "quaternion"
        ));
    }
}
