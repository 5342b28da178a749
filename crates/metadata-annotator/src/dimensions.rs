//! Renaming positional pseudo-dimensions to semantic names.

use netcdf_tree::{path, AttributeStore, AttributeValue, Tree};
use tracing::debug;

use crate::error::{AnnotatorError, Result};

/// Attribute listing a variable's semantic dimension names.
pub const DIMENSIONS_ATTRIBUTE: &str = "dimensions";

/// Semantic dimension names configured on a variable, in order.
///
/// Entries may be bare names or paths; only the basename is used.
pub fn configured_dimensions(tree: &Tree, variable_path: &str) -> Vec<String> {
    tree.node(variable_path)
        .and_then(|node| node.attribute(DIMENSIONS_ATTRIBUTE))
        .map(|value| match value {
            AttributeValue::Texts(names) => names.iter().flat_map(|n| split_names(n)).collect(),
            other => split_names(&other.to_string()),
        })
        .unwrap_or_default()
}

fn split_names(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|token| path::basename(token).to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

/// Rename a variable's dimensions to those in its `dimensions` attribute.
///
/// Does nothing when the attribute is absent or empty. Otherwise the
/// number of configured names must equal the variable's rank. Replaced
/// dimensions that no variable uses any more are removed.
pub fn rename_pseudo_dimensions(tree: &mut Tree, variable_path: &str) -> Result<()> {
    let names = configured_dimensions(tree, variable_path);
    if names.is_empty() {
        return Ok(());
    }

    let rank = tree
        .variable(variable_path)
        .map(|data| data.rank())
        .ok_or_else(|| AnnotatorError::MissingDimensionVariable(variable_path.to_string()))?;

    if names.len() != rank {
        return Err(AnnotatorError::InvalidDimensionsConfiguration {
            path: variable_path.to_string(),
            rank,
            configured: names.len(),
        });
    }

    let replaced = tree.dimension_paths(variable_path);
    for (index, name) in names.iter().enumerate() {
        tree.rename_variable_dimension(variable_path, index, name)?;
    }

    for dimension_path in &replaced {
        let (owner, name) = (path::parent(dimension_path), path::basename(dimension_path));
        if tree.remove_unused_dimension(owner, name) {
            debug!(dimension = %dimension_path, "Removed unused dimension");
        }
    }

    debug!(variable = variable_path, dimensions = ?names, "Renamed pseudo-dimensions");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use netcdf_tree::DataType;
    use test_utils::{spl3ftp_granule, SPL3FTP_GROUP};

    fn surface_flag() -> String {
        format!("{}/surface_flag", SPL3FTP_GROUP)
    }

    fn configure(tree: &mut Tree, variable_path: &str, value: &str) {
        tree.node_mut(variable_path)
            .unwrap()
            .set_attribute(DIMENSIONS_ATTRIBUTE, AttributeValue::from(value));
    }

    #[test]
    fn test_rename_to_semantic_names() {
        let mut tree = spl3ftp_granule();
        configure(&mut tree, &surface_flag(), "am_pm y x");

        rename_pseudo_dimensions(&mut tree, &surface_flag()).unwrap();

        let data = tree.variable(&surface_flag()).unwrap();
        assert_eq!(data.dimensions, vec!["am_pm", "y", "x"]);
        assert_eq!(tree.variable_shape(&surface_flag()).unwrap(), vec![2, 29, 52]);
    }

    #[test]
    fn test_replaced_dimensions_are_removed_once_unused() {
        let mut tree = spl3ftp_granule();
        configure(&mut tree, &surface_flag(), "am_pm y x");
        rename_pseudo_dimensions(&mut tree, &surface_flag()).unwrap();

        // Other variables still span the positional dimensions.
        assert_eq!(tree.dimension_len(SPL3FTP_GROUP, "dim0"), Some(2));

        let variables: Vec<String> = tree
            .child_variables(SPL3FTP_GROUP)
            .into_iter()
            .map(str::to_string)
            .collect();
        for variable in &variables {
            let rank = tree.variable(variable).unwrap().rank();
            let names = if rank == 3 { "am_pm y x" } else { "y x" };
            configure(&mut tree, variable, names);
            rename_pseudo_dimensions(&mut tree, variable).unwrap();
        }

        let declared: Vec<&String> = tree.declared_dimensions(SPL3FTP_GROUP).unwrap().keys().collect();
        assert_eq!(declared, vec!["am_pm", "x", "y"]);
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn test_configured_paths_use_basenames() {
        let mut tree = spl3ftp_granule();
        configure(
            &mut tree,
            &surface_flag(),
            "/Freeze_Thaw_Retrieval_Data_Global/am_pm y /Freeze_Thaw_Retrieval_Data_Global/x",
        );

        assert_eq!(configured_dimensions(&tree, &surface_flag()), vec!["am_pm", "y", "x"]);
    }

    #[test]
    fn test_arity_mismatch_reports_both_counts() {
        let mut tree = spl3ftp_granule();
        configure(&mut tree, &surface_flag(), "y x");

        let result = rename_pseudo_dimensions(&mut tree, &surface_flag());
        assert!(matches!(
            result,
            Err(AnnotatorError::InvalidDimensionsConfiguration {
                rank: 3,
                configured: 2,
                ..
            })
        ));
    }

    #[test]
    fn test_no_attribute_is_noop() {
        let mut tree = spl3ftp_granule();
        let before = tree.clone();
        rename_pseudo_dimensions(&mut tree, &surface_flag()).unwrap();
        assert_eq!(tree, before);
    }

    #[test]
    fn test_renaming_twice_is_idempotent() {
        let mut tree = Tree::new();
        tree.add_dimension("/", "dim0", 4).unwrap();
        tree.add_variable("/v", &["dim0"], DataType::Float32, vec![]).unwrap();
        configure(&mut tree, "/v", "x");

        rename_pseudo_dimensions(&mut tree, "/v").unwrap();
        let once = tree.clone();
        rename_pseudo_dimensions(&mut tree, "/v").unwrap();

        assert_eq!(tree, once);
        assert_eq!(tree.dimension_len("/", "x"), Some(4));
    }
}
