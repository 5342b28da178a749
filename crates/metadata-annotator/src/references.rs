//! Variable references carried in attributes.
//!
//! `grid_mapping` and `ancillary_variables` name other variables, either
//! by absolute path or relative to the referring variable's group. The CF
//! extended `grid_mapping` form (`crs: lat lon crs_2: x y`) names the grid
//! mapping variables in its `name:` tokens.

use std::collections::BTreeSet;

use netcdf_tree::{path, AttributeStore, Tree};

use crate::attributes::ScratchAttributes;
use crate::config::temporary;

/// Attributes whose values name other variables.
pub const REFERENCE_ATTRIBUTES: [&str; 2] = ["grid_mapping", "ancillary_variables"];

/// Variable names in a reference attribute value.
pub fn reference_tokens(value: &str) -> Vec<&str> {
    if value.contains(':') {
        value
            .split_whitespace()
            .filter_map(|token| token.strip_suffix(':'))
            .filter(|name| !name.is_empty())
            .collect()
    } else {
        value.split_whitespace().collect()
    }
}

/// Resolve a reference made by the node at `referrer_path`.
///
/// Relative names are tried in the referrer's group and then each ancestor
/// group. When no candidate exists the path in the referrer's own group is
/// returned.
pub fn resolve_reference(tree: &Tree, referrer_path: &str, reference: &str) -> String {
    if reference.starts_with('/') {
        return reference.to_string();
    }

    let group = path::parent(referrer_path);
    path::ancestors(group)
        .into_iter()
        .map(|candidate| path::join(candidate, reference))
        .find(|candidate| tree.contains(candidate))
        .unwrap_or_else(|| path::join(group, reference))
}

/// Every path referenced by a variable, including grid mapping references
/// held as temporary attributes.
pub fn referenced_paths(tree: &Tree, scratch: &ScratchAttributes) -> BTreeSet<String> {
    let mut referenced = BTreeSet::new();

    for variable_path in tree.variable_paths() {
        let Some(node) = tree.node(variable_path) else {
            continue;
        };
        for attribute in REFERENCE_ATTRIBUTES {
            if let Some(value) = node.attribute(attribute).and_then(|v| v.as_str()) {
                for token in reference_tokens(value) {
                    referenced.insert(resolve_reference(tree, variable_path, token));
                }
            }
        }
    }

    for (referrer_path, value) in scratch.paths_with(temporary::GRID_MAPPING) {
        if let Some(value) = value.as_str() {
            for token in reference_tokens(value) {
                referenced.insert(resolve_reference(tree, referrer_path, token));
            }
        }
    }

    referenced
}

#[cfg(test)]
mod tests {
    use super::*;
    use netcdf_tree::{AttributeValue, DataType};

    fn tree_with_crs() -> Tree {
        let mut tree = Tree::new();
        tree.add_variable("/crs", &[], DataType::Int32, vec![]).unwrap();
        tree.add_group("/grid").unwrap();
        tree.add_group("/grid/inner").unwrap();
        tree.add_variable("/grid/inner/data", &[], DataType::Float32, vec![])
            .unwrap();
        tree
    }

    #[test]
    fn test_reference_tokens() {
        assert_eq!(reference_tokens("crs"), vec!["crs"]);
        assert_eq!(reference_tokens("/a/flag  /a/quality"), vec!["/a/flag", "/a/quality"]);
        assert_eq!(
            reference_tokens("crs: lat lon crs_2: x y"),
            vec!["crs", "crs_2"]
        );
        assert!(reference_tokens("   ").is_empty());
    }

    #[test]
    fn test_relative_reference_walks_ancestors() {
        let tree = tree_with_crs();
        assert_eq!(resolve_reference(&tree, "/grid/inner/data", "crs"), "/crs");
    }

    #[test]
    fn test_unresolved_reference_uses_own_group() {
        let tree = tree_with_crs();
        assert_eq!(
            resolve_reference(&tree, "/grid/inner/data", "missing"),
            "/grid/inner/missing"
        );
        assert_eq!(resolve_reference(&tree, "/grid/inner/data", "/abs/crs"), "/abs/crs");
    }

    #[test]
    fn test_referenced_paths_include_scratch_grid_mappings() {
        let mut tree = tree_with_crs();
        tree.node_mut("/grid/inner/data")
            .unwrap()
            .set_attribute("ancillary_variables", AttributeValue::from("quality"));

        let mut scratch = ScratchAttributes::default();
        scratch.set(
            "/grid/inner/data",
            temporary::GRID_MAPPING,
            AttributeValue::from("/projection"),
        );

        let referenced = referenced_paths(&tree, &scratch);
        let referenced: Vec<&str> = referenced.iter().map(String::as_str).collect();
        assert_eq!(referenced, vec!["/grid/inner/quality", "/projection"]);
    }
}
