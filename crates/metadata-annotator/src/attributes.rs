//! Applying attribute edits to nodes.
//!
//! Temporary attributes (names starting with `_*`) never reach a node.
//! They are kept in [`ScratchAttributes`], keyed by node path, for the
//! later annotation steps that read engine configuration.

use std::collections::BTreeMap;

use netcdf_tree::{AttributeStore, AttributeValue, Tree};

use crate::config::{is_temporary, AttributeEdit};

/// Temporary attribute values keyed by node path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScratchAttributes {
    by_path: BTreeMap<String, BTreeMap<String, AttributeValue>>,
}

impl ScratchAttributes {
    pub fn get(&self, node_path: &str, name: &str) -> Option<&AttributeValue> {
        self.by_path.get(node_path)?.get(name)
    }

    pub fn set(&mut self, node_path: &str, name: &str, value: AttributeValue) {
        self.by_path
            .entry(node_path.to_string())
            .or_default()
            .insert(name.to_string(), value);
    }

    pub fn remove(&mut self, node_path: &str, name: &str) -> Option<AttributeValue> {
        self.by_path.get_mut(node_path)?.remove(name)
    }

    /// Every node path holding a value for `name`.
    pub fn paths_with<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a AttributeValue)> + 'a {
        self.by_path
            .iter()
            .filter_map(move |(node_path, values)| Some((node_path.as_str(), values.get(name)?)))
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.values().all(BTreeMap::is_empty)
    }
}

/// Apply edits to one node.
///
/// Set edits overwrite, delete edits remove the attribute when present.
/// Temporary names are redirected to `scratch` under `node_path`.
pub fn apply_edits<S: AttributeStore>(
    node: &mut S,
    node_path: &str,
    edits: &BTreeMap<String, AttributeEdit>,
    scratch: &mut ScratchAttributes,
) {
    for (name, edit) in edits {
        match (is_temporary(name), edit) {
            (true, AttributeEdit::Set(value)) => scratch.set(node_path, name, value.clone()),
            (true, AttributeEdit::Delete) => {
                scratch.remove(node_path, name);
            }
            (false, AttributeEdit::Set(value)) => node.set_attribute(name, value.clone()),
            (false, AttributeEdit::Delete) => {
                node.delete_attribute(name);
            }
        }
    }
}

/// Look up an attribute, reading temporary names from `scratch`.
pub fn lookup<'a>(
    tree: &'a Tree,
    scratch: &'a ScratchAttributes,
    node_path: &str,
    name: &str,
) -> Option<&'a AttributeValue> {
    if is_temporary(name) {
        scratch.get(node_path, name)
    } else {
        tree.node(node_path)?.attribute(name)
    }
}

/// Text value of an attribute, if present and textual.
pub fn lookup_str<'a>(
    tree: &'a Tree,
    scratch: &'a ScratchAttributes,
    node_path: &str,
    name: &str,
) -> Option<&'a str> {
    lookup(tree, scratch, node_path, name).and_then(AttributeValue::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::temporary;

    fn edits(entries: &[(&str, Option<&str>)]) -> BTreeMap<String, AttributeEdit> {
        entries
            .iter()
            .map(|(name, value)| {
                let edit = match value {
                    Some(value) => AttributeEdit::Set(AttributeValue::from(*value)),
                    None => AttributeEdit::Delete,
                };
                (name.to_string(), edit)
            })
            .collect()
    }

    #[test]
    fn test_set_update_and_delete() {
        let mut tree = test_utils::sample_granule();
        let mut scratch = ScratchAttributes::default();
        let node = tree.root_mut();

        apply_edits(
            node,
            "/",
            &edits(&[
                ("update", Some("corrected")),
                ("addition", Some("new")),
                ("delete", None),
            ]),
            &mut scratch,
        );

        assert_eq!(node.attribute("update"), Some(&AttributeValue::from("corrected")));
        assert_eq!(node.attribute("addition"), Some(&AttributeValue::from("new")));
        assert!(!node.has_attribute("delete"));
        assert_eq!(node.attribute("short_name"), Some(&AttributeValue::from("TEST01")));
    }

    #[test]
    fn test_deleting_absent_attribute_is_noop() {
        let mut tree = test_utils::sample_granule();
        let mut scratch = ScratchAttributes::default();
        let before = tree.clone();

        let node = tree.node_mut("/variable_three").unwrap();
        apply_edits(node, "/variable_three", &edits(&[("missing_attr", None)]), &mut scratch);

        assert_eq!(tree, before);
    }

    #[test]
    fn test_temporary_attributes_never_reach_the_node() {
        let mut tree = test_utils::sample_granule();
        let mut scratch = ScratchAttributes::default();

        let node = tree.node_mut("/variable_one").unwrap();
        apply_edits(
            node,
            "/variable_one",
            &edits(&[
                (temporary::SUBSET_INDEX_REFERENCE, Some("column_index")),
                ("units", Some("m")),
            ]),
            &mut scratch,
        );

        assert!(!node.has_attribute(temporary::SUBSET_INDEX_REFERENCE));
        assert_eq!(
            lookup_str(&tree, &scratch, "/variable_one", temporary::SUBSET_INDEX_REFERENCE),
            Some("column_index")
        );
        assert_eq!(lookup_str(&tree, &scratch, "/variable_one", "units"), Some("m"));
    }

    #[test]
    fn test_scratch_delete_and_listing() {
        let mut scratch = ScratchAttributes::default();
        scratch.set("/x", temporary::GRID_MAPPING, AttributeValue::from("crs"));
        scratch.set("/y", temporary::GRID_MAPPING, AttributeValue::from("crs"));
        scratch.set("/y", temporary::DIMENSION_VALUE_DTYPE, AttributeValue::from("f4"));

        let paths: Vec<&str> = scratch
            .paths_with(temporary::GRID_MAPPING)
            .map(|(path, _)| path)
            .collect();
        assert_eq!(paths, vec!["/x", "/y"]);

        let mut tree = Tree::new();
        tree.add_variable("/x", &[], netcdf_tree::DataType::Int8, vec![]).unwrap();
        let node = tree.node_mut("/x").unwrap();
        apply_edits(node, "/x", &edits(&[(temporary::GRID_MAPPING, None)]), &mut scratch);

        assert!(scratch.get("/x", temporary::GRID_MAPPING).is_none());
        assert!(!scratch.is_empty());
    }
}
