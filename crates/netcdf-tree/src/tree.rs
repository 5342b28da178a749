//! Flat, path-keyed group/variable tree.
//!
//! Every node lives in one table keyed by its absolute path, so mutating a
//! node never requires walking a parent/child object graph. Parent/child
//! relationships are derived from the paths themselves.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{TreeError, TreeResult};
use crate::path::{self, ROOT};
use crate::types::DataType;
use crate::value::{AttributeStore, AttributeValue};

/// Group-specific data: the dimensions declared in this group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupData {
    #[serde(default)]
    pub dimensions: BTreeMap<String, usize>,
}

/// Variable-specific data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableData {
    /// Ordered dimension names (basenames, resolved through enclosing groups)
    #[serde(default)]
    pub dimensions: Vec<String>,
    pub dtype: DataType,
    /// Row-major values, or empty when no values have been written
    #[serde(default)]
    pub values: Vec<f64>,
}

impl VariableData {
    pub fn rank(&self) -> usize {
        self.dimensions.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Group(GroupData),
    Variable(VariableData),
}

/// A group or variable with its attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeValue>,
    pub kind: NodeKind,
}

impl Node {
    fn group() -> Self {
        Self {
            attributes: BTreeMap::new(),
            kind: NodeKind::Group(GroupData::default()),
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self.kind, NodeKind::Group(_))
    }

    pub fn is_variable(&self) -> bool {
        matches!(self.kind, NodeKind::Variable(_))
    }

    pub fn as_variable(&self) -> Option<&VariableData> {
        match &self.kind {
            NodeKind::Variable(data) => Some(data),
            NodeKind::Group(_) => None,
        }
    }

    pub fn as_group(&self) -> Option<&GroupData> {
        match &self.kind {
            NodeKind::Group(data) => Some(data),
            NodeKind::Variable(_) => None,
        }
    }
}

impl AttributeStore for Node {
    fn attributes(&self) -> &BTreeMap<String, AttributeValue> {
        &self.attributes
    }

    fn attributes_mut(&mut self) -> &mut BTreeMap<String, AttributeValue> {
        &mut self.attributes
    }
}

/// An in-memory hierarchical dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    nodes: BTreeMap<String, Node>,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    /// Create a tree holding only the root group.
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(ROOT.to_string(), Node::group());
        Self { nodes }
    }

    /// Check the structural invariants of a tree built from an external source.
    pub fn validate(&self) -> TreeResult<()> {
        match self.nodes.get(ROOT) {
            Some(node) if node.is_group() => {}
            _ => return Err(TreeError::MissingNode(ROOT.to_string())),
        }

        for (node_path, node) in &self.nodes {
            path::validate(node_path)?;
            if node_path == ROOT {
                continue;
            }
            self.require_group(path::parent(node_path))?;

            if let NodeKind::Variable(data) = &node.kind {
                let shape = self.resolve_shape(node_path, &data.dimensions)?;
                check_values(node_path, &shape, data.values.len())?;
            }
        }
        Ok(())
    }

    // =========================================================================
    // Construction
    // =========================================================================

    /// Add an empty group. The parent group must already exist.
    pub fn add_group(&mut self, group_path: &str) -> TreeResult<()> {
        path::validate(group_path)?;
        if self.nodes.contains_key(group_path) {
            return Err(TreeError::DuplicatePath(group_path.to_string()));
        }
        self.require_group(path::parent(group_path))?;
        self.nodes.insert(group_path.to_string(), Node::group());
        Ok(())
    }

    /// Declare a dimension in a group, replacing any previous length.
    pub fn add_dimension(&mut self, group_path: &str, name: &str, len: usize) -> TreeResult<()> {
        match self.nodes.get_mut(group_path).map(|node| &mut node.kind) {
            Some(NodeKind::Group(data)) => {
                data.dimensions.insert(name.to_string(), len);
                Ok(())
            }
            Some(NodeKind::Variable(_)) => Err(TreeError::WrongNodeKind {
                path: group_path.to_string(),
                expected: "group",
            }),
            None => Err(TreeError::MissingNode(group_path.to_string())),
        }
    }

    /// Add a variable over dimensions declared in its group or an ancestor.
    ///
    /// `values` may be empty (attribute-only variable) or must fill the shape.
    pub fn add_variable(
        &mut self,
        variable_path: &str,
        dimensions: &[&str],
        dtype: DataType,
        values: Vec<f64>,
    ) -> TreeResult<()> {
        path::validate(variable_path)?;
        if variable_path == ROOT || self.nodes.contains_key(variable_path) {
            return Err(TreeError::DuplicatePath(variable_path.to_string()));
        }
        self.require_group(path::parent(variable_path))?;

        let dimensions: Vec<String> = dimensions.iter().map(|d| d.to_string()).collect();
        let shape = self.resolve_shape(variable_path, &dimensions)?;
        check_values(variable_path, &shape, values.len())?;

        self.nodes.insert(
            variable_path.to_string(),
            Node {
                attributes: BTreeMap::new(),
                kind: NodeKind::Variable(VariableData {
                    dimensions,
                    dtype,
                    values,
                }),
            },
        );
        Ok(())
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    pub fn contains(&self, node_path: &str) -> bool {
        self.nodes.contains_key(node_path)
    }

    pub fn node(&self, node_path: &str) -> Option<&Node> {
        self.nodes.get(node_path)
    }

    pub fn node_mut(&mut self, node_path: &str) -> Option<&mut Node> {
        self.nodes.get_mut(node_path)
    }

    /// The root group, which holds the global attributes.
    pub fn root(&self) -> &Node {
        // The root is created in `new` and never removed.
        &self.nodes[ROOT]
    }

    pub fn root_mut(&mut self) -> &mut Node {
        self.nodes
            .entry(ROOT.to_string())
            .or_insert_with(Node::group)
    }

    pub fn is_group(&self, node_path: &str) -> bool {
        self.nodes.get(node_path).is_some_and(Node::is_group)
    }

    pub fn is_variable(&self, node_path: &str) -> bool {
        self.nodes.get(node_path).is_some_and(Node::is_variable)
    }

    pub fn variable(&self, variable_path: &str) -> Option<&VariableData> {
        self.nodes.get(variable_path).and_then(Node::as_variable)
    }

    /// All group paths, root first.
    pub fn group_paths(&self) -> impl Iterator<Item = &str> {
        self.nodes
            .iter()
            .filter(|(_, node)| node.is_group())
            .map(|(node_path, _)| node_path.as_str())
    }

    /// All variable paths in path order.
    pub fn variable_paths(&self) -> impl Iterator<Item = &str> {
        self.nodes
            .iter()
            .filter(|(_, node)| node.is_variable())
            .map(|(node_path, _)| node_path.as_str())
    }

    /// Direct child groups of a group.
    pub fn child_groups(&self, group_path: &str) -> Vec<&str> {
        self.children(group_path, Node::is_group)
    }

    /// Direct child variables of a group.
    pub fn child_variables(&self, group_path: &str) -> Vec<&str> {
        self.children(group_path, Node::is_variable)
    }

    fn children(&self, group_path: &str, keep: fn(&Node) -> bool) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|(node_path, node)| {
                node_path.as_str() != ROOT && path::parent(node_path) == group_path && keep(node)
            })
            .map(|(node_path, _)| node_path.as_str())
            .collect()
    }

    // =========================================================================
    // Dimensions
    // =========================================================================

    /// Dimensions declared directly in a group.
    pub fn declared_dimensions(&self, group_path: &str) -> Option<&BTreeMap<String, usize>> {
        self.nodes
            .get(group_path)
            .and_then(Node::as_group)
            .map(|data| &data.dimensions)
    }

    /// The group that declares a dimension visible from `group_path`,
    /// searching the group and then its ancestors.
    pub fn dimension_owner<'a>(&self, group_path: &'a str, name: &str) -> Option<&'a str> {
        path::ancestors(group_path).into_iter().find(|candidate| {
            self.declared_dimensions(candidate)
                .is_some_and(|dims| dims.contains_key(name))
        })
    }

    /// Length of a dimension visible from `group_path`.
    pub fn dimension_len(&self, group_path: &str, name: &str) -> Option<usize> {
        let owner = self.dimension_owner(group_path, name)?;
        self.declared_dimensions(owner)?.get(name).copied()
    }

    /// The dimension names used by a group, as the union of its direct
    /// variables' dimensions in first-seen order.
    pub fn group_dimension_names(&self, group_path: &str) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for variable_path in self.child_variables(group_path) {
            if let Some(data) = self.variable(variable_path) {
                for dimension in &data.dimensions {
                    if !names.contains(dimension) {
                        names.push(dimension.clone());
                    }
                }
            }
        }
        names
    }

    /// Absolute paths of a variable's dimensions, in order.
    ///
    /// A dimension's path is the declaring group joined with its name.
    pub fn dimension_paths(&self, variable_path: &str) -> Vec<String> {
        let group_path = path::parent(variable_path);
        self.variable(variable_path)
            .map(|data| {
                data.dimensions
                    .iter()
                    .map(|name| {
                        let owner = self.dimension_owner(group_path, name).unwrap_or(group_path);
                        path::join(owner, name)
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Shape of a variable from its dimension lengths.
    pub fn variable_shape(&self, variable_path: &str) -> TreeResult<Vec<usize>> {
        let data = self
            .variable(variable_path)
            .ok_or_else(|| TreeError::MissingNode(variable_path.to_string()))?;
        self.resolve_shape(variable_path, &data.dimensions)
    }

    /// Rename one positional dimension of a variable.
    ///
    /// When the new name is not yet visible from the variable's group it is
    /// declared there with the length of the dimension it replaces.
    pub fn rename_variable_dimension(
        &mut self,
        variable_path: &str,
        index: usize,
        new_name: &str,
    ) -> TreeResult<()> {
        let group_path = path::parent(variable_path).to_string();
        let current = self
            .variable(variable_path)
            .and_then(|data| data.dimensions.get(index))
            .cloned()
            .ok_or_else(|| TreeError::MissingNode(format!("{}[{}]", variable_path, index)))?;

        if current == new_name {
            return Ok(());
        }

        if self.dimension_owner(&group_path, new_name).is_none() {
            let len = self.dimension_len(&group_path, &current).ok_or_else(|| {
                TreeError::UndeclaredDimension {
                    variable: variable_path.to_string(),
                    dimension: current.clone(),
                }
            })?;
            self.add_dimension(&group_path, new_name, len)?;
        }

        if let Some(NodeKind::Variable(data)) =
            self.nodes.get_mut(variable_path).map(|node| &mut node.kind)
        {
            data.dimensions[index] = new_name.to_string();
        }
        Ok(())
    }

    /// Remove a dimension declared in `group_path` when no variable uses it.
    ///
    /// Returns whether the dimension was removed.
    pub fn remove_unused_dimension(&mut self, group_path: &str, name: &str) -> bool {
        let dimension_path = path::join(group_path, name);
        let in_use = self
            .variable_paths()
            .any(|variable_path| self.dimension_paths(variable_path).contains(&dimension_path));
        if in_use {
            return false;
        }

        match self.nodes.get_mut(group_path).map(|node| &mut node.kind) {
            Some(NodeKind::Group(data)) => data.dimensions.remove(name).is_some(),
            _ => false,
        }
    }

    /// Replace a variable's values and data type.
    pub fn set_variable_values(
        &mut self,
        variable_path: &str,
        dtype: DataType,
        values: Vec<f64>,
    ) -> TreeResult<()> {
        let shape = self.variable_shape(variable_path)?;
        check_values(variable_path, &shape, values.len())?;

        if let Some(NodeKind::Variable(data)) =
            self.nodes.get_mut(variable_path).map(|node| &mut node.kind)
        {
            data.dtype = dtype;
            data.values = values;
        }
        Ok(())
    }

    // =========================================================================
    // Internal helpers
    // =========================================================================

    fn require_group(&self, group_path: &str) -> TreeResult<()> {
        match self.nodes.get(group_path) {
            Some(node) if node.is_group() => Ok(()),
            Some(_) => Err(TreeError::WrongNodeKind {
                path: group_path.to_string(),
                expected: "group",
            }),
            None => Err(TreeError::MissingNode(group_path.to_string())),
        }
    }

    fn resolve_shape(&self, variable_path: &str, dimensions: &[String]) -> TreeResult<Vec<usize>> {
        let group_path = path::parent(variable_path);
        dimensions
            .iter()
            .map(|name| {
                self.dimension_len(group_path, name)
                    .ok_or_else(|| TreeError::UndeclaredDimension {
                        variable: variable_path.to_string(),
                        dimension: name.clone(),
                    })
            })
            .collect()
    }
}

fn check_values(variable_path: &str, shape: &[usize], actual: usize) -> TreeResult<()> {
    let expected: usize = shape.iter().product();
    if actual != 0 && actual != expected {
        return Err(TreeError::ShapeMismatch {
            path: variable_path.to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}
