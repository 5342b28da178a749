//! Annotation of one granule.
//!
//! An [`Annotation`] owns the granule's tree and moves through a fixed
//! sequence of states:
//!
//! ```text
//! Init -> RulesResolved -> AttributesApplied -> VariablesSynthesized
//!      -> DimensionsResolved -> SpatialScalesComputed -> HistoryAppended
//!      -> Emitted
//! ```
//!
//! Any error aborts the granule; the tree is dropped and nothing is written.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use netcdf_tree::{Tree, TreeEngine};
use projection::SpatialAxis;
use tracing::{debug, info};

use crate::attributes::{apply_edits, ScratchAttributes};
use crate::config::RuleConfig;
use crate::dimensions::rename_pseudo_dimensions;
use crate::error::Result;
use crate::history::update_history;
use crate::references::referenced_paths;
use crate::rules::{MatchSet, RuleSet};
use crate::spatial::{is_dimension_variable, spatial_axis, write_spatial_scale};
use crate::subset::{get_dimension_index_map, SubsetIndexMap};
use crate::synthesize::{classify_missing, create_dimension_variable, create_variable, MissingVariable};

/// Progress of an annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AnnotationState {
    Init,
    RulesResolved,
    AttributesApplied,
    VariablesSynthesized,
    DimensionsResolved,
    SpatialScalesComputed,
    HistoryAppended,
    Emitted,
}

impl fmt::Display for AnnotationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AnnotationState::Init => "init",
            AnnotationState::RulesResolved => "rules_resolved",
            AnnotationState::AttributesApplied => "attributes_applied",
            AnnotationState::VariablesSynthesized => "variables_synthesized",
            AnnotationState::DimensionsResolved => "dimensions_resolved",
            AnnotationState::SpatialScalesComputed => "spatial_scales_computed",
            AnnotationState::HistoryAppended => "history_appended",
            AnnotationState::Emitted => "emitted",
        };
        f.write_str(name)
    }
}

/// In-progress annotation of one granule tree.
#[derive(Debug)]
pub struct Annotation<'r> {
    rules: &'r RuleSet,
    tree: Tree,
    scratch: ScratchAttributes,
    state: AnnotationState,
    matches: MatchSet,
    /// Dimension variables matched by rules or created, in path order
    dimension_variables: Vec<String>,
    spatial_dimensions: BTreeMap<String, SpatialAxis>,
    index_map: SubsetIndexMap,
}

impl<'r> Annotation<'r> {
    pub fn new(rules: &'r RuleSet, tree: Tree) -> Self {
        Self {
            rules,
            tree,
            scratch: ScratchAttributes::default(),
            state: AnnotationState::Init,
            matches: MatchSet::default(),
            dimension_variables: Vec::new(),
            spatial_dimensions: BTreeMap::new(),
            index_map: SubsetIndexMap::new(),
        }
    }

    pub fn state(&self) -> AnnotationState {
        self.state
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn into_tree(self) -> Tree {
        self.tree
    }

    pub fn matches(&self) -> &MatchSet {
        &self.matches
    }

    /// Spatial dimension variables and their axes.
    pub fn spatial_dimensions(&self) -> &BTreeMap<String, SpatialAxis> {
        &self.spatial_dimensions
    }

    /// Run every step up to and including the history update.
    pub fn run(&mut self, timestamp: DateTime<Utc>) -> Result<()> {
        self.resolve_rules();
        self.apply_attributes()?;
        self.synthesize_variables()?;
        self.resolve_dimensions()?;
        self.compute_spatial_scales()?;
        self.append_history(timestamp);
        Ok(())
    }

    /// Write the annotated tree. Only valid once history is appended.
    pub fn emit(&mut self, engine: &dyn TreeEngine, output: &Path) -> Result<()> {
        debug_assert_eq!(self.state, AnnotationState::HistoryAppended);
        engine.save(&self.tree, output)?;
        self.transition(AnnotationState::Emitted);
        Ok(())
    }

    fn transition(&mut self, next: AnnotationState) {
        debug!(from = %self.state, to = %next, "Annotation state change");
        self.state = next;
    }

    fn resolve_rules(&mut self) {
        let namespace = self.tree.group_paths().chain(self.tree.variable_paths());
        self.matches = self.rules.resolve(namespace);

        debug!(
            matched = self.matches.matched.len(),
            missing = self.matches.missing.len(),
            "Resolved override rules"
        );
        self.transition(AnnotationState::RulesResolved);
    }

    fn apply_attributes(&mut self) -> Result<()> {
        for node_path in &self.matches.matched {
            let edits = self.rules.edits_for(node_path);
            if let Some(node) = self.tree.node_mut(node_path) {
                apply_edits(node, node_path, &edits, &mut self.scratch);
            }

            if self.tree.is_variable(node_path) {
                rename_pseudo_dimensions(&mut self.tree, node_path)?;
                if is_dimension_variable(&self.tree, node_path) {
                    self.dimension_variables.push(node_path.clone());
                }
            }
        }

        self.transition(AnnotationState::AttributesApplied);
        Ok(())
    }

    fn synthesize_variables(&mut self) -> Result<()> {
        let missing: Vec<String> = self.matches.missing.iter().cloned().collect();

        // Dimension variables first: their temporary grid mapping references
        // decide which reference-only variables are needed.
        let mut deferred = Vec::new();
        for variable_path in missing {
            let references = referenced_paths(&self.tree, &self.scratch);
            match classify_missing(&self.tree, &variable_path, &references) {
                MissingVariable::Dimension { dimension, len } => {
                    let edits = self.rules.edits_for(&variable_path);
                    create_dimension_variable(
                        &mut self.tree,
                        &variable_path,
                        &dimension,
                        len,
                        &edits,
                        &mut self.scratch,
                    )?;
                    self.dimension_variables.push(variable_path);
                }
                _ => deferred.push(variable_path),
            }
        }

        let references = referenced_paths(&self.tree, &self.scratch);
        for variable_path in deferred {
            match classify_missing(&self.tree, &variable_path, &references) {
                MissingVariable::Referenced | MissingVariable::Dimension { .. } => {
                    let edits = self.rules.edits_for(&variable_path);
                    create_variable(&mut self.tree, &variable_path, &edits, &mut self.scratch)?;
                }
                MissingVariable::Unreferenced => {
                    debug!(
                        variable = %variable_path,
                        "Skipping unreferenced variable configured by an exact rule"
                    );
                }
            }
        }

        self.dimension_variables.sort();
        self.transition(AnnotationState::VariablesSynthesized);
        Ok(())
    }

    fn resolve_dimensions(&mut self) -> Result<()> {
        self.spatial_dimensions = self
            .dimension_variables
            .iter()
            .filter_map(|path| Some((path.clone(), spatial_axis(&self.tree, path)?)))
            .collect();

        if !self.spatial_dimensions.is_empty() {
            self.index_map =
                get_dimension_index_map(&self.tree, &self.scratch, &self.dimension_variables)?;
        }

        debug!(
            dimensions = self.dimension_variables.len(),
            spatial = self.spatial_dimensions.len(),
            "Resolved dimension variables"
        );
        self.transition(AnnotationState::DimensionsResolved);
        Ok(())
    }

    fn compute_spatial_scales(&mut self) -> Result<()> {
        for (dimension_path, axis) in &self.spatial_dimensions {
            let start = write_spatial_scale(
                &mut self.tree,
                &self.scratch,
                dimension_path,
                *axis,
                &self.index_map,
            )?;
            debug!(
                dimension = %dimension_path,
                axis = %axis,
                start,
                "Computed spatial dimension scale"
            );
        }

        self.transition(AnnotationState::SpatialScalesComputed);
        Ok(())
    }

    fn append_history(&mut self, timestamp: DateTime<Utc>) {
        update_history(&mut self.tree, timestamp);
        self.transition(AnnotationState::HistoryAppended);
    }
}

/// Annotate a tree in memory.
pub fn annotate_tree(tree: Tree, rules: &RuleSet, timestamp: DateTime<Utc>) -> Result<Tree> {
    let mut annotation = Annotation::new(rules, tree);
    annotation.run(timestamp)?;
    Ok(annotation.into_tree())
}

/// What happened to a granule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GranuleOutcome {
    /// No rules for the collection; the input was copied unchanged.
    Copied,
    Annotated,
}

/// Annotate the granule at `input` and write the result to `output`.
///
/// A collection without rules gets a byte-for-byte copy. Otherwise the
/// output is written once, after every step has succeeded.
pub fn annotate_granule(
    engine: &dyn TreeEngine,
    input: &Path,
    output: &Path,
    config: &RuleConfig,
    short_name: &str,
    timestamp: DateTime<Utc>,
) -> Result<GranuleOutcome> {
    let rules = config.rule_set(short_name)?;

    if rules.is_empty() {
        info!(
            collection = short_name,
            input = %input.display(),
            "No override rules for collection, copying granule"
        );
        engine.copy(input, output)?;
        return Ok(GranuleOutcome::Copied);
    }

    let tree = engine.load(input)?;
    let mut annotation = Annotation::new(&rules, tree);
    annotation.run(timestamp)?;
    annotation.emit(engine, output)?;

    info!(
        collection = short_name,
        engine = engine.name(),
        output = %output.display(),
        rules = rules.len(),
        matched = annotation.matches().matched.len(),
        spatial_dimensions = annotation.spatial_dimensions().len(),
        "Annotated granule"
    );
    Ok(GranuleOutcome::Annotated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use netcdf_tree::{AttributeStore, AttributeValue};
    use test_utils::time::REFERENCE_TIME;
    use test_utils::{rules, sample_granule, spl3ftp_granule, SPL3FTP_GROUP};

    fn reference_time() -> DateTime<Utc> {
        REFERENCE_TIME.parse().unwrap()
    }

    fn rule_set(json: &str, short_name: &str) -> RuleSet {
        RuleConfig::from_json(json).unwrap().rule_set(short_name).unwrap()
    }

    #[test]
    fn test_states_advance_in_order() {
        let rules = rule_set(rules::TEST01, "TEST01");
        let mut annotation = Annotation::new(&rules, sample_granule());
        assert_eq!(annotation.state(), AnnotationState::Init);

        annotation.resolve_rules();
        assert_eq!(annotation.state(), AnnotationState::RulesResolved);
        annotation.apply_attributes().unwrap();
        assert_eq!(annotation.state(), AnnotationState::AttributesApplied);
        annotation.synthesize_variables().unwrap();
        assert_eq!(annotation.state(), AnnotationState::VariablesSynthesized);
        annotation.resolve_dimensions().unwrap();
        annotation.compute_spatial_scales().unwrap();
        annotation.append_history(reference_time());
        assert_eq!(annotation.state(), AnnotationState::HistoryAppended);
    }

    #[test]
    fn test_only_referenced_variables_are_created() {
        let rules = rule_set(rules::TEST01, "TEST01");
        let tree = annotate_tree(sample_granule(), &rules, reference_time()).unwrap();

        assert!(tree.is_variable("/EASE2_global_projection"));
        assert!(!tree.contains("/unreferenced_variable"));
        assert_eq!(
            tree.node("/EASE2_global_projection")
                .unwrap()
                .attribute("grid_mapping_name"),
            Some(&AttributeValue::from("lambert_azimuthal_equal_area"))
        );
    }

    #[test]
    fn test_spl3ftp_spatial_dimensions() {
        let rules = rule_set(rules::SPL3FTP, "SPL3FTP");
        let mut annotation = Annotation::new(&rules, spl3ftp_granule());
        annotation.run(reference_time()).unwrap();

        let spatial: Vec<(&str, SpatialAxis)> = annotation
            .spatial_dimensions()
            .iter()
            .map(|(path, axis)| (path.as_str(), *axis))
            .collect();
        assert_eq!(
            spatial,
            vec![
                ("/Freeze_Thaw_Retrieval_Data_Global/x", SpatialAxis::X),
                ("/Freeze_Thaw_Retrieval_Data_Global/y", SpatialAxis::Y),
            ]
        );
        assert_eq!(annotation.index_map[&format!("{}/y", SPL3FTP_GROUP)], 16);
        assert_eq!(annotation.index_map[&format!("{}/x", SPL3FTP_GROUP)], 227);

        let tree = annotation.tree();
        let am_pm = tree.variable(&format!("{}/am_pm", SPL3FTP_GROUP)).unwrap();
        assert_eq!(am_pm.values, vec![0.0, 1.0]);
        assert_eq!(am_pm.dtype, netcdf_tree::DataType::UInt8);
    }

    #[test]
    fn test_failure_leaves_no_tree_behind() {
        let rules = RuleSet::compile(&[crate::config::OverrideRule::new("/v").with(
            "dimensions",
            crate::config::AttributeEdit::Set(AttributeValue::from("a b")),
        )])
        .unwrap();
        let mut tree = Tree::new();
        tree.add_dimension("/", "d", 2).unwrap();
        tree.add_variable("/v", &["d"], netcdf_tree::DataType::Int8, vec![])
            .unwrap();

        let mut annotation = Annotation::new(&rules, tree);
        assert!(annotation.run(reference_time()).is_err());
        assert_eq!(annotation.state(), AnnotationState::RulesResolved);
        assert!(!annotation.tree().root().has_attribute("history"));
    }

    #[test]
    fn test_state_display() {
        assert_eq!(AnnotationState::SpatialScalesComputed.to_string(), "spatial_scales_computed");
        assert!(AnnotationState::Init < AnnotationState::Emitted);
    }
}
