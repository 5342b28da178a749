//! Compiled override rules and pattern precedence.
//!
//! Each pattern is compiled once and matched against whole node paths. A
//! pattern that names one concrete path (no regular expression
//! metacharacters) and matches nothing marks a variable that may need to
//! be created; wildcard and alternation patterns that match nothing are
//! ignored.
//!
//! When several rules match one path their edits are merged attribute by
//! attribute, the most specific rule winning. Specificity compares, in
//! order:
//!
//! 1. depth of the pattern's fixed prefix (text before the first
//!    metacharacter), deeper first
//! 2. exact-path patterns over patterns with metacharacters
//! 3. shorter pattern basename
//!
//! Rules that tie on all three apply in configuration order, so the later
//! rule's value is kept.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

use netcdf_tree::path;
use regex::Regex;

use crate::config::{AttributeEdit, OverrideRule};
use crate::error::{AnnotatorError, Result};

const REGEX_METACHARACTERS: &[char] = &[
    '.', '^', '$', '*', '+', '?', '(', ')', '[', ']', '{', '}', '|', '\\',
];

/// Whether a pattern denotes exactly one path.
pub fn is_exact_path(pattern: &str) -> bool {
    regex::escape(pattern) == pattern
}

/// Precedence key of a rule pattern; greater is more specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Specificity {
    prefix_depth: usize,
    exact: bool,
    basename_len: Reverse<usize>,
}

impl Specificity {
    pub fn of(pattern: &str) -> Self {
        let prefix = pattern
            .find(REGEX_METACHARACTERS)
            .map_or(pattern, |idx| &pattern[..idx]);

        Self {
            prefix_depth: path::depth(prefix),
            exact: is_exact_path(pattern),
            basename_len: Reverse(pattern.rsplit('/').next().unwrap_or(pattern).len()),
        }
    }
}

/// One compiled override rule.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pattern: String,
    regex: Regex,
    exact: bool,
    specificity: Specificity,
    attributes: BTreeMap<String, AttributeEdit>,
}

impl CompiledRule {
    fn compile(rule: &OverrideRule) -> Result<Self> {
        let regex = Regex::new(&format!("^(?:{})$", rule.pattern)).map_err(|source| {
            AnnotatorError::InvalidRulePattern {
                pattern: rule.pattern.clone(),
                source,
            }
        })?;

        Ok(Self {
            pattern: rule.pattern.clone(),
            regex,
            exact: is_exact_path(&rule.pattern),
            specificity: Specificity::of(&rule.pattern),
            attributes: rule.attributes.clone(),
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_exact(&self) -> bool {
        self.exact
    }

    pub fn specificity(&self) -> Specificity {
        self.specificity
    }

    pub fn attributes(&self) -> &BTreeMap<String, AttributeEdit> {
        &self.attributes
    }

    /// Whole-path match.
    pub fn matches(&self, node_path: &str) -> bool {
        self.regex.is_match(node_path)
    }
}

/// Result of resolving a rule set against a tree's namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchSet {
    /// Existing paths matched by at least one rule
    pub matched: BTreeSet<String>,
    /// Exact-path patterns that matched nothing
    pub missing: BTreeSet<String>,
}

/// The live rules for one collection.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    /// Compile rules in configuration order. Any invalid pattern fails the
    /// whole set.
    pub fn compile(rules: &[OverrideRule]) -> Result<Self> {
        let rules = rules
            .iter()
            .map(CompiledRule::compile)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    /// Match every rule against every path in the namespace.
    pub fn resolve<'a, I>(&self, namespace: I) -> MatchSet
    where
        I: IntoIterator<Item = &'a str>,
    {
        let namespace: Vec<&str> = namespace.into_iter().collect();
        let mut match_set = MatchSet::default();

        for rule in &self.rules {
            let mut hits = 0;
            for node_path in namespace.iter().filter(|p| rule.matches(p)) {
                match_set.matched.insert(node_path.to_string());
                hits += 1;
            }

            if hits == 0 && rule.exact {
                match_set.missing.insert(rule.pattern.clone());
            }
        }
        match_set
    }

    /// Rules matching a path, least specific first.
    pub fn matching_rules(&self, node_path: &str) -> Vec<&CompiledRule> {
        let mut matching: Vec<&CompiledRule> = self
            .rules
            .iter()
            .filter(|rule| rule.matches(node_path))
            .collect();
        // Stable sort keeps configuration order among equal keys.
        matching.sort_by_key(|rule| rule.specificity);
        matching
    }

    /// Merged edits for a path, each attribute taken from the most specific
    /// rule that configures it.
    pub fn edits_for(&self, node_path: &str) -> BTreeMap<String, AttributeEdit> {
        let mut edits = BTreeMap::new();
        for rule in self.matching_rules(node_path) {
            for (attribute, edit) in &rule.attributes {
                edits.insert(attribute.clone(), edit.clone());
            }
        }
        edits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuleConfig;
    use netcdf_tree::AttributeValue;
    use test_utils::rules;

    fn set(value: &str) -> AttributeEdit {
        AttributeEdit::Set(AttributeValue::from(value))
    }

    #[test]
    fn test_is_exact_path() {
        assert!(is_exact_path("/path/one"));
        assert!(is_exact_path("/"));
        assert!(is_exact_path("/sub_group/variable_two"));
        assert!(!is_exact_path("/path/.*"));
        assert!(!is_exact_path("/(path_one|path_two)/variable"));
    }

    #[test]
    fn test_specificity_ordering() {
        assert!(Specificity::of("/group/variable") > Specificity::of("/group/.*"));
        assert!(Specificity::of("/group/.*") > Specificity::of("/.*"));
        assert!(Specificity::of("/a/b/c.*") > Specificity::of("/a/variable"));
        assert!(Specificity::of("/a/variable") > Specificity::of("/a/v.*"));
        // Same prefix depth and exactness: shorter basename wins.
        assert!(Specificity::of("/group/var.*") > Specificity::of("/group/variable.*"));
    }

    #[test]
    fn test_resolve_matches_and_missing() {
        let config = RuleConfig::from_json(rules::TEST01).unwrap();
        let rule_set = config.rule_set("TEST01").unwrap();
        let tree = test_utils::sample_granule();

        let match_set = rule_set.resolve(tree.group_paths().chain(tree.variable_paths()));

        let matched: Vec<&str> = match_set.matched.iter().map(String::as_str).collect();
        assert_eq!(
            matched,
            vec!["/", "/sub_group", "/sub_group/variable_two", "/variable_one"]
        );

        let missing: Vec<&str> = match_set.missing.iter().map(String::as_str).collect();
        assert_eq!(
            missing,
            vec!["/EASE2_global_projection", "/unreferenced_variable"]
        );
    }

    #[test]
    fn test_patterns_are_anchored() {
        let rule_set = RuleSet::compile(&[OverrideRule::new("/var")]).unwrap();
        let match_set = rule_set.resolve(["/var", "/variable", "/group/var"]);

        assert_eq!(match_set.matched.len(), 1);
        assert!(match_set.matched.contains("/var"));
        assert!(match_set.missing.is_empty());
    }

    #[test]
    fn test_invalid_pattern_is_fatal() {
        let result = RuleSet::compile(&[OverrideRule::new("/good"), OverrideRule::new("/bad[")]);
        assert!(matches!(
            result,
            Err(AnnotatorError::InvalidRulePattern { ref pattern, .. }) if pattern == "/bad["
        ));
    }

    #[test]
    fn test_most_specific_rule_wins_per_attribute() {
        let rule_set = RuleSet::compile(&[
            OverrideRule::new("/group/variable")
                .with("units", set("m"))
                .with("delete_me", AttributeEdit::Delete),
            OverrideRule::new("/group/.*")
                .with("units", set("km"))
                .with("delete_me", set("kept by the wildcard"))
                .with("long_name", set("from wildcard")),
            OverrideRule::new("/.*").with("long_name", set("from root wildcard")),
        ])
        .unwrap();

        let edits = rule_set.edits_for("/group/variable");
        assert_eq!(edits["units"], set("m"));
        assert_eq!(edits["delete_me"], AttributeEdit::Delete);
        assert_eq!(edits["long_name"], set("from wildcard"));

        let edits = rule_set.edits_for("/group/other");
        assert_eq!(edits["units"], set("km"));
    }

    #[test]
    fn test_equal_specificity_applies_in_configuration_order() {
        let rule_set = RuleSet::compile(&[
            OverrideRule::new("/g/(a|b)").with("units", set("first")),
            OverrideRule::new("/g/(b|a)").with("units", set("second")),
        ])
        .unwrap();

        assert_eq!(rule_set.edits_for("/g/a")["units"], set("second"));
    }

    #[test]
    fn test_unmatched_path_has_no_edits() {
        let rule_set = RuleSet::compile(&[OverrideRule::new("/a").with("x", set("1"))]).unwrap();
        assert!(rule_set.edits_for("/b").is_empty());
        assert!(rule_set.matching_rules("/b").is_empty());
    }
}
