//! End-to-end annotation of JSON granule snapshots.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use metadata_annotator::{
    annotate_granule, AnnotatorError, GranuleOutcome, RuleConfig, PROGRAM, VERSION,
};
use netcdf_tree::{AttributeStore, AttributeValue, DataType, JsonEngine, Tree, TreeEngine};
use test_utils::time::{REFERENCE_HISTORY_TIMESTAMP, REFERENCE_TIME};
use test_utils::{
    assert_approx_eq, index_reference_granule, rules, sample_granule, spl3ftp_granule,
    write_json_granule, SPL3FTP_GROUP, SPL3FTP_HISTORY,
};

fn reference_time() -> DateTime<Utc> {
    REFERENCE_TIME.parse().unwrap()
}

fn history_line() -> String {
    format!("{} {} {}", REFERENCE_HISTORY_TIMESTAMP, PROGRAM, VERSION)
}

fn text(value: &str) -> AttributeValue {
    AttributeValue::from(value)
}

fn attributes(tree: &Tree, node_path: &str) -> BTreeMap<String, AttributeValue> {
    tree.node(node_path).unwrap().attributes().clone()
}

fn expected(entries: &[(&str, AttributeValue)]) -> BTreeMap<String, AttributeValue> {
    entries
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

/// Annotate a tree through files and load the output back.
fn annotate(tree: &Tree, rules_json: &str, short_name: &str) -> Tree {
    let dir = tempfile::tempdir().unwrap();
    let input = write_json_granule(dir.path(), "input.json", tree);
    let output = dir.path().join("output.json");
    let config = RuleConfig::from_json(rules_json).unwrap();

    let outcome =
        annotate_granule(&JsonEngine, &input, &output, &config, short_name, reference_time())
            .unwrap();
    assert_eq!(outcome, GranuleOutcome::Annotated);

    JsonEngine.load(&output).unwrap()
}

#[test]
fn test_attribute_overrides() {
    let output = annotate(&sample_granule(), rules::TEST01, "TEST01");

    assert_eq!(
        attributes(&output, "/"),
        expected(&[
            ("short_name", text("TEST01")),
            ("update", text("corrected root group value")),
            ("addition", text("new root group value")),
            ("history", text(&history_line())),
        ])
    );

    assert_eq!(
        attributes(&output, "/variable_one"),
        expected(&[
            ("coordinates", text("time latitude longitude")),
            ("grid_mapping", text("/EASE2_global_projection")),
            ("units", text("seconds since 2000-00-00T12:34:56")),
        ])
    );

    assert_eq!(
        attributes(&output, "/variable_three"),
        attributes(&sample_granule(), "/variable_three")
    );

    assert_eq!(
        attributes(&output, "/sub_group"),
        expected(&[
            ("update", text("corrected subgroup value")),
            ("nested_addition", text("new subgroup value")),
        ])
    );

    assert_eq!(
        attributes(&output, "/sub_group/variable_two"),
        expected(&[("coordinates", text("time latitude longitude"))])
    );
}

#[test]
fn test_referenced_grid_mapping_is_created() {
    let output = annotate(&sample_granule(), rules::TEST01, "TEST01");

    assert_eq!(
        attributes(&output, "/EASE2_global_projection"),
        expected(&[
            ("grid_mapping_name", text("lambert_azimuthal_equal_area")),
            ("false_easting", AttributeValue::Float(0.0)),
            ("false_northing", AttributeValue::Float(0.0)),
            ("latitude_of_projection_origin", AttributeValue::Float(90.0)),
            ("longitude_of_projection_origin", AttributeValue::Float(0.0)),
        ])
    );

    let variables: Vec<&str> = output.variable_paths().collect();
    assert_eq!(
        variables,
        vec![
            "/EASE2_global_projection",
            "/sub_group/variable_two",
            "/variable_one",
            "/variable_three",
        ]
    );
    assert_eq!(output.group_paths().collect::<Vec<_>>(), vec!["/", "/sub_group"]);
}

#[test]
fn test_collection_without_rules_is_copied_byte_for_byte() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_json_granule(dir.path(), "input.json", &sample_granule());
    let output = dir.path().join("output.json");
    let config = RuleConfig::from_json(rules::TEST01).unwrap();

    for short_name in ["OTHER_SHORT_NAME", "NOT_CONFIGURED"] {
        let outcome =
            annotate_granule(&JsonEngine, &input, &output, &config, short_name, reference_time())
                .unwrap();
        assert_eq!(outcome, GranuleOutcome::Copied);
        assert_eq!(std::fs::read(&input).unwrap(), std::fs::read(&output).unwrap());
    }
}

#[test]
fn test_history_subset_dimension_scales() {
    let output = annotate(&spl3ftp_granule(), rules::SPL3FTP, "SPL3FTP");
    let x_path = format!("{}/x", SPL3FTP_GROUP);
    let y_path = format!("{}/y", SPL3FTP_GROUP);

    let x = output.variable(&x_path).unwrap();
    assert_eq!(x.dimensions, vec!["x"]);
    assert_eq!(x.dtype, DataType::Float64);
    assert_eq!(x.values.len(), 52);
    assert_approx_eq!(x.values[0], -17367530.44516138 + 227.5 * 36032.220840583, 1e-6);
    assert_approx_eq!(x.values[51], -17367530.44516138 + 278.5 * 36032.220840583, 1e-6);

    let y = output.variable(&y_path).unwrap();
    assert_eq!(y.values.len(), 29);
    assert_approx_eq!(y.values[0], 7314540.79258289 - 16.5 * 36032.220840583, 1e-6);
    assert_approx_eq!(y.values[28], 7314540.79258289 - 44.5 * 36032.220840583, 1e-6);

    // Temporary attributes stay out of the output.
    let x_attributes = attributes(&output, &x_path);
    assert_eq!(
        x_attributes,
        expected(&[
            ("standard_name", text("projection_x_coordinate")),
            ("units", text("m")),
        ])
    );
    assert!(!output
        .node("/EASE2_global_projection")
        .unwrap()
        .has_attribute("_*geotransform"));

    let surface_flag = output
        .variable(&format!("{}/surface_flag", SPL3FTP_GROUP))
        .unwrap();
    assert_eq!(surface_flag.dimensions, vec!["am_pm", "y", "x"]);

    let history = output.root().attribute("history").unwrap().as_str().unwrap();
    assert_eq!(history, format!("{}\n{}", SPL3FTP_HISTORY, history_line()));
}

#[test]
fn test_history_start_index_overflow_is_an_error() {
    let mut tree = spl3ftp_granule();
    let history = SPL3FTP_HISTORY.replace("227", &usize::MAX.to_string());
    tree.root_mut()
        .set_attribute("history", AttributeValue::from(history.as_str()));

    let dir = tempfile::tempdir().unwrap();
    let input = write_json_granule(dir.path(), "input.json", &tree);
    let output = dir.path().join("output.json");
    let config = RuleConfig::from_json(rules::SPL3FTP).unwrap();

    let result =
        annotate_granule(&JsonEngine, &input, &output, &config, "SPL3FTP", reference_time());

    let x_path = format!("{}/x", SPL3FTP_GROUP);
    assert!(matches!(
        result,
        Err(AnnotatorError::InvalidDimensionAttribute { ref path, ref value, .. })
            if *path == x_path && *value == usize::MAX.to_string()
    ));
    assert!(!output.exists());
}

#[test]
fn test_index_reference_dimension_scales() {
    let output = annotate(&index_reference_granule(), rules::INDEX_REFERENCE, "INDEX_REF");

    let x = output.variable("/x").unwrap();
    assert_eq!(x.values, vec![-8802000.0, -8766000.0, -8730000.0]);

    let y = output.variable("/y").unwrap();
    assert_eq!(y.values, vec![8406000.0, 8370000.0, 8334000.0]);

    assert_eq!(
        attributes(&output, "/crs"),
        expected(&[("grid_mapping_name", text("lambert_azimuthal_equal_area"))])
    );
}

#[test]
fn test_failed_annotation_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_json_granule(dir.path(), "input.json", &spl3ftp_granule());
    let output = dir.path().join("output.json");
    let config = RuleConfig::from_json(
        r#"{"SPL3FTP": [{
            "pattern": "/Freeze_Thaw_Retrieval_Data_Global/surface_flag",
            "attributes": {"dimensions": "y x"}
        }]}"#,
    )
    .unwrap();

    let result =
        annotate_granule(&JsonEngine, &input, &output, &config, "SPL3FTP", reference_time());

    assert!(matches!(
        result,
        Err(AnnotatorError::InvalidDimensionsConfiguration {
            rank: 3,
            configured: 2,
            ..
        })
    ));
    assert!(!output.exists());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn test_spatial_dimension_without_start_index_configuration() {
    let config = r#"{"INDEX_REF": [
        {"pattern": "/x", "attributes": {"standard_name": "projection_x_coordinate"}}
    ]}"#;
    let dir = tempfile::tempdir().unwrap();
    let input = write_json_granule(dir.path(), "input.json", &index_reference_granule());
    let output = dir.path().join("output.json");

    let result = annotate_granule(
        &JsonEngine,
        &input,
        &output,
        &RuleConfig::from_json(config).unwrap(),
        "INDEX_REF",
        reference_time(),
    );

    assert!(matches!(
        result,
        Err(AnnotatorError::MissingStartIndexConfiguration(ref p)) if p == "/x"
    ));
    assert!(!output.exists());
}

#[test]
fn test_invalid_rule_pattern_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_json_granule(dir.path(), "input.json", &sample_granule());
    let output = dir.path().join("output.json");
    let config = RuleConfig::from_json(r#"{"TEST01": [{"pattern": "/(unclosed", "attributes": {}}]}"#)
        .unwrap();

    let result = annotate_granule(&JsonEngine, &input, &output, &config, "TEST01", reference_time());
    assert!(matches!(result, Err(AnnotatorError::InvalidRulePattern { .. })));
    assert!(!output.exists());
}
