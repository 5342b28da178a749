//! Common test fixtures for metadata annotation tests.
//!
//! Granule trees mirror the shapes of real collections closely enough to
//! exercise rule matching, variable synthesis and subset provenance, and
//! the rule configurations are the JSON documents a deployment would ship.

use std::path::{Path, PathBuf};

use netcdf_tree::{AttributeStore, AttributeValue, DataType, JsonEngine, Tree, TreeEngine};

use crate::generators::{column_index_grid, row_index_grid};

/// Fixed timestamps for history assertions.
pub mod time {
    /// Reference time used by history tests (2000-01-02T03:04:05Z)
    pub const REFERENCE_TIME: &str = "2000-01-02T03:04:05Z";

    /// The same instant as written into a history line
    pub const REFERENCE_HISTORY_TIMESTAMP: &str = "2000-01-02T03:04:05+00:00";
}

/// Rule configurations keyed by collection short name.
pub mod rules {
    /// Rules for the basic attribute add/update/delete scenario.
    pub const TEST01: &str = r#"{
        "TEST01": [
            {
                "pattern": "/",
                "attributes": {
                    "update": "corrected root group value",
                    "addition": "new root group value",
                    "delete": null,
                    "missing_attr": null
                }
            },
            {
                "pattern": "/sub_group",
                "attributes": {
                    "update": "corrected subgroup value",
                    "nested_addition": "new subgroup value",
                    "delete": null
                }
            },
            {
                "pattern": "/variable_one",
                "attributes": {
                    "coordinates": "time latitude longitude",
                    "grid_mapping": "/EASE2_global_projection"
                }
            },
            {
                "pattern": "/sub_group/.*",
                "attributes": {
                    "delete": "wildcard value that loses to the exact rule"
                }
            },
            {
                "pattern": "/sub_group/variable_two",
                "attributes": {
                    "delete": null
                }
            },
            {
                "pattern": "/EASE2_global_projection",
                "attributes": {
                    "grid_mapping_name": "lambert_azimuthal_equal_area",
                    "false_easting": 0.0,
                    "false_northing": 0.0,
                    "latitude_of_projection_origin": 90.0,
                    "longitude_of_projection_origin": 0.0
                }
            },
            {
                "pattern": "/unreferenced_variable",
                "attributes": {
                    "long_name": "never created because nothing refers to it"
                }
            },
            {
                "pattern": "/(nonexistent_one|nonexistent_two)/variable",
                "attributes": {
                    "units": "m"
                }
            },
            {
                "pattern": "/no_such_group/.*",
                "attributes": {
                    "units": "m"
                }
            }
        ],
        "OTHER_SHORT_NAME": []
    }"#;

    /// Rules for a SMAP L3 freeze/thaw granule subsetted by an OPeNDAP
    /// request recorded in its history attribute.
    pub const SPL3FTP: &str = r#"{
        "SPL3FTP": [
            {
                "pattern": "/Freeze_Thaw_Retrieval_Data_Global/(latitude|longitude|surface_flag)",
                "attributes": {
                    "dimensions": "am_pm y x",
                    "grid_mapping": "/EASE2_global_projection"
                }
            },
            {
                "pattern": "/Freeze_Thaw_Retrieval_Data_Global/transition_direction",
                "attributes": {
                    "dimensions": "y x",
                    "grid_mapping": "/EASE2_global_projection"
                }
            },
            {
                "pattern": "/Freeze_Thaw_Retrieval_Data_Global/am_pm",
                "attributes": {
                    "long_name": "AM-PM overpass",
                    "_*dimension_value_dtype": "uint8"
                }
            },
            {
                "pattern": "/Freeze_Thaw_Retrieval_Data_Global/x",
                "attributes": {
                    "standard_name": "projection_x_coordinate",
                    "units": "m",
                    "_*corner_point_offsets": "history_subset_index_ranges",
                    "_*grid_mapping": "/EASE2_global_projection",
                    "_*dimension_value_dtype": "float64"
                }
            },
            {
                "pattern": "/Freeze_Thaw_Retrieval_Data_Global/y",
                "attributes": {
                    "standard_name": "projection_y_coordinate",
                    "units": "m",
                    "grid_mapping": "/EASE2_global_projection",
                    "_*corner_point_offsets": "history_subset_index_ranges"
                }
            },
            {
                "pattern": "/EASE2_global_projection",
                "attributes": {
                    "grid_mapping_name": "lambert_cylindrical_equal_area",
                    "standard_parallel": 30.0,
                    "longitude_of_central_meridian": 0.0,
                    "false_easting": 0.0,
                    "false_northing": 0.0,
                    "_*geotransform": [
                        -17367530.44516138, 36032.220840583, 0,
                        7314540.79258289, 0, -36032.220840583
                    ]
                }
            }
        ]
    }"#;

    /// Rules for a small granule whose subset origin is recorded in
    /// row/column index-reference variables.
    pub const INDEX_REFERENCE: &str = r#"{
        "INDEX_REF": [
            {
                "pattern": "/data",
                "attributes": {
                    "grid_mapping": "crs"
                }
            },
            {
                "pattern": "/x",
                "attributes": {
                    "standard_name": "projection_x_coordinate",
                    "_*subset_index_reference": "column_index",
                    "_*grid_mapping": "crs"
                }
            },
            {
                "pattern": "/y",
                "attributes": {
                    "standard_name": "projection_y_coordinate",
                    "_*subset_index_reference": "row_index",
                    "_*grid_mapping": "crs"
                }
            },
            {
                "pattern": "/crs",
                "attributes": {
                    "grid_mapping_name": "lambert_azimuthal_equal_area",
                    "_*geotransform": [-9000000, 36000, 0, 9000000, 0, -36000]
                }
            }
        ]
    }"#;
}

/// Group holding the SMAP L3 freeze/thaw grid.
pub const SPL3FTP_GROUP: &str = "/Freeze_Thaw_Retrieval_Data_Global";

/// Subset constraint recorded by the subsetting service, before encoding.
pub const SPL3FTP_CONSTRAINT: &str = "/Freeze_Thaw_Retrieval_Data_Global/surface_flag[][16:44][227:278];\
/Freeze_Thaw_Retrieval_Data_Global/transition_direction[16:44][227:278]";

/// History attribute of a subsetted SPL3FTP granule: a plain creation line
/// followed by the URL-encoded subset request.
pub const SPL3FTP_HISTORY: &str = "2024-03-01T10:15:00+00:00 sds/harmony-opendap-subsetter 1.0.0\n\
request=https%3A%2F%2Fopendap.earthdata.nasa.gov%2Fgranule.h5.dap.nc4%3Fdap4.ce%3D\
%2FFreeze_Thaw_Retrieval_Data_Global%2Fsurface_flag%5B%5D%5B16%3A44%5D%5B227%3A278%5D%3B\
%2FFreeze_Thaw_Retrieval_Data_Global%2Ftransition_direction%5B16%3A44%5D%5B227%3A278%5D";

/// Build the basic granule: root attributes to update, add and delete, a
/// sub-group, and three attribute-only variables.
pub fn sample_granule() -> Tree {
    let mut tree = Tree::new();
    set_attributes(
        tree.root_mut(),
        &[
            ("short_name", "TEST01"),
            ("update", "original value"),
            ("delete", "attribute should not exist"),
        ],
    );

    add_scalar(&mut tree, "/variable_one", &[
        ("coordinates", "original value"),
        ("units", "seconds since 2000-00-00T12:34:56"),
    ]);

    tree.add_group("/sub_group").expect("add sub_group");
    if let Some(node) = tree.node_mut("/sub_group") {
        set_attributes(
            node,
            &[
                ("delete", "attribute should not exist"),
                ("update", "original value"),
            ],
        );
    }

    add_scalar(&mut tree, "/sub_group/variable_two", &[
        ("coordinates", "time latitude longitude"),
        ("delete", "attribute needs to be deleted"),
    ]);

    add_scalar(&mut tree, "/variable_three", &[
        ("coordinates", "time latitude longitude"),
        ("notes", "this variable does not match any override rules"),
    ]);

    tree
}

/// Build a subsetted SMAP L3 freeze/thaw granule with positional
/// dimensions (`dim0`, `dim1`, `dim2`) and an encoded subset history.
pub fn spl3ftp_granule() -> Tree {
    let mut tree = Tree::new();
    set_attributes(tree.root_mut(), &[("history", SPL3FTP_HISTORY)]);

    tree.add_group(SPL3FTP_GROUP).expect("add group");
    tree.add_dimension(SPL3FTP_GROUP, "dim0", 2).expect("dim0");
    tree.add_dimension(SPL3FTP_GROUP, "dim1", 29).expect("dim1");
    tree.add_dimension(SPL3FTP_GROUP, "dim2", 52).expect("dim2");

    for (name, dtype) in [
        ("latitude", DataType::Float32),
        ("longitude", DataType::Float32),
        ("surface_flag", DataType::UInt16),
    ] {
        tree.add_variable(
            &format!("{}/{}", SPL3FTP_GROUP, name),
            &["dim0", "dim1", "dim2"],
            dtype,
            Vec::new(),
        )
        .expect("add 3-D variable");
    }

    tree.add_variable(
        &format!("{}/transition_direction", SPL3FTP_GROUP),
        &["dim1", "dim2"],
        DataType::Int8,
        Vec::new(),
    )
    .expect("add 2-D variable");

    tree
}

/// Build a 3x3 granule whose subset origin is recorded in index arrays:
/// columns start at 5 and rows at 16 in the original grid.
pub fn index_reference_granule() -> Tree {
    let mut tree = Tree::new();
    tree.add_dimension("/", "y", 3).expect("y");
    tree.add_dimension("/", "x", 3).expect("x");

    tree.add_variable("/data", &["y", "x"], DataType::Float32, vec![1.0; 9])
        .expect("data");
    tree.add_variable(
        "/column_index",
        &["y", "x"],
        DataType::Int32,
        column_index_grid(3, 3, 5),
    )
    .expect("column_index");
    tree.add_variable(
        "/row_index",
        &["y", "x"],
        DataType::Int32,
        row_index_grid(3, 3, 16),
    )
    .expect("row_index");

    tree
}

/// Save a tree as a JSON snapshot in `dir` and return its path.
pub fn write_json_granule(dir: &Path, file_name: &str, tree: &Tree) -> PathBuf {
    let path = dir.join(file_name);
    JsonEngine.save(tree, &path).expect("write granule snapshot");
    path
}

/// Write a rule configuration document into `dir` and return its path.
pub fn write_rules(dir: &Path, json: &str) -> PathBuf {
    let path = dir.join("annotator_rules.json");
    std::fs::write(&path, json).expect("write rule configuration");
    path
}

fn add_scalar(tree: &mut Tree, variable_path: &str, attributes: &[(&str, &str)]) {
    tree.add_variable(variable_path, &[], DataType::Char, Vec::new())
        .expect("add scalar variable");
    if let Some(node) = tree.node_mut(variable_path) {
        set_attributes(node, attributes);
    }
}

fn set_attributes<S: AttributeStore>(store: &mut S, attributes: &[(&str, &str)]) {
    for (name, value) in attributes {
        store.set_attribute(name, AttributeValue::from(*value));
    }
}
