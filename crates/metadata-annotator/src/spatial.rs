//! Spatial dimension variables and their coordinate scales.

use netcdf_tree::{path, AttributeStore, DataType, Tree};
use projection::{Geotransform, ProjectionError, SpatialAxis};

use crate::attributes::{lookup, lookup_str, ScratchAttributes};
use crate::config::temporary;
use crate::error::{AnnotatorError, Result};
use crate::references::{reference_tokens, resolve_reference};
use crate::subset::{subset_start_index, SubsetIndexMap};
use crate::synthesize::configured_dtype;

pub const STANDARD_NAME: &str = "standard_name";
pub const GRID_MAPPING: &str = "grid_mapping";
/// GDAL geotransform attribute: six whitespace-separated numbers.
pub const GDAL_GEOTRANSFORM: &str = "GeoTransform";

/// A 1-D variable named after its only dimension.
pub fn is_dimension_variable(tree: &Tree, variable_path: &str) -> bool {
    tree.variable(variable_path).is_some_and(|data| {
        data.rank() == 1 && data.dimensions[0] == path::basename(variable_path)
    })
}

/// Axis marked by a dimension variable's `standard_name`.
pub fn spatial_axis(tree: &Tree, variable_path: &str) -> Option<SpatialAxis> {
    let standard_name = tree
        .node(variable_path)?
        .attribute(STANDARD_NAME)?
        .as_str()?;

    match standard_name {
        "projection_x_coordinate" => Some(SpatialAxis::X),
        "projection_y_coordinate" => Some(SpatialAxis::Y),
        _ => None,
    }
}

/// Path of the grid mapping variable used by a dimension variable.
///
/// Reads `grid_mapping`, then `_*grid_mapping`.
pub fn grid_mapping_path(
    tree: &Tree,
    scratch: &ScratchAttributes,
    dimension_path: &str,
) -> Result<String> {
    let value = lookup_str(tree, scratch, dimension_path, GRID_MAPPING)
        .or_else(|| lookup_str(tree, scratch, dimension_path, temporary::GRID_MAPPING))
        .ok_or_else(|| AnnotatorError::MissingDimensionAttribute {
            path: dimension_path.to_string(),
            attribute: GRID_MAPPING.to_string(),
        })?;

    let reference = reference_tokens(value).into_iter().next().ok_or_else(|| {
        AnnotatorError::InvalidGridMappingReference {
            path: dimension_path.to_string(),
            reference: value.to_string(),
        }
    })?;

    let grid_mapping = resolve_reference(tree, dimension_path, reference);
    if !tree.is_variable(&grid_mapping) {
        return Err(AnnotatorError::InvalidGridMappingReference {
            path: dimension_path.to_string(),
            reference: grid_mapping,
        });
    }
    Ok(grid_mapping)
}

/// Geotransform configured on a grid mapping variable.
pub fn geotransform(
    tree: &Tree,
    scratch: &ScratchAttributes,
    grid_mapping: &str,
) -> Result<Geotransform> {
    if let Some(value) = lookup(tree, scratch, grid_mapping, temporary::GEOTRANSFORM) {
        let invalid = || AnnotatorError::InvalidDimensionAttribute {
            path: grid_mapping.to_string(),
            attribute: temporary::GEOTRANSFORM.to_string(),
            value: value.to_string(),
        };
        let coefficients = value.as_f64_list().ok_or_else(invalid)?;
        return Geotransform::from_config(&coefficients).map_err(|_| invalid());
    }

    if let Some(text) = lookup_str(tree, scratch, grid_mapping, GDAL_GEOTRANSFORM) {
        return Geotransform::from_gdal_string(text).map_err(|_| {
            AnnotatorError::InvalidDimensionAttribute {
                path: grid_mapping.to_string(),
                attribute: GDAL_GEOTRANSFORM.to_string(),
                value: text.to_string(),
            }
        });
    }

    Err(AnnotatorError::MissingDimensionAttribute {
        path: grid_mapping.to_string(),
        attribute: temporary::GEOTRANSFORM.to_string(),
    })
}

/// Numeric type for a dimension variable's computed values.
pub fn dimension_value_dtype(
    tree: &Tree,
    scratch: &ScratchAttributes,
    dimension_path: &str,
) -> Result<DataType> {
    if let Some(dtype) = configured_dtype(tree, scratch, dimension_path)? {
        return Ok(dtype);
    }
    Ok(tree
        .variable(dimension_path)
        .map(|data| data.dtype)
        .filter(DataType::is_numeric)
        .unwrap_or(DataType::Float64))
}

/// Compute and store the coordinate values of a spatial dimension variable.
///
/// Returns the start index used.
pub fn write_spatial_scale(
    tree: &mut Tree,
    scratch: &ScratchAttributes,
    dimension_path: &str,
    axis: SpatialAxis,
    index_map: &SubsetIndexMap,
) -> Result<usize> {
    let start = subset_start_index(tree, scratch, dimension_path, index_map)?;
    let size = tree
        .variable_shape(dimension_path)?
        .first()
        .copied()
        .ok_or_else(|| AnnotatorError::MissingDimensionVariable(dimension_path.to_string()))?;
    let dtype = dimension_value_dtype(tree, scratch, dimension_path)?;
    let grid_mapping = grid_mapping_path(tree, scratch, dimension_path)?;
    let geotransform = geotransform(tree, scratch, &grid_mapping)?;

    let values = geotransform
        .dimension_scale(axis, start, size, dtype)
        .map_err(|e| match e {
            ProjectionError::IndexOutOfRange { .. } => AnnotatorError::InvalidDimensionAttribute {
                path: dimension_path.to_string(),
                attribute: "subset start index".to_string(),
                value: start.to_string(),
            },
            other => other.into(),
        })?;
    tree.set_variable_values(dimension_path, dtype, values)?;
    Ok(start)
}
