//! Native NetCDF-4/HDF5 engine using the netcdf library.
//!
//! Reads every group, dimension, variable and attribute into a [`Tree`] and
//! writes a fresh NetCDF-4 file from one. Numeric variable values are read
//! as `f64` and written back in their recorded [`DataType`]; character and
//! string variables keep their attributes but not their values.

use std::path::Path;
use std::sync::Once;

use netcdf::types::{FloatType, IntType, NcVariableType};
use netcdf::AttributeValue as NcValue;
use tracing::debug;

use crate::engine::{write_atomically, TreeEngine};
use crate::error::{TreeError, TreeResult};
use crate::path::{self, ROOT};
use crate::tree::Tree;
use crate::types::DataType;
use crate::value::{AttributeStore, AttributeValue};

/// Silence HDF5's automatic error printing to stderr.
///
/// The HDF5 C library prints diagnostics even for errors the netcdf crate
/// handles, such as probing for optional attributes. Only needs to run once
/// per process, but is safe to call repeatedly.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 is thread-safe and we're passing null pointers
        // to disable error output, which is a documented valid use.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

/// Engine for NetCDF-4 and HDF5 files.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetCdfEngine;

impl TreeEngine for NetCdfEngine {
    fn name(&self) -> &'static str {
        "netcdf"
    }

    fn load(&self, file_path: &Path) -> TreeResult<Tree> {
        silence_hdf5_errors();

        let file = netcdf::open(file_path)?;
        let root = file
            .root()
            .ok_or_else(|| TreeError::InvalidFormat("file has no root group".to_string()))?;

        let mut tree = Tree::new();
        read_group(&mut tree, &root, ROOT)?;

        debug!(
            file = %file_path.display(),
            variables = tree.variable_paths().count(),
            "Loaded NetCDF tree"
        );
        Ok(tree)
    }

    fn save(&self, tree: &Tree, file_path: &Path) -> TreeResult<()> {
        silence_hdf5_errors();

        write_atomically(file_path, |staged| {
            let mut file = netcdf::create(staged)?;
            let mut root = file
                .root_mut()
                .ok_or_else(|| TreeError::InvalidFormat("created file has no root group".to_string()))?;
            write_group(tree, ROOT, &mut root)
        })
    }
}

// =============================================================================
// Reading
// =============================================================================

fn read_group(tree: &mut Tree, group: &netcdf::Group<'_>, group_path: &str) -> TreeResult<()> {
    for dimension in group.dimensions() {
        tree.add_dimension(group_path, &dimension.name(), dimension.len())?;
    }

    for attribute in group.attributes() {
        let value = attribute.value()?;
        if let (Some(value), Some(node)) = (from_netcdf_value(value), tree.node_mut(group_path)) {
            node.set_attribute(attribute.name(), value);
        }
    }

    for variable in group.variables() {
        read_variable(tree, &variable, group_path)?;
    }

    for child in group.groups() {
        let child_path = path::join(group_path, &child.name());
        tree.add_group(&child_path)?;
        read_group(tree, &child, &child_path)?;
    }
    Ok(())
}

fn read_variable(
    tree: &mut Tree,
    variable: &netcdf::Variable<'_>,
    group_path: &str,
) -> TreeResult<()> {
    let variable_path = path::join(group_path, &variable.name());
    let dimension_names: Vec<String> = variable.dimensions().iter().map(|d| d.name()).collect();
    let dimension_refs: Vec<&str> = dimension_names.iter().map(String::as_str).collect();

    let dtype = data_type_of(&variable.vartype());
    let values = if dtype.is_numeric() {
        variable.get_values::<f64, _>(..)?
    } else {
        Vec::new()
    };

    tree.add_variable(&variable_path, &dimension_refs, dtype, values)?;

    for attribute in variable.attributes() {
        let value = attribute.value()?;
        if let (Some(value), Some(node)) = (from_netcdf_value(value), tree.node_mut(&variable_path)) {
            node.set_attribute(attribute.name(), value);
        }
    }
    Ok(())
}

fn data_type_of(vartype: &NcVariableType) -> DataType {
    match vartype {
        NcVariableType::Int(IntType::I8) => DataType::Int8,
        NcVariableType::Int(IntType::U8) => DataType::UInt8,
        NcVariableType::Int(IntType::I16) => DataType::Int16,
        NcVariableType::Int(IntType::U16) => DataType::UInt16,
        NcVariableType::Int(IntType::I32) => DataType::Int32,
        NcVariableType::Int(IntType::U32) => DataType::UInt32,
        NcVariableType::Int(IntType::I64) => DataType::Int64,
        NcVariableType::Int(IntType::U64) => DataType::UInt64,
        NcVariableType::Float(FloatType::F32) => DataType::Float32,
        NcVariableType::Float(FloatType::F64) => DataType::Float64,
        NcVariableType::Char => DataType::Char,
        _ => DataType::String,
    }
}

fn from_netcdf_value(value: NcValue) -> Option<AttributeValue> {
    let converted = match value {
        NcValue::Uchar(v) => AttributeValue::Int(v.into()),
        NcValue::Schar(v) => AttributeValue::Int(v.into()),
        NcValue::Ushort(v) => AttributeValue::Int(v.into()),
        NcValue::Short(v) => AttributeValue::Int(v.into()),
        NcValue::Uint(v) => AttributeValue::Int(v.into()),
        NcValue::Int(v) => AttributeValue::Int(v.into()),
        NcValue::Longlong(v) => AttributeValue::Int(v),
        NcValue::Ulonglong(v) => AttributeValue::Int(i64::try_from(v).ok()?),
        NcValue::Float(v) => AttributeValue::Float(v.into()),
        NcValue::Double(v) => AttributeValue::Float(v),
        NcValue::Str(v) => AttributeValue::Text(v),
        NcValue::Uchars(v) => AttributeValue::Ints(v.into_iter().map(i64::from).collect()),
        NcValue::Schars(v) => AttributeValue::Ints(v.into_iter().map(i64::from).collect()),
        NcValue::Ushorts(v) => AttributeValue::Ints(v.into_iter().map(i64::from).collect()),
        NcValue::Shorts(v) => AttributeValue::Ints(v.into_iter().map(i64::from).collect()),
        NcValue::Uints(v) => AttributeValue::Ints(v.into_iter().map(i64::from).collect()),
        NcValue::Ints(v) => AttributeValue::Ints(v.into_iter().map(i64::from).collect()),
        NcValue::Longlongs(v) => AttributeValue::Ints(v),
        NcValue::Ulonglongs(v) => {
            AttributeValue::Ints(v.into_iter().filter_map(|x| i64::try_from(x).ok()).collect())
        }
        NcValue::Floats(v) => AttributeValue::Floats(v.into_iter().map(f64::from).collect()),
        NcValue::Doubles(v) => AttributeValue::Floats(v),
        NcValue::Strs(v) => AttributeValue::Texts(v),
        #[allow(unreachable_patterns)]
        _ => return None,
    };
    Some(converted)
}

// =============================================================================
// Writing
// =============================================================================

fn to_netcdf_value(value: &AttributeValue) -> NcValue {
    match value {
        AttributeValue::Int(v) => match i32::try_from(*v) {
            Ok(small) => NcValue::Int(small),
            Err(_) => NcValue::Longlong(*v),
        },
        AttributeValue::Float(v) => NcValue::Double(*v),
        AttributeValue::Text(v) => NcValue::Str(v.clone()),
        AttributeValue::Ints(v) => NcValue::Longlongs(v.clone()),
        AttributeValue::Floats(v) => NcValue::Doubles(v.clone()),
        AttributeValue::Texts(v) => NcValue::Strs(v.clone()),
    }
}

fn write_group(tree: &Tree, group_path: &str, group: &mut netcdf::GroupMut<'_>) -> TreeResult<()> {
    if let Some(dimensions) = tree.declared_dimensions(group_path) {
        for (name, len) in dimensions {
            group.add_dimension(name, *len)?;
        }
    }

    if let Some(node) = tree.node(group_path) {
        for (name, value) in node.attributes() {
            group.add_attribute(name, to_netcdf_value(value))?;
        }
    }

    for variable_path in tree.child_variables(group_path) {
        write_variable(tree, variable_path, group)?;
    }

    for child_path in tree.child_groups(group_path) {
        let mut child = group.add_group(path::basename(child_path))?;
        write_group(tree, child_path, &mut child)?;
    }
    Ok(())
}

/// Fill value attribute. Set on the variable before any data is written.
pub const FILL_VALUE: &str = "_FillValue";

/// Attributes whose values must share the variable's type.
const VALUE_TYPED_ATTRIBUTES: [&str; 5] =
    ["missing_value", "valid_min", "valid_max", "valid_range", "flag_values"];

/// Add a typed variable, set its fill value, write its values and then its
/// attributes. Value-typed attributes are cast to the variable's type.
macro_rules! put_typed {
    ($group:expr, $name:expr, $dims:expr, $node:expr, $values:expr, $ty:ty) => {{
        let mut variable = $group.add_variable::<$ty>($name, $dims)?;

        if let Some(fill) = $node.attribute(FILL_VALUE).and_then(AttributeValue::as_f64) {
            variable.set_fill_value(fill as $ty)?;
        }

        if !$values.is_empty() {
            let typed: Vec<$ty> = $values.iter().map(|&v| v as $ty).collect();
            variable.put_values(&typed, ..)?;
        }

        for (attribute, value) in $node.attributes() {
            if attribute == FILL_VALUE {
                continue;
            }
            let converted = match value {
                AttributeValue::Int(_) | AttributeValue::Float(_)
                    if VALUE_TYPED_ATTRIBUTES.contains(&attribute.as_str()) =>
                {
                    value.as_f64().map(|v| NcValue::from(v as $ty))
                }
                AttributeValue::Ints(_) | AttributeValue::Floats(_)
                    if VALUE_TYPED_ATTRIBUTES.contains(&attribute.as_str()) =>
                {
                    value
                        .as_f64_list()
                        .map(|list| NcValue::from(list.into_iter().map(|v| v as $ty).collect::<Vec<$ty>>()))
                }
                _ => None,
            };
            variable.put_attribute(attribute, converted.unwrap_or_else(|| to_netcdf_value(value)))?;
        }
    }};
}

fn write_variable(
    tree: &Tree,
    variable_path: &str,
    group: &mut netcdf::GroupMut<'_>,
) -> TreeResult<()> {
    let (Some(node), Some(data)) = (tree.node(variable_path), tree.variable(variable_path)) else {
        return Err(TreeError::MissingNode(variable_path.to_string()));
    };

    let name = path::basename(variable_path);
    let dims: Vec<&str> = data.dimensions.iter().map(String::as_str).collect();
    let values = &data.values;

    match data.dtype {
        DataType::Int8 => put_typed!(group, name, &dims, node, values, i8),
        DataType::UInt8 => put_typed!(group, name, &dims, node, values, u8),
        DataType::Int16 => put_typed!(group, name, &dims, node, values, i16),
        DataType::UInt16 => put_typed!(group, name, &dims, node, values, u16),
        DataType::Int32 => put_typed!(group, name, &dims, node, values, i32),
        DataType::UInt32 => put_typed!(group, name, &dims, node, values, u32),
        DataType::Int64 => put_typed!(group, name, &dims, node, values, i64),
        DataType::UInt64 => put_typed!(group, name, &dims, node, values, u64),
        DataType::Float32 => put_typed!(group, name, &dims, node, values, f32),
        DataType::Float64 => put_typed!(group, name, &dims, node, values, f64),
        DataType::Char | DataType::String => {
            let mut variable = group.add_string_variable(name, &dims)?;
            for (attribute, value) in node.attributes() {
                variable.put_attribute(attribute, to_netcdf_value(value))?;
            }
        }
    }
    Ok(())
}
