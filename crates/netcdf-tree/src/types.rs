//! Variable data types.

use num_traits::{NumCast, ToPrimitive};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage type of a variable's values.
///
/// Values are held in memory as `f64`; the data type decides how they are
/// rounded and how they are written back out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
    Char,
    String,
}

impl DataType {
    /// Parse a dtype name. Accepts NumPy names and codes as well as the
    /// NetCDF CDL type names.
    pub fn from_name(name: &str) -> Option<Self> {
        let dtype = match name.trim().to_lowercase().as_str() {
            "int8" | "i1" | "byte" => DataType::Int8,
            "uint8" | "u1" | "ubyte" => DataType::UInt8,
            "int16" | "i2" | "short" => DataType::Int16,
            "uint16" | "u2" | "ushort" => DataType::UInt16,
            "int32" | "i4" | "int" => DataType::Int32,
            "uint32" | "u4" | "uint" => DataType::UInt32,
            "int64" | "i8" | "int64_t" => DataType::Int64,
            "uint64" | "u8" | "uint64_t" => DataType::UInt64,
            "float32" | "f4" | "float" => DataType::Float32,
            "float64" | "f8" | "double" => DataType::Float64,
            "char" | "s1" => DataType::Char,
            "string" | "str" => DataType::String,
            _ => return None,
        };
        Some(dtype)
    }

    /// NumPy-style name of the type.
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Int8 => "int8",
            DataType::UInt8 => "uint8",
            DataType::Int16 => "int16",
            DataType::UInt16 => "uint16",
            DataType::Int32 => "int32",
            DataType::UInt32 => "uint32",
            DataType::Int64 => "int64",
            DataType::UInt64 => "uint64",
            DataType::Float32 => "float32",
            DataType::Float64 => "float64",
            DataType::Char => "char",
            DataType::String => "string",
        }
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, DataType::Char | DataType::String)
    }

    /// Round-trip a value through this type.
    ///
    /// Integer types truncate toward zero; values that do not fit become NaN.
    /// Non-numeric types pass the value through unchanged.
    pub fn coerce(&self, value: f64) -> f64 {
        match self {
            DataType::Int8 => cast_through::<i8>(value),
            DataType::UInt8 => cast_through::<u8>(value),
            DataType::Int16 => cast_through::<i16>(value),
            DataType::UInt16 => cast_through::<u16>(value),
            DataType::Int32 => cast_through::<i32>(value),
            DataType::UInt32 => cast_through::<u32>(value),
            DataType::Int64 => cast_through::<i64>(value),
            DataType::UInt64 => cast_through::<u64>(value),
            DataType::Float32 => value as f32 as f64,
            DataType::Float64 | DataType::Char | DataType::String => value,
        }
    }
}

fn cast_through<T: NumCast + ToPrimitive>(value: f64) -> f64 {
    num_traits::cast::<f64, T>(value)
        .and_then(|typed| typed.to_f64())
        .unwrap_or(f64::NAN)
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
