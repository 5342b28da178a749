//! Attribute values and the attribute store capability.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Value of a group or variable attribute.
///
/// Integers and floats are kept apart so that a value read as `0` is
/// written back as an integer and `0.0` as a float.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Int(i64),
    Float(f64),
    Text(String),
    Ints(Vec<i64>),
    Floats(Vec<f64>),
    Texts(Vec<String>),
}

impl AttributeValue {
    /// The value as a string slice, if it is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// The value as a single number, if it is a scalar number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Int(value) => Some(*value as f64),
            AttributeValue::Float(value) => Some(*value),
            _ => None,
        }
    }

    /// The value as a list of numbers. Scalars become one-element lists.
    pub fn as_f64_list(&self) -> Option<Vec<f64>> {
        match self {
            AttributeValue::Int(_) | AttributeValue::Float(_) => self.as_f64().map(|v| vec![v]),
            AttributeValue::Ints(values) => Some(values.iter().map(|&v| v as f64).collect()),
            AttributeValue::Floats(values) => Some(values.clone()),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Int(value) => write!(f, "{}", value),
            AttributeValue::Float(value) => write!(f, "{}", value),
            AttributeValue::Text(text) => f.write_str(text),
            AttributeValue::Ints(values) => write_list(f, values),
            AttributeValue::Floats(values) => write_list(f, values),
            AttributeValue::Texts(values) => write_list(f, values),
        }
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, values: &[T]) -> fmt::Result {
    let joined: Vec<String> = values.iter().map(ToString::to_string).collect();
    write!(f, "[{}]", joined.join(", "))
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Int(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Float(value)
    }
}

impl From<Vec<f64>> for AttributeValue {
    fn from(values: Vec<f64>) -> Self {
        AttributeValue::Floats(values)
    }
}

impl From<Vec<i64>> for AttributeValue {
    fn from(values: Vec<i64>) -> Self {
        AttributeValue::Ints(values)
    }
}

/// Uniform get/set/delete of attributes on a group or variable.
pub trait AttributeStore {
    /// All attributes, ordered by name.
    fn attributes(&self) -> &BTreeMap<String, AttributeValue>;

    /// Mutable access to the attribute table.
    fn attributes_mut(&mut self) -> &mut BTreeMap<String, AttributeValue>;

    fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes().get(name)
    }

    fn has_attribute(&self, name: &str) -> bool {
        self.attributes().contains_key(name)
    }

    /// Set or overwrite an attribute.
    fn set_attribute(&mut self, name: &str, value: AttributeValue) {
        self.attributes_mut().insert(name.to_string(), value);
    }

    /// Remove an attribute. Removing an absent attribute is a no-op.
    fn delete_attribute(&mut self, name: &str) -> Option<AttributeValue> {
        self.attributes_mut().remove(name)
    }
}
