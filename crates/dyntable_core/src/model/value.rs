//! Tagged-union attribute value.
//!
//! # Responsibility
//! - Represent every attribute shape the store accepts (string, number,
//!   boolean, binary, list, nested map, null).
//! - Implement the store's `contains` predicate semantics.
//!
//! # Invariants
//! - `contains` only ever matches on `Text` (substring) and `List`
//!   (member equality); all other shapes never match.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// One attribute value inside an [`super::Item`].
///
/// Integers and floats are kept apart so integer attributes round-trip
/// exactly through document serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// UTF-8 string attribute.
    Text(String),
    /// Whole-number attribute.
    Integer(i64),
    /// Floating-point attribute.
    Float(f64),
    /// Boolean attribute.
    Boolean(bool),
    /// Raw byte payload.
    Binary(Vec<u8>),
    /// Ordered list of nested values.
    List(Vec<Value>),
    /// Nested field-to-value mapping.
    Map(BTreeMap<String, Value>),
    /// Explicit null attribute (distinct from an absent field).
    Null,
}

impl Value {
    /// Short stable name of this value shape, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Boolean(_) => "boolean",
            Self::Binary(_) => "binary",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Null => "null",
        }
    }

    /// Returns the string payload for `Text` values.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    /// Store `contains` predicate.
    ///
    /// - `Text`: true when `needle` is a substring of the payload.
    /// - `List`: true when some element equals `Text(needle)`.
    /// - Everything else: false.
    pub fn contains(&self, needle: &str) -> bool {
        match self {
            Self::Text(text) => text.contains(needle),
            Self::List(values) => values
                .iter()
                .any(|value| matches!(value, Self::Text(text) if text == needle)),
            _ => false,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) => write!(f, "{text}"),
            Self::Integer(number) => write!(f, "{number}"),
            Self::Float(number) => write!(f, "{number}"),
            Self::Boolean(flag) => write!(f, "{flag}"),
            Self::Binary(bytes) => write!(f, "<{} bytes>", bytes.len()),
            Self::List(values) => write!(f, "<list of {}>", values.len()),
            Self::Map(fields) => write!(f, "<map of {}>", fields.len()),
            Self::Null => write!(f, "null"),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Self::List(value)
    }
}

impl From<Vec<&str>> for Value {
    fn from(value: Vec<&str>) -> Self {
        Self::List(value.into_iter().map(Value::from).collect())
    }
}
