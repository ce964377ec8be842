//! # Datum: The Plain-Data Value Tree
//!
//! `Datum` is the only representation a model instance ever stores. It is a
//! tree of scalars, ordered sequences, and ordered mappings. It has no variant
//! that can hold a model instance, so a value that reaches a `Datum` has
//! already been flattened: nesting one instance inside another always goes
//! through the instance's canonical value.
//!
//! ## Records and Maps
//!
//! Two mapping variants exist:
//!
//! - [`Datum::Map`] is keyed by string and iterates in key order. It is the
//!   canonical form of an Avro `map` and the usual *input* form of a record
//!   (e.g. a JSON object).
//! - [`Datum::Record`] preserves declaration order. Records are always stored
//!   in this form once conformed, so JSON text for a record lists fields in
//!   the order the schema declares them.
//!
//! ## JSON Text
//!
//! `Datum` implements `Serialize` following the Avro JSON data encoding:
//! `bytes` become a string whose code points U+0000..=U+00FF are the byte
//! values. Output is deterministic for a given datum.

use std::collections::BTreeMap;
use std::fmt;

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::Value;

use crate::error::CoreError;

/// A plain-data value: scalars, sequences, and mappings only.
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    /// Absence of a value.
    Null,
    /// A boolean.
    Boolean(bool),
    /// Any integral number. Range limits are a schema concern.
    Integer(i64),
    /// Any floating-point number.
    Float(f64),
    /// A byte sequence.
    Bytes(Vec<u8>),
    /// A UTF-8 string.
    String(String),
    /// An ordered sequence.
    Array(Vec<Datum>),
    /// A string-keyed mapping, iterated in key order.
    Map(BTreeMap<String, Datum>),
    /// A mapping that keeps field declaration order.
    Record(Vec<(String, Datum)>),
}

impl Datum {
    /// Build a record datum from `(name, value)` pairs, keeping their order.
    pub fn record<K, V, I>(fields: I) -> Self
    where
        K: Into<String>,
        V: Into<Datum>,
        I: IntoIterator<Item = (K, V)>,
    {
        Datum::Record(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Build a map datum from `(key, value)` pairs.
    pub fn map<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<Datum>,
        I: IntoIterator<Item = (K, V)>,
    {
        Datum::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Build a bytes datum.
    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Datum::Bytes(bytes.into())
    }

    /// Parse JSON text into a datum.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidJson` if `text` is not valid JSON.
    pub fn from_json_str(text: &str) -> Result<Self, CoreError> {
        let value: Value = serde_json::from_str(text)?;
        Ok(Datum::from(value))
    }

    /// Short lowercase name of the variant, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Datum::Null => "null",
            Datum::Boolean(_) => "boolean",
            Datum::Integer(_) => "integer",
            Datum::Float(_) => "float",
            Datum::Bytes(_) => "bytes",
            Datum::String(_) => "string",
            Datum::Array(_) => "array",
            Datum::Map(_) => "map",
            Datum::Record(_) => "record",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Datum::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Datum::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Datum::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view: integers widen to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Datum::Float(f) => Some(*f),
            Datum::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Datum::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Datum::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Datum]> {
        match self {
            Datum::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Look up a field by name in a record or a map.
    pub fn field(&self, name: &str) -> Option<&Datum> {
        match self {
            Datum::Record(fields) => fields.iter().find(|(k, _)| k == name).map(|(_, v)| v),
            Datum::Map(entries) => entries.get(name),
            _ => None,
        }
    }

    /// Serialize to compact JSON text.
    pub fn to_text(&self) -> String {
        self.to_string()
    }

    /// Convert to a `serde_json::Value`.
    ///
    /// `serde_json` objects are key-sorted, so record declaration order is
    /// not preserved here; use [`Datum::to_text`] when order matters.
    pub fn to_json(&self) -> Value {
        match self {
            Datum::Null => Value::Null,
            Datum::Boolean(b) => Value::Bool(*b),
            Datum::Integer(i) => Value::from(*i),
            Datum::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Datum::Bytes(b) => Value::String(bytes_to_json_string(b)),
            Datum::String(s) => Value::String(s.clone()),
            Datum::Array(items) => Value::Array(items.iter().map(Datum::to_json).collect()),
            Datum::Map(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Datum::Record(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

/// Encode bytes as a JSON string per the Avro JSON encoding (one code point
/// per byte, U+0000..=U+00FF).
pub fn bytes_to_json_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Decode an Avro-JSON-encoded byte string. Returns `None` if any code point
/// is above U+00FF.
pub fn json_string_to_bytes(s: &str) -> Option<Vec<u8>> {
    s.chars().map(|c| u8::try_from(u32::from(c)).ok()).collect()
}

impl Serialize for Datum {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Datum::Null => serializer.serialize_unit(),
            Datum::Boolean(b) => serializer.serialize_bool(*b),
            Datum::Integer(i) => serializer.serialize_i64(*i),
            Datum::Float(f) => serializer.serialize_f64(*f),
            Datum::Bytes(b) => serializer.serialize_str(&bytes_to_json_string(b)),
            Datum::String(s) => serializer.serialize_str(s),
            Datum::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Datum::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
            Datum::Record(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (k, v) in fields {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

impl From<Value> for Datum {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Datum::Null,
            Value::Bool(b) => Datum::Boolean(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Datum::Integer(i),
                None => n.as_f64().map(Datum::Float).unwrap_or(Datum::Null),
            },
            Value::String(s) => Datum::String(s),
            Value::Array(items) => Datum::Array(items.into_iter().map(Datum::from).collect()),
            Value::Object(map) => {
                Datum::Map(map.into_iter().map(|(k, v)| (k, Datum::from(v))).collect())
            }
        }
    }
}

impl From<&Value> for Datum {
    fn from(value: &Value) -> Self {
        Datum::from(value.clone())
    }
}

impl From<bool> for Datum {
    fn from(b: bool) -> Self {
        Datum::Boolean(b)
    }
}

impl From<i32> for Datum {
    fn from(i: i32) -> Self {
        Datum::Integer(i64::from(i))
    }
}

impl From<i64> for Datum {
    fn from(i: i64) -> Self {
        Datum::Integer(i)
    }
}

impl From<f32> for Datum {
    fn from(f: f32) -> Self {
        Datum::Float(f64::from(f))
    }
}

impl From<f64> for Datum {
    fn from(f: f64) -> Self {
        Datum::Float(f)
    }
}

impl From<&str> for Datum {
    fn from(s: &str) -> Self {
        Datum::String(s.to_string())
    }
}

impl From<String> for Datum {
    fn from(s: String) -> Self {
        Datum::String(s)
    }
}

impl From<Vec<Datum>> for Datum {
    fn from(items: Vec<Datum>) -> Self {
        Datum::Array(items)
    }
}

impl From<BTreeMap<String, Datum>> for Datum {
    fn from(entries: BTreeMap<String, Datum>) -> Self {
        Datum::Map(entries)
    }
}

impl<T: Into<Datum>> From<Option<T>> for Datum {
    fn from(value: Option<T>) -> Self {
        value.map_or(Datum::Null, Into::into)
    }
}

impl FromIterator<Datum> for Datum {
    fn from_iter<I: IntoIterator<Item = Datum>>(iter: I) -> Self {
        Datum::Array(iter.into_iter().collect())
    }
}
