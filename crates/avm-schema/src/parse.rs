//! # Schema Parser
//!
//! Parses Avro schema JSON into a [`Schema`] tree, recording every named
//! definition in a shared [`Names`] context.
//!
//! ## Reference Resolution
//!
//! A type name that is not a primitive keyword parses to [`Schema::Ref`]
//! whether or not its definition has been seen yet. This is what lets a
//! record refer to itself, or to a type that is registered later: the
//! reference is only followed when a value is validated.
//!
//! ## Re-definition
//!
//! Defining a fullname that is already defined is accepted when the two
//! definitions have the same structural fingerprint and rejected with
//! [`SchemaError::Conflicting`] otherwise. The comparison ignores object key
//! order and whether nested named types are spelled inline or by name.
//!
//! ## Atomicity
//!
//! Definitions are staged while a document is parsed and only committed to
//! `Names` once the whole document parsed cleanly. A failed parse leaves the
//! context untouched.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use avm_core::{CanonicalizationError, SchemaFingerprint};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::name::{is_identifier, Name, Names};
use crate::schema::{
    EnumSchema, FixedSchema, RecordField, RecordSchema, Schema, SchemaKind, UnionSchema,
};

/// Error raised while parsing or loading a schema.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// The schema JSON is malformed.
    #[error("schema parse error at '{path}': {reason}")]
    Parse {
        /// JSON-pointer-like location inside the schema document.
        path: String,
        /// What is wrong at that location.
        reason: String,
    },

    /// A fullname was re-defined with a structurally different schema.
    #[error("conflicting definitions for '{fullname}': existing {existing}, incoming {incoming}")]
    Conflicting {
        fullname: String,
        existing: SchemaFingerprint,
        incoming: SchemaFingerprint,
    },

    /// The schema source could not be read or is not JSON.
    #[error("schema load error for '{source_name}': {reason}")]
    Load {
        /// File path or other source identifier.
        source_name: String,
        reason: String,
    },

    /// A reference names a type that was never defined.
    #[error("unresolved schema reference '{fullname}'")]
    Unresolved { fullname: String },

    /// Fingerprinting a definition failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),
}

impl SchemaError {
    fn parse(path: &str, reason: impl Into<String>) -> Self {
        SchemaError::Parse {
            path: if path.is_empty() { "/".to_string() } else { path.to_string() },
            reason: reason.into(),
        }
    }
}

/// Parse a schema from a JSON value.
///
/// # Errors
///
/// Returns `SchemaError::Parse` for malformed schemas and
/// `SchemaError::Conflicting` when a fullname is re-defined differently.
pub fn parse_value(value: &Value, names: &mut Names) -> Result<Schema, SchemaError> {
    let mut parser = Parser {
        names,
        pending: Vec::new(),
    };
    let schema = parser.parse(value, None, "")?;
    let pending = std::mem::take(&mut parser.pending);
    for (fullname, definition, fingerprint) in pending {
        tracing::debug!(%fullname, %fingerprint, "defined named schema");
        names.define(fullname, definition, fingerprint);
    }
    Ok(schema)
}

/// Parse a schema from JSON text.
///
/// # Errors
///
/// Returns `SchemaError::Load` if `text` is not JSON, otherwise as
/// [`parse_value`].
pub fn parse_str(text: &str, names: &mut Names) -> Result<Schema, SchemaError> {
    let value: Value = serde_json::from_str(text).map_err(|e| SchemaError::Load {
        source_name: "<string>".to_string(),
        reason: format!("invalid JSON: {e}"),
    })?;
    parse_value(&value, names)
}

/// Parse a schema from a reader yielding JSON text.
///
/// # Errors
///
/// Returns `SchemaError::Load` if the reader fails or its content is not
/// JSON, otherwise as [`parse_value`].
pub fn parse_reader(mut reader: impl Read, names: &mut Names) -> Result<Schema, SchemaError> {
    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .map_err(|e| SchemaError::Load {
            source_name: "<reader>".to_string(),
            reason: format!("cannot read: {e}"),
        })?;
    parse_str(&text, names)
}

/// Parse a schema file (`.avsc`).
///
/// # Errors
///
/// Returns `SchemaError::Load` if the file cannot be read or is not JSON,
/// otherwise as [`parse_value`].
pub fn parse_file(path: impl AsRef<Path>, names: &mut Names) -> Result<Schema, SchemaError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| SchemaError::Load {
        source_name: path.display().to_string(),
        reason: format!("cannot read file: {e}"),
    })?;
    let value: Value = serde_json::from_str(&text).map_err(|e| SchemaError::Load {
        source_name: path.display().to_string(),
        reason: format!("invalid JSON: {e}"),
    })?;
    parse_value(&value, names)
}

struct Parser<'a> {
    names: &'a Names,
    /// Definitions seen in this document, committed on success.
    pending: Vec<(String, Schema, SchemaFingerprint)>,
}

impl Parser<'_> {
    fn parse(&mut self, value: &Value, namespace: Option<&str>, path: &str) -> Result<Schema, SchemaError> {
        match value {
            Value::String(type_name) => self.parse_type_name(type_name, namespace, path),
            Value::Array(branches) => self.parse_union(branches, namespace, path),
            Value::Object(obj) => self.parse_object(obj, namespace, path),
            other => Err(SchemaError::parse(
                path,
                format!("expected a type name, object, or union array, found {other}"),
            )),
        }
    }

    fn parse_type_name(&self, type_name: &str, namespace: Option<&str>, path: &str) -> Result<Schema, SchemaError> {
        if let Some(kind) = SchemaKind::primitive(type_name) {
            return Schema::primitive(kind)
                .ok_or_else(|| SchemaError::parse(path, "not a primitive type"));
        }
        if matches!(type_name, "record" | "error" | "enum" | "fixed" | "array" | "map") {
            return Err(SchemaError::parse(
                path,
                format!("complex type '{type_name}' must be declared as an object"),
            ));
        }

        let namespace = namespace.or(self.names.default_namespace());
        let name = Name::new(type_name, namespace);
        if !name.is_valid() {
            return Err(SchemaError::parse(path, format!("invalid type name '{type_name}'")));
        }
        // An unqualified reference falls back to the null namespace when
        // nothing is defined under the enclosing one.
        if !type_name.contains('.') && !self.is_defined(&name.fullname()) && self.is_defined(type_name) {
            return Ok(Schema::Ref(Name::new(type_name, None)));
        }
        Ok(Schema::Ref(name))
    }

    fn parse_object(&mut self, obj: &Map<String, Value>, namespace: Option<&str>, path: &str) -> Result<Schema, SchemaError> {
        let ty = obj
            .get("type")
            .ok_or_else(|| SchemaError::parse(path, "missing 'type' attribute"))?;
        let type_path = format!("{path}/type");
        match ty {
            Value::String(t) => match t.as_str() {
                "record" | "error" => self.parse_record(obj, namespace, path),
                "enum" => self.parse_enum(obj, namespace, path),
                "fixed" => self.parse_fixed(obj, namespace, path),
                "array" => {
                    let items = obj
                        .get("items")
                        .ok_or_else(|| SchemaError::parse(path, "array is missing 'items'"))?;
                    let items = self.parse(items, namespace, &format!("{path}/items"))?;
                    Ok(Schema::Array(Box::new(items)))
                }
                "map" => {
                    let values = obj
                        .get("values")
                        .ok_or_else(|| SchemaError::parse(path, "map is missing 'values'"))?;
                    let values = self.parse(values, namespace, &format!("{path}/values"))?;
                    Ok(Schema::Map(Box::new(values)))
                }
                other => self.parse_type_name(other, namespace, &type_path),
            },
            Value::Object(_) | Value::Array(_) => self.parse(ty, namespace, &type_path),
            other => Err(SchemaError::parse(&type_path, format!("invalid type {other}"))),
        }
    }

    fn parse_name(&self, obj: &Map<String, Value>, namespace: Option<&str>, path: &str) -> Result<Name, SchemaError> {
        let raw = obj
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| SchemaError::parse(path, "named type is missing a string 'name'"))?;
        let explicit_ns = match obj.get("namespace") {
            None | Some(Value::Null) => None,
            Some(Value::String(ns)) => Some(ns.as_str()),
            Some(other) => {
                return Err(SchemaError::parse(path, format!("'namespace' must be a string, found {other}")))
            }
        };
        let name = Name::new(raw, explicit_ns.or(namespace).or(self.names.default_namespace()));
        if !name.is_valid() {
            return Err(SchemaError::parse(path, format!("invalid name '{raw}'")));
        }
        if SchemaKind::primitive(&name.fullname()).is_some() {
            return Err(SchemaError::parse(path, format!("'{raw}' is a primitive type name")));
        }
        Ok(name)
    }

    fn parse_record(&mut self, obj: &Map<String, Value>, namespace: Option<&str>, path: &str) -> Result<Schema, SchemaError> {
        let name = self.parse_name(obj, namespace, path)?;
        let raw_fields = obj
            .get("fields")
            .and_then(Value::as_array)
            .ok_or_else(|| SchemaError::parse(path, "record is missing a 'fields' array"))?;

        let field_ns = name.namespace.clone();
        let mut seen = HashSet::new();
        let mut fields = Vec::with_capacity(raw_fields.len());
        for (position, raw) in raw_fields.iter().enumerate() {
            let field_path = format!("{path}/fields/{position}");
            let field = raw
                .as_object()
                .ok_or_else(|| SchemaError::parse(&field_path, "field must be an object"))?;
            let field_name = field
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| SchemaError::parse(&field_path, "field is missing a string 'name'"))?;
            if !is_identifier(field_name) {
                return Err(SchemaError::parse(&field_path, format!("invalid field name '{field_name}'")));
            }
            if !seen.insert(field_name.to_string()) {
                return Err(SchemaError::parse(&field_path, format!("duplicate field name '{field_name}'")));
            }
            let field_type = field
                .get("type")
                .ok_or_else(|| SchemaError::parse(&field_path, "field is missing 'type'"))?;
            let schema = self.parse(field_type, field_ns.as_deref(), &format!("{field_path}/type"))?;
            fields.push(RecordField {
                name: field_name.to_string(),
                schema,
                position,
                default: field.get("default").cloned(),
                doc: field.get("doc").and_then(Value::as_str).map(str::to_string),
            });
        }

        let schema = Schema::Record(RecordSchema {
            name,
            doc: obj.get("doc").and_then(Value::as_str).map(str::to_string),
            aliases: string_list(obj.get("aliases")),
            fields,
        });
        self.define(schema)
    }

    fn parse_enum(&mut self, obj: &Map<String, Value>, namespace: Option<&str>, path: &str) -> Result<Schema, SchemaError> {
        let name = self.parse_name(obj, namespace, path)?;
        let raw_symbols = obj
            .get("symbols")
            .and_then(Value::as_array)
            .ok_or_else(|| SchemaError::parse(path, "enum is missing a 'symbols' array"))?;
        let mut symbols = Vec::with_capacity(raw_symbols.len());
        for (i, raw) in raw_symbols.iter().enumerate() {
            let symbol_path = format!("{path}/symbols/{i}");
            let symbol = raw
                .as_str()
                .ok_or_else(|| SchemaError::parse(&symbol_path, "symbol must be a string"))?;
            if !is_identifier(symbol) {
                return Err(SchemaError::parse(&symbol_path, format!("invalid symbol '{symbol}'")));
            }
            if symbols.iter().any(|s| s == symbol) {
                return Err(SchemaError::parse(&symbol_path, format!("duplicate symbol '{symbol}'")));
            }
            symbols.push(symbol.to_string());
        }
        let schema = Schema::Enum(EnumSchema {
            name,
            doc: obj.get("doc").and_then(Value::as_str).map(str::to_string),
            symbols,
        });
        self.define(schema)
    }

    fn parse_fixed(&mut self, obj: &Map<String, Value>, namespace: Option<&str>, path: &str) -> Result<Schema, SchemaError> {
        let name = self.parse_name(obj, namespace, path)?;
        let size = obj
            .get("size")
            .and_then(Value::as_u64)
            .and_then(|s| usize::try_from(s).ok())
            .ok_or_else(|| SchemaError::parse(path, "fixed is missing a non-negative integer 'size'"))?;
        self.define(Schema::Fixed(FixedSchema { name, size }))
    }

    fn parse_union(&mut self, raw: &[Value], namespace: Option<&str>, path: &str) -> Result<Schema, SchemaError> {
        if raw.is_empty() {
            return Err(SchemaError::parse(path, "union has no branches"));
        }
        let mut branches = Vec::with_capacity(raw.len());
        let mut seen = HashSet::new();
        for (i, value) in raw.iter().enumerate() {
            let branch_path = format!("{path}/{i}");
            let branch = self.parse(value, namespace, &branch_path)?;
            if matches!(branch, Schema::Union(_)) {
                return Err(SchemaError::parse(&branch_path, "unions may not immediately contain unions"));
            }
            let key = match branch.fullname() {
                Some(fullname) => fullname,
                None => branch.label(),
            };
            if !seen.insert(key.clone()) {
                return Err(SchemaError::parse(&branch_path, format!("duplicate union branch '{key}'")));
            }
            branches.push(branch);
        }
        Ok(Schema::Union(UnionSchema::new(branches)))
    }

    fn is_defined(&self, fullname: &str) -> bool {
        self.names.contains(fullname) || self.pending.iter().any(|(n, _, _)| n == fullname)
    }

    /// Stage a named definition after checking it against any existing one.
    fn define(&mut self, schema: Schema) -> Result<Schema, SchemaError> {
        let fullname = schema.fullname().unwrap_or_default();
        let incoming = SchemaFingerprint::of_json(&schema.to_shallow_json())?;

        let existing = self.names.fingerprint(&fullname).or_else(|| {
            self.pending
                .iter()
                .find(|(n, _, _)| *n == fullname)
                .map(|(_, _, fp)| *fp)
        });
        match existing {
            Some(existing) if existing != incoming => Err(SchemaError::Conflicting {
                fullname,
                existing,
                incoming,
            }),
            Some(_) => Ok(schema),
            None => {
                self.pending.push((fullname, schema.clone(), incoming));
                Ok(schema)
            }
        }
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> Result<Schema, SchemaError> {
        parse_value(&value, &mut Names::new(None))
    }

    #[test]
    fn test_primitives() {
        for kind in SchemaKind::PRIMITIVES {
            let schema = parse(json!(kind.as_str())).unwrap();
            assert_eq!(schema.kind(), Some(kind));
            let wrapped = parse(json!({"type": kind.as_str()})).unwrap();
            assert_eq!(wrapped.kind(), Some(kind));
        }
    }

    #[test]
    fn test_record_fields_in_order() {
        let schema = parse(json!({
            "type": "record",
            "name": "Date",
            "namespace": "example.avro",
            "fields": [
                {"name": "year", "type": "int"},
                {"name": "month", "type": "int"},
                {"name": "day", "type": "int", "default": 1}
            ]
        }))
        .unwrap();
        let Schema::Record(r) = schema else { panic!("expected record") };
        assert_eq!(r.name.fullname(), "example.avro.Date");
        assert_eq!(r.field_names().collect::<Vec<_>>(), vec!["year", "month", "day"]);
        assert_eq!(r.fields[2].position, 2);
        assert_eq!(r.fields[2].default, Some(json!(1)));
    }

    #[test]
    fn test_self_reference_parses_to_ref() {
        let mut names = Names::new(None);
        let schema = parse_value(
            &json!({
                "type": "record",
                "name": "Node",
                "fields": [
                    {"name": "value", "type": "long"},
                    {"name": "next", "type": ["null", "Node"]}
                ]
            }),
            &mut names,
        )
        .unwrap();
        let Schema::Record(r) = schema else { panic!("expected record") };
        let Schema::Union(u) = &r.fields[1].schema else { panic!("expected union") };
        assert_eq!(u.branches()[1], Schema::Ref(Name::new("Node", None)));
        assert!(names.contains("Node"));
    }

    #[test]
    fn test_nested_names_inherit_namespace() {
        let mut names = Names::new(None);
        parse_value(
            &json!({
                "type": "record",
                "name": "User",
                "namespace": "example.avro",
                "fields": [
                    {"name": "job", "type": {"type": "enum", "name": "Occupation", "symbols": ["STUDENT"]}},
                    {"name": "again", "type": "Occupation"}
                ]
            }),
            &mut names,
        )
        .unwrap();
        assert_eq!(names.fullnames(), vec!["example.avro.Occupation", "example.avro.User"]);
    }

    #[test]
    fn test_default_namespace() {
        let mut names = Names::new(Some("example.avro"));
        let schema = parse_value(&json!({"type": "fixed", "name": "Hash", "size": 16}), &mut names).unwrap();
        assert_eq!(schema.fullname().as_deref(), Some("example.avro.Hash"));
    }

    #[test]
    fn test_unqualified_reference_falls_back_to_null_namespace() {
        let mut names = Names::new(None);
        parse_value(&json!({"type": "enum", "name": "Color", "symbols": ["RED"]}), &mut names).unwrap();
        let schema = parse_value(
            &json!({
                "type": "record",
                "name": "Paint",
                "namespace": "shop",
                "fields": [{"name": "color", "type": "Color"}]
            }),
            &mut names,
        )
        .unwrap();
        let Schema::Record(r) = schema else { panic!("expected record") };
        assert_eq!(r.fields[0].schema, Schema::Ref(Name::new("Color", None)));
    }

    #[test]
    fn test_identical_redefinition_is_accepted() {
        let mut names = Names::new(None);
        let a = json!({"type": "enum", "name": "E", "symbols": ["A", "B"]});
        let b: Value = serde_json::from_str(r#"{"symbols": ["A", "B"], "name": "E", "type": "enum"}"#).unwrap();
        parse_value(&a, &mut names).unwrap();
        parse_value(&b, &mut names).unwrap();
        assert_eq!(names.len(), 1);
    }

    #[test]
    fn test_conflicting_redefinition_is_rejected() {
        let mut names = Names::new(None);
        parse_value(&json!({"type": "enum", "name": "E", "symbols": ["A", "B"]}), &mut names).unwrap();
        let err = parse_value(&json!({"type": "enum", "name": "E", "symbols": ["A", "C"]}), &mut names).unwrap_err();
        assert!(matches!(err, SchemaError::Conflicting { ref fullname, .. } if fullname == "E"));
    }

    #[test]
    fn test_failed_parse_leaves_names_untouched() {
        let mut names = Names::new(None);
        let err = parse_value(
            &json!({
                "type": "record",
                "name": "Outer",
                "fields": [
                    {"name": "inner", "type": {"type": "fixed", "name": "Inner", "size": 4}},
                    {"name": "bad", "type": "record"}
                ]
            }),
            &mut names,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::Parse { .. }));
        assert!(names.is_empty());
    }

    #[test]
    fn test_parse_errors() {
        let cases = [
            json!({"name": "NoType"}),
            json!({"type": "record", "name": "R"}),
            json!({"type": "record", "fields": []}),
            json!({"type": "record", "name": "R", "fields": [{"name": "a", "type": "int"}, {"name": "a", "type": "int"}]}),
            json!({"type": "enum", "name": "E", "symbols": ["A", "A"]}),
            json!({"type": "enum", "name": "E", "symbols": ["not valid"]}),
            json!({"type": "fixed", "name": "F", "size": -1}),
            json!({"type": "array"}),
            json!({"type": "map"}),
            json!([]),
            json!(["null", ["int", "string"]]),
            json!(["int", "int"]),
            json!({"type": "record", "name": "1bad", "fields": []}),
            json!(42),
            json!("record"),
        ];
        for case in cases {
            let result = parse(case.clone());
            assert!(
                matches!(result, Err(SchemaError::Parse { .. })),
                "expected parse error for {case}, got {result:?}"
            );
        }
    }

    #[test]
    fn test_parse_error_reports_path() {
        let err = parse(json!({
            "type": "record",
            "name": "R",
            "fields": [{"name": "a", "type": {"type": "array"}}]
        }))
        .unwrap_err();
        match err {
            SchemaError::Parse { path, .. } => assert_eq!(path, "/fields/0/type"),
            other => panic!("Expected Parse, got: {other}"),
        }
    }

    #[test]
    fn test_parse_str_rejects_non_json() {
        let err = parse_str("{not json", &mut Names::new(None)).unwrap_err();
        assert!(matches!(err, SchemaError::Load { .. }));
    }

    #[test]
    fn test_parse_reader() {
        let text = r#"{"type": "map", "values": "long"}"#;
        let schema = parse_reader(text.as_bytes(), &mut Names::new(None)).unwrap();
        assert_eq!(schema, Schema::Map(Box::new(Schema::Long)));
    }

    #[test]
    fn test_parse_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Int.avsc");
        std::fs::write(&path, "\"int\"").unwrap();
        assert_eq!(parse_file(&path, &mut Names::new(None)).unwrap(), Schema::Int);

        let missing = dir.path().join("missing.avsc");
        let err = parse_file(&missing, &mut Names::new(None)).unwrap_err();
        assert!(matches!(err, SchemaError::Load { .. }));
    }

    #[test]
    fn test_forward_reference_is_allowed() {
        let mut names = Names::new(None);
        let schema = parse_value(&json!({"type": "array", "items": "later.Thing"}), &mut names).unwrap();
        assert_eq!(schema, Schema::Array(Box::new(Schema::Ref(Name::from_fullname("later.Thing")))));
        assert!(names.is_empty());
    }
}
