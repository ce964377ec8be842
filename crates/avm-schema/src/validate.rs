//! # Structural Validation
//!
//! Checks a plain [`Datum`] against a [`Schema`] node. This is the low-level
//! predicate the model runtime builds on: it knows nothing about models,
//! behaviors, or coercion, only the per-kind shape rules.
//!
//! ## Accepted Forms
//!
//! | kind | accepts |
//! |---|---|
//! | null | `Null` |
//! | boolean | `Boolean` |
//! | int | `Integer` within `i32` |
//! | long | `Integer` |
//! | float, double | `Float` or `Integer` |
//! | bytes | `Bytes`, or a `String` of code points ≤ U+00FF |
//! | string | `String` |
//! | enum | `String` naming a declared symbol |
//! | fixed | as bytes, with exactly `size` bytes |
//! | array | `Array` whose elements all validate |
//! | map | `Map` whose values all validate |
//! | record | `Record` or `Map`; every declared field present (or defaulted), no others |
//! | union | anything some branch accepts |
//!
//! References are followed through [`Names`]. A reference to a name that was
//! never defined is a violation, not an error, so validation stays a pure
//! predicate.
//!
//! Validation collects every violation rather than stopping at the first,
//! each tagged with a JSON-pointer-like path into the value.

use std::fmt;

use avm_core::{json_string_to_bytes, Datum};

use crate::name::Names;
use crate::schema::{RecordSchema, Schema};

/// A single validation violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Path to the violating value, `""` for the root.
    pub path: String,
    /// Human-readable description of the violation.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "  (root): {}", self.message)
        } else {
            write!(f, "  {}: {}", self.path, self.message)
        }
    }
}

/// Collection of validation violations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Violations {
    violations: Vec<Violation>,
}

impl Violations {
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn into_inner(self) -> Vec<Violation> {
        self.violations
    }

    fn push(&mut self, path: &str, message: impl Into<String>) {
        self.violations.push(Violation {
            path: path.to_string(),
            message: message.into(),
        });
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Violations {}

/// Validate `value` against `schema`, resolving references through `names`.
///
/// # Errors
///
/// Returns every violation found, in value traversal order.
pub fn validate(schema: &Schema, value: &Datum, names: &Names) -> Result<(), Violations> {
    let mut violations = Violations::default();
    check(schema, value, names, "", &mut violations);
    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

/// True if `value` satisfies `schema`.
pub fn is_valid(schema: &Schema, value: &Datum, names: &Names) -> bool {
    let mut violations = Violations::default();
    check(schema, value, names, "", &mut violations);
    violations.is_empty()
}

fn check(schema: &Schema, value: &Datum, names: &Names, path: &str, out: &mut Violations) {
    let mismatch = |out: &mut Violations| {
        out.push(
            path,
            format!("expected {}, found {}", schema.label(), value.kind_name()),
        );
    };

    match schema {
        Schema::Null => {
            if !value.is_null() {
                mismatch(out);
            }
        }
        Schema::Boolean => {
            if value.as_bool().is_none() {
                mismatch(out);
            }
        }
        Schema::Int => match value {
            Datum::Integer(n) if i32::try_from(*n).is_err() => {
                out.push(path, format!("{n} is out of range for int"));
            }
            Datum::Integer(_) => {}
            _ => mismatch(out),
        },
        Schema::Long => {
            if !matches!(value, Datum::Integer(_)) {
                mismatch(out);
            }
        }
        Schema::Float | Schema::Double => match value {
            Datum::Float(f) if !f.is_finite() => {
                out.push(path, format!("{f} is not a finite {}", schema.label()));
            }
            Datum::Float(_) | Datum::Integer(_) => {}
            _ => mismatch(out),
        },
        Schema::String => {
            if value.as_str().is_none() {
                mismatch(out);
            }
        }
        Schema::Bytes => {
            if byte_len(value).is_none() {
                mismatch(out);
            }
        }
        Schema::Fixed(fixed) => match byte_len(value) {
            Some(len) if len == fixed.size => {}
            Some(len) => out.push(
                path,
                format!("{} expects {} bytes, found {len}", fixed.name, fixed.size),
            ),
            None => mismatch(out),
        },
        Schema::Enum(e) => match value.as_str() {
            Some(symbol) if e.symbols.iter().any(|s| s == symbol) => {}
            Some(symbol) => out.push(
                path,
                format!("'{symbol}' is not a symbol of {} {:?}", e.name, e.symbols),
            ),
            None => mismatch(out),
        },
        Schema::Array(items) => match value.as_array() {
            Some(elements) => {
                for (i, element) in elements.iter().enumerate() {
                    check(items, element, names, &format!("{path}/{i}"), out);
                }
            }
            None => mismatch(out),
        },
        Schema::Map(values) => match value {
            Datum::Map(entries) => {
                for (key, v) in entries {
                    check(values, v, names, &format!("{path}/{key}"), out);
                }
            }
            _ => mismatch(out),
        },
        Schema::Record(record) => check_record(record, value, names, path, out),
        Schema::Union(union) => {
            let matched = union.branches().iter().any(|b| is_valid(b, value, names));
            if !matched {
                let labels: Vec<String> = union.branches().iter().map(Schema::label).collect();
                out.push(
                    path,
                    format!("{} matches no branch of [{}]", value.kind_name(), labels.join(", ")),
                );
            }
        }
        Schema::Ref(name) => match names.get(&name.fullname()) {
            Some(definition) => check(definition, value, names, path, out),
            None => out.push(path, format!("unresolved reference '{name}'")),
        },
    }
}

fn check_record(record: &RecordSchema, value: &Datum, names: &Names, path: &str, out: &mut Violations) {
    let lookup = |key: &str| -> Option<&Datum> {
        match value {
            Datum::Record(fields) => fields.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            Datum::Map(entries) => entries.get(key),
            _ => None,
        }
    };
    let keys: Vec<&str> = match value {
        Datum::Record(fields) => fields.iter().map(|(k, _)| k.as_str()).collect(),
        Datum::Map(entries) => entries.keys().map(String::as_str).collect(),
        _ => {
            out.push(
                path,
                format!("expected {}, found {}", record.name, value.kind_name()),
            );
            return;
        }
    };

    for field in &record.fields {
        let field_path = format!("{path}/{}", field.name);
        match lookup(&field.name) {
            Some(v) => check(&field.schema, v, names, &field_path, out),
            None if field.default.is_some() => {}
            None => out.push(&field_path, format!("missing required field '{}'", field.name)),
        }
    }
    for key in keys {
        if record.field(key).is_none() {
            out.push(
                &format!("{path}/{key}"),
                format!("unknown field '{key}' for {}", record.name),
            );
        }
    }
}

/// Length in bytes of a bytes-like value.
fn byte_len(value: &Datum) -> Option<usize> {
    match value {
        Datum::Bytes(b) => Some(b.len()),
        Datum::String(s) => json_string_to_bytes(s).map(|b| b.len()),
        _ => None,
    }
}
