//! # Scalar Coercion
//!
//! The fixed per-kind coercion functions for primitive, enum, and fixed
//! models. Each takes an input [`Datum`] and returns its canonical form or
//! the reason it is rejected.
//!
//! | kind | accepts | canonical form |
//! |---|---|---|
//! | null | `Null` | `Null` |
//! | boolean | `Boolean` | `Boolean` |
//! | int | `Integer` within `i32` | `Integer` |
//! | long | `Integer` | `Integer` |
//! | float, double | `Integer` or finite `Float` | `Float` |
//! | bytes | `Bytes`, or a `String` of code points ≤ U+00FF | `Bytes` |
//! | string | `String` | `String` |
//! | enum | `String` naming a symbol | `String` |
//! | fixed | as bytes, exactly `size` long | `Bytes` |
//!
//! Floats are never narrowed to integers.

use avm_core::{json_string_to_bytes, Datum};
use avm_schema::SchemaKind;

/// Coerce a value to a primitive kind.
pub fn coerce_primitive(kind: SchemaKind, value: Datum) -> Result<Datum, String> {
    match (kind, value) {
        (SchemaKind::Null, Datum::Null) => Ok(Datum::Null),
        (SchemaKind::Boolean, v @ Datum::Boolean(_)) => Ok(v),
        (SchemaKind::Int, Datum::Integer(n)) => match i32::try_from(n) {
            Ok(_) => Ok(Datum::Integer(n)),
            Err(_) => Err(format!("{n} is out of range for int")),
        },
        (SchemaKind::Long, v @ Datum::Integer(_)) => Ok(v),
        (SchemaKind::Float | SchemaKind::Double, Datum::Integer(n)) => Ok(Datum::Float(n as f64)),
        (SchemaKind::Float | SchemaKind::Double, Datum::Float(f)) if !f.is_finite() => {
            Err(format!("{f} has no JSON representation"))
        }
        (SchemaKind::Float | SchemaKind::Double, v @ Datum::Float(_)) => Ok(v),
        (SchemaKind::Bytes, value) => to_bytes(value),
        (SchemaKind::String, v @ Datum::String(_)) => Ok(v),
        (kind, value) => Err(format!("expected {kind}, found {}", value.kind_name())),
    }
}

/// Coerce a value to one of `symbols`.
pub fn coerce_enum(symbols: &[String], value: Datum) -> Result<Datum, String> {
    match value {
        Datum::String(s) if symbols.contains(&s) => Ok(Datum::String(s)),
        Datum::String(s) => Err(format!("'{s}' is not one of {symbols:?}")),
        other => Err(format!("expected enum symbol, found {}", other.kind_name())),
    }
}

/// Coerce a value to exactly `size` bytes.
pub fn coerce_fixed(size: usize, value: Datum) -> Result<Datum, String> {
    match to_bytes(value)? {
        Datum::Bytes(b) if b.len() == size => Ok(Datum::Bytes(b)),
        Datum::Bytes(b) => Err(format!("expected {size} bytes, found {}", b.len())),
        other => Err(format!("expected bytes, found {}", other.kind_name())),
    }
}

fn to_bytes(value: Datum) -> Result<Datum, String> {
    match value {
        Datum::Bytes(b) => Ok(Datum::Bytes(b)),
        Datum::String(s) => json_string_to_bytes(&s)
            .map(Datum::Bytes)
            .ok_or_else(|| "string has code points above U+00FF".to_string()),
        other => Err(format!("expected bytes, found {}", other.kind_name())),
    }
}
