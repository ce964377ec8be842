//! # avm-schema: Avro Schema Parsing & Structural Validation
//!
//! Turns Avro schema JSON into a [`Schema`] tree and checks plain values
//! against it.
//!
//! ## Parsing (`parse`)
//!
//! [`parse_value`], [`parse_str`], [`parse_reader`], and [`parse_file`] all
//! parse into a caller-owned [`Names`] context. Named types defined by one
//! call are visible to every later call on the same context, which is how a
//! registry accumulates schemas that refer to each other.
//!
//! ## Validation (`validate`)
//!
//! [`validate`] is the structural predicate: it checks shape only, never
//! coerces, and reports every [`Violation`] with a path into the value.
//!
//! ## Crate Policy
//!
//! - Depends only on `avm-core` internally.
//! - Parsing is atomic per document: a failed parse never leaves partial
//!   definitions behind in `Names`.

pub mod name;
pub mod parse;
pub mod schema;
pub mod validate;

pub use name::{is_identifier, Name, Names};
pub use parse::{parse_file, parse_reader, parse_str, parse_value, SchemaError};
pub use schema::{
    EnumSchema, FixedSchema, RecordField, RecordSchema, Schema, SchemaKind, UnionSchema,
};
pub use validate::{is_valid, validate, Violation, Violations};
