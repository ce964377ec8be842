//! # avm-core: Foundational Types for avro-models
//!
//! This crate is the leaf of the workspace. It defines the plain-data value
//! tree that model instances store, plus the canonicalization and
//! fingerprinting primitives the registry relies on for structural schema
//! equality.
//!
//! ## Key Design Principles
//!
//! 1. **`Datum` cannot hold an instance.** Every value stored by a model
//!    instance is plain data. Nesting instances always flattens them.
//!
//! 2. **`CanonicalBytes` newtype.** All structural comparison flows through
//!    `CanonicalBytes`, which serializes with RFC 8785 (JCS).
//!
//! 3. **Fingerprints come from canonical bytes only.** `SchemaFingerprint`
//!    cannot be built from arbitrary bytes.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `avm-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod datum;
pub mod digest;
pub mod error;

pub use canonical::CanonicalBytes;
pub use datum::{bytes_to_json_string, json_string_to_bytes, Datum};
pub use digest::SchemaFingerprint;
pub use error::{CanonicalizationError, CoreError};
