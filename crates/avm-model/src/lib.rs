//! # avm-model: Runtime Models for Avro Schemas
//!
//! Synthesizes a runtime [`ModelType`] for each registered schema and wraps
//! values in validated [`Instance`]s.
//!
//! ```text
//! register(schema, behavior) ──► Registry ──► ModelType ──construct(value)──► Instance
//!                                   ▲              │                            │
//!                                   └── lookup ────┘ (nested types, lazily)     └─ get / set / to_text
//! ```
//!
//! - [`Registry`] owns the schema names context and the fullname → model
//!   table. Identical re-registration returns the existing model; a
//!   structurally different schema under a known fullname is rejected.
//! - [`ModelType`] conforms values: per-kind coercion, structural check,
//!   then the [`Behavior`] validators.
//! - [`Instance`] holds one canonical [`Datum`](avm_core::Datum) and
//!   re-validates on every mutation.
//! - Union values pick their branch by ordered trial.
//!
//! ## Crate Policy
//!
//! - No process-wide state: every model belongs to an explicit registry.
//! - Instances store plain data only, never other instances.

pub mod behavior;
pub mod coerce;
pub mod config;
pub mod error;
pub mod instance;
pub mod model;
pub mod registry;
mod union;

pub use behavior::{Accessor, Adapter, Behavior, Validator};
pub use config::{RecordPolicy, RegistryConfig, UnknownFields};
pub use error::{BranchFailure, ModelError};
pub use instance::Instance;
pub use model::{ModelKind, ModelType};
pub use registry::Registry;
