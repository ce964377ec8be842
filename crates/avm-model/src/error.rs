//! Error types for model registration, construction, and mutation.

use std::fmt;

use avm_core::{CanonicalizationError, Datum, SchemaFingerprint};
use avm_schema::SchemaError;
use thiserror::Error;

use crate::model::ModelKind;

/// Error raised by the model registry or a model instance.
#[derive(Error, Debug)]
pub enum ModelError {
    /// A value does not conform to a model.
    #[error("value {value} does not conform to {model}: {reason}")]
    Validation {
        /// Name of the model that rejected the value.
        model: String,
        value: Datum,
        reason: String,
    },

    /// No branch of a union accepts a value.
    #[error("no branch of {model} accepts {value}:\n{}", render_attempts(.attempts))]
    NoMatch {
        model: String,
        value: Datum,
        /// One entry per branch, in declaration order.
        attempts: Vec<BranchFailure>,
    },

    /// A fullname has no registered or defined schema.
    #[error("no model registered for '{fullname}'")]
    NotFound { fullname: String },

    /// A fullname was registered again with a structurally different schema.
    #[error("conflicting schema for '{fullname}': existing {existing}, incoming {incoming}")]
    ConflictingSchema {
        fullname: String,
        existing: SchemaFingerprint,
        incoming: SchemaFingerprint,
    },

    /// A record field name is not declared by the record.
    #[error("{model} has no field '{field}'")]
    UnknownField { model: String, field: String },

    /// A derived accessor name is not defined by the model's behavior.
    #[error("{model} has no accessor '{name}'")]
    UnknownAccessor { model: String, name: String },

    /// An operation was applied to a model of the wrong kind.
    #[error("{operation} is not supported by {model} ({kind})")]
    WrongKind {
        model: String,
        kind: ModelKind,
        operation: &'static str,
    },

    /// An array index is past the end.
    #[error("index {index} is out of bounds for length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// A map key is absent.
    #[error("key '{key}' is not present")]
    MissingKey { key: String },

    /// Schema parsing or loading failed.
    #[error(transparent)]
    Schema(SchemaError),

    /// Canonical bytes could not be produced.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),
}

impl ModelError {
    /// True for value rejections, including union mismatches.
    pub fn is_validation(&self) -> bool {
        matches!(self, ModelError::Validation { .. } | ModelError::NoMatch { .. })
    }

    pub(crate) fn validation(model: &str, value: &Datum, reason: impl Into<String>) -> Self {
        ModelError::Validation {
            model: model.to_string(),
            value: value.clone(),
            reason: reason.into(),
        }
    }
}

impl From<SchemaError> for ModelError {
    fn from(err: SchemaError) -> Self {
        match err {
            SchemaError::Conflicting {
                fullname,
                existing,
                incoming,
            } => ModelError::ConflictingSchema {
                fullname,
                existing,
                incoming,
            },
            other => ModelError::Schema(other),
        }
    }
}

/// Why one union branch rejected a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchFailure {
    pub index: usize,
    /// Label of the branch schema.
    pub branch: String,
    pub reason: String,
}

impl fmt::Display for BranchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "  [{}] {}: {}", self.index, self.branch, self.reason)
    }
}

fn render_attempts(attempts: &[BranchFailure]) -> String {
    attempts
        .iter()
        .map(BranchFailure::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
