//! # Error Types
//!
//! Errors raised by the foundational layer. All errors use `thiserror` for
//! derive-based `Display` and `Error` implementations.

use thiserror::Error;

/// Top-level error type for `avm-core`.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Canonicalization failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// JSON text could not be parsed into a datum.
    #[error("invalid JSON text: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Non-finite floats have no JSON representation.
    #[error("non-finite float values have no canonical representation: {0}")]
    NonFiniteFloat(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}
