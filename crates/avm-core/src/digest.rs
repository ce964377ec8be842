//! # Schema Fingerprints
//!
//! A `SchemaFingerprint` is the SHA-256 digest of a schema's canonical JSON
//! bytes. Registries compare fingerprints to decide whether a re-registered
//! schema is the same schema (idempotent) or a conflicting one.
//!
//! ## Invariant
//!
//! A fingerprint can only be computed from `CanonicalBytes`, so two schema
//! documents that differ only in object key order always share a fingerprint.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::canonical::CanonicalBytes;
use crate::error::CanonicalizationError;

/// SHA-256 digest of a schema's canonical JSON form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchemaFingerprint([u8; 32]);

impl SchemaFingerprint {
    /// Fingerprint already-canonical bytes.
    pub fn from_canonical(data: &CanonicalBytes) -> Self {
        let hash = Sha256::digest(data.as_bytes());
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&hash);
        Self(bytes)
    }

    /// Canonicalize a JSON value and fingerprint it.
    ///
    /// # Errors
    ///
    /// Returns `CanonicalizationError` if the value cannot be canonicalized.
    pub fn of_json(value: &serde_json::Value) -> Result<Self, CanonicalizationError> {
        Ok(Self::from_canonical(&CanonicalBytes::new(value)?))
    }

    /// The raw 32-byte digest.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Render the digest as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl std::fmt::Display for SchemaFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sha256:{}", self.to_hex())
    }
}
