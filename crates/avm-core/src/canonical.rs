//! # Canonical Serialization: JCS Byte Production
//!
//! This module defines `CanonicalBytes`, the sole construction path for bytes
//! used to compare schemas and values structurally.
//!
//! ## Invariant
//!
//! The `CanonicalBytes` newtype has a private inner field. The only ways to
//! construct it are [`CanonicalBytes::new()`] and
//! [`CanonicalBytes::from_datum()`], both of which serialize through RFC 8785
//! (JSON Canonicalization Scheme): sorted keys, compact separators,
//! deterministic number formatting.
//!
//! Two JSON documents that differ only in object key order produce identical
//! canonical bytes. Schema equality in the registry is defined on top of this.

use serde::Serialize;
use serde_json::Value;

use crate::datum::Datum;
use crate::error::CanonicalizationError;

/// Bytes produced exclusively by JCS canonicalization.
///
/// # Invariants
///
/// - Object keys are sorted.
/// - Separators are compact.
/// - No non-finite floats (they have no JSON form).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Construct canonical bytes from any serializable value.
    ///
    /// # Errors
    ///
    /// Returns `CanonicalizationError::SerializationFailed` if the value cannot
    /// be represented as JSON.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        let bytes = serialize_canonical(&value)?;
        Ok(Self(bytes))
    }

    /// Construct canonical bytes from a datum.
    ///
    /// Unlike [`CanonicalBytes::new()`], this refuses NaN and infinities
    /// instead of letting them collapse to `null`.
    ///
    /// # Errors
    ///
    /// Returns `CanonicalizationError::NonFiniteFloat` if the datum contains
    /// a NaN or infinite float.
    pub fn from_datum(datum: &Datum) -> Result<Self, CanonicalizationError> {
        reject_non_finite(datum)?;
        Self::new(datum)
    }

    /// Access the canonical bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the length of the canonical byte sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the canonical byte sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

fn reject_non_finite(datum: &Datum) -> Result<(), CanonicalizationError> {
    match datum {
        Datum::Float(f) if !f.is_finite() => Err(CanonicalizationError::NonFiniteFloat(*f)),
        Datum::Array(items) => items.iter().try_for_each(reject_non_finite),
        Datum::Map(entries) => entries.values().try_for_each(reject_non_finite),
        Datum::Record(fields) => fields.iter().try_for_each(|(_, v)| reject_non_finite(v)),
        _ => Ok(()),
    }
}

/// Serialize a JSON value in JCS-canonical form (RFC 8785).
fn serialize_canonical(value: &Value) -> Result<Vec<u8>, CanonicalizationError> {
    let s = serde_jcs::to_string(value)?;
    Ok(s.into_bytes())
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn datum_strategy() -> impl Strategy<Value = Datum> {
        let leaf = prop_oneof![
            Just(Datum::Null),
            any::<bool>().prop_map(Datum::Boolean),
            any::<i64>().prop_map(Datum::Integer),
            "[a-zA-Z0-9_ ]{0,20}".prop_map(Datum::String),
            prop::collection::vec(any::<u8>(), 0..8).prop_map(Datum::Bytes),
        ];
        leaf.prop_recursive(4, 64, 8, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..6).prop_map(Datum::Array),
                prop::collection::btree_map("[a-z]{1,8}", inner, 0..6).prop_map(Datum::Map),
            ]
        })
    }

    proptest! {
        /// Canonicalization is deterministic.
        #[test]
        fn canonical_bytes_deterministic(d in datum_strategy()) {
            let a = CanonicalBytes::from_datum(&d).unwrap();
            let b = CanonicalBytes::from_datum(&d).unwrap();
            prop_assert_eq!(a.as_bytes(), b.as_bytes());
        }

        /// Canonical bytes are valid JSON.
        #[test]
        fn canonical_bytes_valid_json(d in datum_strategy()) {
            let cb = CanonicalBytes::from_datum(&d).unwrap();
            let parsed: Result<Value, _> = serde_json::from_slice(cb.as_bytes());
            prop_assert!(parsed.is_ok(), "Not valid JSON: {:?}", parsed.err());
        }

        /// A record and the map with the same entries canonicalize identically.
        #[test]
        fn record_and_map_agree(
            entries in prop::collection::btree_map("[a-z]{1,8}", any::<i64>(), 0..6)
        ) {
            let map = Datum::map(entries.clone());
            let record = Datum::record(entries.into_iter().rev());
            prop_assert_eq!(
                CanonicalBytes::from_datum(&map).unwrap(),
                CanonicalBytes::from_datum(&record).unwrap()
            );
        }
    }
}
