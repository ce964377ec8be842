//! # Registry Configuration
//!
//! Settings fixed for the lifetime of a [`Registry`](crate::Registry).
//! Every field has a default, so an empty YAML document is a valid
//! configuration.

use serde::{Deserialize, Serialize};

/// Configuration for a model registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Namespace applied to unqualified names that have no enclosing
    /// namespace.
    pub default_namespace: Option<String>,
    /// How record values are matched against declared fields.
    pub record_policy: RecordPolicy,
}

impl RegistryConfig {
    /// Configuration with the given default namespace.
    pub fn with_namespace(namespace: impl Into<String>) -> Self {
        Self {
            default_namespace: Some(namespace.into()),
            ..Self::default()
        }
    }
}

/// Record field-set matching policy.
///
/// Missing fields are always filled from the field's declared `default`
/// when one exists and rejected otherwise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordPolicy {
    pub unknown_fields: UnknownFields,
}

/// What to do with record input keys that are not declared fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownFields {
    /// Fail construction.
    #[default]
    Reject,
    /// Drop them from the canonical value.
    Ignore,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_strict() {
        let config = RegistryConfig::default();
        assert_eq!(config.default_namespace, None);
        assert_eq!(config.record_policy.unknown_fields, UnknownFields::Reject);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let config: RegistryConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, RegistryConfig::default());
    }

    #[test]
    fn test_yaml_overrides() {
        let yaml = "default_namespace: example.avro\nrecord_policy:\n  unknown_fields: ignore\n";
        let config: RegistryConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.default_namespace.as_deref(), Some("example.avro"));
        assert_eq!(config.record_policy.unknown_fields, UnknownFields::Ignore);
    }
}
