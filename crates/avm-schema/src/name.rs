//! # Names and Fullnames
//!
//! Avro named types are identified by a *fullname*: a dot-separated
//! namespace followed by the simple name. A name that already contains a dot
//! is a fullname; otherwise it takes the explicit `namespace` attribute, the
//! enclosing named type's namespace, or the default namespace, in that order.
//!
//! [`Names`] is the parse context shared by every schema registered into one
//! registry: it maps each fullname to its defining schema.

use std::collections::HashMap;
use std::fmt;

use avm_core::SchemaFingerprint;

use crate::parse::SchemaError;
use crate::schema::Schema;

/// The name of a named schema type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name {
    pub name: String,
    pub namespace: Option<String>,
}

impl Name {
    /// Build a name. A dotted `name` overrides `namespace`.
    pub fn new(name: &str, namespace: Option<&str>) -> Self {
        match name.rsplit_once('.') {
            Some((ns, simple)) => Self {
                name: simple.to_string(),
                namespace: Some(ns.to_string()).filter(|ns| !ns.is_empty()),
            },
            None => Self {
                name: name.to_string(),
                namespace: namespace.filter(|ns| !ns.is_empty()).map(str::to_string),
            },
        }
    }

    /// Parse a fullname such as `example.avro.User`.
    pub fn from_fullname(fullname: &str) -> Self {
        Self::new(fullname, None)
    }

    /// The namespace-qualified name.
    pub fn fullname(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{ns}.{}", self.name),
            None => self.name.clone(),
        }
    }

    /// True if every dot-separated part is a valid Avro identifier.
    pub fn is_valid(&self) -> bool {
        is_identifier(&self.name)
            && self
                .namespace
                .as_deref()
                .map_or(true, |ns| ns.split('.').all(is_identifier))
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fullname())
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Fullname → defining schema, with the default namespace for unqualified
/// names.
#[derive(Debug, Clone, Default)]
pub struct Names {
    default_namespace: Option<String>,
    defined: HashMap<String, Definition>,
}

#[derive(Debug, Clone)]
struct Definition {
    schema: Schema,
    fingerprint: SchemaFingerprint,
}

impl Names {
    pub fn new(default_namespace: Option<&str>) -> Self {
        Self {
            default_namespace: default_namespace
                .filter(|ns| !ns.is_empty())
                .map(str::to_string),
            defined: HashMap::new(),
        }
    }

    pub fn default_namespace(&self) -> Option<&str> {
        self.default_namespace.as_deref()
    }

    /// The defining schema for a fullname.
    pub fn get(&self, fullname: &str) -> Option<&Schema> {
        self.defined.get(fullname).map(|d| &d.schema)
    }

    /// The structural fingerprint of a defined fullname.
    pub fn fingerprint(&self, fullname: &str) -> Option<SchemaFingerprint> {
        self.defined.get(fullname).map(|d| d.fingerprint)
    }

    pub fn contains(&self, fullname: &str) -> bool {
        self.defined.contains_key(fullname)
    }

    pub fn len(&self) -> usize {
        self.defined.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defined.is_empty()
    }

    /// All defined fullnames, sorted.
    pub fn fullnames(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.defined.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Follow a reference to its definition. Non-references resolve to
    /// themselves.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::Unresolved` if the referenced fullname was never
    /// defined.
    pub fn resolve<'a>(&'a self, schema: &'a Schema) -> Result<&'a Schema, SchemaError> {
        match schema {
            Schema::Ref(name) => {
                let fullname = name.fullname();
                self.get(&fullname)
                    .ok_or(SchemaError::Unresolved { fullname })
            }
            other => Ok(other),
        }
    }

    /// Record a definition. The parser has already checked it against any
    /// existing definition with the same fullname.
    pub(crate) fn define(&mut self, fullname: String, schema: Schema, fingerprint: SchemaFingerprint) {
        self.defined.insert(fullname, Definition { schema, fingerprint });
    }
}
