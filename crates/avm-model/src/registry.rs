//! # Model Registry
//!
//! The namespace that maps schema fullnames to synthesized models. One
//! registry holds one schema [`Names`] context: every schema registered into
//! it can refer to every named type defined by an earlier (or, lazily, a
//! later) registration.
//!
//! ## Tables
//!
//! - **named**: fullname → model for record, enum, and fixed types;
//! - **anonymous**: label (`int`, `array<string>`, `union<null,Date>`, …) →
//!   behavior-less model for primitives and containers. Nested fields,
//!   items, values, and union branches always resolve here.
//! - **overrides**: label → model for a primitive or container registered
//!   with a non-empty behavior. Only the registering caller's handle sees
//!   it; nested resolution never does.
//!
//! A model in either table is *explicit* when the caller registered it and
//! *implicit* when the registry synthesized it on demand while resolving a
//! nested type. Registering an equal schema explicitly replaces an implicit
//! model (so a behavior can be attached after the type was first used) and
//! returns an existing explicit model unchanged.
//!
//! ## Concurrency
//!
//! Tables sit behind one `parking_lot::RwLock`. Lookups of existing models
//! take the read lock; registration and on-demand synthesis take the write
//! lock briefly. No lock is held while values are conformed or while user
//! behavior runs.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use avm_core::{Datum, SchemaFingerprint};
use avm_schema::{Names, Schema, Violations};
use parking_lot::RwLock;
use serde_json::Value;

use crate::behavior::Behavior;
use crate::config::RegistryConfig;
use crate::error::ModelError;
use crate::model::{ModelDef, ModelType};

/// Thread-safe, cloneable handle to a model namespace.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<Inner>,
}

struct Inner {
    config: RegistryConfig,
    tables: RwLock<Tables>,
}

struct Tables {
    names: Names,
    named: HashMap<String, Arc<ModelDef>>,
    anonymous: HashMap<String, Arc<ModelDef>>,
    overrides: HashMap<String, Arc<ModelDef>>,
}

impl Registry {
    pub fn new(config: RegistryConfig) -> Self {
        let names = Names::new(config.default_namespace.as_deref());
        Self {
            inner: Arc::new(Inner {
                config,
                tables: RwLock::new(Tables {
                    names,
                    named: HashMap::new(),
                    anonymous: HashMap::new(),
                    overrides: HashMap::new(),
                }),
            }),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.inner.config
    }

    /// Parse a schema and register a model for it.
    ///
    /// Named types defined anywhere inside the schema become resolvable by
    /// fullname; only the top-level node is bound to `behavior`.
    ///
    /// # Errors
    ///
    /// `Schema` for malformed input, `ConflictingSchema` if a fullname is
    /// already defined differently.
    pub fn register(&self, schema_json: &Value, behavior: Behavior) -> Result<ModelType, ModelError> {
        let schema = {
            let mut tables = self.inner.tables.write();
            avm_schema::parse_value(schema_json, &mut tables.names)?
        };
        self.bind(schema, behavior)
    }

    /// Parse schema JSON text and register it.
    pub fn register_str(&self, text: &str, behavior: Behavior) -> Result<ModelType, ModelError> {
        let schema = {
            let mut tables = self.inner.tables.write();
            avm_schema::parse_str(text, &mut tables.names)?
        };
        self.bind(schema, behavior)
    }

    /// Load a schema file (`.avsc`) and register it.
    pub fn register_file(&self, path: impl AsRef<Path>, behavior: Behavior) -> Result<ModelType, ModelError> {
        let schema = {
            let mut tables = self.inner.tables.write();
            avm_schema::parse_file(path, &mut tables.names)?
        };
        self.bind(schema, behavior)
    }

    /// Read schema JSON from `reader` and register it.
    pub fn register_reader(&self, reader: impl Read, behavior: Behavior) -> Result<ModelType, ModelError> {
        let schema = {
            let mut tables = self.inner.tables.write();
            avm_schema::parse_reader(reader, &mut tables.names)?
        };
        self.bind(schema, behavior)
    }

    /// Register an already-built schema tree.
    pub fn register_schema(&self, schema: &Schema, behavior: Behavior) -> Result<ModelType, ModelError> {
        self.register(&schema.to_json(), behavior)
    }

    /// The model registered or defined under `fullname`.
    ///
    /// An unqualified name is also tried in the default namespace. A named
    /// type that is defined (e.g. nested inside a registered record) but has
    /// no model yet gets one synthesized now.
    ///
    /// # Errors
    ///
    /// `NotFound` if no schema defines `fullname`.
    pub fn lookup(&self, fullname: &str) -> Result<ModelType, ModelError> {
        let fullname = self.qualify(fullname);
        if let Some(def) = self.inner.tables.read().named.get(&fullname) {
            return Ok(self.handle(Arc::clone(def)));
        }

        let mut tables = self.inner.tables.write();
        if let Some(def) = tables.named.get(&fullname) {
            return Ok(self.handle(Arc::clone(def)));
        }
        let schema = tables
            .names
            .get(&fullname)
            .cloned()
            .ok_or_else(|| ModelError::NotFound {
                fullname: fullname.clone(),
            })?;
        let def = Arc::new(ModelDef::synthesize(schema, Behavior::default(), false)?);
        tables.named.insert(fullname.clone(), Arc::clone(&def));
        tracing::debug!(model = %fullname, kind = %def.kind, "synthesized model on demand");
        Ok(self.handle(def))
    }

    /// True if `fullname` resolves to a model.
    pub fn has(&self, fullname: &str) -> bool {
        let fullname = self.qualify(fullname);
        let tables = self.inner.tables.read();
        tables.named.contains_key(&fullname) || tables.names.contains(&fullname)
    }

    /// The model for any schema node: named types and references by
    /// fullname, everything else from the behavior-less anonymous table.
    ///
    /// # Errors
    ///
    /// `NotFound` for a reference to an undefined name.
    pub fn model_for(&self, schema: &Schema) -> Result<ModelType, ModelError> {
        if let Some(fullname) = schema.fullname() {
            return self.lookup(&fullname);
        }
        let key = schema.label();
        if let Some(def) = self.inner.tables.read().anonymous.get(&key) {
            return Ok(self.handle(Arc::clone(def)));
        }

        let mut tables = self.inner.tables.write();
        if let Some(def) = tables.anonymous.get(&key) {
            return Ok(self.handle(Arc::clone(def)));
        }
        let def = Arc::new(ModelDef::synthesize(schema.clone(), Behavior::default(), false)?);
        tables.anonymous.insert(key.clone(), Arc::clone(&def));
        tracing::trace!(model = %key, "synthesized anonymous model");
        Ok(self.handle(def))
    }

    /// Fullnames the caller registered explicitly, sorted.
    pub fn registered(&self) -> Vec<String> {
        let tables = self.inner.tables.read();
        let mut names: Vec<String> = tables
            .named
            .iter()
            .filter(|(_, def)| def.explicit)
            .map(|(name, _)| name.clone())
            .collect();
        names.sort_unstable();
        names
    }

    /// Every defined fullname, registered or not, sorted.
    pub fn fullnames(&self) -> Vec<String> {
        let tables = self.inner.tables.read();
        tables.names.fullnames().into_iter().map(str::to_string).collect()
    }

    /// Structural fingerprint of a defined fullname.
    pub fn fingerprint(&self, fullname: &str) -> Option<SchemaFingerprint> {
        let fullname = self.qualify(fullname);
        self.inner.tables.read().names.fingerprint(&fullname)
    }

    /// A snapshot of the schema names context.
    pub fn names(&self) -> Names {
        self.inner.tables.read().names.clone()
    }

    pub(crate) fn check_structure(&self, schema: &Schema, value: &Datum) -> Result<(), Violations> {
        let tables = self.inner.tables.read();
        avm_schema::validate(schema, value, &tables.names)
    }

    /// Bind a parsed top-level schema to a model.
    fn bind(&self, schema: Schema, behavior: Behavior) -> Result<ModelType, ModelError> {
        let mut tables = self.inner.tables.write();
        let schema = match schema {
            Schema::Ref(name) => {
                let fullname = name.fullname();
                match tables.names.get(&fullname) {
                    Some(definition) => definition.clone(),
                    None => return Err(ModelError::NotFound { fullname }),
                }
            }
            other => other,
        };

        let named = schema.fullname().is_some();
        let key = schema.fullname().unwrap_or_else(|| schema.label());
        let table = if named {
            &mut tables.named
        } else if behavior.is_empty() {
            &mut tables.anonymous
        } else {
            &mut tables.overrides
        };
        if let Some(existing) = table.get(&key) {
            if existing.explicit {
                if behavior.is_empty() {
                    tracing::debug!(model = %key, "schema already registered, reusing model");
                } else {
                    tracing::warn!(model = %key, "schema already registered, discarding new behavior");
                }
                return Ok(self.handle(Arc::clone(existing)));
            }
            tracing::warn!(model = %key, "replacing on-demand model with registered model");
        }

        let def = Arc::new(ModelDef::synthesize(schema, behavior, true)?);
        table.insert(key.clone(), Arc::clone(&def));
        tracing::debug!(model = %key, kind = %def.kind, "registered model");
        Ok(self.handle(def))
    }

    fn qualify(&self, fullname: &str) -> String {
        if fullname.contains('.') {
            return fullname.to_string();
        }
        let tables = self.inner.tables.read();
        if tables.named.contains_key(fullname) || tables.names.contains(fullname) {
            return fullname.to_string();
        }
        match tables.names.default_namespace() {
            Some(ns) => format!("{ns}.{fullname}"),
            None => fullname.to_string(),
        }
    }

    fn handle(&self, def: Arc<ModelDef>) -> ModelType {
        ModelType::new(def, self.clone())
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tables = self.inner.tables.read();
        f.debug_struct("Registry")
            .field("config", &self.inner.config)
            .field("named", &tables.named.len())
            .field("anonymous", &tables.anonymous.len())
            .field("overrides", &tables.overrides.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date_schema() -> Value {
        json!({
            "type": "record",
            "name": "Date",
            "namespace": "example.avro",
            "fields": [
                {"name": "year", "type": "int"},
                {"name": "month", "type": "int"},
                {"name": "day", "type": "int"}
            ]
        })
    }

    #[test]
    fn test_idempotent_registration() {
        let registry = Registry::default();
        let a = registry.register(&date_schema(), Behavior::default()).unwrap();
        let b = registry.register(&date_schema(), Behavior::default()).unwrap();
        assert_eq!(a, b);
        assert_eq!(registry.registered(), vec!["example.avro.Date"]);
    }

    #[test]
    fn test_idempotent_registration_ignores_key_order() {
        let registry = Registry::default();
        let a = registry
            .register_str(r#"{"type": "enum", "name": "E", "symbols": ["A", "B"]}"#, Behavior::default())
            .unwrap();
        let b = registry
            .register_str(r#"{"symbols": ["A", "B"], "type": "enum", "name": "E"}"#, Behavior::default())
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_conflicting_registration() {
        let registry = Registry::default();
        registry.register(&date_schema(), Behavior::default()).unwrap();
        let mut changed = date_schema();
        changed["fields"][2]["type"] = json!("long");
        let err = registry.register(&changed, Behavior::default()).unwrap_err();
        match err {
            ModelError::ConflictingSchema { fullname, existing, incoming } => {
                assert_eq!(fullname, "example.avro.Date");
                assert_ne!(existing, incoming);
            }
            other => panic!("Expected ConflictingSchema, got: {other}"),
        }
    }

    #[test]
    fn test_lookup_and_has() {
        let registry = Registry::default();
        assert!(!registry.has("example.avro.Date"));
        assert!(matches!(
            registry.lookup("example.avro.Date"),
            Err(ModelError::NotFound { .. })
        ));
        let date = registry.register(&date_schema(), Behavior::default()).unwrap();
        assert!(registry.has("example.avro.Date"));
        assert_eq!(registry.lookup("example.avro.Date").unwrap(), date);
    }

    #[test]
    fn test_default_namespace_qualifies_lookups() {
        let registry = Registry::new(RegistryConfig::with_namespace("example.avro"));
        let e = registry
            .register(&json!({"type": "enum", "name": "Color", "symbols": ["RED"]}), Behavior::default())
            .unwrap();
        assert_eq!(e.name(), "example.avro.Color");
        assert_eq!(registry.lookup("Color").unwrap(), e);
        assert!(registry.has("Color"));
    }

    #[test]
    fn test_nested_named_types_resolve_on_demand() {
        let registry = Registry::default();
        registry
            .register(
                &json!({"type": "record", "name": "Outer", "fields": [
                    {"name": "inner", "type": {"type": "fixed", "name": "Inner", "size": 2}}
                ]}),
                Behavior::default(),
            )
            .unwrap();
        let inner = registry.lookup("Inner").unwrap();
        assert!(!inner.is_registered());
        assert_eq!(inner.size(), Some(2));
        assert_eq!(registry.registered(), vec!["Outer"]);
        assert_eq!(registry.fullnames(), vec!["Inner", "Outer"]);
    }

    #[test]
    fn test_explicit_registration_replaces_on_demand_model() {
        let registry = Registry::default();
        registry
            .register(
                &json!({"type": "record", "name": "Outer", "fields": [
                    {"name": "inner", "type": {"type": "enum", "name": "Inner", "symbols": ["A", "B"]}}
                ]}),
                Behavior::default(),
            )
            .unwrap();
        let implicit = registry.lookup("Inner").unwrap();
        let only_a = Behavior::new().with_validator(|v| {
            if v.as_str() == Some("A") {
                Ok(())
            } else {
                Err("only A".into())
            }
        });
        let explicit = registry
            .register(&json!({"type": "enum", "name": "Inner", "symbols": ["A", "B"]}), only_a)
            .unwrap();
        assert_ne!(implicit, explicit);
        assert!(explicit.is_registered());
        assert_eq!(registry.lookup("Inner").unwrap(), explicit);

        let outer = registry.lookup("Outer").unwrap();
        assert!(outer.is_valid(Datum::record([("inner", "A")])));
        assert!(!outer.is_valid(Datum::record([("inner", "B")])));
    }

    #[test]
    fn test_register_by_name_reference() {
        let registry = Registry::default();
        registry
            .register(
                &json!({"type": "record", "name": "Outer", "fields": [
                    {"name": "inner", "type": {"type": "fixed", "name": "Inner", "size": 2}}
                ]}),
                Behavior::default(),
            )
            .unwrap();
        let inner = registry.register(&json!("Inner"), Behavior::default()).unwrap();
        assert!(inner.is_registered());
        assert!(matches!(
            registry.register(&json!("Nowhere"), Behavior::default()),
            Err(ModelError::NotFound { .. })
        ));
    }

    #[test]
    fn test_anonymous_models_are_shared() {
        let registry = Registry::default();
        let a = registry.model_for(&Schema::Array(Box::new(Schema::String))).unwrap();
        let b = registry
            .register(&json!({"type": "array", "items": "string"}), Behavior::default())
            .unwrap();
        let c = registry.model_for(&Schema::Array(Box::new(Schema::String))).unwrap();
        assert_ne!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn test_primitive_behavior_stays_with_its_handle() {
        let registry = Registry::default();
        let strict = registry
            .register(
                &json!("string"),
                Behavior::new().with_validator(|v| match v.as_str() {
                    Some("x") => Err("no x".into()),
                    _ => Ok(()),
                }),
            )
            .unwrap();
        assert!(!strict.is_valid("x"));
        assert!(strict.is_valid("y"));

        let record = registry
            .register(&json!({"type": "record", "name": "R", "fields": [{"name": "s", "type": "string"}]}), Behavior::default())
            .unwrap();
        assert!(record.construct(Datum::record([("s", "x")])).is_ok());
        assert!(registry.model_for(&Schema::String).unwrap().is_valid("x"));
        assert_ne!(registry.model_for(&Schema::String).unwrap(), strict);
    }

    #[test]
    fn test_container_behavior_stays_with_its_handle() {
        let registry = Registry::default();
        let non_empty = registry
            .register(
                &json!({"type": "array", "items": "int"}),
                Behavior::new().with_validator(|v| match v.as_array() {
                    Some([]) => Err("must not be empty".into()),
                    _ => Ok(()),
                }),
            )
            .unwrap();
        assert!(non_empty.construct(Datum::Array(vec![])).is_err());

        let holder = registry
            .register(
                &json!({"type": "record", "name": "Holder", "fields": [
                    {"name": "xs", "type": {"type": "array", "items": "int"}}
                ]}),
                Behavior::default(),
            )
            .unwrap();
        assert!(holder.construct(Datum::record([("xs", Datum::Array(vec![]))])).is_ok());

        let union = registry.register(&json!(["null", {"type": "array", "items": "int"}]), Behavior::default()).unwrap();
        assert_eq!(union.select_branch(Datum::Array(vec![])).unwrap().0, 1);
    }

    #[test]
    fn test_reregistering_with_behavior_keeps_first_override() {
        let registry = Registry::default();
        let reject_all = || Behavior::new().with_validator(|_| Err("rejected".into()));
        let first = registry.register(&json!("long"), reject_all()).unwrap();
        let second = registry.register(&json!("long"), reject_all()).unwrap();
        assert_eq!(first, second);
        assert!(registry.register(&json!("long"), Behavior::default()).unwrap().is_valid(1));
    }

    #[test]
    fn test_register_schema_tree() {
        let registry = Registry::default();
        let mut names = Names::new(None);
        let schema = avm_schema::parse_value(&date_schema(), &mut names).unwrap();
        let model = registry.register_schema(&schema, Behavior::default()).unwrap();
        assert_eq!(model.name(), "example.avro.Date");
        assert_eq!(registry.fingerprint("example.avro.Date"), names.fingerprint("example.avro.Date"));
    }

    #[test]
    fn test_register_reader() {
        let registry = Registry::default();
        let model = registry
            .register_reader(r#"{"type": "map", "values": "bytes"}"#.as_bytes(), Behavior::default())
            .unwrap();
        assert_eq!(model.name(), "map<bytes>");
    }

    #[test]
    fn test_malformed_schema() {
        let registry = Registry::default();
        let err = registry.register(&json!({"type": "record"}), Behavior::default()).unwrap_err();
        assert!(matches!(err, ModelError::Schema(_)));
        assert!(registry.fullnames().is_empty());
    }
}
