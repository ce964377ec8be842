//! # Model Synthesis
//!
//! A [`ModelType`] is the runtime type synthesized for one schema node: a
//! closed [`ModelKind`] tag plus the schema node it is bound to, the user
//! [`Behavior`] layered on top, and a handle to the [`Registry`] it lives in.
//!
//! ## Lazy Resolution
//!
//! A model never embeds the models of its fields, items, values, or
//! branches. It keeps the child *schema* and asks the registry for the
//! child model only when a value is conformed. A recursive record therefore
//! synthesizes in constant time, and a field referencing a type that is
//! registered later works as soon as that type exists.
//!
//! ## Conformance
//!
//! Conforming a value produces its canonical [`Datum`]:
//!
//! 1. the model's adapter rewrites the input;
//! 2. the per-kind coercion runs, conforming every child through the
//!    child's own model (and therefore the child's behavior);
//! 3. at the top level only, the result is re-checked by the structural
//!    validator;
//! 4. the model's own validators run on the canonical result.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use avm_core::{Datum, SchemaFingerprint};
use avm_schema::{RecordField, RecordSchema, Schema, SchemaKind};

use crate::behavior::Behavior;
use crate::coerce::{coerce_enum, coerce_fixed, coerce_primitive};
use crate::config::UnknownFields;
use crate::error::ModelError;
use crate::instance::Instance;
use crate::registry::Registry;
use crate::union;

/// The closed set of model variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKind {
    Primitive(SchemaKind),
    Enum,
    Fixed,
    Record,
    Array,
    Map,
    Union,
}

impl ModelKind {
    fn of(schema: &Schema) -> Option<Self> {
        let kind = schema.kind()?;
        Some(match kind {
            SchemaKind::Record => ModelKind::Record,
            SchemaKind::Enum => ModelKind::Enum,
            SchemaKind::Fixed => ModelKind::Fixed,
            SchemaKind::Array => ModelKind::Array,
            SchemaKind::Map => ModelKind::Map,
            SchemaKind::Union => ModelKind::Union,
            primitive => ModelKind::Primitive(primitive),
        })
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, ModelKind::Primitive(_))
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Primitive(kind) => write!(f, "{kind}"),
            ModelKind::Enum => f.write_str("enum"),
            ModelKind::Fixed => f.write_str("fixed"),
            ModelKind::Record => f.write_str("record"),
            ModelKind::Array => f.write_str("array"),
            ModelKind::Map => f.write_str("map"),
            ModelKind::Union => f.write_str("union"),
        }
    }
}

/// The shared, immutable part of a model. The registry stores these.
#[derive(Debug)]
pub(crate) struct ModelDef {
    pub(crate) name: String,
    pub(crate) kind: ModelKind,
    pub(crate) schema: Schema,
    pub(crate) behavior: Behavior,
    /// Registered by the caller, as opposed to synthesized on demand.
    pub(crate) explicit: bool,
}

impl ModelDef {
    /// Synthesize the definition for a resolved schema node.
    pub(crate) fn synthesize(schema: Schema, behavior: Behavior, explicit: bool) -> Result<Self, ModelError> {
        let kind = ModelKind::of(&schema).ok_or_else(|| ModelError::NotFound {
            fullname: schema.label(),
        })?;
        let name = schema.fullname().unwrap_or_else(|| schema.label());
        Ok(Self {
            name,
            kind,
            schema,
            behavior,
            explicit,
        })
    }
}

/// A synthesized model bound to one schema node and one registry.
///
/// Cloning is cheap. Two handles are equal when they refer to the same
/// synthesized model.
#[derive(Clone)]
pub struct ModelType {
    def: Arc<ModelDef>,
    registry: Registry,
}

impl ModelType {
    pub(crate) fn new(def: Arc<ModelDef>, registry: Registry) -> Self {
        Self { def, registry }
    }

    /// Fullname for named models, `array<…>`/`map<…>`/`union<…>` or the
    /// primitive keyword otherwise.
    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn fullname(&self) -> Option<String> {
        self.def.schema.fullname()
    }

    pub fn kind(&self) -> ModelKind {
        self.def.kind
    }

    pub fn schema(&self) -> &Schema {
        &self.def.schema
    }

    pub fn behavior(&self) -> &Behavior {
        &self.def.behavior
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// True if the caller registered this model, false if the registry
    /// synthesized it on demand.
    pub fn is_registered(&self) -> bool {
        self.def.explicit
    }

    pub fn symbols(&self) -> Option<&[String]> {
        match &self.def.schema {
            Schema::Enum(e) => Some(&e.symbols),
            _ => None,
        }
    }

    pub fn size(&self) -> Option<usize> {
        match &self.def.schema {
            Schema::Fixed(f) => Some(f.size),
            _ => None,
        }
    }

    /// Declared record fields, in declaration order.
    pub fn fields(&self) -> Option<&[RecordField]> {
        self.record().map(|r| r.fields.as_slice())
    }

    pub fn items(&self) -> Option<&Schema> {
        match &self.def.schema {
            Schema::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn values(&self) -> Option<&Schema> {
        match &self.def.schema {
            Schema::Map(values) => Some(values),
            _ => None,
        }
    }

    pub fn branches(&self) -> Option<&[Schema]> {
        match &self.def.schema {
            Schema::Union(u) => Some(u.branches()),
            _ => None,
        }
    }

    /// The model of a record field.
    ///
    /// # Errors
    ///
    /// `WrongKind` for non-records, `UnknownField` for undeclared names, or
    /// `NotFound` if the field's type is not defined yet.
    pub fn field_model(&self, field: &str) -> Result<ModelType, ModelError> {
        let record = self.record().ok_or_else(|| self.wrong_kind("field lookup"))?;
        let declared = record.field(field).ok_or_else(|| ModelError::UnknownField {
            model: self.name().to_string(),
            field: field.to_string(),
        })?;
        self.registry.model_for(&declared.schema)
    }

    /// The model of an array's elements.
    pub fn item_model(&self) -> Result<ModelType, ModelError> {
        let items = self.items().ok_or_else(|| self.wrong_kind("item model"))?;
        self.registry.model_for(items)
    }

    /// The model of a map's values.
    pub fn value_model(&self) -> Result<ModelType, ModelError> {
        let values = self.values().ok_or_else(|| self.wrong_kind("value model"))?;
        self.registry.model_for(values)
    }

    /// The models of a union's branches, in declaration order.
    pub fn branch_models(&self) -> Result<Vec<ModelType>, ModelError> {
        let branches = self.branches().ok_or_else(|| self.wrong_kind("branch models"))?;
        branches.iter().map(|b| self.registry.model_for(b)).collect()
    }

    /// Construct a validated instance. Instances nested anywhere in `value`
    /// have already been flattened by the `Into<Datum>` conversion.
    ///
    /// # Errors
    ///
    /// `Validation` or `NoMatch` if the value does not conform, `NotFound`
    /// if a referenced type is not defined.
    pub fn construct(&self, value: impl Into<Datum>) -> Result<Instance, ModelError> {
        let (canonical, branch) = self.conform_top(value.into())?;
        Ok(Instance::from_parts(self.clone(), canonical, branch))
    }

    /// The canonical form of `value` under this model.
    ///
    /// # Errors
    ///
    /// As [`ModelType::construct`].
    pub fn conform(&self, value: impl Into<Datum>) -> Result<Datum, ModelError> {
        self.conform_top(value.into()).map(|(canonical, _)| canonical)
    }

    pub fn is_valid(&self, value: impl Into<Datum>) -> bool {
        self.conform(value).is_ok()
    }

    /// Pick the first union branch that accepts `value`.
    ///
    /// # Errors
    ///
    /// `WrongKind` for non-unions, `NoMatch` if no branch accepts the value.
    pub fn select_branch(&self, value: impl Into<Datum>) -> Result<(usize, Datum), ModelError> {
        let branches = self.branches().ok_or_else(|| self.wrong_kind("branch selection"))?;
        union::resolve(self, branches, value.into())
    }

    /// Fingerprint of this model's schema in shallow canonical form.
    pub fn fingerprint(&self) -> Result<SchemaFingerprint, ModelError> {
        Ok(SchemaFingerprint::of_json(&self.def.schema.to_shallow_json())?)
    }

    /// Coerce, check structure, then run validators.
    pub(crate) fn conform_top(&self, value: Datum) -> Result<(Datum, Option<usize>), ModelError> {
        let (canonical, branch) = self.coerce(value)?;
        self.check_structure(&canonical)?;
        self.check_behavior(&canonical)?;
        Ok((canonical, branch))
    }

    /// Coerce then run validators; used for children of a value being
    /// conformed, whose structure the top-level check covers.
    pub(crate) fn conform_nested(&self, value: Datum) -> Result<(Datum, Option<usize>), ModelError> {
        let (canonical, branch) = self.coerce(value)?;
        self.check_behavior(&canonical)?;
        Ok((canonical, branch))
    }

    pub(crate) fn check_behavior(&self, value: &Datum) -> Result<(), ModelError> {
        self.def
            .behavior
            .validate(value)
            .map_err(|reason| ModelError::validation(self.name(), value, reason))
    }

    fn check_structure(&self, value: &Datum) -> Result<(), ModelError> {
        self.registry
            .check_structure(&self.def.schema, value)
            .map_err(|violations| ModelError::validation(self.name(), value, violations.to_string()))
    }

    fn coerce(&self, value: Datum) -> Result<(Datum, Option<usize>), ModelError> {
        let value = self.def.behavior.adapt(value);
        let reject = |reason: String, value: &Datum| ModelError::validation(self.name(), value, reason);

        let canonical = match &self.def.schema {
            Schema::Enum(e) => {
                let shown = value.clone();
                coerce_enum(&e.symbols, value).map_err(|r| reject(r, &shown))?
            }
            Schema::Fixed(f) => {
                let shown = value.clone();
                coerce_fixed(f.size, value).map_err(|r| reject(r, &shown))?
            }
            Schema::Record(record) => self.coerce_record(record, value)?,
            Schema::Array(items) => {
                let elements = match value {
                    Datum::Array(elements) => elements,
                    other => return Err(reject(format!("expected array, found {}", other.kind_name()), &other)),
                };
                let item_model = self.registry.model_for(items)?;
                let elements = elements
                    .into_iter()
                    .map(|e| item_model.conform_nested(e).map(|(d, _)| d))
                    .collect::<Result<Vec<_>, _>>()?;
                Datum::Array(elements)
            }
            Schema::Map(values) => {
                let entries = match value {
                    Datum::Map(entries) => entries,
                    other => return Err(reject(format!("expected map, found {}", other.kind_name()), &other)),
                };
                let value_model = self.registry.model_for(values)?;
                let entries = entries
                    .into_iter()
                    .map(|(k, v)| value_model.conform_nested(v).map(|(d, _)| (k, d)))
                    .collect::<Result<_, _>>()?;
                Datum::Map(entries)
            }
            Schema::Union(u) => {
                let (index, canonical) = union::resolve(self, u.branches(), value)?;
                return Ok((canonical, Some(index)));
            }
            Schema::Ref(name) => {
                return Err(ModelError::NotFound {
                    fullname: name.fullname(),
                })
            }
            primitive => {
                let kind = self.primitive_kind(primitive)?;
                let shown = value.clone();
                coerce_primitive(kind, value).map_err(|r| reject(r, &shown))?
            }
        };
        Ok((canonical, None))
    }

    fn coerce_record(&self, record: &RecordSchema, value: Datum) -> Result<Datum, ModelError> {
        let mut entries: Vec<(String, Datum)> = match value {
            Datum::Record(fields) => fields,
            Datum::Map(entries) => entries.into_iter().collect(),
            other => {
                return Err(ModelError::validation(
                    self.name(),
                    &other,
                    format!("expected record, found {}", other.kind_name()),
                ))
            }
        };
        let reject = |reason: String, entries: Vec<(String, Datum)>| {
            ModelError::validation(self.name(), &Datum::Record(entries), reason)
        };

        let mut seen = HashSet::new();
        let duplicate = entries
            .iter()
            .map(|(key, _)| key.as_str())
            .find(|key| !seen.insert(*key))
            .map(str::to_string);
        let missing = record
            .fields
            .iter()
            .find(|f| f.default.is_none() && !seen.contains(f.name.as_str()))
            .map(|f| f.name.clone());
        if let Some(key) = duplicate {
            return Err(reject(format!("duplicate field '{key}'"), entries));
        }
        if let Some(name) = missing {
            return Err(reject(format!("missing required field '{name}'"), entries));
        }
        let unknown: Vec<String> = entries
            .iter()
            .filter(|(key, _)| record.field(key).is_none())
            .map(|(key, _)| key.clone())
            .collect();
        if !unknown.is_empty() {
            match self.registry.config().record_policy.unknown_fields {
                UnknownFields::Reject => return Err(reject(format!("unknown fields {unknown:?}"), entries)),
                UnknownFields::Ignore => {
                    tracing::debug!(model = self.name(), fields = ?unknown, "dropping unknown record fields");
                    entries.retain(|(key, _)| record.field(key).is_some());
                }
            }
        }

        let mut canonical = Vec::with_capacity(record.fields.len());
        for field in &record.fields {
            let supplied = entries
                .iter()
                .position(|(key, _)| *key == field.name)
                .map(|i| entries.swap_remove(i).1);
            let value = match (supplied, &field.default) {
                (Some(v), _) => v,
                (None, Some(default)) => Datum::from(default),
                (None, None) => continue,
            };
            let field_model = self.registry.model_for(&field.schema)?;
            let (value, _) = field_model.conform_nested(value)?;
            canonical.push((field.name.clone(), value));
        }
        Ok(Datum::Record(canonical))
    }

    fn primitive_kind(&self, schema: &Schema) -> Result<SchemaKind, ModelError> {
        schema
            .kind()
            .filter(SchemaKind::is_primitive)
            .ok_or_else(|| self.wrong_kind("primitive coercion"))
    }

    fn record(&self) -> Option<&RecordSchema> {
        match &self.def.schema {
            Schema::Record(r) => Some(r),
            _ => None,
        }
    }

    pub(crate) fn wrong_kind(&self, operation: &'static str) -> ModelError {
        ModelError::WrongKind {
            model: self.name().to_string(),
            kind: self.kind(),
            operation,
        }
    }
}

impl PartialEq for ModelType {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.def, &other.def)
    }
}

impl Eq for ModelType {}

impl fmt::Debug for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelType")
            .field("name", &self.def.name)
            .field("kind", &self.def.kind)
            .field("registered", &self.def.explicit)
            .finish()
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
