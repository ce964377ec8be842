//! # Model Instances
//!
//! An [`Instance`] pairs a [`ModelType`] with one canonical [`Datum`]. The
//! value always conforms to the model: construction conforms it, and every
//! mutation conforms the new part through the part's own model, re-runs the
//! owner's validators on the whole candidate value, and only then swaps it
//! in. A failed mutation leaves the instance exactly as it was.
//!
//! Instances never contain instances. Passing an instance where a value is
//! expected converts it to its canonical value, so nesting always copies
//! plain data and two instances never share mutable state.

use std::fmt;

use avm_core::{CanonicalBytes, Datum};

use crate::error::ModelError;
use crate::model::{ModelKind, ModelType};

/// A validated value of a model.
#[derive(Clone)]
pub struct Instance {
    model: ModelType,
    value: Datum,
    /// Selected branch, for union instances.
    branch: Option<usize>,
}

impl Instance {
    /// Construct an instance of `model`. Same as [`ModelType::construct`].
    ///
    /// # Errors
    ///
    /// `Validation` or `NoMatch` if the value does not conform.
    pub fn new(model: &ModelType, value: impl Into<Datum>) -> Result<Self, ModelError> {
        model.construct(value)
    }

    pub(crate) fn from_parts(model: ModelType, value: Datum, branch: Option<usize>) -> Self {
        Self { model, value, branch }
    }

    pub fn model(&self) -> &ModelType {
        &self.model
    }

    /// The selected union branch index, `None` for other kinds.
    pub fn branch(&self) -> Option<usize> {
        self.branch
    }

    /// The model of the selected union branch.
    pub fn branch_model(&self) -> Option<Result<ModelType, ModelError>> {
        let index = self.branch?;
        let schema = self.model.branches()?.get(index)?;
        Some(self.model.registry().model_for(schema))
    }

    /// A record field's stored value.
    ///
    /// # Errors
    ///
    /// `WrongKind` for non-records, `UnknownField` for undeclared names.
    pub fn get(&self, field: &str) -> Result<&Datum, ModelError> {
        let fields = self.record_fields("get")?;
        fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, v)| v)
            .ok_or_else(|| self.unknown_field(field))
    }

    /// An array element.
    pub fn get_index(&self, index: usize) -> Result<&Datum, ModelError> {
        let elements = self.array_elements("get_index")?;
        elements.get(index).ok_or(ModelError::IndexOutOfBounds {
            index,
            len: elements.len(),
        })
    }

    /// A map value.
    pub fn get_key(&self, key: &str) -> Result<&Datum, ModelError> {
        match &self.value {
            Datum::Map(entries) if self.model.kind() == ModelKind::Map => {
                entries.get(key).ok_or_else(|| ModelError::MissingKey { key: key.to_string() })
            }
            _ => Err(self.model.wrong_kind("get_key")),
        }
    }

    /// A record field as an instance of the field's model.
    pub fn typed(&self, field: &str) -> Result<Instance, ModelError> {
        let value = self.get(field)?.clone();
        self.model.field_model(field)?.construct(value)
    }

    /// Replace a record field.
    ///
    /// # Errors
    ///
    /// `UnknownField` for undeclared names; `Validation` or `NoMatch` if the
    /// value does not conform to the field's model or the record's own
    /// validators reject the result.
    pub fn set(&mut self, field: &str, value: impl Into<Datum>) -> Result<(), ModelError> {
        let field_model = self.model.field_model(field)?;
        let canonical = field_model.conform(value)?;
        let mut candidate = self.value.clone();
        if let Datum::Record(fields) = &mut candidate {
            match fields.iter_mut().find(|(name, _)| name == field) {
                Some(slot) => slot.1 = canonical,
                None => return Err(self.unknown_field(field)),
            }
        }
        self.commit(candidate, "set")
    }

    /// Replace an array element.
    pub fn set_index(&mut self, index: usize, value: impl Into<Datum>) -> Result<(), ModelError> {
        let len = self.array_elements("set_index")?.len();
        if index >= len {
            return Err(ModelError::IndexOutOfBounds { index, len });
        }
        let canonical = self.model.item_model()?.conform(value)?;
        let mut candidate = self.value.clone();
        if let Datum::Array(elements) = &mut candidate {
            elements[index] = canonical;
        }
        self.commit(candidate, "set_index")
    }

    /// Append an array element.
    pub fn push(&mut self, value: impl Into<Datum>) -> Result<(), ModelError> {
        self.array_elements("push")?;
        let canonical = self.model.item_model()?.conform(value)?;
        let mut candidate = self.value.clone();
        if let Datum::Array(elements) = &mut candidate {
            elements.push(canonical);
        }
        self.commit(candidate, "push")
    }

    /// Insert or replace a map value.
    pub fn set_key(&mut self, key: impl Into<String>, value: impl Into<Datum>) -> Result<(), ModelError> {
        let canonical = self.model.value_model()?.conform(value)?;
        let mut candidate = self.value.clone();
        if let Datum::Map(entries) = &mut candidate {
            entries.insert(key.into(), canonical);
        }
        self.commit(candidate, "set_key")
    }

    /// Remove a map value, returning it.
    pub fn remove_key(&mut self, key: &str) -> Result<Datum, ModelError> {
        if self.model.kind() != ModelKind::Map {
            return Err(self.model.wrong_kind("remove_key"));
        }
        let mut candidate = self.value.clone();
        let removed = match &mut candidate {
            Datum::Map(entries) => entries.remove(key),
            _ => None,
        }
        .ok_or_else(|| ModelError::MissingKey { key: key.to_string() })?;
        self.commit(candidate, "remove_key")?;
        Ok(removed)
    }

    /// Number of elements, entries, or fields; zero for scalars.
    pub fn len(&self) -> usize {
        match &self.value {
            Datum::Array(elements) => elements.len(),
            Datum::Map(entries) => entries.len(),
            Datum::Record(fields) => fields.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evaluate a named accessor from the model's behavior.
    pub fn derived(&self, name: &str) -> Result<Datum, ModelError> {
        let accessor = self
            .model
            .behavior()
            .accessor(name)
            .ok_or_else(|| ModelError::UnknownAccessor {
                model: self.model.name().to_string(),
                name: name.to_string(),
            })?;
        Ok(accessor(&self.value))
    }

    /// The stored canonical value.
    pub fn to_canonical(&self) -> &Datum {
        &self.value
    }

    pub fn into_canonical(self) -> Datum {
        self.value
    }

    /// Deterministic JSON text of the canonical value.
    pub fn to_text(&self) -> String {
        self.value.to_text()
    }

    pub fn to_json(&self) -> serde_json::Value {
        self.value.to_json()
    }

    /// RFC 8785 canonical bytes of the canonical value.
    pub fn canonical_bytes(&self) -> Result<CanonicalBytes, ModelError> {
        Ok(CanonicalBytes::from_datum(&self.value)?)
    }

    /// Run the owner's validators on a candidate and store it.
    fn commit(&mut self, candidate: Datum, operation: &'static str) -> Result<(), ModelError> {
        self.model.check_behavior(&candidate)?;
        tracing::trace!(model = self.model.name(), operation, "instance updated");
        self.value = candidate;
        Ok(())
    }

    fn record_fields(&self, operation: &'static str) -> Result<&[(String, Datum)], ModelError> {
        match &self.value {
            Datum::Record(fields) if self.model.kind() == ModelKind::Record => Ok(fields),
            _ => Err(self.model.wrong_kind(operation)),
        }
    }

    fn array_elements(&self, operation: &'static str) -> Result<&[Datum], ModelError> {
        match &self.value {
            Datum::Array(elements) if self.model.kind() == ModelKind::Array => Ok(elements),
            _ => Err(self.model.wrong_kind(operation)),
        }
    }

    fn unknown_field(&self, field: &str) -> ModelError {
        ModelError::UnknownField {
            model: self.model.name().to_string(),
            field: field.to_string(),
        }
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.model.name(), self.value)
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.value, f)
    }
}

impl From<Instance> for Datum {
    fn from(instance: Instance) -> Self {
        instance.value
    }
}

impl From<&Instance> for Datum {
    fn from(instance: &Instance) -> Self {
        instance.value.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Behavior, Registry};
    use serde_json::json;

    fn model(schema: serde_json::Value) -> ModelType {
        Registry::default().register(&schema, Behavior::default()).unwrap()
    }

    #[test]
    fn test_record_get_set() {
        let date = model(json!({"type": "record", "name": "Date", "fields": [
            {"name": "year", "type": "int"},
            {"name": "month", "type": "int"},
            {"name": "day", "type": "int"}
        ]}));
        let mut d = date.construct(Datum::record([("year", 1985), ("month", 4), ("day", 3)])).unwrap();
        assert_eq!(d.get("month").unwrap(), &Datum::from(4));
        d.set("month", 5).unwrap();
        assert_eq!(d.get("month").unwrap(), &Datum::from(5));

        let before = d.clone();
        let err = d.set("month", "May").unwrap_err();
        assert!(err.is_validation());
        assert_eq!(d, before);

        assert!(matches!(d.get("era"), Err(ModelError::UnknownField { .. })));
        assert!(matches!(d.set("era", 1), Err(ModelError::UnknownField { .. })));
        assert!(matches!(d.get_index(0), Err(ModelError::WrongKind { .. })));
        assert_eq!(d.len(), 3);
    }

    #[test]
    fn test_array_mutation() {
        let strings = model(json!({"type": "array", "items": "string"}));
        let mut a = strings.construct(Datum::from_json_str(r#"["a", "b"]"#).unwrap()).unwrap();
        let err = a.set_index(0, 5).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(a.get_index(0).unwrap(), &Datum::from("a"));

        a.set_index(1, "c").unwrap();
        a.push("d").unwrap();
        assert_eq!(a.to_text(), r#"["a","c","d"]"#);
        assert!(matches!(a.set_index(9, "x"), Err(ModelError::IndexOutOfBounds { index: 9, len: 3 })));
        assert!(matches!(a.get("x"), Err(ModelError::WrongKind { .. })));
    }

    #[test]
    fn test_map_mutation() {
        let longs = model(json!({"type": "map", "values": "long"}));
        let mut m = longs.construct(Datum::map([("a", 1)])).unwrap();
        m.set_key("b", 2).unwrap();
        assert_eq!(m.get_key("b").unwrap(), &Datum::from(2));
        assert!(m.set_key("c", "three").is_err());
        assert!(matches!(m.get_key("c"), Err(ModelError::MissingKey { .. })));
        assert_eq!(m.remove_key("a").unwrap(), Datum::from(1));
        assert_eq!(m.len(), 1);
        assert!(matches!(m.remove_key("a"), Err(ModelError::MissingKey { .. })));
    }

    #[test]
    fn test_owner_validators_guard_mutation() {
        let registry = Registry::default();
        let non_empty = Behavior::new().with_validator(|v| match v.as_array() {
            Some(items) if !items.is_empty() => Ok(()),
            _ => Err("must not be empty".into()),
        });
        let ints = registry
            .register(&json!({"type": "map", "values": "int"}), Behavior::default())
            .unwrap();
        let list = registry
            .register(&json!({"type": "array", "items": "int"}), non_empty)
            .unwrap();
        assert!(list.construct(Datum::Array(vec![])).is_err());
        let mut l = list.construct(Datum::from_json_str("[1]").unwrap()).unwrap();
        l.push(2).unwrap();
        assert_eq!(l.len(), 2);

        let mut m = ints.construct(Datum::map([("k", 1)])).unwrap();
        assert!(m.remove_key("k").is_ok());
        assert!(m.is_empty());
    }

    #[test]
    fn test_nested_instances_are_flattened() {
        let registry = Registry::default();
        let point = registry
            .register(
                &json!({"type": "record", "name": "Point", "fields": [
                    {"name": "x", "type": "double"}, {"name": "y", "type": "double"}
                ]}),
                Behavior::default(),
            )
            .unwrap();
        let line = registry
            .register(&json!({"type": "array", "items": "Point"}), Behavior::default())
            .unwrap();
        let mut p = point.construct(Datum::record([("x", 1.0), ("y", 2.0)])).unwrap();
        let l = line.construct(Datum::Array(vec![Datum::from(&p), Datum::from(p.clone())])).unwrap();

        p.set("x", 9.0).unwrap();
        assert_eq!(l.get_index(0).unwrap().field("x"), Some(&Datum::Float(1.0)));
        assert_eq!(l.to_text(), r#"[{"x":1.0,"y":2.0},{"x":1.0,"y":2.0}]"#);
    }

    #[test]
    fn test_union_instance_branch() {
        let u = model(json!(["null", "string"]));
        let none = u.construct(Datum::Null).unwrap();
        assert_eq!(none.branch(), Some(0));
        let some = u.construct("x").unwrap();
        assert_eq!(some.branch(), Some(1));
        assert_eq!(some.branch_model().unwrap().unwrap().name(), "string");
    }

    #[test]
    fn test_equality_ignores_model_identity() {
        let a = model(json!({"type": "array", "items": "long"}));
        let b = model(json!({"type": "array", "items": "long"}));
        assert_ne!(a, b);
        assert_eq!(a.construct(Datum::Array(vec![])).unwrap(), b.construct(Datum::Array(vec![])).unwrap());
    }

    #[test]
    fn test_derived_accessor() {
        let registry = Registry::default();
        let upper = registry
            .register(
                &json!("string"),
                Behavior::new().with_accessor("upper", |v| Datum::from(v.as_str().unwrap_or_default().to_uppercase())),
            )
            .unwrap();
        let s = upper.construct("abc").unwrap();
        assert_eq!(s.derived("upper").unwrap(), Datum::from("ABC"));
        assert!(matches!(s.derived("lower"), Err(ModelError::UnknownAccessor { .. })));
    }

    #[test]
    fn test_canonical_bytes_sort_keys() {
        let rec = model(json!({"type": "record", "name": "R", "fields": [
            {"name": "b", "type": "int"}, {"name": "a", "type": "int"}
        ]}));
        let r = rec.construct(Datum::record([("b", 1), ("a", 2)])).unwrap();
        assert_eq!(r.to_text(), r#"{"b":1,"a":2}"#);
        assert_eq!(r.canonical_bytes().unwrap().as_bytes(), br#"{"a":2,"b":1}"#);
    }
}
