//! # Behavior Overrides
//!
//! A [`Behavior`] is the user-supplied layer on top of a model's generic
//! per-kind handling:
//!
//! - **validators** run after the structural checks pass, in the order they
//!   were added; the first failure rejects the value;
//! - **accessors** compute derived values from an instance's canonical value
//!   (e.g. a `fullname` from `firstName` and `lastName`);
//! - an optional **adapter** rewrites input before it is coerced, so a model
//!   can accept an alternative input shape (e.g. a date string for a date
//!   record).
//!
//! Behaviors are attached at registration and apply wherever the model is
//! used, including as a nested field, element, or union branch of another
//! model.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use avm_core::Datum;

/// Validation predicate over a canonical value.
pub type Validator = Arc<dyn Fn(&Datum) -> Result<(), String> + Send + Sync>;

/// Derived-value accessor over a canonical value.
pub type Accessor = Arc<dyn Fn(&Datum) -> Datum + Send + Sync>;

/// Input rewrite applied before coercion.
pub type Adapter = Arc<dyn Fn(Datum) -> Datum + Send + Sync>;

/// User overrides attached to a registered model.
#[derive(Clone, Default)]
pub struct Behavior {
    validators: Vec<Validator>,
    accessors: BTreeMap<String, Accessor>,
    adapter: Option<Adapter>,
}

impl Behavior {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a validation predicate. `Err` carries the rejection reason.
    pub fn with_validator(
        mut self,
        validator: impl Fn(&Datum) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }

    /// Add a named derived accessor. A later accessor with the same name
    /// replaces the earlier one.
    pub fn with_accessor(
        mut self,
        name: impl Into<String>,
        accessor: impl Fn(&Datum) -> Datum + Send + Sync + 'static,
    ) -> Self {
        self.accessors.insert(name.into(), Arc::new(accessor));
        self
    }

    /// Set the input adapter.
    pub fn with_adapter(mut self, adapter: impl Fn(Datum) -> Datum + Send + Sync + 'static) -> Self {
        self.adapter = Some(Arc::new(adapter));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty() && self.accessors.is_empty() && self.adapter.is_none()
    }

    /// Run the validators in order.
    ///
    /// # Errors
    ///
    /// Returns the first validator's rejection reason.
    pub fn validate(&self, value: &Datum) -> Result<(), String> {
        self.validators.iter().try_for_each(|v| v(value))
    }

    /// Apply the adapter, if any.
    pub fn adapt(&self, value: Datum) -> Datum {
        match &self.adapter {
            Some(adapter) => adapter(value),
            None => value,
        }
    }

    pub fn accessor(&self, name: &str) -> Option<&Accessor> {
        self.accessors.get(name)
    }

    pub fn accessor_names(&self) -> impl Iterator<Item = &str> {
        self.accessors.keys().map(String::as_str)
    }
}

impl fmt::Debug for Behavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Behavior")
            .field("validators", &self.validators.len())
            .field("accessors", &self.accessors.keys().collect::<Vec<_>>())
            .field("adapter", &self.adapter.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validators_run_in_order() {
        let behavior = Behavior::new()
            .with_validator(|v| if v.is_null() { Err("first".into()) } else { Ok(()) })
            .with_validator(|_| Err("second".into()));
        assert_eq!(behavior.validate(&Datum::Null), Err("first".to_string()));
        assert_eq!(behavior.validate(&Datum::from(1)), Err("second".to_string()));
    }

    #[test]
    fn test_accessor_lookup() {
        let behavior = Behavior::new().with_accessor("double", |v| {
            Datum::from(v.as_i64().unwrap_or_default() * 2)
        });
        let accessor = behavior.accessor("double").unwrap();
        assert_eq!(accessor(&Datum::from(21)), Datum::from(42));
        assert!(behavior.accessor("missing").is_none());
        assert_eq!(behavior.accessor_names().collect::<Vec<_>>(), vec!["double"]);
    }

    #[test]
    fn test_adapter_defaults_to_identity() {
        assert!(Behavior::new().is_empty());
        assert_eq!(Behavior::new().adapt(Datum::from("x")), Datum::from("x"));
        let upper = Behavior::new().with_adapter(|v| match v {
            Datum::String(s) => Datum::String(s.to_uppercase()),
            other => other,
        });
        assert!(!upper.is_empty());
        assert_eq!(upper.adapt(Datum::from("a")), Datum::from("A"));
    }
}
