//! Desired state: the property values the caller asked for.

use crate::error::{Error, Result};
use crate::path::PropertyPath;
use crate::schema::{Modifiers, ResourceType};
use log::debug;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Immutable mapping from property path to desired value.
///
/// Built once per invocation through [`DesiredStateBuilder`] or
/// [`DesiredState::from_args`] and then only read.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DesiredState {
    properties: BTreeMap<PropertyPath, Value>,
}

impl DesiredState {
    /// Start building a desired state.
    #[must_use]
    pub fn builder() -> DesiredStateBuilder {
        DesiredStateBuilder::default()
    }

    /// Build the desired state for `resource_type` from caller arguments.
    ///
    /// Identity fields and `reserved` keys (like `state`) are skipped.
    /// Unknown arguments and values that fail the field's type check are
    /// rejected before anything is sent.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` for unknown or ill-typed arguments.
    pub fn from_args(
        resource_type: &ResourceType,
        args: &Map<String, Value>,
        reserved: &[&str],
    ) -> Result<Self> {
        let identity = resource_type.identity_fields();
        let mut builder = Self::builder();
        for (name, value) in args {
            let name_str = name.as_str();
            if identity.iter().any(|f| *f == name_str) || reserved.iter().any(|f| *f == name_str) {
                continue;
            }
            let field = resource_type.field(name).ok_or_else(|| {
                Error::validation(name, format!("not a parameter of {}", resource_type.name))
            })?;
            if value.is_null() {
                continue;
            }
            let value = field.kind.check(name, value.clone())?;
            builder = builder.set(field.property_path()?, value);
        }
        let state = builder.build();
        debug!("desired state for {}: {} properties", resource_type.name, state.len());
        Ok(state)
    }

    /// Iterate `(path, value)` pairs in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&PropertyPath, &Value)> {
        self.properties.iter()
    }

    /// Value at `path`, if specified.
    #[must_use]
    pub fn get(&self, path: &PropertyPath) -> Option<&Value> {
        self.properties.get(path)
    }

    /// Whether `path` was specified.
    #[must_use]
    pub fn contains(&self, path: &PropertyPath) -> bool {
        self.properties.contains_key(path)
    }

    /// Number of specified properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Whether nothing was specified.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Render into a nested JSON request body.
    #[must_use]
    pub fn to_body(&self) -> Value {
        self.render(|_| true)
    }

    /// Render only the properties that may change after creation.
    #[must_use]
    pub fn mutable_body(&self, modifiers: &Modifiers) -> Value {
        self.render(|path| modifiers.is_mutable(path))
    }

    /// Overlay the mutable properties onto an existing document.
    #[must_use]
    pub fn overlay_mutable(&self, base: &Value, modifiers: &Modifiers) -> Value {
        let mut document = if base.is_object() {
            base.clone()
        } else {
            Value::Object(Map::new())
        };
        for (path, value) in self.iter().filter(|(p, _)| modifiers.is_mutable(p)) {
            path.insert(&mut document, value.clone());
        }
        document
    }

    fn render(&self, keep: impl Fn(&PropertyPath) -> bool) -> Value {
        let mut body = Value::Object(Map::new());
        for (path, value) in self.iter().filter(|(p, _)| keep(p)) {
            path.insert(&mut body, value.clone());
        }
        body
    }
}

/// Builder for [`DesiredState`].
#[derive(Debug, Default)]
pub struct DesiredStateBuilder {
    properties: BTreeMap<PropertyPath, Value>,
}

impl DesiredStateBuilder {
    /// Set a property. `null` leaves the property unspecified.
    #[must_use]
    pub fn set(mut self, path: PropertyPath, value: Value) -> Self {
        if value.is_null() {
            self.properties.remove(&path);
        } else {
            self.properties.insert(path, value);
        }
        self
    }

    /// Parse `path` and set it.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a malformed path.
    pub fn set_path(self, path: &str, value: Value) -> Result<Self> {
        Ok(self.set(PropertyPath::parse(path)?, value))
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> DesiredState {
        DesiredState {
            properties: self.properties,
        }
    }
}
