//! Static resource schemas.
//!
//! Each resource type is described by a [`ResourceType`] table: where it
//! lives, which API version to use, and a list of [`FieldSpec`] tuples
//! mapping argument names to property paths with their comparison policy.
//! Tables are `const` data; nothing here is interpreted at runtime beyond
//! reading them.

use crate::error::{Error, Result};
use crate::identity::{CollectionRef, PathTemplate, ResourceIdentity};
use crate::path::PropertyPath;
use log::warn;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

/// How a property takes part in the comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    /// Deep equality; objects must carry the same (non-null) keys.
    Exact,
    /// Create-only. Never compared once the resource exists and never sent on update.
    Immutable,
    /// The desired value is a pattern: keys left out of it match anything.
    IgnoreAbsent,
}

/// How lists are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListOrder {
    /// Same elements in the same order.
    Ordered,
    /// Same elements in any order.
    Unordered,
}

/// How strings are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextMatch {
    Exact,
    IgnoreCase,
    /// Case and whitespace insensitive, so `West US` equals `westus`.
    Location,
}

/// Per-property comparison metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Modifier {
    pub policy: Policy,
    pub list_order: ListOrder,
    pub text: TextMatch,
}

impl Modifier {
    /// Pattern matching with ordered lists and exact strings.
    pub const DEFAULT: Self = Self {
        policy: Policy::IgnoreAbsent,
        list_order: ListOrder::Ordered,
        text: TextMatch::Exact,
    };

    /// Full deep equality.
    pub const EXACT: Self = Self::DEFAULT.with_policy(Policy::Exact);

    /// Create-only property.
    pub const IMMUTABLE: Self = Self::DEFAULT.with_policy(Policy::Immutable);

    /// Azure region: create-only, compared loosely.
    pub const LOCATION: Self = Self::IMMUTABLE.with_text(TextMatch::Location);

    #[must_use]
    pub const fn with_policy(self, policy: Policy) -> Self {
        Self { policy, ..self }
    }

    #[must_use]
    pub const fn with_list_order(self, list_order: ListOrder) -> Self {
        Self { list_order, ..self }
    }

    #[must_use]
    pub const fn with_text(self, text: TextMatch) -> Self {
        Self { text, ..self }
    }

    /// Whether the property may change after creation.
    #[must_use]
    pub fn is_mutable(&self) -> bool {
        self.policy != Policy::Immutable
    }
}

impl Default for Modifier {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Modifiers for every path of a resource type, with a fallback for the rest.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Modifiers {
    by_path: BTreeMap<PropertyPath, Modifier>,
    fallback: Modifier,
}

impl Modifiers {
    /// Empty set; every path uses [`Modifier::DEFAULT`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `fallback` for paths without an explicit modifier.
    #[must_use]
    pub fn with_fallback(mut self, fallback: Modifier) -> Self {
        self.fallback = fallback;
        self
    }

    /// Attach a modifier to a path.
    #[must_use]
    pub fn with(mut self, path: PropertyPath, modifier: Modifier) -> Self {
        self.by_path.insert(path, modifier);
        self
    }

    /// Modifier that applies to `path`.
    ///
    /// The closest ancestor with an explicit modifier wins, so a policy on
    /// `/properties/sharingProfile` also covers its children.
    #[must_use]
    pub fn get(&self, path: &PropertyPath) -> Modifier {
        self.by_path
            .iter()
            .filter(|(candidate, _)| path.starts_with(candidate))
            .max_by_key(|(candidate, _)| candidate.segments().len())
            .map_or(self.fallback, |(_, modifier)| *modifier)
    }

    /// Whether `path` may be sent on update.
    #[must_use]
    pub fn is_mutable(&self, path: &PropertyPath) -> bool {
        self.get(path).is_mutable()
    }
}

/// Type of a caller-supplied argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// String, optionally constrained by a regex.
    String { pattern: Option<&'static str> },
    Bool,
    Integer,
    Number,
    Object,
    List,
    /// One of a fixed set of strings (compared case-insensitively on input).
    Choice(&'static [&'static str]),
}

impl FieldKind {
    /// Unconstrained string.
    pub const STRING: Self = Self::String { pattern: None };

    /// Short name for help output.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::String { pattern: None } => "string".to_string(),
            Self::String {
                pattern: Some(pattern),
            } => format!("string /{pattern}/"),
            Self::Bool => "bool".to_string(),
            Self::Integer => "int".to_string(),
            Self::Number => "number".to_string(),
            Self::Object => "object".to_string(),
            Self::List => "list".to_string(),
            Self::Choice(choices) => choices.join("|"),
        }
    }

    /// Check `value` against this kind, returning the value to store.
    ///
    /// Choices are normalised to their canonical spelling.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming `field` on mismatch.
    pub fn check(&self, field: &str, value: Value) -> Result<Value> {
        let mismatch = |expected: &str| {
            Error::validation(field, format!("expected {expected}, got {value}"))
        };
        match self {
            Self::String { pattern } => {
                let Some(text) = scalar_text(&value) else {
                    return Err(mismatch("a string"));
                };
                if let Some(pattern) = pattern {
                    let regex = Regex::new(pattern).map_err(|e| {
                        Error::validation(field, format!("invalid schema pattern: {e}"))
                    })?;
                    if !regex.is_match(&text) {
                        return Err(Error::validation(
                            field,
                            format!("'{text}' does not match /{pattern}/"),
                        ));
                    }
                }
                Ok(Value::String(text))
            }
            Self::Bool if value.is_boolean() => Ok(value),
            Self::Bool => Err(mismatch("a boolean")),
            Self::Integer if value.is_i64() || value.is_u64() => Ok(value),
            Self::Integer => Err(mismatch("an integer")),
            Self::Number if value.is_number() => Ok(value),
            Self::Number => Err(mismatch("a number")),
            Self::Object if value.is_object() => Ok(value),
            Self::Object => Err(mismatch("an object")),
            Self::List if value.is_array() => Ok(value),
            Self::List => Err(mismatch("a list")),
            Self::Choice(choices) => {
                let canonical = value.as_str().and_then(|text| {
                    choices
                        .iter()
                        .find(|choice| choice.eq_ignore_ascii_case(text))
                });
                canonical
                    .map(|choice| Value::String((*choice).to_string()))
                    .ok_or_else(|| mismatch(&format!("one of {}", choices.join(", "))))
            }
        }
    }
}

/// Text form of a string, number or boolean.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// One row of a resource schema: `(name, json_path, modifier)` plus input checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Argument name as the caller writes it.
    pub name: &'static str,
    /// Property path in the resource document.
    pub path: &'static str,
    pub modifier: Modifier,
    pub kind: FieldKind,
    /// Must be present when the resource is created.
    pub required_on_create: bool,
    /// One-line help text.
    pub help: &'static str,
}

impl FieldSpec {
    /// A mutable, optional field compared with [`Modifier::DEFAULT`].
    pub const fn new(name: &'static str, path: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            path,
            modifier: Modifier::DEFAULT,
            kind,
            required_on_create: false,
            help: "",
        }
    }

    #[must_use]
    pub const fn modifier(self, modifier: Modifier) -> Self {
        Self { modifier, ..self }
    }

    #[must_use]
    pub const fn required(self) -> Self {
        Self {
            required_on_create: true,
            ..self
        }
    }

    #[must_use]
    pub const fn help(self, help: &'static str) -> Self {
        Self { help, ..self }
    }

    /// Parsed property path.
    ///
    /// # Errors
    ///
    /// Only fails for a malformed schema table.
    pub fn property_path(&self) -> Result<PropertyPath> {
        PropertyPath::parse(self.path)
    }
}

/// How create and update map onto HTTP calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// PUT to create, PATCH with mutable properties to update.
    Standard,
    /// PUT for both. Updates send the observed document with the mutable
    /// desired properties overlaid.
    Replace,
    /// A single implicit instance; create and update are the same PUT.
    Singleton,
}

/// Everything the core needs to know about one resource type.
#[derive(Debug, Clone, Copy)]
pub struct ResourceType {
    /// Catalogue name, e.g. `gallery_image`.
    pub name: &'static str,
    /// One-line description.
    pub description: &'static str,
    pub api_version: &'static str,
    pub path_template: PathTemplate,
    pub fields: &'static [FieldSpec],
    pub write_mode: WriteMode,
    /// Read-only types only support info queries.
    pub info_only: bool,
    /// List policy for paths without a field entry.
    pub default_list_order: ListOrder,
}

impl ResourceType {
    /// Names of the identity arguments (path placeholders).
    pub fn identity_fields(&self) -> Vec<&'static str> {
        self.path_template.placeholders()
    }

    /// Look up a field by argument name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Comparison modifiers for this type.
    ///
    /// Rows with malformed paths are skipped and logged.
    #[must_use]
    pub fn modifiers(&self) -> Modifiers {
        let fallback = Modifier::DEFAULT.with_list_order(self.default_list_order);
        self.fields
            .iter()
            .fold(Modifiers::new().with_fallback(fallback), |acc, field| {
                match field.property_path() {
                    Ok(path) => acc.with(path, field.modifier),
                    Err(e) => {
                        warn!("{}: skipping field {}: {e}", self.name, field.name);
                        acc
                    }
                }
            })
    }

    /// Identity argument values as text.
    ///
    /// Numbers and booleans are rendered, so a name such as `2024` that
    /// arrived as a JSON number still names the resource.
    #[must_use]
    pub fn identity_args(&self, args: &Map<String, Value>) -> HashMap<&'static str, String> {
        self.identity_fields()
            .into_iter()
            .filter_map(|field| Some((field, scalar_text(args.get(field)?)?)))
            .collect()
    }

    /// Render the identity from argument values.
    ///
    /// # Errors
    ///
    /// Returns a validation error for missing or blank identity fields.
    pub fn identity<'a>(&self, lookup: impl Fn(&str) -> Option<&'a str>) -> Result<ResourceIdentity> {
        self.path_template.render(self.api_version, lookup)
    }

    /// Render the collection scope from argument values.
    ///
    /// # Errors
    ///
    /// Returns a validation error for missing or blank scope fields.
    pub fn collection<'a>(&self, lookup: impl Fn(&str) -> Option<&'a str>) -> Result<CollectionRef> {
        self.path_template.render_collection(self.api_version, lookup)
    }
}
