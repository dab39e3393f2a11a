//! Property paths into nested JSON documents.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// A path into a nested resource document, e.g. `/properties/sharingProfile/groups`.
///
/// Both `/`-delimited and `.`-delimited spellings parse to the same path.
/// Numeric segments index into arrays when reading.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PropertyPath {
    segments: Vec<String>,
}

impl PropertyPath {
    /// Parse a path.
    ///
    /// # Errors
    ///
    /// Returns a validation error for empty paths and empty segments.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let body = trimmed.strip_prefix('/').unwrap_or(trimmed);
        if body.is_empty() {
            return Err(Error::validation(raw, "property path is empty"));
        }
        let delimiter = if trimmed.starts_with('/') || body.contains('/') {
            '/'
        } else {
            '.'
        };
        let segments: Vec<String> = body.split(delimiter).map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(Error::validation(raw, "property path has an empty segment"));
        }
        Ok(Self { segments })
    }

    /// Path segments, outermost first.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Whether `self` is `other` or lies underneath it.
    #[must_use]
    pub fn starts_with(&self, other: &Self) -> bool {
        self.segments.starts_with(&other.segments)
    }

    /// Read the value at this path.
    #[must_use]
    pub fn lookup<'a>(&self, document: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(document, |current, segment| match current {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            })
    }

    /// Write `value` at this path, creating intermediate objects as needed.
    ///
    /// Non-object intermediates are replaced by objects.
    pub fn insert(&self, document: &mut Value, value: Value) {
        let Some((last, parents)) = self.segments.split_last() else {
            return;
        };
        let mut current = document;
        for segment in parents {
            current = ensure_object(current)
                .entry(segment.clone())
                .or_insert_with(|| Value::Object(Map::new()));
        }
        ensure_object(current).insert(last.clone(), value);
    }

}

fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("value was just replaced by an object"),
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for PropertyPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PropertyPath {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<PropertyPath> for String {
    fn from(path: PropertyPath) -> Self {
        path.to_string()
    }
}
