//! Result normalizer: flattens resource documents for the caller.

use crate::fetch::Response;
use serde::Serialize;
use serde_json::{Map, Value};

/// Keys that belong to the resource envelope rather than to `properties`.
pub const ENVELOPE_KEYS: &[&str] = &[
    "id",
    "name",
    "type",
    "location",
    "tags",
    "etag",
    "sku",
    "kind",
    "zones",
    "identity",
    "plan",
    "extendedLocation",
    "managedBy",
    "systemData",
];

/// Key spelling of the output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KeyStyle {
    /// Keep the service's camelCase keys.
    #[default]
    Preserve,
    /// Convert every key to snake_case, recursively.
    SnakeCase,
}

/// A normalized read result. Paging cursors are passed through, never followed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizedPage {
    pub items: Vec<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_link: Option<String>,
}

/// Flatten one resource document.
///
/// Members of `properties` move to the top level unless their name is
/// already used by the envelope; those stay under `properties`. A
/// non-object input becomes `{ "value": input }`.
#[must_use]
pub fn normalize(raw: &Value, style: KeyStyle) -> Map<String, Value> {
    let Value::Object(document) = raw else {
        let mut wrapped = Map::new();
        wrapped.insert("value".to_string(), raw.clone());
        return wrapped;
    };

    let mut flat = Map::new();
    let mut kept = Map::new();
    for (name, value) in document {
        if name != "properties" {
            flat.insert(name.clone(), value.clone());
        }
    }
    if let Some(Value::Object(properties)) = document.get("properties") {
        for (name, value) in properties {
            if name == "properties"
                || flat.contains_key(name)
                || ENVELOPE_KEYS.contains(&name.as_str())
            {
                kept.insert(name.clone(), value.clone());
            } else {
                flat.insert(name.clone(), value.clone());
            }
        }
    } else if let Some(other) = document.get("properties") {
        flat.insert("properties".to_string(), other.clone());
    }
    if !kept.is_empty() {
        flat.insert("properties".to_string(), Value::Object(kept));
    }

    match style {
        KeyStyle::Preserve => flat,
        KeyStyle::SnakeCase => snake_map(flat),
    }
}

/// Normalize a read result into a sequence.
///
/// A single resource becomes a one-element page.
#[must_use]
pub fn normalize_response(response: &Response, style: KeyStyle) -> NormalizedPage {
    match response {
        Response::Single(resource) => NormalizedPage {
            items: vec![normalize(resource, style)],
            next_link: None,
        },
        Response::Page { items, next_link } => NormalizedPage {
            items: items.iter().map(|item| normalize(item, style)).collect(),
            next_link: next_link.clone(),
        },
    }
}

/// `provisioningState` -> `provisioning_state`, `OSType` -> `os_type`.
///
/// Keys that are not plain identifiers (tag names, for example) are left alone.
#[must_use]
pub fn snake_case(key: &str) -> String {
    if !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return key.to_string();
    }
    let chars: Vec<char> = key.chars().collect();
    let mut out = String::with_capacity(key.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1);
            let boundary = prev.is_some_and(|p| {
                p.is_ascii_lowercase()
                    || p.is_ascii_digit()
                    || (p.is_ascii_uppercase() && next.is_some_and(char::is_ascii_lowercase))
            });
            if boundary && !out.ends_with('_') {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Tag maps hold user data and keep their keys.
fn snake_entry((name, value): (String, Value)) -> (String, Value) {
    if name == "tags" {
        (name, value)
    } else {
        (snake_case(&name), snake_keys(value))
    }
}

/// Convert the keys of one object level.
///
/// Keys already in snake_case claim their spelling first. A converted key
/// that would land on a taken name keeps its original spelling.
fn snake_map(map: Map<String, Value>) -> Map<String, Value> {
    let (plain, converted): (Vec<_>, Vec<_>) = map
        .into_iter()
        .partition(|(name, _)| snake_case(name) == *name);
    let mut out = Map::new();
    for entry in plain {
        let (name, value) = snake_entry(entry);
        out.insert(name, value);
    }
    for (original, value) in converted {
        let (name, value) = snake_entry((original.clone(), value));
        if out.contains_key(&name) {
            out.insert(original, value);
        } else {
            out.insert(name, value);
        }
    }
    out
}

fn snake_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(snake_map(map)),
        Value::Array(items) => Value::Array(items.into_iter().map(snake_keys).collect()),
        other => other,
    }
}
