//! Module arguments: an optional JSON/TOML file plus `-a key=value` pairs.

use crate::paths;
use anyhow::{Context, Result, bail};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// Merge arguments from a file and the command line.
///
/// Command-line pairs win over the file. `subscription_id` falls back to
/// `default_subscription` when the type needs one and none was given.
pub fn load(
    file: Option<&Path>,
    pairs: &[String],
    default_subscription: Option<&str>,
    identity_fields: &[&str],
) -> Result<Map<String, Value>> {
    let mut args = match file {
        Some(path) => read_file(path)?,
        None => Map::new(),
    };
    for pair in pairs {
        let (key, value) = parse_pair(pair)?;
        args.insert(key, value);
    }
    if identity_fields.contains(&"subscription_id")
        && !args.contains_key("subscription_id")
        && let Some(subscription) = default_subscription
    {
        log::debug!("Using default subscription {subscription}");
        args.insert(
            "subscription_id".to_string(),
            Value::String(subscription.to_string()),
        );
    }
    Ok(args)
}

/// Read an arguments file. `.toml` files are TOML, everything else JSON.
pub fn read_file(path: &Path) -> Result<Map<String, Value>> {
    let path = paths::expand(&path.to_string_lossy());
    let content = fs::read_to_string(&path)
        .with_context(|| format!("Could not read {}", path.display()))?;

    let value: Value = if path.extension().is_some_and(|ext| ext == "toml") {
        let table: toml::Table = toml::from_str(&content)
            .with_context(|| format!("Invalid TOML in {}", path.display()))?;
        serde_json::to_value(table)?
    } else {
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid JSON in {}", path.display()))?
    };

    match value {
        Value::Object(map) => Ok(map),
        _ => bail!("{} must contain a mapping of arguments", path.display()),
    }
}

/// Parse `key=value`. The value is read as JSON and falls back to a plain string.
pub fn parse_pair(pair: &str) -> Result<(String, Value)> {
    let Some((key, raw)) = pair.split_once('=') else {
        bail!("expected key=value, got '{pair}'");
    };
    let key = key.trim();
    if key.is_empty() {
        bail!("empty argument name in '{pair}'");
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}
