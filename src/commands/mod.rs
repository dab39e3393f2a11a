//! Command implementations.
//!
//! - `apply` - Reconcile one resource to its desired state
//! - `info` - Read a resource or list a collection
//! - `types` - List the catalogue and describe one type

pub mod apply;
pub mod info;
pub mod types;

use anyhow::{Result, bail};
use armkit::ArmClient;
use reconcile::{Reconciler, ResourceType};
use serde::Serialize;

use crate::Context;
use crate::catalog;
use crate::config::Settings;
use crate::ui;

/// Resolve a type name against the catalogue.
pub fn resolve_type(name: &str) -> Result<&'static ResourceType> {
    match catalog::find(name) {
        Some(resource_type) => Ok(resource_type),
        None => bail!(
            "unknown resource type '{name}' (supported: {})",
            catalog::names().join(", ")
        ),
    }
}

/// Reconciler talking to the configured management endpoint.
pub fn reconciler(ctx: &Context, settings: &Settings) -> Reconciler<ArmClient> {
    let client = ArmClient::new(settings.client_config());
    log::debug!("Using endpoint {}", client.endpoint());
    if settings.token.is_none() && !ctx.quiet {
        ui::warn("No access token configured; requests will be anonymous");
    }
    Reconciler::new(client)
        .with_poll_config(settings.poll_config())
        .with_key_style(ctx.key_style)
}

/// Print a value as pretty JSON on stdout.
pub fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_type() {
        assert_eq!(resolve_type("virtual-network").unwrap().name, "virtual_network");
        let err = resolve_type("nope").unwrap_err().to_string();
        assert!(err.contains("unknown resource type 'nope'"));
        assert!(err.contains("resource_group"));
    }
}
