use anyhow::Result;
use colored::Colorize;
use reconcile::{ResourceType, STATE_ARG, WriteMode};
use serde::Serialize;

use crate::Context;
use crate::catalog;
use crate::cli::OutputFormat;
use crate::ui;

#[derive(Debug, Serialize)]
pub struct TypeSummary {
    pub name: &'static str,
    pub description: &'static str,
    pub api_version: &'static str,
    pub path: &'static str,
    pub write_mode: WriteMode,
    pub info_only: bool,
}

#[derive(Debug, Serialize)]
pub struct ArgumentDoc {
    pub name: String,
    pub kind: String,
    pub identity: bool,
    pub required_on_create: bool,
    pub mutable: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub help: String,
}

impl TypeSummary {
    fn of(resource_type: &ResourceType) -> Self {
        Self {
            name: resource_type.name,
            description: resource_type.description,
            api_version: resource_type.api_version,
            path: resource_type.path_template.0,
            write_mode: resource_type.write_mode,
            info_only: resource_type.info_only,
        }
    }
}

/// Every argument a type accepts: identity fields, `state`, then properties.
pub fn arguments(resource_type: &ResourceType) -> Vec<ArgumentDoc> {
    let mut docs: Vec<ArgumentDoc> = resource_type
        .identity_fields()
        .into_iter()
        .map(|name| ArgumentDoc {
            name: name.to_string(),
            kind: "string".to_string(),
            identity: true,
            required_on_create: true,
            mutable: false,
            help: String::new(),
        })
        .collect();

    if resource_type.info_only {
        return docs;
    }

    docs.push(ArgumentDoc {
        name: STATE_ARG.to_string(),
        kind: "present|absent".to_string(),
        identity: false,
        required_on_create: false,
        mutable: true,
        help: "Whether the resource should exist (default: present)".to_string(),
    });
    docs.extend(resource_type.fields.iter().map(|field| ArgumentDoc {
        name: field.name.to_string(),
        kind: field.kind.label(),
        identity: false,
        required_on_create: field.required_on_create,
        mutable: field.modifier.is_mutable(),
        help: field.help.to_string(),
    }));
    docs
}

pub fn list(ctx: &Context) -> Result<()> {
    let summaries: Vec<TypeSummary> = catalog::TYPES.iter().map(|t| TypeSummary::of(t)).collect();
    match ctx.output {
        OutputFormat::Json => super::print_json(&summaries),
        OutputFormat::Text => {
            ui::header("Resource types");
            for summary in &summaries {
                let suffix = if summary.info_only {
                    " (info only)".dimmed().to_string()
                } else {
                    String::new()
                };
                println!(
                    "  {:<28} {}{}",
                    summary.name.cyan(),
                    summary.description,
                    suffix
                );
            }
            Ok(())
        }
    }
}

pub fn describe(ctx: &Context, name: &str) -> Result<()> {
    let resource_type = super::resolve_type(name)?;
    let docs = arguments(resource_type);
    match ctx.output {
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct Description {
                #[serde(flatten)]
                summary: TypeSummary,
                arguments: Vec<ArgumentDoc>,
            }
            super::print_json(&Description {
                summary: TypeSummary::of(resource_type),
                arguments: docs,
            })
        }
        OutputFormat::Text => {
            ui::header(&format!("{} - {}", resource_type.name, resource_type.description));
            ui::kv("api-version", resource_type.api_version);
            ui::kv("path", resource_type.path_template.0);
            println!();
            for doc in &docs {
                let mut flags = Vec::new();
                if doc.identity {
                    flags.push("identity");
                } else if doc.required_on_create {
                    flags.push("required on create");
                }
                if !doc.identity && !doc.mutable {
                    flags.push("create-only");
                }
                let flags = if flags.is_empty() {
                    String::new()
                } else {
                    format!(" [{}]", flags.join(", "))
                };
                println!(
                    "  {:<32} {}{}",
                    doc.name.bold(),
                    doc.kind.dimmed(),
                    flags.yellow()
                );
                if !doc.help.is_empty() {
                    ui::hint(&format!("    {}", doc.help));
                }
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arguments_lists_identity_first() {
        let subnet = catalog::find("subnet").unwrap();
        let docs = arguments(subnet);
        let names: Vec<&str> = docs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(
            &names[..5],
            &[
                "subscription_id",
                "resource_group",
                "virtual_network_name",
                "name",
                "state"
            ]
        );
        assert!(names.contains(&"address_prefix"));
    }

    #[test]
    fn test_read_only_type_has_no_state() {
        let subscription = catalog::find("subscription").unwrap();
        let docs = arguments(subscription);
        assert!(docs.iter().all(|d| d.identity));
        assert!(docs.iter().all(|d| d.name != STATE_ARG));
    }

    #[test]
    fn test_location_is_create_only() {
        let rg = catalog::find("resource_group").unwrap();
        let location = arguments(rg)
            .into_iter()
            .find(|d| d.name == "location")
            .unwrap();
        assert!(location.required_on_create);
        assert!(!location.mutable);
    }

    #[test]
    fn test_summary_serializes_write_mode() {
        let vnet = catalog::find("virtual_network").unwrap();
        let value = serde_json::to_value(TypeSummary::of(vnet)).unwrap();
        assert_eq!(value["write_mode"], "replace");
        assert_eq!(value["info_only"], false);
    }
}
