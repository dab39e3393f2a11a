use anyhow::Result;
use reconcile::{ManagementApi, NormalizedPage, Reconciler, ResourceType};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::Context;
use crate::args;
use crate::cli::{InfoArgs, OutputFormat};
use crate::config::Settings;
use crate::ui;

/// Upper bound on pages fetched by `--all-pages`.
const MAX_PAGES: usize = 1000;

/// Result of an info query. Queries never change anything.
#[derive(Debug, Serialize)]
pub struct InfoReport {
    pub changed: bool,
    pub resources: Vec<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_link: Option<String>,
}

pub fn run(ctx: &Context, args: InfoArgs) -> Result<()> {
    let settings = Settings::load(ctx.config.as_deref())?;
    let resource_type = super::resolve_type(&args.resource_type)?;
    let module_args = args::load(
        args.source.file.as_deref(),
        &args.source.pairs,
        settings.subscription_id.as_deref(),
        &resource_type.identity_fields(),
    )?;

    let reconciler = super::reconciler(ctx, &settings);
    let report = query(&reconciler, resource_type, &module_args, args.all_pages)?;

    match ctx.output {
        OutputFormat::Json => super::print_json(&report),
        OutputFormat::Text => {
            print_text(resource_type, &report);
            Ok(())
        }
    }
}

/// Read one resource or a collection page, optionally following cursors.
pub fn query<A: ManagementApi>(
    reconciler: &Reconciler<A>,
    resource_type: &ResourceType,
    module_args: &Map<String, Value>,
    all_pages: bool,
) -> reconcile::Result<InfoReport> {
    let NormalizedPage {
        mut items,
        mut next_link,
    } = reconciler.info(resource_type, module_args)?;

    let mut pages = 1;
    while all_pages && pages < MAX_PAGES {
        let Some(link) = next_link.take() else {
            break;
        };
        log::debug!("Following nextLink (page {})", pages + 1);
        let page = reconciler.next_page(&link)?;
        items.extend(page.items);
        next_link = page.next_link;
        pages += 1;
    }
    if next_link.is_some() && all_pages {
        log::warn!("Stopped after {MAX_PAGES} pages; returning the remaining cursor");
    }

    Ok(InfoReport {
        changed: false,
        resources: items,
        next_link,
    })
}

fn print_text(resource_type: &ResourceType, report: &InfoReport) {
    ui::header(&format!(
        "{} ({} found)",
        resource_type.description,
        report.resources.len()
    ));
    for resource in &report.resources {
        let name = resource.get("name").map_or_else(|| "-".to_string(), ui::scalar);
        let location = resource.get("location").map(ui::scalar).unwrap_or_default();
        let state = resource
            .get("provisioning_state")
            .or_else(|| resource.get("provisioningState"))
            .map(ui::scalar)
            .unwrap_or_default();
        println!("  {:<40} {:<16} {}", ui::truncate(&name, 40), location, state);
    }
    if report.next_link.is_some() {
        ui::hint("More results available; re-run with --all-pages");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use reconcile::KeyStyle;
    use reconcile::mock::MockApi;
    use serde_json::json;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn seed_networks(api: &MockApi, count: usize) {
        for i in 0..count {
            let path = format!(
                "/subscriptions/sub1/resourceGroups/rg1/providers/Microsoft.Network/virtualNetworks/vnet{i}"
            );
            api.insert(
                &path,
                json!({
                    "id": path,
                    "name": format!("vnet{i}"),
                    "location": "westus",
                    "properties": {"provisioningState": "Succeeded"},
                }),
            );
        }
    }

    #[test]
    fn test_single_resource() {
        let api = MockApi::new();
        seed_networks(&api, 2);
        let reconciler = Reconciler::new(&api).with_key_style(KeyStyle::SnakeCase);
        let vnet = catalog::find("virtual_network").unwrap();

        let report = query(
            &reconciler,
            vnet,
            &args(json!({"subscription_id": "sub1", "resource_group": "rg1", "name": "vnet1"})),
            false,
        )
        .unwrap();
        assert!(!report.changed);
        assert_eq!(report.resources.len(), 1);
        assert_eq!(report.resources[0]["name"], json!("vnet1"));
        assert_eq!(report.resources[0]["provisioning_state"], json!("Succeeded"));
    }

    #[test]
    fn test_missing_resource_is_empty() {
        let api = MockApi::new();
        let reconciler = Reconciler::new(&api);
        let rg = catalog::find("resource_group").unwrap();

        let report = query(
            &reconciler,
            rg,
            &args(json!({"subscription_id": "sub1", "name": "missing"})),
            false,
        )
        .unwrap();
        assert!(report.resources.is_empty());
        assert!(report.next_link.is_none());
    }

    #[test]
    fn test_first_page_keeps_cursor() {
        let api = MockApi::new().with_page_size(2);
        seed_networks(&api, 5);
        let reconciler = Reconciler::new(&api);
        let vnet = catalog::find("virtual_network").unwrap();
        let scope = args(json!({"subscription_id": "sub1", "resource_group": "rg1"}));

        let report = query(&reconciler, vnet, &scope, false).unwrap();
        assert_eq!(report.resources.len(), 2);
        assert!(report.next_link.is_some());
    }

    #[test]
    fn test_all_pages_follows_cursors() {
        let api = MockApi::new().with_page_size(2);
        seed_networks(&api, 5);
        let reconciler = Reconciler::new(&api);
        let vnet = catalog::find("virtual_network").unwrap();
        let scope = args(json!({"subscription_id": "sub1", "resource_group": "rg1"}));

        let report = query(&reconciler, vnet, &scope, true).unwrap();
        assert_eq!(report.resources.len(), 5);
        assert!(report.next_link.is_none());
        assert_eq!(api.requests().len(), 3);
    }

    #[test]
    fn test_report_serialization() {
        let report = InfoReport {
            changed: false,
            resources: vec![],
            next_link: None,
        };
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            json!({"changed": false, "resources": []})
        );
    }
}
