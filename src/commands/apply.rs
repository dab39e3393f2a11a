use anyhow::Result;
use reconcile::{Invocation, ManagementApi, Outcome, Reconciler, ResourceType};
use serde_json::{Map, Value};

use crate::Context;
use crate::args;
use crate::cli::{ApplyArgs, OutputFormat};
use crate::config::Settings;
use crate::progress::Spinner;
use crate::ui;

pub fn run(ctx: &Context, args: ApplyArgs) -> Result<()> {
    let settings = Settings::load(ctx.config.as_deref())?;
    let resource_type = super::resolve_type(&args.resource_type)?;
    let module_args = args::load(
        args.source.file.as_deref(),
        &args.source.pairs,
        settings.subscription_id.as_deref(),
        &resource_type.identity_fields(),
    )?;

    let reconciler = super::reconciler(ctx, &settings);
    let outcome = execute(&reconciler, resource_type, &module_args, args.check, ctx.quiet)?;

    if args.diff {
        ui::differences(&outcome.differences);
    }
    match ctx.output {
        OutputFormat::Json => super::print_json(&outcome),
        OutputFormat::Text => {
            print_text(resource_type, &module_args, &outcome);
            Ok(())
        }
    }
}

/// Validate the arguments and run one reconciliation.
pub fn execute<A: ManagementApi>(
    reconciler: &Reconciler<A>,
    resource_type: &ResourceType,
    module_args: &Map<String, Value>,
    check_mode: bool,
    quiet: bool,
) -> reconcile::Result<Outcome> {
    let invocation = Invocation::from_args(resource_type, module_args, check_mode)?;
    log::info!(
        "{} {}: want {:?}{}",
        resource_type.name,
        invocation.identity,
        invocation.lifecycle,
        if check_mode { " (check mode)" } else { "" }
    );
    let mut spinner = Spinner::new(
        format!("{} {}", resource_type.name, invocation.identity.name()),
        quiet,
    );
    reconciler.reconcile(&invocation, &mut spinner)
}

fn print_text(resource_type: &ResourceType, module_args: &Map<String, Value>, outcome: &Outcome) {
    let name = module_args
        .get("name")
        .map_or_else(|| resource_type.name.to_string(), ui::scalar);
    let line = format!(
        "{} {}: {}",
        resource_type.name,
        name,
        ui::decision_label(outcome.decision, outcome.check_mode)
    );
    if outcome.changed {
        ui::success(&line);
    } else {
        ui::unchanged(&line);
    }

    if let Some(resource) = &outcome.resource {
        for (key, value) in resource {
            if !value.is_object() && !value.is_array() {
                ui::kv(key, &ui::truncate(&ui::scalar(value), 80));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use reconcile::mock::MockApi;
    use reconcile::{Decision, KeyStyle, Method, PollConfig};
    use serde_json::json;

    const RG_PATH: &str = "/subscriptions/sub1/resourcegroups/rg1";

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn reconciler(api: &MockApi) -> Reconciler<&MockApi> {
        Reconciler::new(api)
            .with_poll_config(PollConfig::immediate())
            .with_key_style(KeyStyle::SnakeCase)
    }

    #[test]
    fn test_create_then_idempotent() {
        let api = MockApi::new();
        let rg = catalog::find("resource_group").unwrap();
        let module_args = args(json!({
            "subscription_id": "sub1",
            "name": "rg1",
            "location": "westus",
            "tags": {"costCenter": "42"},
        }));

        let first = execute(&reconciler(&api), rg, &module_args, false, true).unwrap();
        assert!(first.changed);
        assert_eq!(first.decision, Decision::Create);
        let resource = first.resource.unwrap();
        assert_eq!(resource["location"], json!("westus"));
        assert_eq!(resource["provisioning_state"], json!("Succeeded"));
        // Tag keys are user data and keep their spelling.
        assert_eq!(resource["tags"], json!({"costCenter": "42"}));

        api.clear_requests();
        let second = execute(&reconciler(&api), rg, &module_args, false, true).unwrap();
        assert!(!second.changed);
        assert_eq!(second.decision, Decision::NoAction);
        assert!(api.mutations().is_empty());
    }

    #[test]
    fn test_check_mode_reports_without_writing() {
        let api = MockApi::new();
        let rg = catalog::find("resource_group").unwrap();
        let module_args = args(json!({"subscription_id": "sub1", "name": "rg1", "location": "westus"}));

        let outcome = execute(&reconciler(&api), rg, &module_args, true, true).unwrap();
        assert!(outcome.changed);
        assert!(outcome.check_mode);
        assert_eq!(outcome.decision, Decision::Create);
        assert!(outcome.resource.is_none());
        assert!(api.is_empty());
    }

    #[test]
    fn test_absent_deletes_existing() {
        let api = MockApi::new();
        api.insert(
            RG_PATH,
            json!({"id": RG_PATH, "name": "rg1", "location": "westus"}),
        );
        let rg = catalog::find("resource_group").unwrap();
        let module_args = args(json!({"subscription_id": "sub1", "name": "rg1", "state": "absent"}));

        let outcome = execute(&reconciler(&api), rg, &module_args, false, true).unwrap();
        assert!(outcome.changed);
        assert_eq!(outcome.decision, Decision::Delete);
        assert!(api.get(RG_PATH).is_none());

        let again = execute(&reconciler(&api), rg, &module_args, false, true).unwrap();
        assert!(!again.changed);
    }

    #[test]
    fn test_update_patches_tags_only() {
        let api = MockApi::new();
        api.insert(
            RG_PATH,
            json!({"id": RG_PATH, "name": "rg1", "location": "westus", "tags": {"env": "dev"}}),
        );
        let rg = catalog::find("resource_group").unwrap();
        let module_args = args(json!({
            "subscription_id": "sub1",
            "name": "rg1",
            "location": "WestUS",
            "tags": {"env": "prod"},
        }));

        let outcome = execute(&reconciler(&api), rg, &module_args, false, true).unwrap();
        assert_eq!(outcome.decision, Decision::Update);
        let mutations = api.mutations();
        assert_eq!(mutations.len(), 1);
        assert_eq!(mutations[0].method, Method::Patch);
        assert_eq!(mutations[0].body, Some(json!({"tags": {"env": "prod"}})));
    }

    #[test]
    fn test_numeric_looking_name_from_pair() {
        let api = MockApi::new();
        let rg = catalog::find("resource_group").unwrap();
        let pairs = ["subscription_id=sub1", "name=2024", "location=westus"]
            .map(String::from);
        let module_args = crate::args::load(None, &pairs, None, &rg.identity_fields()).unwrap();
        assert_eq!(module_args["name"], json!(2024));

        let outcome = execute(&reconciler(&api), rg, &module_args, false, true).unwrap();
        assert_eq!(outcome.decision, Decision::Create);
        assert_eq!(outcome.resource.unwrap()["name"], json!("2024"));
    }

    #[test]
    fn test_read_only_type_is_rejected() {
        let api = MockApi::new();
        let subscription = catalog::find("subscription").unwrap();
        let err = execute(
            &reconciler(&api),
            subscription,
            &args(json!({"subscription_id": "sub1"})),
            false,
            true,
        )
        .unwrap_err();
        assert_eq!(err.category(), reconcile::ErrorCategory::Validation);
        assert!(api.requests().is_empty());
    }

    #[test]
    fn test_missing_identity_is_a_validation_error() {
        let api = MockApi::new();
        let rg = catalog::find("resource_group").unwrap();
        let err = execute(&reconciler(&api), rg, &args(json!({"name": "rg1"})), false, true)
            .unwrap_err();
        assert!(err.to_string().contains("subscription_id"));
    }
}
