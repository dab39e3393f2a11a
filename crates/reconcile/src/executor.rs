//! Mutating executor: create, update and delete with long-running operation handling.
//!
//! Every mutation is a single request. When the service answers before the
//! work is done the executor blocks on [`Poller`] and, for writes, reads the
//! final resource back so callers always see the converged document.

use crate::api::{ApiResponse, ManagementApi, Method, Request};
use crate::desired::DesiredState;
use crate::error::{Error, Result};
use crate::fetch::{Observed, fetch};
use crate::identity::ResourceIdentity;
use crate::poll::{OperationStatus, PollConfig, PollObserver, Poller, provisioning_state};
use crate::schema::{ResourceType, WriteMode};
use log::{debug, info};
use serde_json::Value;

/// Issues mutating calls for one resource type.
pub struct Executor<'a, A: ?Sized> {
    api: &'a A,
    poll: &'a PollConfig,
}

impl<'a, A: ManagementApi + ?Sized> Executor<'a, A> {
    #[must_use]
    pub fn new(api: &'a A, poll: &'a PollConfig) -> Self {
        Self { api, poll }
    }

    /// PUT the full desired body and return the final resource.
    ///
    /// # Errors
    ///
    /// `Error::Api` when the PUT is rejected, plus any polling error.
    pub fn create(
        &self,
        identity: &ResourceIdentity,
        desired: &DesiredState,
        observer: &mut dyn PollObserver,
    ) -> Result<Value> {
        info!("creating {identity}");
        let request = Request::resource(
            Method::Put,
            identity.path(),
            identity.api_version(),
            Some(desired.to_body()),
        );
        self.write(identity, &request, observer)
    }

    /// Bring an existing resource in line with `desired`.
    ///
    /// Immutable properties are never sent. [`WriteMode::Standard`] PATCHes
    /// the mutable properties; the other modes PUT the observed document
    /// with the mutable properties overlaid.
    ///
    /// # Errors
    ///
    /// `Error::Api` when the write is rejected, plus any polling error.
    pub fn update(
        &self,
        resource_type: &ResourceType,
        identity: &ResourceIdentity,
        desired: &DesiredState,
        observed: &Value,
        observer: &mut dyn PollObserver,
    ) -> Result<Value> {
        let modifiers = resource_type.modifiers();
        let (method, body) = match resource_type.write_mode {
            WriteMode::Standard => (Method::Patch, desired.mutable_body(&modifiers)),
            WriteMode::Replace | WriteMode::Singleton => {
                (Method::Put, desired.overlay_mutable(observed, &modifiers))
            }
        };
        info!("updating {identity} ({method})");
        let request =
            Request::resource(method, identity.path(), identity.api_version(), Some(body));
        self.write(identity, &request, observer)
    }

    /// Delete a resource.
    ///
    /// Returns `false` when it was already gone.
    ///
    /// # Errors
    ///
    /// `Error::Api` for statuses other than 200/202/204/404, plus any
    /// polling error.
    pub fn delete(
        &self,
        identity: &ResourceIdentity,
        observer: &mut dyn PollObserver,
    ) -> Result<bool> {
        info!("deleting {identity}");
        let request = Request::resource(Method::Delete, identity.path(), identity.api_version(), None);
        let response = self.api.send(&request)?;

        match response.status {
            404 => {
                debug!("{identity}: already gone");
                Ok(false)
            }
            200 | 204 => Ok(true),
            201 | 202 => {
                if let Some(link) = response.polling_link() {
                    Poller::new(self.api, self.poll).wait_for_link(
                        &link,
                        response.retry_after,
                        observer,
                    )?;
                } else {
                    debug!("{identity}: delete accepted without a polling link");
                }
                Ok(true)
            }
            status => Err(Error::from_status(status, response.body.as_ref())),
        }
    }

    fn write(
        &self,
        identity: &ResourceIdentity,
        request: &Request,
        observer: &mut dyn PollObserver,
    ) -> Result<Value> {
        let response = self.api.send(request)?;
        if !response.is_success() {
            return Err(Error::from_status(response.status, response.body.as_ref()));
        }
        self.settle(identity, &response, observer)
    }

    /// Wait for a successful write to finish and read the result back.
    fn settle(
        &self,
        identity: &ResourceIdentity,
        response: &ApiResponse,
        observer: &mut dyn PollObserver,
    ) -> Result<Value> {
        let poller = Poller::new(self.api, self.poll);

        if let Some(link) = response.polling_link() {
            poller.wait_for_link(&link, response.retry_after, observer)?;
        } else if let Some(state) = response.body.as_ref().and_then(provisioning_state)
            && !OperationStatus::parse(state).is_terminal()
        {
            return poller.wait_for_provisioning(identity, observer);
        }

        match fetch(self.api, identity)? {
            Observed::Found(resource) => match provisioning_state(&resource) {
                Some(state) if OperationStatus::parse(state) == OperationStatus::Failed => {
                    Err(Error::OperationFailed {
                        status: state.to_string(),
                        code: None,
                        message: format!("{identity} ended in provisioningState {state}"),
                    })
                }
                _ => Ok(resource),
            },
            Observed::NotFound => Err(Error::InvalidResponse(format!(
                "{identity} not found after a successful write"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{Fault, MockApi};
    use crate::poll::NoObserver;
    use crate::schema::{FieldKind, FieldSpec, ListOrder, Modifier};
    use crate::identity::PathTemplate;
    use serde_json::json;
    use std::time::Duration;

    const FIELDS: &[FieldSpec] = &[
        FieldSpec::new("location", "/location", FieldKind::STRING).modifier(Modifier::LOCATION),
        FieldSpec::new("tags", "/tags", FieldKind::Object),
        FieldSpec::new("platform_fault_domain_count", "/properties/platformFaultDomainCount", FieldKind::Integer)
            .modifier(Modifier::IMMUTABLE),
    ];

    fn resource_type(write_mode: WriteMode) -> ResourceType {
        ResourceType {
            name: "availability_set",
            description: "test",
            api_version: "2023-03-01",
            path_template: PathTemplate(
                "/subscriptions/{subscription_id}/resourceGroups/{resource_group}/providers/Microsoft.Compute/availabilitySets/{name}",
            ),
            fields: FIELDS,
            write_mode,
            info_only: false,
            default_list_order: ListOrder::Ordered,
        }
    }

    fn identity() -> ResourceIdentity {
        resource_type(WriteMode::Standard)
            .identity(|k| match k {
                "subscription_id" => Some("sub"),
                "resource_group" => Some("rg"),
                "name" => Some("avset"),
                _ => None,
            })
            .unwrap()
    }

    fn desired() -> DesiredState {
        DesiredState::builder()
            .set_path("/location", json!("eastus"))
            .unwrap()
            .set_path("/tags", json!({"env": "prod"}))
            .unwrap()
            .set_path("/properties/platformFaultDomainCount", json!(2))
            .unwrap()
            .build()
    }

    #[test]
    fn test_create_puts_full_body_and_reads_back() {
        let api = MockApi::new();
        let config = PollConfig::immediate();
        let created = Executor::new(&api, &config)
            .create(&identity(), &desired(), &mut NoObserver)
            .unwrap();
        assert_eq!(created["location"], json!("eastus"));
        assert_eq!(created["properties"]["platformFaultDomainCount"], json!(2));

        let methods: Vec<Method> = api.requests().iter().map(|r| r.method).collect();
        assert_eq!(methods, vec![Method::Put, Method::Get]);
    }

    #[test]
    fn test_update_standard_patches_only_mutable() {
        let api = MockApi::new();
        api.insert(identity().path(), json!({
            "location": "eastus",
            "tags": {"env": "dev"},
            "properties": {"platformFaultDomainCount": 3}
        }));
        let observed = api.get(identity().path()).unwrap();
        let config = PollConfig::immediate();
        let updated = Executor::new(&api, &config)
            .update(
                &resource_type(WriteMode::Standard),
                &identity(),
                &desired(),
                &observed,
                &mut NoObserver,
            )
            .unwrap();

        let patch = api
            .requests()
            .into_iter()
            .find(|r| r.method == Method::Patch)
            .unwrap();
        assert_eq!(patch.body, Some(json!({"tags": {"env": "prod"}})));
        assert_eq!(updated["tags"], json!({"env": "prod"}));
        assert_eq!(updated["properties"]["platformFaultDomainCount"], json!(3));
    }

    #[test]
    fn test_update_replace_puts_overlay() {
        let api = MockApi::new();
        let observed = json!({
            "location": "eastus",
            "tags": {"env": "dev"},
            "properties": {"platformFaultDomainCount": 3}
        });
        api.insert(identity().path(), observed.clone());
        let config = PollConfig::immediate();
        Executor::new(&api, &config)
            .update(
                &resource_type(WriteMode::Replace),
                &identity(),
                &desired(),
                &observed,
                &mut NoObserver,
            )
            .unwrap();

        let put = api
            .requests()
            .into_iter()
            .find(|r| r.method == Method::Put)
            .unwrap();
        assert_eq!(
            put.body,
            Some(json!({
                "location": "eastus",
                "tags": {"env": "prod"},
                "properties": {"platformFaultDomainCount": 3}
            }))
        );
    }

    #[test]
    fn test_delete_is_idempotent() {
        let api = MockApi::new();
        api.insert(identity().path(), json!({"location": "eastus"}));
        let config = PollConfig::immediate();
        let executor = Executor::new(&api, &config);
        assert!(executor.delete(&identity(), &mut NoObserver).unwrap());
        assert!(!executor.delete(&identity(), &mut NoObserver).unwrap());
    }

    #[test]
    fn test_long_running_create_is_polled() {
        let api = MockApi::new().with_async_polls(2);
        let config = PollConfig::immediate();
        let created = Executor::new(&api, &config)
            .create(&identity(), &desired(), &mut NoObserver)
            .unwrap();
        assert_eq!(created["properties"]["provisioningState"], json!("Succeeded"));
        let polls = api
            .requests()
            .iter()
            .filter(|r| matches!(&r.target, crate::api::Target::Url(_)))
            .count();
        assert_eq!(polls, 3);
    }

    #[test]
    fn test_long_running_delete_is_polled() {
        let api = MockApi::new().with_async_polls(1);
        api.insert(identity().path(), json!({"location": "eastus"}));
        let config = PollConfig::immediate();
        assert!(
            Executor::new(&api, &config)
                .delete(&identity(), &mut NoObserver)
                .unwrap()
        );
        assert!(api.get(identity().path()).is_none());
    }

    #[test]
    fn test_async_failure_surfaces_operation_error() {
        let api = MockApi::new().with_async_polls(1);
        api.fail_operations("AllocationFailed", "no capacity in eastus");
        let config = PollConfig::immediate();
        let err = Executor::new(&api, &config)
            .create(&identity(), &desired(), &mut NoObserver)
            .unwrap_err();
        match err {
            Error::OperationFailed { code, message, .. } => {
                assert_eq!(code.as_deref(), Some("AllocationFailed"));
                assert_eq!(message, "no capacity in eastus");
            }
            other => panic!("Expected OperationFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_poll_timeout() {
        let api = MockApi::new().with_async_polls(u32::MAX);
        let config = PollConfig {
            timeout: Duration::ZERO,
            ..PollConfig::immediate()
        };
        let err = Executor::new(&api, &config)
            .create(&identity(), &desired(), &mut NoObserver)
            .unwrap_err();
        assert!(matches!(err, Error::PollTimeout { .. }));
    }

    #[test]
    fn test_rejected_write_is_api_error() {
        let api = MockApi::new();
        api.inject(
            Method::Put,
            identity().path(),
            Fault::Status {
                status: 409,
                code: "Conflict".into(),
                message: "another operation is in progress".into(),
            },
        );
        let config = PollConfig::immediate();
        let err = Executor::new(&api, &config)
            .create(&identity(), &desired(), &mut NoObserver)
            .unwrap_err();
        assert_eq!(err.status(), Some(409));
        assert!(err.to_string().contains("another operation is in progress"));
    }
}
