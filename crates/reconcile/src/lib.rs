//! # reconcile
//!
//! Desired-state reconciliation against a resource management API.
//!
//! One invocation fetches the remote state of a resource, compares it with
//! the caller's desired state, decides between no action, create, update
//! and delete, carries the decision out (waiting on long-running
//! operations) and returns a flattened view of the result.
//!
//! ## Core Concepts
//!
//! - **ResourceType**: static schema of a resource type (path, API version, fields)
//! - **DesiredState**: property paths and the values the caller asked for
//! - **Observed**: the fetched remote state, or `NotFound`
//! - **Decision**: `NoAction`, `Create`, `Update` or `Delete`
//! - **Reconciler**: runs fetch -> decide -> execute -> normalize
//!
//! ## Example
//!
//! ```no_run
//! use reconcile::mock::MockApi;
//! use reconcile::{
//!     FieldKind, FieldSpec, Invocation, ListOrder, Modifier, NoObserver, PathTemplate,
//!     Reconciler, ResourceType, WriteMode,
//! };
//! use serde_json::json;
//!
//! const FIELDS: &[FieldSpec] = &[
//!     FieldSpec::new("location", "/location", FieldKind::STRING).modifier(Modifier::LOCATION),
//!     FieldSpec::new("tags", "/tags", FieldKind::Object),
//! ];
//!
//! const RESOURCE_GROUP: ResourceType = ResourceType {
//!     name: "resource_group",
//!     description: "Resource group",
//!     api_version: "2021-04-01",
//!     path_template: PathTemplate("/subscriptions/{subscription_id}/resourcegroups/{name}"),
//!     fields: FIELDS,
//!     write_mode: WriteMode::Standard,
//!     info_only: false,
//!     default_list_order: ListOrder::Ordered,
//! };
//!
//! let args = json!({"subscription_id": "s1", "name": "rg1", "location": "westus"});
//! let invocation = Invocation::from_args(&RESOURCE_GROUP, args.as_object().unwrap(), false)?;
//! let outcome = Reconciler::new(MockApi::new()).reconcile(&invocation, &mut NoObserver)?;
//! assert!(outcome.changed);
//! # Ok::<(), reconcile::Error>(())
//! ```
//!
//! ## Collaborator Seam
//!
//! The crate never opens a socket. [`ManagementApi`] takes a [`Request`] and
//! returns an [`ApiResponse`]; `armkit` provides the HTTP implementation and
//! [`mock::MockApi`] an in-memory one.

pub mod api;
pub mod compare;
pub mod desired;
pub mod error;
pub mod executor;
pub mod fetch;
pub mod identity;
pub mod mock;
pub mod normalize;
pub mod path;
pub mod poll;
pub mod reconciler;
pub mod schema;

// Re-export main types at crate root
pub use api::{ApiResponse, ManagementApi, Method, PollingLink, Request, Target};
pub use compare::{Difference, differences, matches, value_matches};
pub use desired::{DesiredState, DesiredStateBuilder};
pub use error::{Error, ErrorCategory, Result};
pub use executor::Executor;
pub use fetch::{Observed, Response, fetch, fetch_collection, fetch_page};
pub use identity::{CollectionRef, PathTemplate, ResourceIdentity};
pub use normalize::{KeyStyle, NormalizedPage, normalize, normalize_response};
pub use path::PropertyPath;
pub use poll::{NoObserver, OperationStatus, PollConfig, PollObserver, Poller};
pub use reconciler::{Decision, Invocation, Lifecycle, Outcome, Reconciler, STATE_ARG, decide};
pub use schema::{
    FieldKind, FieldSpec, ListOrder, Modifier, Modifiers, Policy, ResourceType, TextMatch,
    WriteMode,
};
