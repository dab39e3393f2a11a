//! Desired-state reconciler.
//!
//! One invocation is one pass of fetch -> decide -> execute -> normalize.
//! State is always computed fresh; nothing is persisted between runs and a
//! decision is never retried.

use crate::api::ManagementApi;
use crate::compare::{Difference, differences};
use crate::desired::DesiredState;
use crate::error::{Error, Result};
use crate::executor::Executor;
use crate::fetch::{Observed, Response, fetch, fetch_collection, fetch_page};
use crate::identity::ResourceIdentity;
use crate::normalize::{KeyStyle, NormalizedPage, normalize, normalize_response};
use crate::poll::{PollConfig, PollObserver};
use crate::schema::{Modifiers, ResourceType};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Argument that selects the lifecycle.
pub const STATE_ARG: &str = "state";

/// Requested lifecycle of a resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    #[default]
    Present,
    Absent,
}

impl FromStr for Lifecycle {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "present" => Ok(Self::Present),
            "absent" => Ok(Self::Absent),
            other => Err(Error::validation(
                STATE_ARG,
                format!("expected present or absent, got '{other}'"),
            )),
        }
    }
}

/// What the reconciler decided to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    NoAction,
    Create,
    Update,
    Delete,
}

impl Decision {
    /// Whether carrying out the decision changes remote state.
    #[must_use]
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Self::NoAction)
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NoAction => "no action",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        };
        write!(f, "{s}")
    }
}

/// Decide from the observed state and the requested lifecycle.
///
/// The differences are only computed for an existing resource that should
/// stay present.
#[must_use]
pub fn decide(
    observed: &Observed,
    lifecycle: Lifecycle,
    desired: &DesiredState,
    modifiers: &Modifiers,
) -> (Decision, Vec<Difference>) {
    match (observed, lifecycle) {
        (Observed::NotFound, Lifecycle::Present) => (Decision::Create, Vec::new()),
        (Observed::NotFound, Lifecycle::Absent) => (Decision::NoAction, Vec::new()),
        (Observed::Found(_), Lifecycle::Absent) => (Decision::Delete, Vec::new()),
        (Observed::Found(resource), Lifecycle::Present) => {
            let diffs = differences(desired, resource, modifiers);
            if diffs.is_empty() {
                (Decision::NoAction, diffs)
            } else {
                (Decision::Update, diffs)
            }
        }
    }
}

/// Everything one reconciliation needs. Built once and never mutated.
#[derive(Debug, Clone)]
pub struct Invocation<'a> {
    pub resource_type: &'a ResourceType,
    pub identity: ResourceIdentity,
    pub lifecycle: Lifecycle,
    pub desired: DesiredState,
    /// Report the decision without executing it.
    pub check_mode: bool,
}

impl<'a> Invocation<'a> {
    /// Build an invocation from caller arguments.
    ///
    /// `args` holds identity fields, an optional `state` and resource
    /// properties, keyed by argument name.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` for missing identity fields, an invalid
    /// `state`, unknown or ill-typed properties, or a read-only type.
    pub fn from_args(
        resource_type: &'a ResourceType,
        args: &Map<String, Value>,
        check_mode: bool,
    ) -> Result<Self> {
        if resource_type.info_only {
            return Err(Error::validation(
                STATE_ARG,
                format!("{} is read-only and only supports info queries", resource_type.name),
            ));
        }
        let ids = resource_type.identity_args(args);
        let identity = resource_type.identity(|field| ids.get(field).map(String::as_str))?;
        let lifecycle = match args.get(STATE_ARG) {
            None | Some(Value::Null) => Lifecycle::default(),
            Some(Value::String(s)) => s.parse()?,
            Some(other) => {
                return Err(Error::validation(
                    STATE_ARG,
                    format!("expected a string, got {other}"),
                ));
            }
        };
        let desired = DesiredState::from_args(resource_type, args, &[STATE_ARG])?;
        Ok(Self {
            resource_type,
            identity,
            lifecycle,
            desired,
            check_mode,
        })
    }
}

/// Result of one reconciliation.
#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    /// Whether remote state changed (or would change, in check mode).
    pub changed: bool,
    pub decision: Decision,
    pub check_mode: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub differences: Vec<Difference>,
    /// Normalized resource after the run; `None` when it does not exist.
    pub resource: Option<Map<String, Value>>,
}

/// Runs reconciliations against one management API.
pub struct Reconciler<A> {
    api: A,
    poll: PollConfig,
    key_style: KeyStyle,
}

impl<A: ManagementApi> Reconciler<A> {
    #[must_use]
    pub fn new(api: A) -> Self {
        Self {
            api,
            poll: PollConfig::default(),
            key_style: KeyStyle::default(),
        }
    }

    #[must_use]
    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    #[must_use]
    pub fn with_key_style(mut self, key_style: KeyStyle) -> Self {
        self.key_style = key_style;
        self
    }

    /// The underlying API.
    pub fn api(&self) -> &A {
        &self.api
    }

    /// Bring one resource to its requested lifecycle.
    ///
    /// # Errors
    ///
    /// Fetch errors abort before any mutation. Validation of create-only
    /// requirements also happens before anything is sent. Executor errors
    /// propagate as-is; a partially applied mutation is not rolled back.
    pub fn reconcile(
        &self,
        invocation: &Invocation<'_>,
        observer: &mut dyn PollObserver,
    ) -> Result<Outcome> {
        let Invocation {
            resource_type,
            identity,
            lifecycle,
            desired,
            check_mode,
        } = invocation;
        if resource_type.info_only {
            return Err(Error::validation(
                STATE_ARG,
                format!("{} is read-only and only supports info queries", resource_type.name),
            ));
        }

        let modifiers = resource_type.modifiers();
        let observed = fetch(&self.api, identity)?;
        let (decision, differences) = decide(&observed, *lifecycle, desired, &modifiers);
        debug!("{identity}: {decision} ({} differences)", differences.len());

        if decision == Decision::Create {
            check_required(resource_type, desired)?;
        }

        if *check_mode {
            return Ok(Outcome {
                changed: decision.is_mutating(),
                decision,
                check_mode: true,
                differences,
                resource: observed.as_found().map(|r| normalize(r, self.key_style)),
            });
        }

        let executor = Executor::new(&self.api, &self.poll);
        let (changed, resource) = match (&observed, decision) {
            (_, Decision::NoAction) => (false, observed.as_found().cloned()),
            (_, Decision::Create) => (true, Some(executor.create(identity, desired, observer)?)),
            (Observed::Found(current), Decision::Update) => (
                true,
                Some(executor.update(resource_type, identity, desired, current, observer)?),
            ),
            (Observed::NotFound, Decision::Update) => {
                return Err(Error::InvalidResponse(format!(
                    "{identity}: update decided for a missing resource"
                )));
            }
            (_, Decision::Delete) => (executor.delete(identity, observer)?, None),
        };
        if changed {
            info!("{identity}: {decision} done");
        }

        Ok(Outcome {
            changed,
            decision,
            check_mode: false,
            differences,
            resource: resource.map(|r| normalize(&r, self.key_style)),
        })
    }

    /// Read resources without changing anything.
    ///
    /// When `args` carries the type's name field (or the type is a
    /// singleton) the single resource is read; a missing resource yields an
    /// empty page. Otherwise the first page of the collection is returned
    /// with its cursor.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` for missing scope fields and API errors
    /// as they come.
    pub fn info(
        &self,
        resource_type: &ResourceType,
        args: &Map<String, Value>,
    ) -> Result<NormalizedPage> {
        let ids = resource_type.identity_args(args);
        let lookup = |field: &str| ids.get(field).map(String::as_str);
        // Singletons have no name field and are always read directly.
        let named = match resource_type.path_template.name_field() {
            Some(field) => lookup(field).is_some_and(|v| !v.trim().is_empty()),
            None => true,
        };

        let response = if named {
            let identity = resource_type.identity(lookup)?;
            match fetch(&self.api, &identity)? {
                Observed::Found(resource) => Response::Single(resource),
                Observed::NotFound => Response::Page {
                    items: Vec::new(),
                    next_link: None,
                },
            }
        } else {
            let collection = resource_type.collection(lookup)?;
            debug!("listing {collection}");
            fetch_collection(&self.api, &collection)?
        };
        Ok(normalize_response(&response, self.key_style))
    }

    /// Read the page behind a cursor returned by [`Reconciler::info`].
    ///
    /// # Errors
    ///
    /// API errors as they come.
    pub fn next_page(&self, next_link: &str) -> Result<NormalizedPage> {
        let response = fetch_page(&self.api, next_link)?;
        Ok(normalize_response(&response, self.key_style))
    }
}

fn check_required(resource_type: &ResourceType, desired: &DesiredState) -> Result<()> {
    for field in resource_type.fields.iter().filter(|f| f.required_on_create) {
        if !desired.contains(&field.property_path()?) {
            return Err(Error::validation(
                field.name,
                format!("required when creating a {}", resource_type.name),
            ));
        }
    }
    Ok(())
}
