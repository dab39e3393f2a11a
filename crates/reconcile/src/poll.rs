//! Waiting on long-running operations.
//!
//! Mutating calls may answer before the work is done. The executor hands
//! the polling link (or the resource itself, when only its
//! `provisioningState` says it is still running) to this module, which
//! blocks until a terminal state is reached or the wait times out.

use crate::api::{ManagementApi, PollingLink, Request};
use crate::error::{Error, Result, error_details};
use crate::identity::ResourceIdentity;
use log::{debug, trace};
use serde_json::Value;
use std::thread;
use std::time::{Duration, Instant};

/// Polling cadence and overall time limit.
#[derive(Debug, Clone, PartialEq)]
pub struct PollConfig {
    /// Delay before the first poll.
    pub interval: Duration,
    /// Multiplier applied to the delay after every poll.
    pub backoff_factor: f64,
    /// Upper bound for a single delay.
    pub max_interval: Duration,
    /// Give up after this much time in total.
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            backoff_factor: 1.5,
            max_interval: Duration::from_secs(30),
            timeout: Duration::from_secs(30 * 60),
        }
    }
}

impl PollConfig {
    /// Poll without sleeping. Meant for tests and in-memory backends.
    #[must_use]
    pub fn immediate() -> Self {
        Self {
            interval: Duration::ZERO,
            backoff_factor: 1.0,
            max_interval: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Delay before poll number `attempt` (0-indexed).
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let delay = self.interval.as_secs_f64() * self.backoff_factor.powi(exponent);
        let capped = delay.min(self.max_interval.as_secs_f64());
        Duration::from_secs_f64(capped.max(0.0))
    }
}

/// Receives every status observed while polling.
pub trait PollObserver {
    /// Called after each poll with the reported status.
    fn on_status(&mut self, status: &str, attempt: u32);

    /// Called once the operation reached a terminal state.
    fn on_finished(&mut self, _status: &str) {}
}

/// Observer that ignores everything.
pub struct NoObserver;

impl PollObserver for NoObserver {
    fn on_status(&mut self, _status: &str, _attempt: u32) {}
}

/// Interpretation of a status string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationStatus {
    Succeeded,
    Failed,
    Canceled,
    /// Anything else (`InProgress`, `Creating`, `Updating`, `Deleting`, ...).
    Running(String),
}

impl OperationStatus {
    /// Classify a status string case-insensitively.
    #[must_use]
    pub fn parse(status: &str) -> Self {
        if status.eq_ignore_ascii_case("succeeded") {
            Self::Succeeded
        } else if status.eq_ignore_ascii_case("failed") {
            Self::Failed
        } else if status.eq_ignore_ascii_case("canceled") || status.eq_ignore_ascii_case("cancelled") {
            Self::Canceled
        } else {
            Self::Running(status.to_string())
        }
    }

    /// Whether no further change is expected.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running(_))
    }
}

/// `properties.provisioningState` of a resource document, if present.
#[must_use]
pub fn provisioning_state(resource: &Value) -> Option<&str> {
    resource
        .get("properties")
        .and_then(|p| p.get("provisioningState"))
        .and_then(Value::as_str)
}

/// Blocking poller bound to one API and configuration.
pub struct Poller<'a, A: ?Sized> {
    api: &'a A,
    config: &'a PollConfig,
}

impl<'a, A: ManagementApi + ?Sized> Poller<'a, A> {
    #[must_use]
    pub fn new(api: &'a A, config: &'a PollConfig) -> Self {
        Self { api, config }
    }

    /// Poll a link handed out by the service until the operation ends.
    ///
    /// Returns the body of the final response, if any.
    ///
    /// # Errors
    ///
    /// `Error::OperationFailed` when the operation ends in `Failed` or
    /// `Canceled`, `Error::PollTimeout` when it does not end in time, and
    /// `Error::Api` when the polling endpoint itself answers with an error.
    pub fn wait_for_link(
        &self,
        link: &PollingLink,
        first_delay: Option<Duration>,
        observer: &mut dyn PollObserver,
    ) -> Result<Option<Value>> {
        debug!("waiting on {}", link.url());
        let request = Request::get_url(link.url());
        self.run(first_delay, observer, |attempt| {
            let response = self.api.send(&request)?;
            let hint = response.retry_after;
            match link {
                PollingLink::AsyncOperation(_) => {
                    if !response.is_success() {
                        return Err(Error::from_status(response.status, response.body.as_ref()));
                    }
                    let status = response
                        .body
                        .as_ref()
                        .and_then(|b| b.get("status"))
                        .and_then(Value::as_str)
                        .unwrap_or("InProgress")
                        .to_string();
                    trace!("poll {attempt}: {status}");
                    Ok(Step {
                        status,
                        body: response.body,
                        hint,
                    })
                }
                PollingLink::Location(_) => {
                    let status = match response.status {
                        202 => "InProgress".to_string(),
                        s if (200..300).contains(&s) => "Succeeded".to_string(),
                        s => return Err(Error::from_status(s, response.body.as_ref())),
                    };
                    Ok(Step {
                        status,
                        body: response.body,
                        hint,
                    })
                }
            }
        })
    }

    /// Re-read a resource until its `provisioningState` is terminal.
    ///
    /// Returns the final resource document.
    ///
    /// # Errors
    ///
    /// As [`Poller::wait_for_link`]; a resource that disappears while
    /// being provisioned is reported as `Error::Api` with status 404.
    pub fn wait_for_provisioning(
        &self,
        identity: &ResourceIdentity,
        observer: &mut dyn PollObserver,
    ) -> Result<Value> {
        debug!("{identity}: waiting for provisioningState");
        let request = Request::get(identity.path(), identity.api_version());
        let body = self.run(None, observer, |_| {
            let response = self.api.send(&request)?;
            if !response.is_success() {
                return Err(Error::from_status(response.status, response.body.as_ref()));
            }
            let status = response
                .body
                .as_ref()
                .and_then(provisioning_state)
                .unwrap_or("Succeeded")
                .to_string();
            Ok(Step {
                status,
                hint: response.retry_after,
                body: response.body,
            })
        })?;
        body.ok_or_else(|| Error::InvalidResponse(format!("empty body for GET {identity}")))
    }

    fn run(
        &self,
        first_delay: Option<Duration>,
        observer: &mut dyn PollObserver,
        mut poll: impl FnMut(u32) -> Result<Step>,
    ) -> Result<Option<Value>> {
        let started = Instant::now();
        let mut delay = first_delay
            .unwrap_or_else(|| self.config.delay_for_attempt(0))
            .min(self.config.timeout);
        let mut attempt: u32 = 0;

        loop {
            thread::sleep(delay);
            attempt += 1;
            let step = poll(attempt)?;
            observer.on_status(&step.status, attempt);

            match OperationStatus::parse(&step.status) {
                OperationStatus::Succeeded => {
                    observer.on_finished(&step.status);
                    return Ok(step.body);
                }
                OperationStatus::Failed | OperationStatus::Canceled => {
                    observer.on_finished(&step.status);
                    let (code, message) = error_details(step.body.as_ref());
                    return Err(Error::OperationFailed {
                        message: message.unwrap_or_else(|| format!("operation {}", step.status)),
                        status: step.status,
                        code,
                    });
                }
                OperationStatus::Running(_) => {}
            }

            let waited = started.elapsed();
            if waited >= self.config.timeout {
                return Err(Error::PollTimeout {
                    last_status: step.status,
                    waited,
                });
            }
            delay = step
                .hint
                .unwrap_or_else(|| self.config.delay_for_attempt(attempt))
                .min(self.config.timeout.saturating_sub(waited));
        }
    }
}

struct Step {
    status: String,
    body: Option<Value>,
    hint: Option<Duration>,
}
