//! Blocking ARM client.
//!
//! [`ArmClient`] implements [`ManagementApi`] on top of a ureq agent. Every
//! HTTP status comes back as an [`ApiResponse`]; only failures without a
//! response (DNS, TLS, timeouts, resets) become `Error::Transport`.

use log::{debug, trace};
use reconcile::{ApiResponse, Error, ManagementApi, Method, Request, Result, Target};
use serde_json::{Value, json};
use std::time::Duration;

/// Public Azure cloud endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://management.azure.com";

/// Connection settings for [`ArmClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL, e.g. `https://management.azure.com`.
    pub endpoint: String,
    /// Bearer token sent as `Authorization`. Omitted when `None`.
    pub token: Option<String>,
    /// Global timeout per request.
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            token: None,
            timeout: Duration::from_secs(60),
            user_agent: concat!("armkit/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// HTTP implementation of the management API.
///
/// # Example
///
/// ```no_run
/// use armkit::{ArmClient, ClientConfig};
/// use reconcile::{ManagementApi, Request};
///
/// let client = ArmClient::new(ClientConfig {
///     token: Some("eyJ0eXAi...".to_string()),
///     ..ClientConfig::default()
/// });
/// let response = client
///     .send(&Request::get("/subscriptions/0000/resourcegroups/rg1", "2021-04-01"))
///     .unwrap();
/// println!("HTTP {}", response.status);
/// ```
pub struct ArmClient {
    agent: ureq::Agent,
    config: ClientConfig,
}

impl ArmClient {
    /// Create a client.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(config.timeout))
            .build()
            .into();
        Self { agent, config }
    }

    /// The configured endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    /// Absolute URL for a request target.
    #[must_use]
    pub fn url(&self, target: &Target) -> String {
        match target {
            Target::Resource { path, api_version } => format!(
                "{}{}?api-version={}",
                self.config.endpoint.trim_end_matches('/'),
                path,
                api_version
            ),
            Target::Url(url) => url.clone(),
        }
    }

    fn prepare<B>(&self, builder: ureq::RequestBuilder<B>) -> ureq::RequestBuilder<B> {
        let builder = builder
            .header("Accept", "application/json")
            .header("User-Agent", &self.config.user_agent);
        match &self.config.token {
            Some(token) => builder.header("Authorization", format!("Bearer {token}")),
            None => builder,
        }
    }
}

impl Default for ArmClient {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

impl ManagementApi for ArmClient {
    fn send(&self, request: &Request) -> Result<ApiResponse> {
        let url = self.url(&request.target);
        debug!("{} {url}", request.method);
        if let Some(body) = &request.body {
            trace!("request body: {body}");
        }

        let result = match request.method {
            Method::Get => self.prepare(self.agent.get(&url)).call(),
            Method::Delete => self.prepare(self.agent.delete(&url)).call(),
            Method::Put => {
                let builder = self.prepare(self.agent.put(&url));
                match &request.body {
                    Some(body) => builder.send_json(body),
                    None => builder.send_empty(),
                }
            }
            Method::Patch => {
                let builder = self.prepare(self.agent.patch(&url));
                match &request.body {
                    Some(body) => builder.send_json(body),
                    None => builder.send_empty(),
                }
            }
        };
        let mut response = result.map_err(transport_error)?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let text = response.body_mut().read_to_string().map_err(transport_error)?;
        debug!("{} {url} -> {status}", request.method);
        trace!("response body: {text}");

        build_response(
            status,
            |name| {
                headers
                    .get(name)
                    .and_then(|v| v.to_str().ok())
                    .map(ToString::to_string)
            },
            &text,
        )
    }
}

/// Map a ureq failure onto the reconcile error type.
#[must_use]
pub fn transport_error(err: ureq::Error) -> Error {
    match err {
        ureq::Error::StatusCode(status) => Error::from_status(status, None),
        ureq::Error::Timeout(which) => Error::Transport(format!("request timed out ({which})")),
        other => Error::Transport(other.to_string()),
    }
}

/// Assemble an [`ApiResponse`] from status, header lookup and raw body.
///
/// Non-JSON bodies on error statuses are kept as the error message; a
/// non-JSON body on a success status is an `Error::InvalidResponse`.
fn build_response(
    status: u16,
    header: impl Fn(&str) -> Option<String>,
    text: &str,
) -> Result<ApiResponse> {
    let body = if text.trim().is_empty() {
        None
    } else {
        match serde_json::from_str::<Value>(text) {
            Ok(value) => Some(value),
            Err(_) if !(200..300).contains(&status) => {
                Some(json!({"error": {"message": text.trim()}}))
            }
            Err(e) => {
                return Err(Error::InvalidResponse(format!(
                    "HTTP {status} body is not JSON: {e}"
                )));
            }
        }
    };

    Ok(ApiResponse {
        status,
        body,
        async_operation: header("azure-asyncoperation"),
        location: header("location"),
        retry_after: header("retry-after").as_deref().and_then(parse_retry_after),
    })
}

/// `Retry-After` in delta-seconds. HTTP dates are ignored.
fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}
