//! The collaborator seam: a minimal HTTP-shaped view of the management API.
//!
//! The core never talks to the network itself. It builds [`Request`]s and
//! interprets [`ApiResponse`]s; an implementation of [`ManagementApi`]
//! (the ureq client in `armkit`, or [`MockApi`](crate::mock::MockApi) in
//! tests) moves them over the wire.
//!
//! Implementations must hand back every HTTP status as an [`ApiResponse`].
//! Only failures that produced no response at all are returned as
//! [`Error::Transport`](crate::Error::Transport).

use crate::error::Result;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// HTTP methods used against the management API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Put,
    Patch,
    Delete,
}

impl Method {
    /// Upper-case method name as sent on the wire.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a request goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A resource or collection path relative to the API endpoint.
    /// The client appends `?api-version=<api_version>`.
    Resource { path: String, api_version: String },
    /// An absolute URL handed out by the service (polling links, `nextLink`).
    /// Used verbatim.
    Url(String),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resource { path, api_version } => write!(f, "{path}?api-version={api_version}"),
            Self::Url(url) => f.write_str(url),
        }
    }
}

/// A single call to the management API.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub target: Target,
    pub body: Option<Value>,
}

impl Request {
    /// GET a resource path.
    pub fn get(path: impl Into<String>, api_version: impl Into<String>) -> Self {
        Self::resource(Method::Get, path, api_version, None)
    }

    /// GET an absolute URL.
    pub fn get_url(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            target: Target::Url(url.into()),
            body: None,
        }
    }

    /// Build a request against a resource path.
    pub fn resource(
        method: Method,
        path: impl Into<String>,
        api_version: impl Into<String>,
        body: Option<Value>,
    ) -> Self {
        Self {
            method,
            target: Target::Resource {
                path: path.into(),
                api_version: api_version.into(),
            },
            body,
        }
    }
}

/// What came back from the service.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Parsed JSON body; `None` for empty bodies.
    pub body: Option<Value>,
    /// `Azure-AsyncOperation` header.
    pub async_operation: Option<String>,
    /// `Location` header.
    pub location: Option<String>,
    /// `Retry-After` header.
    pub retry_after: Option<Duration>,
}

impl ApiResponse {
    /// A response with a status and JSON body and no headers.
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            body: Some(body),
            ..Default::default()
        }
    }

    /// A response with only a status code.
    #[must_use]
    pub fn empty(status: u16) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }

    /// 2xx status.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 404 status.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }

    /// Where to poll for completion, if this response started a long-running operation.
    ///
    /// `Azure-AsyncOperation` wins over `Location` when both are present.
    #[must_use]
    pub fn polling_link(&self) -> Option<PollingLink> {
        if !matches!(self.status, 201 | 202) {
            return None;
        }
        if let Some(url) = &self.async_operation {
            return Some(PollingLink::AsyncOperation(url.clone()));
        }
        self.location.clone().map(PollingLink::Location)
    }
}

/// A link to poll for the outcome of a long-running operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollingLink {
    /// Operation status resource; its body carries a `status` field.
    AsyncOperation(String),
    /// Location URL; answers 202 while running and 200/204 when done.
    Location(String),
}

impl PollingLink {
    /// The URL to GET.
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::AsyncOperation(url) | Self::Location(url) => url,
        }
    }
}

/// Blocking transport to the management API.
///
/// This abstraction keeps the reconciliation logic independent of the
/// HTTP stack and enables testing with [`MockApi`](crate::mock::MockApi).
pub trait ManagementApi: Send + Sync {
    /// Send one request and return whatever the service answered.
    ///
    /// # Errors
    ///
    /// Returns `Error::Transport` only when no HTTP response was received.
    fn send(&self, request: &Request) -> Result<ApiResponse>;
}

impl<T: ManagementApi + ?Sized> ManagementApi for &T {
    fn send(&self, request: &Request) -> Result<ApiResponse> {
        (**self).send(request)
    }
}

impl<T: ManagementApi + ?Sized> ManagementApi for Box<T> {
    fn send(&self, request: &Request) -> Result<ApiResponse> {
        (**self).send(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_target_display() {
        let target = Target::Resource {
            path: "/subscriptions/s1/resourcegroups/rg1".to_string(),
            api_version: "2021-04-01".to_string(),
        };
        assert_eq!(
            target.to_string(),
            "/subscriptions/s1/resourcegroups/rg1?api-version=2021-04-01"
        );
        assert_eq!(Target::Url("https://x/op".into()).to_string(), "https://x/op");
    }

    #[test]
    fn test_polling_link_prefers_async_operation() {
        let response = ApiResponse {
            status: 201,
            async_operation: Some("https://x/ops/1".into()),
            location: Some("https://x/loc/1".into()),
            ..Default::default()
        };
        assert_eq!(
            response.polling_link(),
            Some(PollingLink::AsyncOperation("https://x/ops/1".into()))
        );
    }

    #[test]
    fn test_polling_link_location() {
        let response = ApiResponse {
            status: 202,
            location: Some("https://x/loc/1".into()),
            ..Default::default()
        };
        let link = response.polling_link().unwrap();
        assert_eq!(link, PollingLink::Location("https://x/loc/1".into()));
        assert_eq!(link.url(), "https://x/loc/1");
    }

    #[test]
    fn test_polling_link_ignored_on_200() {
        let response = ApiResponse {
            status: 200,
            async_operation: Some("https://x/ops/1".into()),
            ..Default::default()
        };
        assert_eq!(response.polling_link(), None);
    }

    #[test]
    fn test_status_helpers() {
        assert!(ApiResponse::json(200, json!({})).is_success());
        assert!(ApiResponse::empty(204).is_success());
        assert!(!ApiResponse::empty(404).is_success());
        assert!(ApiResponse::empty(404).is_not_found());
        assert_eq!(Method::Patch.to_string(), "PATCH");
    }
}
