//! Error types for reconciliation.
//!
//! A missing resource is not an error here: the fetcher reports it as
//! [`Observed::NotFound`](crate::fetch::Observed::NotFound). Everything in
//! [`Error`] is fatal for the current invocation and is never retried.

use std::fmt;
use std::time::Duration;

/// Result type alias for reconciliation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of reconciliation errors.
///
/// Categories drive the exit message the CLI prints and tell callers
/// whether the failure happened before or after talking to the remote API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The management API rejected a call or could not be reached.
    Api,
    /// Caller-supplied configuration is invalid. Raised before any network call.
    Validation,
    /// A long-running operation did not finish in time.
    Timeout,
}

impl ErrorCategory {
    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Api => "Management API error",
            Self::Validation => "Invalid module arguments",
            Self::Timeout => "Long-running operation timed out",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Api => "Check the error code returned by the service, your token and network access",
            Self::Validation => "Fix the module arguments; nothing was sent to the service",
            Self::Timeout => {
                "The operation may still complete remotely; re-run to observe the final state"
            }
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while reconciling a resource.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The service answered with an unexpected status.
    ///
    /// `code` and `message` are copied verbatim from the `error` object
    /// of the response body when one is present.
    #[error("API error (HTTP {status}{}): {message}", .code.as_deref().map(|c| format!(", {c}")).unwrap_or_default())]
    Api {
        /// HTTP status code.
        status: u16,
        /// Machine-readable error code from the service.
        code: Option<String>,
        /// Error message from the service.
        message: String,
    },

    /// The request never produced an HTTP response (DNS, TLS, connection reset, ...).
    #[error("transport error: {0}")]
    Transport(String),

    /// The service answered with something that could not be interpreted.
    #[error("invalid API response: {0}")]
    InvalidResponse(String),

    /// A long-running operation reached a failed terminal state.
    #[error("operation ended with status {status}: {message}")]
    OperationFailed {
        /// Last status reported by the service (e.g. `Failed`, `Canceled`).
        status: String,
        /// Machine-readable error code, if the service reported one.
        code: Option<String>,
        /// Error message from the service.
        message: String,
    },

    /// Caller-supplied configuration failed static checks.
    #[error("invalid argument `{field}`: {message}")]
    Validation {
        /// Offending argument name.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// A long-running operation did not reach a terminal state in time.
    #[error("operation still {last_status} after {}s", .waited.as_secs())]
    PollTimeout {
        /// Last status observed while polling.
        last_status: String,
        /// Time spent waiting.
        waited: Duration,
    },
}

impl Error {
    /// Create a validation error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Build an API error from a status code and an optional ARM error body.
    ///
    /// ARM error bodies look like `{"error": {"code": "...", "message": "..."}}`.
    pub fn from_status(status: u16, body: Option<&serde_json::Value>) -> Self {
        let (code, message) = error_details(body);
        Self::Api {
            status,
            code,
            message: message.unwrap_or_else(|| format!("HTTP {status}")),
        }
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Api { .. }
            | Self::Transport(_)
            | Self::InvalidResponse(_)
            | Self::OperationFailed { .. } => ErrorCategory::Api,
            Self::Validation { .. } => ErrorCategory::Validation,
            Self::PollTimeout { .. } => ErrorCategory::Timeout,
        }
    }

    /// HTTP status of the failing call, when there was one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Extract `error.code` and `error.message` from an ARM error body.
///
/// Some services omit the `error` wrapper, so top-level `code`/`message`
/// are accepted as well.
pub(crate) fn error_details(body: Option<&serde_json::Value>) -> (Option<String>, Option<String>) {
    let Some(body) = body else {
        return (None, None);
    };
    let inner = body.get("error").unwrap_or(body);
    let field = |name: &str| {
        inner
            .get(name)
            .and_then(serde_json::Value::as_str)
            .map(ToString::to_string)
    };
    (field("code"), field("message"))
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_category_text() {
        for category in [
            ErrorCategory::Api,
            ErrorCategory::Validation,
            ErrorCategory::Timeout,
        ] {
            assert!(!category.description().is_empty());
            assert!(!category.advice().is_empty());
        }
        assert!(format!("{}", ErrorCategory::Api).contains("API"));
    }

    #[test]
    fn test_from_status_preserves_service_message() {
        let body = json!({
            "error": {
                "code": "AuthorizationFailed",
                "message": "The client 'x' does not have authorization"
            }
        });
        let err = Error::from_status(403, Some(&body));
        match &err {
            Error::Api {
                status,
                code,
                message,
            } => {
                assert_eq!(*status, 403);
                assert_eq!(code.as_deref(), Some("AuthorizationFailed"));
                assert_eq!(message, "The client 'x' does not have authorization");
            }
            _ => panic!("Expected Error::Api"),
        }
        assert_eq!(err.category(), ErrorCategory::Api);
        assert_eq!(err.status(), Some(403));
        assert!(err.to_string().contains("AuthorizationFailed"));
    }

    #[test]
    fn test_from_status_without_body() {
        let err = Error::from_status(500, None);
        assert_eq!(err.to_string(), "API error (HTTP 500): HTTP 500");
    }

    #[test]
    fn test_error_details_unwrapped() {
        let body = json!({"code": "Conflict", "message": "busy"});
        let (code, message) = error_details(Some(&body));
        assert_eq!(code.as_deref(), Some("Conflict"));
        assert_eq!(message.as_deref(), Some("busy"));
    }

    #[test]
    fn test_validation_category() {
        let err = Error::validation("name", "must not be empty");
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert_eq!(err.to_string(), "invalid argument `name`: must not be empty");
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_poll_timeout_display() {
        let err = Error::PollTimeout {
            last_status: "InProgress".to_string(),
            waited: Duration::from_secs(90),
        };
        assert_eq!(err.category(), ErrorCategory::Timeout);
        assert_eq!(err.to_string(), "operation still InProgress after 90s");
    }

    #[test]
    fn test_from_serde_error() {
        let serde_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: Error = serde_err.into();
        assert!(matches!(err, Error::InvalidResponse(_)));
    }
}
