//! Remote state fetcher.
//!
//! Reads are side-effect free and never retried. A 404 is a legitimate
//! answer ("the resource does not exist") and is reported as
//! [`Observed::NotFound`]; any other failure is an [`Error`].

use crate::api::{ManagementApi, Request};
use crate::error::{Error, Result};
use crate::identity::{CollectionRef, ResourceIdentity};
use log::debug;
use serde_json::Value;

/// Remote state of one resource.
#[derive(Debug, Clone, PartialEq)]
pub enum Observed {
    /// The resource exists; its raw representation.
    Found(Value),
    /// The service reported that the resource does not exist.
    NotFound,
}

impl Observed {
    /// The raw representation, if the resource exists.
    #[must_use]
    pub fn as_found(&self) -> Option<&Value> {
        match self {
            Self::Found(value) => Some(value),
            Self::NotFound => None,
        }
    }
}

/// A read result: either one resource or one page of a collection.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Single(Value),
    /// One page. `next_link` is the service's continuation cursor and is
    /// not followed here.
    Page {
        items: Vec<Value>,
        next_link: Option<String>,
    },
}

/// Read the current state of a resource.
///
/// # Errors
///
/// `Error::Api` for unexpected statuses, `Error::Transport` when the service
/// could not be reached, `Error::InvalidResponse` for a 2xx without a body.
pub fn fetch<A: ManagementApi + ?Sized>(api: &A, identity: &ResourceIdentity) -> Result<Observed> {
    let request = Request::get(identity.path(), identity.api_version());
    let response = api.send(&request)?;

    if response.is_not_found() {
        debug!("{identity}: not found");
        return Ok(Observed::NotFound);
    }
    if !response.is_success() {
        return Err(Error::from_status(response.status, response.body.as_ref()));
    }
    let body = response
        .body
        .ok_or_else(|| Error::InvalidResponse(format!("empty body for GET {identity}")))?;
    debug!("{identity}: found");
    Ok(Observed::Found(body))
}

/// Read the first page of a collection.
///
/// # Errors
///
/// A 404 on a collection means its scope (e.g. the resource group) is
/// missing and is reported as `Error::Api`.
pub fn fetch_collection<A: ManagementApi + ?Sized>(
    api: &A,
    collection: &CollectionRef,
) -> Result<Response> {
    let request = Request::get(collection.path(), collection.api_version());
    read_page(api, &request)
}

/// Read the page behind a continuation cursor.
///
/// # Errors
///
/// Same as [`fetch_collection`].
pub fn fetch_page<A: ManagementApi + ?Sized>(api: &A, next_link: &str) -> Result<Response> {
    read_page(api, &Request::get_url(next_link))
}

fn read_page<A: ManagementApi + ?Sized>(api: &A, request: &Request) -> Result<Response> {
    let response = api.send(request)?;
    if !response.is_success() {
        return Err(Error::from_status(response.status, response.body.as_ref()));
    }
    let body = response
        .body
        .ok_or_else(|| Error::InvalidResponse(format!("empty body for GET {}", request.target)))?;
    parse_page(body)
}

/// Split a `{ "value": [...], "nextLink": "..." }` body into a page.
///
/// # Errors
///
/// Returns `Error::InvalidResponse` when `value` is missing or not a list.
pub fn parse_page(body: Value) -> Result<Response> {
    let Value::Object(mut map) = body else {
        return Err(Error::InvalidResponse("list response is not an object".to_string()));
    };
    let items = match map.remove("value") {
        Some(Value::Array(items)) => items,
        _ => {
            return Err(Error::InvalidResponse(
                "list response has no `value` array".to_string(),
            ));
        }
    };
    let next_link = map
        .remove("nextLink")
        .and_then(|v| v.as_str().map(ToString::to_string))
        .filter(|link| !link.is_empty());
    Ok(Response::Page { items, next_link })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiResponse, ManagementApi, Request};
    use crate::identity::PathTemplate;
    use serde_json::json;
    use std::sync::Mutex;

    /// Returns canned responses in order.
    struct Scripted(Mutex<Vec<Result<ApiResponse>>>);

    impl Scripted {
        fn new(mut responses: Vec<Result<ApiResponse>>) -> Self {
            responses.reverse();
            Self(Mutex::new(responses))
        }
    }

    impl ManagementApi for Scripted {
        fn send(&self, _request: &Request) -> Result<ApiResponse> {
            self.0.lock().unwrap().pop().expect("no scripted response left")
        }
    }

    fn identity() -> ResourceIdentity {
        PathTemplate("/subscriptions/{subscription_id}/resourcegroups/{name}")
            .render("2021-04-01", |k| match k {
                "subscription_id" => Some("sub1"),
                "name" => Some("rg1"),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn test_fetch_found() {
        let api = Scripted::new(vec![Ok(ApiResponse::json(200, json!({"name": "rg1"})))]);
        let observed = fetch(&api, &identity()).unwrap();
        assert_eq!(observed.as_found(), Some(&json!({"name": "rg1"})));
    }

    #[test]
    fn test_fetch_not_found_is_not_an_error() {
        let api = Scripted::new(vec![Ok(ApiResponse::json(
            404,
            json!({"error": {"code": "ResourceGroupNotFound", "message": "gone"}}),
        ))]);
        assert_eq!(fetch(&api, &identity()).unwrap(), Observed::NotFound);
    }

    #[test]
    fn test_fetch_other_status_is_api_error() {
        let api = Scripted::new(vec![Ok(ApiResponse::json(
            401,
            json!({"error": {"code": "InvalidAuthenticationToken", "message": "expired"}}),
        ))]);
        let err = fetch(&api, &identity()).unwrap_err();
        assert_eq!(err.status(), Some(401));
        assert!(err.to_string().contains("expired"));
    }

    #[test]
    fn test_fetch_transport_error_is_not_not_found() {
        let api = Scripted::new(vec![Err(Error::Transport("connection refused".into()))]);
        assert!(matches!(fetch(&api, &identity()), Err(Error::Transport(_))));
    }

    #[test]
    fn test_fetch_empty_body() {
        let api = Scripted::new(vec![Ok(ApiResponse::empty(200))]);
        assert!(matches!(fetch(&api, &identity()), Err(Error::InvalidResponse(_))));
    }

    #[test]
    fn test_parse_page_with_cursor() {
        let page = parse_page(json!({"value": [{"name": "a"}], "nextLink": "https://x/next"})).unwrap();
        assert_eq!(
            page,
            Response::Page {
                items: vec![json!({"name": "a"})],
                next_link: Some("https://x/next".to_string()),
            }
        );
    }

    #[test]
    fn test_parse_page_rejects_missing_value() {
        assert!(parse_page(json!({"items": []})).is_err());
        assert!(parse_page(json!([])).is_err());
    }

    #[test]
    fn test_fetch_page_does_not_follow_cursor() {
        let api = Scripted::new(vec![Ok(ApiResponse::json(
            200,
            json!({"value": [{"name": "a"}, {"name": "b"}], "nextLink": "https://x/2"}),
        ))]);
        match fetch_page(&api, "https://x/1").unwrap() {
            Response::Page { items, next_link } => {
                assert_eq!(items.len(), 2);
                assert_eq!(next_link.as_deref(), Some("https://x/2"));
            }
            Response::Single(_) => panic!("Expected a page"),
        }
    }
}
