//! In-memory management API for tests.
//!
//! [`MockApi`] behaves like a small ARM endpoint: resources live in a map
//! keyed by their (case-insensitive) path, collections are listed with
//! optional paging, writes can be turned into long-running operations, and
//! one-shot faults can be injected for any method and path. Every request
//! is recorded so tests can assert on exactly what was sent.

use crate::api::{ApiResponse, ManagementApi, Method, Request, Target};
use crate::error::{Error, Result};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Base URL for links handed out by the mock.
pub const MOCK_BASE: &str = "https://management.mock";

/// How the mock reports unfinished writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LroStyle {
    /// 201/202 with an `Azure-AsyncOperation` status link.
    AsyncOperation,
    /// 202 with a `Location` link that answers 202 until done.
    Location,
    /// Synchronous answer whose `provisioningState` stays non-terminal for
    /// a number of reads.
    ProvisioningState,
}

/// A one-shot failure for the next matching request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// Answer with this status and ARM error body.
    Status {
        status: u16,
        code: String,
        message: String,
    },
    /// Fail without a response.
    Transport(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    Write,
    Delete,
}

#[derive(Debug)]
struct Operation {
    id: u64,
    key: String,
    remaining: u32,
    pending: Pending,
}

#[derive(Debug, Default)]
struct MockState {
    resources: BTreeMap<String, Value>,
    operations: Vec<Operation>,
    next_operation: u64,
    faults: Vec<(Method, String, Fault)>,
    failure: Option<(String, String)>,
    journal: Vec<Request>,
}

/// In-memory ARM simulator.
#[derive(Debug, Default)]
pub struct MockApi {
    state: Mutex<MockState>,
    lro: Option<(LroStyle, u32)>,
    page_size: Option<usize>,
}

impl MockApi {
    /// Synchronous mock with no resources.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write a long-running operation that reports `InProgress`
    /// for `polls` status reads before finishing.
    #[must_use]
    pub fn with_async_polls(self, polls: u32) -> Self {
        self.with_lro(LroStyle::AsyncOperation, polls)
    }

    /// Make every write long-running in the given style.
    #[must_use]
    pub fn with_lro(mut self, style: LroStyle, polls: u32) -> Self {
        self.lro = Some((style, polls));
        self
    }

    /// Split collection listings into pages of `size` items.
    #[must_use]
    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = Some(size.max(1));
        self
    }

    /// Seed a resource verbatim.
    pub fn insert(&self, path: &str, resource: Value) {
        self.lock().resources.insert(key(path), resource);
    }

    /// Current stored document at `path`.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<Value> {
        self.lock().resources.get(&key(path)).cloned()
    }

    /// Number of stored resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().resources.len()
    }

    /// Whether nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fail the next request with `method` against `path` (or an absolute URL).
    pub fn inject(&self, method: Method, path: &str, fault: Fault) {
        self.lock().faults.push((method, key(path), fault));
    }

    /// Let every long-running operation finishing from now on end in `Failed`.
    pub fn fail_operations(&self, code: &str, message: &str) {
        self.lock().failure = Some((code.to_string(), message.to_string()));
    }

    /// Every request received so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<Request> {
        self.lock().journal.clone()
    }

    /// Requests other than GET.
    #[must_use]
    pub fn mutations(&self) -> Vec<Request> {
        self.lock()
            .journal
            .iter()
            .filter(|r| r.method != Method::Get)
            .cloned()
            .collect()
    }

    /// Forget recorded requests.
    pub fn clear_requests(&self) {
        self.lock().journal.clear();
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn get_resource(&self, state: &mut MockState, path: &str) -> ApiResponse {
        let key = key(path);
        if is_collection(path) {
            return self.list(state, path, 0);
        }
        if matches!(self.lro, Some((LroStyle::ProvisioningState, _))) {
            advance_by_key(state, &key);
        }
        match state.resources.get(&key) {
            Some(resource) => ApiResponse::json(200, resource.clone()),
            None => not_found(path),
        }
    }

    fn list(&self, state: &MockState, path: &str, skip: usize) -> ApiResponse {
        let prefix = format!("{}/", key(path));
        let children: Vec<Value> = state
            .resources
            .iter()
            .filter(|(k, _)| k.strip_prefix(&prefix).is_some_and(|rest| !rest.contains('/')))
            .map(|(_, v)| v.clone())
            .collect();
        let size = self.page_size.unwrap_or(usize::MAX);
        let end = skip.saturating_add(size).min(children.len());
        let items = children.get(skip.min(end)..end).unwrap_or_default().to_vec();
        let mut body = json!({ "value": items });
        if end < children.len() {
            body["nextLink"] = Value::String(format!("{MOCK_BASE}{path}?$skiptoken={end}"));
        }
        ApiResponse::json(200, body)
    }

    fn put(&self, state: &mut MockState, path: &str, body: Option<&Value>) -> ApiResponse {
        let Some(Value::Object(document)) = body else {
            return error(400, "InvalidRequestContent", "The request content was invalid.");
        };
        let key = key(path);
        let exists = state.resources.contains_key(&key);
        let mut document = Value::Object(document.clone());
        decorate(&mut document, path);

        match self.lro {
            None => {
                set_provisioning_state(&mut document, "Succeeded");
                state.resources.insert(key, document.clone());
                ApiResponse::json(if exists { 200 } else { 201 }, document)
            }
            Some((style, polls)) => {
                set_provisioning_state(&mut document, if exists { "Updating" } else { "Creating" });
                state.resources.insert(key.clone(), document.clone());
                let status = if style == LroStyle::ProvisioningState && exists {
                    200
                } else {
                    201
                };
                start(state, key, Pending::Write, (style, polls), status, Some(document))
            }
        }
    }

    fn patch(&self, state: &mut MockState, path: &str, body: Option<&Value>) -> ApiResponse {
        let key = key(path);
        let Some(current) = state.resources.get_mut(&key) else {
            return not_found(path);
        };
        if let Some(patch) = body {
            merge(current, patch);
        }
        let mut document = current.clone();
        match self.lro {
            None => {
                set_provisioning_state(&mut document, "Succeeded");
                state.resources.insert(key, document.clone());
                ApiResponse::json(200, document)
            }
            Some((style, polls)) => {
                set_provisioning_state(&mut document, "Updating");
                state.resources.insert(key.clone(), document.clone());
                let status = if style == LroStyle::ProvisioningState { 200 } else { 202 };
                start(state, key, Pending::Write, (style, polls), status, Some(document))
            }
        }
    }

    fn delete(&self, state: &mut MockState, path: &str) -> ApiResponse {
        let key = key(path);
        if !state.resources.contains_key(&key) {
            return not_found(path);
        }
        match self.lro {
            Some((style, polls)) if style != LroStyle::ProvisioningState => {
                if let Some(resource) = state.resources.get_mut(&key) {
                    set_provisioning_state(resource, "Deleting");
                }
                start(state, key, Pending::Delete, (style, polls), 202, None)
            }
            _ => {
                state.resources.remove(&key);
                ApiResponse::empty(200)
            }
        }
    }

    fn follow(&self, state: &mut MockState, url: &str) -> ApiResponse {
        let Some(rest) = url.strip_prefix(MOCK_BASE) else {
            return error(404, "NotFound", &format!("unknown host in {url}"));
        };
        if let Some(id) = rest.strip_prefix("/operations/") {
            return poll_operation(state, id, false);
        }
        if let Some(id) = rest.strip_prefix("/locations/") {
            return poll_operation(state, id, true);
        }
        let (path, query) = rest.split_once('?').unwrap_or((rest, ""));
        let skip = query
            .split('&')
            .find_map(|pair| pair.strip_prefix("$skiptoken="))
            .and_then(|n| n.parse().ok())
            .unwrap_or(0);
        self.list(state, path, skip)
    }
}

impl ManagementApi for MockApi {
    fn send(&self, request: &Request) -> Result<ApiResponse> {
        let mut state = self.lock();
        state.journal.push(request.clone());

        let target = match &request.target {
            Target::Resource { path, .. } | Target::Url(path) => key(path),
        };
        if let Some(index) = state
            .faults
            .iter()
            .position(|(method, path, _)| *method == request.method && *path == target)
        {
            let (_, _, fault) = state.faults.remove(index);
            return match fault {
                Fault::Status {
                    status,
                    code,
                    message,
                } => Ok(error(status, &code, &message)),
                Fault::Transport(message) => Err(Error::Transport(message)),
            };
        }

        let response = match (&request.target, request.method) {
            (Target::Url(url), Method::Get) => self.follow(&mut state, url),
            (Target::Url(url), _) => error(405, "MethodNotAllowed", &format!("cannot write to {url}")),
            (Target::Resource { path, .. }, Method::Get) => self.get_resource(&mut state, path),
            (Target::Resource { path, .. }, Method::Put) => {
                self.put(&mut state, path, request.body.as_ref())
            }
            (Target::Resource { path, .. }, Method::Patch) => {
                self.patch(&mut state, path, request.body.as_ref())
            }
            (Target::Resource { path, .. }, Method::Delete) => self.delete(&mut state, path),
        };
        Ok(response)
    }
}

/// Register a pending operation and build the response announcing it.
fn start(
    state: &mut MockState,
    key: String,
    pending: Pending,
    (style, polls): (LroStyle, u32),
    status: u16,
    body: Option<Value>,
) -> ApiResponse {
    let id = state.next_operation;
    state.next_operation += 1;
    state.operations.push(Operation {
        id,
        key,
        remaining: polls,
        pending,
    });
    let mut response = ApiResponse {
        status,
        body,
        retry_after: Some(Duration::ZERO),
        ..Default::default()
    };
    match style {
        LroStyle::AsyncOperation => {
            response.async_operation = Some(format!("{MOCK_BASE}/operations/{id}"));
            response.location = Some(format!("{MOCK_BASE}/locations/{id}"));
        }
        LroStyle::Location => {
            response.location = Some(format!("{MOCK_BASE}/locations/{id}"));
        }
        LroStyle::ProvisioningState => {
            response.retry_after = None;
        }
    }
    response
}

fn key(path: &str) -> String {
    path.trim_end_matches('/').to_ascii_lowercase()
}

/// ARM collection paths have an odd number of segments
/// (`/subscriptions/{id}/resourcegroups`); resources have an even number.
fn is_collection(path: &str) -> bool {
    path.split('/').filter(|s| !s.is_empty()).count() % 2 == 1
}

fn not_found(path: &str) -> ApiResponse {
    error(
        404,
        "ResourceNotFound",
        &format!("The resource '{path}' was not found."),
    )
}

fn error(status: u16, code: &str, message: &str) -> ApiResponse {
    ApiResponse::json(status, json!({"error": {"code": code, "message": message}}))
}

fn decorate(document: &mut Value, path: &str) {
    if let Value::Object(map) = document {
        map.insert("id".to_string(), Value::String(path.to_string()));
        if let Some(name) = path.rsplit('/').next() {
            map.insert("name".to_string(), Value::String(name.to_string()));
        }
    }
}

fn set_provisioning_state(document: &mut Value, state: &str) {
    let Value::Object(map) = document else {
        return;
    };
    let properties = map
        .entry("properties")
        .or_insert_with(|| Value::Object(Map::new()));
    if let Value::Object(properties) = properties {
        properties.insert(
            "provisioningState".to_string(),
            Value::String(state.to_string()),
        );
    }
}

/// RFC 7396 merge: objects merge recursively, `null` removes, anything else replaces.
fn merge(target: &mut Value, patch: &Value) {
    let Value::Object(patch) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(map) = target {
        for (name, value) in patch {
            if value.is_null() {
                map.remove(name);
            } else {
                merge(map.entry(name.clone()).or_insert(Value::Null), value);
            }
        }
    }
}

fn advance_by_key(state: &mut MockState, key: &str) {
    let Some(index) = state.operations.iter().position(|op| op.key == key) else {
        return;
    };
    let operation = &mut state.operations[index];
    if operation.remaining > 0 {
        operation.remaining -= 1;
        return;
    }
    let operation = state.operations.remove(index);
    finish(state, &operation);
}

fn poll_operation(state: &mut MockState, id: &str, location: bool) -> ApiResponse {
    let Some(index) = id
        .parse::<u64>()
        .ok()
        .and_then(|id| state.operations.iter().position(|op| op.id == id))
    else {
        return error(404, "OperationNotFound", &format!("no operation {id}"));
    };

    let operation = &mut state.operations[index];
    if operation.remaining > 0 {
        operation.remaining -= 1;
        let mut response = if location {
            ApiResponse::empty(202)
        } else {
            ApiResponse::json(200, json!({"status": "InProgress"}))
        };
        response.retry_after = Some(Duration::ZERO);
        return response;
    }

    let operation = state.operations.remove(index);
    let failed = finish(state, &operation);
    match (failed, location) {
        (Some((code, message)), true) => error(400, &code, &message),
        (Some((code, message)), false) => ApiResponse::json(
            200,
            json!({"status": "Failed", "error": {"code": code, "message": message}}),
        ),
        (None, true) => match operation.pending {
            Pending::Write => state
                .resources
                .get(&operation.key)
                .map_or_else(|| ApiResponse::empty(204), |r| ApiResponse::json(200, r.clone())),
            Pending::Delete => ApiResponse::empty(204),
        },
        (None, false) => ApiResponse::json(200, json!({"status": "Succeeded"})),
    }
}

/// Apply the outcome of a finished operation. Returns the failure, if any.
fn finish(state: &mut MockState, operation: &Operation) -> Option<(String, String)> {
    let failure = state.failure.clone();
    match (operation.pending, &failure) {
        (Pending::Write, None) => {
            if let Some(resource) = state.resources.get_mut(&operation.key) {
                set_provisioning_state(resource, "Succeeded");
            }
        }
        (Pending::Write, Some(_)) => {
            if let Some(resource) = state.resources.get_mut(&operation.key) {
                set_provisioning_state(resource, "Failed");
            }
        }
        (Pending::Delete, None) => {
            state.resources.remove(&operation.key);
        }
        (Pending::Delete, Some(_)) => {
            if let Some(resource) = state.resources.get_mut(&operation.key) {
                set_provisioning_state(resource, "Succeeded");
            }
        }
    }
    failure
}

#[cfg(test)]
mod tests {
    use super::*;

    const RG: &str = "/subscriptions/sub/resourceGroups/rg";

    fn put(api: &MockApi, path: &str, body: Value) -> ApiResponse {
        api.send(&Request::resource(Method::Put, path, "v", Some(body)))
            .unwrap()
    }

    #[test]
    fn test_put_then_get_case_insensitive() {
        let api = MockApi::new();
        assert_eq!(put(&api, RG, json!({"location": "westus"})).status, 201);
        assert_eq!(put(&api, RG, json!({"location": "westus"})).status, 200);

        let response = api
            .send(&Request::get("/SUBSCRIPTIONS/sub/resourcegroups/RG", "v"))
            .unwrap();
        assert_eq!(response.status, 200);
        let body = response.body.unwrap();
        assert_eq!(body["name"], json!("rg"));
        assert_eq!(body["properties"]["provisioningState"], json!("Succeeded"));
    }

    #[test]
    fn test_get_missing_is_404_with_error_body() {
        let api = MockApi::new();
        let response = api.send(&Request::get(RG, "v")).unwrap();
        assert_eq!(response.status, 404);
        assert_eq!(response.body.unwrap()["error"]["code"], json!("ResourceNotFound"));
    }

    #[test]
    fn test_patch_merges() {
        let api = MockApi::new();
        api.insert(RG, json!({"location": "westus", "tags": {"a": "1", "b": "2"}}));
        let response = api
            .send(&Request::resource(
                Method::Patch,
                RG,
                "v",
                Some(json!({"tags": {"b": null, "c": "3"}})),
            ))
            .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(api.get(RG).unwrap()["tags"], json!({"a": "1", "c": "3"}));
    }

    #[test]
    fn test_list_pages() {
        let api = MockApi::new().with_page_size(2);
        for name in ["a", "b", "c"] {
            api.insert(&format!("/subscriptions/sub/resourceGroups/{name}"), json!({"name": name}));
        }
        api.insert("/subscriptions/other/resourceGroups/z", json!({"name": "z"}));

        let first = api
            .send(&Request::get("/subscriptions/sub/resourceGroups", "v"))
            .unwrap()
            .body
            .unwrap();
        assert_eq!(first["value"].as_array().unwrap().len(), 2);
        let next = first["nextLink"].as_str().unwrap().to_string();

        let second = api.send(&Request::get_url(next)).unwrap().body.unwrap();
        assert_eq!(second["value"], json!([{"name": "c"}]));
        assert!(second.get("nextLink").is_none());
    }

    #[test]
    fn test_injected_faults_fire_once() {
        let api = MockApi::new();
        api.inject(Method::Get, RG, Fault::Transport("connection reset".into()));
        assert!(matches!(
            api.send(&Request::get(RG, "v")),
            Err(Error::Transport(_))
        ));
        assert_eq!(api.send(&Request::get(RG, "v")).unwrap().status, 404);
    }

    #[test]
    fn test_async_operation_lifecycle() {
        let api = MockApi::new().with_async_polls(1);
        let response = put(&api, RG, json!({"location": "westus"}));
        assert_eq!(response.status, 201);
        let link = response.async_operation.unwrap();
        assert_eq!(
            api.get(RG).unwrap()["properties"]["provisioningState"],
            json!("Creating")
        );

        let poll = |api: &MockApi| api.send(&Request::get_url(link.clone())).unwrap().body.unwrap();
        assert_eq!(poll(&api)["status"], json!("InProgress"));
        assert_eq!(poll(&api)["status"], json!("Succeeded"));
        assert_eq!(
            api.get(RG).unwrap()["properties"]["provisioningState"],
            json!("Succeeded")
        );
    }

    #[test]
    fn test_mutations_journal() {
        let api = MockApi::new();
        api.send(&Request::get(RG, "v")).unwrap();
        put(&api, RG, json!({}));
        assert_eq!(api.requests().len(), 2);
        assert_eq!(api.mutations().len(), 1);
        api.clear_requests();
        assert!(api.requests().is_empty());
    }
}
