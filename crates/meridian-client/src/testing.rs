//! In-memory control plane for tests
//!
//! [`FakeControlPlane`] implements [`Connector`] by interpreting API paths
//! itself: POST stores, GET reads or lists, PATCH merges, DELETE removes.
//! Missing objects answer 404 and duplicate creates 409 with `Status` bodies
//! shaped like the real API server's. The `default` namespace exists from the
//! start, and namespaced objects can only be created in a namespace that
//! exists. Deleting a namespace removes everything in it immediately.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use meridian_common::{Error, DEFAULT_NAMESPACE};
use serde_json::{json, Map, Value};

use crate::connector::{ApiRequest, ApiResponse, Connector};
use crate::resource::PHASE_ACTIVE;

const CORE_ROOT: &str = "/api/v1";

/// Identity of a stored object
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct ObjectKey {
    root: String,
    plural: String,
    namespace: Option<String>,
    name: String,
}

impl ObjectKey {
    fn is_namespace(&self) -> bool {
        self.root == CORE_ROOT && self.plural == "namespaces" && self.namespace.is_none()
    }
}

/// A parsed API path
enum Address {
    Collection {
        root: String,
        plural: String,
        namespace: Option<String>,
    },
    Item(ObjectKey),
}

fn parse_path(path: &str) -> Option<Address> {
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
    let root_len = match segments.first() {
        Some(&"api") => 2,
        Some(&"apis") => 3,
        _ => return None,
    };
    if segments.len() <= root_len {
        return None;
    }
    let root = format!("/{}", segments[..root_len].join("/"));
    let owned = |s: &str| s.to_string();
    match &segments[root_len..] {
        [plural] => Some(Address::Collection {
            root,
            plural: owned(plural),
            namespace: None,
        }),
        [plural, name] => Some(Address::Item(ObjectKey {
            root,
            plural: owned(plural),
            namespace: None,
            name: owned(name),
        })),
        ["namespaces", ns, plural] => Some(Address::Collection {
            root,
            plural: owned(plural),
            namespace: Some(owned(ns)),
        }),
        ["namespaces", ns, plural, name] => Some(Address::Item(ObjectKey {
            root,
            plural: owned(plural),
            namespace: Some(owned(ns)),
            name: owned(name),
        })),
        _ => None,
    }
}

/// A queued failure, optionally bound to one method and path
struct Failure {
    method: Option<String>,
    path: Option<String>,
    response: ApiResponse,
}

impl Failure {
    fn matches(&self, request: &ApiRequest) -> bool {
        self.method.as_deref().map_or(true, |m| m == request.method.as_str())
            && self.path.as_deref().map_or(true, |p| p == request.path)
    }
}

#[derive(Default)]
struct State {
    objects: BTreeMap<ObjectKey, Value>,
    requests: Vec<ApiRequest>,
    failures: Vec<Failure>,
    next_version: u64,
}

/// In-memory [`Connector`] with API-server-like semantics
pub struct FakeControlPlane {
    state: Mutex<State>,
    latency: Option<Duration>,
}

impl Default for FakeControlPlane {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeControlPlane {
    /// Fake with only the `default` namespace
    pub fn new() -> Self {
        let fake = Self {
            state: Mutex::new(State::default()),
            latency: None,
        };
        fake.insert_namespace(DEFAULT_NAMESPACE);
        fake
    }

    /// Delay every response by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Answer the next request with `status` and a `Status` body
    pub fn fail_next(&self, status: u16, reason: &str, message: &str) {
        self.lock().failures.push(Failure {
            method: None,
            path: None,
            response: failure(status, reason, message),
        });
    }

    /// Answer the next `method` request to exactly `path` with `status`
    pub fn fail_request(
        &self,
        method: &str,
        path: &str,
        status: u16,
        reason: &str,
        message: &str,
    ) {
        self.lock().failures.push(Failure {
            method: Some(method.to_string()),
            path: Some(path.to_string()),
            response: failure(status, reason, message),
        });
    }

    /// Every request received so far, in order
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.lock().requests.clone()
    }

    /// Number of stored objects under `plural`, across all namespaces
    pub fn count(&self, plural: &str) -> usize {
        self.lock()
            .objects
            .keys()
            .filter(|k| k.plural == plural)
            .count()
    }

    /// Stored object at an item path
    pub fn object(&self, path: &str) -> Option<Value> {
        match parse_path(path)? {
            Address::Item(key) => self.lock().objects.get(&key).cloned(),
            Address::Collection { .. } => None,
        }
    }

    fn insert_namespace(&self, name: &str) {
        let object = json!({
            "apiVersion": "v1",
            "kind": "Namespace",
            "metadata": {"name": name},
            "status": {"phase": PHASE_ACTIVE}
        });
        self.lock().objects.insert(namespace_key(name), object);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn handle(&self, request: &ApiRequest) -> ApiResponse {
        let mut state = self.lock();
        state.requests.push(request.clone());
        if let Some(index) = state.failures.iter().position(|f| f.matches(request)) {
            return state.failures.remove(index).response;
        }

        let Some(address) = parse_path(&request.path) else {
            let message = format!(
                "the server could not find the requested resource ({})",
                request.path
            );
            return failure(404, "NotFound", &message);
        };
        let body = match request.body.as_deref().map(serde_json::from_slice::<Value>) {
            Some(Ok(body)) => Some(body),
            Some(Err(e)) => return failure(400, "BadRequest", &e.to_string()),
            None => None,
        };

        match (request.method.as_str(), address) {
            ("GET", Address::Item(key)) => match state.objects.get(&key) {
                Some(object) => ok(200, object),
                None => not_found(&key),
            },
            ("GET", Address::Collection { root, plural, namespace }) => {
                let items = state
                    .objects
                    .iter()
                    .filter(|(k, _)| k.root == root && k.plural == plural)
                    .filter(|(k, _)| namespace.is_none() || k.namespace == namespace)
                    .filter(|(_, v)| matches_selectors(v, &request.query))
                    .map(|(_, v)| v.clone())
                    .collect::<Vec<_>>();
                ok(200, &json!({"kind": "List", "apiVersion": "v1", "items": items}))
            }
            ("POST", Address::Collection { root, plural, namespace }) => {
                let Some(mut object) = body else {
                    return failure(400, "BadRequest", "create requires a body");
                };
                let name = object["metadata"]["name"].as_str().unwrap_or_default().to_string();
                if name.is_empty() {
                    return failure(
                        422,
                        "Invalid",
                        "metadata.name: Required value: name is required",
                    );
                }
                if let Some(ns) = &namespace {
                    if !state.objects.contains_key(&namespace_key(ns)) {
                        return not_found(&namespace_key(ns));
                    }
                }
                let key = ObjectKey {
                    root,
                    plural,
                    namespace,
                    name,
                };
                if state.objects.contains_key(&key) {
                    return failure(
                        409,
                        "AlreadyExists",
                        &format!("{} \"{}\" already exists", key.plural, key.name),
                    );
                }
                if key.is_namespace() {
                    object["status"] = json!({"phase": PHASE_ACTIVE});
                }
                state.next_version += 1;
                object["metadata"]["resourceVersion"] = json!(state.next_version.to_string());
                state.objects.insert(key, object.clone());
                ok(201, &object)
            }
            ("PATCH", Address::Item(key)) => {
                let Some(patch) = body else {
                    return failure(400, "BadRequest", "patch requires a body");
                };
                state.next_version += 1;
                let version = state.next_version;
                match state.objects.get_mut(&key) {
                    Some(object) => {
                        merge_patch(object, &patch);
                        object["metadata"]["resourceVersion"] = json!(version.to_string());
                        ok(200, object)
                    }
                    None => not_found(&key),
                }
            }
            ("DELETE", Address::Item(key)) => match state.objects.remove(&key) {
                Some(object) => {
                    if key.is_namespace() {
                        state
                            .objects
                            .retain(|k, _| k.namespace.as_deref() != Some(key.name.as_str()));
                    }
                    ok(200, &object)
                }
                None => not_found(&key),
            },
            (method, _) => failure(
                405,
                "MethodNotAllowed",
                &format!("{method} is not supported on {}", request.path),
            ),
        }
    }
}

#[async_trait]
impl Connector for FakeControlPlane {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, Error> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        Ok(self.handle(&request))
    }
}

fn namespace_key(name: &str) -> ObjectKey {
    ObjectKey {
        root: CORE_ROOT.to_string(),
        plural: "namespaces".to_string(),
        namespace: None,
        name: name.to_string(),
    }
}

fn ok(status: u16, object: &Value) -> ApiResponse {
    ApiResponse {
        status,
        body: serde_json::to_vec(object).unwrap_or_default(),
    }
}

fn status_body(status: u16, reason: &str, message: &str) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "kind": "Status",
        "apiVersion": "v1",
        "metadata": {},
        "status": "Failure",
        "message": message,
        "reason": reason,
        "code": status
    }))
    .unwrap_or_default()
}

fn failure(status: u16, reason: &str, message: &str) -> ApiResponse {
    ApiResponse {
        status,
        body: status_body(status, reason, message),
    }
}

fn not_found(key: &ObjectKey) -> ApiResponse {
    failure(
        404,
        "NotFound",
        &format!("{} \"{}\" not found", key.plural, key.name),
    )
}

/// RFC 7386 JSON merge patch
fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(target) = target {
        for (key, value) in patch {
            if value.is_null() {
                target.remove(key);
            } else {
                merge_patch(target.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}

/// Equality-based label and field selectors
fn matches_selectors(object: &Value, query: &[(String, String)]) -> bool {
    query.iter().all(|(param, selector)| match param.as_str() {
        "labelSelector" => selector.split(',').filter(|s| !s.is_empty()).all(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            object["metadata"]["labels"][key].as_str() == Some(value)
        }),
        "fieldSelector" => selector.split(',').filter(|s| !s.is_empty()).all(|pair| {
            let (field, value) = pair.split_once('=').unwrap_or((pair, ""));
            let found = field
                .split('.')
                .fold(object, |v, segment| &v[segment])
                .as_str();
            found == Some(value)
        }),
        _ => true,
    })
}

#[cfg(test)]
mod tests {
    use http::Method;

    use super::*;
    use crate::connector::CONTENT_TYPE_JSON;

    fn post(path: &str, body: Value) -> ApiRequest {
        ApiRequest::new(Method::POST, path)
            .with_body(serde_json::to_vec(&body).unwrap(), CONTENT_TYPE_JSON)
    }

    #[tokio::test]
    async fn namespaced_create_needs_the_namespace() {
        let fake = FakeControlPlane::new();
        let response = fake
            .execute(post(
                "/api/v1/namespaces/missing/services",
                json!({"metadata": {"name": "web"}}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status, 404);
        assert!(fake.requests().len() == 1);
    }

    #[tokio::test]
    async fn deleting_a_namespace_removes_its_contents() {
        let fake = FakeControlPlane::new();
        fake.execute(post("/api/v1/namespaces", json!({"metadata": {"name": "baz"}})))
            .await
            .unwrap();
        fake.execute(post(
            "/apis/networking.k8s.io/v1/namespaces/baz/networkpolicies",
            json!({"metadata": {"name": "ingress"}}),
        ))
        .await
        .unwrap();
        assert_eq!(fake.count("networkpolicies"), 1);

        let response = fake
            .execute(ApiRequest::new(Method::DELETE, "/api/v1/namespaces/baz"))
            .await
            .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(fake.count("networkpolicies"), 0);
    }

    #[tokio::test]
    async fn injected_failure_answers_once() {
        let fake = FakeControlPlane::new();
        fake.fail_next(500, "InternalError", "etcd unavailable");
        let first = fake
            .execute(ApiRequest::new(Method::GET, "/api/v1/namespaces/default"))
            .await
            .unwrap();
        let second = fake
            .execute(ApiRequest::new(Method::GET, "/api/v1/namespaces/default"))
            .await
            .unwrap();
        assert_eq!(first.status, 500);
        assert_eq!(second.status, 200);
    }

    #[tokio::test]
    async fn targeted_failure_waits_for_its_request() {
        let fake = FakeControlPlane::new();
        let path = "/api/v1/namespaces/default/services";
        fake.fail_request("POST", path, 500, "InternalError", "etcd unavailable");

        let read = fake
            .execute(ApiRequest::new(Method::GET, "/api/v1/namespaces/default"))
            .await
            .unwrap();
        assert_eq!(read.status, 200);

        let create = post(path, json!({"metadata": {"name": "greeter"}}));
        assert_eq!(fake.execute(create.clone()).await.unwrap().status, 500);
        assert_eq!(fake.execute(create).await.unwrap().status, 201);
    }

    #[test]
    fn merge_patch_replaces_and_removes() {
        let mut target = json!({
            "spec": {"replicas": 1, "paused": true},
            "metadata": {"name": "a"}
        });
        merge_patch(&mut target, &json!({"spec": {"replicas": 3, "paused": null}}));
        assert_eq!(target, json!({"spec": {"replicas": 3}, "metadata": {"name": "a"}}));
    }

    #[test]
    fn selectors_match_labels_and_fields() {
        let object = json!({
            "metadata": {"name": "greeter", "labels": {"name": "greeter", "version": "v1"}}
        });
        let query = |k: &str, v: &str| vec![(k.to_string(), v.to_string())];
        assert!(matches_selectors(&object, &query("labelSelector", "name=greeter,version=v1")));
        assert!(!matches_selectors(&object, &query("labelSelector", "version=v2")));
        assert!(matches_selectors(&object, &query("fieldSelector", "metadata.name=greeter")));
    }
}
