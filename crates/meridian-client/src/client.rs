//! Generic resource client
//!
//! Create, update, delete, get and list over any kind in the registry. The
//! client resolves the kind, the object's identity and its path, encodes the
//! payload, hands one request to the connector and maps the response status
//! onto [`Error`]. It never retries: a failed call is reported once and the
//! caller decides what to do.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use http::Method;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Status;
use meridian_common::{Error, TransportReason};
use serde::Deserialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::connector::{
    ApiRequest, ApiResponse, Connector, CONTENT_TYPE_JSON, CONTENT_TYPE_MERGE_PATCH,
};
use crate::registry::{KindRegistry, KindSpec};
use crate::resource::{validate_dns_label, Resource};

/// Cancellation and deadline for one call
///
/// Cancelling the token or passing the deadline abandons the in-flight
/// request. For a mutating call the outcome is then unknown.
#[derive(Clone, Debug, Default)]
pub struct CallContext {
    /// Cancelled by the caller to abort the call
    pub cancel: CancellationToken,
    /// Upper bound on the whole call, on top of the connector's own timeout
    pub timeout: Option<Duration>,
}

impl CallContext {
    /// Context with a deadline
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..Default::default()
        }
    }

    /// Context tied to an existing cancellation token
    pub fn with_cancel(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            timeout: None,
        }
    }
}

/// Filters for [`ResourceClient::list`]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListParams {
    /// Namespace to list in; `None` lists across all namespaces
    pub namespace: Option<String>,
    /// Equality label selector; every pair must match
    pub label_selector: BTreeMap<String, String>,
    /// Raw field selector, e.g. `metadata.name=ingress`
    pub field_selector: Option<String>,
}

impl ListParams {
    /// List in one namespace
    pub fn in_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            ..Default::default()
        }
    }

    /// Require a label
    pub fn labels(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.label_selector.insert(key.into(), value.into());
        self
    }

    /// Set the field selector
    pub fn fields(mut self, selector: impl Into<String>) -> Self {
        self.field_selector = Some(selector.into());
        self
    }

    fn label_selector_string(&self) -> Option<String> {
        if self.label_selector.is_empty() {
            return None;
        }
        Some(
            self.label_selector
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(","),
        )
    }
}

#[derive(Deserialize)]
struct ListBody {
    #[serde(default)]
    items: Vec<Value>,
}

/// Where one addressed call goes
struct Target<'a> {
    spec: &'a KindSpec,
    namespace: String,
    name: String,
}

impl Target<'_> {
    fn path(&self) -> String {
        self.spec.item_path(&self.namespace, &self.name)
    }
}

/// CRUD and list over registered kinds
#[derive(Clone)]
pub struct ResourceClient {
    connector: Arc<dyn Connector>,
    registry: Arc<KindRegistry>,
    field_manager: Option<String>,
}

impl std::fmt::Debug for ResourceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceClient")
            .field("field_manager", &self.field_manager)
            .finish_non_exhaustive()
    }
}

impl ResourceClient {
    /// Client over the built-in kinds
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self::with_registry(connector, KindRegistry::builtin())
    }

    /// Client over a custom registry
    pub fn with_registry(connector: Arc<dyn Connector>, registry: KindRegistry) -> Self {
        Self {
            connector,
            registry: Arc::new(registry),
            field_manager: None,
        }
    }

    /// Record `manager` as the field manager on create and update
    pub fn with_field_manager(mut self, manager: impl Into<String>) -> Self {
        self.field_manager = Some(manager.into());
        self
    }

    /// Kinds this client can address
    pub fn registry(&self) -> &KindRegistry {
        &self.registry
    }

    /// Create the object; 409 becomes [`Error::AlreadyExists`]
    pub async fn create(&self, resource: &Resource, ctx: &CallContext) -> Result<(), Error> {
        let target = self.target(resource)?;
        let body = self.body(&target, resource)?;
        let path = target.spec.collection_path(Some(&target.namespace));
        let request = self
            .with_manager(ApiRequest::new(Method::POST, path).with_body(body, CONTENT_TYPE_JSON));
        self.call(&target, request, ctx).await.map(drop)
    }

    /// Merge-patch the object with the payload; 404 becomes [`Error::NotFound`]
    pub async fn update(&self, resource: &Resource, ctx: &CallContext) -> Result<(), Error> {
        let target = self.target(resource)?;
        let body = self.body(&target, resource)?;
        let request = self.with_manager(
            ApiRequest::new(Method::PATCH, target.path()).with_body(body, CONTENT_TYPE_MERGE_PATCH),
        );
        self.call(&target, request, ctx).await.map(drop)
    }

    /// Delete the object; a missing object is [`Error::NotFound`]
    pub async fn delete(&self, resource: &Resource, ctx: &CallContext) -> Result<(), Error> {
        let target = self.target(resource)?;
        let request = ApiRequest::new(Method::DELETE, target.path());
        self.call(&target, request, ctx).await.map(drop)
    }

    /// Read the object's current state
    pub async fn get(&self, resource: &Resource, ctx: &CallContext) -> Result<Resource, Error> {
        let target = self.target(resource)?;
        let request = ApiRequest::new(Method::GET, target.path());
        let response = self.call(&target, request, ctx).await?;
        let payload = target.spec.decode(&response.body)?;
        Ok(Resource {
            kind: target.spec.kind.clone(),
            name: target.name,
            namespace: target.namespace,
            value: Some(payload),
        })
    }

    /// List objects of `kind`, in server order
    pub async fn list(
        &self,
        kind: &str,
        params: &ListParams,
        ctx: &CallContext,
    ) -> Result<Vec<Resource>, Error> {
        let spec = self.registry.lookup(kind)?;
        let namespace = params.namespace.as_deref().filter(|ns| !ns.is_empty());
        if let Some(namespace) = namespace {
            validate_dns_label("namespace", namespace)?;
        }
        let mut request = ApiRequest::new(Method::GET, spec.collection_path(namespace));
        if let Some(selector) = params.label_selector_string() {
            request = request.with_query("labelSelector", selector);
        }
        if let Some(selector) = &params.field_selector {
            request = request.with_query("fieldSelector", selector.clone());
        }

        let target = Target {
            spec,
            namespace: namespace.unwrap_or_default().to_string(),
            name: String::new(),
        };
        let response = self.call(&target, request, ctx).await?;
        let list: ListBody = serde_json::from_slice(&response.body)
            .map_err(|e| Error::serialization_for_kind(&spec.kind, e.to_string()))?;

        list.items
            .into_iter()
            .map(|item| {
                let payload = spec.decode_value(item)?;
                let metadata = payload.metadata();
                Ok(Resource {
                    kind: spec.kind.clone(),
                    name: metadata.name.clone(),
                    namespace: metadata.namespace.clone(),
                    value: Some(payload),
                })
            })
            .collect()
    }

    /// Look up the kind and resolve the object's name and namespace
    ///
    /// Both end up as path segments, so both must be DNS labels.
    fn target<'a>(&'a self, resource: &Resource) -> Result<Target<'a>, Error> {
        let spec = self.registry.lookup(&resource.kind)?;
        let name = resource
            .resolved_name()
            .ok_or_else(|| Error::validation_for_field("metadata.name", "resource has no name"))?
            .to_string();
        validate_dns_label("metadata.name", &name)?;
        let namespace = if spec.is_namespaced() {
            let namespace = resource.resolved_namespace().to_string();
            validate_dns_label("metadata.namespace", &namespace)?;
            namespace
        } else {
            String::new()
        };
        Ok(Target {
            spec,
            namespace,
            name,
        })
    }

    /// Encode the payload with the resolved identity written into its metadata
    fn body(&self, target: &Target<'_>, resource: &Resource) -> Result<Vec<u8>, Error> {
        let payload = resource.value.as_ref().ok_or_else(|| {
            Error::validation_for_field("value", format!("{} has no payload", target.spec.kind))
        })?;
        let mut value = target.spec.encode_value(payload)?;
        if let Some(Value::Object(metadata)) = value.get_mut("metadata") {
            metadata.insert("name".into(), Value::String(target.name.clone()));
            if target.spec.is_namespaced() {
                metadata.insert("namespace".into(), Value::String(target.namespace.clone()));
            }
        }
        serde_json::to_vec(&value)
            .map_err(|e| Error::serialization_for_kind(&target.spec.kind, e.to_string()))
    }

    fn with_manager(&self, request: ApiRequest) -> ApiRequest {
        match &self.field_manager {
            Some(manager) => request.with_query("fieldManager", manager.clone()),
            None => request,
        }
    }

    /// Execute under the context's cancellation and deadline, then map status
    async fn call(
        &self,
        target: &Target<'_>,
        request: ApiRequest,
        ctx: &CallContext,
    ) -> Result<ApiResponse, Error> {
        debug!(
            kind = %target.spec.kind,
            namespace = %target.namespace,
            name = %target.name,
            method = %request.method,
            path = %request.path,
            "Sending control-plane request"
        );

        let exchange = async {
            match ctx.timeout {
                Some(limit) => tokio::time::timeout(limit, self.connector.execute(request))
                    .await
                    .map_err(|_| {
                        Error::transport(
                            TransportReason::Timeout,
                            format!("call did not complete within {limit:?}"),
                        )
                    })?,
                None => self.connector.execute(request).await,
            }
        };

        let response = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => Err(Error::cancelled()),
            result = exchange => result,
        }?;

        debug!(
            kind = %target.spec.kind,
            namespace = %target.namespace,
            name = %target.name,
            status = response.status,
            "Control-plane response"
        );
        check_status(target, response)
    }
}

/// Map a response onto success or the matching [`Error`] variant
fn check_status(target: &Target<'_>, response: ApiResponse) -> Result<ApiResponse, Error> {
    if response.is_success() {
        return Ok(response);
    }

    let (reason, message) = status_details(&response);
    let kind = target.spec.kind.clone();
    let namespace = target.namespace.clone();
    let name = target.name.clone();

    Err(match response.status {
        401 | 403 => Error::Auth {
            status: Some(response.status),
            message,
        },
        404 => Error::NotFound {
            kind,
            namespace,
            name,
            message,
        },
        409 => Error::AlreadyExists {
            kind,
            namespace,
            name,
            message,
        },
        status => Error::ControlPlane {
            status,
            reason,
            message,
        },
    })
}

/// Reason and message from a `Status` body, else the raw body text
fn status_details(response: &ApiResponse) -> (String, String) {
    let raw = String::from_utf8_lossy(&response.body).trim().to_string();
    let canonical = http::StatusCode::from_u16(response.status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or_default()
        .to_string();

    match serde_json::from_slice::<Status>(&response.body) {
        Ok(status) => (
            status.reason.filter(|r| !r.is_empty()).unwrap_or(canonical),
            status.message.filter(|m| !m.is_empty()).unwrap_or(raw),
        ),
        Err(_) => (canonical, raw),
    }
}
