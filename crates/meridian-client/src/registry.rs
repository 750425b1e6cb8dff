//! Kind registry: codec and path template per resource kind
//!
//! Every kind the client can talk about is one [`KindSpec`] entry. The spec
//! knows the kind's apiVersion, wire Kind, plural and scope (which together
//! give its REST paths) and how to turn a [`Payload`] into JSON and back.
//! Neither the connector nor the client has per-kind logic: supporting a new
//! kind is a single [`KindRegistry::register`] call.
//!
//! Path templates:
//! - core group (`v1`): `/api/v1[/namespaces/{ns}]/{plural}[/{name}]`
//! - named group (`apps/v1`): `/apis/apps/v1[/namespaces/{ns}]/{plural}[/{name}]`

use std::collections::HashMap;

use meridian_common::Error;
use serde_json::Value;

use crate::resource::{
    Deployment, DynamicPayload, KindPayload, Namespace, NetworkPolicy, Payload, Pod,
    Secret, Service, ServiceAccount,
};

/// Whether objects of a kind live inside a namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Addressed under `/namespaces/{ns}/`
    Namespaced,
    /// Addressed at the group root
    Cluster,
}

/// Conversion between a [`Payload`] and its JSON body (without apiVersion/kind)
#[derive(Clone, Copy)]
pub struct Codec {
    to_value: fn(&Payload) -> Option<serde_json::Result<Value>>,
    from_value: fn(Value) -> serde_json::Result<Payload>,
}

impl std::fmt::Debug for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Codec")
    }
}

impl Codec {
    /// Codec for a typed payload
    pub fn typed<T: KindPayload>() -> Self {
        Self {
            to_value: typed_to_value::<T>,
            from_value: typed_from_value::<T>,
        }
    }

    /// Codec passing everything but metadata through as raw JSON
    pub fn dynamic() -> Self {
        Self {
            to_value: dynamic_to_value,
            from_value: dynamic_from_value,
        }
    }
}

fn typed_to_value<T: KindPayload>(payload: &Payload) -> Option<serde_json::Result<Value>> {
    T::from_payload(payload).map(serde_json::to_value)
}

fn typed_from_value<T: KindPayload>(value: Value) -> serde_json::Result<Payload> {
    serde_json::from_value::<T>(value).map(Into::into)
}

fn dynamic_to_value(payload: &Payload) -> Option<serde_json::Result<Value>> {
    match payload {
        Payload::Dynamic(p) => Some(serde_json::to_value(p)),
        _ => None,
    }
}

fn dynamic_from_value(value: Value) -> serde_json::Result<Payload> {
    serde_json::from_value::<DynamicPayload>(value).map(Payload::Dynamic)
}

/// Registration entry for one kind
#[derive(Debug, Clone)]
pub struct KindSpec {
    /// Discriminator used in [`crate::Resource::kind`] (lowercase)
    pub kind: String,
    /// Full apiVersion (e.g. "v1", "networking.k8s.io/v1")
    pub api_version: String,
    /// Kind as it appears on the wire (e.g. "NetworkPolicy")
    pub api_kind: String,
    /// Plural resource name used in paths
    pub plural: String,
    /// Namespaced or cluster-scoped
    pub scope: Scope,
    codec: Codec,
}

impl KindSpec {
    /// Entry for a typed payload
    pub fn typed<T: KindPayload>(api_version: &str, api_kind: &str, scope: Scope) -> Self {
        Self {
            kind: T::KIND.to_string(),
            api_version: api_version.to_string(),
            api_kind: api_kind.to_string(),
            plural: pluralize_kind(api_kind),
            scope,
            codec: Codec::typed::<T>(),
        }
    }

    /// Entry for a kind without a Rust type, carried as [`DynamicPayload`]
    ///
    /// The discriminator is the lowercased wire Kind.
    pub fn dynamic(api_version: &str, api_kind: &str, scope: Scope) -> Self {
        Self {
            kind: api_kind.to_ascii_lowercase(),
            api_version: api_version.to_string(),
            api_kind: api_kind.to_string(),
            plural: pluralize_kind(api_kind),
            scope,
            codec: Codec::dynamic(),
        }
    }

    /// Override the plural when the default rules get it wrong
    pub fn with_plural(mut self, plural: impl Into<String>) -> Self {
        self.plural = plural.into();
        self
    }

    /// True for namespaced kinds
    pub fn is_namespaced(&self) -> bool {
        self.scope == Scope::Namespaced
    }

    /// `/api/{version}` or `/apis/{group}/{version}`
    fn api_root(&self) -> String {
        let (group, version) = parse_api_version(&self.api_version);
        if group.is_empty() {
            format!("/api/{version}")
        } else {
            format!("/apis/{group}/{version}")
        }
    }

    /// Collection path
    ///
    /// For a namespaced kind, `None` addresses the collection across all
    /// namespaces (list only). Cluster-scoped kinds ignore the namespace.
    pub fn collection_path(&self, namespace: Option<&str>) -> String {
        match (self.scope, namespace) {
            (Scope::Namespaced, Some(ns)) => {
                format!("{}/namespaces/{}/{}", self.api_root(), ns, self.plural)
            }
            _ => format!("{}/{}", self.api_root(), self.plural),
        }
    }

    /// Path of a single object
    pub fn item_path(&self, namespace: &str, name: &str) -> String {
        format!("{}/{}", self.collection_path(Some(namespace)), name)
    }

    /// Payload as a JSON object with apiVersion and kind set
    pub fn encode_value(&self, payload: &Payload) -> Result<Value, Error> {
        let value = (self.codec.to_value)(payload)
            .ok_or_else(|| {
                Error::serialization_for_kind(
                    &self.kind,
                    format!(
                        "payload is a {} but the resource kind is {}",
                        payload.kind().unwrap_or("dynamic object"),
                        self.kind
                    ),
                )
            })?
            .map_err(|e| Error::serialization_for_kind(&self.kind, e.to_string()))?;

        let Value::Object(mut object) = value else {
            return Err(Error::serialization_for_kind(
                &self.kind,
                "payload did not encode to a JSON object",
            ));
        };
        object.insert(
            "apiVersion".to_string(),
            Value::String(self.api_version.clone()),
        );
        object.insert("kind".to_string(), Value::String(self.api_kind.clone()));
        Ok(Value::Object(object))
    }

    /// Payload as wire bytes
    pub fn encode(&self, payload: &Payload) -> Result<Vec<u8>, Error> {
        let value = self.encode_value(payload)?;
        serde_json::to_vec(&value)
            .map_err(|e| Error::serialization_for_kind(&self.kind, e.to_string()))
    }

    /// Payload from a decoded JSON object
    pub fn decode_value(&self, value: Value) -> Result<Payload, Error> {
        (self.codec.from_value)(value)
            .map_err(|e| Error::serialization_for_kind(&self.kind, e.to_string()))
    }

    /// Payload from wire bytes
    pub fn decode(&self, bytes: &[u8]) -> Result<Payload, Error> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| Error::serialization_for_kind(&self.kind, e.to_string()))?;
        self.decode_value(value)
    }
}

/// Kind discriminator → [`KindSpec`]
#[derive(Debug, Clone, Default)]
pub struct KindRegistry {
    entries: HashMap<String, KindSpec>,
}

impl KindRegistry {
    /// Registry with no kinds
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with all built-in kinds
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for spec in builtin_kinds() {
            registry.register(spec);
        }
        registry
    }

    /// Add or replace a kind
    pub fn register(&mut self, spec: KindSpec) -> &mut Self {
        self.entries.insert(spec.kind.to_ascii_lowercase(), spec);
        self
    }

    /// Look up a kind (ASCII case-insensitive)
    pub fn lookup(&self, kind: &str) -> Result<&KindSpec, Error> {
        self.entries
            .get(&kind.to_ascii_lowercase())
            .ok_or_else(|| Error::unsupported_kind(kind))
    }

    /// Registered discriminators, unordered
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

fn builtin_kinds() -> Vec<KindSpec> {
    vec![
        KindSpec::typed::<Namespace>("v1", "Namespace", Scope::Cluster),
        KindSpec::typed::<NetworkPolicy>(
            "networking.k8s.io/v1",
            "NetworkPolicy",
            Scope::Namespaced,
        ),
        KindSpec::typed::<Deployment>("apps/v1", "Deployment", Scope::Namespaced),
        KindSpec::typed::<Service>("v1", "Service", Scope::Namespaced),
        KindSpec::typed::<Secret>("v1", "Secret", Scope::Namespaced),
        KindSpec::typed::<ServiceAccount>("v1", "ServiceAccount", Scope::Namespaced),
        KindSpec::typed::<Pod>("v1", "Pod", Scope::Namespaced),
    ]
}

/// Split "group/version" into its parts; core-group versions have no group
pub fn parse_api_version(api_version: &str) -> (String, String) {
    match api_version.split_once('/') {
        Some((group, version)) => (group.to_string(), version.to_string()),
        None => (String::new(), api_version.to_string()),
    }
}

/// Known irregular plurals
const KIND_PLURALS: &[(&str, &str)] = &[
    ("networkpolicy", "networkpolicies"),
    ("ingress", "ingresses"),
    ("endpoints", "endpoints"),
];

/// Lowercase plural of a wire Kind as used in API paths
pub fn pluralize_kind(kind: &str) -> String {
    let lower = kind.to_lowercase();

    for (singular, plural) in KIND_PLURALS {
        if *singular == lower {
            return (*plural).to_string();
        }
    }

    if lower.ends_with('s') || lower.ends_with("ch") || lower.ends_with("sh") {
        format!("{}es", lower)
    } else if lower.ends_with('y') && !lower.ends_with("ay") && !lower.ends_with("ey") {
        format!("{}ies", &lower[..lower.len() - 1])
    } else {
        format!("{}s", lower)
    }
}
