//! Resource model
//!
//! A [`Resource`] is the envelope every client operation takes: a kind
//! discriminator, an optional explicit name/namespace, and a [`Payload`]. The
//! payload is a closed set of typed variants plus [`DynamicPayload`] for kinds
//! registered at runtime without a dedicated Rust type. How each kind is
//! encoded and where it lives on the API server is the business of the
//! [`crate::registry`]; nothing here knows about paths or HTTP.

mod meta;
mod namespace;
mod network_policy;
mod secret;
mod service;
mod workload;

use meridian_common::DEFAULT_NAMESPACE;
use serde::{Deserialize, Serialize};

pub use meta::{validate_dns_label, LabelSelector, LocalObjectReference, Metadata};
pub use namespace::{Namespace, NamespaceStatus, PHASE_ACTIVE, PHASE_TERMINATING};
pub use network_policy::{NetworkPolicy, DEFAULT_POLICY_NAME};
pub use secret::{Secret, ServiceAccount, SECRET_TYPE_DOCKER_CONFIG_JSON, SECRET_TYPE_OPAQUE};
pub use service::{Service, ServicePort, ServiceSpec};
pub use workload::{
    Container, ContainerPort, Deployment, DeploymentSpec, DeploymentStatus, EnvVar, Pod, PodMeta,
    PodSpec, PodStatus, PodTemplateSpec, LABEL_NAME, LABEL_VERSION,
};

/// Kind discriminators of the built-in payloads
pub mod kinds {
    /// Namespace
    pub const NAMESPACE: &str = "namespace";
    /// NetworkPolicy
    pub const NETWORK_POLICY: &str = "networkpolicy";
    /// Deployment
    pub const DEPLOYMENT: &str = "deployment";
    /// Service
    pub const SERVICE: &str = "service";
    /// Secret
    pub const SECRET: &str = "secret";
    /// ServiceAccount
    pub const SERVICE_ACCOUNT: &str = "serviceaccount";
    /// Pod
    pub const POD: &str = "pod";
}

/// Object of a kind without a dedicated Rust type
///
/// Everything besides metadata is kept as raw JSON and passed through.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct DynamicPayload {
    /// Metadata
    pub metadata: Metadata,
    /// Remaining top-level fields (spec, data, ...)
    #[serde(flatten)]
    pub data: serde_json::Map<String, serde_json::Value>,
}

/// Kind-specific payload carried by a [`Resource`]
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    /// Namespace
    Namespace(Namespace),
    /// NetworkPolicy
    NetworkPolicy(NetworkPolicy),
    /// Deployment
    Deployment(Deployment),
    /// Service
    Service(Service),
    /// Secret
    Secret(Secret),
    /// ServiceAccount
    ServiceAccount(ServiceAccount),
    /// Pod
    Pod(Pod),
    /// Any runtime-registered kind
    Dynamic(DynamicPayload),
}

impl Payload {
    /// Metadata of the wrapped payload
    pub fn metadata(&self) -> &Metadata {
        match self {
            Payload::Namespace(p) => &p.metadata,
            Payload::NetworkPolicy(p) => &p.metadata,
            Payload::Deployment(p) => &p.metadata,
            Payload::Service(p) => &p.metadata,
            Payload::Secret(p) => &p.metadata,
            Payload::ServiceAccount(p) => &p.metadata,
            Payload::Pod(p) => &p.metadata,
            Payload::Dynamic(p) => &p.metadata,
        }
    }

    /// Kind discriminator of the variant, `None` for dynamic payloads
    pub fn kind(&self) -> Option<&'static str> {
        match self {
            Payload::Namespace(_) => Some(kinds::NAMESPACE),
            Payload::NetworkPolicy(_) => Some(kinds::NETWORK_POLICY),
            Payload::Deployment(_) => Some(kinds::DEPLOYMENT),
            Payload::Service(_) => Some(kinds::SERVICE),
            Payload::Secret(_) => Some(kinds::SECRET),
            Payload::ServiceAccount(_) => Some(kinds::SERVICE_ACCOUNT),
            Payload::Pod(_) => Some(kinds::POD),
            Payload::Dynamic(_) => None,
        }
    }
}

/// A typed payload with a fixed kind discriminator
///
/// Implemented by every built-in payload type. The registry uses it to build
/// codecs, and callers use it to get typed values back out of a [`Resource`].
pub trait KindPayload: Serialize + serde::de::DeserializeOwned + Into<Payload> + Sized {
    /// Kind discriminator this payload is registered under
    const KIND: &'static str;

    /// Borrow the typed value if `payload` is this variant
    fn from_payload(payload: &Payload) -> Option<&Self>;

    /// Take the typed value if `payload` is this variant
    fn try_from_payload(payload: Payload) -> Option<Self>;
}

macro_rules! kind_payload {
    ($ty:ident, $kind:expr) => {
        impl From<$ty> for Payload {
            fn from(value: $ty) -> Self {
                Payload::$ty(value)
            }
        }

        impl KindPayload for $ty {
            const KIND: &'static str = $kind;

            fn from_payload(payload: &Payload) -> Option<&Self> {
                match payload {
                    Payload::$ty(value) => Some(value),
                    _ => None,
                }
            }

            fn try_from_payload(payload: Payload) -> Option<Self> {
                match payload {
                    Payload::$ty(value) => Some(value),
                    _ => None,
                }
            }
        }
    };
}

kind_payload!(Namespace, kinds::NAMESPACE);
kind_payload!(NetworkPolicy, kinds::NETWORK_POLICY);
kind_payload!(Deployment, kinds::DEPLOYMENT);
kind_payload!(Service, kinds::SERVICE);
kind_payload!(Secret, kinds::SECRET);
kind_payload!(ServiceAccount, kinds::SERVICE_ACCOUNT);
kind_payload!(Pod, kinds::POD);

impl From<DynamicPayload> for Payload {
    fn from(value: DynamicPayload) -> Self {
        Payload::Dynamic(value)
    }
}

/// Envelope addressing one object on the control plane
///
/// `name` and `namespace` may be left empty when the payload's metadata
/// carries them. A resource without a payload addresses an existing object
/// for get or delete.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Resource {
    /// Kind discriminator, e.g. "namespace" or "networkpolicy"
    pub kind: String,
    /// Explicit name, overrides `value.metadata.name`
    pub name: String,
    /// Explicit namespace, overrides `value.metadata.namespace`
    pub namespace: String,
    /// Payload
    pub value: Option<Payload>,
}

impl Resource {
    /// Envelope around `value` under an explicit kind
    pub fn new(kind: impl Into<String>, value: impl Into<Payload>) -> Self {
        Self {
            kind: kind.into(),
            value: Some(value.into()),
            ..Default::default()
        }
    }

    /// Envelope around a typed payload, using its own kind
    pub fn of<T: KindPayload>(value: T) -> Self {
        Self::new(T::KIND, value)
    }

    /// Address a cluster-scoped object by name
    pub fn named(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Address a namespaced object by namespace and name
    pub fn namespaced(
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            namespace: namespace.into(),
            value: None,
        }
    }

    /// Effective name: the envelope's, else the payload's
    pub fn resolved_name(&self) -> Option<&str> {
        if !self.name.is_empty() {
            return Some(self.name.as_str());
        }
        self.value
            .as_ref()
            .map(|v| v.metadata().name.as_str())
            .filter(|n| !n.is_empty())
    }

    /// Effective namespace: the envelope's, else the payload's, else "default"
    pub fn resolved_namespace(&self) -> &str {
        if !self.namespace.is_empty() {
            return &self.namespace;
        }
        self.value
            .as_ref()
            .map(|v| v.metadata().namespace.as_str())
            .filter(|ns| !ns.is_empty())
            .unwrap_or(DEFAULT_NAMESPACE)
    }

    /// Borrow the payload as a concrete type
    pub fn payload<T: KindPayload>(&self) -> Option<&T> {
        self.value.as_ref().and_then(T::from_payload)
    }

    /// Take the payload as a concrete type
    pub fn into_payload<T: KindPayload>(self) -> Option<T> {
        self.value.and_then(T::try_from_payload)
    }
}
