//! Secret and ServiceAccount payloads

use std::collections::BTreeMap;

use k8s_openapi::ByteString;
use serde::{Deserialize, Serialize};

use super::{LocalObjectReference, Metadata};

/// Secret type for arbitrary user data
pub const SECRET_TYPE_OPAQUE: &str = "Opaque";

/// Secret type for registry credentials
pub const SECRET_TYPE_DOCKER_CONFIG_JSON: &str = "kubernetes.io/dockerconfigjson";

/// Kubernetes Secret
///
/// Values are raw bytes in memory and base64 on the wire.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Secret {
    /// Metadata
    pub metadata: Metadata,
    /// Secret type
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    /// Secret data
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, ByteString>,
}

impl Secret {
    /// Opaque secret with no data
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            metadata: Metadata::namespaced(name, namespace),
            type_: Some(SECRET_TYPE_OPAQUE.to_string()),
            data: BTreeMap::new(),
        }
    }

    /// Add a value
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.data.insert(key.into(), ByteString(value.into()));
        self
    }

    /// Read a value
    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.data.get(key).map(|v| v.0.as_slice())
    }
}

/// Kubernetes ServiceAccount
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAccount {
    /// Metadata
    pub metadata: Metadata,
    /// Secrets used to pull images for pods running as this account
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_pull_secrets: Vec<LocalObjectReference>,
}

impl ServiceAccount {
    /// Service account in `namespace`
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            metadata: Metadata::namespaced(name, namespace),
            image_pull_secrets: Vec::new(),
        }
    }

    /// Reference a registry credential secret
    pub fn with_image_pull_secret(mut self, secret: impl Into<String>) -> Self {
        self.image_pull_secrets.push(LocalObjectReference {
            name: secret.into(),
        });
        self
    }
}
