//! Runtime configuration
//!
//! Everything the runtime needs is passed in explicitly; nothing is read from
//! process-wide defaults. A config is usually loaded from YAML:
//!
//! ```yaml
//! connector:
//!   mode: explicit
//!   server: https://10.96.0.1:443
//!   tokenFile: /var/run/secrets/kubernetes.io/serviceaccount/token
//!   caFile: /var/run/secrets/kubernetes.io/serviceaccount/ca.crt
//! fieldManager: meridian
//! defaultIsolation:
//!   allowedLabels:
//!     app.kubernetes.io/managed-by: meridian
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use meridian_client::ConnectorConfig;
use meridian_common::Error;
use serde::{Deserialize, Serialize};

/// Where the runtime gets its control-plane connection from
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ConnectorSource {
    /// Service-account mount and `KUBERNETES_SERVICE_*` env of the pod
    #[default]
    InCluster,
    /// Local kubeconfig or in-cluster inference through kube-rs
    Kubeconfig,
    /// Endpoint and credential given in full
    Explicit(ConnectorConfig),
}

/// Ingress isolation applied to namespaces
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IsolationConfig {
    /// Labels a source namespace must carry to be allowed in; empty denies all
    #[serde(default)]
    pub allowed_labels: BTreeMap<String, String>,
}

/// Configuration for [`crate::Runtime::from_config`]
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Control-plane connection
    #[serde(default)]
    pub connector: ConnectorSource,
    /// Field manager recorded on create and update
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_manager: Option<String>,
    /// Isolation installed in every namespace the runtime creates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_isolation: Option<IsolationConfig>,
}

impl RuntimeConfig {
    /// Parse a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self, Error> {
        serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("invalid runtime config: {e}")))
    }

    /// Read and parse a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("failed to read runtime config {}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&content)
    }
}
