//! Workload payloads: Deployment and Pod
//!
//! These mirror the subset of the `apps/v1` and `v1` shapes a service needs:
//! image, command, env, ports and replica count. Fields the control plane
//! defaults (strategy, restartPolicy, ...) are left to the server and ignored
//! on decode.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{LabelSelector, LocalObjectReference, Metadata};

/// Label carrying the service name on workloads and their pods
pub const LABEL_NAME: &str = "name";

/// Label carrying the service version on workloads and their pods
pub const LABEL_VERSION: &str = "version";

// =============================================================================
// Deployment
// =============================================================================

/// Kubernetes Deployment
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    /// Metadata
    pub metadata: Metadata,
    /// Spec
    pub spec: DeploymentSpec,
    /// Server-reported rollout status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<DeploymentStatus>,
}

/// Deployment spec
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentSpec {
    /// Number of replicas
    #[serde(default)]
    pub replicas: u32,
    /// Label selector
    pub selector: LabelSelector,
    /// Pod template
    pub template: PodTemplateSpec,
}

/// Deployment status (read-only)
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentStatus {
    /// Total pods targeted by this deployment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<u32>,
    /// Pods with a Ready condition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready_replicas: Option<u32>,
    /// Pods available for at least minReadySeconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_replicas: Option<u32>,
}

/// Pod template spec
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PodTemplateSpec {
    /// Pod metadata
    #[serde(default)]
    pub metadata: PodMeta,
    /// Pod spec
    pub spec: PodSpec,
}

/// Pod template metadata (subset of ObjectMeta)
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PodMeta {
    /// Labels
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    /// Annotations
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl Deployment {
    /// Build a single-container deployment for a service
    ///
    /// The service name and version become labels on the deployment, its
    /// selector and its pods.
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        version: impl Into<String>,
        container: Container,
    ) -> Self {
        let name = name.into();
        let version = version.into();
        let labels = BTreeMap::from([
            (LABEL_NAME.to_string(), name.clone()),
            (LABEL_VERSION.to_string(), version),
        ]);
        let mut metadata = Metadata::namespaced(name, namespace);
        metadata.labels = labels.clone();
        Self {
            metadata,
            spec: DeploymentSpec {
                replicas: 1,
                selector: LabelSelector::matching(labels.clone()),
                template: PodTemplateSpec {
                    metadata: PodMeta {
                        labels,
                        annotations: BTreeMap::new(),
                    },
                    spec: PodSpec {
                        containers: vec![container],
                        ..Default::default()
                    },
                },
            },
            status: None,
        }
    }

    /// Set the replica count
    pub fn with_replicas(mut self, replicas: u32) -> Self {
        self.spec.replicas = replicas;
        self
    }

    /// True when every desired replica reports ready
    pub fn is_ready(&self) -> bool {
        let ready = self
            .status
            .as_ref()
            .and_then(|s| s.ready_replicas)
            .unwrap_or(0);
        ready >= self.spec.replicas
    }
}

// =============================================================================
// Pod
// =============================================================================

/// Kubernetes Pod
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Pod {
    /// Metadata
    pub metadata: Metadata,
    /// Spec
    pub spec: PodSpec,
    /// Server-reported status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PodStatus>,
}

/// Pod spec
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PodSpec {
    /// Containers
    #[serde(default)]
    pub containers: Vec<Container>,
    /// Service account the pod runs as
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_name: Option<String>,
    /// Image pull secrets for private registries
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_pull_secrets: Vec<LocalObjectReference>,
}

/// Pod status
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PodStatus {
    /// Pending, Running, Succeeded, Failed or Unknown
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    /// Pod IP once assigned
    #[serde(rename = "podIP", default, skip_serializing_if = "Option::is_none")]
    pub pod_ip: Option<String>,
}

impl Pod {
    /// Phase reported by the control plane
    pub fn phase(&self) -> Option<&str> {
        self.status.as_ref().and_then(|s| s.phase.as_deref())
    }
}

// =============================================================================
// Container
// =============================================================================

/// Container spec
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    /// Container name
    pub name: String,
    /// Image reference
    #[serde(default)]
    pub image: String,
    /// Entrypoint override
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    /// Arguments to the entrypoint
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// Environment variables
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
    /// Exposed ports
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<ContainerPort>,
    /// Always, IfNotPresent or Never
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_pull_policy: Option<String>,
}

impl Container {
    /// Container running `image`
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            ..Default::default()
        }
    }

    /// Override the entrypoint
    pub fn with_command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = command.into_iter().map(Into::into).collect();
        self
    }

    /// Add an environment variable
    pub fn with_env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push(EnvVar {
            name: name.into(),
            value: Some(value.into()),
        });
        self
    }

    /// Expose a TCP port
    pub fn with_port(mut self, name: impl Into<String>, port: u16) -> Self {
        self.ports.push(ContainerPort {
            name: Some(name.into()),
            container_port: port,
            protocol: None,
        });
        self
    }
}

/// Environment variable
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnvVar {
    /// Variable name
    pub name: String,
    /// Literal value; absent when sourced from `valueFrom`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Container port
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContainerPort {
    /// Port name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Port number
    pub container_port: u16,
    /// TCP, UDP or SCTP
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Deployment {
        Deployment::new(
            "greeter",
            "shop",
            "v1",
            Container::new("greeter", "registry.local/greeter:1.0")
                .with_command(["/greeter", "--server"])
                .with_env("MICRO_SERVER_ADDRESS", ":8080")
                .with_port("http", 8080),
        )
    }

    #[test]
    fn labels_flow_to_selector_and_template() {
        let deployment = sample();
        assert_eq!(deployment.metadata.labels.get(LABEL_NAME).unwrap(), "greeter");
        assert_eq!(
            deployment.spec.selector.match_labels,
            deployment.spec.template.metadata.labels
        );
        assert_eq!(deployment.spec.replicas, 1);
    }

    #[test]
    fn encodes_camel_case_fields() {
        let value = serde_json::to_value(sample().with_replicas(3)).unwrap();
        assert_eq!(value["spec"]["replicas"], json!(3));
        assert_eq!(
            value["spec"]["template"]["spec"]["containers"][0]["ports"][0],
            json!({"name": "http", "containerPort": 8080})
        );
        assert!(value.get("status").is_none());
    }

    #[test]
    fn readiness_follows_status() {
        let mut deployment = sample().with_replicas(2);
        assert!(!deployment.is_ready());
        deployment.status = Some(DeploymentStatus {
            replicas: Some(2),
            ready_replicas: Some(2),
            available_replicas: Some(2),
        });
        assert!(deployment.is_ready());
    }

    #[test]
    fn pod_phase_from_server() {
        let pod: Pod = serde_json::from_value(json!({
            "metadata": {"name": "greeter-abc", "namespace": "shop"},
            "spec": {"containers": [{"name": "greeter", "image": "x"}], "restartPolicy": "Always"},
            "status": {"phase": "Running", "podIP": "10.0.0.7"}
        }))
        .unwrap();
        assert_eq!(pod.phase(), Some("Running"));
    }
}
