//! Service payload

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use serde::{Deserialize, Serialize};

use super::Metadata;

/// Kubernetes Service
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    /// Metadata
    pub metadata: Metadata,
    /// Spec
    pub spec: ServiceSpec,
}

/// Service spec
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSpec {
    /// Pod selector
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub selector: BTreeMap<String, String>,
    /// Ports
    #[serde(default)]
    pub ports: Vec<ServicePort>,
    /// ClusterIP, NodePort or LoadBalancer
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    /// Allocated cluster IP (server-assigned)
    #[serde(rename = "clusterIP", default, skip_serializing_if = "Option::is_none")]
    pub cluster_ip: Option<String>,
}

/// Service port
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServicePort {
    /// Port name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Port number
    pub port: u16,
    /// Target container port, by number or name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_port: Option<IntOrString>,
    /// TCP, UDP or SCTP
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
}

impl Service {
    /// Service selecting pods labelled `name=<name>`
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        let name = name.into();
        let selector = BTreeMap::from([(super::workload::LABEL_NAME.to_string(), name.clone())]);
        let mut metadata = Metadata::namespaced(name, namespace);
        metadata.labels = selector.clone();
        Self {
            metadata,
            spec: ServiceSpec {
                selector,
                ..Default::default()
            },
        }
    }

    /// Expose `port`, forwarding to the same port on the pods
    pub fn with_port(mut self, name: impl Into<String>, port: u16) -> Self {
        self.spec.ports.push(ServicePort {
            name: Some(name.into()),
            port,
            target_port: Some(IntOrString::Int(i32::from(port))),
            protocol: Some("TCP".to_string()),
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn target_port_accepts_names() {
        let service: Service = serde_json::from_value(json!({
            "metadata": {"name": "greeter", "namespace": "shop"},
            "spec": {
                "selector": {"name": "greeter"},
                "ports": [{"name": "http", "port": 80, "targetPort": "http", "protocol": "TCP"}],
                "type": "ClusterIP",
                "clusterIP": "10.96.0.12",
                "sessionAffinity": "None"
            }
        }))
        .unwrap();
        assert_eq!(
            service.spec.ports[0].target_port,
            Some(IntOrString::String("http".to_string()))
        );
        assert_eq!(service.spec.cluster_ip.as_deref(), Some("10.96.0.12"));
    }

    #[test]
    fn builder_selects_service_pods() {
        let service = Service::new("greeter", "shop").with_port("grpc", 8080);
        let value = serde_json::to_value(&service).unwrap();
        assert_eq!(value["spec"]["selector"], json!({"name": "greeter"}));
        assert_eq!(value["spec"]["ports"][0]["targetPort"], json!(8080));
    }
}
