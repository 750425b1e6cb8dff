//! Default-deny ingress NetworkPolicy
//!
//! The payload is deliberately narrow: a namespace plus the set of labels a
//! source namespace must carry to be allowed in. It is mapped onto the native
//! `networking.k8s.io/v1` shape on the wire:
//!
//! ```yaml
//! spec:
//!   podSelector: {}            # every pod in the namespace
//!   policyTypes: [Ingress]
//!   ingress:
//!   - from:
//!     - namespaceSelector:
//!         matchLabels: <allowedLabels>
//! ```
//!
//! Empty `allowedLabels` produces `ingress: []`, which denies all ingress.
//! An empty `matchLabels` selector would instead allow every namespace. The
//! empty list is always sent so a merge patch clears an earlier allow rule.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{LabelSelector, Metadata};

/// Name used for the isolation policy created per namespace
pub const DEFAULT_POLICY_NAME: &str = "ingress";

const POLICY_TYPE_INGRESS: &str = "Ingress";

/// Ingress restriction for all workloads in a namespace
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "wire::NetworkPolicy", into = "wire::NetworkPolicy")]
pub struct NetworkPolicy {
    /// Metadata, scoped to the protected namespace
    pub metadata: Metadata,
    /// Labels a source namespace must carry to be allowed in
    pub allowed_labels: BTreeMap<String, String>,
}

impl NetworkPolicy {
    /// Build a policy named `name` in `namespace`
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        allowed_labels: BTreeMap<String, String>,
    ) -> Self {
        Self {
            metadata: Metadata::namespaced(name, namespace),
            allowed_labels,
        }
    }

    /// The isolation policy installed when a namespace is isolated
    pub fn default_deny(
        namespace: impl Into<String>,
        allowed_labels: BTreeMap<String, String>,
    ) -> Self {
        Self::new(DEFAULT_POLICY_NAME, namespace, allowed_labels)
    }

    /// Allow one more source label
    pub fn allow(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.allowed_labels.insert(key.into(), value.into());
        self
    }
}

mod wire {
    use serde::{Deserialize, Serialize};

    use super::{LabelSelector, Metadata, POLICY_TYPE_INGRESS};

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct NetworkPolicy {
        pub metadata: Metadata,
        #[serde(default)]
        pub spec: Spec,
    }

    #[derive(Clone, Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Spec {
        #[serde(default)]
        pub pod_selector: LabelSelector,
        #[serde(default)]
        pub ingress: Vec<IngressRule>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        pub policy_types: Vec<String>,
    }

    #[derive(Clone, Debug, Default, Serialize, Deserialize)]
    pub struct IngressRule {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        pub from: Vec<Peer>,
    }

    #[derive(Clone, Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Peer {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub namespace_selector: Option<LabelSelector>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub pod_selector: Option<LabelSelector>,
    }

    impl From<super::NetworkPolicy> for NetworkPolicy {
        fn from(policy: super::NetworkPolicy) -> Self {
            let ingress = if policy.allowed_labels.is_empty() {
                Vec::new()
            } else {
                vec![IngressRule {
                    from: vec![Peer {
                        namespace_selector: Some(LabelSelector::matching(policy.allowed_labels)),
                        pod_selector: None,
                    }],
                }]
            };
            Self {
                metadata: policy.metadata,
                spec: Spec {
                    pod_selector: LabelSelector::default(),
                    ingress,
                    policy_types: vec![POLICY_TYPE_INGRESS.to_string()],
                },
            }
        }
    }

    impl From<NetworkPolicy> for super::NetworkPolicy {
        fn from(wire: NetworkPolicy) -> Self {
            let allowed_labels = wire
                .spec
                .ingress
                .into_iter()
                .flat_map(|rule| rule.from)
                .find_map(|peer| peer.namespace_selector)
                .map(|selector| selector.match_labels)
                .unwrap_or_default();
            Self {
                metadata: wire.metadata,
                allowed_labels,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn owner_test() -> BTreeMap<String, String> {
        BTreeMap::from([("owner".to_string(), "test".to_string())])
    }

    #[test]
    fn encodes_native_ingress_selector() {
        let policy = NetworkPolicy::new("ingress", "baz", owner_test());
        let value = serde_json::to_value(&policy).unwrap();
        assert_eq!(
            value,
            json!({
                "metadata": {"name": "ingress", "namespace": "baz"},
                "spec": {
                    "podSelector": {},
                    "policyTypes": ["Ingress"],
                    "ingress": [{"from": [{"namespaceSelector": {"matchLabels": {"owner": "test"}}}]}]
                }
            })
        );
    }

    #[test]
    fn empty_allowed_labels_denies_everything() {
        let policy = NetworkPolicy::default_deny("baz", BTreeMap::new());
        let value = serde_json::to_value(&policy).unwrap();
        assert_eq!(value["spec"]["ingress"], json!([]));
        assert_eq!(value["spec"]["policyTypes"], json!(["Ingress"]));
        assert_eq!(policy.metadata.name, DEFAULT_POLICY_NAME);
    }

    #[test]
    fn decodes_server_response() {
        let policy: NetworkPolicy = serde_json::from_value(json!({
            "apiVersion": "networking.k8s.io/v1",
            "kind": "NetworkPolicy",
            "metadata": {"name": "ingress", "namespace": "baz", "generation": 1},
            "spec": {
                "podSelector": {},
                "policyTypes": ["Ingress"],
                "ingress": [{"from": [{"namespaceSelector": {"matchLabels": {"owner": "test"}}}]}]
            }
        }))
        .unwrap();
        assert_eq!(policy, NetworkPolicy::new("ingress", "baz", owner_test()));
    }

    #[test]
    fn allow_adds_labels() {
        let policy = NetworkPolicy::default_deny("baz", BTreeMap::new())
            .allow("owner", "test")
            .allow("team", "platform");
        assert_eq!(policy.allowed_labels.len(), 2);
    }
}
