//! Namespace payload

use serde::{Deserialize, Serialize};

use super::Metadata;

/// Phase reported for a namespace that accepts new resources
pub const PHASE_ACTIVE: &str = "Active";

/// Phase reported while a namespace and its contents are being deleted
pub const PHASE_TERMINATING: &str = "Terminating";

/// Isolation boundary for all namespaced resources of one tenant
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Namespace {
    /// Metadata; only `name` is meaningful
    pub metadata: Metadata,
    /// Server-reported status, absent on freshly built values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<NamespaceStatus>,
}

/// Namespace status
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NamespaceStatus {
    /// "Active" or "Terminating"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
}

impl Namespace {
    /// Build a namespace with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            metadata: Metadata::new(name),
            status: None,
        }
    }

    /// Phase reported by the control plane, if any
    pub fn phase(&self) -> Option<&str> {
        self.status.as_ref().and_then(|s| s.phase.as_deref())
    }

    /// True once the control plane reports the namespace as Active
    pub fn is_active(&self) -> bool {
        self.phase() == Some(PHASE_ACTIVE)
    }
}
