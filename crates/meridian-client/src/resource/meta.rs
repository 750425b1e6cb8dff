//! Metadata shared by every resource payload

use std::collections::BTreeMap;

use meridian_common::Error;
use serde::{Deserialize, Serialize};

/// Maximum length of an RFC 1123 DNS label
const MAX_LABEL_LEN: usize = 63;

/// Kubernetes object metadata, reduced to the fields Meridian writes.
///
/// Server-populated fields (uid, resourceVersion, managedFields, ...) are
/// dropped on decode. Maps are ordered so encoding is deterministic.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Resource name
    pub name: String,
    /// Namespace scope, empty for cluster-scoped resources
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    /// Labels used for selection
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    /// Informational annotations
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl Metadata {
    /// Metadata for a cluster-scoped resource
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Metadata for a resource inside `namespace`
    pub fn namespaced(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    /// Add a label
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Add an annotation
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }
}

/// Validate an RFC 1123 label: lowercase alphanumerics and '-', starting and
/// ending with an alphanumeric, at most 63 characters.
pub fn validate_dns_label(field: &str, value: &str) -> Result<(), Error> {
    if value.is_empty() {
        return Err(Error::validation_for_field(field, "must not be empty"));
    }
    if value.len() > MAX_LABEL_LEN {
        return Err(Error::validation_for_field(
            field,
            format!("'{value}' is longer than {MAX_LABEL_LEN} characters"),
        ));
    }
    let valid_chars = value
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-');
    let alnum = |b: u8| b.is_ascii_lowercase() || b.is_ascii_digit();
    let bytes = value.as_bytes();
    if !valid_chars || !alnum(bytes[0]) || !alnum(bytes[bytes.len() - 1]) {
        return Err(Error::validation_for_field(
            field,
            format!(
                "'{value}' must consist of lowercase alphanumerics or '-', and start and end with an alphanumeric"
            ),
        ));
    }
    Ok(())
}

/// Label selector (equality-based only)
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelector {
    /// Labels that must all match
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub match_labels: BTreeMap<String, String>,
}

impl LabelSelector {
    /// Selector matching the given labels
    pub fn matching(labels: BTreeMap<String, String>) -> Self {
        Self {
            match_labels: labels,
        }
    }
}

/// Reference to another object in the same namespace by name
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LocalObjectReference {
    /// Name of the referent
    pub name: String,
}
