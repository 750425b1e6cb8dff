//! Common types for Meridian: errors, telemetry and TLS setup

#![deny(missing_docs)]

pub mod error;
pub mod telemetry;
pub mod tls;

pub use error::{Error, TransportReason};

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Path of the mounted service account bearer token
pub const SERVICE_ACCOUNT_TOKEN_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";

/// Path of the mounted cluster CA certificate bundle
pub const SERVICE_ACCOUNT_CA_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/ca.crt";

/// Namespace used for namespaced resources that don't name one
pub const DEFAULT_NAMESPACE: &str = "default";

/// Label key identifying the component that manages a resource
pub const LABEL_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

/// Value of [`LABEL_MANAGED_BY`] for resources created by Meridian
pub const LABEL_MANAGED_BY_MERIDIAN: &str = "meridian";
