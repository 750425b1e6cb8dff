//! Error types for Meridian control-plane operations
//!
//! Errors are classified by where the failure happened: the transport never
//! reached the API server, the API server rejected the request, or the client
//! refused to issue the request at all. Each variant carries enough context
//! (kind, namespace, name, HTTP status) to log it without re-deriving anything.

use std::fmt;

use thiserror::Error;

/// Why a call failed before a response was received
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportReason {
    /// Connection could not be established (DNS, refused, TLS handshake)
    Connect,
    /// The call exceeded its deadline
    Timeout,
    /// The caller cancelled the call
    Cancelled,
    /// The connection broke or the response could not be read
    Protocol,
}

impl fmt::Display for TransportReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Connect => "connect",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
            Self::Protocol => "protocol",
        };
        f.write_str(s)
    }
}

/// Main error type for Meridian operations
#[derive(Debug, Error)]
pub enum Error {
    /// The control plane could not be reached or the call did not complete
    #[error("transport error ({reason}): {message}")]
    Transport {
        /// Failure class
        reason: TransportReason,
        /// Description of what failed
        message: String,
    },

    /// Credential missing, invalid or insufficient
    #[error("auth error{}: {message}", status.map(|s| format!(" [{s}]")).unwrap_or_default())]
    Auth {
        /// HTTP status when the control plane rejected the credential
        status: Option<u16>,
        /// Description of what failed
        message: String,
    },

    /// Client construction failed because configuration was unusable
    #[error("configuration error: {message}")]
    Config {
        /// Description of what's wrong
        message: String,
    },

    /// No codec or path template is registered for the kind
    #[error("unsupported resource kind: {kind}")]
    UnsupportedKind {
        /// The requested kind discriminator
        kind: String,
    },

    /// The control plane reports that the target does not exist
    #[error("{kind} {} not found: {message}", qualified(namespace, name))]
    NotFound {
        /// Resource kind
        kind: String,
        /// Namespace, empty for cluster-scoped kinds
        namespace: String,
        /// Resource name
        name: String,
        /// Message returned by the control plane
        message: String,
    },

    /// The control plane reports a create conflict
    #[error("{kind} {} already exists: {message}", qualified(namespace, name))]
    AlreadyExists {
        /// Resource kind
        kind: String,
        /// Namespace, empty for cluster-scoped kinds
        namespace: String,
        /// Resource name
        name: String,
        /// Message returned by the control plane
        message: String,
    },

    /// Any other non-2xx response, carried verbatim
    #[error("control plane error [{status} {reason}]: {message}")]
    ControlPlane {
        /// HTTP status code
        status: u16,
        /// Machine-readable reason (e.g. "Invalid", "Forbidden")
        reason: String,
        /// Human-readable message
        message: String,
    },

    /// Encoding or decoding a resource failed
    #[error("serialization error{}: {message}", kind.as_ref().map(|k| format!(" for {k}")).unwrap_or_default())]
    Serialization {
        /// The resource kind being processed (if known)
        kind: Option<String>,
        /// Description of what failed
        message: String,
    },

    /// The request was malformed before it reached the wire
    #[error("validation error{}: {message}", field.as_ref().map(|f| format!(" at {f}")).unwrap_or_default())]
    Validation {
        /// Field path that failed validation (e.g. "metadata.name")
        field: Option<String>,
        /// Description of what's invalid
        message: String,
    },
}

fn qualified(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{namespace}/{name}")
    }
}

impl Error {
    /// Create a transport error
    pub fn transport(reason: TransportReason, msg: impl Into<String>) -> Self {
        Self::Transport {
            reason,
            message: msg.into(),
        }
    }

    /// Create a transport error for a call the caller cancelled
    pub fn cancelled() -> Self {
        Self::transport(TransportReason::Cancelled, "call cancelled by caller")
    }

    /// Create an auth error for unusable credential material
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth {
            status: None,
            message: msg.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create an unsupported-kind error
    pub fn unsupported_kind(kind: impl Into<String>) -> Self {
        Self::UnsupportedKind { kind: kind.into() }
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            kind: None,
            message: msg.into(),
        }
    }

    /// Create a serialization error with resource kind context
    pub fn serialization_for_kind(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Serialization {
            kind: Some(kind.into()),
            message: msg.into(),
        }
    }

    /// Create a validation error with the given message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            field: None,
            message: msg.into(),
        }
    }

    /// Create a validation error for a specific field path
    pub fn validation_for_field(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Validation {
            field: Some(field.into()),
            message: msg.into(),
        }
    }

    /// True if the control plane reported the target missing
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// True if the control plane reported a create conflict
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Error::AlreadyExists { .. })
    }

    /// True if the call never produced a response
    ///
    /// The outcome of a mutating call that failed this way is unknown: the
    /// control plane may have applied it. Re-query before retrying a create.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport { .. })
    }

    /// HTTP status reported by the control plane, if the error came from one
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::NotFound { .. } => Some(404),
            Error::AlreadyExists { .. } => Some(409),
            Error::ControlPlane { status, .. } => Some(*status),
            Error::Auth { status, .. } => *status,
            _ => None,
        }
    }

    /// True if the error was raised locally, before any request was sent
    pub fn is_client_side(&self) -> bool {
        matches!(
            self,
            Error::Config { .. }
                | Error::UnsupportedKind { .. }
                | Error::Serialization { .. }
                | Error::Validation { .. }
        )
    }
}
