//! Transport to the control-plane API
//!
//! A [`Connector`] moves one HTTP exchange to the API server and back. It
//! knows nothing about kinds or status semantics: non-2xx responses are
//! returned as-is and only failures to complete the exchange become errors
//! (always [`Error::Transport`]). Credentials and TLS are resolved once when a
//! connector is built, so a broken configuration fails there and not on the
//! first call.

mod kube_client;
mod rest;

use async_trait::async_trait;
use meridian_common::Error;
#[cfg(test)]
use mockall::automock;

pub use kube_client::KubeConnector;
pub use rest::{ConnectorConfig, HttpConnector};

/// Content type for full-object bodies
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Content type for JSON merge patches
pub const CONTENT_TYPE_MERGE_PATCH: &str = "application/merge-patch+json";

/// One request to the API server
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// HTTP method
    pub method: http::Method,
    /// Absolute API path, e.g. `/api/v1/namespaces/foobar`
    pub path: String,
    /// Query parameters, unencoded
    pub query: Vec<(String, String)>,
    /// Request body
    pub body: Option<Vec<u8>>,
    /// Content type of `body`
    pub content_type: &'static str,
}

impl ApiRequest {
    /// Request without a body
    pub fn new(method: http::Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            content_type: CONTENT_TYPE_JSON,
        }
    }

    /// Attach a body
    pub fn with_body(mut self, body: Vec<u8>, content_type: &'static str) -> Self {
        self.body = Some(body);
        self.content_type = content_type;
        self
    }

    /// Add a query parameter
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Path plus encoded query string
    pub fn uri(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let query = self
            .query
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", self.path, query)
    }
}

/// Raw response from the API server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: Vec<u8>,
}

impl ApiResponse {
    /// True for 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Executes API requests against a control plane
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Connector: Send + Sync {
    /// Send `request` and return whatever the server answered
    ///
    /// Errors only when no response was received.
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, Error>;
}
