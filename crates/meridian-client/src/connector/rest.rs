//! Connector over a plain HTTPS client (reqwest)
//!
//! Used when the runtime is given an explicit endpoint, or when it runs
//! inside a pod and reads the service-account mount directly.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use meridian_common::{
    Error, TransportReason, SERVICE_ACCOUNT_CA_PATH, SERVICE_ACCOUNT_TOKEN_PATH,
};
use serde::{Deserialize, Serialize};

use super::{ApiRequest, ApiResponse, Connector};

/// Default per-request timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Endpoint, credential and TLS settings for [`HttpConnector`]
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorConfig {
    /// Base URL of the API server, e.g. `https://10.96.0.1:443`
    pub server: String,
    /// Bearer token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// File holding the bearer token; read once at construction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_file: Option<PathBuf>,
    /// PEM bundle to verify the server with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_file: Option<PathBuf>,
    /// Inline PEM bundle, used when `ca_file` is unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_pem: Option<String>,
    /// Skip server certificate verification (development only)
    #[serde(default)]
    pub insecure_skip_tls_verify: bool,
    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            server: String::new(),
            token: None,
            token_file: None,
            ca_file: None,
            ca_pem: None,
            insecure_skip_tls_verify: false,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ConnectorConfig {
    /// Config for `server` with no credential and the default timeout
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            ..Default::default()
        }
    }

    /// Config for a pod talking to its own cluster
    ///
    /// Reads `KUBERNETES_SERVICE_HOST`/`KUBERNETES_SERVICE_PORT` and points the
    /// credential at the service-account mount.
    pub fn in_cluster() -> Result<Self, Error> {
        let host = std::env::var("KUBERNETES_SERVICE_HOST").map_err(|_| {
            Error::config("KUBERNETES_SERVICE_HOST is not set; not running in a cluster?")
        })?;
        let port = std::env::var("KUBERNETES_SERVICE_PORT").unwrap_or_else(|_| "443".to_string());
        Ok(Self::in_cluster_at(&host, &port))
    }

    fn in_cluster_at(host: &str, port: &str) -> Self {
        let host = if host.contains(':') {
            format!("[{host}]")
        } else {
            host.to_string()
        };
        Self {
            token_file: Some(PathBuf::from(SERVICE_ACCOUNT_TOKEN_PATH)),
            ca_file: Some(PathBuf::from(SERVICE_ACCOUNT_CA_PATH)),
            ..Self::new(format!("https://{host}:{port}"))
        }
    }

    /// Set a literal bearer token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Resolve the bearer token, reading `token_file` if set
    fn load_token(&self) -> Result<Option<String>, Error> {
        let token = match (&self.token, &self.token_file) {
            (Some(token), _) => token.trim().to_string(),
            (None, Some(path)) => read_file(path, "token")?.trim().to_string(),
            (None, None) => return Ok(None),
        };
        if token.is_empty() {
            return Err(Error::config("bearer token is empty"));
        }
        Ok(Some(token))
    }

    /// Resolve every certificate in the CA bundle, reading `ca_file` if set
    fn load_ca(&self) -> Result<Vec<reqwest::Certificate>, Error> {
        let pem = match (&self.ca_file, &self.ca_pem) {
            (Some(path), _) => read_file(path, "CA bundle")?,
            (None, Some(pem)) => pem.clone(),
            (None, None) => return Ok(Vec::new()),
        };
        if !pem.contains("-----BEGIN CERTIFICATE-----") {
            return Err(Error::config("CA bundle contains no PEM certificate"));
        }
        let certs = reqwest::Certificate::from_pem_bundle(pem.as_bytes())
            .map_err(|e| Error::config(format!("invalid CA bundle: {e}")))?;
        if certs.is_empty() {
            return Err(Error::config("CA bundle contains no PEM certificate"));
        }
        Ok(certs)
    }
}

fn read_file(path: &Path, what: &str) -> Result<String, Error> {
    std::fs::read_to_string(path)
        .map_err(|e| Error::config(format!("failed to read {what} from {}: {e}", path.display())))
}

/// [`Connector`] over reqwest with bearer auth
#[derive(Clone, Debug)]
pub struct HttpConnector {
    http: reqwest::Client,
    base: String,
    token: Option<String>,
}

impl HttpConnector {
    /// Build a connector, loading credential material once
    pub fn new(config: &ConnectorConfig) -> Result<Self, Error> {
        let url = reqwest::Url::parse(&config.server)
            .map_err(|e| Error::config(format!("invalid server URL {:?}: {e}", config.server)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::config(format!(
                "unsupported server URL scheme: {}",
                url.scheme()
            )));
        }

        let token = config.load_token()?;

        meridian_common::tls::install_crypto_provider();
        let mut builder = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(Duration::from_secs(config.timeout_secs));
        for ca in config.load_ca()? {
            builder = builder.add_root_certificate(ca);
        }
        if config.insecure_skip_tls_verify {
            builder = builder.danger_accept_invalid_certs(true);
        }
        let http = builder
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base: config.server.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Connector for the cluster this process runs in
    pub fn in_cluster() -> Result<Self, Error> {
        Self::new(&ConnectorConfig::in_cluster()?)
    }
}

fn transport_error(e: reqwest::Error) -> Error {
    let reason = if e.is_timeout() {
        TransportReason::Timeout
    } else if e.is_connect() {
        TransportReason::Connect
    } else {
        TransportReason::Protocol
    };
    Error::transport(reason, e.to_string())
}

#[async_trait]
impl Connector for HttpConnector {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, Error> {
        let url = format!("{}{}", self.base, request.uri());
        let mut builder = self
            .http
            .request(request.method, url)
            .header(reqwest::header::ACCEPT, super::CONTENT_TYPE_JSON);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = request.body {
            builder = builder
                .header(reqwest::header::CONTENT_TYPE, request.content_type)
                .body(body);
        }

        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(transport_error)?;
        Ok(ApiResponse {
            status,
            body: body.to_vec(),
        })
    }
}
