//! Connector over a kube-rs client
//!
//! Raw requests go through `Client::send` so the response status and body
//! come back untouched; the generic client does its own status mapping.
//! Credentials come from whatever `kube::Config::infer` finds: the local
//! kubeconfig during development, the service-account mount in a pod.

use async_trait::async_trait;
use http::Request;
use kube::client::Body;
use kube::Client;
use meridian_common::{Error, TransportReason};

use super::{ApiRequest, ApiResponse, Connector};

/// [`Connector`] backed by a [`kube::Client`]
#[derive(Clone)]
pub struct KubeConnector {
    client: Client,
}

impl KubeConnector {
    /// Wrap an existing client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the ambient kubeconfig or in-cluster environment
    pub async fn infer() -> Result<Self, Error> {
        meridian_common::tls::install_crypto_provider();
        let client = Client::try_default()
            .await
            .map_err(|e| Error::config(format!("failed to create kube client: {e}")))?;
        Ok(Self::new(client))
    }
}

fn transport_error(e: kube::Error) -> Error {
    let reason = match &e {
        kube::Error::HyperError(_) | kube::Error::Service(_) => TransportReason::Connect,
        _ => TransportReason::Protocol,
    };
    Error::transport(reason, e.to_string())
}

#[async_trait]
impl Connector for KubeConnector {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, Error> {
        let mut builder = Request::builder()
            .method(request.method.clone())
            .uri(request.uri())
            .header(http::header::ACCEPT, super::CONTENT_TYPE_JSON);
        if request.body.is_some() {
            builder = builder.header(http::header::CONTENT_TYPE, request.content_type);
        }
        let http_request = builder
            .body(Body::from(request.body.unwrap_or_default()))
            .map_err(|e| Error::validation(format!("failed to build request: {e}")))?;

        let response = self.client.send(http_request).await.map_err(transport_error)?;
        let status = response.status().as_u16();
        let body = response
            .into_body()
            .collect_bytes()
            .await
            .map_err(|e| {
                Error::transport(
                    TransportReason::Protocol,
                    format!("failed to read response: {e}"),
                )
            })?;
        Ok(ApiResponse {
            status,
            body: body.to_vec(),
        })
    }
}
