//! Shared setup for kind tests

use std::process::Command;
use std::sync::Arc;
use std::time::Duration;

use kube::Client;
use meridian::client::{KubeConnector, ResourceClient};
use meridian::runtime::Runtime;

/// Name of the kind cluster the tests run against
pub const TEST_CLUSTER_NAME: &str = "meridian-integration-test";

/// Make sure the kind cluster exists and return a client for it
pub async fn ensure_test_cluster() -> Result<Client, String> {
    meridian::common::tls::install_crypto_provider();

    let output = Command::new("kind")
        .args(["get", "clusters"])
        .output()
        .map_err(|e| format!("failed to run kind: {e}"))?;
    let clusters = String::from_utf8_lossy(&output.stdout);

    if !clusters.lines().any(|c| c.trim() == TEST_CLUSTER_NAME) {
        let status = Command::new("kind")
            .args(["create", "cluster", "--name", TEST_CLUSTER_NAME, "--wait", "120s"])
            .status()
            .map_err(|e| format!("failed to create kind cluster: {e}"))?;
        if !status.success() {
            return Err(format!("kind create cluster exited with {status}"));
        }
    }

    Client::try_default()
        .await
        .map_err(|e| format!("failed to create kube client: {e}"))
}

/// Runtime talking to the test cluster through kube-rs
pub fn runtime_for(client: Client) -> Runtime {
    let connector = Arc::new(KubeConnector::new(client));
    Runtime::new(ResourceClient::new(connector).with_field_manager("meridian-tests"))
}

/// Poll `check` until it returns true or `timeout` passes
pub async fn wait_until<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
    false
}
