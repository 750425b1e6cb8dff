//! Namespace lifecycle stories
//!
//! A service runtime creates a namespace for each deployment and removes it
//! when the deployment goes away. These tests follow that path through
//! Meridian and check the cluster's view with kube-rs directly.

use std::time::Duration;

use k8s_openapi::api::core::v1::Namespace as K8sNamespace;
use kube::api::{Api, DeleteParams};
use kube::Client;
use meridian::client::CallContext;

use super::helpers::{ensure_test_cluster, runtime_for, wait_until};

async fn namespace_gone(client: &Client, name: &str) -> bool {
    let api: Api<K8sNamespace> = Api::all(client.clone());
    matches!(api.get_opt(name).await, Ok(None))
}

async fn cleanup_namespace(client: &Client, name: &str) {
    let api: Api<K8sNamespace> = Api::all(client.clone());
    let _ = api.delete(name, &DeleteParams::default()).await;
    wait_until(Duration::from_secs(60), || namespace_gone(client, name)).await;
}

/// Story: the runtime creates a namespace, sees it Active, then deletes it
///
/// Expected behavior:
/// - After create, the namespace is listed by the cluster with phase Active
/// - After delete, the namespace disappears once termination finishes
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_runtime_creates_and_deletes_namespace() {
    let client = ensure_test_cluster()
        .await
        .expect("failed to setup cluster");
    let runtime = runtime_for(client.clone());
    let ctx = CallContext::default();
    let name = "foobar";

    cleanup_namespace(&client, name).await;

    // Act: create through Meridian
    runtime
        .create_namespace(name, &ctx)
        .await
        .expect("failed to create namespace");

    // Assert: the cluster lists it as Active
    let api: Api<K8sNamespace> = Api::all(client.clone());
    let listed = api
        .list(&Default::default())
        .await
        .expect("failed to list namespaces");
    let ns = listed
        .items
        .iter()
        .find(|ns| ns.metadata.name.as_deref() == Some(name))
        .expect("namespace should be listed");
    assert_eq!(
        ns.status.as_ref().and_then(|s| s.phase.as_deref()),
        Some("Active")
    );
    assert!(runtime.namespace_exists(name, &ctx).await.unwrap());

    // Act: delete through Meridian
    runtime
        .delete_namespace(name, &ctx)
        .await
        .expect("failed to delete namespace");

    // Assert: it goes away
    assert!(
        wait_until(Duration::from_secs(60), || namespace_gone(&client, name)).await,
        "namespace should be removed after delete"
    );
}

/// Story: creating a namespace that already exists is reported, not hidden
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_duplicate_namespace_is_already_exists() {
    let client = ensure_test_cluster()
        .await
        .expect("failed to setup cluster");
    let runtime = runtime_for(client.clone());
    let ctx = CallContext::default();
    let name = "meridian-duplicate";

    cleanup_namespace(&client, name).await;

    runtime.create_namespace(name, &ctx).await.unwrap();
    let err = runtime.create_namespace(name, &ctx).await.unwrap_err();
    assert!(err.is_already_exists(), "expected AlreadyExists, got {err}");

    cleanup_namespace(&client, name).await;
}

/// Story: deleting a namespace that was never created surfaces NotFound
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_deleting_missing_namespace_is_not_found() {
    let client = ensure_test_cluster()
        .await
        .expect("failed to setup cluster");
    let runtime = runtime_for(client);

    let err = runtime
        .delete_namespace("meridian-never-created", &CallContext::default())
        .await
        .unwrap_err();
    assert!(err.is_not_found(), "expected NotFound, got {err}");
}
