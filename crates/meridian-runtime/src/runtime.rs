//! Namespace and resource lifecycle
//!
//! The [`Runtime`] is what a reconciler talks to. It builds the resources for
//! namespace lifecycle and isolation itself and passes anything else through
//! to the [`ResourceClient`]. Every failed operation is logged once here, with
//! the namespace, kind and name it concerned, and then returned unchanged so
//! the caller can still tell a missing object from a broken connection.

use std::collections::BTreeMap;
use std::sync::Arc;

use meridian_client::connector::Connector;
use meridian_client::{
    kinds, CallContext, HttpConnector, KubeConnector, ListParams, Namespace, NetworkPolicy,
    Resource, ResourceClient,
};
use meridian_common::{Error, LABEL_MANAGED_BY, LABEL_MANAGED_BY_MERIDIAN};
use tracing::{error, info, instrument, warn};

use crate::config::{ConnectorSource, IsolationConfig, RuntimeConfig};

/// Lifecycle operations over a control plane
#[derive(Clone, Debug)]
pub struct Runtime {
    client: ResourceClient,
    default_isolation: Option<IsolationConfig>,
}

impl Runtime {
    /// Runtime over an existing client
    pub fn new(client: ResourceClient) -> Self {
        Self {
            client,
            default_isolation: None,
        }
    }

    /// Isolate every namespace created through this runtime
    pub fn with_default_isolation(mut self, isolation: IsolationConfig) -> Self {
        self.default_isolation = Some(isolation);
        self
    }

    /// Build the connector and client described by `config`
    pub async fn from_config(config: RuntimeConfig) -> Result<Self, Error> {
        let connector: Arc<dyn Connector> = match &config.connector {
            ConnectorSource::InCluster => Arc::new(HttpConnector::in_cluster()?),
            ConnectorSource::Kubeconfig => Arc::new(KubeConnector::infer().await?),
            ConnectorSource::Explicit(connector) => Arc::new(HttpConnector::new(connector)?),
        };

        let mut client = ResourceClient::new(connector);
        if let Some(manager) = config.field_manager {
            client = client.with_field_manager(manager);
        }

        Ok(Self {
            client,
            default_isolation: config.default_isolation,
        })
    }

    /// The underlying client
    pub fn client(&self) -> &ResourceClient {
        &self.client
    }

    /// Create a namespace, isolating it when a default isolation is configured
    ///
    /// If the isolation policy cannot be installed the namespace is deleted
    /// again, so a retry starts from scratch instead of hitting
    /// [`Error::AlreadyExists`] on a namespace that was never isolated.
    #[instrument(skip(self, ctx))]
    pub async fn create_namespace(&self, name: &str, ctx: &CallContext) -> Result<(), Error> {
        let mut namespace = Namespace::new(name);
        namespace.metadata = namespace
            .metadata
            .with_label(LABEL_MANAGED_BY, LABEL_MANAGED_BY_MERIDIAN);

        if let Err(e) = self.client.create(&Resource::of(namespace), ctx).await {
            error!(namespace = %name, error = %e, "Failed to create namespace");
            return Err(e);
        }
        info!(namespace = %name, "Created namespace");

        if let Some(isolation) = &self.default_isolation {
            let isolated = self
                .isolate_namespace(name, isolation.allowed_labels.clone(), ctx)
                .await;
            if let Err(e) = isolated {
                self.roll_back_namespace(name, ctx).await;
                return Err(e);
            }
        }
        Ok(())
    }

    /// Best-effort removal of a namespace whose isolation failed
    async fn roll_back_namespace(&self, name: &str, ctx: &CallContext) {
        let resource = Resource::named(kinds::NAMESPACE, name);
        match self.client.delete(&resource, ctx).await {
            Ok(()) => warn!(namespace = %name, "Rolled back unisolated namespace"),
            Err(e) => error!(
                namespace = %name,
                error = %e,
                "Failed to roll back unisolated namespace"
            ),
        }
    }

    /// Delete a namespace; a missing namespace is [`Error::NotFound`]
    #[instrument(skip(self, ctx))]
    pub async fn delete_namespace(&self, name: &str, ctx: &CallContext) -> Result<(), Error> {
        let resource = Resource::named(kinds::NAMESPACE, name);
        if let Err(e) = self.client.delete(&resource, ctx).await {
            error!(namespace = %name, error = %e, "Failed to delete namespace");
            return Err(e);
        }
        info!(namespace = %name, "Deleted namespace");
        Ok(())
    }

    /// True when the namespace exists and is not terminating
    #[instrument(skip(self, ctx))]
    pub async fn namespace_exists(&self, name: &str, ctx: &CallContext) -> Result<bool, Error> {
        match self.client.get(&Resource::named(kinds::NAMESPACE, name), ctx).await {
            Ok(resource) => Ok(resource
                .payload::<Namespace>()
                .map(|ns| ns.phase().is_none() || ns.is_active())
                .unwrap_or(true)),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => {
                error!(namespace = %name, error = %e, "Failed to look up namespace");
                Err(e)
            }
        }
    }

    /// Install the default-deny ingress policy in `namespace`
    ///
    /// Only namespaces carrying every label in `allowed_labels` may reach
    /// pods in it; an empty map denies all ingress.
    #[instrument(skip(self, allowed_labels, ctx))]
    pub async fn isolate_namespace(
        &self,
        namespace: &str,
        allowed_labels: BTreeMap<String, String>,
        ctx: &CallContext,
    ) -> Result<(), Error> {
        let policy = NetworkPolicy::default_deny(namespace, allowed_labels);
        let name = policy.metadata.name.clone();
        if let Err(e) = self.client.create(&Resource::of(policy), ctx).await {
            error!(
                namespace = %namespace,
                kind = kinds::NETWORK_POLICY,
                name = %name,
                error = %e,
                "Failed to isolate namespace"
            );
            return Err(e);
        }
        info!(namespace = %namespace, policy = %name, "Isolated namespace");
        Ok(())
    }

    /// Create an arbitrary resource
    #[instrument(skip(self, resource, ctx), fields(kind = %resource.kind))]
    pub async fn create_resource(
        &self,
        resource: &Resource,
        ctx: &CallContext,
    ) -> Result<(), Error> {
        let result = self.client.create(resource, ctx).await;
        log_outcome("create", resource, &result);
        result
    }

    /// Merge-patch an arbitrary resource
    #[instrument(skip(self, resource, ctx), fields(kind = %resource.kind))]
    pub async fn update_resource(
        &self,
        resource: &Resource,
        ctx: &CallContext,
    ) -> Result<(), Error> {
        let result = self.client.update(resource, ctx).await;
        log_outcome("update", resource, &result);
        result
    }

    /// Delete an arbitrary resource; a missing one is [`Error::NotFound`]
    #[instrument(skip(self, resource, ctx), fields(kind = %resource.kind))]
    pub async fn delete_resource(
        &self,
        resource: &Resource,
        ctx: &CallContext,
    ) -> Result<(), Error> {
        let result = self.client.delete(resource, ctx).await;
        log_outcome("delete", resource, &result);
        result
    }

    /// Read an arbitrary resource
    #[instrument(skip(self, resource, ctx), fields(kind = %resource.kind))]
    pub async fn get_resource(
        &self,
        resource: &Resource,
        ctx: &CallContext,
    ) -> Result<Resource, Error> {
        let result = self.client.get(resource, ctx).await;
        if let Err(e) = &result {
            error!(
                kind = %resource.kind,
                namespace = %resource.resolved_namespace(),
                name = resource.resolved_name().unwrap_or_default(),
                error = %e,
                "Failed to get resource"
            );
        }
        result
    }

    /// List resources of `kind`
    #[instrument(skip(self, params, ctx))]
    pub async fn list_resources(
        &self,
        kind: &str,
        params: &ListParams,
        ctx: &CallContext,
    ) -> Result<Vec<Resource>, Error> {
        let result = self.client.list(kind, params, ctx).await;
        if let Err(e) = &result {
            error!(
                kind = %kind,
                namespace = params.namespace.as_deref().unwrap_or_default(),
                error = %e,
                "Failed to list resources"
            );
        }
        result
    }
}

fn log_outcome(action: &str, resource: &Resource, result: &Result<(), Error>) {
    let namespace = resource.resolved_namespace();
    let name = resource.resolved_name().unwrap_or_default();
    match result {
        Ok(()) => info!(
            kind = %resource.kind,
            namespace = %namespace,
            name = %name,
            "{action} succeeded"
        ),
        Err(e) => error!(
            kind = %resource.kind,
            namespace = %namespace,
            name = %name,
            error = %e,
            "{action} failed"
        ),
    }
}
