//! Control-plane client for Meridian: resource model, kind registry,
//! connectors and the generic CRUD client

pub mod client;
pub mod connector;
pub mod registry;
pub mod resource;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use client::{CallContext, ListParams, ResourceClient};
pub use connector::{
    ApiRequest, ApiResponse, Connector, ConnectorConfig, HttpConnector, KubeConnector,
};
pub use registry::{KindRegistry, KindSpec, Scope};
pub use resource::{
    kinds, Container, Deployment, DynamicPayload, KindPayload, Metadata, Namespace, NetworkPolicy,
    Payload, Pod, Resource, Secret, Service, ServiceAccount,
};
