//! Meridian - control-plane resource client and namespace lifecycle manager
//!
//! Meridian lets a service runtime manage its footprint on a Kubernetes-style
//! control plane: create and delete namespaces, isolate them behind a
//! default-deny ingress policy, and create, update, delete, read and list any
//! registered resource kind.
//!
//! # Crates
//!
//! - [`common`] - Error taxonomy, telemetry setup and TLS provider install
//! - [`client`] - Resource model, kind registry, connectors and the generic
//!   [`client::ResourceClient`]
//! - [`runtime`] - The [`runtime::Runtime`] lifecycle manager and its
//!   configuration
//!
//! # Example
//!
//! ```no_run
//! use meridian::client::CallContext;
//! use meridian::runtime::{Runtime, RuntimeConfig};
//!
//! # async fn run() -> meridian::Result<()> {
//! let config = RuntimeConfig::from_file("/etc/meridian/runtime.yaml")?;
//! let runtime = Runtime::from_config(config).await?;
//! runtime.create_namespace("foobar", &CallContext::default()).await?;
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]

pub use meridian_client as client;
pub use meridian_common as common;
pub use meridian_runtime as runtime;

pub use meridian_common::{Error, Result};
