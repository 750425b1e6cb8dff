//! Namespace and resource lifecycle manager for Meridian
//!
//! A [`Runtime`] wraps a [`meridian_client::ResourceClient`] with the
//! operations a reconciler needs: namespace create and delete, namespace
//! isolation, and pass-through create, update, delete, get and list for any
//! registered kind. Build one from a [`RuntimeConfig`] or around an existing
//! client.

#![deny(missing_docs)]

pub mod config;
pub mod runtime;

pub use config::{ConnectorSource, IsolationConfig, RuntimeConfig};
pub use runtime::Runtime;
