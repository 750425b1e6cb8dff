//! Integration tests for Meridian
//!
//! These tests drive the runtime against a kind cluster and check the results
//! with an independent kube-rs client, so a bug in Meridian's own decoding
//! can't hide a bug in what it sent.
//!
//! # Test Organization
//!
//! - `namespace_lifecycle`: Stories about creating, observing and deleting
//!   namespaces through the runtime
//!
//! - `network_policy`: Stories about isolating a namespace with the
//!   default-deny ingress policy and removing it again
//!
//! # Running These Tests
//!
//! ```bash
//! cargo test --test kind -- --ignored --nocapture
//! ```

mod helpers;
mod namespace_lifecycle;
mod network_policy;
