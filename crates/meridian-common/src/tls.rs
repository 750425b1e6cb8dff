//! Process-wide rustls crypto provider
//!
//! Both HTTP stacks (reqwest and kube's hyper-rustls client) build rustls
//! configs. rustls refuses to pick a provider on its own when more than one
//! is compiled in, so one is installed explicitly before the first client
//! is built.

use std::sync::Once;

use tracing::debug;

static INSTALL: Once = Once::new();

/// Install the ring crypto provider as the process default
///
/// Safe to call repeatedly. If the embedding binary already installed a
/// provider (e.g. aws-lc-rs for FIPS builds) that one is kept.
pub fn install_crypto_provider() {
    INSTALL.call_once(|| {
        if rustls::crypto::ring::default_provider()
            .install_default()
            .is_err()
        {
            debug!("rustls crypto provider already installed, keeping existing one");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_is_idempotent() {
        install_crypto_provider();
        install_crypto_provider();
        assert!(rustls::crypto::CryptoProvider::get_default().is_some());
    }
}
