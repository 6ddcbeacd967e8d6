//! Connection context: TLS client configuration plus target and timeout.
//!
//! Built once per Service Provider credential set and reused for every
//! request. Holds no per-request state, so it can be shared freely.

use std::{sync::Arc, time::Duration};

use rustls::{ClientConfig, crypto::CryptoProvider};
use tracing::info;

use crate::{error::Error, identity::Identity, trust::TrustAnchor};

/// Default SPFE host.
pub const DEFAULT_HOST: &str = "spfe.wwpass.com";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Where to connect and how long to wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// SPFE host name, optionally with `:port`
    pub host: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self { host: DEFAULT_HOST.to_string(), timeout: DEFAULT_TIMEOUT }
    }
}

impl ConnectionConfig {
    /// Connect to `host` instead of the default.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Use `timeout` instead of the default.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Ready-to-use mutually authenticated TLS configuration for one Service
/// Provider.
///
/// # Invariants
///
/// - The server must chain to the [`TrustAnchor`] and nothing else.
/// - The identity presented to the server never changes after construction.
#[derive(Debug, Clone)]
pub struct ConnectionContext {
    tls: Arc<ClientConfig>,
    host: String,
    timeout: Duration,
}

impl ConnectionContext {
    /// Build a context presenting `identity` and trusting only `anchor`.
    ///
    /// # Errors
    ///
    /// - `Config`: the private key does not parse, its algorithm does not
    ///   match the certificate, or rustls rejects the pair
    pub fn new(
        identity: Identity,
        anchor: TrustAnchor,
        config: ConnectionConfig,
    ) -> Result<Self, Error> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        check_key_matches_certificate(&provider, &identity)?;

        let tls = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(|e| Error::Config(format!("invalid TLS config: {e}")))?
            .with_root_certificates(anchor.root_store()?)
            .with_client_auth_cert(
                vec![identity.certificate().clone()],
                identity.private_key().clone_key(),
            )
            .map_err(|e| Error::Config(format!("invalid TLS config: {e}")))?;

        info!(
            subject = identity.subject(),
            host = %config.host,
            timeout_ms = config.timeout.as_millis() as u64,
            "SPFE connection context ready"
        );

        Ok(Self { tls: Arc::new(tls), host: config.host, timeout: config.timeout })
    }

    /// Context for the default host and timeout, trusting the embedded
    /// WWPass root.
    ///
    /// # Errors
    ///
    /// - `Config`: as [`ConnectionContext::new`]
    pub fn with_defaults(identity: Identity) -> Result<Self, Error> {
        Self::new(identity, TrustAnchor::wwpass()?, ConnectionConfig::default())
    }

    /// TLS client configuration.
    pub fn tls_config(&self) -> Arc<ClientConfig> {
        Arc::clone(&self.tls)
    }

    /// Target host.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

fn check_key_matches_certificate(
    provider: &CryptoProvider,
    identity: &Identity,
) -> Result<(), Error> {
    let signing_key = provider
        .key_provider
        .load_private_key(identity.private_key().clone_key())
        .map_err(|e| Error::Config(format!("failed to load private key: {e}")))?;

    if signing_key.algorithm() != identity.algorithm() {
        return Err(Error::Config(format!(
            "private key algorithm {:?} does not match certificate algorithm {:?}",
            signing_key.algorithm(),
            identity.algorithm()
        )));
    }

    Ok(())
}
