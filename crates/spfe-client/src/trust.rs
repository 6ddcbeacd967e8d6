//! The SPFE trust anchor.
//!
//! SPFE servers present certificates issued under the WWPass Corporation
//! Primary Root CA. That root is the only certificate the client trusts; the
//! system trust store is never consulted and the anchor cannot be swapped.

use rustls::{RootCertStore, pki_types::CertificateDer};

use crate::error::Error;

const WWPASS_ROOT_CA_PEM: &[u8] = include_bytes!("../certs/wwpass_root_ca.pem");

/// Root certificate that SPFE server chains must lead to.
#[derive(Debug, Clone)]
pub struct TrustAnchor {
    certificate: CertificateDer<'static>,
}

impl TrustAnchor {
    /// The embedded WWPass Corporation Primary Root CA.
    ///
    /// Parse once and move the value into the connection context.
    ///
    /// # Errors
    ///
    /// - `Config`: the embedded certificate does not parse
    pub fn wwpass() -> Result<Self, Error> {
        let certificate = rustls_pemfile::certs(&mut &WWPASS_ROOT_CA_PEM[..])
            .next()
            .transpose()
            .map_err(|e| Error::Config(format!("failed to parse embedded root CA: {e}")))?
            .ok_or_else(|| Error::Config("embedded root CA is missing".to_string()))?;
        Ok(Self { certificate })
    }

    /// Anchor for a locally generated test CA.
    #[cfg(test)]
    pub(crate) fn from_certificate(certificate: CertificateDer<'static>) -> Self {
        Self { certificate }
    }

    /// DER root certificate.
    pub fn certificate(&self) -> &CertificateDer<'static> {
        &self.certificate
    }

    /// Trust store containing exactly this anchor.
    pub(crate) fn root_store(&self) -> Result<RootCertStore, Error> {
        let mut roots = RootCertStore::empty();
        roots
            .add(self.certificate.clone())
            .map_err(|e| Error::Config(format!("invalid root CA: {e}")))?;
        Ok(roots)
    }
}
