use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tokio::fs;
use x509_parser::prelude::*;

#[derive(Debug, Error)]
pub enum CertificateError {
    #[error("X.509 error: {0}")]
    X509(#[from] X509Error),

    #[error("PEM error: {0}")]
    Pem(#[from] ::pem::PemError),

    #[error("Expected a CERTIFICATE PEM block, found {0}")]
    UnexpectedPemTag(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Read-only handle to a parsed X.509 certificate.
///
/// Only the DER bytes are kept; the fields this crate needs are extracted
/// once at construction.
#[derive(Debug, Clone)]
pub struct Certificate {
    raw: Arc<Vec<u8>>,
    serial: Vec<u8>,
    subject: String,
    issuer: String,
}

impl Certificate {
    pub fn from_der(der: impl AsRef<[u8]>) -> Result<Self, CertificateError> {
        let der_bytes = der.as_ref();
        let (_, cert) =
            X509Certificate::from_der(der_bytes).map_err(|e| CertificateError::X509(e.into()))?;

        Ok(Self {
            serial: cert.tbs_certificate.raw_serial().to_vec(),
            subject: cert.subject().to_string(),
            issuer: cert.issuer().to_string(),
            raw: Arc::new(der_bytes.to_vec()),
        })
    }

    pub fn from_pem(pem_data: impl AsRef<[u8]>) -> Result<Self, CertificateError> {
        let block = ::pem::parse(pem_data)?;
        if block.tag() != "CERTIFICATE" {
            return Err(CertificateError::UnexpectedPemTag(block.tag().to_string()));
        }
        Self::from_der(block.contents())
    }

    /// Load a certificate file, accepting either PEM or DER.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, CertificateError> {
        let bytes = fs::read(path).await?;
        if bytes.starts_with(b"-----BEGIN") {
            Self::from_pem(bytes)
        } else {
            Self::from_der(bytes)
        }
    }

    /// Parse the certificate from stored DER bytes
    pub fn parse(&self) -> Result<X509Certificate<'_>, CertificateError> {
        let (_, cert) =
            X509Certificate::from_der(&self.raw).map_err(|e| CertificateError::X509(e.into()))?;
        Ok(cert)
    }

    pub fn der(&self) -> &[u8] {
        &self.raw
    }

    /// Big-endian serial number as encoded in the certificate.
    pub fn serial(&self) -> &[u8] {
        &self.serial
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Issuer DN; the key used to look CRLs up in a store.
    pub fn issuer_identity(&self) -> &str {
        &self.issuer
    }
}
