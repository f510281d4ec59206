use std::path::Path;
use std::sync::Arc;

use ::time::OffsetDateTime;
use ring::digest;
use tokio::fs;
use x509_parser::prelude::*;

use super::errors::{CrlError, CrlResult};

/// CRLReason codes from RFC 5280 §5.3.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevocationReason {
    Unspecified,
    KeyCompromise,
    CaCompromise,
    AffiliationChanged,
    Superseded,
    CessationOfOperation,
    CertificateHold,
    RemoveFromCrl,
    PrivilegeWithdrawn,
    AaCompromise,
}

impl RevocationReason {
    pub fn from_u8(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Unspecified),
            1 => Some(Self::KeyCompromise),
            2 => Some(Self::CaCompromise),
            3 => Some(Self::AffiliationChanged),
            4 => Some(Self::Superseded),
            5 => Some(Self::CessationOfOperation),
            6 => Some(Self::CertificateHold),
            // 7 is unused
            8 => Some(Self::RemoveFromCrl),
            9 => Some(Self::PrivilegeWithdrawn),
            10 => Some(Self::AaCompromise),
            _ => None,
        }
    }
}

/// One entry of the revoked certificates list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevokedEntry {
    pub serial: Vec<u8>,
    pub revocation_date: OffsetDateTime,
    pub reason: Option<RevocationReason>,
}

/// Revocation status of a certificate found in a CRL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevocationInfo {
    pub revoked: bool,
    pub revocation_date: OffsetDateTime,
    pub reason: Option<RevocationReason>,
}

/// A parsed Certificate Revocation List.
///
/// The DER is retained so the list can be re-saved or handed to a
/// signature verifier; everything else is decoded once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crl {
    der: Arc<Vec<u8>>,
    issuer: String,
    this_update: OffsetDateTime,
    next_update: Option<OffsetDateTime>,
    crl_number: Option<Vec<u8>>,
    revoked: Vec<RevokedEntry>,
}

impl Crl {
    /// Create a new CRL from DER data
    pub fn from_der(der_data: impl Into<Vec<u8>>) -> CrlResult<Self> {
        let der_data = der_data.into();
        let (_, crl) = CertificateRevocationList::from_der(&der_data)
            .map_err(|e| CrlError::Parse(e.into()))?;

        let issuer = crl.issuer().to_string();
        let this_update = crl.last_update().to_datetime();
        let next_update = crl.next_update().map(|t| t.to_datetime());
        let crl_number = crl.crl_number().map(|n| n.to_bytes_be());
        let revoked = crl
            .iter_revoked_certificates()
            .map(|entry| RevokedEntry {
                serial: normalize_serial(entry.raw_serial()).to_vec(),
                revocation_date: entry.revocation_date.to_datetime(),
                reason: reason_code(entry),
            })
            .collect();

        Ok(Self {
            der: Arc::new(der_data),
            issuer,
            this_update,
            next_update,
            crl_number,
            revoked,
        })
    }

    pub fn from_pem(pem_data: impl AsRef<[u8]>) -> CrlResult<Self> {
        let block = ::pem::parse(pem_data)?;
        if block.tag() != "X509 CRL" {
            return Err(CrlError::UnexpectedPemTag(block.tag().to_string()));
        }
        Self::from_der(block.into_contents())
    }

    /// Decode PEM when the data carries a PEM header, DER otherwise.
    pub fn from_bytes(data: Vec<u8>) -> CrlResult<Self> {
        let trimmed = data.trim_ascii_start();
        if trimmed.starts_with(b"-----BEGIN") {
            Self::from_pem(trimmed)
        } else {
            Self::from_der(data)
        }
    }

    /// Load a CRL previously saved to disk.
    pub async fn load(path: impl AsRef<Path>) -> CrlResult<Self> {
        let data = fs::read(path).await?;
        Self::from_bytes(data)
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Issuer DN, matching [`crate::pki::Certificate::issuer_identity`].
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn this_update(&self) -> OffsetDateTime {
        self.this_update
    }

    /// `None` when the CRL states no expiry.
    pub fn next_update(&self) -> Option<OffsetDateTime> {
        self.next_update
    }

    pub fn crl_number(&self) -> Option<&[u8]> {
        self.crl_number.as_deref()
    }

    pub fn revoked(&self) -> &[RevokedEntry] {
        &self.revoked
    }

    /// Hex SHA-1 of the DER encoding, the identifier stores list CRLs by.
    pub fn thumbprint(&self) -> String {
        let hash = digest::digest(&digest::SHA1_FOR_LEGACY_USE_ONLY, &self.der);
        hex::encode(hash.as_ref())
    }
}

/// Strip DER sign padding so serials compare by value.
pub(crate) fn normalize_serial(serial: &[u8]) -> &[u8] {
    let first_significant = serial
        .iter()
        .position(|b| *b != 0)
        .unwrap_or(serial.len().saturating_sub(1));
    &serial[first_significant..]
}

fn reason_code(entry: &RevokedCertificate<'_>) -> Option<RevocationReason> {
    entry
        .extensions()
        .iter()
        .find_map(|ext| match ext.parsed_extension() {
            ParsedExtension::ReasonCode(code) => RevocationReason::from_u8(code.0),
            _ => None,
        })
}
