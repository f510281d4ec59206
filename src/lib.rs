//! CRL acquisition and validation for PKI clients.
//!
//! Given a certificate, [`pki::revocation::Revocation`] finds a usable
//! Certificate Revocation List: first in a local [`pki::store::CrlStore`],
//! then by downloading from the certificate's distribution points with
//! fallback from one point to the next.

pub mod config;
pub mod pki;
pub mod telemetry;
