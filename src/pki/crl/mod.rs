//! Certificate Revocation List (CRL) acquisition
//!
//! # Features
//! - Extracting CRL distribution point URIs from certificates
//! - Finding a cached CRL for a certificate's issuer
//! - Downloading CRLs over HTTP with fallback across distribution points
//! - Checking a CRL's thisUpdate/nextUpdate window

pub mod downloader;
mod errors;
pub mod lookup;
pub mod orchestrator;
pub mod parser;
pub mod transport;
mod types;
pub mod validation;

// Re-export public types
pub use downloader::FileDownloader;
pub use errors::{
    AttemptError, AttemptFailure, CrlError, CrlResult, DownloadError, RevocationError,
    TransportError,
};
pub use lookup::LocalCrlLookup;
pub use orchestrator::{DownloadOrchestrator, DownloadResult};
pub use parser::DistributionPointResolver;
pub use transport::{ByteStream, HttpResponse, HttpTransport, ReqwestTransport};
pub use types::{Crl, RevocationInfo, RevocationReason, RevokedEntry};
pub use validation::CrlTimeValidator;

#[cfg(test)]
pub(crate) use types::fixtures;
