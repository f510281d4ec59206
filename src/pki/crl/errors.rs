use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use x509_parser::prelude::X509Error;

/// Failures of the CRL parsing collaborator.
#[derive(Error, Debug)]
pub enum CrlError {
    #[error("CRL parsing failed: {0}")]
    Parse(#[from] X509Error),

    #[error("CRL PEM decoding failed: {0}")]
    Pem(#[from] pem::PemError),

    #[error("Expected an X509 CRL PEM block, found {0}")]
    UnexpectedPemTag(String),

    #[error("I/O error while reading CRL: {0}")]
    Io(#[from] std::io::Error),
}

/// Network-level failure of a single request. Timeouts land here too.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Invalid CRL URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Connection failed: {0}")]
    Connect(#[source] reqwest::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[source] reqwest::Error),

    #[error("Connection I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() {
            TransportError::Connect(e)
        } else {
            TransportError::Http(e)
        }
    }
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        match self {
            TransportError::Timeout(_) => true,
            TransportError::Connect(e) | TransportError::Http(e) => e.is_timeout(),
            TransportError::Io(e) => e.kind() == std::io::ErrorKind::TimedOut,
            _ => false,
        }
    }
}

/// Failure to download one resource to disk.
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Server responded with status code {0}")]
    BadStatus(u16),

    #[error("Response exceeds the maximum CRL size of {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("Local file error: {0}")]
    Io(#[source] std::io::Error),
}

/// Why one distribution point did not yield a usable CRL.
#[derive(Error, Debug)]
pub enum AttemptError {
    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error("Downloaded data is not a valid CRL: {0}")]
    ParseFailure(#[from] CrlError),

    #[error("CRL is outside its thisUpdate/nextUpdate window")]
    Stale,

    #[error("CRL issued by {found}, expected {expected}")]
    IssuerMismatch { expected: String, found: String },
}

/// One failed distribution point, in the order it was attempted.
#[derive(Debug)]
pub struct AttemptFailure {
    pub url: String,
    pub path: PathBuf,
    pub error: AttemptError,
}

/// Terminal outcome of a revocation fetch, the only error crossing the facade.
#[derive(Error, Debug)]
pub enum RevocationError {
    #[error("Certificate has no CRL distribution points")]
    NoDistributionPoints,

    #[error("All {} CRL distribution points failed{}", .attempts.len(), last_error_suffix(.attempts))]
    AllAttemptsFailed { attempts: Vec<AttemptFailure> },

    #[error("Cannot prepare CRL download directory: {0}")]
    Io(#[from] std::io::Error),
}

fn last_error_suffix(attempts: &[AttemptFailure]) -> String {
    match attempts.last() {
        Some(last) => format!("; last error from {}: {}", last.url, last.error),
        None => String::new(),
    }
}

impl RevocationError {
    /// The failure of the last point attempted, if any point was attempted.
    pub fn last(&self) -> Option<&AttemptFailure> {
        match self {
            RevocationError::AllAttemptsFailed { attempts } => attempts.last(),
            _ => None,
        }
    }
}

/// Convenient Result type alias
pub type CrlResult<T> = Result<T, CrlError>;
