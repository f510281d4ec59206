pub mod certificate;
pub mod crl;
pub mod revocation;
pub mod store;

// Re-export commonly used types
pub use certificate::{Certificate, CertificateError};
pub use crl::{Crl, CrlError, RevocationError};
pub use revocation::Revocation;
pub use store::{CrlStore, MemoryCrlStore, StoreError};
