use tracing::{debug, warn};

use crate::pki::certificate::Certificate;
use crate::pki::store::CrlStore;

use super::types::Crl;

/// Finds a certificate's CRL in a local store.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalCrlLookup;

impl LocalCrlLookup {
    /// CRL issued by the certificate's issuer, or `None`.
    ///
    /// Misses, store failures and unreadable entries all come back as
    /// `None`; the latter two are logged.
    pub async fn find_local<S: CrlStore>(cert: &Certificate, store: &S) -> Option<Crl> {
        let issuer = cert.issuer_identity();

        let raw = match store.lookup_crl(issuer).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("No local CRL for issuer {}", issuer);
                return None;
            }
            Err(e) => {
                warn!("CRL store lookup failed for issuer {}: {}", issuer, e);
                return None;
            }
        };

        match Crl::from_bytes(raw) {
            Ok(crl) => {
                debug!("Found local CRL for issuer {}", issuer);
                Some(crl)
            }
            Err(e) => {
                warn!("Ignoring unreadable local CRL for issuer {}: {}", issuer, e);
                None
            }
        }
    }
}
