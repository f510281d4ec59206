use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::pki::crl::{Crl, CrlError};

/// Error type for CRL store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Stored CRL is unreadable: {0}")]
    Crl(#[from] CrlError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store backend error: {0}")]
    Backend(String),
}

impl From<walkdir::Error> for StoreError {
    fn from(e: walkdir::Error) -> Self {
        StoreError::Io(e.into())
    }
}

/// Read-only view of a local revocation cache.
pub trait CrlStore: Send + Sync {
    /// Raw (PEM or DER) bytes of the CRL issued by `issuer_identity`, if
    /// the store holds one.
    fn lookup_crl(
        &self,
        issuer_identity: &str,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, StoreError>> + Send;
}

/// In-memory CRL store keyed by issuer DN.
///
/// Only the newest CRL (by `thisUpdate`) is kept for each issuer.
#[derive(Debug, Clone, Default)]
pub struct MemoryCrlStore {
    cache: Arc<DashMap<String, Crl>>,
}

impl MemoryCrlStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store preloaded from the CRL files under `base_path`.
    ///
    /// Files with .crl, .der or .pem extensions are read; anything that does
    /// not parse as a CRL is skipped.
    pub async fn from_dir(base_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let store = Self::new();
        store.load_from_dir(base_path).await?;
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn clear(&self) {
        self.cache.clear();
    }

    /// Add encoded CRLs, returning how many were accepted.
    pub fn add_crls<I, D>(&self, encoded: I) -> usize
    where
        I: IntoIterator<Item = D>,
        D: Into<Vec<u8>>,
    {
        let mut count = 0;
        for data in encoded {
            match Crl::from_bytes(data.into()) {
                Ok(crl) => {
                    self.insert(crl);
                    count += 1;
                }
                Err(e) => warn!("Skipping unparseable CRL: {e}"),
            }
        }
        count
    }

    pub fn insert(&self, crl: Crl) {
        match self.cache.entry(crl.issuer().to_string()) {
            Entry::Occupied(mut existing) => {
                if crl.this_update() >= existing.get().this_update() {
                    existing.insert(crl);
                } else {
                    debug!(
                        "Keeping newer CRL already stored for {}",
                        existing.key()
                    );
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(crl);
            }
        }
    }

    pub fn get(&self, issuer_identity: &str) -> Option<Crl> {
        self.cache
            .get(issuer_identity)
            .map(|entry| entry.value().clone())
    }

    pub async fn load_from_dir(&self, base_path: impl AsRef<Path>) -> Result<usize, StoreError> {
        let mut count = 0;

        for entry in WalkDir::new(base_path.as_ref()) {
            let entry = entry?;
            let path = entry.path();

            if path
                .extension()
                .and_then(|s| s.to_str())
                .is_some_and(|ext| {
                    ext.eq_ignore_ascii_case("crl")
                        || ext.eq_ignore_ascii_case("der")
                        || ext.eq_ignore_ascii_case("pem")
                })
                && let Ok(data) = fs::read(path).await
                && let Ok(crl) = Crl::from_bytes(data)
            {
                self.insert(crl);
                count += 1;
            }
        }

        info!("Loaded {count} CRLs from disk");
        Ok(count)
    }
}

impl CrlStore for MemoryCrlStore {
    async fn lookup_crl(&self, issuer_identity: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.get(issuer_identity).map(|crl| crl.der().to_vec()))
    }
}
