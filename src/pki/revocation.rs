use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::pki::certificate::Certificate;
use crate::pki::crl::{
    Crl, CrlTimeValidator, DistributionPointResolver, DownloadOrchestrator, FileDownloader,
    HttpTransport, LocalCrlLookup, ReqwestTransport, RevocationError, RevocationInfo,
    TransportError,
};
use crate::pki::store::CrlStore;

/// Entry point for obtaining a certificate's CRL.
///
/// The four pass-through operations expose each step on its own;
/// [`Revocation::get_crl`] chains them: local store, then distribution
/// points, then time check.
#[derive(Debug)]
pub struct Revocation<T = ReqwestTransport> {
    downloads: DownloadOrchestrator<T>,
    fresh_downloads: DownloadOrchestrator<T>,
    destination_base: PathBuf,
    force_refresh: bool,
}

impl Revocation<ReqwestTransport> {
    /// Returns an error if the HTTP client cannot be initialized
    pub fn new(config: &Config) -> Result<Self, TransportError> {
        let transport = ReqwestTransport::new(config.download.timeout())?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: HttpTransport> Revocation<T> {
    pub fn with_transport(config: &Config, transport: T) -> Self {
        let downloader = FileDownloader::new(transport)
            .with_timeout(config.download.timeout())
            .with_max_size(config.download.max_crl_size);

        Self {
            downloads: DownloadOrchestrator::new(downloader.clone())
                .with_strategy(config.download.strategy),
            fresh_downloads: DownloadOrchestrator::new(downloader)
                .with_strategy(config.download.strategy)
                .with_freshness(config.revocation.require_fresh),
            destination_base: config.download.destination_base(),
            force_refresh: config.revocation.force_refresh,
        }
    }

    /// Base path used by [`Revocation::get_crl`] for downloaded files.
    pub fn destination_base(&self) -> &Path {
        &self.destination_base
    }

    /// Cached CRL for the certificate's issuer. Not time-checked.
    pub async fn get_local_crl<S: CrlStore>(&self, cert: &Certificate, store: &S) -> Option<Crl> {
        LocalCrlLookup::find_local(cert, store).await
    }

    pub fn get_distribution_points(&self, cert: &Certificate) -> Vec<String> {
        DistributionPointResolver::resolve(cert)
    }

    /// Whether `crl` is inside its validity window right now.
    pub fn check_time(&self, crl: &Crl) -> bool {
        CrlTimeValidator::check(crl)
    }

    /// Download from the first distribution point that yields a parseable CRL.
    ///
    /// The result is not time-checked.
    pub async fn download_crl(
        &self,
        distribution_points: &[String],
        destination_base: &Path,
    ) -> Result<Crl, RevocationError> {
        self.downloads
            .fetch_first_available(distribution_points, destination_base)
            .await
    }

    /// A time-valid CRL issued by `cert`'s issuer, from the store when possible.
    ///
    /// A local CRL outside its window triggers a download; it is never
    /// returned, even when every distribution point fails. Downloaded CRLs
    /// naming a different issuer fail their distribution point.
    pub async fn get_crl<S: CrlStore>(
        &self,
        cert: &Certificate,
        store: &S,
    ) -> Result<Crl, RevocationError> {
        if self.force_refresh {
            debug!("Forced refresh, skipping local CRL store");
        } else if let Some(local) = self.get_local_crl(cert, store).await {
            if local.issuer() != cert.issuer_identity() {
                warn!(
                    "Store returned a CRL issued by {} for {}, ignoring it",
                    local.issuer(),
                    cert.issuer_identity()
                );
            } else if self.check_time(&local) {
                info!("Using local CRL for {}", cert.issuer_identity());
                return Ok(local);
            } else {
                info!(
                    "Local CRL for {} is outside its validity window, refreshing",
                    cert.issuer_identity()
                );
            }
        }

        let distribution_points = self.get_distribution_points(cert);
        debug!(
            "Resolved {} CRL distribution points for {}",
            distribution_points.len(),
            cert.subject()
        );

        self.fresh_downloads
            .fetch_issued_by(
                cert.issuer_identity(),
                &distribution_points,
                &self.destination_base,
            )
            .await
            .map(|(crl, _)| crl)
    }

    /// Revocation status of `cert`; `None` means it is not on its issuer's CRL.
    pub async fn check_certificate<S: CrlStore>(
        &self,
        cert: &Certificate,
        store: &S,
    ) -> Result<Option<RevocationInfo>, RevocationError> {
        let crl = self.get_crl(cert, store).await?;
        Ok(crl.is_revoked(cert.serial()))
    }
}
