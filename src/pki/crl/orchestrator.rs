use std::path::{Path, PathBuf};

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::config::FetchStrategy;

use super::downloader::{FileDownloader, remove_partial};
use super::errors::{AttemptError, AttemptFailure, RevocationError};
use super::transport::{HttpTransport, ReqwestTransport};
use super::types::Crl;
use super::validation::CrlTimeValidator;

/// Where a CRL came from and where it now lives on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResult {
    pub source_url: String,
    pub local_path: PathBuf,
}

/// Drives the downloader across distribution points, first success wins.
#[derive(Debug, Clone)]
pub struct DownloadOrchestrator<T = ReqwestTransport> {
    downloader: FileDownloader<T>,
    strategy: FetchStrategy,
    require_fresh: bool,
}

impl<T: HttpTransport> DownloadOrchestrator<T> {
    pub fn new(downloader: FileDownloader<T>) -> Self {
        Self {
            downloader,
            strategy: FetchStrategy::Sequential,
            require_fresh: false,
        }
    }

    pub fn with_strategy(mut self, strategy: FetchStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Treat a CRL outside its validity window as a failure of that point.
    pub fn with_freshness(mut self, require_fresh: bool) -> Self {
        self.require_fresh = require_fresh;
        self
    }

    /// File used for the attempt at `index`: the base path with the index appended.
    pub fn attempt_path(destination_base: &Path, index: usize) -> PathBuf {
        let mut name = destination_base.as_os_str().to_owned();
        name.push(index.to_string());
        PathBuf::from(name)
    }

    /// Return the CRL of the lowest-index distribution point that yields one.
    pub async fn fetch_first_available(
        &self,
        distribution_points: &[String],
        destination_base: &Path,
    ) -> Result<Crl, RevocationError> {
        self.fetch(distribution_points, destination_base)
            .await
            .map(|(crl, _)| crl)
    }

    /// Like [`Self::fetch_first_available`], also reporting the winning source.
    pub async fn fetch(
        &self,
        distribution_points: &[String],
        destination_base: &Path,
    ) -> Result<(Crl, DownloadResult), RevocationError> {
        self.fetch_inner(distribution_points, destination_base, None)
            .await
    }

    /// Like [`Self::fetch`], but a CRL signed in the name of anyone other
    /// than `issuer` fails its point with [`AttemptError::IssuerMismatch`].
    pub async fn fetch_issued_by(
        &self,
        issuer: &str,
        distribution_points: &[String],
        destination_base: &Path,
    ) -> Result<(Crl, DownloadResult), RevocationError> {
        self.fetch_inner(distribution_points, destination_base, Some(issuer))
            .await
    }

    async fn fetch_inner(
        &self,
        distribution_points: &[String],
        destination_base: &Path,
        issuer: Option<&str>,
    ) -> Result<(Crl, DownloadResult), RevocationError> {
        if distribution_points.is_empty() {
            warn!("No CRL distribution points to download from");
            return Err(RevocationError::NoDistributionPoints);
        }

        if let Some(parent) = destination_base.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }

        match self.strategy {
            FetchStrategy::Sequential => {
                self.fetch_sequential(distribution_points, destination_base, issuer)
                    .await
            }
            FetchStrategy::Concurrent => {
                self.fetch_concurrent(distribution_points, destination_base, issuer)
                    .await
            }
        }
    }

    async fn fetch_sequential(
        &self,
        distribution_points: &[String],
        destination_base: &Path,
        issuer: Option<&str>,
    ) -> Result<(Crl, DownloadResult), RevocationError> {
        let mut failures = Vec::new();

        for (index, url) in distribution_points.iter().enumerate() {
            let path = Self::attempt_path(destination_base, index);

            match self.attempt(url, &path, issuer).await {
                Ok(crl) => {
                    info!("Using CRL from {} (attempt {})", url, index + 1);
                    return Ok((
                        crl,
                        DownloadResult {
                            source_url: url.clone(),
                            local_path: path,
                        },
                    ));
                }
                Err(error) => {
                    warn!("Failed to fetch CRL from {}: {}", url, error);
                    failures.push(AttemptFailure {
                        url: url.clone(),
                        path,
                        error,
                    });
                }
            }
        }

        Err(RevocationError::AllAttemptsFailed { attempts: failures })
    }

    async fn fetch_concurrent(
        &self,
        distribution_points: &[String],
        destination_base: &Path,
        issuer: Option<&str>,
    ) -> Result<(Crl, DownloadResult), RevocationError> {
        let count = distribution_points.len();
        let paths: Vec<PathBuf> = (0..count)
            .map(|index| Self::attempt_path(destination_base, index))
            .collect();

        let mut outcomes: Vec<Option<Result<Crl, AttemptError>>> =
            (0..count).map(|_| None).collect();
        let mut lowest_open = 0;
        let mut winner = None;

        {
            let mut in_flight: FuturesUnordered<_> = distribution_points
                .iter()
                .zip(&paths)
                .enumerate()
                .map(|(index, (url, path))| async move {
                    (index, self.attempt(url, path, issuer).await)
                })
                .collect();

            while let Some((index, result)) = in_flight.next().await {
                if let Err(error) = &result {
                    warn!(
                        "Failed to fetch CRL from {}: {}",
                        distribution_points[index], error
                    );
                }
                outcomes[index] = Some(result);

                // Earlier points take precedence over faster ones
                while lowest_open < count {
                    match &outcomes[lowest_open] {
                        Some(Err(_)) => lowest_open += 1,
                        Some(Ok(_)) => {
                            winner = Some(lowest_open);
                            break;
                        }
                        None => break,
                    }
                }

                if winner.is_some() || lowest_open == count {
                    break;
                }
            }
            // Dropping the set cancels attempts that are still running
        }

        let mut failures = Vec::new();
        let mut selected = None;

        for (index, (outcome, path)) in outcomes.into_iter().zip(paths).enumerate() {
            let url = &distribution_points[index];
            match outcome {
                Some(Ok(crl)) if Some(index) == winner => selected = Some((crl, url.clone(), path)),
                Some(Ok(_)) => {
                    debug!("Discarding CRL from {}, an earlier point succeeded", url);
                    remove_partial(&path).await;
                }
                Some(Err(error)) if winner.is_none_or(|w| index < w) => {
                    failures.push(AttemptFailure {
                        url: url.clone(),
                        path,
                        error,
                    });
                }
                Some(Err(_)) => {}
                None => {
                    debug!("Abandoned CRL download from {}", url);
                    remove_partial(&path).await;
                }
            }
        }

        match selected {
            Some((crl, source_url, local_path)) => {
                info!("Using CRL from {}", source_url);
                Ok((
                    crl,
                    DownloadResult {
                        source_url,
                        local_path,
                    },
                ))
            }
            None => Err(RevocationError::AllAttemptsFailed { attempts: failures }),
        }
    }

    /// Download, load and check one point. A failed attempt leaves
    /// nothing behind at `path`.
    async fn attempt(
        &self,
        url: &str,
        path: &Path,
        issuer: Option<&str>,
    ) -> Result<Crl, AttemptError> {
        self.downloader.download(url, path).await?;

        let result = match Crl::load(path).await {
            Ok(crl) => self.accept(crl, issuer),
            Err(e) => Err(AttemptError::ParseFailure(e)),
        };

        if result.is_err() {
            remove_partial(path).await;
        }
        result
    }

    fn accept(&self, crl: Crl, issuer: Option<&str>) -> Result<Crl, AttemptError> {
        if let Some(expected) = issuer
            && crl.issuer() != expected
        {
            return Err(AttemptError::IssuerMismatch {
                expected: expected.to_string(),
                found: crl.issuer().to_string(),
            });
        }

        if self.require_fresh && !CrlTimeValidator::check(&crl) {
            return Err(AttemptError::Stale);
        }

        Ok(crl)
    }
}
