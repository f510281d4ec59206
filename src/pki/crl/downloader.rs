use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::{DEFAULT_MAX_CRL_SIZE, DEFAULT_TIMEOUT_SECS};

use super::errors::{DownloadError, TransportError};
use super::transport::{HttpTransport, ReqwestTransport};

/// Fetches one remote resource into a local file.
#[derive(Debug)]
pub struct FileDownloader<T = ReqwestTransport> {
    transport: Arc<T>,
    request_timeout: Duration,
    max_size: u64,
}

impl<T> Clone for FileDownloader<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            request_timeout: self.request_timeout,
            max_size: self.max_size,
        }
    }
}

impl<T: HttpTransport> FileDownloader<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport: Arc::new(transport),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_size: DEFAULT_MAX_CRL_SIZE,
        }
    }

    /// Bound on one whole attempt: connect, headers and body.
    pub fn with_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// GET `url` and stream a 200 body into `destination`.
    ///
    /// Any failure leaves no file at `destination`. Removal problems are
    /// logged and never replace the original error.
    pub async fn download(&self, url: &str, destination: &Path) -> Result<PathBuf, DownloadError> {
        info!("Fetching CRL from: {}", url);

        let parsed = Url::parse(url).map_err(TransportError::from)?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(TransportError::UnsupportedScheme(parsed.scheme().to_string()).into());
        }

        let outcome = match timeout(self.request_timeout, self.fetch_to_file(&parsed, destination))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(self.request_timeout).into()),
        };

        match outcome {
            Ok(written) => {
                info!(
                    "Saved {} bytes from {} to {}",
                    written,
                    url,
                    destination.display()
                );
                Ok(destination.to_path_buf())
            }
            Err(e) => {
                remove_partial(destination).await;
                Err(e)
            }
        }
    }

    async fn fetch_to_file(&self, url: &Url, destination: &Path) -> Result<u64, DownloadError> {
        let response = self.transport.get(url).await?;

        if response.status != 200 {
            return Err(DownloadError::BadStatus(response.status));
        }

        if let Some(length) = response.content_length
            && length > self.max_size
        {
            return Err(DownloadError::TooLarge {
                limit: self.max_size,
            });
        }

        // Created synchronously; a blocking-pool create can finish after a
        // cancelled attempt has already been cleaned up
        let mut file = std::fs::File::create(destination)
            .map(File::from_std)
            .map_err(DownloadError::Io)?;
        let mut body = response.body;
        let mut written: u64 = 0;

        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            written += chunk.len() as u64;
            if written > self.max_size {
                return Err(DownloadError::TooLarge {
                    limit: self.max_size,
                });
            }
            file.write_all(&chunk).await.map_err(DownloadError::Io)?;
        }

        file.flush().await.map_err(DownloadError::Io)?;
        file.sync_all().await.map_err(DownloadError::Io)?;
        Ok(written)
    }
}

/// Best-effort delete; a missing file is not a problem.
pub(crate) async fn remove_partial(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => debug!("Removed partial download {}", path.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove partial download {}: {}", path.display(), e),
    }
}
