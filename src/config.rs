use std::{collections::HashMap, path::PathBuf, time::Duration};

use config::{Config as ConfigLib, ConfigError, Environment, File};
use serde::Deserialize;

/// Default per-attempt timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default maximum CRL size (10 MiB).
pub const DEFAULT_MAX_CRL_SIZE: u64 = 10 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub download: DownloadConfig,
    pub revocation: RevocationConfig,
}

/// How distribution points are attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStrategy {
    /// One point after the other, stopping at the first success.
    #[default]
    Sequential,
    /// All points at once; the lowest-index success still wins.
    Concurrent,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadConfig {
    pub timeout_secs: u64,
    pub max_crl_size: u64,
    pub strategy: FetchStrategy,
    /// Directory receiving the transient CRL files.
    pub directory: PathBuf,
    /// File-name stem; the attempt index is appended to it.
    pub file_prefix: String,
}

impl DownloadConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Base path handed to the orchestrator (`directory/file_prefix`).
    pub fn destination_base(&self) -> PathBuf {
        self.directory.join(&self.file_prefix)
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_crl_size: DEFAULT_MAX_CRL_SIZE,
            strategy: FetchStrategy::Sequential,
            directory: default_download_dir(),
            file_prefix: "crl".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RevocationConfig {
    /// Skip the local store and always go to the network.
    pub force_refresh: bool,
    /// Reject downloaded CRLs outside their thisUpdate/nextUpdate window.
    pub require_fresh: bool,
}

impl Default for RevocationConfig {
    fn default() -> Self {
        Self {
            force_refresh: false,
            require_fresh: true,
        }
    }
}

fn default_download_dir() -> PathBuf {
    std::env::temp_dir().join("pki-revocation")
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_sources(None)
    }

    pub fn load_with_sources(
        env_vars: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let download_dir = default_download_dir();
        let mut builder = ConfigLib::builder()
            .set_default("download.timeout_secs", DEFAULT_TIMEOUT_SECS)?
            .set_default("download.max_crl_size", DEFAULT_MAX_CRL_SIZE)?
            .set_default("download.strategy", "sequential")?
            .set_default(
                "download.directory",
                download_dir.to_string_lossy().into_owned(),
            )?
            .set_default("download.file_prefix", "crl")?
            .set_default("revocation.force_refresh", false)?
            .set_default("revocation.require_fresh", true)?
            .add_source(File::with_name("config/revocation").required(false));

        // Explicit overrides keep tests isolated from the process environment
        if let Some(vars) = env_vars {
            for (key, value) in vars {
                builder = builder.set_override(&key, value)?;
            }
        } else {
            // e.g. APP_DOWNLOAD__TIMEOUT_SECS=10
            builder = builder.add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            );
        }

        builder.build()?.try_deserialize()
    }
}
