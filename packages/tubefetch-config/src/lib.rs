//! Application configuration
//!
//! Values come from (lowest to highest precedence) built-in defaults, an
//! optional JSON file, `TUBEFETCH_*` environment variables and finally
//! explicit builder calls made by the binary for command-line flags.

pub mod extractor;

pub use extractor::ExtractorConfig;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Flat directory holding every in-flight and cached artifact
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Width of the metadata worker pool
    #[serde(default = "default_metadata_workers")]
    pub metadata_workers: usize,

    /// Width of the download worker pool
    #[serde(default = "default_download_workers")]
    pub download_workers: usize,

    /// Hard timeout on a metadata fetch, in seconds
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// Lifetime of a local artifact cache entry, in seconds
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    /// Largest artifact that may be delivered
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,

    /// Minimum interval between two progress updates of one transfer, in milliseconds
    #[serde(default = "default_progress_interval")]
    pub progress_interval_ms: u64,

    #[serde(default = "default_fetch_diagnostic_limit")]
    pub fetch_diagnostic_limit: usize,

    #[serde(default = "default_download_diagnostic_limit")]
    pub download_diagnostic_limit: usize,

    #[serde(default)]
    pub extractor: ExtractorConfig,
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_metadata_workers() -> usize {
    4
}

fn default_download_workers() -> usize {
    3
}

fn default_fetch_timeout() -> u64 {
    60
}

fn default_cache_ttl() -> u64 {
    600 // 10 minutes
}

fn default_max_upload_bytes() -> u64 {
    2 * 1024 * 1024 * 1024
}

fn default_progress_interval() -> u64 {
    3000
}

fn default_fetch_diagnostic_limit() -> usize {
    200
}

fn default_download_diagnostic_limit() -> usize {
    300
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            metadata_workers: default_metadata_workers(),
            download_workers: default_download_workers(),
            fetch_timeout_secs: default_fetch_timeout(),
            cache_ttl_secs: default_cache_ttl(),
            max_upload_bytes: default_max_upload_bytes(),
            progress_interval_ms: default_progress_interval(),
            fetch_diagnostic_limit: default_fetch_diagnostic_limit(),
            download_diagnostic_limit: default_download_diagnostic_limit(),
            extractor: ExtractorConfig::default(),
        }
    }
}

impl AppConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
        self
    }

    pub fn with_workers(mut self, metadata: usize, download: usize) -> Self {
        self.metadata_workers = metadata;
        self.download_workers = download;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout_secs = timeout.as_secs();
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl_secs = ttl.as_secs();
        self
    }

    pub fn with_max_upload_bytes(mut self, bytes: u64) -> Self {
        self.max_upload_bytes = bytes;
        self
    }

    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_extractor(mut self, extractor: ExtractorConfig) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    /// Load configuration from environment variables on top of the defaults
    ///
    /// Supported environment variables:
    /// - TUBEFETCH_DOWNLOAD_DIR: artifact directory (default: ./downloads)
    /// - TUBEFETCH_METADATA_WORKERS: number (default: 4)
    /// - TUBEFETCH_DOWNLOAD_WORKERS: number (default: 3)
    /// - TUBEFETCH_FETCH_TIMEOUT: seconds (default: 60)
    /// - TUBEFETCH_CACHE_TTL: seconds (default: 600)
    /// - TUBEFETCH_MAX_UPLOAD_BYTES: bytes (default: 2 GiB)
    /// - TUBEFETCH_PROGRESS_INTERVAL_MS: milliseconds (default: 3000)
    /// - TUBEFETCH_EXTRACTOR: extractor binary (default: yt-dlp)
    /// - TUBEFETCH_EXTERNAL_DOWNLOADER: segment downloader, `none` to disable
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Apply `TUBEFETCH_*` overrides resolved through `lookup`.
    ///
    /// Unparseable numbers are ignored with a warning so a typo never stops
    /// the process from starting with sane values.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup("TUBEFETCH_DOWNLOAD_DIR") {
            self.download_dir = PathBuf::from(dir);
        }

        override_number(&lookup, "TUBEFETCH_METADATA_WORKERS", &mut self.metadata_workers);
        override_number(&lookup, "TUBEFETCH_DOWNLOAD_WORKERS", &mut self.download_workers);
        override_number(&lookup, "TUBEFETCH_FETCH_TIMEOUT", &mut self.fetch_timeout_secs);
        override_number(&lookup, "TUBEFETCH_CACHE_TTL", &mut self.cache_ttl_secs);
        override_number(&lookup, "TUBEFETCH_MAX_UPLOAD_BYTES", &mut self.max_upload_bytes);
        override_number(
            &lookup,
            "TUBEFETCH_PROGRESS_INTERVAL_MS",
            &mut self.progress_interval_ms,
        );

        if let Some(binary) = lookup("TUBEFETCH_EXTRACTOR") {
            self.extractor.binary = PathBuf::from(binary);
        }

        if let Some(downloader) = lookup("TUBEFETCH_EXTERNAL_DOWNLOADER") {
            self.extractor.external_downloader = match downloader.to_lowercase().as_str() {
                "" | "none" | "native" => None,
                _ => Some(downloader),
            };
        }
    }

    /// Load configuration from JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Serialize configuration to JSON string
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values the runtime cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.metadata_workers == 0 || self.download_workers == 0 {
            return Err(ConfigError::Invalid(
                "worker pools must have at least one worker".to_string(),
            ));
        }
        if self.download_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("download_dir is empty".to_string()));
        }
        if self.progress_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "progress_interval_ms must be positive".to_string(),
            ));
        }
        if self.download_workers >= self.metadata_workers {
            tracing::warn!(
                metadata_workers = self.metadata_workers,
                download_workers = self.download_workers,
                "download pool is not narrower than the metadata pool"
            );
        }
        Ok(())
    }
}

fn override_number<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    target: &mut T,
) {
    if let Some(raw) = lookup(key) {
        match raw.trim().parse() {
            Ok(value) => *target = value,
            Err(_) => tracing::warn!(key, value = %raw, "ignoring unparseable override"),
        }
    }
}
