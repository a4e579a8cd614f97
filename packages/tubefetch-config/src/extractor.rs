//! Configuration surface handed to the external media extractor.
//!
//! None of these knobs are interpreted here; they are forwarded verbatim to
//! the extractor process, which owns retry/backoff and segment scheduling.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Extractor executable (looked up on `PATH` when relative)
    #[serde(default = "default_binary")]
    pub binary: PathBuf,

    /// Socket timeout in seconds
    #[serde(default = "default_socket_timeout")]
    pub socket_timeout_secs: u64,

    /// Connection retry budget
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Fragment retry budget
    #[serde(default = "default_retries")]
    pub fragment_retries: u32,

    #[serde(default = "default_secondary_retries")]
    pub file_access_retries: u32,

    /// Extraction retry budget
    #[serde(default = "default_secondary_retries")]
    pub extractor_retries: u32,

    /// HTTP chunk size in bytes
    #[serde(default = "default_http_chunk_size")]
    pub http_chunk_size: u64,

    /// Throughput floor in bytes per second; the extractor reconnects below it
    #[serde(default = "default_throttled_rate")]
    pub throttled_rate: u64,

    /// External segment downloader (`None` uses the extractor's native one)
    #[serde(default = "default_external_downloader")]
    pub external_downloader: Option<String>,

    /// Number of parallel segments per transfer
    #[serde(default = "default_parallel")]
    pub segments: u32,

    /// Connection cap per host
    #[serde(default = "default_parallel")]
    pub connections_per_host: u32,

    /// Concurrent downloads inside the external downloader
    #[serde(default = "default_parallel")]
    pub concurrent_downloads: u32,

    /// Minimum segment size, in the external downloader's notation
    #[serde(default = "default_min_segment_size")]
    pub min_segment_size: String,

    /// Client identity hints passed to the extractor
    #[serde(default = "default_player_clients")]
    pub player_clients: Vec<String>,

    /// Lossy codec used for audio extraction
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    /// Audio bitrate in kbit/s
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate_kbps: u32,
}

fn default_binary() -> PathBuf {
    PathBuf::from("yt-dlp")
}

fn default_socket_timeout() -> u64 {
    60
}

fn default_retries() -> u32 {
    10
}

fn default_secondary_retries() -> u32 {
    5
}

fn default_http_chunk_size() -> u64 {
    10 * 1024 * 1024
}

fn default_throttled_rate() -> u64 {
    100_000
}

fn default_external_downloader() -> Option<String> {
    Some("aria2c".to_string())
}

fn default_parallel() -> u32 {
    16
}

fn default_min_segment_size() -> String {
    "1M".to_string()
}

fn default_player_clients() -> Vec<String> {
    vec!["android".to_string(), "web".to_string()]
}

fn default_audio_codec() -> String {
    "mp3".to_string()
}

fn default_audio_bitrate() -> u32 {
    192
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            socket_timeout_secs: default_socket_timeout(),
            retries: default_retries(),
            fragment_retries: default_retries(),
            file_access_retries: default_secondary_retries(),
            extractor_retries: default_secondary_retries(),
            http_chunk_size: default_http_chunk_size(),
            throttled_rate: default_throttled_rate(),
            external_downloader: default_external_downloader(),
            segments: default_parallel(),
            connections_per_host: default_parallel(),
            concurrent_downloads: default_parallel(),
            min_segment_size: default_min_segment_size(),
            player_clients: default_player_clients(),
            audio_codec: default_audio_codec(),
            audio_bitrate_kbps: default_audio_bitrate(),
        }
    }
}

impl ExtractorConfig {
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_external_downloader(mut self, downloader: Option<String>) -> Self {
        self.external_downloader = downloader;
        self
    }

    /// Extension of files produced by audio extraction
    pub fn audio_extension(&self) -> &str {
        &self.audio_codec
    }
}
