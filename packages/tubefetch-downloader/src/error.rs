//! Error types for fetch and download work

use std::fmt;
use tubefetch_source::SourceError;
use tubefetch_utils::truncate_chars;

/// Error type for metadata fetches and downloads
#[derive(Debug, Clone)]
pub struct DownloadError {
    pub kind: ErrorKind,
    pub message: String,
}

/// Kinds of fetch/download errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Metadata fetch exceeded its wall-clock budget
    Timeout,
    /// Extractor could not resolve the link
    Extraction,
    /// Transfer failed (non-zero extractor result)
    Transfer,
    /// Extractor reported success but no artifact exists
    MissingOutput,
    /// Merge or transcode failed
    PostProcessing,
    /// Local file system error
    FileSystem,
    /// Worker pool closed, worker panicked or extractor missing
    Unavailable,
}

impl DownloadError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    pub fn extraction(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Extraction, message)
    }

    pub fn transfer(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transfer, message)
    }

    pub fn missing_output(path: impl fmt::Display) -> Self {
        Self::new(
            ErrorKind::MissingOutput,
            format!("Output file not found after download: {}", path),
        )
    }

    pub fn post_processing(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PostProcessing, message)
    }

    pub fn file_system(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::FileSystem, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unavailable, message)
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == ErrorKind::Timeout
    }

    /// Message cut to `limit` characters for user-visible diagnostics
    pub fn truncated(&self, limit: usize) -> String {
        truncate_chars(&self.message, limit)
    }
}

impl fmt::Display for DownloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for DownloadError {}

impl From<std::io::Error> for DownloadError {
    fn from(err: std::io::Error) -> Self {
        Self::file_system(err.to_string())
    }
}

impl From<SourceError> for DownloadError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::Launch(e) => Self::unavailable(format!("Failed to launch extractor: {}", e)),
            SourceError::Extraction(msg) => Self::extraction(msg),
            SourceError::InvalidOutput(msg) => {
                Self::extraction(format!("Unexpected extractor output: {}", msg))
            }
            SourceError::Transfer(msg) => Self::transfer(msg),
            SourceError::PostProcessing(msg) => Self::post_processing(msg),
            SourceError::Io(e) => Self::file_system(e.to_string()),
        }
    }
}

/// Result type for fetch and download operations
pub type Result<T> = std::result::Result<T, DownloadError>;
