use thiserror::Error;

/// Failures reported by a [`crate::MediaSource`] implementation
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Failed to launch extractor: {0}")]
    Launch(#[source] std::io::Error),

    #[error("{0}")]
    Extraction(String),

    #[error("{0}")]
    Transfer(String),

    #[error("{0}")]
    PostProcessing(String),

    #[error("Unexpected extractor output: {0}")]
    InvalidOutput(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SourceError>;
