//! Metadata fetcher

use crate::error::{DownloadError, Result};
use crate::pool::WorkerPool;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use tubefetch_config::AppConfig;
use tubefetch_source::{MediaSource, MetadataDocument};

/// Probes links on the metadata pool under a hard wall-clock timeout
///
/// The timeout covers queueing and execution. Nothing is retried here; the
/// extractor applies its own retry budget.
#[derive(Clone)]
pub struct MetadataFetcher {
    source: Arc<dyn MediaSource>,
    pool: WorkerPool,
    timeout: Duration,
}

impl MetadataFetcher {
    pub fn new(source: Arc<dyn MediaSource>, width: usize, timeout: Duration) -> Self {
        Self {
            source,
            pool: WorkerPool::new("metadata", width),
            timeout,
        }
    }

    pub fn from_config(source: Arc<dyn MediaSource>, config: &AppConfig) -> Self {
        Self::new(source, config.metadata_workers, config.fetch_timeout())
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub async fn fetch(&self, url: &str) -> Result<MetadataDocument> {
        let source = self.source.clone();
        let target = url.to_string();
        let job = self.pool.run(move || source.probe(&target));

        match tokio::time::timeout(self.timeout, job).await {
            Ok(result) => {
                let document = result??;
                debug!(url, title = ?document.title, "metadata fetched");
                Ok(document)
            }
            Err(_) => Err(DownloadError::timeout(format!(
                "Metadata fetch timed out after {:?}",
                self.timeout
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::path::PathBuf;
    use tubefetch_source::{DownloadRequest, ProgressCallback, SourceError};

    struct SlowSource {
        delay: Duration,
        outcome: fn() -> tubefetch_source::Result<MetadataDocument>,
    }

    impl MediaSource for SlowSource {
        fn name(&self) -> &str {
            "slow"
        }

        fn probe(&self, _url: &str) -> tubefetch_source::Result<MetadataDocument> {
            std::thread::sleep(self.delay);
            (self.outcome)()
        }

        fn download(
            &self,
            _request: &DownloadRequest,
            _progress: &ProgressCallback,
        ) -> tubefetch_source::Result<PathBuf> {
            unreachable!("fetcher never downloads")
        }
    }

    fn fetcher(delay: Duration, outcome: fn() -> tubefetch_source::Result<MetadataDocument>) -> MetadataFetcher {
        MetadataFetcher::new(Arc::new(SlowSource { delay, outcome }), 2, Duration::from_millis(100))
    }

    #[tokio::test]
    async fn test_fetch_returns_document() {
        let fetcher = fetcher(Duration::ZERO, || {
            Ok(MetadataDocument {
                title: Some("Title".into()),
                ..Default::default()
            })
        });
        let doc = fetcher.fetch("https://www.youtube.com/watch?v=dQw4w9WgXcQ").await.unwrap();
        assert_eq!(doc.title.as_deref(), Some("Title"));
    }

    #[tokio::test]
    async fn test_fetch_times_out() {
        let fetcher = fetcher(Duration::from_millis(400), || Ok(MetadataDocument::default()));
        let err = fetcher.fetch("https://www.youtube.com/watch?v=dQw4w9WgXcQ").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Timeout);
        assert_eq!(err.message, "Metadata fetch timed out after 100ms");
    }

    #[tokio::test]
    async fn test_fetch_maps_extraction_failure() {
        let fetcher = fetcher(Duration::ZERO, || {
            Err(SourceError::Extraction("Video unavailable".into()))
        });
        let err = fetcher.fetch("https://www.youtube.com/watch?v=dQw4w9WgXcQ").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Extraction);
        assert_eq!(err.message, "Video unavailable");
    }
}
