//! Download dispatcher

use crate::error::{DownloadError, Result};
use crate::pool::WorkerPool;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info};
use tubefetch_config::AppConfig;
use tubefetch_source::{DownloadRequest, MediaSource, ProgressCallback, RequestFingerprint};

/// One unit of download work, owned by the dispatcher while it runs
pub struct DownloadTask {
    pub fingerprint: RequestFingerprint,
    pub destination: PathBuf,
    pub progress: ProgressCallback,
}

impl DownloadTask {
    pub fn new(
        fingerprint: RequestFingerprint,
        destination: impl Into<PathBuf>,
        progress: ProgressCallback,
    ) -> Self {
        Self {
            fingerprint,
            destination: destination.into(),
            progress,
        }
    }
}

/// Runs downloads on the download pool
///
/// No timeout is applied at this layer. The dispatcher never touches the
/// caches; it returns the artifact path and the caller decides what to keep.
#[derive(Clone)]
pub struct DownloadDispatcher {
    source: Arc<dyn MediaSource>,
    pool: WorkerPool,
    dispatched: Arc<AtomicUsize>,
}

impl DownloadDispatcher {
    pub fn new(source: Arc<dyn MediaSource>, width: usize) -> Self {
        Self {
            source,
            pool: WorkerPool::new("download", width),
            dispatched: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn from_config(source: Arc<dyn MediaSource>, config: &AppConfig) -> Self {
        Self::new(source, config.download_workers)
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Number of tasks handed to the pool since creation
    pub fn dispatched(&self) -> usize {
        self.dispatched.load(Ordering::SeqCst)
    }

    /// Download and post-process, returning the produced artifact
    ///
    /// The returned path may differ from `task.destination` when a transcode
    /// changes the extension.
    pub async fn download(&self, task: DownloadTask) -> Result<PathBuf> {
        self.dispatched.fetch_add(1, Ordering::SeqCst);

        let DownloadTask {
            fingerprint,
            destination,
            progress,
        } = task;
        info!(fingerprint = %fingerprint, "dispatching download");

        let request = DownloadRequest::new(
            fingerprint.source.clone(),
            destination,
            fingerprint.kind,
            fingerprint.quality.clone(),
        );
        let source = self.source.clone();

        let path = self
            .pool
            .run(move || -> Result<PathBuf> {
                let path = source.download(&request, &progress)?;
                if !path.is_file() {
                    return Err(DownloadError::missing_output(path.display()));
                }
                Ok(path)
            })
            .await??;

        debug!(fingerprint = %fingerprint, path = %path.display(), "download finished");
        Ok(path)
    }
}
