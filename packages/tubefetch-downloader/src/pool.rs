//! Bounded pool for blocking work

use crate::error::{DownloadError, Result};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Runs blocking closures on the blocking thread pool, at most `width` at a time
///
/// A job holds its permit until the closure returns, even when the caller
/// stops awaiting it, so an abandoned job still counts against the width.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    name: &'static str,
    width: usize,
    permits: Arc<Semaphore>,
}

impl WorkerPool {
    pub fn new(name: &'static str, width: usize) -> Self {
        let width = width.max(1);
        Self {
            name,
            width,
            permits: Arc::new(Semaphore::new(width)),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of jobs currently holding a permit
    pub fn in_flight(&self) -> usize {
        self.width - self.permits.available_permits()
    }

    /// Queue `job` and wait for its result
    pub async fn run<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| DownloadError::unavailable(format!("{} pool is closed", self.name)))?;

        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            job()
        })
        .await
        .map_err(|e| DownloadError::unavailable(format!("{} worker failed: {}", self.name, e)))
    }

    /// Stop accepting jobs; queued callers fail with `Unavailable`
    pub fn close(&self) {
        self.permits.close();
    }
}
