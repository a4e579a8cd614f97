//! Bounded execution of blocking media work
//!
//! Two independent [`WorkerPool`]s keep metadata probes and downloads from
//! starving each other:
//! - [`MetadataFetcher`] probes a link with a hard timeout at the await point
//! - [`DownloadDispatcher`] runs transfer + post-processing with no timeout
//!   and verifies the artifact exists before returning its path
//!
//! Both map extractor failures into [`DownloadError`].

mod dispatcher;
mod error;
mod fetcher;
mod pool;

pub use dispatcher::{DownloadDispatcher, DownloadTask};
pub use error::{DownloadError, ErrorKind, Result};
pub use fetcher::MetadataFetcher;
pub use pool::WorkerPool;
