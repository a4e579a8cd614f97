use crate::delivery::DeliveryError;
use crate::transport::{Inbound, MessageRef, TransportError, UserId};
use std::path::PathBuf;
use tokio::sync::oneshot;
use tubefetch_cache::RemoteHandle;
use tubefetch_downloader::DownloadError;
use tubefetch_source::MetadataDocument;

/// Identifier of an in-flight request, from selection to terminal outcome
pub(crate) type JobId = u64;

/// Counters exposed for inspection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoordinatorSnapshot {
    pub sessions: usize,
    pub remote_entries: usize,
    pub local_entries: usize,
    pub active_jobs: usize,
    pub downloads_dispatched: usize,
}

/// Everything the coordinating loop reacts to
///
/// Worker tasks never touch loop state; they post one of these instead.
pub(crate) enum LoopMessage {
    Inbound(Inbound),

    /// Throttled progress text for a status message
    StatusUpdate { message: MessageRef, text: String },

    FetchFinished {
        user: UserId,
        generation: u64,
        status: Option<MessageRef>,
        result: Result<MetadataDocument, DownloadError>,
    },

    ResendFinished {
        job: JobId,
        result: Result<RemoteHandle, TransportError>,
    },

    LocalDeliveryFinished {
        job: JobId,
        result: Result<RemoteHandle, DeliveryError>,
    },

    DownloadFinished {
        job: JobId,
        result: Result<(PathBuf, u64), DownloadError>,
    },

    UploadFinished {
        job: JobId,
        result: Result<RemoteHandle, TransportError>,
    },

    Inspect(oneshot::Sender<CoordinatorSnapshot>),

    Shutdown,
}
