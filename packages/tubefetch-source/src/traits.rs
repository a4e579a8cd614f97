//! Core trait definitions for media sources

use crate::error::Result;
use crate::media::{MediaKind, MetadataDocument, Quality};
use crate::progress::ProgressCallback;
use std::path::PathBuf;

/// A single transfer handed to [`MediaSource::download`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: String,
    /// Requested output path; audio transcodes replace its extension
    pub destination: PathBuf,
    pub kind: MediaKind,
    pub quality: Quality,
}

impl DownloadRequest {
    pub fn new(
        url: impl Into<String>,
        destination: impl Into<PathBuf>,
        kind: MediaKind,
        quality: Quality,
    ) -> Self {
        Self {
            url: url.into(),
            destination: destination.into(),
            kind,
            quality,
        }
    }

    /// Destination without its extension, used as the audio output base
    pub fn output_base(&self) -> PathBuf {
        self.destination.with_extension("")
    }

    /// Path the artifact is expected at once the transfer succeeded
    pub fn expected_output(&self, audio_extension: &str) -> PathBuf {
        match self.kind {
            MediaKind::Video => self.destination.clone(),
            MediaKind::Audio => self.output_base().with_extension(audio_extension),
        }
    }
}

/// Blocking media extraction backend
///
/// Implementations perform network and disk work synchronously and must only
/// be called from a worker pool, never from the coordinating loop.
pub trait MediaSource: Send + Sync + 'static {
    /// Get the name of this source implementation
    fn name(&self) -> &str;

    /// Fetch the metadata document for `url` without downloading media
    fn probe(&self, url: &str) -> Result<MetadataDocument>;

    /// Transfer (and post-process) the media described by `request`
    ///
    /// # Returns
    /// * `Ok(path)` - Path of the produced artifact; its extension reflects the
    ///   transcode target, which may differ from the requested destination
    /// * `Err(SourceError)` - Transfer or post-processing failed
    fn download(&self, request: &DownloadRequest, progress: &ProgressCallback) -> Result<PathBuf>;
}
