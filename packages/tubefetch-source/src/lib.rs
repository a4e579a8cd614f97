//! Media source abstraction
//!
//! Domain types shared by every other package (media kind, quality tag,
//! request fingerprint, metadata document, progress events), link
//! classification for the supported link family, and the blocking
//! [`MediaSource`] trait with its yt-dlp backed implementation.

mod error;
pub mod link;
pub mod media;
pub mod progress;
mod traits;
pub mod ytdlp;

pub use error::{Result, SourceError};
pub use link::{classify, SourceLink};
pub use media::{MediaKind, MetadataDocument, Quality, RequestFingerprint, Variant};
pub use progress::{Phase, ProgressCallback, ProgressEvent, ProgressSnapshot};
pub use traits::{DownloadRequest, MediaSource};
pub use ytdlp::YtDlpSource;
