//! Artifact directory: per-task naming, prefix purge and startup sweep

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use tubefetch_source::MediaKind;
use tubefetch_utils::get_now_unix;
use uuid::Uuid;

/// Unique per-task prefix shared by every file a task produces
///
/// Format: `{owner}_{unix seconds}_{8 hex}`. The random suffix keeps two
/// tasks started by the same owner within the same second apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutputId(String);

impl OutputId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate(owner: impl fmt::Display) -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!("{}_{}_{}", owner, get_now_unix(), &suffix[..8]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `file_name` belongs to this output (`<id>` or `<id>.<anything>`)
    pub fn owns(&self, file_name: &str) -> bool {
        file_name
            .strip_prefix(self.0.as_str())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
    }
}

impl fmt::Display for OutputId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The single flat directory holding all in-flight and cached artifacts
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reserve a fresh output id and the destination path for it
    pub fn allocate(&self, owner: impl fmt::Display, kind: MediaKind) -> (OutputId, PathBuf) {
        let id = OutputId::generate(owner);
        let extension = match kind {
            MediaKind::Video => "mp4",
            MediaKind::Audio => "m4a",
        };
        let path = self.dir.join(format!("{}.{}", id, extension));
        (id, path)
    }

    pub async fn ensure_dir(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await
    }

    /// Delete every file whose name starts with the id's prefix
    ///
    /// Returns the number of files removed. Individual failures are logged
    /// and skipped.
    pub async fn purge_prefix(&self, id: &OutputId) -> io::Result<usize> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            if !id.owns(&name.to_string_lossy()) {
                continue;
            }
            match tokio::fs::remove_file(entry.path()).await {
                Ok(()) => {
                    debug!("Purged {}", entry.path().display());
                    removed += 1;
                }
                Err(e) => warn!("Failed to purge {}: {}", entry.path().display(), e),
            }
        }
        Ok(removed)
    }

    /// Remove everything in the directory, creating it if needed
    pub async fn sweep(&self) -> io::Result<usize> {
        self.ensure_dir().await?;

        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let result = if entry.file_type().await?.is_dir() {
                tokio::fs::remove_dir_all(&path).await
            } else {
                tokio::fs::remove_file(&path).await
            };
            match result {
                Ok(()) => removed += 1,
                Err(e) => warn!("Failed to remove {} during sweep: {}", path.display(), e),
            }
        }
        Ok(removed)
    }
}
