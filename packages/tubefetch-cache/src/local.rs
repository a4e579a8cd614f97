use crate::storage::OutputId;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tubefetch_source::RequestFingerprint;

/// A downloaded artifact kept on disk for reuse
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalCacheEntry {
    pub path: PathBuf,
    /// Unique output id of the task that produced the file
    pub output_id: OutputId,
    pub created: Instant,
}

impl LocalCacheEntry {
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.created)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictReason {
    Expired,
    FileMissing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalLookup {
    Hit(LocalCacheEntry),
    Miss,
    /// The entry was invalid and has been removed from the tier
    Evicted(LocalCacheEntry, EvictReason),
}

/// Fingerprint -> local artifact, valid while `age <= ttl` and the file exists
///
/// Invalid entries are evicted lazily, on the lookup that finds them.
#[derive(Debug)]
pub struct LocalTier {
    ttl: Duration,
    entries: HashMap<RequestFingerprint, LocalCacheEntry>,
}

impl LocalTier {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn lookup(&mut self, fingerprint: &RequestFingerprint) -> LocalLookup {
        self.lookup_at(fingerprint, Instant::now())
    }

    pub fn lookup_at(&mut self, fingerprint: &RequestFingerprint, now: Instant) -> LocalLookup {
        let Some(entry) = self.entries.get(fingerprint) else {
            return LocalLookup::Miss;
        };

        let reason = if entry.age(now) > self.ttl {
            Some(EvictReason::Expired)
        } else if !entry.path.is_file() {
            Some(EvictReason::FileMissing)
        } else {
            None
        };

        match reason {
            None => LocalLookup::Hit(entry.clone()),
            Some(reason) => match self.entries.remove(fingerprint) {
                Some(entry) => LocalLookup::Evicted(entry, reason),
                None => LocalLookup::Miss,
            },
        }
    }

    /// Record an artifact, returning the entry it displaced, if any
    pub fn insert_at(
        &mut self,
        fingerprint: RequestFingerprint,
        path: impl AsRef<Path>,
        output_id: OutputId,
        now: Instant,
    ) -> Option<LocalCacheEntry> {
        let entry = LocalCacheEntry {
            path: path.as_ref().to_path_buf(),
            output_id,
            created: now,
        };
        self.entries
            .insert(fingerprint, entry)
            .filter(|previous| previous.path != path.as_ref())
    }

    pub fn insert(
        &mut self,
        fingerprint: RequestFingerprint,
        path: impl AsRef<Path>,
        output_id: OutputId,
    ) -> Option<LocalCacheEntry> {
        self.insert_at(fingerprint, path, output_id, Instant::now())
    }

    pub fn remove(&mut self, fingerprint: &RequestFingerprint) -> Option<LocalCacheEntry> {
        self.entries.remove(fingerprint)
    }

    pub fn contains(&self, fingerprint: &RequestFingerprint) -> bool {
        self.entries.contains_key(fingerprint)
    }

    /// Whether any live entry points at files of `output_id`
    pub fn references(&self, output_id: &OutputId) -> bool {
        self.entries.values().any(|entry| &entry.output_id == output_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
