//! Dual-tier artifact cache
//!
//! Lookup order for a [`RequestFingerprint`]:
//! 1. [`RemoteTier`]: a handle from an earlier delivery, resendable without
//!    local I/O. Kept for the process lifetime unless a resend fails.
//! 2. [`LocalTier`]: a file on disk, valid for the configured TTL while the
//!    file still exists.
//! 3. Miss: the caller downloads, then fills both tiers.
//!
//! The cache holds no locks; it is owned by the coordinating loop, the only
//! writer. [`ArtifactStore`] owns the on-disk side (naming, purge, sweep).

mod local;
mod remote;
mod storage;

pub use local::{EvictReason, LocalCacheEntry, LocalLookup, LocalTier};
pub use remote::{RemoteHandle, RemoteTier};
pub use storage::{ArtifactStore, OutputId};

use std::time::Duration;
use tubefetch_config::AppConfig;
use tubefetch_source::RequestFingerprint;

#[derive(Debug)]
pub struct DualTierCache {
    pub remote: RemoteTier,
    pub local: LocalTier,
}

impl DualTierCache {
    pub fn new(local_ttl: Duration) -> Self {
        Self {
            remote: RemoteTier::new(),
            local: LocalTier::new(local_ttl),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.cache_ttl())
    }

    /// Whether either tier holds anything for `fingerprint` (no validation)
    pub fn contains(&self, fingerprint: &RequestFingerprint) -> bool {
        self.remote.get(fingerprint).is_some() || self.local.contains(fingerprint)
    }
}
