use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tubefetch_source::RequestFingerprint;

/// Opaque identifier the transport assigns to a delivered artifact
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteHandle(String);

impl RemoteHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RemoteHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fingerprint -> handle of the last successful delivery. Entries never expire.
#[derive(Debug, Default)]
pub struct RemoteTier {
    handles: HashMap<RequestFingerprint, RemoteHandle>,
}

impl RemoteTier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, fingerprint: &RequestFingerprint) -> Option<&RemoteHandle> {
        self.handles.get(fingerprint)
    }

    pub fn insert(&mut self, fingerprint: RequestFingerprint, handle: RemoteHandle) {
        self.handles.insert(fingerprint, handle);
    }

    /// Drop a handle that failed on reuse
    pub fn evict(&mut self, fingerprint: &RequestFingerprint) -> Option<RemoteHandle> {
        self.handles.remove(fingerprint)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tubefetch_source::{MediaKind, Quality};

    #[test]
    fn test_quality_tags_do_not_share_slots() {
        let url = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";
        let low = RequestFingerprint::new(url, MediaKind::Video, Quality::new("360"));
        let high = RequestFingerprint::new(url, MediaKind::Video, Quality::new("1080"));

        let mut tier = RemoteTier::new();
        tier.insert(high.clone(), RemoteHandle::new("file-1080"));

        assert!(tier.get(&low).is_none());
        assert_eq!(tier.get(&high).map(RemoteHandle::as_str), Some("file-1080"));

        assert_eq!(tier.evict(&high), Some(RemoteHandle::new("file-1080")));
        assert!(tier.is_empty());
    }
}
