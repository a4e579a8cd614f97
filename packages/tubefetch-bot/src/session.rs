//! Per-user selection state
//!
//! `Idle -> LinkCaptured -> MetadataReady -> (consumed)`. Terminal outcomes
//! remove the record, so "Idle" is simply the absence of a session.

use crate::transport::UserId;
use std::collections::HashMap;
use tracing::debug;
use tubefetch_source::{MetadataDocument, SourceLink};

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// Metadata fetch in flight
    LinkCaptured,
    /// Variants are on offer
    MetadataReady(MetadataDocument),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub link: SourceLink,
    /// Distinguishes this session from earlier ones of the same user
    pub generation: u64,
    pub state: SessionState,
}

/// A session consumed by a variant selection
#[derive(Debug, Clone, PartialEq)]
pub struct ReadySession {
    pub link: SourceLink,
    pub metadata: MetadataDocument,
}

/// At most one live session per user, last write wins
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<UserId, Session>,
    next_generation: u64,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session for a freshly classified link, replacing any other
    pub fn capture(&mut self, user: UserId, link: SourceLink) -> u64 {
        self.next_generation += 1;
        let generation = self.next_generation;
        let previous = self.sessions.insert(
            user,
            Session {
                link,
                generation,
                state: SessionState::LinkCaptured,
            },
        );
        if let Some(previous) = previous {
            debug!(user, replaced = previous.generation, "session replaced by a new link");
        }
        generation
    }

    /// Record fetched metadata; `false` when the session has moved on
    pub fn metadata_ready(
        &mut self,
        user: UserId,
        generation: u64,
        metadata: MetadataDocument,
    ) -> bool {
        match self.sessions.get_mut(&user) {
            Some(session)
                if session.generation == generation
                    && session.state == SessionState::LinkCaptured =>
            {
                session.state = SessionState::MetadataReady(metadata);
                true
            }
            _ => false,
        }
    }

    /// Consume the user's session if variants are on offer
    ///
    /// A session still waiting for metadata is left in place.
    pub fn take_ready(&mut self, user: UserId) -> Option<ReadySession> {
        if !matches!(
            self.sessions.get(&user).map(|s| &s.state),
            Some(SessionState::MetadataReady(_))
        ) {
            return None;
        }
        match self.sessions.remove(&user)? {
            Session {
                link,
                state: SessionState::MetadataReady(metadata),
                ..
            } => Some(ReadySession { link, metadata }),
            Session { .. } => None,
        }
    }

    /// Drop the session of a failed fetch, unless a newer one replaced it
    pub fn fail(&mut self, user: UserId, generation: u64) -> Option<Session> {
        if self.is_current(user, generation) {
            self.sessions.remove(&user)
        } else {
            None
        }
    }

    pub fn cancel(&mut self, user: UserId) -> Option<Session> {
        self.sessions.remove(&user)
    }

    pub fn is_current(&self, user: UserId, generation: u64) -> bool {
        self.sessions
            .get(&user)
            .is_some_and(|session| session.generation == generation)
    }

    pub fn get(&self, user: UserId) -> Option<&Session> {
        self.sessions.get(&user)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tubefetch_source::classify;

    fn link(id: &str) -> SourceLink {
        classify(&format!("https://youtu.be/{}", id)).unwrap()
    }

    fn doc(title: &str) -> MetadataDocument {
        MetadataDocument {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_happy_path() {
        let mut store = SessionStore::new();
        let generation = store.capture(1, link("aaaaaaaaaaa"));
        assert_eq!(store.get(1).unwrap().state, SessionState::LinkCaptured);

        // Not selectable before metadata arrives
        assert!(store.take_ready(1).is_none());
        assert_eq!(store.len(), 1);

        assert!(store.metadata_ready(1, generation, doc("A")));
        let ready = store.take_ready(1).unwrap();
        assert_eq!(ready.metadata.title.as_deref(), Some("A"));
        assert_eq!(ready.link.video_id.as_deref(), Some("aaaaaaaaaaa"));

        // Consumed
        assert!(store.is_empty());
        assert!(store.take_ready(1).is_none());
    }

    #[test]
    fn test_new_link_discards_previous_session() {
        let mut store = SessionStore::new();
        let first = store.capture(1, link("aaaaaaaaaaa"));
        let second = store.capture(1, link("bbbbbbbbbbb"));
        assert_ne!(first, second);

        // The first fetch completes late and is ignored
        assert!(!store.metadata_ready(1, first, doc("A")));
        assert!(store.fail(1, first).is_none());
        assert!(store.is_current(1, second));

        assert!(store.metadata_ready(1, second, doc("B")));
        assert_eq!(
            store.take_ready(1).unwrap().link.video_id.as_deref(),
            Some("bbbbbbbbbbb")
        );
    }

    #[test]
    fn test_failure_and_cancel_remove_session() {
        let mut store = SessionStore::new();
        let generation = store.capture(1, link("aaaaaaaaaaa"));
        assert!(store.fail(1, generation).is_some());
        assert!(store.get(1).is_none());

        store.capture(2, link("aaaaaaaaaaa"));
        assert!(store.cancel(2).is_some());
        assert!(store.cancel(2).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_users_are_independent() {
        let mut store = SessionStore::new();
        let g1 = store.capture(1, link("aaaaaaaaaaa"));
        store.capture(2, link("bbbbbbbbbbb"));

        assert!(store.metadata_ready(1, g1, doc("A")));
        assert!(store.take_ready(2).is_none());
        assert!(store.take_ready(1).is_some());
        assert_eq!(store.len(), 1);
    }
}
