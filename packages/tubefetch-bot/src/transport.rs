//! Messaging transport contract

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;
use tubefetch_cache::RemoteHandle;
use tubefetch_source::MediaKind;

pub type UserId = i64;

/// A message previously posted by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub user: UserId,
    pub id: i64,
}

impl MessageRef {
    pub fn new(user: UserId, id: i64) -> Self {
        Self { user, id }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    /// Payload echoed back in [`Inbound::Button`]
    pub data: String,
}

impl Button {
    pub fn new(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            data: data.into(),
        }
    }
}

/// Inline keyboard, row by row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row(mut self, buttons: Vec<Button>) -> Self {
        self.rows.push(buttons);
        self
    }

    pub fn buttons(&self) -> impl Iterator<Item = &Button> {
        self.rows.iter().flatten()
    }
}

/// Events delivered by the transport, tagged with the sender
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Text {
        user: UserId,
        text: String,
    },
    Button {
        user: UserId,
        /// Message carrying the pressed keyboard
        message: MessageRef,
        data: String,
    },
}

impl Inbound {
    pub fn user(&self) -> UserId {
        match self {
            Inbound::Text { user, .. } | Inbound::Button { user, .. } => *user,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaPayload {
    /// Upload a local file
    File(PathBuf),
    /// Resend a previously delivered artifact
    Remote(RemoteHandle),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMedia {
    pub user: UserId,
    pub kind: MediaKind,
    pub payload: MediaPayload,
    pub caption: String,
    pub title: String,
}

/// Upload progress callback: `(bytes sent, total bytes)`
pub type UploadProgress = Box<dyn Fn(u64, u64) + Send + Sync>;

#[derive(Debug, Error)]
pub enum TransportError {
    /// The remote side refused the request (stale handle, bad message, ...)
    #[error("Rejected by transport: {0}")]
    Rejected(String),

    #[error("Transport unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;

#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn send_text(
        &self,
        user: UserId,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<MessageRef>;

    /// Replace a message's text; `None` removes any keyboard
    async fn edit_text(
        &self,
        message: MessageRef,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<()>;

    async fn delete_message(&self, message: MessageRef) -> Result<()>;

    /// Deliver an artifact and return the handle for resending it later
    async fn send_media(
        &self,
        media: OutboundMedia,
        progress: Option<UploadProgress>,
    ) -> Result<RemoteHandle>;
}
