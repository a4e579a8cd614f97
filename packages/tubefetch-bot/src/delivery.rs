use crate::transport::{MediaPayload, OutboundMedia, Transport, TransportError, UploadProgress};
use thiserror::Error;
use tubefetch_cache::RemoteHandle;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Artifact is {size} bytes, over the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Artifact unreadable: {0}")]
    Io(#[from] std::io::Error),
}

/// Send `media`, re-checking the size ceiling first when it is a local file
pub(crate) async fn deliver(
    transport: &dyn Transport,
    media: OutboundMedia,
    limit: u64,
    progress: Option<UploadProgress>,
) -> Result<RemoteHandle, DeliveryError> {
    if let MediaPayload::File(path) = &media.payload {
        let size = tokio::fs::metadata(path).await?.len();
        if size > limit {
            return Err(DeliveryError::TooLarge { size, limit });
        }
    }
    Ok(transport.send_media(media, progress).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{Keyboard, MessageRef, Result, UserId};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tubefetch_source::MediaKind;

    #[derive(Default)]
    struct CountingTransport {
        sent: AtomicUsize,
    }

    #[async_trait]
    impl Transport for CountingTransport {
        async fn send_text(&self, user: UserId, _: &str, _: Option<Keyboard>) -> Result<MessageRef> {
            Ok(MessageRef::new(user, 1))
        }

        async fn edit_text(&self, _: MessageRef, _: &str, _: Option<Keyboard>) -> Result<()> {
            Ok(())
        }

        async fn delete_message(&self, _: MessageRef) -> Result<()> {
            Ok(())
        }

        async fn send_media(
            &self,
            _: OutboundMedia,
            _: Option<UploadProgress>,
        ) -> Result<RemoteHandle> {
            self.sent.fetch_add(1, Ordering::SeqCst);
            Ok(RemoteHandle::new("sent"))
        }
    }

    fn media(payload: MediaPayload) -> OutboundMedia {
        OutboundMedia {
            user: 1,
            kind: MediaKind::Video,
            payload,
            caption: String::new(),
            title: String::new(),
        }
    }

    #[tokio::test]
    async fn test_size_ceiling_checked_before_sending() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, vec![0u8; 100]).unwrap();
        let transport = CountingTransport::default();

        let result = deliver(&transport, media(MediaPayload::File(path.clone())), 99, None).await;
        assert!(matches!(result, Err(DeliveryError::TooLarge { size: 100, limit: 99 })));
        assert_eq!(transport.sent.load(Ordering::SeqCst), 0);

        let handle = tokio_test::assert_ok!(
            deliver(&transport, media(MediaPayload::File(path)), 100, None).await
        );
        assert_eq!(handle, RemoteHandle::new("sent"));
        assert_eq!(transport.sent.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_file_and_remote_payloads() {
        let dir = tempfile::tempdir().unwrap();
        let transport = CountingTransport::default();

        let missing = deliver(&transport, media(MediaPayload::File(dir.path().join("gone"))), 10, None).await;
        assert!(matches!(missing, Err(DeliveryError::Io(_))));

        // Handles carry no size to check
        tokio_test::assert_ok!(
            deliver(&transport, media(MediaPayload::Remote(RemoteHandle::new("h"))), 0, None).await
        );
    }
}
