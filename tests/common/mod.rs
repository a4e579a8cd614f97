//! In-memory source and transport driving the coordinator in tests

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tubefetch::bot::transport::Result as TransportResult;
use tubefetch::bot::{
    Coordinator, CoordinatorHandle, CoordinatorSnapshot, Keyboard, MediaPayload, MessageRef,
    OutboundMedia, Transport, TransportError, UploadProgress, UserId,
};
use tubefetch::cache::RemoteHandle;
use tubefetch::config::AppConfig;
use tubefetch::source::{
    DownloadRequest, MediaSource, MetadataDocument, ProgressCallback, ProgressEvent,
    ProgressSnapshot, SourceError,
};

pub const LINK: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";
pub const OTHER_LINK: &str = "https://youtu.be/aaaaaaaaaaa";

/// Media source writing `artifact_size` bytes per download
pub struct MockSource {
    pub artifact_size: AtomicU64,
    pub progress_events: AtomicUsize,
    pub fail_probe: AtomicBool,
    /// Abort transfers after leaving a partial fragment behind
    pub fail_download: AtomicBool,
    pub metadata_delay: Mutex<Duration>,
    pub probes: AtomicUsize,
    pub requests: Mutex<Vec<DownloadRequest>>,
}

impl MockSource {
    pub fn new(artifact_size: u64) -> Self {
        Self {
            artifact_size: AtomicU64::new(artifact_size),
            progress_events: AtomicUsize::new(0),
            fail_probe: AtomicBool::new(false),
            fail_download: AtomicBool::new(false),
            metadata_delay: Mutex::new(Duration::ZERO),
            probes: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<DownloadRequest> {
        self.requests.lock().clone()
    }
}

impl MediaSource for MockSource {
    fn name(&self) -> &str {
        "mock"
    }

    fn probe(&self, _url: &str) -> tubefetch::source::Result<MetadataDocument> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        let delay = *self.metadata_delay.lock();
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        if self.fail_probe.load(Ordering::SeqCst) {
            return Err(SourceError::Extraction("ERROR: Video unavailable".to_string()));
        }
        Ok(MetadataDocument {
            title: Some("Never Gonna Give You Up".to_string()),
            duration: Some(213.0),
            channel: Some("Rick Astley".to_string()),
            uploader: None,
            view_count: Some(1_500_000_000),
            ..Default::default()
        })
    }

    fn download(
        &self,
        request: &DownloadRequest,
        progress: &ProgressCallback,
    ) -> tubefetch::source::Result<PathBuf> {
        self.requests.lock().push(request.clone());

        let size = self.artifact_size.load(Ordering::SeqCst);
        for step in 1..=self.progress_events.load(Ordering::SeqCst) as u64 {
            progress(ProgressEvent::Transferring(ProgressSnapshot::new(
                size * step / 20,
                Some(size),
            )));
        }

        if self.fail_download.load(Ordering::SeqCst) {
            std::fs::write(request.destination.with_extension("f137.mp4.part"), b"partial")?;
            return Err(SourceError::Transfer(
                "ERROR: unable to download video data: HTTP Error 403: Forbidden".to_string(),
            ));
        }

        let output = request.expected_output("mp3");
        std::fs::write(&output, vec![0u8; size as usize])?;
        Ok(output)
    }
}

#[derive(Debug, Clone)]
pub enum Event {
    Sent {
        message: MessageRef,
        text: String,
        keyboard: Option<Keyboard>,
    },
    Edited {
        message: MessageRef,
        text: String,
        keyboard: Option<Keyboard>,
    },
    Deleted(MessageRef),
    Media {
        media: OutboundMedia,
        handle: RemoteHandle,
    },
}

/// Transport recording everything the coordinator does
#[derive(Default)]
pub struct MockTransport {
    next_id: AtomicI64,
    handles: AtomicUsize,
    events: Mutex<Vec<Event>>,
    issued: Mutex<HashSet<RemoteHandle>>,
    /// Refuse every resend by handle
    pub reject_resend: AtomicBool,
}

impl MockTransport {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    /// Messages that carried the variant keyboard, oldest first
    pub fn keyboards(&self, user: UserId) -> Vec<MessageRef> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                Event::Sent {
                    message,
                    keyboard: Some(_),
                    ..
                }
                | Event::Edited {
                    message,
                    keyboard: Some(_),
                    ..
                } if message.user == user => Some(*message),
                _ => None,
            })
            .collect()
    }

    /// Every text sent or edited in
    pub fn texts(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                Event::Sent { text, .. } | Event::Edited { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn has_text(&self, expected: &str) -> bool {
        self.texts().iter().any(|text| text.contains(expected))
    }

    pub fn deliveries(&self) -> Vec<(OutboundMedia, RemoteHandle)> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                Event::Media { media, handle } => Some((media.clone(), handle.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn deleted(&self) -> Vec<MessageRef> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                Event::Deleted(message) => Some(*message),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send_text(
        &self,
        user: UserId,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> TransportResult<MessageRef> {
        let message = MessageRef::new(user, self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.events.lock().push(Event::Sent {
            message,
            text: text.to_string(),
            keyboard,
        });
        Ok(message)
    }

    async fn edit_text(
        &self,
        message: MessageRef,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> TransportResult<()> {
        self.events.lock().push(Event::Edited {
            message,
            text: text.to_string(),
            keyboard,
        });
        Ok(())
    }

    async fn delete_message(&self, message: MessageRef) -> TransportResult<()> {
        self.events.lock().push(Event::Deleted(message));
        Ok(())
    }

    async fn send_media(
        &self,
        media: OutboundMedia,
        _progress: Option<UploadProgress>,
    ) -> TransportResult<RemoteHandle> {
        let handle = match &media.payload {
            MediaPayload::File(path) => {
                if !path.is_file() {
                    return Err(TransportError::Rejected(format!(
                        "no such file {}",
                        path.display()
                    )));
                }
                let handle = RemoteHandle::new(format!(
                    "file-{}",
                    self.handles.fetch_add(1, Ordering::SeqCst)
                ));
                self.issued.lock().insert(handle.clone());
                handle
            }
            MediaPayload::Remote(handle) => {
                if self.reject_resend.load(Ordering::SeqCst) || !self.issued.lock().contains(handle)
                {
                    return Err(TransportError::Rejected("wrong file identifier".to_string()));
                }
                handle.clone()
            }
        };
        self.events.lock().push(Event::Media {
            media,
            handle: handle.clone(),
        });
        Ok(handle)
    }
}

pub fn config(dir: &Path) -> AppConfig {
    AppConfig::new()
        .with_download_dir(dir)
        .with_workers(2, 1)
        .with_fetch_timeout(Duration::from_secs(5))
}

pub struct Harness {
    pub source: Arc<MockSource>,
    pub transport: Arc<MockTransport>,
    pub handle: CoordinatorHandle,
}

impl Harness {
    pub fn start(config: &AppConfig, source: MockSource) -> Self {
        let source = Arc::new(source);
        let transport = Arc::new(MockTransport::default());
        let (coordinator, handle) = Coordinator::new(config, source.clone(), transport.clone());
        coordinator.spawn();
        Self {
            source,
            transport,
            handle,
        }
    }

    pub async fn snapshot(&self) -> CoordinatorSnapshot {
        self.handle.snapshot().await.expect("coordinator is running")
    }

    /// Send `link` and wait for the variant keyboard it produces
    pub async fn offer(&self, user: UserId, link: &str) -> MessageRef {
        let before = self.transport.keyboards(user).len();
        assert!(self.handle.text(user, link));
        eventually(|| self.transport.keyboards(user).len() > before).await;
        *self
            .transport
            .keyboards(user)
            .last()
            .expect("keyboard was posted")
    }

    /// Select `payload` on a freshly offered card and wait for the job to end
    pub async fn request(&self, user: UserId, link: &str, payload: &str) -> MessageRef {
        let card = self.offer(user, link).await;
        assert!(self.handle.press(user, card, payload));
        self.settle().await;
        card
    }

    /// Wait until no request is in flight
    pub async fn settle(&self) {
        for _ in 0..500 {
            if self.snapshot().await.active_jobs == 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("requests did not settle");
    }
}

/// Poll `condition` for up to five seconds
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met in time");
}

pub fn files_in(dir: &Path) -> Vec<PathBuf> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries.flatten().map(|entry| entry.path()).collect(),
        Err(_) => Vec::new(),
    }
}
