//! Console transport: the terminal plays the chat
//!
//! Messages are printed with their id, keyboards are listed as
//! `press <data>` hints, and "uploads" copy the artifact into an outbox
//! directory.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tubefetch_bot::transport::Result;
use tubefetch_bot::{
    Keyboard, MediaPayload, MessageRef, OutboundMedia, Transport, TransportError, UploadProgress,
    UserId,
};
use tubefetch_cache::RemoteHandle;

const UPLOAD_CHUNK: usize = 1024 * 1024;

pub struct ConsoleTransport {
    outbox: PathBuf,
    next_message: AtomicI64,
    /// Handles this transport issued, with the outbox copy they stand for
    issued: Mutex<HashMap<RemoteHandle, PathBuf>>,
    /// Most recent message per user that carried a keyboard
    keyboards: Mutex<HashMap<UserId, MessageRef>>,
}

impl ConsoleTransport {
    pub fn new(outbox: impl Into<PathBuf>) -> Self {
        Self {
            outbox: outbox.into(),
            next_message: AtomicI64::new(1),
            issued: Mutex::new(HashMap::new()),
            keyboards: Mutex::new(HashMap::new()),
        }
    }

    pub fn outbox(&self) -> &Path {
        &self.outbox
    }

    /// Target of a `press` command
    pub fn last_keyboard(&self, user: UserId) -> Option<MessageRef> {
        self.keyboards.lock().get(&user).copied()
    }

    fn track_keyboard(&self, message: MessageRef, keyboard: Option<&Keyboard>) {
        let mut keyboards = self.keyboards.lock();
        match keyboard {
            Some(_) => {
                keyboards.insert(message.user, message);
            }
            // An edit without buttons retires the keyboard it replaced
            None if keyboards.get(&message.user) == Some(&message) => {
                keyboards.remove(&message.user);
            }
            None => {}
        }
    }

    async fn upload(&self, source: &Path, progress: Option<&UploadProgress>) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.outbox).await?;

        let file_name = source
            .file_name()
            .ok_or_else(|| TransportError::Rejected(format!("not a file: {}", source.display())))?;
        let target = self.outbox.join(file_name);

        let mut reader = tokio::fs::File::open(source).await?;
        let total = reader.metadata().await?.len();
        let mut writer = tokio::fs::File::create(&target).await?;

        let mut buffer = vec![0u8; UPLOAD_CHUNK];
        let mut sent = 0u64;
        loop {
            let read = reader.read(&mut buffer).await?;
            if read == 0 {
                break;
            }
            writer.write_all(&buffer[..read]).await?;
            sent += read as u64;
            if let Some(progress) = progress {
                progress(sent, total);
            }
        }
        writer.flush().await?;
        Ok(target)
    }
}

fn render(tag: &str, message: MessageRef, text: &str, keyboard: Option<&Keyboard>) {
    println!("[#{} {}] {}", message.id, tag, text);
    if let Some(keyboard) = keyboard {
        for row in &keyboard.rows {
            let hints: Vec<String> = row
                .iter()
                .map(|button| format!("{} (press {})", button.label, button.data))
                .collect();
            println!("    {}", hints.join(" | "));
        }
    }
}

#[async_trait]
impl Transport for ConsoleTransport {
    async fn send_text(
        &self,
        user: UserId,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<MessageRef> {
        let message = MessageRef::new(user, self.next_message.fetch_add(1, Ordering::SeqCst));
        render("new", message, text, keyboard.as_ref());
        self.track_keyboard(message, keyboard.as_ref());
        Ok(message)
    }

    async fn edit_text(
        &self,
        message: MessageRef,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<()> {
        render("edit", message, text, keyboard.as_ref());
        self.track_keyboard(message, keyboard.as_ref());
        Ok(())
    }

    async fn delete_message(&self, message: MessageRef) -> Result<()> {
        println!("[#{} deleted]", message.id);
        self.track_keyboard(message, None);
        Ok(())
    }

    async fn send_media(
        &self,
        media: OutboundMedia,
        progress: Option<UploadProgress>,
    ) -> Result<RemoteHandle> {
        match &media.payload {
            MediaPayload::File(path) => {
                let stored = self.upload(path, progress.as_ref()).await?;
                let handle = RemoteHandle::new(format!("console-{}", uuid::Uuid::new_v4().simple()));
                println!("[{} {}] {} -> {}", media.kind, handle, media.caption, stored.display());
                self.issued.lock().insert(handle.clone(), stored);
                Ok(handle)
            }
            MediaPayload::Remote(handle) => {
                let stored = self.issued.lock().get(handle).cloned();
                match stored {
                    Some(stored) => {
                        println!(
                            "[{} {}] {} -> {} (resent)",
                            media.kind,
                            handle,
                            media.caption,
                            stored.display()
                        );
                        Ok(handle.clone())
                    }
                    None => Err(TransportError::Rejected(format!(
                        "unknown media handle {}",
                        handle
                    ))),
                }
            }
        }
    }
}
