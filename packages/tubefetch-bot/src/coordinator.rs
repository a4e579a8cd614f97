//! The coordinating loop
//!
//! A single task owns the session store, both cache tiers and the job table.
//! Every handler runs synchronously to completion; anything that touches
//! the network or the disk is spawned and reports back through the loop's
//! own channel as a [`LoopMessage`]. Because only this task ever mutates
//! the maps, no locking is needed around them.

use crate::delivery::{deliver, DeliveryError};
use crate::handle::CoordinatorHandle;
use crate::messages::{CoordinatorSnapshot, JobId, LoopMessage};
use crate::progress::ProgressReporter;
use crate::render;
use crate::session::SessionStore;
use crate::transport::{
    Inbound, Keyboard, MediaPayload, MessageRef, OutboundMedia, Transport, TransportError, UserId,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use tubefetch_cache::{ArtifactStore, DualTierCache, LocalLookup, OutputId, RemoteHandle};
use tubefetch_config::AppConfig;
use tubefetch_downloader::{DownloadDispatcher, DownloadError, DownloadTask, MetadataFetcher};
use tubefetch_source::{classify, MediaSource, MetadataDocument, RequestFingerprint, Variant};
use tubefetch_utils::truncate_chars;

/// A request between variant selection and its terminal outcome
struct Job {
    user: UserId,
    /// Status message edited through the request's lifecycle
    status: MessageRef,
    variant: Variant,
    fingerprint: RequestFingerprint,
    title: String,
    /// Set once a download has been allocated
    output: Option<OutputId>,
}

impl Job {
    fn media(&self, payload: MediaPayload) -> OutboundMedia {
        OutboundMedia {
            user: self.user,
            kind: self.fingerprint.kind,
            payload,
            caption: render::caption(self.fingerprint.kind, &self.title),
            title: self.title.clone(),
        }
    }
}

pub struct Coordinator {
    transport: Arc<dyn Transport>,
    fetcher: MetadataFetcher,
    dispatcher: DownloadDispatcher,
    store: ArtifactStore,
    reporter: ProgressReporter,

    sessions: SessionStore,
    cache: DualTierCache,
    jobs: HashMap<JobId, Job>,
    next_job: JobId,

    max_upload_bytes: u64,
    fetch_diagnostic_limit: usize,
    download_diagnostic_limit: usize,

    sender: mpsc::UnboundedSender<LoopMessage>,
    receiver: mpsc::UnboundedReceiver<LoopMessage>,
}

impl Coordinator {
    pub fn new(
        config: &AppConfig,
        source: Arc<dyn MediaSource>,
        transport: Arc<dyn Transport>,
    ) -> (Self, CoordinatorHandle) {
        let (sender, receiver) = mpsc::unbounded_channel();

        let coordinator = Self {
            transport,
            fetcher: MetadataFetcher::from_config(source.clone(), config),
            dispatcher: DownloadDispatcher::from_config(source, config),
            store: ArtifactStore::new(&config.download_dir),
            reporter: ProgressReporter::new(config.progress_interval(), sender.clone()),
            sessions: SessionStore::new(),
            cache: DualTierCache::from_config(config),
            jobs: HashMap::new(),
            next_job: 1,
            max_upload_bytes: config.max_upload_bytes,
            fetch_diagnostic_limit: config.fetch_diagnostic_limit,
            download_diagnostic_limit: config.download_diagnostic_limit,
            sender: sender.clone(),
            receiver,
        };

        (coordinator, CoordinatorHandle::new(sender))
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Sweep the artifact directory, then serve until shut down
    ///
    /// Messages submitted before the sweep finishes wait in the channel.
    pub async fn run(mut self) {
        match self.store.sweep().await {
            Ok(removed) => info!(
                "Startup sweep removed {} entries from {}",
                removed,
                self.store.dir().display()
            ),
            Err(e) => warn!(
                "Startup sweep of {} failed: {}",
                self.store.dir().display(),
                e
            ),
        }

        while let Some(message) = self.receiver.recv().await {
            if matches!(message, LoopMessage::Shutdown) {
                info!("Coordinator shutting down");
                break;
            }
            self.handle(message);
        }
    }

    fn handle(&mut self, message: LoopMessage) {
        match message {
            LoopMessage::Inbound(Inbound::Text { user, text }) => self.on_text(user, &text),
            LoopMessage::Inbound(Inbound::Button {
                user,
                message,
                data,
            }) => self.on_button(user, message, &data),
            LoopMessage::StatusUpdate { message, text } => self.on_status_update(message, text),
            LoopMessage::FetchFinished {
                user,
                generation,
                status,
                result,
            } => self.on_fetch_finished(user, generation, status, result),
            LoopMessage::ResendFinished { job, result } => self.on_resend_finished(job, result),
            LoopMessage::LocalDeliveryFinished { job, result } => {
                self.on_local_delivery_finished(job, result)
            }
            LoopMessage::DownloadFinished { job, result } => self.on_download_finished(job, result),
            LoopMessage::UploadFinished { job, result } => self.on_upload_finished(job, result),
            LoopMessage::Inspect(reply) => {
                let _ = reply.send(self.snapshot());
            }
            LoopMessage::Shutdown => {}
        }
    }

    /// Progress edits only land on the status message of a running job
    fn on_status_update(&mut self, message: MessageRef, text: String) {
        if self.jobs.values().any(|job| job.status == message) {
            self.spawn_edit(message, text, None);
        } else {
            debug!(?message, "dropping progress update for a finished job");
            self.reporter.release(message);
        }
    }

    fn snapshot(&self) -> CoordinatorSnapshot {
        CoordinatorSnapshot {
            sessions: self.sessions.len(),
            remote_entries: self.cache.remote.len(),
            local_entries: self.cache.local.len(),
            active_jobs: self.jobs.len(),
            downloads_dispatched: self.dispatcher.dispatched(),
        }
    }

    // ---------------- Inbound ----------------

    fn on_text(&mut self, user: UserId, text: &str) {
        let text = text.trim();
        match command(text) {
            Some("start") => return self.spawn_send(user, render::START, None),
            Some("help") => return self.spawn_send(user, render::HELP, None),
            _ => {}
        }

        let Some(link) = classify(text) else {
            debug!(user, "message is not a supported link");
            return self.spawn_send(user, render::NOT_A_LINK, None);
        };

        info!(user, url = %link.canonical, "link received");
        let generation = self.sessions.capture(user, link.clone());

        let transport = self.transport.clone();
        let fetcher = self.fetcher.clone();
        let sender = self.sender.clone();
        tokio::spawn(async move {
            let status = match transport.send_text(user, render::FETCHING, None).await {
                Ok(message) => Some(message),
                Err(e) => {
                    warn!(user, "Failed to post status message: {}", e);
                    None
                }
            };
            let result = fetcher.fetch(&link.canonical).await;
            let _ = sender.send(LoopMessage::FetchFinished {
                user,
                generation,
                status,
                result,
            });
        });
    }

    fn on_fetch_finished(
        &mut self,
        user: UserId,
        generation: u64,
        status: Option<MessageRef>,
        result: Result<MetadataDocument, DownloadError>,
    ) {
        match result {
            Ok(metadata) => {
                let card = render::metadata_card(&metadata);
                if !self.sessions.metadata_ready(user, generation, metadata) {
                    debug!(user, generation, "dropping metadata of a replaced session");
                    return;
                }
                self.spawn_show(user, status, card, Some(render::variant_keyboard()));
            }
            Err(err) => {
                error!(user, "Metadata fetch failed: {}", err);
                if self.sessions.fail(user, generation).is_none() {
                    debug!(user, generation, "dropping failure of a replaced session");
                    return;
                }
                let text = if err.is_timeout() {
                    render::FETCH_TIMEOUT.to_string()
                } else {
                    render::fetch_failed(&err.truncated(self.fetch_diagnostic_limit))
                };
                self.spawn_show(user, status, text, None);
            }
        }
    }

    fn on_button(&mut self, user: UserId, message: MessageRef, data: &str) {
        if data == render::CANCEL {
            if self.sessions.cancel(user).is_some() {
                info!(user, "session cancelled");
            }
            return self.spawn_edit(message, render::CANCELLED, None);
        }

        let Some(variant) = Variant::parse(data) else {
            warn!(user, data, "unknown button payload");
            return;
        };

        let Some(ready) = self.sessions.take_ready(user) else {
            return self.spawn_edit(message, render::RESEND_LINK, None);
        };

        let job_id = self.next_job;
        self.next_job += 1;

        let fingerprint = RequestFingerprint::for_variant(ready.link.canonical.as_str(), &variant);
        info!(user, job = job_id, fingerprint = %fingerprint, "variant selected");

        self.jobs.insert(
            job_id,
            Job {
                user,
                status: message,
                variant,
                fingerprint,
                title: ready.metadata.title_or("video").to_string(),
                output: None,
            },
        );
        self.try_remote(job_id);
    }

    // ---------------- Tier 1: remote handle ----------------

    fn try_remote(&mut self, job_id: JobId) {
        let Some(job) = self.jobs.get(&job_id) else {
            return;
        };
        let Some(handle) = self.cache.remote.get(&job.fingerprint).cloned() else {
            return self.try_local(job_id);
        };

        info!(job = job_id, fingerprint = %job.fingerprint, "remote cache hit");
        let media = job.media(MediaPayload::Remote(handle));
        let transport = self.transport.clone();
        let sender = self.sender.clone();
        tokio::spawn(async move {
            let result = transport.send_media(media, None).await;
            let _ = sender.send(LoopMessage::ResendFinished { job: job_id, result });
        });
    }

    fn on_resend_finished(&mut self, job_id: JobId, result: Result<RemoteHandle, TransportError>) {
        let Some(fingerprint) = self.fingerprint_of(job_id) else {
            return;
        };
        match result {
            Ok(handle) => {
                self.cache.remote.insert(fingerprint, handle);
                self.finish_delivered(job_id);
            }
            Err(e) => {
                warn!(job = job_id, fingerprint = %fingerprint, "Resend by handle failed, evicting: {}", e);
                self.cache.remote.evict(&fingerprint);
                self.try_local(job_id);
            }
        }
    }

    // ---------------- Tier 2: local artifact ----------------

    fn try_local(&mut self, job_id: JobId) {
        let Some(fingerprint) = self.fingerprint_of(job_id) else {
            return;
        };

        match self.cache.local.lookup(&fingerprint) {
            LocalLookup::Hit(entry) => {
                let Some(job) = self.jobs.get(&job_id) else {
                    return;
                };
                info!(job = job_id, path = %entry.path.display(), "local cache hit");

                let status = job.status;
                let media = job.media(MediaPayload::File(entry.path));
                let progress = self.reporter.upload_sink(status);
                let limit = self.max_upload_bytes;
                let transport = self.transport.clone();
                let sender = self.sender.clone();
                tokio::spawn(async move {
                    if let Err(e) = transport.edit_text(status, render::FOUND_IN_CACHE, None).await {
                        debug!("Status edit failed: {}", e);
                    }
                    let result = deliver(transport.as_ref(), media, limit, Some(progress)).await;
                    let _ = sender.send(LoopMessage::LocalDeliveryFinished { job: job_id, result });
                });
            }
            LocalLookup::Evicted(entry, reason) => {
                info!(
                    job = job_id,
                    reason = ?reason,
                    path = %entry.path.display(),
                    "local cache entry evicted"
                );
                self.purge_unreferenced(entry.output_id);
                self.start_download(job_id);
            }
            LocalLookup::Miss => self.start_download(job_id),
        }
    }

    fn on_local_delivery_finished(
        &mut self,
        job_id: JobId,
        result: Result<RemoteHandle, DeliveryError>,
    ) {
        let Some(fingerprint) = self.fingerprint_of(job_id) else {
            return;
        };
        match result {
            Ok(handle) => {
                self.cache.remote.insert(fingerprint, handle);
                self.finish_delivered(job_id);
            }
            Err(DeliveryError::TooLarge { size, limit }) => {
                warn!(job = job_id, size, limit, "cached artifact exceeds the size ceiling");
                if let Some(entry) = self.cache.local.remove(&fingerprint) {
                    self.purge_unreferenced(entry.output_id);
                }
                self.fail(job_id, render::too_large(size, limit));
            }
            Err(e) => {
                warn!(job = job_id, "Sending the cached artifact failed, downloading again: {}", e);
                self.start_download(job_id);
            }
        }
    }

    // ---------------- Tier 3: download ----------------

    fn start_download(&mut self, job_id: JobId) {
        let Some(job) = self.jobs.get_mut(&job_id) else {
            return;
        };

        let (output_id, destination) = self.store.allocate(job.user, job.fingerprint.kind);
        info!(job = job_id, output = %output_id, "starting download");
        job.output = Some(output_id);

        let status = job.status;
        let started = render::download_started(&job.variant);
        let task = DownloadTask::new(
            job.fingerprint.clone(),
            destination,
            self.reporter.download_sink(status),
        );

        let transport = self.transport.clone();
        let dispatcher = self.dispatcher.clone();
        let sender = self.sender.clone();
        tokio::spawn(async move {
            if let Err(e) = transport.edit_text(status, &started, None).await {
                debug!("Status edit failed: {}", e);
            }
            let result = async {
                let path = dispatcher.download(task).await?;
                let size = tokio::fs::metadata(&path).await?.len();
                Ok::<_, DownloadError>((path, size))
            }
            .await;
            let _ = sender.send(LoopMessage::DownloadFinished { job: job_id, result });
        });
    }

    fn on_download_finished(&mut self, job_id: JobId, result: Result<(PathBuf, u64), DownloadError>) {
        let Some(job) = self.jobs.get(&job_id) else {
            return;
        };
        let fingerprint = job.fingerprint.clone();
        let output = job.output.clone();

        let (path, size) = match result {
            Ok((_, size)) if size > self.max_upload_bytes => {
                warn!(job = job_id, size, "artifact exceeds the size ceiling");
                return self.fail(job_id, render::too_large(size, self.max_upload_bytes));
            }
            Ok(artifact) => artifact,
            Err(err) => {
                error!(job = job_id, fingerprint = %fingerprint, "Download failed: {}", err);
                let diagnostic = err.truncated(self.download_diagnostic_limit);
                return self.fail(job_id, render::download_failed(&diagnostic));
            }
        };

        info!(job = job_id, path = %path.display(), size, "download complete");
        if let Some(output_id) = output {
            if let Some(displaced) = self.cache.local.insert(fingerprint.clone(), &path, output_id) {
                // Two downloads of one fingerprint raced; the later one wins the slot
                warn!(
                    fingerprint = %fingerprint,
                    path = %displaced.path.display(),
                    "replacing local cache entry"
                );
                self.purge_unreferenced(displaced.output_id);
            }
        }

        let Some(job) = self.jobs.get(&job_id) else {
            return;
        };
        let status = job.status;
        let media = job.media(MediaPayload::File(path));
        let progress = self.reporter.upload_sink(status);
        let transport = self.transport.clone();
        let sender = self.sender.clone();
        tokio::spawn(async move {
            if let Err(e) = transport.edit_text(status, &render::uploading(size), None).await {
                debug!("Status edit failed: {}", e);
            }
            let result = transport.send_media(media, Some(progress)).await;
            let _ = sender.send(LoopMessage::UploadFinished { job: job_id, result });
        });
    }

    fn on_upload_finished(&mut self, job_id: JobId, result: Result<RemoteHandle, TransportError>) {
        let Some(fingerprint) = self.fingerprint_of(job_id) else {
            return;
        };
        match result {
            Ok(handle) => {
                info!(job = job_id, fingerprint = %fingerprint, "delivered");
                self.cache.remote.insert(fingerprint, handle);
                self.finish_delivered(job_id);
            }
            Err(e) => {
                error!(job = job_id, fingerprint = %fingerprint, "Upload failed: {}", e);
                let diagnostic = truncate_chars(&e.to_string(), self.download_diagnostic_limit);
                self.fail(job_id, render::download_failed(&diagnostic));
            }
        }
    }

    // ---------------- Terminal outcomes ----------------

    fn finish_delivered(&mut self, job_id: JobId) {
        if let Some(status) = self.finish(job_id) {
            self.spawn_delete(status);
        }
    }

    fn fail(&mut self, job_id: JobId, text: String) {
        if let Some(status) = self.finish(job_id) {
            self.spawn_edit(status, text, None);
        }
    }

    /// Retire a job and return its status message
    ///
    /// The job leaves the table before any final edit is issued, so later
    /// progress updates for its status message are dropped.
    fn finish(&mut self, job_id: JobId) -> Option<MessageRef> {
        let job = self.jobs.remove(&job_id)?;
        debug!(job = job_id, "job finished");
        self.reporter.release(job.status);
        if let Some(output_id) = job.output {
            self.purge_unreferenced(output_id);
        }
        Some(job.status)
    }

    /// Remove an output's files unless a live local entry still points at them
    fn purge_unreferenced(&self, output_id: OutputId) {
        if self.cache.local.references(&output_id) {
            debug!(output = %output_id, "output is cached, keeping its files");
            return;
        }
        let store = self.store.clone();
        tokio::spawn(async move {
            match store.purge_prefix(&output_id).await {
                Ok(0) => {}
                Ok(removed) => info!(output = %output_id, removed, "purged artifacts"),
                Err(e) => warn!(output = %output_id, "Failed to purge artifacts: {}", e),
            }
        });
    }

    fn fingerprint_of(&self, job_id: JobId) -> Option<RequestFingerprint> {
        self.jobs.get(&job_id).map(|job| job.fingerprint.clone())
    }

    // ---------------- Fire-and-forget transport calls ----------------

    fn spawn_send(&self, user: UserId, text: impl Into<String>, keyboard: Option<Keyboard>) {
        let transport = self.transport.clone();
        let text = text.into();
        tokio::spawn(async move {
            if let Err(e) = transport.send_text(user, &text, keyboard).await {
                warn!(user, "Failed to send message: {}", e);
            }
        });
    }

    fn spawn_edit(&self, message: MessageRef, text: impl Into<String>, keyboard: Option<Keyboard>) {
        let transport = self.transport.clone();
        let text = text.into();
        tokio::spawn(async move {
            if let Err(e) = transport.edit_text(message, &text, keyboard).await {
                debug!(?message, "Status edit failed: {}", e);
            }
        });
    }

    /// Edit the status message if there is one, otherwise post a new message
    fn spawn_show(
        &self,
        user: UserId,
        status: Option<MessageRef>,
        text: impl Into<String>,
        keyboard: Option<Keyboard>,
    ) {
        match status {
            Some(message) => self.spawn_edit(message, text, keyboard),
            None => self.spawn_send(user, text, keyboard),
        }
    }

    fn spawn_delete(&self, message: MessageRef) {
        let transport = self.transport.clone();
        tokio::spawn(async move {
            if let Err(e) = transport.delete_message(message).await {
                debug!(?message, "Failed to delete status message: {}", e);
            }
        });
    }
}

/// `/start`, `/help@bot args` -> `start`, `help`
fn command(text: &str) -> Option<&str> {
    let name = text.strip_prefix('/')?.split_whitespace().next()?;
    Some(name.split('@').next().unwrap_or(name))
}
