//! Throttled progress reporting from worker threads into the loop

use crate::messages::LoopMessage;
use crate::render;
use crate::transport::{MessageRef, UploadProgress};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::trace;
use tubefetch_source::{ProgressCallback, ProgressEvent, ProgressSnapshot};
use tubefetch_utils::RateLimiter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Download,
    Upload,
}

/// Throttling key: downloads and uploads on one message are limited separately
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgressKey {
    pub message: MessageRef,
    pub direction: Direction,
}

/// Turns raw progress events into status updates for the coordinating loop
///
/// Callbacks run on worker threads. A permitted event is rendered and
/// posted to the loop without waiting; the loop performs the edit and
/// ignores its failure.
#[derive(Clone)]
pub struct ProgressReporter {
    limiter: Arc<Mutex<RateLimiter<ProgressKey>>>,
    updates: mpsc::UnboundedSender<LoopMessage>,
}

impl ProgressReporter {
    pub(crate) fn new(interval: Duration, updates: mpsc::UnboundedSender<LoopMessage>) -> Self {
        Self {
            limiter: Arc::new(Mutex::new(RateLimiter::new(interval))),
            updates,
        }
    }

    pub fn report(&self, key: ProgressKey, event: &ProgressEvent) -> bool {
        self.report_at(Instant::now(), key, event)
    }

    /// Surface `event` if the key's interval has elapsed at `now`
    pub fn report_at(&self, now: Instant, key: ProgressKey, event: &ProgressEvent) -> bool {
        if !self.limiter.lock().check(now, key) {
            trace!(?key, phase = ?event.phase(), "progress throttled");
            return false;
        }
        let _ = self.updates.send(LoopMessage::StatusUpdate {
            message: key.message,
            text: render::progress(event),
        });
        true
    }

    /// Callback for a download reporting into `message`
    pub fn download_sink(&self, message: MessageRef) -> ProgressCallback {
        let reporter = self.clone();
        let key = ProgressKey {
            message,
            direction: Direction::Download,
        };
        Box::new(move |event| {
            reporter.report(key, &event);
        })
    }

    /// Callback for an upload reporting into `message`
    pub fn upload_sink(&self, message: MessageRef) -> UploadProgress {
        let reporter = self.clone();
        let key = ProgressKey {
            message,
            direction: Direction::Upload,
        };
        Box::new(move |current, total| {
            let event = ProgressEvent::Uploading(ProgressSnapshot::new(current, Some(total)));
            reporter.report(key, &event);
        })
    }

    /// Forget throttling state of a finished request
    pub fn release(&self, message: MessageRef) {
        self.limiter.lock().forget_where(|key| key.message == message);
    }

    pub fn tracked_keys(&self) -> usize {
        self.limiter.lock().tracked_keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reporter(interval: Duration) -> (ProgressReporter, mpsc::UnboundedReceiver<LoopMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ProgressReporter::new(interval, tx), rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<LoopMessage>) -> Vec<String> {
        let mut texts = Vec::new();
        while let Ok(message) = rx.try_recv() {
            if let LoopMessage::StatusUpdate { text, .. } = message {
                texts.push(text);
            }
        }
        texts
    }

    fn event(done: u64) -> ProgressEvent {
        ProgressEvent::Transferring(ProgressSnapshot::new(done, Some(100)))
    }

    #[test]
    fn test_updates_respect_interval() {
        let (reporter, mut rx) = reporter(Duration::from_secs(3));
        let key = ProgressKey {
            message: MessageRef::new(1, 10),
            direction: Direction::Download,
        };
        let start = Instant::now();

        // Raw events every 500ms for 10s
        let surfaced: Vec<Instant> = (0..20u64)
            .map(|i| start + Duration::from_millis(500 * i))
            .filter(|now| reporter.report_at(*now, key, &event(5)))
            .collect();

        assert_eq!(surfaced.len(), 4);
        for pair in surfaced.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_secs(3));
        }
        assert_eq!(drain(&mut rx).len(), 4);
    }

    #[test]
    fn test_directions_and_messages_do_not_interfere() {
        let (reporter, mut rx) = reporter(Duration::from_secs(3));
        let now = Instant::now();
        let message = MessageRef::new(1, 10);
        let other = MessageRef::new(2, 20);

        assert!(reporter.report_at(now, ProgressKey { message, direction: Direction::Download }, &event(1)));
        assert!(reporter.report_at(now, ProgressKey { message, direction: Direction::Upload }, &event(1)));
        assert!(reporter.report_at(now, ProgressKey { message: other, direction: Direction::Download }, &event(1)));
        assert!(!reporter.report_at(now, ProgressKey { message, direction: Direction::Download }, &event(2)));

        assert_eq!(drain(&mut rx).len(), 3);
        assert_eq!(reporter.tracked_keys(), 3);

        reporter.release(message);
        assert_eq!(reporter.tracked_keys(), 1);
    }

    #[test]
    fn test_sinks_render_events() {
        let (reporter, mut rx) = reporter(Duration::from_secs(3));
        let message = MessageRef::new(1, 10);

        let download = reporter.download_sink(message);
        download(ProgressEvent::PostProcessing);
        download(ProgressEvent::PostProcessing);

        let upload = reporter.upload_sink(message);
        upload(50, 100);

        let texts = drain(&mut rx);
        assert_eq!(texts.len(), 2);
        assert_eq!(texts[0], render::POST_PROCESSING);
        assert!(texts[1].starts_with("Uploading..."));
        assert!(texts[1].contains("50.0%"));
    }

    #[test]
    fn test_closed_loop_does_not_panic() {
        let (reporter, rx) = reporter(Duration::from_secs(3));
        drop(rx);
        let key = ProgressKey {
            message: MessageRef::new(1, 10),
            direction: Direction::Download,
        };
        assert!(reporter.report(key, &event(1)));
    }
}
