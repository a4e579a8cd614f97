//! Progress events raised on worker threads while a transfer runs

use serde::{Deserialize, Serialize};

/// Progress callback invoked from the thread executing a transfer
pub type ProgressCallback = Box<dyn Fn(ProgressEvent) + Send + Sync>;

/// Transfer progress figures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProgressSnapshot {
    /// Number of bytes transferred so far
    pub downloaded_bytes: u64,

    /// Total size in bytes (None if unknown)
    pub total_bytes: Option<u64>,

    /// Transfer speed in bytes per second
    pub speed_bytes_per_sec: Option<u64>,

    /// Estimated time remaining in seconds (None if unknown)
    pub eta_seconds: Option<u64>,
}

impl ProgressSnapshot {
    pub fn new(downloaded_bytes: u64, total_bytes: Option<u64>) -> Self {
        Self {
            downloaded_bytes,
            total_bytes,
            speed_bytes_per_sec: None,
            eta_seconds: None,
        }
    }

    /// Create a snapshot deriving the ETA from the speed when it is not known
    pub fn with_speed(
        downloaded_bytes: u64,
        total_bytes: Option<u64>,
        speed_bytes_per_sec: Option<u64>,
        eta_seconds: Option<u64>,
    ) -> Self {
        let eta_seconds = eta_seconds.or(match (total_bytes, speed_bytes_per_sec) {
            (Some(total), Some(speed)) if speed > 0 && total > downloaded_bytes => {
                Some((total - downloaded_bytes) / speed)
            }
            _ => None,
        });

        Self {
            downloaded_bytes,
            total_bytes,
            speed_bytes_per_sec,
            eta_seconds,
        }
    }

    /// Progress percentage (0-100), when the total is known and non-zero
    pub fn percentage(&self) -> Option<f64> {
        match self.total_bytes {
            Some(total) if total > 0 => {
                Some((self.downloaded_bytes as f64 / total as f64 * 100.0).min(100.0))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Transferring,
    PostProcessing,
    Uploading,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Transferring(ProgressSnapshot),
    PostProcessing,
    Uploading(ProgressSnapshot),
}

impl ProgressEvent {
    pub fn phase(&self) -> Phase {
        match self {
            ProgressEvent::Transferring(_) => Phase::Transferring,
            ProgressEvent::PostProcessing => Phase::PostProcessing,
            ProgressEvent::Uploading(_) => Phase::Uploading,
        }
    }

    pub fn snapshot(&self) -> Option<&ProgressSnapshot> {
        match self {
            ProgressEvent::Transferring(snapshot) | ProgressEvent::Uploading(snapshot) => {
                Some(snapshot)
            }
            ProgressEvent::PostProcessing => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage() {
        assert_eq!(ProgressSnapshot::new(50, Some(100)).percentage(), Some(50.0));
        assert_eq!(ProgressSnapshot::new(50, None).percentage(), None);
        assert_eq!(ProgressSnapshot::new(0, Some(0)).percentage(), None);
        // Estimates can be exceeded; the bar never overflows
        assert_eq!(ProgressSnapshot::new(150, Some(100)).percentage(), Some(100.0));
    }

    #[test]
    fn test_with_speed_derives_eta() {
        let snapshot = ProgressSnapshot::with_speed(200, Some(1200), Some(100), None);
        assert_eq!(snapshot.eta_seconds, Some(10));

        let reported = ProgressSnapshot::with_speed(200, Some(1200), Some(100), Some(3));
        assert_eq!(reported.eta_seconds, Some(3));

        let unknown = ProgressSnapshot::with_speed(200, None, Some(100), None);
        assert_eq!(unknown.eta_seconds, None);
    }

    #[test]
    fn test_event_phase() {
        assert_eq!(
            ProgressEvent::Transferring(ProgressSnapshot::default()).phase(),
            Phase::Transferring
        );
        assert_eq!(ProgressEvent::PostProcessing.phase(), Phase::PostProcessing);
        assert!(ProgressEvent::PostProcessing.snapshot().is_none());
        assert_eq!(
            ProgressEvent::Uploading(ProgressSnapshot::new(1, Some(2))).phase(),
            Phase::Uploading
        );
    }
}
