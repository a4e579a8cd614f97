//! yt-dlp backed [`MediaSource`]
//!
//! Every call runs the extractor as a child process. Probes read the whole
//! JSON document from stdout; downloads stream stdout line by line so that
//! progress lines can be turned into [`crate::ProgressEvent`]s while the
//! transfer is still running. Stderr is drained on a helper thread so the
//! child can never block on a full pipe.

mod args;
mod parse;

pub use args::format_selector;

use crate::error::{Result, SourceError};
use crate::media::MetadataDocument;
use crate::progress::ProgressCallback;
use crate::traits::{DownloadRequest, MediaSource};
use std::ffi::OsString;
use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use tracing::{debug, warn};
use tubefetch_config::ExtractorConfig;

#[derive(Debug, Clone, Default)]
pub struct YtDlpSource {
    config: ExtractorConfig,
}

impl YtDlpSource {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    fn command(&self, args: Vec<OsString>) -> Command {
        let mut cmd = Command::new(&self.config.binary);
        cmd.args(args).stdin(Stdio::null());
        cmd
    }
}

impl MediaSource for YtDlpSource {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    fn probe(&self, url: &str) -> Result<MetadataDocument> {
        debug!(url, "probing");
        let output = self
            .command(args::probe_args(&self.config, url))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(SourceError::Launch)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = parse::failure_message(&stderr);
            return Err(SourceError::Extraction(if message.is_empty() {
                format!("extractor exited with {}", output.status)
            } else {
                message
            }));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        MetadataDocument::from_json(stdout.trim())
            .map_err(|e| SourceError::InvalidOutput(e.to_string()))
    }

    fn download(&self, request: &DownloadRequest, progress: &ProgressCallback) -> Result<PathBuf> {
        debug!(url = %request.url, destination = %request.destination.display(), "downloading");
        let mut child = self
            .command(args::download_args(&self.config, request))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(SourceError::Launch)?;

        let stderr = child.stderr.take();
        let stderr_reader = thread::spawn(move || {
            let mut buf = Vec::new();
            if let Some(mut stderr) = stderr {
                let _ = stderr.read_to_end(&mut buf);
            }
            String::from_utf8_lossy(&buf).into_owned()
        });

        if let Some(stdout) = child.stdout.take() {
            let mut reader = BufReader::new(stdout);
            let mut line = Vec::new();
            loop {
                line.clear();
                match reader.read_until(b'\n', &mut line) {
                    Ok(0) => break,
                    Ok(_) => {
                        if let Some(event) = parse::parse_progress_line(&String::from_utf8_lossy(&line)) {
                            progress(event);
                        }
                    }
                    Err(e) => {
                        warn!("Failed to read extractor output: {}", e);
                        break;
                    }
                }
            }
        }

        let status = child.wait()?;
        let stderr = stderr_reader.join().unwrap_or_default();

        if !status.success() {
            let message = parse::failure_message(&stderr);
            let message = if message.is_empty() {
                format!("extractor exited with {}", status)
            } else {
                message
            };
            return Err(if message.contains("Postprocessing") {
                SourceError::PostProcessing(message)
            } else {
                SourceError::Transfer(message)
            });
        }

        Ok(request.expected_output(self.config.audio_extension()))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::media::{MediaKind, Quality};
    use crate::progress::{ProgressEvent, ProgressSnapshot};
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    const WRITES_OUTPUT: &str = r#"#!/bin/sh
out=""
prev=""
for arg in "$@"; do
  if [ "$prev" = "-o" ]; then out="$arg"; fi
  prev="$arg"
done
echo "[youtube] abc: Downloading webpage"
echo "[tubefetch:download] downloading 512 1024 NA 256 2"
echo "[tubefetch:download] downloading 1024 1024 NA 256 0"
echo "[tubefetch:download] finished 1024 1024 NA NA NA"
echo "[Merger] Merging formats into \"$out\"" >&2
printf 'data' > "$out"
"#;

    const FAILS_POSTPROCESSING: &str = r#"#!/bin/sh
echo "ERROR: Postprocessing: ffmpeg not found" >&2
exit 1
"#;

    const PRINTS_METADATA: &str = r#"#!/bin/sh
echo '{"title":"Never Gonna","duration":212.5,"uploader":"Rick","view_count":1500000}'
"#;

    const FAILS_EXTRACTION: &str = r#"#!/bin/sh
echo "ERROR: [youtube] abc: Video unavailable" >&2
exit 1
"#;

    fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn source(binary: &Path) -> YtDlpSource {
        YtDlpSource::new(
            ExtractorConfig::default()
                .with_binary(binary)
                .with_external_downloader(None),
        )
    }

    // Scripts are all written before any child is spawned, and the children
    // run sequentially, so no descriptor open for writing leaks into a fork.
    #[test]
    fn test_drives_extractor_process() {
        let dir = TempDir::new().unwrap();
        let writes_output = write_script(dir.path(), "ok.sh", WRITES_OUTPUT);
        let fails_pp = write_script(dir.path(), "pp.sh", FAILS_POSTPROCESSING);
        let prints_metadata = write_script(dir.path(), "probe.sh", PRINTS_METADATA);
        let fails_extraction = write_script(dir.path(), "gone.sh", FAILS_EXTRACTION);

        // Successful transfer with streamed progress
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let callback: ProgressCallback = Box::new(move |event| sink.lock().unwrap().push(event));
        let destination = dir.path().join("7_1700000000_deadbeef.mp4");
        let request = DownloadRequest::new(
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            &destination,
            MediaKind::Video,
            Quality::new("720"),
        );
        let path = source(&writes_output).download(&request, &callback).unwrap();
        assert_eq!(path, destination);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "data");
        assert_eq!(
            *events.lock().unwrap(),
            vec![
                ProgressEvent::Transferring(ProgressSnapshot::with_speed(512, Some(1024), Some(256), Some(2))),
                ProgressEvent::Transferring(ProgressSnapshot::with_speed(1024, Some(1024), Some(256), Some(0))),
                ProgressEvent::PostProcessing,
            ]
        );

        // Post-processing failures are told apart from transfer failures
        let noop: ProgressCallback = Box::new(|_| {});
        let err = source(&fails_pp).download(&request, &noop).unwrap_err();
        assert!(matches!(err, SourceError::PostProcessing(ref m) if m == "Postprocessing: ffmpeg not found"));

        let doc = source(&prints_metadata)
            .probe("https://www.youtube.com/watch?v=dQw4w9WgXcQ")
            .unwrap();
        assert_eq!(doc.title.as_deref(), Some("Never Gonna"));
        assert_eq!(doc.duration_secs(), 212);
        assert_eq!(doc.channel_name(), Some("Rick"));

        let err = source(&fails_extraction)
            .probe("https://www.youtube.com/watch?v=dQw4w9WgXcQ")
            .unwrap_err();
        assert!(matches!(err, SourceError::Extraction(ref m) if m == "[youtube] abc: Video unavailable"));

        let missing = dir.path().join("does-not-exist");
        let err = source(&missing).probe("https://youtu.be/dQw4w9WgXcQ").unwrap_err();
        assert!(matches!(err, SourceError::Launch(_)));
    }
}
