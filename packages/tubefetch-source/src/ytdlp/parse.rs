//! Parsing of the progress lines produced by our progress templates

use super::args::DOWNLOAD_MARKER;
use crate::progress::{ProgressEvent, ProgressSnapshot};

/// Parse one stdout line; `None` for anything that is not a progress line
pub(crate) fn parse_progress_line(line: &str) -> Option<ProgressEvent> {
    let line = line.trim();

    let rest = line.strip_prefix(DOWNLOAD_MARKER)?;
    let fields: Vec<&str> = rest.split_whitespace().collect();
    if fields.len() < 6 {
        return None;
    }
    if fields[0] == "finished" {
        return Some(ProgressEvent::PostProcessing);
    }
    let downloaded = number(fields[1])?;
    let total = number(fields[2]).or_else(|| number(fields[3]));
    let speed = number(fields[4]);
    let eta = number(fields[5]);
    Some(ProgressEvent::Transferring(ProgressSnapshot::with_speed(
        downloaded, total, speed, eta,
    )))
}

/// Template fields are integers, floats or `NA`
fn number(field: &str) -> Option<u64> {
    field
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v as u64)
}

/// Last `ERROR:` line of the extractor's stderr, or the trimmed tail
pub(crate) fn failure_message(stderr: &str) -> String {
    stderr
        .lines()
        .rev()
        .find_map(|line| line.trim().strip_prefix("ERROR:"))
        .map(|msg| msg.trim().to_string())
        .unwrap_or_else(|| {
            let trimmed = stderr.trim();
            let tail_start = trimmed
                .char_indices()
                .rev()
                .nth(499)
                .map(|(i, _)| i)
                .unwrap_or(0);
            trimmed[tail_start..].to_string()
        })
}
