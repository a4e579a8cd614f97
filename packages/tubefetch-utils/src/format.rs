//! Human-readable rendering helpers shared by the progress and message layers.

const KIB: f64 = 1024.0;
const MIB: f64 = KIB * 1024.0;
const GIB: f64 = MIB * 1024.0;

/// Format a byte count (`512 B`, `1.5 KB`, `12.3 MB`, `1.25 GB`).
pub fn format_size(bytes: u64) -> String {
    let value = bytes as f64;
    if value < KIB {
        format!("{} B", bytes)
    } else if value < MIB {
        format!("{:.1} KB", value / KIB)
    } else if value < GIB {
        format!("{:.1} MB", value / MIB)
    } else {
        format!("{:.2} GB", value / GIB)
    }
}

/// Format a duration in seconds as `m:ss` or `h:mm:ss`.
pub fn format_duration(seconds: u64) -> String {
    if seconds < 3600 {
        format!("{}:{:02}", seconds / 60, seconds % 60)
    } else {
        let hours = seconds / 3600;
        let remainder = seconds % 3600;
        format!("{}:{:02}:{:02}", hours, remainder / 60, remainder % 60)
    }
}

/// Format a large count with a `K` / `M` suffix.
pub fn format_count(count: u64) -> String {
    if count >= 1_000_000 {
        format!("{:.1}M", count as f64 / 1_000_000.0)
    } else if count >= 1_000 {
        format!("{:.1}K", count as f64 / 1_000.0)
    } else {
        count.to_string()
    }
}

/// Cut `text` down to at most `limit` characters, respecting char boundaries.
pub fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((index, _)) => text[..index].to_string(),
        None => text.to_string(),
    }
}
