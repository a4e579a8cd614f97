//! User-facing texts and keyboards

use crate::transport::{Button, Keyboard};
use tubefetch_source::{MediaKind, MetadataDocument, ProgressEvent, ProgressSnapshot, Quality, Variant};
use tubefetch_utils::{format_count, format_duration, format_size};

pub const CANCEL: &str = "cancel";

const BAR_CELLS: usize = 20;

pub const START: &str = "Hi! I download videos from YouTube.\n\n\
Send me a link and pick a quality.\n\n\
Features:\n\
- videos up to 2 GB\n\
- quality: 360p / 720p / 1080p / best\n\
- audio extraction to MP3\n\
- download progress\n\n\
Commands:\n\
/start - start\n\
/help - help";

pub const HELP: &str = "How to use:\n\n\
1. Copy a YouTube video link\n\
2. Send it to me\n\
3. Pick a video quality or audio\n\
4. Wait for the upload\n\n\
Video quality:\n\
- 360p: fast, little traffic\n\
- 720p: good quality\n\
- 1080p: high quality\n\
- Best: maximum available\n\n\
Limits:\n\
- maximum size 2 GB\n\
- YouTube links only\n\n\
Tip: 360p arrives 5-10 times faster.";

pub const NOT_A_LINK: &str = "Please send a YouTube video link.\n\n\
Examples:\n\
- https://www.youtube.com/watch?v=...\n\
- https://youtu.be/...";

pub const FETCHING: &str = "Fetching video info...";

pub const FETCH_TIMEOUT: &str = "Error: timed out while fetching video info.\n\n\
Possible causes:\n\
- the video is unavailable in this region\n\
- network problems\n\
- YouTube is temporarily blocking requests\n\n\
Try again later.";

pub const CANCELLED: &str = "Download cancelled.";

pub const RESEND_LINK: &str = "Link not found. Please send it again.";

pub const FOUND_IN_CACHE: &str = "File found in cache!\n\nUploading...";

pub const POST_PROCESSING: &str = "Processing with FFmpeg...";

pub fn fetch_failed(diagnostic: &str) -> String {
    format!("Error: could not fetch video info.\n\n{}", diagnostic)
}

pub fn download_failed(diagnostic: &str) -> String {
    format!("Download failed:\n\n{}", diagnostic)
}

pub fn metadata_card(doc: &MetadataDocument) -> String {
    format!(
        "{}\n\nChannel: {}\nDuration: {}\nViews: {}\n\nPick a quality:",
        doc.title_or("Video"),
        doc.channel_name().unwrap_or("Unknown"),
        format_duration(doc.duration_secs()),
        format_count(doc.views()),
    )
}

fn variant_label(variant: &Variant) -> String {
    match variant {
        Variant::Video(quality) => match quality.height() {
            Some(height) => format!("{}p", height),
            None if quality.as_str() == Quality::BEST => "Best".to_string(),
            None => quality.to_string(),
        },
        Variant::Audio => "MP3 (audio)".to_string(),
    }
}

/// Variant picker shown under the metadata card
pub fn variant_keyboard() -> Keyboard {
    let button = |variant: Variant| Button::new(variant_label(&variant), variant.payload());
    let video: Vec<Button> = Variant::VIDEO_QUALITIES
        .iter()
        .map(|q| button(Variant::Video(Quality::new(*q))))
        .collect();

    let mut keyboard = Keyboard::new();
    for pair in video.chunks(2) {
        keyboard = keyboard.row(pair.to_vec());
    }
    keyboard
        .row(vec![button(Variant::Audio)])
        .row(vec![Button::new("Cancel", CANCEL)])
}

pub fn download_started(variant: &Variant) -> String {
    let action = match variant {
        Variant::Video(_) => format!("Downloading video ({})...", variant_label(variant)),
        Variant::Audio => "Extracting audio...".to_string(),
    };
    format!("{}\n\nThis may take a few minutes.", action)
}

pub fn uploading(size: u64) -> String {
    format!("Uploading...\n\nSize: {}", format_size(size))
}

pub fn too_large(size: u64, limit: u64) -> String {
    format!(
        "File is too large: {}\n\nLimit: {}\n\nTry a lower quality (360p or 720p).",
        format_size(size),
        format_size(limit)
    )
}

pub fn caption(kind: MediaKind, title: &str) -> String {
    match kind {
        MediaKind::Video => format!("🎬 {}", title),
        MediaKind::Audio => format!("🎵 {}", title),
    }
}

/// Fixed-width bar: one filled cell per 5%
pub fn progress_bar(percent: f64) -> String {
    let filled = ((percent / 5.0) as usize).min(BAR_CELLS);
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_CELLS - filled))
}

pub fn progress(event: &ProgressEvent) -> String {
    match event {
        ProgressEvent::Transferring(snapshot) => transfer_progress("Downloading...", snapshot, true),
        ProgressEvent::PostProcessing => POST_PROCESSING.to_string(),
        ProgressEvent::Uploading(snapshot) => transfer_progress("Uploading...", snapshot, false),
    }
}

fn transfer_progress(heading: &str, snapshot: &ProgressSnapshot, with_rate: bool) -> String {
    let Some(percent) = snapshot.percentage() else {
        return format!("{}\n\n{}", heading, format_size(snapshot.downloaded_bytes));
    };

    let mut text = format!(
        "{}\n\n[{}] {:.1}%\n{} / {}",
        heading,
        progress_bar(percent),
        percent,
        format_size(snapshot.downloaded_bytes),
        format_size(snapshot.total_bytes.unwrap_or_default()),
    );
    if with_rate {
        let speed = snapshot
            .speed_bytes_per_sec
            .filter(|s| *s > 0)
            .map(|s| format!("{}/s", format_size(s)))
            .unwrap_or_else(|| "...".to_string());
        let eta = snapshot
            .eta_seconds
            .filter(|e| *e > 0)
            .map(|e| format!("{}s", e))
            .unwrap_or_else(|| "...".to_string());
        text.push_str(&format!("\n{} | ETA {}", speed, eta));
    }
    text
}
