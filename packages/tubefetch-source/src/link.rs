//! Classification of inbound text into supported source links.

use once_cell::sync::Lazy;
use regex::Regex;

static LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:https?://)?(?:[a-z0-9-]+\.)*(?:youtube\.com|youtu\.be)(?:[/?#]\S*)?$")
        .expect("link pattern is valid")
});

static SHORT_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)youtu\.be/([A-Za-z0-9_-]{11})(?:[?&#/]|$)").expect("short id pattern is valid")
});

static QUERY_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[?&]v=([A-Za-z0-9_-]{11})(?:[&#]|$)").expect("query id pattern is valid")
});

static PATH_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)youtube\.com/(?:shorts|embed|live|v)/([A-Za-z0-9_-]{11})(?:[?&#/]|$)")
        .expect("path id pattern is valid")
});

/// A recognised link, with its canonical form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLink {
    /// The link as the user sent it (trimmed)
    pub original: String,
    /// Canonical URL used as the fingerprint source
    pub canonical: String,
    pub video_id: Option<String>,
}

/// Classify a message as a supported link.
///
/// Returns `None` when the text is not a link of the supported family.
pub fn classify(text: &str) -> Option<SourceLink> {
    let trimmed = text.trim();
    if !LINK_RE.is_match(trimmed) {
        return None;
    }

    let video_id = extract_video_id(trimmed);
    let canonical = match &video_id {
        Some(id) => format!("https://www.youtube.com/watch?v={}", id),
        None => trimmed.to_string(),
    };

    Some(SourceLink {
        original: trimmed.to_string(),
        canonical,
        video_id,
    })
}

fn extract_video_id(link: &str) -> Option<String> {
    [&*SHORT_ID_RE, &*PATH_ID_RE, &*QUERY_ID_RE]
        .iter()
        .find_map(|re| re.captures(link))
        .map(|caps| caps[1].to_string())
}
