//! Media domain types

use serde::{Deserialize, Serialize};
use std::fmt;

/// What the user wants out of a link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Audio,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Free-form quality tag (`360`, `720`, `1080`, `best`, or empty for audio)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Quality(String);

impl Quality {
    pub const BEST: &'static str = "best";

    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// The empty tag used for audio requests
    pub fn unspecified() -> Self {
        Self(String::new())
    }

    pub fn best() -> Self {
        Self(Self::BEST.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Height ceiling in pixels, when the tag names one
    pub fn height(&self) -> Option<u32> {
        self.0.parse().ok()
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A selectable output option, encoded as a button payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Variant {
    Video(Quality),
    Audio,
}

impl Variant {
    const VIDEO_PREFIX: &'static str = "video_";
    const AUDIO: &'static str = "audio";

    /// Video qualities offered after a successful metadata fetch
    pub const VIDEO_QUALITIES: [&'static str; 4] = ["360", "720", "1080", "best"];

    /// Decode a button payload; `None` for anything that is not a variant
    pub fn parse(payload: &str) -> Option<Self> {
        if payload == Self::AUDIO {
            return Some(Variant::Audio);
        }
        let tag = payload.strip_prefix(Self::VIDEO_PREFIX)?;
        if tag.is_empty() {
            return None;
        }
        Some(Variant::Video(Quality::new(tag)))
    }

    pub fn payload(&self) -> String {
        match self {
            Variant::Video(quality) => format!("{}{}", Self::VIDEO_PREFIX, quality),
            Variant::Audio => Self::AUDIO.to_string(),
        }
    }

    pub fn kind(&self) -> MediaKind {
        match self {
            Variant::Video(_) => MediaKind::Video,
            Variant::Audio => MediaKind::Audio,
        }
    }

    pub fn quality(&self) -> Quality {
        match self {
            Variant::Video(quality) => quality.clone(),
            Variant::Audio => Quality::unspecified(),
        }
    }
}

/// Identity key of both cache tiers
///
/// Two fingerprints that differ only in quality tag are unrelated entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestFingerprint {
    pub source: String,
    pub kind: MediaKind,
    pub quality: Quality,
}

impl RequestFingerprint {
    pub fn new(source: impl Into<String>, kind: MediaKind, quality: Quality) -> Self {
        Self {
            source: source.into(),
            kind,
            quality,
        }
    }

    pub fn for_variant(source: impl Into<String>, variant: &Variant) -> Self {
        Self::new(source, variant.kind(), variant.quality())
    }
}

impl fmt::Display for RequestFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}:{}]", self.source, self.kind, self.quality)
    }
}

/// Metadata returned by a probe call
///
/// Only the fields the rest of the system reads are modelled; everything
/// else in the extractor's document is ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataDocument {
    #[serde(default)]
    pub title: Option<String>,

    /// Duration in seconds (the extractor may report fractions)
    #[serde(default)]
    pub duration: Option<f64>,

    #[serde(default)]
    pub channel: Option<String>,

    #[serde(default)]
    pub uploader: Option<String>,

    #[serde(default)]
    pub view_count: Option<u64>,
}

impl MetadataDocument {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn title_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.title.as_deref().unwrap_or(fallback)
    }

    /// Channel name, falling back to the uploader
    pub fn channel_name(&self) -> Option<&str> {
        self.channel.as_deref().or(self.uploader.as_deref())
    }

    pub fn duration_secs(&self) -> u64 {
        self.duration
            .filter(|d| d.is_finite() && *d > 0.0)
            .map(|d| d as u64)
            .unwrap_or(0)
    }

    pub fn views(&self) -> u64 {
        self.view_count.unwrap_or(0)
    }
}
