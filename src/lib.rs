//! tubefetch: a chat bot front end over yt-dlp
//!
//! This crate re-exports the workspace packages so embedders can depend
//! on a single crate:
//!
//! - [`source`]: media domain types, link classification, yt-dlp source
//! - [`downloader`]: bounded worker pools, metadata fetcher, download dispatcher
//! - [`cache`]: remote-handle and local-artifact tiers, artifact storage
//! - [`bot`]: sessions, progress reporting, transport contract, coordinator
//! - [`config`] and [`utils`]

pub use tubefetch_bot as bot;
pub use tubefetch_cache as cache;
pub use tubefetch_config as config;
pub use tubefetch_downloader as downloader;
pub use tubefetch_source as source;
pub use tubefetch_utils as utils;

pub use tubefetch_bot::{Coordinator, CoordinatorHandle, CoordinatorSnapshot, Transport};
pub use tubefetch_config::AppConfig;
pub use tubefetch_source::{MediaSource, YtDlpSource};
