//! Command-line construction for the yt-dlp process

use crate::media::{MediaKind, Quality};
use crate::traits::DownloadRequest;
use std::ffi::OsString;
use tubefetch_config::ExtractorConfig;

pub(crate) const DOWNLOAD_MARKER: &str = "[tubefetch:download]";

const AUDIO_SELECTOR: &str = "bestaudio[ext=m4a]/bestaudio[ext=webm]/bestaudio/best";
const BEST_VIDEO_SELECTOR: &str = "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best";

/// Format selector for a request
///
/// Video selectors express a height ceiling with graduated fallback:
/// exact height+container, then height only, then unrestricted best.
/// Tags without a height (`best`, unknown tags) use the unrestricted chain.
pub fn format_selector(kind: MediaKind, quality: &Quality) -> String {
    match (kind, quality.height()) {
        (MediaKind::Audio, _) => AUDIO_SELECTOR.to_string(),
        (MediaKind::Video, Some(height)) => format!(
            "bestvideo[height<={h}][ext=mp4]+bestaudio[ext=m4a]/best[height<={h}]/best",
            h = height
        ),
        (MediaKind::Video, None) => BEST_VIDEO_SELECTOR.to_string(),
    }
}

/// Arguments shared by probe and download invocations
pub(crate) fn common_args(config: &ExtractorConfig) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "--no-playlist".into(),
        "--quiet".into(),
        "--no-warnings".into(),
        "--socket-timeout".into(),
        config.socket_timeout_secs.to_string().into(),
        "--retries".into(),
        config.retries.to_string().into(),
        "--fragment-retries".into(),
        config.fragment_retries.to_string().into(),
        "--file-access-retries".into(),
        config.file_access_retries.to_string().into(),
        "--extractor-retries".into(),
        config.extractor_retries.to_string().into(),
    ];

    if !config.player_clients.is_empty() {
        args.push("--extractor-args".into());
        args.push(format!("youtube:player_client={}", config.player_clients.join(",")).into());
    }

    args
}

/// Arguments for a metadata-only probe
pub(crate) fn probe_args(config: &ExtractorConfig, url: &str) -> Vec<OsString> {
    let mut args = common_args(config);
    args.push("--dump-single-json".into());
    args.push("--skip-download".into());
    args.push("--".into());
    args.push(url.into());
    args
}

/// Arguments for a full transfer
pub(crate) fn download_args(config: &ExtractorConfig, request: &DownloadRequest) -> Vec<OsString> {
    let mut args = common_args(config);

    args.push("--http-chunk-size".into());
    args.push(config.http_chunk_size.to_string().into());
    args.push("--throttled-rate".into());
    args.push(config.throttled_rate.to_string().into());

    if let Some(downloader) = &config.external_downloader {
        args.push("--downloader".into());
        args.push(downloader.into());
        args.push("--downloader-args".into());
        args.push(
            format!(
                "{}:--min-split-size={} --max-connection-per-server={} --max-concurrent-downloads={} --split={}",
                downloader,
                config.min_segment_size,
                config.connections_per_host,
                config.concurrent_downloads,
                config.segments
            )
            .into(),
        );
    }

    args.push("-f".into());
    args.push(format_selector(request.kind, &request.quality).into());

    match request.kind {
        MediaKind::Video => {
            args.push("-o".into());
            args.push(request.destination.clone().into_os_string());
            args.push("--merge-output-format".into());
            args.push("mp4".into());
            args.push("--postprocessor-args".into());
            args.push("merger:-c copy".into());
        }
        MediaKind::Audio => {
            let mut template = request.output_base().into_os_string();
            template.push(".%(ext)s");
            args.push("-o".into());
            args.push(template);
            args.push("--extract-audio".into());
            args.push("--audio-format".into());
            args.push(config.audio_codec.clone().into());
            args.push("--audio-quality".into());
            args.push(format!("{}K", config.audio_bitrate_kbps).into());
        }
    }
    args.push("--postprocessor-args".into());
    args.push("ffmpeg:-threads 0".into());

    args.push("--progress".into());
    args.push("--newline".into());
    // Under --quiet only the download template reaches stdout; a `finished`
    // status marks the hand-off to the post-processors.
    args.push("--progress-template".into());
    args.push(
        format!(
            "download:{} %(progress.status)s %(progress.downloaded_bytes)s %(progress.total_bytes)s %(progress.total_bytes_estimate)s %(progress.speed)s %(progress.eta)s",
            DOWNLOAD_MARKER
        )
        .into(),
    );

    args.push("--".into());
    args.push(request.url.clone().into());
    args
}
