//! YouTube fetch operations: video with quality selection, audio with
//! transcode, search, and the available-formats probe.

use crate::core::config;
use crate::download::error::DownloadError;
use crate::download::workspace::Workspace;
use crate::download::ytdlp::{self, MediaInfo, SearchEntry};
use crate::download::{ContentKind, FetchResult};

/// Builds the yt-dlp format expression for a video quality tier.
///
/// Tiers look like "720p"; anything else selects the best available.
/// The chain degrades gracefully: merged streams under the height ceiling,
/// then a pre-merged format under the ceiling, then unconstrained best.
pub fn build_video_format(quality: &str) -> String {
    match quality.strip_suffix('p').and_then(|h| h.parse::<u32>().ok()) {
        Some(height) => format!(
            "bestvideo[height<={h}]+bestaudio/best[height<={h}]/bestvideo+bestaudio/best",
            h = height
        ),
        None => "bestvideo+bestaudio/best".to_string(),
    }
}

/// Derives (artist, track) for audio metadata.
///
/// Explicit extractor fields win; otherwise a "Artist - Track" title is
/// split on the first " - "; otherwise the uploader stands in for the
/// artist and the full title for the track.
pub fn extract_artist_track(info: &MediaInfo) -> (String, String) {
    let explicit_artist = info
        .artist
        .clone()
        .or_else(|| info.creator.clone())
        .filter(|a| !a.trim().is_empty());
    let track = info.track.clone().filter(|t| !t.trim().is_empty());

    if let Some(artist) = explicit_artist {
        return (artist, track.unwrap_or_else(|| info.title.clone()));
    }

    if let Some((artist, track)) = info.title.split_once(" - ") {
        return (artist.trim().to_string(), track.trim().to_string());
    }

    (
        info.uploader.clone().unwrap_or_else(|| "Unknown Artist".to_string()),
        info.title.clone(),
    )
}

/// Downloads a YouTube video at the requested quality tier.
pub async fn download_video(url: &str, quality: &str) -> Result<FetchResult, DownloadError> {
    let ws = Workspace::create()?;
    let info = ytdlp::probe(url).await?;
    let format = build_video_format(quality);
    log::info!("Downloading video {} with format '{}'", url, format);

    ytdlp::download(url, &format, &ws.output_template(), &["--merge-output-format", "mp4"]).await?;

    let file_path = ws.resolve_media_file(info.ext.as_deref().or(Some("mp4")), false)?;
    Ok(FetchResult {
        workspace: ws,
        file_path,
        kind: ContentKind::Video,
        duration: info.duration_secs(),
        width: info.width.unwrap_or(0),
        height: info.height.unwrap_or(0),
        title: info.title,
        artist: None,
        track: None,
    })
}

/// Downloads YouTube audio at the requested tier and transcodes it to the
/// configured format with embedded thumbnail and metadata.
pub async fn download_audio(url: &str, quality: &str) -> Result<FetchResult, DownloadError> {
    let ws = Workspace::create()?;
    let info = ytdlp::probe(url).await?;
    let (artist, track) = extract_artist_track(&info);
    let format = config::audio::format_for_quality(quality);
    log::info!("Downloading audio {} with format '{}'", url, format);

    ytdlp::download(
        url,
        format,
        &ws.output_template(),
        &[
            "--extract-audio",
            "--audio-format",
            config::audio::FORMAT,
            "--audio-quality",
            config::audio::BITRATE,
            "--embed-thumbnail",
            "--embed-metadata",
        ],
    )
    .await?;

    let file_path = ws.resolve_media_file(Some(config::audio::FORMAT), false)?;
    Ok(FetchResult {
        workspace: ws,
        file_path,
        kind: ContentKind::Audio,
        duration: info.duration_secs(),
        width: 0,
        height: 0,
        title: info.title,
        artist: Some(artist),
        track: Some(track),
    })
}

/// Searches YouTube, preserving extractor order.
pub async fn search_videos(query: &str, max_results: usize) -> Result<Vec<SearchEntry>, DownloadError> {
    ytdlp::search(query, max_results).await
}

/// Returns the selectable heights for a URL, highest first.
///
/// Probe failures and empty format lists both yield the fixed fallback
/// ladder — quality selection must never be left with zero options.
pub async fn available_heights(url: &str) -> Vec<u32> {
    match ytdlp::probe(url).await {
        Ok(info) => {
            let heights = ytdlp::distinct_heights(&info);
            if heights.is_empty() {
                log::warn!("No selectable heights found for {}, using fallback ladder", url);
                config::video::FALLBACK_HEIGHTS.to_vec()
            } else {
                heights
            }
        }
        Err(e) => {
            log::error!("Format probe failed for {}: {}", url, e);
            config::video::FALLBACK_HEIGHTS.to_vec()
        }
    }
}
