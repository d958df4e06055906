//! yt-dlp subprocess bindings.
//!
//! All extraction goes through the external `yt-dlp` binary: metadata
//! probes via `--dump-json`, downloads via `--format`/`-o`, and YouTube
//! search via the `ytsearch` pseudo-URL. Every invocation is bounded by a
//! wall-clock timeout; failures are classified into [`DownloadError`]
//! variants from the captured stderr.

use crate::core::config;
use crate::download::error::{classify_tool_error, DownloadError};
use serde::Deserialize;
use tokio::process::Command as TokioCommand;
use tokio::time::timeout;

/// Metadata returned by a `--dump-json` probe.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub creator: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub track: Option<String>,
    #[serde(default)]
    pub formats: Vec<FormatInfo>,
}

impl MediaInfo {
    /// Duration rounded down to whole seconds.
    pub fn duration_secs(&self) -> u32 {
        self.duration.unwrap_or(0.0).max(0.0) as u32
    }
}

/// One entry of the `formats` list from a probe.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FormatInfo {
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub vcodec: Option<String>,
}

/// One result row of a YouTube search.
#[derive(Debug, Clone)]
pub struct SearchEntry {
    pub id: String,
    pub title: String,
    pub url: String,
    pub duration: u32,
    pub channel: String,
}

/// Flat-playlist entry shape emitted per line by a search extraction.
#[derive(Debug, Deserialize)]
struct FlatEntry {
    #[serde(default)]
    id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    channel: Option<String>,
}

/// Base arguments shared by every yt-dlp invocation.
const BASE_ARGS: [&str; 2] = ["--no-playlist", "--no-warnings"];

async fn run_ytdlp(args: &[&str]) -> Result<std::process::Output, DownloadError> {
    let ytdlp_bin = &*config::YTDLP_BIN;
    log::debug!("yt-dlp command: {} {}", ytdlp_bin, args.join(" "));

    timeout(
        config::download::ytdlp_timeout(),
        TokioCommand::new(ytdlp_bin).args(args).output(),
    )
    .await
    .map_err(|_| {
        log::error!(
            "yt-dlp command timed out after {} seconds",
            config::download::YTDLP_TIMEOUT_SECS
        );
        DownloadError::Timeout("yt-dlp command timed out".to_string())
    })?
    .map_err(|e| DownloadError::Terminal(format!("failed to execute {}: {}", ytdlp_bin, e)))
}

/// Probes a URL without downloading, returning the parsed metadata.
pub async fn probe(url: &str) -> Result<MediaInfo, DownloadError> {
    let mut args = vec!["--dump-json"];
    args.extend_from_slice(&BASE_ARGS);
    args.push(url);

    let output = run_ytdlp(&args).await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        log::error!("yt-dlp probe failed for {}: {}", url, stderr.trim());
        return Err(classify_tool_error(&stderr));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    // A probe of a single video emits exactly one JSON document per line.
    let line = stdout
        .lines()
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| DownloadError::Terminal("yt-dlp returned no metadata".to_string()))?;

    serde_json::from_str(line).map_err(|e| DownloadError::Terminal(format!("failed to parse yt-dlp metadata: {}", e)))
}

/// Downloads a URL with the given format expression into the output template.
///
/// `extra_args` carries per-operation flags such as audio extraction
/// postprocessors.
pub async fn download(url: &str, format: &str, output_template: &str, extra_args: &[&str]) -> Result<(), DownloadError> {
    let mut args = vec!["--format", format, "-o", output_template, "--quiet"];
    args.extend_from_slice(&BASE_ARGS);
    args.extend_from_slice(extra_args);
    args.push(url);

    let output = run_ytdlp(&args).await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        log::error!("yt-dlp download failed for {}: {}", url, stderr.trim());
        return Err(classify_tool_error(&stderr));
    }
    Ok(())
}

/// Searches YouTube and returns up to `max_results` entries in extractor order.
pub async fn search(query: &str, max_results: usize) -> Result<Vec<SearchEntry>, DownloadError> {
    let search_query = format!("ytsearch{}:{}", max_results, query);
    let mut args = vec!["--dump-json", "--flat-playlist"];
    args.extend_from_slice(&BASE_ARGS);
    args.push(&search_query);

    let output = run_ytdlp(&args).await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        log::error!("yt-dlp search failed for '{}': {}", query, stderr.trim());
        return Err(classify_tool_error(&stderr));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut results = Vec::new();
    for line in stdout.lines().filter(|l| !l.trim().is_empty()) {
        match serde_json::from_str::<FlatEntry>(line) {
            Ok(entry) if !entry.id.is_empty() => {
                results.push(SearchEntry {
                    url: format!("https://www.youtube.com/watch?v={}", entry.id),
                    id: entry.id,
                    title: entry.title.unwrap_or_else(|| "Unknown".to_string()),
                    duration: entry.duration.unwrap_or(0.0).max(0.0) as u32,
                    channel: entry.channel.unwrap_or_else(|| "Unknown".to_string()),
                });
            }
            Ok(_) => {}
            Err(e) => log::warn!("Skipping unparseable search entry: {}", e),
        }
    }
    Ok(results)
}

/// Distinct selectable video heights from probed formats, highest first.
///
/// Audio-only formats (vcodec "none") do not count.
pub fn distinct_heights(info: &MediaInfo) -> Vec<u32> {
    let mut heights: Vec<u32> = info
        .formats
        .iter()
        .filter(|f| f.vcodec.as_deref().is_some_and(|v| v != "none"))
        .filter_map(|f| f.height)
        .collect();
    heights.sort_unstable_by(|a, b| b.cmp(a));
    heights.dedup();
    heights
}
