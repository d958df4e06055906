//! TikTok fetch operation.
//!
//! Single best quality, no selection step. The extractor is empirically
//! flaky, so the whole probe-download-resolve attempt runs under the
//! TikTok retry policy. Each attempt gets its own workspace; a failed
//! attempt's directory is removed before the next one starts.

use crate::core::retry::RetryPolicy;
use crate::download::error::DownloadError;
use crate::download::workspace::Workspace;
use crate::download::ytdlp;
use crate::download::{ContentKind, FetchResult};

/// Downloads a TikTok video, retrying transient extractor failures.
pub async fn download_video(url: &str) -> Result<FetchResult, DownloadError> {
    let policy = RetryPolicy::tiktok();
    policy
        .run(|| async {
            let ws = Workspace::create()?;
            let info = ytdlp::probe(url).await?;
            ytdlp::download(url, "best", &ws.output_template(), &[]).await?;
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
        })
        .await
}
