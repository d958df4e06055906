//! Instagram fetch operation: posts may resolve to video or photo.
//!
//! The video-capable extractor is tried first under the Instagram retry
//! policy. If the post turns out to contain no video — the extractor
//! signals an unsupported/photo-only URL, or the download produces no
//! non-image file — the photo-capable tool (gallery-dl) is invoked as a
//! fallback. The fallback runs at most once per operation: it is only
//! reachable from the final error of the video attempt, and the photo
//! path cannot signal photo-only again.

use crate::core::retry::RetryPolicy;
use crate::download::error::DownloadError;
use crate::download::workspace::Workspace;
use crate::download::{gallery, ytdlp};
use crate::download::{ContentKind, FetchResult};

/// Downloads an Instagram post, reporting which content kind was produced.
pub async fn download_post(url: &str) -> Result<FetchResult, DownloadError> {
    match download_post_video(url).await {
        Ok(result) => Ok(result),
        Err(DownloadError::PhotoOnly(msg)) => {
            log::info!("Post has no video ({}), falling back to photo extraction: {}", msg, url);
            download_post_photo(url).await
        }
        Err(DownloadError::EmptyResult(msg)) => {
            log::info!(
                "Video extraction produced no media file ({}), falling back to photo extraction: {}",
                msg,
                url
            );
            download_post_photo(url).await
        }
        Err(e) => Err(e),
    }
}

/// Video-capable attempt via yt-dlp, retry-wrapped.
async fn download_post_video(url: &str) -> Result<FetchResult, DownloadError> {
    let policy = RetryPolicy::instagram();
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

/// Photo fallback via gallery-dl.
async fn download_post_photo(url: &str) -> Result<FetchResult, DownloadError> {
    let ws = Workspace::create()?;
    gallery::download_images(url, ws.path()).await?;
    let file_path = ws.resolve_media_file(None, true)?;
    Ok(FetchResult {
        workspace: ws,
        file_path,
        kind: ContentKind::Photo,
        duration: 0,
        width: 0,
        height: 0,
        title: String::new(),
        artist: None,
        track: None,
    })
}
