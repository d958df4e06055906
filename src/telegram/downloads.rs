//! Gated download orchestration.
//!
//! This is where the selection state machine hands off to the fetch
//! operations: admission control, the spawned fetch task, delivery,
//! outcome events, and the user-visible processing message. The admission
//! slot and the workspace both live inside the spawned task as guards, so
//! release and cleanup run on every exit path.

use crate::download::error::DownloadError;
use crate::download::{instagram, tiktok, youtube, ContentKind, FetchResult};
use crate::telegram::handlers::{HandlerDeps, HandlerError};
use crate::telegram::send;
use teloxide::prelude::*;
use teloxide::types::ChatAction;

/// One download the user asked for.
#[derive(Debug, Clone)]
pub enum DownloadRequest {
    YoutubeVideo { url: String, quality: String },
    YoutubeAudio { url: String, quality: String },
    Tiktok { url: String },
    Instagram { url: String },
}

impl DownloadRequest {
    fn processing_text(&self) -> &'static str {
        match self {
            DownloadRequest::YoutubeVideo { .. } => "Загрузка видео... Пожалуйста, подожди.",
            DownloadRequest::YoutubeAudio { .. } => "Загрузка аудио... Пожалуйста, подожди.",
            DownloadRequest::Tiktok { .. } => "Загрузка TikTok видео... Пожалуйста, подожди.",
            DownloadRequest::Instagram { .. } => "Загрузка Instagram поста... Пожалуйста, подожди.",
        }
    }

    fn chat_action(&self) -> ChatAction {
        match self {
            DownloadRequest::YoutubeAudio { .. } => ChatAction::UploadVoice,
            _ => ChatAction::UploadVideo,
        }
    }
}

/// Runs a download request under admission control.
///
/// Rejection is a user-visible message and nothing else: no fetch starts
/// and no event is recorded. Otherwise the fetch runs in a spawned task so
/// the dispatcher keeps serving other updates while yt-dlp works.
pub async fn run_gated_download(
    bot: Bot,
    chat_id: ChatId,
    username: Option<String>,
    request: DownloadRequest,
    deps: HandlerDeps,
) -> Result<(), HandlerError> {
    let user_id = chat_id.0;

    let Some(slot) = deps.limiter.acquire(user_id) else {
        let active = deps.limiter.active_count(user_id);
        bot.send_message(
            chat_id,
            format!(
                "⏳ У тебя уже идёт загрузка ({}/{}). Дождись её окончания и попробуй снова.",
                active,
                deps.limiter.max_per_user()
            ),
        )
        .await?;
        return Ok(());
    };

    let processing_msg = bot.send_message(chat_id, request.processing_text()).await?;
    let _ = bot.send_chat_action(chat_id, request.chat_action()).await;

    tokio::spawn(async move {
        // The slot guard lives for the whole task; dropping it on any exit
        // path (including panics unwinding the task) frees the user's slot.
        let _slot = slot;

        let fetched = run_fetch(&request).await;

        let outcome = match fetched {
            Ok(result) => {
                log::info!("Download succeeded for chat {}: {:?}", user_id, result.file_path);
                let delivered = send::deliver(&bot, chat_id, &result, deps.bot_username.as_deref()).await;
                match delivered {
                    Ok(()) => Ok(result.kind),
                    Err(e) => Err(e),
                }
                // `result` (and its workspace) drops here, after delivery.
            }
            Err(e) => Err(e),
        };

        let _ = bot.delete_message(chat_id, processing_msg.id).await;

        record_outcome(&deps, user_id, username.as_deref(), &request, &outcome);

        if let Err(e) = outcome {
            log::error!("Download failed for chat {} ({:?}): {}", user_id, request, e);
            let _ = bot
                .send_message(chat_id, format!("❌ Произошла ошибка при обработке: {}", e))
                .await;
        }
    });

    Ok(())
}

async fn run_fetch(request: &DownloadRequest) -> Result<FetchResult, DownloadError> {
    match request {
        DownloadRequest::YoutubeVideo { url, quality } => youtube::download_video(url, quality).await,
        DownloadRequest::YoutubeAudio { url, quality } => youtube::download_audio(url, quality).await,
        DownloadRequest::Tiktok { url } => tiktok::download_video(url).await,
        DownloadRequest::Instagram { url } => instagram::download_post(url).await,
    }
}

/// Records exactly one success or failure event for the attempt.
fn record_outcome(
    deps: &HandlerDeps,
    user_id: i64,
    username: Option<&str>,
    request: &DownloadRequest,
    outcome: &Result<ContentKind, DownloadError>,
) {
    let (success, error) = match outcome {
        Ok(_) => (true, None),
        Err(e) => (false, Some(e.to_string())),
    };
    let error = error.as_deref();

    match request {
        DownloadRequest::YoutubeVideo { quality, .. } => {
            deps.stats
                .track_video_download(user_id, quality, "youtube", username, success, error);
        }
        DownloadRequest::YoutubeAudio { quality, .. } => {
            deps.stats.track_audio_download(user_id, quality, username, success, error);
        }
        DownloadRequest::Tiktok { .. } => {
            deps.stats.track_tiktok_download(user_id, username, success, error);
        }
        DownloadRequest::Instagram { .. } => {
            let kind = match outcome {
                Ok(kind) => kind.as_str(),
                Err(_) => "video",
            };
            deps.stats.track_instagram_download(user_id, kind, username, success, error);
        }
    }
}
