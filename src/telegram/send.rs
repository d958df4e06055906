//! Delivery of fetched media to the chat.

use crate::download::error::DownloadError;
use crate::download::{ContentKind, FetchResult};
use teloxide::prelude::*;
use teloxide::types::InputFile;

/// Sends a fetch result with the attributes matching its content kind.
///
/// The caller keeps the `FetchResult` (and with it the workspace) alive
/// until this returns. Transport failures are mapped to `SendFailed` so
/// the orchestration records them as delivery errors, not extraction ones.
pub async fn deliver(
    bot: &Bot,
    chat_id: ChatId,
    result: &FetchResult,
    bot_username: Option<&str>,
) -> Result<(), DownloadError> {
    let caption = bot_username.map(|u| format!("@{}", u)).unwrap_or_default();
    let input = InputFile::file(result.file_path.clone());

    let send_result = match result.kind {
        ContentKind::Video => {
            bot.send_video(chat_id, input)
                .caption(caption)
                .duration(result.duration)
                .width(result.width)
                .height(result.height)
                .supports_streaming(true)
                .await
        }
        ContentKind::Audio => {
            bot.send_audio(chat_id, input)
                .caption(caption)
                .duration(result.duration)
                .title(result.track.clone().unwrap_or_else(|| result.title.clone()))
                .performer(result.artist.clone().unwrap_or_else(|| "Unknown Artist".to_string()))
                .await
        }
        ContentKind::Photo => bot.send_photo(chat_id, input).caption(caption).await,
    };

    send_result
        .map(|_| ())
        .map_err(|e| DownloadError::SendFailed(format!("Failed to send {}: {}", result.kind.as_str(), e)))
}
