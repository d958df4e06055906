//! Callback token grammar and the callback query router.
//!
//! Every inline button carries an opaque `<verb>_<payload>` token. Tokens
//! are parsed into a closed enum and dispatched exhaustively; data with an
//! unrecognized verb is logged and ignored — never an error, never a state
//! change. Payload splitting stops after two separators so URLs containing
//! underscores survive intact as the trailing component.

use crate::download::youtube;
use crate::telegram::downloads::{self, DownloadRequest};
use crate::telegram::handlers::{HandlerDeps, HandlerError};
use crate::telegram::keyboards;
use crate::telegram::report;
use teloxide::prelude::*;
use teloxide::types::MaybeInaccessibleMessage;

/// Which content type the user picked for a YouTube link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentChoice {
    Video,
    Audio,
}

/// Parsed form of an inline button token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackToken {
    /// Search result picked; re-enter content-type selection
    Select { url: String },
    /// Content type picked for a YouTube link
    Content { choice: ContentChoice, url: String },
    /// Video quality tier picked
    Quality { tier: String, url: String },
    /// Audio quality tier picked
    Audio { tier: String, url: String },
    /// Statistics period picked
    Stats { period: String },
    /// Report capture cancelled
    ReportCancel,
}

impl CallbackToken {
    /// Parses raw callback data; `None` for anything unrecognized.
    pub fn parse(data: &str) -> Option<Self> {
        if data == "report_cancel" {
            return Some(CallbackToken::ReportCancel);
        }

        let (verb, rest) = data.split_once('_')?;
        match verb {
            "select" => Some(CallbackToken::Select { url: rest.to_string() }),
            "stats" => Some(CallbackToken::Stats {
                period: rest.to_string(),
            }),
            "content" => {
                let (kind, url) = rest.split_once('_')?;
                let choice = match kind {
                    "video" => ContentChoice::Video,
                    "audio" => ContentChoice::Audio,
                    _ => return None,
                };
                Some(CallbackToken::Content {
                    choice,
                    url: url.to_string(),
                })
            }
            "quality" => {
                let (tier, url) = rest.split_once('_')?;
                Some(CallbackToken::Quality {
                    tier: tier.to_string(),
                    url: url.to_string(),
                })
            }
            "audio" => {
                let (tier, url) = rest.split_once('_')?;
                Some(CallbackToken::Audio {
                    tier: tier.to_string(),
                    url: url.to_string(),
                })
            }
            _ => None,
        }
    }
}

/// Handles callback queries from inline buttons.
pub async fn handle_callback(bot: Bot, q: CallbackQuery, deps: HandlerDeps) -> Result<(), HandlerError> {
    let Some(data) = q.data.clone() else {
        return Ok(());
    };

    let (chat_id, message_id) = match q.message.as_ref() {
        Some(MaybeInaccessibleMessage::Regular(msg)) => (msg.chat.id, msg.id),
        _ => return Ok(()),
    };
    let username = q.from.username.clone();

    let Some(token) = CallbackToken::parse(&data) else {
        log::warn!("Unknown callback data: {}", data);
        let _ = bot.answer_callback_query(q.id.clone()).await;
        return Ok(());
    };

    match token {
        CallbackToken::Select { url } => {
            let _ = bot.answer_callback_query(q.id.clone()).await;
            bot.edit_message_text(chat_id, message_id, "Выбери тип контента для загрузки:")
                .reply_markup(keyboards::content_type_keyboard(&url))
                .await?;
        }
        CallbackToken::Content {
            choice: ContentChoice::Video,
            url,
        } => {
            let _ = bot
                .answer_callback_query(q.id.clone())
                .text("Проверка доступных форматов...")
                .await;
            log::info!("Getting available formats for: {}", url);
            let heights = youtube::available_heights(&url).await;
            log::info!("Available heights: {:?}", heights);
            bot.edit_message_text(chat_id, message_id, "Выбери качество видео:")
                .reply_markup(keyboards::video_quality_keyboard(&heights, &url))
                .await?;
        }
        CallbackToken::Content {
            choice: ContentChoice::Audio,
            url,
        } => {
            let _ = bot.answer_callback_query(q.id.clone()).await;
            bot.edit_message_text(chat_id, message_id, "Выбери качество аудио:")
                .reply_markup(keyboards::audio_quality_keyboard(&url))
                .await?;
        }
        CallbackToken::Quality { tier, url } => {
            let _ = bot
                .answer_callback_query(q.id.clone())
                .text(format!("Загрузка видео в качестве {}...", tier))
                .await;
            downloads::run_gated_download(
                bot,
                chat_id,
                username,
                DownloadRequest::YoutubeVideo { url, quality: tier },
                deps,
            )
            .await?;
        }
        CallbackToken::Audio { tier, url } => {
            let _ = bot
                .answer_callback_query(q.id.clone())
                .text("Загрузка аудио...".to_string())
                .await;
            downloads::run_gated_download(
                bot,
                chat_id,
                username,
                DownloadRequest::YoutubeAudio { url, quality: tier },
                deps,
            )
            .await?;
        }
        CallbackToken::Stats { period } => {
            let _ = bot.answer_callback_query(q.id.clone()).await;
            let stats = deps.stats.get_statistics(&period);
            bot.edit_message_text(chat_id, message_id, keyboards::format_statistics(&stats))
                .reply_markup(keyboards::stats_keyboard())
                .await?;
        }
        CallbackToken::ReportCancel => {
            let user_id = chat_id.0;
            deps.report_states.set_waiting(user_id, false).await;
            let _ = bot.answer_callback_query(q.id.clone()).text("Отменено").await;
            bot.edit_message_text(chat_id, message_id, report::CANCELLED_TEXT).await?;
        }
    }

    Ok(())
}
