//! Telegram bot handler tree configuration.
//!
//! The dispatcher schema is built from plain functions so integration
//! tests can drive the same routing logic as production code.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;

use crate::core::config;
use crate::core::limiter::DownloadLimiter;
use crate::download::youtube;
use crate::storage::stats::StatsRepository;
use crate::telegram::bot::Command;
use crate::telegram::callbacks::handle_callback;
use crate::telegram::downloads::{run_gated_download, DownloadRequest};
use crate::telegram::keyboards;
use crate::telegram::report::{self, ReportStates};

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub stats: StatsRepository,
    pub limiter: Arc<DownloadLimiter>,
    pub report_states: Arc<ReportStates>,
    pub bot_username: Option<String>,
}

/// Matches Instagram post/reel links.
static INSTAGRAM_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(https?://)?(www\.)?instagram\.com/(p|reel|reels|tv)/[^\s]+").expect("Failed to compile Instagram regex")
});

/// Matches TikTok links, including the short vm./vt. hosts.
static TIKTOK_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(https?://)?(www\.|vm\.|vt\.)?tiktok\.com/[^\s]+").expect("Failed to compile TikTok regex"));

/// Matches YouTube watch/embed/shorts links and youtu.be short links.
static YOUTUBE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(https?://)?(www\.)?(youtube|youtu|youtube-nocookie)\.(com|be)/(watch\?v=|embed/|v/|shorts/)?[^\s&=%?]{11}[^\s]*")
        .expect("Failed to compile YouTube regex")
});

/// Which platform a pasted link belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkKind {
    /// Instagram post: video or photo, auto best quality
    Instagram(String),
    /// TikTok video: auto best quality
    Tiktok(String),
    /// YouTube Shorts: skips quality selection, default quality
    YoutubeShorts(String),
    /// Long-form YouTube: goes through content-type and quality selection
    Youtube(String),
}

/// Prefixes a scheme when the user pasted a bare `youtube.com/...` link,
/// so the extraction tools always get an absolute URL.
fn normalize_url(raw: &str) -> String {
    if url::Url::parse(raw).is_ok() {
        raw.to_string()
    } else {
        format!("https://{}", raw)
    }
}

/// Classifies free text against the platform patterns in priority order:
/// Instagram first, then TikTok, then YouTube (with its Shorts sub-path).
pub fn classify_link(text: &str) -> Option<LinkKind> {
    if let Some(m) = INSTAGRAM_REGEX.find(text) {
        return Some(LinkKind::Instagram(normalize_url(m.as_str())));
    }
    if let Some(m) = TIKTOK_REGEX.find(text) {
        return Some(LinkKind::Tiktok(normalize_url(m.as_str())));
    }
    if let Some(m) = YOUTUBE_REGEX.find(text) {
        let url = normalize_url(m.as_str());
        if url.contains("/shorts/") {
            return Some(LinkKind::YoutubeShorts(url));
        }
        return Some(LinkKind::Youtube(url));
    }
    None
}

/// Creates the main dispatcher schema for the bot.
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let deps_commands = deps.clone();
    let deps_messages = deps.clone();
    let deps_callback = deps;

    dptree::entry()
        .branch(
            Update::filter_message()
                .branch(dptree::entry().filter_command::<Command>().endpoint(
                    move |bot: Bot, msg: Message, cmd: Command| {
                        let deps = deps_commands.clone();
                        async move { handle_command(bot, msg, cmd, deps).await }
                    },
                ))
                .endpoint(move |bot: Bot, msg: Message| {
                    let deps = deps_messages.clone();
                    async move { handle_message(bot, msg, deps).await }
                }),
        )
        .branch(Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
            let deps = deps_callback.clone();
            async move { handle_callback(bot, q, deps).await }
        }))
}

/// Handles the commands from the [`Command`] enum.
async fn handle_command(bot: Bot, msg: Message, cmd: Command, deps: HandlerDeps) -> Result<(), HandlerError> {
    let chat_id = msg.chat.id;
    let username = msg.from.as_ref().and_then(|u| u.username.clone());
    deps.stats.track_user(chat_id.0, username.as_deref());

    match cmd {
        Command::Start => {
            bot.send_message(chat_id, config::messages::START).await?;
        }
        Command::Help => {
            bot.send_message(chat_id, config::messages::HELP).await?;
        }
        Command::Search(query) => {
            handle_search(bot, chat_id, username.as_deref(), query.trim(), &deps).await?;
        }
        Command::Stats => {
            let stats = deps.stats.get_statistics("all");
            bot.send_message(chat_id, keyboards::format_statistics(&stats))
                .reply_markup(keyboards::stats_keyboard())
                .await?;
        }
        Command::Report => {
            report::send_report_prompt(&bot, chat_id, &deps.report_states).await?;
        }
    }
    Ok(())
}

/// Runs a /search query and shows the result buttons.
async fn handle_search(
    bot: Bot,
    chat_id: ChatId,
    username: Option<&str>,
    query: &str,
    deps: &HandlerDeps,
) -> Result<(), HandlerError> {
    if query.is_empty() {
        bot.send_message(
            chat_id,
            "Пожалуйста, укажи поисковый запрос.\nПример: /search название песни",
        )
        .await?;
        return Ok(());
    }

    let searching_msg = bot.send_message(chat_id, format!("🔍 Поиск: {}...", query)).await?;
    deps.stats.track_search(chat_id.0, username);

    match youtube::search_videos(query, config::search::DEFAULT_RESULTS).await {
        Ok(results) if !results.is_empty() => {
            bot.edit_message_text(chat_id, searching_msg.id, "Выбери видео из результатов поиска:")
                .reply_markup(keyboards::search_results_keyboard(&results))
                .await?;
        }
        Ok(_) => {
            bot.edit_message_text(chat_id, searching_msg.id, "Ничего не найдено. Попробуй изменить запрос.")
                .await?;
        }
        Err(e) => {
            log::error!("Search failed for '{}': {}", query, e);
            bot.edit_message_text(chat_id, searching_msg.id, "Поиск не удался. Попробуй позже.")
                .await?;
        }
    }
    Ok(())
}

/// Handles free-text messages: report capture first, then link detection.
async fn handle_message(bot: Bot, msg: Message, deps: HandlerDeps) -> Result<(), HandlerError> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let chat_id = msg.chat.id;
    let username = msg.from.as_ref().and_then(|u| u.username.clone());
    deps.stats.track_user(chat_id.0, username.as_deref());

    // Report capture pre-empts everything for this user. A command-shaped
    // message is deliberately left for the command branch (which has
    // already run) and does not consume the capture.
    if deps.report_states.is_waiting(chat_id.0).await {
        if text.starts_with('/') {
            return Ok(());
        }
        report::submit_report(&bot, chat_id, username.as_deref(), text, &deps.report_states, &deps.stats).await?;
        return Ok(());
    }

    if text.starts_with('/') {
        // Unknown command: the Command filter did not match it.
        return Ok(());
    }

    match classify_link(text) {
        Some(LinkKind::Instagram(url)) => {
            run_gated_download(bot, chat_id, username, DownloadRequest::Instagram { url }, deps).await?;
        }
        Some(LinkKind::Tiktok(url)) => {
            run_gated_download(bot, chat_id, username, DownloadRequest::Tiktok { url }, deps).await?;
        }
        Some(LinkKind::YoutubeShorts(url)) => {
            // Shorts skip the selection flow entirely.
            run_gated_download(
                bot,
                chat_id,
                username,
                DownloadRequest::YoutubeVideo {
                    url,
                    quality: "best".to_string(),
                },
                deps,
            )
            .await?;
        }
        Some(LinkKind::Youtube(url)) => {
            bot.send_message(chat_id, "Выбери тип контента для загрузки:")
                .reply_markup(keyboards::content_type_keyboard(&url))
                .await?;
        }
        None => {
            bot.send_message(chat_id, config::messages::NOT_A_LINK).await?;
        }
    }
    Ok(())
}
