//! Report capture: a user-global "waiting for report text" flag.
//!
//! `/report` arms the flag; the next non-command free-text message from
//! that user becomes the report body. The mapping is owned by the handler
//! dependencies and mutated behind one mutex — no global state.

use crate::core::config;
use crate::storage::stats::StatsRepository;
use crate::telegram::keyboards;
use std::collections::HashSet;
use teloxide::prelude::*;
use tokio::sync::Mutex;

pub const PROMPT_TEXT: &str =
    "✍️ Опиши проблему одним сообщением — я передам её администраторам.";
pub const CONFIRM_TEXT: &str = "✅ Спасибо! Твоё сообщение передано администраторам.";
pub const CANCELLED_TEXT: &str = "Отправка сообщения отменена.";

/// Per-user report capture state.
#[derive(Default)]
pub struct ReportStates {
    waiting: Mutex<HashSet<i64>>,
}

impl ReportStates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the user's next free-text message is a report body.
    pub async fn is_waiting(&self, user_id: i64) -> bool {
        self.waiting.lock().await.contains(&user_id)
    }

    pub async fn set_waiting(&self, user_id: i64, waiting: bool) {
        let mut states = self.waiting.lock().await;
        if waiting {
            states.insert(user_id);
        } else {
            states.remove(&user_id);
        }
    }
}

/// Sends the report prompt and arms the capture flag.
pub async fn send_report_prompt(bot: &Bot, chat_id: ChatId, states: &ReportStates) -> ResponseResult<()> {
    bot.send_message(chat_id, PROMPT_TEXT)
        .reply_markup(keyboards::report_cancel_keyboard())
        .await?;
    states.set_waiting(chat_id.0, true).await;
    Ok(())
}

/// Handles the captured report text: persist, forward, confirm, disarm.
pub async fn submit_report(
    bot: &Bot,
    chat_id: ChatId,
    username: Option<&str>,
    text: &str,
    states: &ReportStates,
    stats: &StatsRepository,
) -> ResponseResult<()> {
    let user_id = chat_id.0;
    log::info!("Report received from user {}: {}", user_id, text);

    stats.save_user_report(user_id, username, text);

    let sender = username.map(|u| format!("@{}", u)).unwrap_or_else(|| format!("ID {}", user_id));
    let notification = format!("💬 Сообщение о проблеме от {}:\n\n{}", sender, text);
    for &admin_id in config::admin::ADMIN_IDS.iter() {
        if let Err(e) = bot.send_message(ChatId(admin_id), notification.clone()).await {
            log::error!("Failed to forward report to admin {}: {:?}", admin_id, e);
        }
    }

    bot.send_message(chat_id, CONFIRM_TEXT).await?;
    states.set_waiting(user_id, false).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn waiting_flag_arms_and_disarms() {
        let states = ReportStates::new();
        assert!(!states.is_waiting(1).await);
        states.set_waiting(1, true).await;
        assert!(states.is_waiting(1).await);
        assert!(!states.is_waiting(2).await);
        states.set_waiting(1, false).await;
        assert!(!states.is_waiting(1).await);
    }

    #[tokio::test]
    async fn disarming_unknown_user_is_a_noop() {
        let states = ReportStates::new();
        states.set_waiting(42, false).await;
        assert!(!states.is_waiting(42).await);
    }
}
