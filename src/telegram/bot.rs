//! Bot initialization and command definitions.

use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

/// Bot commands enum with descriptions
#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "lowercase", description = "Я умею:")]
pub enum Command {
    #[command(description = "запустить бота")]
    Start,
    #[command(description = "показать справку")]
    Help,
    #[command(description = "поиск видео на YouTube")]
    Search(String),
    #[command(description = "статистика бота")]
    Stats,
    #[command(description = "сообщить о проблеме")]
    Report,
}

/// Creates a Bot instance from the BOT_TOKEN / TELOXIDE_TOKEN environment.
pub fn create_bot() -> anyhow::Result<Bot> {
    let token = crate::core::config::BOT_TOKEN.clone();
    if token.is_empty() {
        return Err(anyhow::anyhow!("BOT_TOKEN environment variable not set"));
    }
    Ok(Bot::new(token))
}

/// Sets up bot commands in the Telegram UI.
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    use teloxide::types::BotCommand;

    bot.set_my_commands(vec![
        BotCommand::new("start", "запустить бота"),
        BotCommand::new("help", "показать справку"),
        BotCommand::new("search", "поиск видео на YouTube"),
        BotCommand::new("stats", "статистика бота"),
        BotCommand::new("report", "сообщить о проблеме"),
    ])
    .await?;

    Ok(())
}
