use anyhow::Result;
use dotenvy::dotenv;
use std::sync::Arc;
use teloxide::prelude::*;

use komuz::core::limiter::DownloadLimiter;
use komuz::core::{config, init_logger};
use komuz::storage::{create_pool, StatsRepository};
use komuz::telegram::report::ReportStates;
use komuz::telegram::{create_bot, schema, setup_bot_commands, HandlerDeps};

/// Main entry point for the Telegram bot.
#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env if present
    let _ = dotenv();

    init_logger();

    // Initialize statistics storage
    let db_pool = Arc::new(
        create_pool(&config::DATABASE_PATH).map_err(|e| anyhow::anyhow!("Failed to create database pool: {}", e))?,
    );
    log::info!("Database initialized at {}", &*config::DATABASE_PATH);

    let stats = StatsRepository::new(Arc::clone(&db_pool));
    let limiter = Arc::new(DownloadLimiter::from_config());
    let report_states = Arc::new(ReportStates::new());

    let bot = create_bot()?;

    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to set bot commands: {}", e);
    }

    let me = bot.get_me().await?;
    let bot_username = me.user.username.clone();
    log::info!(
        "Bot started as @{}",
        bot_username.as_deref().unwrap_or("<unknown>")
    );

    let deps = HandlerDeps {
        stats,
        limiter,
        report_states,
        bot_username,
    };

    Dispatcher::builder(bot, schema(deps))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
