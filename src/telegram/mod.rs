//! Telegram bot integration and handlers

pub mod bot;
pub mod callbacks;
pub mod downloads;
pub mod handlers;
pub mod keyboards;
pub mod report;
pub mod send;

// Re-exports for convenience
pub use bot::{create_bot, setup_bot_commands, Command};
pub use handlers::{schema, HandlerDeps, HandlerError};
