//! SQLite storage and the statistics repository

pub mod db;
pub mod stats;

// Re-exports for convenience
pub use db::{create_pool, get_connection, DbConnection, DbPool};
pub use stats::{Statistics, StatsRepository};
