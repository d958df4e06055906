//! Database pool creation and schema initialization.

use crate::core::error::AppError;
use r2d2_sqlite::SqliteConnectionManager;

/// Type alias for the connection pool
pub type DbPool = r2d2::Pool<SqliteConnectionManager>;

/// Type alias for a pooled connection
pub type DbConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Creates a connection pool for the given database path and initializes
/// the schema.
pub fn create_pool(database_path: &str) -> Result<DbPool, AppError> {
    let manager = SqliteConnectionManager::file(database_path);
    let pool = r2d2::Pool::new(manager)?;
    let conn = pool.get()?;
    init_schema(&conn)?;
    Ok(pool)
}

/// Gets a connection from the pool.
pub fn get_connection(pool: &DbPool) -> Result<DbConnection, AppError> {
    Ok(pool.get()?)
}

/// Creates the tables if they do not exist yet.
///
/// The statement set is idempotent, so it runs unconditionally at startup.
fn init_schema(conn: &rusqlite::Connection) -> Result<(), AppError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            user_id INTEGER PRIMARY KEY,
            username TEXT,
            first_seen TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            last_seen TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        );
        CREATE TABLE IF NOT EXISTS statistics (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_type TEXT NOT NULL,
            user_id INTEGER NOT NULL,
            username TEXT,
            media_format TEXT,
            platform TEXT,
            success INTEGER NOT NULL DEFAULT 1,
            error_message TEXT,
            timestamp TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        );
        CREATE TABLE IF NOT EXISTS reports (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            username TEXT,
            text TEXT NOT NULL,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        );
        CREATE INDEX IF NOT EXISTS idx_statistics_event_type ON statistics(event_type);
        CREATE INDEX IF NOT EXISTS idx_statistics_timestamp ON statistics(timestamp);",
    )?;
    Ok(())
}
