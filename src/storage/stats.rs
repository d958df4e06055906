//! Statistics repository: the event sink the download orchestration
//! reports into.
//!
//! Recording failures must never break a download in flight, so every
//! tracking method swallows its own errors after logging them. Queries
//! used by the /stats command return plain data for the handlers to format.

use crate::storage::db::{get_connection, DbPool};
use rusqlite::params;
use std::sync::Arc;

/// Repository for user tracking, download events and reports.
#[derive(Clone)]
pub struct StatsRepository {
    pool: Arc<DbPool>,
}

/// Aggregated statistics for one period ("day", "month" or "all").
#[derive(Debug, Default)]
pub struct Statistics {
    pub period: String,
    pub total_users: i64,
    pub total_searches: i64,
    pub total_videos: i64,
    pub total_audio: i64,
    pub total_tiktoks: i64,
    pub total_instagram: i64,
    pub successful_downloads: i64,
    pub failed_downloads: i64,
    pub popular_video_formats: Vec<(String, i64)>,
    pub popular_audio_formats: Vec<(String, i64)>,
}

const DOWNLOAD_EVENTS: &str = "('video_download', 'audio_download', 'tiktok_download', 'instagram_download')";

impl StatsRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    // === User tracking ===

    /// Records that a user was seen (insert on first contact, refresh after).
    pub fn track_user(&self, user_id: i64, username: Option<&str>) {
        let result = get_connection(&self.pool).and_then(|conn| {
            conn.execute(
                "INSERT INTO users (user_id, username) VALUES (?1, ?2)
                 ON CONFLICT(user_id) DO UPDATE SET last_seen = CURRENT_TIMESTAMP, username = ?2",
                params![user_id, username],
            )?;
            Ok(())
        });
        if let Err(e) = result {
            log::error!("Failed to track user {}: {}", user_id, e);
        }
    }

    // === Event tracking ===

    pub fn track_search(&self, user_id: i64, username: Option<&str>) {
        self.track_event("search", user_id, username, None, None, true, None);
    }

    pub fn track_video_download(
        &self,
        user_id: i64,
        format: &str,
        platform: &str,
        username: Option<&str>,
        success: bool,
        error_message: Option<&str>,
    ) {
        self.track_event(
            "video_download",
            user_id,
            username,
            Some(format),
            Some(platform),
            success,
            error_message,
        );
    }

    pub fn track_audio_download(
        &self,
        user_id: i64,
        quality: &str,
        username: Option<&str>,
        success: bool,
        error_message: Option<&str>,
    ) {
        self.track_event(
            "audio_download",
            user_id,
            username,
            Some(quality),
            Some("youtube"),
            success,
            error_message,
        );
    }

    pub fn track_tiktok_download(&self, user_id: i64, username: Option<&str>, success: bool, error_message: Option<&str>) {
        self.track_event("tiktok_download", user_id, username, None, Some("tiktok"), success, error_message);
    }

    /// Instagram events carry which content kind was actually produced
    /// ("video" or "photo") as the format column.
    pub fn track_instagram_download(
        &self,
        user_id: i64,
        kind: &str,
        username: Option<&str>,
        success: bool,
        error_message: Option<&str>,
    ) {
        self.track_event(
            "instagram_download",
            user_id,
            username,
            Some(kind),
            Some("instagram"),
            success,
            error_message,
        );
    }

    #[allow(clippy::too_many_arguments)]
    fn track_event(
        &self,
        event_type: &str,
        user_id: i64,
        username: Option<&str>,
        media_format: Option<&str>,
        platform: Option<&str>,
        success: bool,
        error_message: Option<&str>,
    ) {
        let result = get_connection(&self.pool).and_then(|conn| {
            conn.execute(
                "INSERT INTO statistics (event_type, user_id, username, media_format, platform, success, error_message)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![event_type, user_id, username, media_format, platform, success, error_message],
            )?;
            Ok(())
        });
        match result {
            Ok(()) => log::debug!("Tracked event {} for user {}", event_type, user_id),
            Err(e) => log::error!("Failed to track event {} for user {}: {}", event_type, user_id, e),
        }
    }

    // === Reports ===

    /// Persists a user report, returning its row id.
    pub fn save_user_report(&self, user_id: i64, username: Option<&str>, text: &str) -> Option<i64> {
        let result = get_connection(&self.pool).and_then(|conn| {
            conn.execute(
                "INSERT INTO reports (user_id, username, text) VALUES (?1, ?2, ?3)",
                params![user_id, username, text],
            )?;
            Ok(conn.last_insert_rowid())
        });
        match result {
            Ok(id) => Some(id),
            Err(e) => {
                log::error!("Failed to save report from user {}: {}", user_id, e);
                None
            }
        }
    }

    // === Queries ===

    /// All known users as (user_id, username) pairs.
    pub fn get_all_users(&self) -> Vec<(i64, Option<String>)> {
        let result = get_connection(&self.pool).and_then(|conn| {
            let mut stmt = conn.prepare("SELECT user_id, username FROM users ORDER BY first_seen")?;
            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        });
        result.unwrap_or_else(|e| {
            log::error!("Failed to list users: {}", e);
            Vec::new()
        })
    }

    /// Aggregated statistics for "day", "month" or "all".
    pub fn get_statistics(&self, period: &str) -> Statistics {
        let date_filter = match period {
            "day" => "AND timestamp >= datetime('now', '-1 day')",
            "month" => "AND timestamp >= datetime('now', '-1 month')",
            _ => "",
        };

        let mut stats = Statistics {
            period: period.to_string(),
            ..Default::default()
        };

        let conn = match get_connection(&self.pool) {
            Ok(conn) => conn,
            Err(e) => {
                log::error!("Failed to get connection for statistics: {}", e);
                return stats;
            }
        };

        stats.total_users = if date_filter.is_empty() {
            query_count(&conn, "SELECT COUNT(*) FROM users".to_string())
        } else {
            query_count(
                &conn,
                format!("SELECT COUNT(DISTINCT user_id) FROM statistics WHERE 1=1 {}", date_filter),
            )
        };

        stats.total_searches = event_count(&conn, "search", date_filter);
        stats.total_videos = event_count(&conn, "video_download", date_filter);
        stats.total_audio = event_count(&conn, "audio_download", date_filter);
        stats.total_tiktoks = event_count(&conn, "tiktok_download", date_filter);
        stats.total_instagram = event_count(&conn, "instagram_download", date_filter);

        stats.successful_downloads = query_count(
            &conn,
            format!(
                "SELECT COUNT(*) FROM statistics WHERE event_type IN {} AND success = 1 {}",
                DOWNLOAD_EVENTS, date_filter
            ),
        );
        stats.failed_downloads = query_count(
            &conn,
            format!(
                "SELECT COUNT(*) FROM statistics WHERE event_type IN {} AND success = 0 {}",
                DOWNLOAD_EVENTS, date_filter
            ),
        );

        stats.popular_video_formats = popular_formats(&conn, "video_download", date_filter);
        stats.popular_audio_formats = popular_formats(&conn, "audio_download", date_filter);

        stats
    }
}

fn query_count(conn: &rusqlite::Connection, query: String) -> i64 {
    conn.query_row(&query, [], |row| row.get(0)).unwrap_or_else(|e| {
        log::error!("Statistics query failed: {}", e);
        0
    })
}

fn event_count(conn: &rusqlite::Connection, event_type: &str, date_filter: &str) -> i64 {
    let query = format!(
        "SELECT COUNT(*) FROM statistics WHERE event_type = ?1 {}",
        date_filter
    );
    conn.query_row(&query, params![event_type], |row| row.get(0))
        .unwrap_or_else(|e| {
            log::error!("Statistics query failed: {}", e);
            0
        })
}

fn popular_formats(conn: &rusqlite::Connection, event_type: &str, date_filter: &str) -> Vec<(String, i64)> {
    let query = format!(
        "SELECT media_format, COUNT(*) as count FROM statistics
         WHERE event_type = ?1 AND media_format IS NOT NULL {}
         GROUP BY media_format ORDER BY count DESC LIMIT 5",
        date_filter
    );
    let result = (|| {
        let mut stmt = conn.prepare(&query)?;
        let rows = stmt
            .query_map(params![event_type], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok::<_, rusqlite::Error>(rows)
    })();
    result.unwrap_or_else(|e| {
        log::error!("Popular formats query failed: {}", e);
        Vec::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::db::create_pool;

    fn repo() -> (tempfile::TempDir, StatsRepository) {
        let dir = tempfile::tempdir().unwrap();
        let pool = create_pool(dir.path().join("stats.db").to_str().unwrap()).unwrap();
        (dir, StatsRepository::new(Arc::new(pool)))
    }

    #[test]
    fn tracks_users_without_duplicates() {
        let (_dir, repo) = repo();
        repo.track_user(1, Some("alice"));
        repo.track_user(1, Some("alice_renamed"));
        repo.track_user(2, None);

        let users = repo.get_all_users();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0], (1, Some("alice_renamed".to_string())));
    }

    #[test]
    fn download_events_feed_statistics() {
        let (_dir, repo) = repo();
        repo.track_video_download(1, "720p", "youtube", Some("alice"), true, None);
        repo.track_video_download(1, "720p", "youtube", Some("alice"), true, None);
        repo.track_audio_download(1, "medium", Some("alice"), true, None);
        repo.track_tiktok_download(2, None, false, Some("boom"));
        repo.track_instagram_download(2, "photo", None, true, None);
        repo.track_search(1, Some("alice"));

        let stats = repo.get_statistics("all");
        assert_eq!(stats.total_videos, 2);
        assert_eq!(stats.total_audio, 1);
        assert_eq!(stats.total_tiktoks, 1);
        assert_eq!(stats.total_instagram, 1);
        assert_eq!(stats.total_searches, 1);
        assert_eq!(stats.successful_downloads, 4);
        assert_eq!(stats.failed_downloads, 1);
        assert_eq!(stats.popular_video_formats, vec![("720p".to_string(), 2)]);
        assert_eq!(stats.popular_audio_formats, vec![("medium".to_string(), 1)]);
    }

    #[test]
    fn day_period_counts_recent_events() {
        let (_dir, repo) = repo();
        repo.track_video_download(1, "480p", "youtube", None, true, None);
        let stats = repo.get_statistics("day");
        assert_eq!(stats.total_videos, 1);
        assert_eq!(stats.total_users, 1);
    }

    #[test]
    fn reports_are_persisted() {
        let (_dir, repo) = repo();
        let id = repo.save_user_report(7, Some("bob"), "something broke");
        assert!(id.is_some());
        let second = repo.save_user_report(7, Some("bob"), "still broken");
        assert!(second.unwrap() > id.unwrap());
    }
}
