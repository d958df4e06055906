use once_cell::sync::Lazy;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration constants for the bot
///
/// All values are read once at first use from environment variables
/// (loaded from `.env` at startup) and cached for the process lifetime.
/// Cached yt-dlp binary path
/// Read from YTDLP_BIN environment variable, defaults to "yt-dlp"
pub static YTDLP_BIN: Lazy<String> = Lazy::new(|| env::var("YTDLP_BIN").unwrap_or_else(|_| "yt-dlp".to_string()));

/// Cached gallery-dl binary path for the Instagram photo fallback
/// Read from GALLERY_DL_BIN environment variable, defaults to "gallery-dl"
pub static GALLERY_DL_BIN: Lazy<String> =
    Lazy::new(|| env::var("GALLERY_DL_BIN").unwrap_or_else(|_| "gallery-dl".to_string()));

/// Bot token
/// Read from BOT_TOKEN or TELOXIDE_TOKEN environment variable
pub static BOT_TOKEN: Lazy<String> = Lazy::new(|| {
    env::var("BOT_TOKEN")
        .or_else(|_| env::var("TELOXIDE_TOKEN"))
        .unwrap_or_else(|_| String::new())
});

/// Database file path
/// Read from DATABASE_PATH environment variable
/// Default: komuz_stats.db
pub static DATABASE_PATH: Lazy<String> =
    Lazy::new(|| env::var("DATABASE_PATH").unwrap_or_else(|_| "komuz_stats.db".to_string()));

/// Root directory for per-download scratch workspaces
/// Read from SCRATCH_DIR environment variable, supports tilde expansion.
/// Defaults to a `komuz` subdirectory of the system temp dir.
pub static SCRATCH_DIR: Lazy<PathBuf> = Lazy::new(|| match env::var("SCRATCH_DIR") {
    Ok(dir) => PathBuf::from(shellexpand::tilde(&dir).into_owned()),
    Err(_) => env::temp_dir().join("komuz"),
});

/// Per-user download limits
pub mod limits {
    use super::Lazy;

    /// Maximum concurrent downloads for regular users
    pub static MAX_DOWNLOADS_PER_USER: Lazy<usize> = Lazy::new(|| {
        std::env::var("MAX_DOWNLOADS_PER_USER")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1)
    });
}

/// Administrator / privileged user configuration
pub mod admin {
    use super::Lazy;

    /// User IDs exempt from download limits; user reports are forwarded to them.
    /// Read from ADMIN_IDS environment variable (comma-separated).
    pub static ADMIN_IDS: Lazy<Vec<i64>> = Lazy::new(|| {
        std::env::var("ADMIN_IDS")
            .unwrap_or_default()
            .split(',')
            .filter_map(|s| s.trim().parse::<i64>().ok())
            .collect()
    });
}

/// External tool invocation configuration
pub mod download {
    use super::Duration;

    /// Timeout for yt-dlp commands (in seconds)
    pub const YTDLP_TIMEOUT_SECS: u64 = 240;

    /// Timeout for the gallery-dl photo fallback (in seconds)
    pub const GALLERY_DL_TIMEOUT_SECS: u64 = 120;

    /// yt-dlp command timeout duration
    pub fn ytdlp_timeout() -> Duration {
        Duration::from_secs(YTDLP_TIMEOUT_SECS)
    }

    /// gallery-dl command timeout duration
    pub fn gallery_dl_timeout() -> Duration {
        Duration::from_secs(GALLERY_DL_TIMEOUT_SECS)
    }
}

/// Per-platform retry configuration
///
/// Each flaky platform gets its own attempt count, backoff base and
/// user-facing failure template. These are deliberately not shared
/// constants: TikTok and Instagram extractors fail in different ways
/// and get tuned independently.
pub mod retry {
    /// TikTok extraction: empirically flaky, retried with exponential backoff
    pub mod tiktok {
        pub const MAX_ATTEMPTS: u32 = 3;
        pub const BACKOFF_BASE: f64 = 2.0;
        pub const ERROR_TEMPLATE: &str = "Не удалось скачать видео из TikTok. Попробуй позже или другую ссылку";
    }

    /// Instagram extraction (before the photo fallback kicks in)
    pub mod instagram {
        pub const MAX_ATTEMPTS: u32 = 3;
        pub const BACKOFF_BASE: f64 = 2.0;
        pub const ERROR_TEMPLATE: &str = "Не удалось скачать пост из Instagram. Попробуй позже или другую ссылку";
    }
}

/// Audio download configuration
pub mod audio {
    /// Target container/codec after extraction
    pub const FORMAT: &str = "mp3";

    /// Target bitrate passed to the transcode postprocessor
    pub const BITRATE: &str = "192";

    /// yt-dlp format expression for an audio quality tier.
    ///
    /// Unknown tiers fall back to the high setting.
    pub fn format_for_quality(quality: &str) -> &'static str {
        match quality {
            "medium" => "bestaudio[abr<=128]/bestaudio/best",
            "low" => "bestaudio[abr<=96]/bestaudio/best",
            _ => "bestaudio/best",
        }
    }
}

/// Video quality configuration
pub mod video {
    /// Ladder offered when the probe discovers no selectable heights.
    /// Quality selection must never end up with zero options.
    pub const FALLBACK_HEIGHTS: [u32; 5] = [1080, 720, 480, 360, 240];
}

/// Search configuration
pub mod search {
    /// Number of results shown for /search
    pub const DEFAULT_RESULTS: usize = 5;
}

/// Fixed bot reply texts
pub mod messages {
    pub const START: &str = "\u{1F44B} Привет! Я бот для скачивания видео и музыки с YouTube, TikTok и Instagram.\n\n\
        \u{1F4FA} YouTube: выбирай качество видео и аудио\n\
        \u{1F3B5} TikTok: автоматическая загрузка видео\n\
        \u{1F4F7} Instagram: видео и фото из постов\n\n\
        Просто отправь мне ссылку!\n\n\
        Для получения помощи используй команду /help.";

    pub const HELP: &str = "\u{1F50D} Как пользоваться ботом:\n\n\
        1. Отправь мне ссылку на видео YouTube, TikTok или Instagram\n\
        2. Используй /search для поиска видео на YouTube\n\
        3. Для YouTube: выбери тип контента (видео или аудио) и качество\n\
        4. TikTok и Instagram скачиваются автоматически\n\n\
        \u{1F4CC} Доступные команды:\n\
        /start - Запустить бота\n\
        /help - Показать справку\n\
        /search <запрос> - Поиск видео на YouTube\n\
        /stats - Показать статистику бота\n\
        /report - Сообщить о проблеме";

    pub const NOT_A_LINK: &str = "Пожалуйста, отправь корректную ссылку на видео YouTube, TikTok или Instagram.";
}
