//! Inline keyboard construction and label formatting.

use crate::download::ytdlp::SearchEntry;
use crate::storage::stats::Statistics;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

/// Label for a video height button.
///
/// Marker tiers: 4K from 2160p, 2K from 1440p, HD from 720p, bare below.
pub fn quality_label(height: u32) -> String {
    if height >= 2160 {
        format!("{}p 4K", height)
    } else if height >= 1440 {
        format!("{}p 2K", height)
    } else if height >= 720 {
        format!("{}p HD", height)
    } else {
        format!("{}p", height)
    }
}

/// Content-type selection for a YouTube link.
pub fn content_type_keyboard(url: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback("🎬 Видео", format!("content_video_{}", url)),
        InlineKeyboardButton::callback("🎵 Аудио", format!("content_audio_{}", url)),
    ]])
}

/// Video quality selection, two buttons per row.
pub fn video_quality_keyboard(heights: &[u32], url: &str) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = Vec::new();
    let mut row: Vec<InlineKeyboardButton> = Vec::new();

    for &height in heights {
        row.push(InlineKeyboardButton::callback(
            quality_label(height),
            format!("quality_{}p_{}", height, url),
        ));
        if row.len() == 2 {
            rows.push(std::mem::take(&mut row));
        }
    }
    if !row.is_empty() {
        rows.push(row);
    }

    InlineKeyboardMarkup::new(rows)
}

/// Fixed three-tier audio quality selection.
pub fn audio_quality_keyboard(url: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![
            InlineKeyboardButton::callback("Высокое качество", format!("audio_high_{}", url)),
            InlineKeyboardButton::callback("Среднее качество", format!("audio_medium_{}", url)),
        ],
        vec![InlineKeyboardButton::callback("Низкое качество", format!("audio_low_{}", url))],
    ])
}

/// Search results, one button per row, in extractor order.
pub fn search_results_keyboard(results: &[SearchEntry]) -> InlineKeyboardMarkup {
    let rows = results
        .iter()
        .enumerate()
        .map(|(i, result)| {
            let title: String = if result.title.chars().count() > 50 {
                format!("{}...", result.title.chars().take(50).collect::<String>())
            } else {
                result.title.clone()
            };
            let label = format!(
                "{}. {} ({}:{:02})",
                i + 1,
                title,
                result.duration / 60,
                result.duration % 60
            );
            vec![InlineKeyboardButton::callback(label, format!("select_{}", result.url))]
        })
        .collect::<Vec<_>>();
    InlineKeyboardMarkup::new(rows)
}

/// Statistics period selection.
pub fn stats_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback("День", "stats_day"),
        InlineKeyboardButton::callback("Месяц", "stats_month"),
        InlineKeyboardButton::callback("Всё время", "stats_all"),
    ]])
}

/// Cancel affordance for report capture.
pub fn report_cancel_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback("Отмена", "report_cancel")]])
}

/// Renders a statistics snapshot for the /stats message.
pub fn format_statistics(stats: &Statistics) -> String {
    let period_label = match stats.period.as_str() {
        "day" => "за день",
        "month" => "за месяц",
        _ => "за всё время",
    };

    let mut text = format!(
        "📊 Статистика {}\n\n\
         👥 Пользователей: {}\n\
         🔍 Поисков: {}\n\
         🎬 Видео: {}\n\
         🎵 Аудио: {}\n\
         🎭 TikTok: {}\n\
         📷 Instagram: {}\n\
         ✅ Успешных загрузок: {}\n\
         ❌ Неудачных загрузок: {}",
        period_label,
        stats.total_users,
        stats.total_searches,
        stats.total_videos,
        stats.total_audio,
        stats.total_tiktoks,
        stats.total_instagram,
        stats.successful_downloads,
        stats.failed_downloads,
    );

    if !stats.popular_video_formats.is_empty() {
        text.push_str("\n\nПопулярные форматы видео:");
        for (format, count) in &stats.popular_video_formats {
            text.push_str(&format!("\n  • {} — {}", format, count));
        }
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn button_texts(kb: &InlineKeyboardMarkup) -> Vec<String> {
        kb.inline_keyboard
            .iter()
            .flatten()
            .map(|b| b.text.clone())
            .collect()
    }

    #[test]
    fn quality_labels_carry_tier_markers() {
        assert_eq!(quality_label(2160), "2160p 4K");
        assert_eq!(quality_label(1440), "1440p 2K");
        assert_eq!(quality_label(720), "720p HD");
        assert_eq!(quality_label(1080), "1080p HD");
        assert_eq!(quality_label(360), "360p");
    }

    #[test]
    fn quality_keyboard_packs_two_per_row() {
        let kb = video_quality_keyboard(&[1080, 720, 480, 360, 240], "https://example.com");
        let row_sizes: Vec<usize> = kb.inline_keyboard.iter().map(Vec::len).collect();
        assert_eq!(row_sizes, vec![2, 2, 1]);
    }

    #[test]
    fn quality_buttons_carry_parseable_tokens() {
        use crate::telegram::callbacks::CallbackToken;
        let kb = video_quality_keyboard(&[720], "https://youtu.be/a_b");
        let data = match &kb.inline_keyboard[0][0].kind {
            teloxide::types::InlineKeyboardButtonKind::CallbackData(data) => data.clone(),
            other => panic!("unexpected button kind: {:?}", other),
        };
        assert_eq!(
            CallbackToken::parse(&data),
            Some(CallbackToken::Quality {
                tier: "720p".to_string(),
                url: "https://youtu.be/a_b".to_string()
            })
        );
    }

    #[test]
    fn audio_keyboard_has_three_tiers() {
        let kb = audio_quality_keyboard("https://example.com");
        assert_eq!(
            button_texts(&kb),
            vec!["Высокое качество", "Среднее качество", "Низкое качество"]
        );
    }

    #[test]
    fn search_keyboard_truncates_long_titles() {
        let results = vec![SearchEntry {
            id: "x".into(),
            title: "a".repeat(80),
            url: "https://www.youtube.com/watch?v=x".into(),
            duration: 125,
            channel: "c".into(),
        }];
        let kb = search_results_keyboard(&results);
        let text = &kb.inline_keyboard[0][0].text;
        assert!(text.starts_with("1. "));
        assert!(text.contains("..."));
        assert!(text.ends_with("(2:05)"));
    }

    #[test]
    fn statistics_rendering_mentions_counts() {
        let stats = Statistics {
            period: "day".to_string(),
            total_users: 3,
            total_videos: 5,
            popular_video_formats: vec![("720p".to_string(), 4)],
            ..Default::default()
        };
        let text = format_statistics(&stats);
        assert!(text.contains("за день"));
        assert!(text.contains("Видео: 5"));
        assert!(text.contains("720p — 4"));
    }
}
