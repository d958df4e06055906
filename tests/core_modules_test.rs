//! Integration tests for the orchestration core (limiter, retry, workspace,
//! selection flow).
//!
//! Run with: cargo test --test core_modules_test

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Retry + Workspace composition
// ============================================================================

mod retry_flow_tests {
    use super::*;
    use komuz::core::retry::RetryPolicy;
    use komuz::download::error::{classify_tool_error, DownloadError};
    use komuz::download::Workspace;

    /// A short-form download that fails twice with a transient extractor
    /// signature and succeeds on the third attempt: the result arrives,
    /// two backoff sleeps happen, and every failed attempt's workspace is
    /// cleaned up.
    #[tokio::test]
    async fn transient_failures_then_success_cleans_up_attempts() {
        let policy = RetryPolicy::new(3, 0.01, "tiktok failed");
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();
        let failed_paths = Arc::new(std::sync::Mutex::new(Vec::new()));
        let failed_paths_clone = failed_paths.clone();

        let start = std::time::Instant::now();
        let result = policy
            .run(|| {
                let attempts = attempts_clone.clone();
                let failed_paths = failed_paths_clone.clone();
                async move {
                    let ws = Workspace::create()?;
                    if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                        failed_paths.lock().unwrap().push(ws.path().to_path_buf());
                        return Err(classify_tool_error("ERROR: Unable to extract video data"));
                    }
                    Ok(ws.path().to_path_buf())
                }
            })
            .await;

        assert!(result.is_ok());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        // base^0 + base^1 seconds of backoff
        let expected = policy.delay_for_attempt(0) + policy.delay_for_attempt(1);
        assert!(start.elapsed() >= expected);
        // Workspaces of the failed attempts are gone
        for path in failed_paths.lock().unwrap().iter() {
            assert!(!path.exists(), "workspace {} should have been removed", path.display());
        }
    }

    #[tokio::test]
    async fn terminal_failure_surfaces_template_with_raw_error() {
        let policy = RetryPolicy::new(3, 0.01, "tiktok failed");
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();

        let result: Result<(), _> = policy
            .run(|| {
                let attempts = attempts_clone.clone();
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err(classify_tool_error("ERROR: Private video"))
                }
            })
            .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        match result {
            Err(DownloadError::Terminal(msg)) => {
                assert!(msg.starts_with("tiktok failed"));
                assert!(msg.contains("Private video"));
            }
            other => panic!("expected terminal error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn photo_only_signal_escapes_the_retry_loop_immediately() {
        let policy = RetryPolicy::new(5, 0.01, "instagram failed");
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();

        let start = std::time::Instant::now();
        let result: Result<(), _> = policy
            .run(|| {
                let attempts = attempts_clone.clone();
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err(classify_tool_error("ERROR: Unsupported URL: https://instagram.com/p/abc"))
                }
            })
            .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(DownloadError::PhotoOnly(_))));
        assert!(start.elapsed() < Duration::from_millis(500));
    }
}

// ============================================================================
// Admission control scenarios
// ============================================================================

mod admission_tests {
    use super::*;
    use komuz::core::limiter::DownloadLimiter;
    use komuz::storage::{create_pool, StatsRepository};
    use serial_test::serial;

    /// A user at quota is rejected: no slot claimed, and nothing to record.
    #[test]
    #[serial]
    fn user_at_quota_is_rejected_without_events() {
        let dir = tempfile::tempdir().unwrap();
        let pool = create_pool(dir.path().join("stats.db").to_str().unwrap()).unwrap();
        let stats = StatsRepository::new(Arc::new(pool));
        let limiter = Arc::new(DownloadLimiter::new(1, vec![]));

        let _held = limiter.acquire(100).expect("first slot");
        let rejected = limiter.acquire(100);
        assert!(rejected.is_none());

        // The orchestration records nothing for rejections; statistics stay empty.
        let snapshot = stats.get_statistics("all");
        assert_eq!(snapshot.successful_downloads + snapshot.failed_downloads, 0);
    }

    /// Slots are released when the owning task finishes, even on panic.
    #[tokio::test]
    async fn slot_released_when_task_panics() {
        let limiter = Arc::new(DownloadLimiter::new(1, vec![]));
        let limiter_clone = Arc::clone(&limiter);

        let handle = tokio::spawn(async move {
            let _slot = limiter_clone.acquire(7).expect("slot");
            panic!("simulated download crash");
        });
        assert!(handle.await.is_err());

        assert_eq!(limiter.active_count(7), 0);
        assert!(limiter.acquire(7).is_some());
    }

    /// Download outcomes produce exactly one event each.
    #[test]
    #[serial]
    fn one_event_per_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let pool = create_pool(dir.path().join("stats.db").to_str().unwrap()).unwrap();
        let stats = StatsRepository::new(Arc::new(pool));

        stats.track_audio_download(1, "medium", Some("alice"), true, None);
        stats.track_tiktok_download(2, None, false, Some("tiktok failed"));
        stats.track_instagram_download(3, "photo", None, true, None);

        let snapshot = stats.get_statistics("all");
        assert_eq!(snapshot.total_audio, 1);
        assert_eq!(snapshot.total_tiktoks, 1);
        assert_eq!(snapshot.total_instagram, 1);
        assert_eq!(snapshot.successful_downloads, 2);
        assert_eq!(snapshot.failed_downloads, 1);
        assert_eq!(snapshot.popular_audio_formats, vec![("medium".to_string(), 1)]);
    }
}

// ============================================================================
// Selection flow: tokens and keyboards drive each other
// ============================================================================

mod selection_flow_tests {
    use komuz::telegram::callbacks::{CallbackToken, ContentChoice};
    use komuz::telegram::keyboards;
    use teloxide::types::InlineKeyboardButtonKind;

    fn callback_data(kb: &teloxide::types::InlineKeyboardMarkup) -> Vec<String> {
        kb.inline_keyboard
            .iter()
            .flatten()
            .filter_map(|b| match &b.kind {
                InlineKeyboardButtonKind::CallbackData(data) => Some(data.clone()),
                _ => None,
            })
            .collect()
    }

    /// The audio selection path: the content-type button produces a token
    /// the router maps to the audio tier keyboard, whose buttons in turn
    /// produce tokens naming the tier and the original URL.
    #[test]
    fn audio_selection_tokens_round_trip() {
        let url = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

        let content_kb = keyboards::content_type_keyboard(url);
        let tokens: Vec<_> = callback_data(&content_kb)
            .iter()
            .map(|d| CallbackToken::parse(d).expect("button token must parse"))
            .collect();
        assert!(tokens.contains(&CallbackToken::Content {
            choice: ContentChoice::Audio,
            url: url.to_string()
        }));

        let audio_kb = keyboards::audio_quality_keyboard(url);
        let tiers: Vec<String> = callback_data(&audio_kb)
            .iter()
            .map(|d| match CallbackToken::parse(d) {
                Some(CallbackToken::Audio { tier, url: token_url }) => {
                    assert_eq!(token_url, url);
                    tier
                }
                other => panic!("unexpected token {:?}", other),
            })
            .collect();
        assert_eq!(tiers, vec!["high", "medium", "low"]);
    }

    /// Quality keyboards built from the fallback ladder still emit valid
    /// tokens — an empty probe never leaves the user without options.
    #[test]
    fn fallback_ladder_produces_valid_quality_tokens() {
        let url = "https://youtu.be/a_b_c123456";
        let ladder = [1080, 720, 480, 360, 240];
        let kb = keyboards::video_quality_keyboard(&ladder, url);
        let data = callback_data(&kb);
        assert_eq!(data.len(), ladder.len());
        for (d, height) in data.iter().zip(ladder) {
            match CallbackToken::parse(d) {
                Some(CallbackToken::Quality { tier, url: token_url }) => {
                    assert_eq!(tier, format!("{}p", height));
                    assert_eq!(token_url, url);
                }
                other => panic!("unexpected token {:?}", other),
            }
        }
    }

    /// Foreign or stale callback data falls through to the ignore path.
    #[test]
    fn foreign_callback_data_is_ignored() {
        for data in ["subscribe:premium", "dl:mp4:abc", "ig:dl:xyz", "quality720p"] {
            assert_eq!(CallbackToken::parse(data), None, "{:?} must not parse", data);
        }
    }
}
