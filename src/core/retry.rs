//! Retry logic for flaky extraction calls with exponential backoff.
//!
//! External extractors fail transiently often enough that every flaky
//! platform call is wrapped in a [`RetryPolicy`]. The transient/terminal
//! decision is a match on [`DownloadError`] variants, so the policy never
//! inspects error text itself.

use crate::download::error::DownloadError;
use std::future::Future;
use std::time::Duration;

/// Retry strategy for one platform.
///
/// `max_attempts` bounds the total number of invocations (not just
/// retries). Sleeps grow as `backoff_base^attempt` seconds with the
/// attempt 0-indexed, so the first retry waits `backoff_base^0` = 1 second
/// with the default base.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts allowed, including the first
    pub max_attempts: u32,
    /// Base of the exponential backoff, in seconds
    pub backoff_base: f64,
    /// User-facing message shown when the platform ultimately fails
    pub error_template: &'static str,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_base: f64, error_template: &'static str) -> Self {
        Self {
            max_attempts,
            backoff_base,
            error_template,
        }
    }

    /// Policy for TikTok downloads.
    pub fn tiktok() -> Self {
        use crate::core::config::retry::tiktok;
        Self::new(tiktok::MAX_ATTEMPTS, tiktok::BACKOFF_BASE, tiktok::ERROR_TEMPLATE)
    }

    /// Policy for Instagram downloads.
    pub fn instagram() -> Self {
        use crate::core::config::retry::instagram;
        Self::new(instagram::MAX_ATTEMPTS, instagram::BACKOFF_BASE, instagram::ERROR_TEMPLATE)
    }

    /// Backoff delay before the retry following the given 0-indexed attempt.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        Duration::from_secs_f64(self.backoff_base.powi(attempt as i32))
    }

    /// Runs `operation` until it succeeds or the policy gives up.
    ///
    /// Transient failures are retried with backoff while attempts remain.
    /// On exhaustion the caller gets `Terminal` with the platform template
    /// alone — the raw tool noise has already been logged. A terminal
    /// failure stops immediately and carries the raw error appended to the
    /// template for diagnosability. Any other classification (photo-only,
    /// empty result, timeout) propagates unchanged so callers can react.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T, DownloadError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DownloadError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(DownloadError::Transient(msg)) if attempt + 1 < self.max_attempts => {
                    let delay = self.delay_for_attempt(attempt);
                    log::warn!(
                        "Attempt {}/{} failed (retrying in {:?}): {}",
                        attempt + 1,
                        self.max_attempts,
                        delay,
                        msg
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(DownloadError::Transient(msg)) => {
                    log::error!("All {} attempts failed, last error: {}", self.max_attempts, msg);
                    return Err(DownloadError::Terminal(self.error_template.to_string()));
                }
                Err(DownloadError::Terminal(raw)) => {
                    log::error!("Non-retryable extractor error: {}", raw);
                    return Err(DownloadError::Terminal(format!("{}: {}", self.error_template, raw)));
                }
                Err(other) => return Err(other),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    const TEMPLATE: &str = "platform failed";

    fn quick_policy(max_attempts: u32) -> RetryPolicy {
        // base^0 = 1s is fixed; the tiny base keeps later backoff steps fast.
        RetryPolicy::new(max_attempts, 0.01, TEMPLATE)
    }

    #[tokio::test]
    async fn succeeds_first_try_without_sleeping() {
        let policy = quick_policy(3);
        let start = std::time::Instant::now();
        let result = policy.run(|| async { Ok::<_, DownloadError>(42) }).await;
        assert_eq!(result, Ok(42));
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn transient_failures_retried_until_success() {
        let policy = quick_policy(3);
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = policy
            .run(|| {
                let counter = counter_clone.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(DownloadError::Transient("unable to extract".into()))
                    } else {
                        Ok(7)
                    }
                }
            })
            .await;

        assert_eq!(result, Ok(7));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhaustion_returns_template_only() {
        let policy = quick_policy(3);
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result: Result<(), _> = policy
            .run(|| {
                let counter = counter_clone.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(DownloadError::Transient("still broken".into()))
                }
            })
            .await;

        assert_eq!(counter.load(Ordering::SeqCst), 3);
        match result {
            Err(DownloadError::Terminal(msg)) => assert_eq!(msg, TEMPLATE),
            other => panic!("expected terminal template error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn terminal_failure_makes_single_attempt() {
        let policy = quick_policy(5);
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result: Result<(), _> = policy
            .run(|| {
                let counter = counter_clone.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(DownloadError::Terminal("private video".into()))
                }
            })
            .await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        match result {
            Err(DownloadError::Terminal(msg)) => {
                assert!(msg.starts_with(TEMPLATE));
                assert!(msg.contains("private video"));
            }
            other => panic!("expected terminal error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn photo_only_propagates_unchanged() {
        let policy = quick_policy(5);
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result: Result<(), _> = policy
            .run(|| {
                let counter = counter_clone.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(DownloadError::PhotoOnly("no video in this post".into()))
                }
            })
            .await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(result, Err(DownloadError::PhotoOnly("no video in this post".into())));
    }

    #[test]
    fn backoff_grows_exponentially_from_base_power_zero() {
        let policy = RetryPolicy::new(4, 2.0, TEMPLATE);
        assert_eq!(policy.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(4));
    }

    #[tokio::test]
    async fn sleeps_once_per_retry() {
        // First retry always waits base^0 = 1s regardless of base; with two
        // transient failures the total wait is base^0 + base^1.
        let policy = quick_policy(3);
        let start = std::time::Instant::now();
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = policy
            .run(|| {
                let counter = counter_clone.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(DownloadError::Transient("webpage".into()))
                    } else {
                        Ok(())
                    }
                }
            })
            .await;

        assert_eq!(result, Ok(()));
        let expected = policy.delay_for_attempt(0) + policy.delay_for_attempt(1);
        assert!(start.elapsed() >= expected);
    }
}
