use crate::core::config;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Admission controller for concurrent downloads.
///
/// Tracks in-flight downloads per user and rejects new ones once a user
/// reaches the configured limit. Privileged users (administrators) have no
/// limit. The check-and-register step is atomic with respect to concurrent
/// attempts by the same user: both happen under one lock, so two racing
/// requests can never both claim the last free slot.
pub struct DownloadLimiter {
    /// Active download tokens per user
    active: Mutex<HashMap<i64, HashSet<String>>>,
    /// Maximum concurrent downloads for regular users
    max_per_user: usize,
    /// Users exempt from the limit
    unlimited_ids: Vec<i64>,
}

impl DownloadLimiter {
    /// Creates a limiter with explicit settings (used by tests).
    pub fn new(max_per_user: usize, unlimited_ids: Vec<i64>) -> Self {
        Self {
            active: Mutex::new(HashMap::new()),
            max_per_user,
            unlimited_ids,
        }
    }

    /// Creates a limiter from the process configuration.
    pub fn from_config() -> Self {
        Self::new(*config::limits::MAX_DOWNLOADS_PER_USER, config::admin::ADMIN_IDS.clone())
    }

    /// Returns true if the user may start another download right now.
    pub fn can_download(&self, user_id: i64) -> bool {
        if self.is_unlimited(user_id) {
            return true;
        }
        let active = self.active.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        active.get(&user_id).map_or(0, HashSet::len) < self.max_per_user
    }

    /// Atomically registers a download for a user.
    ///
    /// Returns false without side effects if the user is at the limit.
    pub fn start_download(&self, user_id: i64, token: &str) -> bool {
        let mut active = self.active.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let slots = active.entry(user_id).or_default();
        if !self.is_unlimited(user_id) && slots.len() >= self.max_per_user {
            log::info!(
                "User {} has reached download limit ({}/{})",
                user_id,
                slots.len(),
                self.max_per_user
            );
            return false;
        }
        slots.insert(token.to_string());
        log::info!("User {} started download {}. Active: {}", user_id, token, slots.len());
        true
    }

    /// Removes a download slot. Idempotent: unknown tokens and users are a no-op.
    pub fn finish_download(&self, user_id: i64, token: &str) {
        let mut active = self.active.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(slots) = active.get_mut(&user_id) {
            slots.remove(token);
            if slots.is_empty() {
                active.remove(&user_id);
            }
        }
        let remaining = active.get(&user_id).map_or(0, HashSet::len);
        log::info!("User {} finished download {}. Active: {}", user_id, token, remaining);
    }

    /// Number of downloads currently in flight for a user.
    pub fn active_count(&self, user_id: i64) -> usize {
        let active = self.active.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        active.get(&user_id).map_or(0, HashSet::len)
    }

    /// Returns true if the user is exempt from download limits.
    pub fn is_unlimited(&self, user_id: i64) -> bool {
        self.unlimited_ids.contains(&user_id)
    }

    /// Maximum concurrent downloads for regular users.
    pub fn max_per_user(&self) -> usize {
        self.max_per_user
    }

    /// Tries to claim a download slot, returning a guard that releases it
    /// on drop.
    ///
    /// The guard is the only way download code holds a slot, so release
    /// runs exactly once per successful acquisition no matter how the
    /// download task terminates.
    pub fn acquire(self: &Arc<Self>, user_id: i64) -> Option<DownloadSlot> {
        let token = Uuid::new_v4().to_string();
        if self.start_download(user_id, &token) {
            Some(DownloadSlot {
                limiter: Arc::clone(self),
                user_id,
                token,
            })
        } else {
            None
        }
    }
}

/// RAII guard for one in-flight download.
pub struct DownloadSlot {
    limiter: Arc<DownloadLimiter>,
    user_id: i64,
    token: String,
}

impl DownloadSlot {
    /// The unique token identifying this download attempt.
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl Drop for DownloadSlot {
    fn drop(&mut self) {
        self.limiter.finish_download(self.user_id, &self.token);
    }
}
