use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::errors::Result;
use crate::models::Identity;

/// Cache of unique ids issued by the game version service, keyed by user.
///
/// Implementations treat prune, lookup, append and persist as one critical
/// section.
#[async_trait::async_trait]
pub trait IdentityCache: Send + Sync {
    /// Whether a valid identity exists for `user_key`
    async fn has(&self, user_key: &str) -> bool;

    /// Drops expired entries, then returns the newest valid match
    async fn get(&self, user_key: &str) -> Option<Identity>;

    /// Appends and persists
    async fn put(&self, identity: Identity) -> Result<()>;

    /// Removes every entry, including persisted ones
    async fn reset(&self) -> Result<()>;
}

/// Removes expired entries; returns whether anything was removed
pub(crate) fn prune(entries: &mut Vec<Identity>, now: DateTime<Utc>) -> bool {
    let before = entries.len();
    entries.retain(|entry| !entry.is_expired_at(now));
    entries.len() != before
}

pub(crate) fn newest_valid<'a>(
    entries: &'a [Identity],
    user_key: &str,
    now: DateTime<Utc>,
) -> Option<&'a Identity> {
    entries
        .iter()
        .filter(|entry| entry.user_key == user_key && entry.is_valid_at(now))
        .max_by_key(|entry| entry.issued_at)
}

/// In-memory identity cache for testing and single-run use
#[derive(Debug, Default)]
pub struct MemoryIdentityCache {
    entries: Mutex<Vec<Identity>>,
}

impl MemoryIdentityCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl IdentityCache for MemoryIdentityCache {
    async fn has(&self, user_key: &str) -> bool {
        let entries = self.entries.lock().await;
        newest_valid(&entries, user_key, Utc::now()).is_some()
    }

    async fn get(&self, user_key: &str) -> Option<Identity> {
        let now = Utc::now();
        let mut entries = self.entries.lock().await;
        prune(&mut entries, now);
        newest_valid(&entries, user_key, now).cloned()
    }

    async fn put(&self, identity: Identity) -> Result<()> {
        self.entries.lock().await.push(identity);
        Ok(())
    }

    async fn reset(&self) -> Result<()> {
        self.entries.lock().await.clear();
        Ok(())
    }
}
