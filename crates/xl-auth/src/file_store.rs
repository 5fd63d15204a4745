use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use xl_game::LauncherSettings;

use crate::errors::Result;
use crate::models::Identity;
use crate::store::{IdentityCache, newest_valid, prune};

/// Identity cache persisted as a JSON list in a single file.
///
/// The whole file is rewritten after every mutation. One instance per file
/// is assumed; there is no cross-process locking.
#[derive(Debug)]
pub struct FileIdentityCache {
    path: PathBuf,
    entries: Mutex<Vec<Identity>>,
}

impl FileIdentityCache {
    /// Opens the cache at `path`. A missing or unreadable file is an empty cache.
    pub async fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = Self::load_from_disk(&path).await;
        debug!("Loaded {} cached identities from {}", entries.len(), path.display());

        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    /// Get default cache location for the current platform
    pub fn default_path() -> Result<PathBuf> {
        Ok(LauncherSettings::data_dir()?.join("uidCache.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load_from_disk(path: &Path) -> Vec<Identity> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!("Failed to read identity cache {}: {}", path.display(), e);
                return Vec::new();
            }
        };

        serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!("Ignoring corrupt identity cache {}: {}", path.display(), e);
            Vec::new()
        })
    }

    async fn save_to_disk(&self, entries: &[Identity]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(entries)?;

        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, json).await?;
        fs::rename(&temp_path, &self.path).await?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl IdentityCache for FileIdentityCache {
    async fn has(&self, user_key: &str) -> bool {
        let entries = self.entries.lock().await;
        newest_valid(&entries, user_key, Utc::now()).is_some()
    }

    async fn get(&self, user_key: &str) -> Option<Identity> {
        let now = Utc::now();
        let mut entries = self.entries.lock().await;

        if prune(&mut entries, now)
            && let Err(e) = self.save_to_disk(&entries).await
        {
            warn!("Failed to persist pruned identity cache: {}", e);
        }

        newest_valid(&entries, user_key, now).cloned()
    }

    async fn put(&self, identity: Identity) -> Result<()> {
        let mut entries = self.entries.lock().await;
        entries.push(identity);
        self.save_to_disk(&entries).await
    }

    async fn reset(&self) -> Result<()> {
        let mut entries = self.entries.lock().await;
        entries.clear();
        self.save_to_disk(&entries).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    fn cache_path(temp: &TempDir) -> PathBuf {
        temp.path().join("cache").join("uidCache.json")
    }

    #[tokio::test]
    async fn test_put_persists_across_instances() {
        let temp = TempDir::new().unwrap();

        let cache = FileIdentityCache::open(cache_path(&temp)).await;
        cache.put(Identity::new("alice", "uid-1", 3, 4)).await.unwrap();
        drop(cache);

        let reopened = FileIdentityCache::open(cache_path(&temp)).await;
        let identity = reopened.get("alice").await.unwrap();
        assert_eq!(identity.session_unique_id, "uid-1");
        assert_eq!(identity.region, 3);
        assert_eq!(identity.max_expansion, 4);
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let cache = FileIdentityCache::open(cache_path(&temp)).await;

        assert!(!cache.has("alice").await);
        assert!(!cache.path().exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("uidCache.json");
        tokio::fs::write(&path, "{ not json").await.unwrap();

        let cache = FileIdentityCache::open(&path).await;
        assert!(cache.get("alice").await.is_none());

        cache.put(Identity::new("alice", "uid", 1, 2)).await.unwrap();
        assert!(cache.has("alice").await);
    }

    #[tokio::test]
    async fn test_expired_entries_are_pruned_from_disk() {
        let temp = TempDir::new().unwrap();
        let cache = FileIdentityCache::open(cache_path(&temp)).await;

        let mut stale = Identity::new("alice", "old", 3, 4);
        stale.issued_at = Utc::now() - Duration::days(2);
        cache.put(stale).await.unwrap();
        cache.put(Identity::new("bob", "fresh", 3, 4)).await.unwrap();

        assert!(cache.get("alice").await.is_none());

        let on_disk: Vec<Identity> =
            serde_json::from_str(&tokio::fs::read_to_string(cache.path()).await.unwrap()).unwrap();
        assert_eq!(on_disk.len(), 1);
        assert_eq!(on_disk[0].user_key, "bob");
    }

    #[tokio::test]
    async fn test_reset_empties_persisted_state() {
        let temp = TempDir::new().unwrap();
        let cache = FileIdentityCache::open(cache_path(&temp)).await;
        cache.put(Identity::new("alice", "uid", 3, 4)).await.unwrap();

        cache.reset().await.unwrap();

        let reopened = FileIdentityCache::open(cache_path(&temp)).await;
        assert!(!reopened.has("alice").await);

        let on_disk: Vec<Identity> =
            serde_json::from_str(&tokio::fs::read_to_string(cache.path()).await.unwrap()).unwrap();
        assert!(on_disk.is_empty());
    }
}
