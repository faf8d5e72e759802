//! Key-Value Slot Storage
//!
//! Durable per-resource slots that cache a buyer's token between sessions.
//! The verifier stays authoritative; these slots only remember which token to
//! present.

use anyhow::Context;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Simple string key-value storage
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Insert or overwrite
    fn set(&self, key: &str, value: &str) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;
}

/// In-memory slot storage (for development and tests)
#[derive(Default)]
pub struct MemoryKeyValueStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}

/// Slot storage persisted to a JSON file.
///
/// Every write rewrites the whole file; fine for the handful of slots a
/// session holds. Memory only changes once the file write succeeds.
pub struct FileKeyValueStore {
    path: PathBuf,
    entries: RwLock<HashMap<String, String>>,
}

impl FileKeyValueStore {
    /// Open the store, loading existing entries if the file exists
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&raw)?
        } else {
            HashMap::new()
        };

        tracing::debug!(path = %path.display(), slots = entries.len(), "Opened token slot store");
        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &HashMap<String, String>) -> Result<()> {
        let raw = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, raw)
            .with_context(|| format!("writing {}", self.path.display()))?;
        Ok(())
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.write();
        let mut next = entries.clone();
        next.insert(key.to_string(), value.to_string());
        self.flush(&next)?;
        *entries = next;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write();
        if !entries.contains_key(key) {
            return Ok(());
        }
        let mut next = entries.clone();
        next.remove(key);
        self.flush(&next)?;
        *entries = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PaymentError;

    #[test]
    fn test_memory_store_overwrites() {
        let store = MemoryKeyValueStore::new();
        store.set("k", "one").unwrap();
        store.set("k", "two").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("two"));

        store.remove("k").unwrap();
        assert!(store.get("k").unwrap().is_none());
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let path = std::env::temp_dir().join(format!("paywall-slots-{}.json", uuid::Uuid::new_v4()));

        {
            let store = FileKeyValueStore::open(&path).unwrap();
            store.set("payment_token_article-1", "tk_1").unwrap();
            store.set("payment_token_video-1", "tk_2").unwrap();
            store.remove("payment_token_video-1").unwrap();
        }

        let reopened = FileKeyValueStore::open(&path).unwrap();
        assert_eq!(reopened.get("payment_token_article-1").unwrap().as_deref(), Some("tk_1"));
        assert!(reopened.get("payment_token_video-1").unwrap().is_none());

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_failed_write_leaves_memory_unchanged() {
        let dir = std::env::temp_dir().join(format!("paywall-missing-{}", uuid::Uuid::new_v4()));
        let store = FileKeyValueStore::open(dir.join("slots.json")).unwrap();

        let err = store.set("payment_token_article-1", "tk_1").unwrap_err();
        assert!(matches!(err, PaymentError::Storage(_)));
        assert!(store.get("payment_token_article-1").unwrap().is_none());
    }

    #[test]
    fn test_failed_remove_keeps_entry() {
        let dir = std::env::temp_dir().join(format!("paywall-slots-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir(&dir).unwrap();
        let store = FileKeyValueStore::open(dir.join("slots.json")).unwrap();
        store.set("payment_token_article-1", "tk_1").unwrap();

        std::fs::remove_dir_all(&dir).unwrap();
        assert!(store.remove("payment_token_article-1").is_err());
        assert_eq!(store.get("payment_token_article-1").unwrap().as_deref(), Some("tk_1"));
    }
}
