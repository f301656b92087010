//! Key to blob stores
//!
//! [`DiskStore`] is content-addressed: for every store id it keeps an
//! `index/` directory whose entries are named after the sha256 of the key
//! and hold the digest of the blob, and a `content/` directory whose files
//! are named after the sha256 of their bytes. Identical blobs stored under
//! different keys share one content file.

use async_trait::async_trait;
use copy_fs::checksum::compute_hex_digest;
use copy_fs::{NormalizedPath, io::write_atomic};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

use crate::{Error, Result};

/// Persistent key to blob store.
#[async_trait]
pub trait CacheStore: Send + Sync + std::fmt::Debug {
    /// Look up a blob. `Ok(None)` is a miss.
    async fn get(&self, store: &str, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store a blob, replacing any previous value for the key.
    async fn put(&self, store: &str, key: &str, blob: Vec<u8>) -> Result<()>;
}

/// In-process store; contents live as long as the value.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<(String, String), Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries across all stores.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Keys held in one store, sorted.
    pub fn keys(&self, store: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .lock()
            .keys()
            .filter(|(id, _)| id == store)
            .map(|(_, key)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<(String, String), Vec<u8>>> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, store: &str, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.lock().get(&(store.to_string(), key.to_string())).cloned())
    }

    async fn put(&self, store: &str, key: &str, blob: Vec<u8>) -> Result<()> {
        self.lock().insert((store.to_string(), key.to_string()), blob);
        Ok(())
    }
}

/// Content-addressed store under a root directory.
#[derive(Debug, Clone)]
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn index_path(&self, store: &str, key: &str) -> PathBuf {
        self.root
            .join(store)
            .join("index")
            .join(compute_hex_digest(key.as_bytes()))
    }

    fn content_path(&self, store: &str, digest: &str) -> PathBuf {
        self.root.join(store).join("content").join(digest)
    }

    async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::io(path, e)),
        }
    }

    async fn write(path: PathBuf, bytes: Vec<u8>) -> Result<()> {
        tokio::task::spawn_blocking(move || write_atomic(&NormalizedPath::new(&path), &bytes))
            .await
            .map_err(|e| Error::Task(e.to_string()))??;
        Ok(())
    }
}

#[async_trait]
impl CacheStore for DiskStore {
    async fn get(&self, store: &str, key: &str) -> Result<Option<Vec<u8>>> {
        let index = self.index_path(store, key);
        let Some(pointer) = Self::read_optional(&index).await? else {
            return Ok(None);
        };

        let digest = String::from_utf8(pointer).map_err(|e| Error::Corrupt {
            store: store.to_string(),
            key: key.to_string(),
            message: e.to_string(),
        })?;
        let digest = digest.trim();

        let content = self.content_path(store, digest);
        match Self::read_optional(&content).await? {
            Some(blob) if compute_hex_digest(&blob) == digest => Ok(Some(blob)),
            Some(_) => Err(Error::Corrupt {
                store: store.to_string(),
                key: key.to_string(),
                message: format!("content digest mismatch for {digest}"),
            }),
            None => {
                debug!("dangling cache index '{}' in store '{}'", key, store);
                Ok(None)
            }
        }
    }

    async fn put(&self, store: &str, key: &str, blob: Vec<u8>) -> Result<()> {
        let digest = compute_hex_digest(&blob);
        let content = self.content_path(store, &digest);

        if tokio::fs::metadata(&content).await.is_err() {
            Self::write(content, blob).await?;
        }
        Self::write(self.index_path(store, key), digest.into_bytes()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_partitions_by_store_id() {
        let store = MemoryStore::new();
        store.put("a", "key", b"one".to_vec()).await.unwrap();
        store.put("b", "key", b"two".to_vec()).await.unwrap();

        assert_eq!(store.get("a", "key").await.unwrap(), Some(b"one".to_vec()));
        assert_eq!(store.get("b", "key").await.unwrap(), Some(b"two".to_vec()));
        assert_eq!(store.get("c", "key").await.unwrap(), None);
        assert_eq!(store.keys("a"), vec!["key".to_string()]);
    }

    #[tokio::test]
    async fn disk_store_shares_identical_content() {
        let temp = tempfile::tempdir().unwrap();
        let store = DiskStore::new(temp.path());

        store.put("s", "first", b"same".to_vec()).await.unwrap();
        store.put("s", "second", b"same".to_vec()).await.unwrap();

        let blobs = std::fs::read_dir(temp.path().join("s/content")).unwrap().count();
        assert_eq!(blobs, 1);
        assert_eq!(store.get("s", "second").await.unwrap(), Some(b"same".to_vec()));
    }

    #[tokio::test]
    async fn disk_store_reports_tampered_content() {
        let temp = tempfile::tempdir().unwrap();
        let store = DiskStore::new(temp.path());
        store.put("s", "key", b"original".to_vec()).await.unwrap();

        let digest = compute_hex_digest(b"original");
        std::fs::write(temp.path().join("s/content").join(&digest), "tampered").unwrap();

        let err = store.get("s", "key").await.unwrap_err();
        assert!(matches!(err, Error::Corrupt { .. }));
    }
}
