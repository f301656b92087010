//! Filesystem snapshots
//!
//! A [`Snapshot`] fingerprints one file as of the moment its content was
//! read. Size and modification time are always recorded. When the file's
//! modification time is not strictly before the read started, the time
//! alone cannot prove the content is unchanged, so a content checksum is
//! recorded as well and validation compares that instead.

use async_trait::async_trait;
use copy_fs::InputFileSystem;
use copy_fs::checksum::compute_content_checksum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::debug;

use crate::{Error, Result};

/// Point-in-time fingerprint of a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub path: PathBuf,
    pub len: u64,
    pub modified: Option<SystemTime>,
    pub checksum: Option<String>,
}

/// Snapshot capability.
#[async_trait]
pub trait Snapshotter: Send + Sync + std::fmt::Debug {
    /// Fingerprint `path` as of `start`, when `content` was read from it.
    /// Any checksum is taken over `content`, never over a fresh read.
    /// `Ok(None)` when the path cannot be snapshotted (e.g. it is not a
    /// regular file).
    async fn create_snapshot(
        &self,
        start: SystemTime,
        path: &Path,
        content: &[u8],
    ) -> Result<Option<Snapshot>>;

    /// Whether the file still matches the fingerprint.
    async fn is_snapshot_valid(&self, snapshot: &Snapshot) -> Result<bool>;
}

/// Snapshots taken through an [`InputFileSystem`].
#[derive(Debug, Clone)]
pub struct FsSnapshotter {
    fs: Arc<dyn InputFileSystem>,
}

impl FsSnapshotter {
    pub fn new(fs: Arc<dyn InputFileSystem>) -> Self {
        Self { fs }
    }

    async fn checksum(&self, path: &Path) -> Result<String> {
        let content = self
            .fs
            .read_file(path)
            .await
            .map_err(|e| Error::io(path, e))?;
        Ok(compute_content_checksum(&content))
    }
}

#[async_trait]
impl Snapshotter for FsSnapshotter {
    async fn create_snapshot(
        &self,
        start: SystemTime,
        path: &Path,
        content: &[u8],
    ) -> Result<Option<Snapshot>> {
        let stat = self.fs.stat(path).await.map_err(|e| Error::io(path, e))?;
        if !stat.is_file() {
            return Ok(None);
        }

        let trusted = stat.modified.is_some_and(|modified| modified < start);
        let checksum = if trusted {
            None
        } else {
            Some(compute_content_checksum(content))
        };

        Ok(Some(Snapshot {
            path: path.to_path_buf(),
            len: stat.len,
            modified: stat.modified,
            checksum,
        }))
    }

    async fn is_snapshot_valid(&self, snapshot: &Snapshot) -> Result<bool> {
        let stat = match self.fs.stat(&snapshot.path).await {
            Ok(stat) => stat,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(Error::io(&snapshot.path, e)),
        };

        if !stat.is_file() || stat.len != snapshot.len {
            return Ok(false);
        }

        let valid = match &snapshot.checksum {
            Some(expected) => self.checksum(&snapshot.path).await? == *expected,
            None => stat.modified == snapshot.modified,
        };
        if !valid {
            debug!("snapshot of '{}' is stale", snapshot.path.display());
        }
        Ok(valid)
    }
}
