//! Read-counting filesystem wrapper

use async_trait::async_trait;
use copy_fs::{DirEntry, FileStat, InputFileSystem};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Forwards to an inner filesystem and counts `read_file` calls.
#[derive(Debug)]
pub struct CountingFs {
    inner: Arc<dyn InputFileSystem>,
    reads: AtomicUsize,
}

impl CountingFs {
    pub fn new(inner: Arc<dyn InputFileSystem>) -> Self {
        Self {
            inner,
            reads: AtomicUsize::new(0),
        }
    }

    /// Number of files read so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InputFileSystem for CountingFs {
    async fn stat(&self, path: &Path) -> io::Result<FileStat> {
        self.inner.stat(path).await
    }

    async fn lstat(&self, path: &Path) -> io::Result<FileStat> {
        self.inner.lstat(path).await
    }

    async fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read_file(path).await
    }

    async fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        self.inner.read_dir(path).await
    }

    async fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        self.inner.canonicalize(path).await
    }
}
