//! The capabilities a host build system supplies to a run

use copy_cache::{CacheStore, Snapshotter};
use copy_fs::{FsGlobber, Globber, InputFileSystem, NativeFs};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Paths the host should watch, accumulated across all patterns.
///
/// Both sets only grow; inserting a path twice is a no-op.
#[derive(Debug, Default)]
pub struct Dependencies {
    files: Mutex<BTreeSet<PathBuf>>,
    contexts: Mutex<BTreeSet<PathBuf>>,
}

impl Dependencies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file_dependency(&self, path: impl Into<PathBuf>) {
        Self::lock(&self.files).insert(path.into());
    }

    pub fn add_context_dependency(&self, path: impl Into<PathBuf>) {
        Self::lock(&self.contexts).insert(path.into());
    }

    /// Watched files, sorted.
    pub fn file_dependencies(&self) -> Vec<PathBuf> {
        Self::lock(&self.files).iter().cloned().collect()
    }

    /// Watched directories, sorted.
    pub fn context_dependencies(&self) -> Vec<PathBuf> {
        Self::lock(&self.contexts).iter().cloned().collect()
    }

    fn lock(set: &Mutex<BTreeSet<PathBuf>>) -> MutexGuard<'_, BTreeSet<PathBuf>> {
        set.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Host capabilities, obtained once per run.
///
/// Cheap to clone; every capability is shared.
#[derive(Clone)]
pub struct Host {
    /// Build context relative sources are resolved against
    pub context: PathBuf,
    /// Output root absolute destinations are made relative to
    pub output_path: Option<PathBuf>,
    pub fs: Arc<dyn InputFileSystem>,
    pub globber: Arc<dyn Globber>,
    pub dependencies: Arc<Dependencies>,
    pub cache: Option<Arc<dyn CacheStore>>,
    pub snapshotter: Option<Arc<dyn Snapshotter>>,
}

impl Host {
    /// Host over `fs`, globbing with [`FsGlobber`] and without caching.
    pub fn new(context: impl Into<PathBuf>, fs: Arc<dyn InputFileSystem>) -> Self {
        Self {
            context: context.into(),
            output_path: None,
            globber: Arc::new(FsGlobber::new(fs.clone())),
            fs,
            dependencies: Arc::new(Dependencies::new()),
            cache: None,
            snapshotter: None,
        }
    }

    /// Host over the operating system's filesystem.
    pub fn native(context: impl Into<PathBuf>) -> Self {
        Self::new(context, Arc::new(NativeFs))
    }

    pub fn with_output_path(mut self, output_path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(output_path.into());
        self
    }

    pub fn with_globber(mut self, globber: Arc<dyn Globber>) -> Self {
        self.globber = globber;
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_snapshotter(mut self, snapshotter: Arc<dyn Snapshotter>) -> Self {
        self.snapshotter = Some(snapshotter);
        self
    }

    pub fn context(&self) -> &Path {
        &self.context
    }
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host")
            .field("context", &self.context)
            .field("output_path", &self.output_path)
            .field("fs", &self.fs)
            .field("globber", &self.globber)
            .field("cache", &self.cache)
            .field("snapshotter", &self.snapshotter)
            .finish_non_exhaustive()
    }
}
