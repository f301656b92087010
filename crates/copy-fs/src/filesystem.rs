//! Read-only filesystem capability
//!
//! The pipeline never touches `std::fs` directly: every stat, read and
//! directory listing goes through [`InputFileSystem`], so a host can supply
//! its own (cached, virtual or in-memory) filesystem.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;

use crate::path::normalize_path;

/// Kind of a filesystem entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    File,
    Directory,
    Symlink,
    Other,
}

impl From<std::fs::FileType> for FileKind {
    fn from(file_type: std::fs::FileType) -> Self {
        if file_type.is_symlink() {
            Self::Symlink
        } else if file_type.is_dir() {
            Self::Directory
        } else if file_type.is_file() {
            Self::File
        } else {
            Self::Other
        }
    }
}

/// Metadata returned by [`InputFileSystem::stat`] and [`InputFileSystem::lstat`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStat {
    pub kind: FileKind,
    pub len: u64,
    pub modified: Option<SystemTime>,
}

impl FileStat {
    pub fn is_file(&self) -> bool {
        self.kind == FileKind::File
    }

    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Directory
    }
}

impl From<std::fs::Metadata> for FileStat {
    fn from(meta: std::fs::Metadata) -> Self {
        Self {
            kind: meta.file_type().into(),
            len: meta.len(),
            modified: meta.modified().ok(),
        }
    }
}

/// One directory listing entry; `kind` does not follow symbolic links
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub kind: FileKind,
}

/// Filesystem operations the pipeline depends on.
#[async_trait]
pub trait InputFileSystem: Send + Sync + std::fmt::Debug {
    /// Stat a path, following symbolic links.
    async fn stat(&self, path: &Path) -> io::Result<FileStat>;

    /// Stat a path without following a final symbolic link.
    async fn lstat(&self, path: &Path) -> io::Result<FileStat>;

    async fn read_file(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// List a directory. Order is unspecified.
    async fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>>;

    /// The path with every symbolic link resolved.
    async fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;
}

/// The host operating system's filesystem, via `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeFs;

#[async_trait]
impl InputFileSystem for NativeFs {
    async fn stat(&self, path: &Path) -> io::Result<FileStat> {
        Ok(tokio::fs::metadata(path).await?.into())
    }

    async fn lstat(&self, path: &Path) -> io::Result<FileStat> {
        Ok(tokio::fs::symlink_metadata(path).await?.into())
    }

    async fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        tokio::fs::read(path).await
    }

    async fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let mut reader = tokio::fs::read_dir(path).await?;
        let mut entries = Vec::new();
        while let Some(entry) = reader.next_entry().await? {
            let kind = entry.file_type().await?.into();
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                kind,
            });
        }
        Ok(entries)
    }

    async fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        tokio::fs::canonicalize(path).await
    }
}

#[derive(Debug, Clone)]
enum MemoryNode {
    File {
        content: Vec<u8>,
        modified: SystemTime,
    },
    Directory,
    Symlink(PathBuf),
}

/// Maximum symbolic link hops before a lookup fails with a loop error
const MAX_LINK_HOPS: usize = 32;

/// An in-memory filesystem.
///
/// Paths are normalized lexically; parent directories are created
/// implicitly when a file is written.
#[derive(Debug, Default)]
pub struct MemoryFs {
    nodes: Mutex<BTreeMap<PathBuf, MemoryNode>>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write (or overwrite) a file, creating parent directories.
    pub fn write_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = normalize_path(path.as_ref());
        let mut nodes = self.lock();
        Self::insert_parents(&mut nodes, &path);
        nodes.insert(
            path,
            MemoryNode::File {
                content: content.into(),
                modified: SystemTime::now(),
            },
        );
    }

    /// Create a directory and its parents.
    pub fn create_dir_all(&self, path: impl AsRef<Path>) {
        let path = normalize_path(path.as_ref());
        let mut nodes = self.lock();
        Self::insert_parents(&mut nodes, &path);
        nodes.insert(path, MemoryNode::Directory);
    }

    /// Create a symbolic link at `link` pointing to `target`.
    pub fn symlink(&self, target: impl AsRef<Path>, link: impl AsRef<Path>) {
        let link = normalize_path(link.as_ref());
        let mut nodes = self.lock();
        Self::insert_parents(&mut nodes, &link);
        nodes.insert(link, MemoryNode::Symlink(target.as_ref().to_path_buf()));
    }

    /// Remove a file or an empty directory entry.
    pub fn remove(&self, path: impl AsRef<Path>) {
        let path = normalize_path(path.as_ref());
        self.lock().remove(&path);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<PathBuf, MemoryNode>> {
        // A poisoned map is still structurally valid
        self.nodes
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn insert_parents(nodes: &mut BTreeMap<PathBuf, MemoryNode>, path: &Path) {
        let mut current = path.parent();
        while let Some(dir) = current {
            if dir.as_os_str().is_empty() {
                break;
            }
            nodes
                .entry(dir.to_path_buf())
                .or_insert(MemoryNode::Directory);
            current = dir.parent();
        }
    }

    fn not_found(path: &Path) -> io::Error {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("no such file or directory: {}", path.display()),
        )
    }

    /// Resolve symbolic links in every component; the final component is
    /// only resolved when `follow` is set.
    fn resolve(
        nodes: &BTreeMap<PathBuf, MemoryNode>,
        path: &Path,
        follow: bool,
    ) -> io::Result<PathBuf> {
        let mut pending: Vec<OsString> = normalize_path(path)
            .components()
            .map(|c| c.as_os_str().to_os_string())
            .collect();
        pending.reverse();

        let mut resolved = PathBuf::new();
        let mut hops = 0;

        while let Some(part) = pending.pop() {
            let candidate = resolved.join(&part);
            let is_final = pending.is_empty();
            match nodes.get(&candidate) {
                Some(MemoryNode::Symlink(target)) if !is_final || follow => {
                    hops += 1;
                    if hops > MAX_LINK_HOPS {
                        return Err(io::Error::other(format!(
                            "too many levels of symbolic links: {}",
                            path.display()
                        )));
                    }
                    let target = normalize_path(&resolved.join(target));
                    pending.extend(
                        target
                            .components()
                            .rev()
                            .map(|c| c.as_os_str().to_os_string()),
                    );
                    resolved = PathBuf::new();
                }
                _ => resolved = candidate,
            }
        }

        Ok(resolved)
    }

    fn lookup(&self, path: &Path, follow: bool) -> io::Result<(PathBuf, MemoryNode)> {
        let nodes = self.lock();
        let resolved = Self::resolve(&nodes, path, follow)?;
        let node = nodes
            .get(&resolved)
            .cloned()
            .ok_or_else(|| Self::not_found(path))?;
        Ok((resolved, node))
    }

    fn stat_of(node: &MemoryNode) -> FileStat {
        match node {
            MemoryNode::File { content, modified } => FileStat {
                kind: FileKind::File,
                len: content.len() as u64,
                modified: Some(*modified),
            },
            MemoryNode::Directory => FileStat {
                kind: FileKind::Directory,
                len: 0,
                modified: None,
            },
            MemoryNode::Symlink(_) => FileStat {
                kind: FileKind::Symlink,
                len: 0,
                modified: None,
            },
        }
    }
}

#[async_trait]
impl InputFileSystem for MemoryFs {
    async fn stat(&self, path: &Path) -> io::Result<FileStat> {
        let (_, node) = self.lookup(path, true)?;
        Ok(Self::stat_of(&node))
    }

    async fn lstat(&self, path: &Path) -> io::Result<FileStat> {
        let (_, node) = self.lookup(path, false)?;
        Ok(Self::stat_of(&node))
    }

    async fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        match self.lookup(path, true)? {
            (_, MemoryNode::File { content, .. }) => Ok(content),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a file: {}", path.display()),
            )),
        }
    }

    async fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let (dir, node) = self.lookup(path, true)?;
        if !matches!(node, MemoryNode::Directory) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a directory: {}", path.display()),
            ));
        }

        let nodes = self.lock();
        Ok(nodes
            .iter()
            .filter(|(candidate, _)| candidate.parent() == Some(dir.as_path()))
            .filter_map(|(candidate, node)| {
                let name = candidate.file_name()?.to_string_lossy().into_owned();
                Some(DirEntry {
                    name,
                    kind: Self::stat_of(node).kind,
                })
            })
            .collect())
    }

    async fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        let (resolved, _) = self.lookup(path, true)?;
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_fs_creates_parents() {
        let fs = MemoryFs::new();
        fs.write_file("/root/a/b/file.txt", "content");

        assert!(fs.stat(Path::new("/root/a")).await.unwrap().is_dir());
        assert!(fs.stat(Path::new("/root/a/b/file.txt")).await.unwrap().is_file());

        let entries = fs.read_dir(Path::new("/root/a")).await.unwrap();
        assert_eq!(
            entries,
            vec![DirEntry {
                name: "b".into(),
                kind: FileKind::Directory
            }]
        );
    }

    #[tokio::test]
    async fn memory_fs_follows_symlinks_only_for_stat() {
        let fs = MemoryFs::new();
        fs.write_file("/root/file.txt", "x");
        fs.symlink("file.txt", "/root/link.txt");

        let followed = fs.stat(Path::new("/root/link.txt")).await.unwrap();
        assert!(followed.is_file());
        assert_eq!(followed.len, 1);

        let raw = fs.lstat(Path::new("/root/link.txt")).await.unwrap();
        assert_eq!(raw.kind, FileKind::Symlink);
        assert_eq!(fs.read_file(Path::new("/root/link.txt")).await.unwrap(), b"x");
    }

    #[tokio::test]
    async fn memory_fs_resolves_links_in_parent_components() {
        let fs = MemoryFs::new();
        fs.write_file("/root/real/nested.txt", "n");
        fs.symlink("real", "/root/alias");

        let entries = fs.read_dir(Path::new("/root/alias")).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert!(fs.stat(Path::new("/root/alias/nested.txt")).await.unwrap().is_file());
    }

    #[tokio::test]
    async fn memory_fs_reports_missing_paths() {
        let fs = MemoryFs::new();
        let err = fs.stat(Path::new("/nope")).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn memory_fs_canonicalizes_through_links() {
        let fs = MemoryFs::new();
        fs.write_file("/root/real/file.txt", "x");
        fs.symlink("real", "/root/link");
        assert_eq!(
            fs.canonicalize(Path::new("/root/link/file.txt")).await.unwrap(),
            PathBuf::from("/root/real/file.txt")
        );
    }

    #[tokio::test]
    async fn memory_fs_detects_symlink_loops() {
        let fs = MemoryFs::new();
        fs.symlink("b", "/root/a");
        fs.symlink("a", "/root/b");
        assert!(fs.stat(Path::new("/root/a")).await.is_err());
    }

    #[tokio::test]
    async fn native_fs_reads_directory_kinds() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(temp.path().join("file.txt"), "x").unwrap();
        std::fs::create_dir(temp.path().join("dir")).unwrap();

        let mut entries = NativeFs.read_dir(temp.path()).await.unwrap();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].kind, FileKind::Directory);
        assert_eq!(entries[1].kind, FileKind::File);
    }
}
