//! Normalized path handling for cross-platform compatibility
//!
//! Destination names, dependency ids and cache keys are always expressed
//! with forward slashes. Path arithmetic here is purely lexical: nothing in
//! this module touches the filesystem.

use std::ffi::OsString;
use std::path::{Component, MAIN_SEPARATOR, Path, PathBuf};

/// A path normalized to use forward slashes internally.
///
/// Converts to the platform-native format only at I/O boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedPath {
    /// Internal representation always uses forward slashes
    inner: String,
}

impl NormalizedPath {
    /// Create a new NormalizedPath from any path-like input.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            inner: to_slash(path.as_ref()),
        }
    }

    /// Get the internal normalized string representation.
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Convert to a platform-native PathBuf for I/O operations.
    pub fn to_native(&self) -> PathBuf {
        PathBuf::from(&self.inner)
    }

    /// Join this path with a `/`-separated segment.
    pub fn join(&self, segment: &str) -> Self {
        let joined = if self.inner.is_empty() {
            segment.to_string()
        } else if self.inner.ends_with('/') {
            format!("{}{}", self.inner, segment)
        } else {
            format!("{}/{}", self.inner, segment)
        };
        Self { inner: joined }
    }

    /// Get the file name component.
    pub fn file_name(&self) -> Option<&str> {
        let trimmed = self.inner.trim_end_matches('/');
        trimmed.rsplit('/').next().filter(|name| !name.is_empty())
    }

    /// Whether the path was written with a trailing separator.
    pub fn has_trailing_separator(&self) -> bool {
        self.inner.ends_with('/')
    }

    /// Get the extension if present.
    ///
    /// Dotfiles such as `.gitignore` have no extension.
    pub fn extension(&self) -> Option<&str> {
        self.file_name().and_then(|name| {
            let idx = name.rfind('.')?;
            if idx == 0 || idx + 1 == name.len() {
                None
            } else {
                Some(&name[idx + 1..])
            }
        })
    }
}

impl AsRef<Path> for NormalizedPath {
    fn as_ref(&self) -> &Path {
        Path::new(&self.inner)
    }
}

impl std::fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl From<&str> for NormalizedPath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for NormalizedPath {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<PathBuf> for NormalizedPath {
    fn from(p: PathBuf) -> Self {
        Self::new(p)
    }
}

impl From<&Path> for NormalizedPath {
    fn from(p: &Path) -> Self {
        Self::new(p)
    }
}

/// Render a path with `/` separators.
///
/// Only the platform separator is rewritten: on Unix a backslash is a legal
/// file name character (and a glob escape), so it is left alone.
pub fn to_slash(path: &Path) -> String {
    let raw = path.to_string_lossy();
    if MAIN_SEPARATOR == '\\' {
        raw.replace('\\', "/")
    } else {
        raw.into_owned()
    }
}

/// Lexically normalize a `/`-separated path.
///
/// Collapses `.` and duplicate separators, resolves `..` where a preceding
/// segment exists and keeps a trailing separator. An empty path becomes `.`.
pub fn normalize_lexically(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }

    let absolute = path.starts_with('/');
    let trailing = path.ends_with('/');
    let mut parts: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|last| *last != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }

    let mut out = parts.join("/");
    if absolute {
        out.insert(0, '/');
    }
    if out.is_empty() {
        out.push('.');
    }
    if trailing && !out.ends_with('/') {
        out.push('/');
    }
    out
}

fn lexical_components(path: &Path) -> Vec<OsString> {
    let mut parts: Vec<OsString> = Vec::new();
    let mut rooted = 0;

    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => {
                parts.push(component.as_os_str().to_os_string());
                rooted = parts.len();
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if parts.len() > rooted && parts.last().is_some_and(|last| last != "..") {
                    parts.pop();
                } else if rooted == 0 {
                    parts.push(OsString::from(".."));
                }
            }
            Component::Normal(name) => parts.push(name.to_os_string()),
        }
    }

    parts
}

/// Lexically normalize a native path (no symlink resolution).
pub fn normalize_path(path: &Path) -> PathBuf {
    let normalized: PathBuf = lexical_components(path).into_iter().collect();
    if normalized.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        normalized
    }
}

/// Compute `target` relative to `base`, lexically.
///
/// Returns an empty path when both point at the same location.
pub fn relative_path(base: &Path, target: &Path) -> PathBuf {
    let base = lexical_components(base);
    let target = lexical_components(target);
    let common = base
        .iter()
        .zip(&target)
        .take_while(|(a, b)| a == b)
        .count();

    let mut out = PathBuf::new();
    for _ in common..base.len() {
        out.push("..");
    }
    for part in &target[common..] {
        out.push(part);
    }
    out
}
