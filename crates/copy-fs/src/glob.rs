//! Glob expansion capability
//!
//! [`Globber`] is the seam the pipeline expands patterns through.
//! [`FsGlobber`] is the default engine: it walks an [`InputFileSystem`]
//! from the pattern's static prefix and matches entries with `globset`.
//!
//! Matching rules:
//! - `*` and `?` never cross a `/`; `**` spans directories
//! - relative patterns and ignore patterns are matched against paths
//!   relative to `cwd`; absolute patterns against absolute paths
//! - with `dot` unset, entries whose name starts with `.` are skipped unless
//!   the pattern itself names a dot-segment

use async_trait::async_trait;
use globset::{GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::filesystem::{FileKind, InputFileSystem};
use crate::path::{relative_path, to_slash};
use crate::{Error, Result};

/// Walk depth cap
const MAX_WALK_DEPTH: usize = 64;

/// How literal path text is protected from glob interpretation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EscapePolicy {
    /// Prefix each metacharacter with `\`
    #[default]
    Backslash,
    /// Wrap each metacharacter in a one-character class, e.g. `[*]`.
    /// Backslash is then an ordinary character.
    CharacterClass,
}

impl EscapePolicy {
    fn metacharacters(self) -> &'static [char] {
        match self {
            Self::Backslash => &['*', '?', '[', ']', '{', '}', '(', ')', '!', '\\'],
            Self::CharacterClass => &['*', '?', '[', ']', '{', '}'],
        }
    }
}

/// Escape a literal path so that it only matches itself.
pub fn escape(literal: &str, policy: EscapePolicy) -> String {
    let meta = policy.metacharacters();
    let mut out = String::with_capacity(literal.len());
    for c in literal.chars() {
        if meta.contains(&c) {
            match policy {
                EscapePolicy::Backslash => {
                    out.push('\\');
                    out.push(c);
                }
                EscapePolicy::CharacterClass => {
                    out.push('[');
                    out.push(c);
                    out.push(']');
                }
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Whether a pattern (or segment) contains unescaped wildcard syntax.
pub fn has_magic(pattern: &str, policy: EscapePolicy) -> bool {
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if policy == EscapePolicy::Backslash => {
                chars.next();
            }
            '[' if policy == EscapePolicy::CharacterClass && is_single_class(&mut chars.clone()) => {
                chars.next();
                chars.next();
            }
            '*' | '?' | '[' | '{' => return true,
            _ => {}
        }
    }
    false
}

fn is_single_class(rest: &mut impl Iterator<Item = char>) -> bool {
    matches!((rest.next(), rest.next()), (Some(_), Some(']')))
}

/// Remove escaping from a segment that has no magic.
fn unescape(segment: &str, policy: EscapePolicy) -> String {
    let mut out = String::with_capacity(segment.len());
    let mut chars = segment.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if policy == EscapePolicy::Backslash => {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            '[' if policy == EscapePolicy::CharacterClass && is_single_class(&mut chars.clone()) => {
                if let Some(inner) = chars.next() {
                    out.push(inner);
                }
                chars.next();
            }
            other => out.push(other),
        }
    }
    out
}

/// Split a pattern into its literal prefix and the remainder.
///
/// The prefix is unescaped and never contains wildcard syntax.
fn split_static_prefix(pattern: &str, policy: EscapePolicy) -> (String, bool) {
    let segments: Vec<&str> = pattern.split('/').collect();
    let magic_at = segments.iter().position(|s| has_magic(s, policy));

    let static_segments = match magic_at {
        Some(idx) => &segments[..idx],
        None => &segments[..],
    };
    let prefix = static_segments
        .iter()
        .map(|s| unescape(s, policy))
        .collect::<Vec<_>>()
        .join("/");

    let prefix = if prefix.is_empty() && pattern.starts_with('/') {
        "/".to_string()
    } else {
        prefix
    };
    (prefix, magic_at.is_some())
}

/// The directory a glob's matches are confined to: the literal path before
/// the first wildcard segment. `.` when the pattern starts with a wildcard.
pub fn glob_parent(pattern: &str, policy: EscapePolicy) -> String {
    let (prefix, magic) = split_static_prefix(pattern, policy);
    let parent = if magic {
        prefix
    } else {
        match prefix.rfind('/') {
            Some(0) => "/".to_string(),
            Some(idx) => prefix[..idx].to_string(),
            None => String::new(),
        }
    };
    if parent.is_empty() {
        ".".to_string()
    } else {
        parent
    }
}

/// Options for a single glob expansion
#[derive(Debug, Clone)]
pub struct GlobOptions {
    /// Directory relative patterns and ignore patterns are resolved against
    pub cwd: PathBuf,
    /// Match entries whose name starts with `.`
    pub dot: bool,
    pub follow_symbolic_links: bool,
    pub ignore: Vec<String>,
    pub escape_policy: EscapePolicy,
    /// Replaces the globber's own filesystem for this expansion
    pub fs: Option<Arc<dyn InputFileSystem>>,
}

impl GlobOptions {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            dot: false,
            follow_symbolic_links: true,
            ignore: Vec::new(),
            escape_policy: EscapePolicy::default(),
            fs: None,
        }
    }
}

/// One glob match: its path (relative to `cwd` for relative patterns,
/// absolute otherwise) and whether it is a regular file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobEntry {
    pub path: PathBuf,
    pub is_file: bool,
}

/// Glob expansion capability.
#[async_trait]
pub trait Globber: Send + Sync + std::fmt::Debug {
    async fn glob(&self, pattern: &str, options: &GlobOptions) -> Result<Vec<GlobEntry>>;
}

/// Default glob engine over an [`InputFileSystem`].
#[derive(Debug, Clone)]
pub struct FsGlobber {
    fs: Arc<dyn InputFileSystem>,
}

struct Walk<'a> {
    fs: &'a dyn InputFileSystem,
    options: &'a GlobOptions,
    matcher: GlobMatcher,
    ignore: GlobSet,
    absolute: bool,
    allow_dot: bool,
    matches: Vec<GlobEntry>,
}

impl FsGlobber {
    pub fn new(fs: Arc<dyn InputFileSystem>) -> Self {
        Self { fs }
    }

    fn compile(pattern: &str, policy: EscapePolicy) -> Result<GlobMatcher> {
        GlobBuilder::new(pattern)
            .literal_separator(true)
            .backslash_escape(policy == EscapePolicy::Backslash)
            .build()
            .map(|glob| glob.compile_matcher())
            .map_err(|e| Error::invalid_glob(pattern, e))
    }

    fn compile_ignore(patterns: &[String], policy: EscapePolicy) -> Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = GlobBuilder::new(pattern)
                .literal_separator(true)
                .backslash_escape(policy == EscapePolicy::Backslash)
                .build()
                .map_err(|e| Error::invalid_glob(pattern, e))?;
            builder.add(glob);
        }
        builder
            .build()
            .map_err(|e| Error::invalid_glob(patterns.join(", "), e))
    }
}

impl Walk<'_> {
    /// Path used for ignore matching: always relative to `cwd`.
    fn ignore_key(&self, path: &Path, key: &str) -> String {
        if self.absolute {
            to_slash(&relative_path(&self.options.cwd, path))
        } else {
            key.to_string()
        }
    }

    fn is_ignored(&self, path: &Path, key: &str) -> bool {
        !self.ignore.is_empty() && self.ignore.is_match(self.ignore_key(path, key))
    }

    /// Resolve an entry's kind, following links when configured.
    /// `None` for dangling links.
    async fn effective_kind(&self, path: &Path, kind: FileKind) -> Option<FileKind> {
        match kind {
            FileKind::Symlink if self.options.follow_symbolic_links => {
                self.fs.stat(path).await.ok().map(|stat| stat.kind)
            }
            other => Some(other),
        }
    }

    /// Canonical form of a directory, only needed when links are followed.
    async fn canonical(&self, path: &Path) -> Option<PathBuf> {
        if !self.options.follow_symbolic_links {
            return None;
        }
        self.fs.canonicalize(path).await.ok()
    }

    async fn single(&mut self, path: PathBuf, key: String) -> Result<()> {
        let stat = match self.fs.lstat(&path).await {
            Ok(stat) => stat,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(Error::io(&path, e)),
        };
        let Some(kind) = self.effective_kind(&path, stat.kind).await else {
            return Ok(());
        };
        if self.is_ignored(&path, &key) {
            return Ok(());
        }
        self.matches.push(GlobEntry {
            path: PathBuf::from(key),
            is_file: kind == FileKind::File,
        });
        Ok(())
    }

    async fn walk(&mut self, root: PathBuf, root_key: String) -> Result<()> {
        match self.fs.stat(&root).await {
            Ok(stat) if stat.is_dir() => {}
            Ok(_) => return Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(Error::io(&root, e)),
        }

        // Canonical directories from the root down to each stacked entry.
        // A followed link back into that chain is a cycle and is not entered.
        let ancestors = match self.canonical(&root).await {
            Some(canonical) => vec![canonical],
            None => Vec::new(),
        };
        let mut stack = vec![(root, root_key, 0usize, ancestors)];
        while let Some((dir, dir_key, depth, ancestors)) = stack.pop() {
            let mut entries = self
                .fs
                .read_dir(&dir)
                .await
                .map_err(|e| Error::io(&dir, e))?;
            entries.sort_by(|a, b| a.name.cmp(&b.name));

            let mut subdirs = Vec::new();
            for entry in entries {
                if !self.options.dot && !self.allow_dot && entry.name.starts_with('.') {
                    continue;
                }

                let path = dir.join(&entry.name);
                let key = if dir_key.is_empty() {
                    entry.name.clone()
                } else if dir_key.ends_with('/') {
                    format!("{dir_key}{}", entry.name)
                } else {
                    format!("{dir_key}/{}", entry.name)
                };

                let Some(kind) = self.effective_kind(&path, entry.kind).await else {
                    continue;
                };

                if kind == FileKind::Directory && depth < MAX_WALK_DEPTH {
                    match self.canonical(&path).await {
                        Some(canonical) if ancestors.contains(&canonical) => {
                            debug!("not following '{}' into a cycle", path.display());
                        }
                        Some(canonical) => {
                            let mut chain = ancestors.clone();
                            chain.push(canonical);
                            subdirs.push((path.clone(), key.clone(), depth + 1, chain));
                        }
                        None => {
                            subdirs.push((path.clone(), key.clone(), depth + 1, ancestors.clone()));
                        }
                    }
                }

                if self.matcher.is_match(&key) && !self.is_ignored(&path, &key) {
                    self.matches.push(GlobEntry {
                        path: PathBuf::from(&key),
                        is_file: kind == FileKind::File,
                    });
                }
            }

            // Depth-first, alphabetical
            stack.extend(subdirs.into_iter().rev());
        }
        Ok(())
    }
}

#[async_trait]
impl Globber for FsGlobber {
    async fn glob(&self, pattern: &str, options: &GlobOptions) -> Result<Vec<GlobEntry>> {
        let fs = options.fs.as_deref().unwrap_or(self.fs.as_ref());
        let policy = options.escape_policy;
        let absolute = Path::new(pattern).is_absolute() || pattern.starts_with('/');

        let (prefix, magic) = split_static_prefix(pattern, policy);
        let root = if absolute {
            PathBuf::from(&prefix)
        } else {
            options.cwd.join(&prefix)
        };

        debug!(
            "globbing '{}' from '{}' (dot: {}, follow: {})",
            pattern,
            root.display(),
            options.dot,
            options.follow_symbolic_links
        );

        let mut walk = Walk {
            fs,
            options,
            matcher: FsGlobber::compile(pattern, policy)?,
            ignore: FsGlobber::compile_ignore(&options.ignore, policy)?,
            absolute,
            // Static segments are never walked, so only the rest counts
            allow_dot: pattern
                .split('/')
                .skip_while(|s| !has_magic(s, policy))
                .any(|s| s.starts_with('.') && s != "." && s != ".."),
            matches: Vec::new(),
        };

        if magic {
            walk.walk(root, prefix).await?;
        } else {
            walk.single(root, prefix).await?;
        }

        let mut matches = walk.matches;
        matches.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(matches)
    }
}
