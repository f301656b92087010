//! Copy patterns as supplied by the caller

use copy_fs::InputFileSystem;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::hooks::{CacheKeys, Filter, PathTransform, Transform};

/// Where a pattern reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// A file, a directory or a glob; classified by a stat at run time.
    Path(String),
    /// An explicit glob. Never stat'ed.
    Glob(GlobSpec),
}

impl Source {
    /// The raw `from` text.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Path(path) => path,
            Self::Glob(spec) => &spec.pattern,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobSpec {
    pub pattern: String,
    pub dot: Option<bool>,
}

/// How the destination is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToType {
    Dir,
    File,
    Template,
}

/// Transform cache behaviour.
#[derive(Clone, Default)]
pub enum CacheSetting {
    #[default]
    Disabled,
    /// Cache with the default keys.
    Enabled,
    /// Cache with the default keys extended (or overridden) by these.
    Keys(BTreeMap<String, Value>),
    /// Cache with keys computed by a hook from the defaults.
    Derived(Arc<dyn CacheKeys>),
}

impl CacheSetting {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::Disabled)
    }
}

impl fmt::Debug for CacheSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => f.write_str("Disabled"),
            Self::Enabled => f.write_str("Enabled"),
            Self::Keys(keys) => f.debug_tuple("Keys").field(keys).finish(),
            Self::Derived(_) => f.write_str("Derived(..)"),
        }
    }
}

/// Options forwarded to the glob engine. Unset values take the defaults of
/// the pattern's source classification.
#[derive(Clone, Default)]
pub struct GlobSettings {
    pub dot: Option<bool>,
    pub ignore: Vec<String>,
    pub follow_symbolic_links: Option<bool>,
    /// Filesystem to glob against instead of the host's
    pub fs: Option<Arc<dyn InputFileSystem>>,
}

impl fmt::Debug for GlobSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobSettings")
            .field("dot", &self.dot)
            .field("ignore", &self.ignore)
            .field("follow_symbolic_links", &self.follow_symbolic_links)
            .field("fs", &self.fs.as_ref().map(|_| ".."))
            .finish()
    }
}

/// A single copy rule.
#[derive(Clone)]
pub struct Pattern {
    pub from: Source,
    pub to: Option<String>,
    pub context: Option<PathBuf>,
    pub to_type: Option<ToType>,
    pub flatten: bool,
    pub force: bool,
    pub no_error_on_missing: bool,
    pub glob_options: GlobSettings,
    pub ignore: Vec<String>,
    /// Applied to the absolute source path; captures feed `[N]` tokens
    pub test: Option<Regex>,
    pub cache: CacheSetting,
    /// Replaces the pattern index in snapshot cache keys
    pub cache_key: Option<String>,
    pub transform: Option<Arc<dyn Transform>>,
    pub transform_path: Option<Arc<dyn PathTransform>>,
    pub filter: Option<Arc<dyn Filter>>,
}

impl Pattern {
    /// Pattern reading from a file, directory or glob.
    pub fn new(from: impl Into<String>) -> Self {
        Self::from_source(Source::Path(from.into()))
    }

    /// Pattern reading from an explicit glob.
    pub fn glob(pattern: impl Into<String>) -> Self {
        Self::from_source(Source::Glob(GlobSpec {
            pattern: pattern.into(),
            dot: None,
        }))
    }

    pub fn from_source(from: Source) -> Self {
        Self {
            from,
            to: None,
            context: None,
            to_type: None,
            flatten: false,
            force: false,
            no_error_on_missing: false,
            glob_options: GlobSettings::default(),
            ignore: Vec::new(),
            test: None,
            cache: CacheSetting::Disabled,
            cache_key: None,
            transform: None,
            transform_path: None,
            filter: None,
        }
    }

    pub fn to(mut self, to: impl Into<String>) -> Self {
        self.to = Some(to.into());
        self
    }

    pub fn context(mut self, context: impl Into<PathBuf>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn to_type(mut self, to_type: ToType) -> Self {
        self.to_type = Some(to_type);
        self
    }

    pub fn flatten(mut self, flatten: bool) -> Self {
        self.flatten = flatten;
        self
    }

    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn no_error_on_missing(mut self, value: bool) -> Self {
        self.no_error_on_missing = value;
        self
    }

    pub fn dot(mut self, dot: bool) -> Self {
        self.glob_options.dot = Some(dot);
        self
    }

    pub fn follow_symbolic_links(mut self, follow: bool) -> Self {
        self.glob_options.follow_symbolic_links = Some(follow);
        self
    }

    /// Add an ignore glob to the glob options.
    pub fn glob_ignore(mut self, pattern: impl Into<String>) -> Self {
        self.glob_options.ignore.push(pattern.into());
        self
    }

    pub fn glob_fs(mut self, fs: Arc<dyn InputFileSystem>) -> Self {
        self.glob_options.fs = Some(fs);
        self
    }

    /// Add a pattern-level ignore glob.
    pub fn ignore(mut self, pattern: impl Into<String>) -> Self {
        self.ignore.push(pattern.into());
        self
    }

    pub fn test(mut self, test: Regex) -> Self {
        self.test = Some(test);
        self
    }

    pub fn cache(mut self, cache: CacheSetting) -> Self {
        self.cache = cache;
        self
    }

    pub fn cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = Some(key.into());
        self
    }

    pub fn transform(mut self, transform: impl Transform + 'static) -> Self {
        self.transform = Some(Arc::new(transform));
        self
    }

    pub fn transform_path(mut self, transform_path: impl PathTransform + 'static) -> Self {
        self.transform_path = Some(Arc::new(transform_path));
        self
    }

    pub fn filter(mut self, filter: impl Filter + 'static) -> Self {
        self.filter = Some(Arc::new(filter));
        self
    }
}

impl From<&str> for Pattern {
    fn from(from: &str) -> Self {
        Self::new(from)
    }
}

impl From<String> for Pattern {
    fn from(from: String) -> Self {
        Self::new(from)
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pattern")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("context", &self.context)
            .field("to_type", &self.to_type)
            .field("flatten", &self.flatten)
            .field("force", &self.force)
            .field("no_error_on_missing", &self.no_error_on_missing)
            .field("glob_options", &self.glob_options)
            .field("ignore", &self.ignore)
            .field("test", &self.test.as_ref().map(Regex::as_str))
            .field("cache", &self.cache)
            .field("cache_key", &self.cache_key)
            .field("transform", &self.transform.as_ref().map(|t| t.identity()))
            .field("transform_path", &self.transform_path.is_some())
            .field("filter", &self.filter.is_some())
            .finish()
    }
}
