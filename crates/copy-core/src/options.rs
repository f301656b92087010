//! Plugin options and the declarative configuration file format
//!
//! A configuration file carries everything except hooks, which can only be
//! attached programmatically:
//!
//! ```toml
//! patterns = [
//!     "file.txt",
//!     { from = "directory", to = "assets/[name]-[contenthash:8].[ext]" },
//! ]
//!
//! [options]
//! concurrency = 16
//! ```

use copy_fs::{ConfigStore, EscapePolicy, NormalizedPath};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::pattern::{CacheSetting, GlobSettings, GlobSpec, Pattern, Source, ToType};
use crate::{Error, Result};

/// Default number of patterns resolved at the same time
pub const DEFAULT_CONCURRENCY: usize = 100;

/// Options applying to every pattern of a plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PluginOptions {
    /// Maximum number of patterns in flight
    pub concurrency: usize,
    /// Ignore globs merged into every pattern
    pub ignore: Vec<String>,
    /// How literal paths are escaped before globbing
    pub escape: EscapePolicy,
}

impl Default for PluginOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            ignore: Vec::new(),
            escape: EscapePolicy::default(),
        }
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CopyConfig {
    pub patterns: Vec<PatternEntry>,
    #[serde(default)]
    pub options: PluginOptions,
}

impl CopyConfig {
    /// Load a configuration file (`.json`, `.toml`, `.yaml` or `.yml`).
    pub fn load(path: &NormalizedPath) -> Result<Self> {
        Ok(ConfigStore::new().load(path)?)
    }

    /// Convert every entry into a [`Pattern`].
    pub fn to_patterns(&self) -> Result<Vec<Pattern>> {
        self.patterns.iter().cloned().map(PatternEntry::into_pattern).collect()
    }
}

/// A pattern as written in a configuration file: either the `from` string
/// alone or the full table.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PatternEntry {
    Shorthand(String),
    Full(Box<PatternConfig>),
}

impl PatternEntry {
    pub fn into_pattern(self) -> Result<Pattern> {
        match self {
            Self::Shorthand(from) => Ok(Pattern::new(from)),
            Self::Full(config) => config.into_pattern(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FromConfig {
    Path(String),
    Glob {
        glob: String,
        #[serde(default)]
        dot: Option<bool>,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GlobOptionsConfig {
    pub dot: Option<bool>,
    #[serde(default)]
    pub ignore: Vec<String>,
    pub follow_symbolic_links: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CacheConfig {
    Flag(bool),
    Keys { keys: BTreeMap<String, Value> },
}

/// The full form of a configured pattern.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PatternConfig {
    pub from: FromConfig,
    pub to: Option<String>,
    pub context: Option<PathBuf>,
    pub to_type: Option<ToType>,
    #[serde(default)]
    pub flatten: bool,
    #[serde(default)]
    pub force: bool,
    #[serde(default)]
    pub no_error_on_missing: bool,
    #[serde(default)]
    pub glob_options: GlobOptionsConfig,
    #[serde(default)]
    pub ignore: Vec<String>,
    pub test: Option<String>,
    pub cache: Option<CacheConfig>,
    pub cache_key: Option<String>,
}

impl PatternConfig {
    pub fn into_pattern(self) -> Result<Pattern> {
        let from = match self.from {
            FromConfig::Path(path) => Source::Path(path),
            FromConfig::Glob { glob, dot } => Source::Glob(GlobSpec { pattern: glob, dot }),
        };

        let test = self
            .test
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(|e| Error::invalid_option("test", e))?;

        let cache = match self.cache {
            None | Some(CacheConfig::Flag(false)) => CacheSetting::Disabled,
            Some(CacheConfig::Flag(true)) => CacheSetting::Enabled,
            Some(CacheConfig::Keys { keys }) => CacheSetting::Keys(keys),
        };

        let mut pattern = Pattern::from_source(from);
        pattern.to = self.to;
        pattern.context = self.context;
        pattern.to_type = self.to_type;
        pattern.flatten = self.flatten;
        pattern.force = self.force;
        pattern.no_error_on_missing = self.no_error_on_missing;
        pattern.glob_options = GlobSettings {
            dot: self.glob_options.dot,
            ignore: self.glob_options.ignore,
            follow_symbolic_links: self.glob_options.follow_symbolic_links,
            fs: None,
        };
        pattern.ignore = self.ignore;
        pattern.test = test;
        pattern.cache = cache;
        pattern.cache_key = self.cache_key;
        Ok(pattern)
    }
}
