//! Pattern normalization
//!
//! Turns a caller's [`Pattern`] into an immutable [`ResolvedPattern`]:
//! canonical `from`/`to`, absolute context and source, destination type and
//! a best-effort classification of the source from a live stat.

use copy_fs::{NormalizedPath, normalize_lexically, normalize_path};
use std::path::{MAIN_SEPARATOR, Path, PathBuf};
use tracing::debug;

use crate::Host;
use crate::pattern::{Pattern, Source, ToType};
use crate::template::is_template_like;

/// On-disk kind of a pattern's source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FromKind {
    File,
    Dir,
}

/// A pattern with every derived field filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPattern {
    pub index: usize,
    pub from_origin: Source,
    /// Lexically normalized `from`, forward slashes
    pub from: String,
    /// Lexically normalized `to`, forward slashes; `.` when unset
    pub to: String,
    /// Absolute directory relative paths are resolved against
    pub context: PathBuf,
    /// The host's build context
    pub compiler_context: PathBuf,
    pub absolute_from: PathBuf,
    /// `None` when the source could not be stat'ed or is a declared glob
    pub from_kind: Option<FromKind>,
    pub to_type: ToType,
}

/// Rewrite platform separators to `/`.
///
/// Only applies where `\` is the platform separator; elsewhere a backslash
/// is a glob escape and must survive.
fn to_forward_slashes(path: &str) -> String {
    if MAIN_SEPARATOR == '\\' {
        path.replace('\\', "/")
    } else {
        path.to_string()
    }
}

/// Destination type precedence: explicit, then template tokens, then a
/// trailing separator or missing extension means a directory.
pub fn infer_to_type(explicit: Option<ToType>, to: &str) -> ToType {
    if let Some(to_type) = explicit {
        return to_type;
    }
    if is_template_like(to) {
        return ToType::Template;
    }
    let to = NormalizedPath::new(to);
    if to.has_trailing_separator() || to.extension().is_none() {
        ToType::Dir
    } else {
        ToType::File
    }
}

fn resolve_context(pattern_context: Option<&Path>, compiler_context: &Path) -> PathBuf {
    let context = match pattern_context {
        Some(context) if context.is_absolute() => context.to_path_buf(),
        Some(context) => compiler_context.join(context),
        None => compiler_context.to_path_buf(),
    };
    normalize_path(&context)
}

/// Resolve one pattern against the host.
pub async fn normalize(index: usize, pattern: &Pattern, host: &Host) -> ResolvedPattern {
    let from = normalize_lexically(&to_forward_slashes(pattern.from.as_str()));
    let to = normalize_lexically(&to_forward_slashes(pattern.to.as_deref().unwrap_or("")));
    let context = resolve_context(pattern.context.as_deref(), &host.context);

    debug!("processing from: '{}' to: '{}'", from, to);

    let to_type = infer_to_type(pattern.to_type, &to);

    let absolute_from = if Path::new(&from).is_absolute() {
        PathBuf::from(&from)
    } else {
        normalize_path(&context.join(&from))
    };

    let from_kind = match &pattern.from {
        Source::Glob(_) => None,
        Source::Path(_) => {
            debug!(
                "getting stats for '{}' to determine 'fromType'",
                absolute_from.display()
            );
            match host.fs.stat(&absolute_from).await {
                Ok(stat) if stat.is_dir() => Some(FromKind::Dir),
                Ok(stat) if stat.is_file() => Some(FromKind::File),
                Ok(_) => None,
                Err(e) => {
                    debug!("stat of '{}' failed: {}", absolute_from.display(), e);
                    None
                }
            }
        }
    };

    ResolvedPattern {
        index,
        from_origin: pattern.from.clone(),
        from,
        to,
        context,
        compiler_context: host.context.clone(),
        absolute_from,
        from_kind,
        to_type,
    }
}
