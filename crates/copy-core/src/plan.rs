//! Glob planning
//!
//! Derives the exact glob expansion for a [`ResolvedPattern`] and records
//! which paths the host has to watch:
//!
//! - a directory source watches the directory and globs everything under it
//! - a file source watches the file and globs exactly that file
//! - anything else is a glob; it watches the glob's static parent
//!   directory, or the path itself when it has no wildcard

use copy_fs::{EscapePolicy, GlobOptions, escape, glob_parent, has_magic, normalize_path, to_slash};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::normalize::{FromKind, ResolvedPattern};
use crate::options::PluginOptions;
use crate::pattern::{Pattern, Source};
use crate::Host;

/// Effective source type once planned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FromType {
    File,
    Dir,
    Glob,
}

/// A fully specified glob invocation.
#[derive(Debug, Clone)]
pub struct GlobPlan {
    pub glob: String,
    /// Directory matches are relative to; becomes the glob's `cwd`
    pub context: PathBuf,
    pub options: GlobOptions,
    pub from_type: FromType,
    /// Source path reported when nothing matches
    pub absolute_from: PathBuf,
}

fn escaped(path: &Path, policy: EscapePolicy) -> String {
    escape(&to_slash(path), policy)
}

/// Plan one resolved pattern, registering its watch dependencies.
pub fn plan(
    resolved: &ResolvedPattern,
    pattern: &Pattern,
    host: &Host,
    options: &PluginOptions,
) -> GlobPlan {
    let policy = options.escape;
    let settings = &pattern.glob_options;

    let (from_type, glob, context, default_dot, absolute_from) = match resolved.from_kind {
        Some(FromKind::Dir) => {
            debug!("determined '{}' is a directory", resolved.absolute_from.display());
            host.dependencies
                .add_context_dependency(&resolved.absolute_from);

            let glob = format!("{}/**/*", escaped(&resolved.absolute_from, policy));
            (
                FromType::Dir,
                glob,
                resolved.absolute_from.clone(),
                true,
                resolved.absolute_from.join("**").join("*"),
            )
        }
        Some(FromKind::File) => {
            debug!("determined '{}' is a file", resolved.absolute_from.display());
            host.dependencies
                .add_file_dependency(&resolved.absolute_from);

            let context = resolved
                .absolute_from
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| resolved.context.clone());
            (
                FromType::File,
                escaped(&resolved.absolute_from, policy),
                context,
                true,
                resolved.absolute_from.clone(),
            )
        }
        None => {
            debug!("determined '{}' is a glob", resolved.from);

            if has_magic(&resolved.from, policy) {
                let parent = PathBuf::from(glob_parent(&resolved.from, policy));
                let watched = if parent.is_absolute() {
                    parent
                } else {
                    normalize_path(&resolved.context.join(parent))
                };
                host.dependencies.add_context_dependency(watched);
            } else {
                host.dependencies
                    .add_file_dependency(&resolved.absolute_from);
            }

            let dot = match &pattern.from {
                Source::Glob(spec) => spec.dot.unwrap_or(false),
                Source::Path(_) => false,
            };
            (
                FromType::Glob,
                resolved.from.clone(),
                resolved.context.clone(),
                dot,
                resolved.absolute_from.clone(),
            )
        }
    };

    let mut ignore = settings.ignore.clone();
    ignore.extend(pattern.ignore.iter().cloned());
    ignore.extend(options.ignore.iter().cloned());

    let glob_options = GlobOptions {
        cwd: context.clone(),
        dot: settings.dot.unwrap_or(default_dot),
        follow_symbolic_links: settings.follow_symbolic_links.unwrap_or(true),
        ignore,
        escape_policy: policy,
        fs: settings.fs.clone(),
    };

    debug!("begin globbing '{}' in '{}'", glob, context.display());

    GlobPlan {
        glob,
        context,
        options: glob_options,
        from_type,
        absolute_from,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;
    use copy_fs::MemoryFs;
    use std::sync::Arc;

    fn host() -> Host {
        let fs = MemoryFs::new();
        fs.write_file("/ctx/file.txt", "new");
        fs.write_file("/ctx/directory/directoryfile.txt", "new");
        fs.write_file("/ctx/[special?directory]/directoryfile.txt", "new");
        Host::new("/ctx", Arc::new(fs))
    }

    async fn plan_for(pattern: Pattern, host: &Host, options: &PluginOptions) -> GlobPlan {
        let resolved = normalize(0, &pattern, host).await;
        plan(&resolved, &pattern, host, options)
    }

    #[tokio::test]
    async fn directory_sources_glob_everything_below() {
        let host = host();
        let plan = plan_for(Pattern::new("directory"), &host, &PluginOptions::default()).await;

        assert_eq!(plan.from_type, FromType::Dir);
        assert_eq!(plan.glob, "/ctx/directory/**/*");
        assert_eq!(plan.context, PathBuf::from("/ctx/directory"));
        assert!(plan.options.dot);
        assert_eq!(
            host.dependencies.context_dependencies(),
            vec![PathBuf::from("/ctx/directory")]
        );
    }

    #[tokio::test]
    async fn special_characters_are_escaped() {
        let host = host();
        let plan = plan_for(
            Pattern::new("[special?directory]"),
            &host,
            &PluginOptions::default(),
        )
        .await;
        assert_eq!(plan.glob, "/ctx/\\[special\\?directory\\]/**/*");

        let options = PluginOptions {
            escape: EscapePolicy::CharacterClass,
            ..PluginOptions::default()
        };
        let plan = plan_for(Pattern::new("[special?directory]"), &host, &options).await;
        assert_eq!(plan.glob, "/ctx/[[]special[?]directory[]]/**/*");
    }

    #[tokio::test]
    async fn file_sources_watch_the_file() {
        let host = host();
        let plan = plan_for(
            Pattern::new("file.txt").glob_ignore("a").ignore("b"),
            &host,
            &PluginOptions {
                ignore: vec!["c".into()],
                ..PluginOptions::default()
            },
        )
        .await;

        assert_eq!(plan.from_type, FromType::File);
        assert_eq!(plan.context, PathBuf::from("/ctx"));
        assert_eq!(plan.options.ignore, vec!["a", "b", "c"]);
        assert_eq!(
            host.dependencies.file_dependencies(),
            vec![PathBuf::from("/ctx/file.txt")]
        );
    }

    #[tokio::test]
    async fn globs_watch_their_static_parent() {
        let host = host();
        let plan = plan_for(Pattern::new("directory/**/*.txt"), &host, &PluginOptions::default())
            .await;

        assert_eq!(plan.from_type, FromType::Glob);
        assert_eq!(plan.glob, "directory/**/*.txt");
        assert!(!plan.options.dot);
        assert!(plan.options.follow_symbolic_links);
        assert_eq!(
            host.dependencies.context_dependencies(),
            vec![PathBuf::from("/ctx/directory")]
        );
    }

    #[tokio::test]
    async fn literal_globs_watch_only_the_path() {
        let host = host();
        plan_for(Pattern::new("missing.txt"), &host, &PluginOptions::default()).await;

        assert!(host.dependencies.context_dependencies().is_empty());
        assert_eq!(
            host.dependencies.file_dependencies(),
            vec![PathBuf::from("/ctx/missing.txt")]
        );
    }

    #[tokio::test]
    async fn declared_glob_dot_flag_and_overrides() {
        let host = host();
        let spec = Source::Glob(crate::pattern::GlobSpec {
            pattern: "directory/*".into(),
            dot: Some(true),
        });
        let plan = plan_for(Pattern::from_source(spec), &host, &PluginOptions::default()).await;
        assert!(plan.options.dot);

        let plan = plan_for(
            Pattern::new("directory").dot(false).follow_symbolic_links(false),
            &host,
            &PluginOptions::default(),
        )
        .await;
        assert!(!plan.options.dot);
        assert!(!plan.options.follow_symbolic_links);
    }
}
