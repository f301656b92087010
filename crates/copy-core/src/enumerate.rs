//! Match enumeration
//!
//! Expands a [`GlobPlan`] into one [`Candidate`] per matched file.

use copy_fs::{normalize_lexically, normalize_path, relative_path, to_slash};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::hooks::run_hook;
use crate::normalize::ResolvedPattern;
use crate::pattern::{Pattern, ToType};
use crate::plan::{FromType, GlobPlan};
use crate::{Error, Host, Result};

/// One matched source file on its way to becoming an asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub absolute_filename: PathBuf,
    /// Path relative to the build context with `/` separators; identifies
    /// the file in dependencies and cache keys
    pub source_filename: String,
    /// Destination before template interpolation
    pub filename: String,
}

fn destination(
    resolved: &ResolvedPattern,
    plan: &GlobPlan,
    pattern: &Pattern,
    host: &Host,
    absolute_filename: &Path,
) -> Result<String> {
    let relative_from = if pattern.flatten {
        absolute_filename
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    } else {
        to_slash(&relative_path(&plan.context, absolute_filename))
    };

    let filename = if resolved.to_type == ToType::Dir {
        normalize_lexically(&format!("{}/{}", resolved.to, relative_from))
    } else {
        resolved.to.clone()
    };

    if !Path::new(&filename).is_absolute() {
        return Ok(filename);
    }

    match &host.output_path {
        Some(output) if output.as_os_str() != "/" => Ok(to_slash(&relative_path(
            output,
            Path::new(&filename),
        ))),
        _ => Err(Error::UndefinedOutputPath { to: filename }),
    }
}

/// Expand the plan. Fails when nothing matches, unless the pattern allows
/// that.
pub async fn enumerate(
    resolved: &ResolvedPattern,
    plan: &GlobPlan,
    pattern: &Pattern,
    host: &Host,
) -> Result<Vec<Candidate>> {
    let entries: Vec<_> = host
        .globber
        .glob(&plan.glob, &plan.options)
        .await?
        .into_iter()
        .filter(|e| e.is_file)
        .collect();

    if entries.is_empty() {
        if pattern.no_error_on_missing {
            debug!("no matches for '{}', skipping", plan.glob);
            return Ok(Vec::new());
        }
        return Err(Error::SourceNotFound {
            from: resolved.from_origin.to_string(),
            absolute_from: plan.absolute_from.clone(),
        });
    }

    let mut candidates = Vec::with_capacity(entries.len());
    for entry in entries {
        let absolute_filename = normalize_path(&plan.context.join(&entry.path));
        let source_filename = to_slash(&relative_path(&resolved.compiler_context, &absolute_filename));
        let filename = destination(resolved, plan, pattern, host, &absolute_filename)?;

        if plan.from_type == FromType::Glob {
            host.dependencies.add_file_dependency(&absolute_filename);
        }

        debug!(
            "found '{}' for '{}'",
            absolute_filename.display(),
            resolved.from
        );

        candidates.push(Candidate {
            absolute_filename,
            source_filename,
            filename,
        });
    }

    Ok(candidates)
}

/// Run the pattern's filter on one candidate. `Ok(false)` drops it.
pub async fn filter_candidate(pattern: &Pattern, candidate: &Candidate) -> Result<bool> {
    let Some(filter) = pattern.filter.clone() else {
        return Ok(true);
    };

    let path = candidate.absolute_filename.clone();
    let keep = run_hook(async move { filter.filter(&path).await })
        .await
        .map_err(|message| Error::Filter {
            path: candidate.absolute_filename.clone(),
            message,
        })?;

    if !keep {
        debug!(
            "skipping '{}', because it was filtered",
            candidate.absolute_filename.display()
        );
    }
    Ok(keep)
}
