//! Final destination names

use copy_fs::normalize_lexically;
use tracing::debug;

use crate::enumerate::Candidate;
use crate::hooks::run_hook;
use crate::normalize::ResolvedPattern;
use crate::pattern::{Pattern, ToType};
use crate::plan::GlobPlan;
use crate::template::{TemplateContext, has_hash_token, interpolate};
use crate::{Error, Result};

/// A candidate's final name and whether that name is content-derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedName {
    pub filename: String,
    pub immutable: bool,
}

/// Resolve the destination name of a candidate from its final content.
///
/// Template destinations are interpolated first; the pattern's path
/// transform then sees the interpolated name. A rewritten name is never
/// considered immutable.
pub async fn resolve_name(
    resolved: &ResolvedPattern,
    plan: &GlobPlan,
    pattern: &Pattern,
    candidate: &Candidate,
    content: &[u8],
) -> Result<ResolvedName> {
    let mut filename = candidate.filename.clone();
    let mut immutable = false;

    if resolved.to_type == ToType::Template {
        filename = interpolate(
            &filename,
            &TemplateContext {
                absolute_filename: &candidate.absolute_filename,
                context: &plan.context,
                content,
                test: pattern.test.as_ref(),
            },
        )?;
        immutable = has_hash_token(&resolved.to);
        debug!(
            "interpolated template '{}' for '{}'",
            filename,
            candidate.absolute_filename.display()
        );
    }

    if let Some(transform_path) = pattern.transform_path.clone() {
        let target = filename.clone();
        let path = candidate.absolute_filename.clone();
        filename = run_hook(async move { transform_path.transform_path(&target, &path).await })
            .await
            .map_err(|message| Error::TransformPath {
                path: candidate.absolute_filename.clone(),
                message,
            })?;
        immutable = false;
    }

    Ok(ResolvedName {
        filename: normalize_lexically(&filename),
        immutable,
    })
}
