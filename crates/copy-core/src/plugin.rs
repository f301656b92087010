//! Plugin entry point
//!
//! [`CopyPlugin::run`] resolves every pattern concurrently, at most
//! `concurrency` patterns at a time, and the candidates of one pattern
//! without a cap. Each pattern produces its assets and failures
//! independently. Once all patterns have settled the assets are reconciled
//! against the registry in pattern order, then match order.

use copy_fs::NormalizedPath;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::assets::{AssetRegistry, RawSource};
use crate::content;
use crate::emit::{AssetAction, AssetOutcome, EmittableAsset, reconcile};
use crate::enumerate::{Candidate, enumerate, filter_candidate};
use crate::naming::resolve_name;
use crate::normalize::{ResolvedPattern, normalize};
use crate::options::{CopyConfig, PluginOptions};
use crate::pattern::Pattern;
use crate::plan::{GlobPlan, plan};
use crate::{Error, Host, PatternFailure, Result};

/// Result of one run.
///
/// A run always completes; failures are collected here instead of aborting
/// the other patterns.
#[derive(Debug, Default)]
pub struct CopyReport {
    /// One entry per reconciled asset, in reconciliation order
    pub outcomes: Vec<AssetOutcome>,
    pub errors: Vec<PatternFailure>,
}

impl CopyReport {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn outcome(&self, filename: &str) -> Option<&AssetOutcome> {
        self.outcomes.iter().find(|o| o.filename == filename)
    }

    /// Number of outcomes with the given action.
    pub fn count(&self, action: AssetAction) -> usize {
        self.outcomes.iter().filter(|o| o.action == action).count()
    }
}

/// Copies files matched by patterns into the build's output assets.
#[derive(Debug, Clone)]
pub struct CopyPlugin {
    patterns: Vec<Arc<Pattern>>,
    options: PluginOptions,
}

impl CopyPlugin {
    /// Validate and hold the patterns. Fails before any I/O on an empty
    /// `from` or a zero concurrency.
    pub fn new(patterns: Vec<Pattern>, options: PluginOptions) -> Result<Self> {
        if let Some(index) = patterns.iter().position(|p| p.from.as_str().is_empty()) {
            return Err(Error::EmptyFrom { index });
        }
        if options.concurrency == 0 {
            return Err(Error::invalid_option(
                "concurrency",
                "must be greater than zero",
            ));
        }

        Ok(Self {
            patterns: patterns.into_iter().map(Arc::new).collect(),
            options,
        })
    }

    pub fn from_config(config: CopyConfig) -> Result<Self> {
        let patterns = config.to_patterns()?;
        Self::new(patterns, config.options)
    }

    /// Build a plugin from a configuration file.
    pub fn load(path: &NormalizedPath) -> Result<Self> {
        Self::from_config(CopyConfig::load(path)?)
    }

    pub fn patterns(&self) -> &[Arc<Pattern>] {
        &self.patterns
    }

    pub fn options(&self) -> &PluginOptions {
        &self.options
    }

    /// Resolve every pattern against the host and reconcile the produced
    /// assets into `registry`.
    pub async fn run(&self, host: &Host, registry: &mut dyn AssetRegistry) -> CopyReport {
        debug!("starting to add additional assets...");

        let semaphore = Arc::new(Semaphore::new(
            self.options.concurrency.min(Semaphore::MAX_PERMITS),
        ));
        let mut handles = Vec::with_capacity(self.patterns.len());

        for (index, pattern) in self.patterns.iter().enumerate() {
            let permit = semaphore.clone().acquire_owned().await;
            let pattern = pattern.clone();
            let host = host.clone();
            let options = self.options.clone();

            handles.push(tokio::spawn(async move {
                let _permit = match permit {
                    Ok(permit) => permit,
                    Err(e) => {
                        let error = Error::Task(e.to_string());
                        return (Vec::new(), vec![failure(index, &pattern, error)]);
                    }
                };
                run_pattern(index, pattern, host, options).await
            }));
        }

        let mut assets = Vec::new();
        let mut errors = Vec::new();
        for (index, handle) in handles.into_iter().enumerate() {
            match handle.await {
                Ok((produced, failures)) => {
                    assets.extend(produced);
                    errors.extend(failures);
                }
                Err(e) => errors.push(failure(
                    index,
                    &self.patterns[index],
                    Error::Task(e.to_string()),
                )),
            }
        }

        for error in &errors {
            warn!("{}", error);
        }

        let outcomes = reconcile(assets, registry);
        info!(
            "finished adding additional assets: {} assets, {} failures",
            outcomes.len(),
            errors.len()
        );

        CopyReport { outcomes, errors }
    }
}

fn failure(index: usize, pattern: &Pattern, error: Error) -> PatternFailure {
    PatternFailure {
        index,
        from: pattern.from.to_string(),
        error,
    }
}

async fn run_pattern(
    index: usize,
    pattern: Arc<Pattern>,
    host: Host,
    options: PluginOptions,
) -> (Vec<EmittableAsset>, Vec<PatternFailure>) {
    let resolved = normalize(index, &pattern, &host).await;
    let plan = plan(&resolved, &pattern, &host, &options);

    let candidates = match enumerate(&resolved, &plan, &pattern, &host).await {
        Ok(candidates) => candidates,
        Err(error) => return (Vec::new(), vec![failure(index, &pattern, error)]),
    };

    let resolved = Arc::new(resolved);
    let plan = Arc::new(plan);
    let handles: Vec<_> = candidates
        .into_iter()
        .map(|candidate| {
            let resolved = resolved.clone();
            let plan = plan.clone();
            let pattern = pattern.clone();
            let host = host.clone();
            tokio::spawn(async move {
                process_candidate(&resolved, &plan, &pattern, &host, candidate).await
            })
        })
        .collect();

    let mut assets = Vec::with_capacity(handles.len());
    let mut failures = Vec::new();
    for handle in handles {
        match handle.await {
            Ok(Ok(Some(asset))) => assets.push(asset),
            Ok(Ok(None)) => {}
            Ok(Err(error)) => failures.push(failure(index, &pattern, error)),
            Err(e) => failures.push(failure(index, &pattern, Error::Task(e.to_string()))),
        }
    }

    if !assets.is_empty() {
        debug!(
            "finished to process pattern from '{}' to '{}'",
            resolved.from, resolved.to
        );
    }

    (assets, failures)
}

async fn process_candidate(
    resolved: &ResolvedPattern,
    plan: &GlobPlan,
    pattern: &Pattern,
    host: &Host,
    candidate: Candidate,
) -> Result<Option<EmittableAsset>> {
    if !filter_candidate(pattern, &candidate).await? {
        return Ok(None);
    }

    let content = content::load(resolved, pattern, host, &candidate).await?;
    let name = resolve_name(resolved, plan, pattern, &candidate, &content).await?;

    Ok(Some(EmittableAsset {
        filename: name.filename,
        source: RawSource::new(content),
        force: pattern.force,
        immutable: name.immutable,
        absolute_filename: candidate.absolute_filename,
        source_filename: candidate.source_filename,
        index: resolved.index,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::Assets;
    use copy_fs::MemoryFs;

    fn host() -> Host {
        let fs = MemoryFs::new();
        fs.write_file("/ctx/file.txt", "new");
        fs.write_file("/ctx/directory/directoryfile.txt", "new");
        Host::new("/ctx", Arc::new(fs))
    }

    #[test]
    fn empty_from_is_rejected_up_front() {
        let err = CopyPlugin::new(
            vec![Pattern::new("file.txt"), Pattern::new("")],
            PluginOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::EmptyFrom { index: 1 }));
        assert!(err.is_configuration());
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let options = PluginOptions {
            concurrency: 0,
            ..PluginOptions::default()
        };
        let err = CopyPlugin::new(vec![Pattern::new("file.txt")], options).unwrap_err();
        assert!(matches!(err, Error::InvalidOption { ref option, .. } if option == "concurrency"));
    }

    #[tokio::test]
    async fn failing_pattern_does_not_stop_the_others() {
        let plugin = CopyPlugin::new(
            vec![
                Pattern::new("missing.txt"),
                Pattern::new("file.txt"),
                Pattern::new("directory").to("dir"),
            ],
            PluginOptions::default(),
        )
        .unwrap();
        let mut assets = Assets::new();
        let report = plugin.run(&host(), &mut assets).await;

        assert_eq!(assets.names(), vec!["dir/directoryfile.txt", "file.txt"]);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].index, 0);
        assert_eq!(report.errors[0].from, "missing.txt");
        assert!(!report.is_success());
        assert_eq!(report.count(AssetAction::Emitted), 2);
    }

    #[tokio::test]
    async fn concurrency_of_one_still_completes() {
        let options = PluginOptions {
            concurrency: 1,
            ..PluginOptions::default()
        };
        let patterns = (0..5).map(|_| Pattern::new("file.txt").force(true)).collect();
        let plugin = CopyPlugin::new(patterns, options).unwrap();
        let mut assets = Assets::new();
        let report = plugin.run(&host(), &mut assets).await;

        assert!(report.is_success());
        assert_eq!(report.count(AssetAction::Emitted), 1);
        assert_eq!(report.count(AssetAction::Updated), 4);
    }
}
