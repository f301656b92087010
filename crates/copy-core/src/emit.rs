//! Asset reconciliation
//!
//! Runs once per compilation after every pattern has settled, so the
//! outcome of a name collision only depends on pattern order and match
//! order, never on which task finished first.

use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

use crate::assets::{AssetInfo, AssetRegistry, RawSource};

/// A fully resolved asset waiting to be reconciled.
#[derive(Debug, Clone)]
pub struct EmittableAsset {
    pub filename: String,
    pub source: RawSource,
    pub force: bool,
    pub immutable: bool,
    pub absolute_filename: PathBuf,
    pub source_filename: String,
    /// Index of the pattern that produced it
    pub index: usize,
}

/// What the reconciler did with an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetAction {
    Emitted,
    Updated,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetOutcome {
    pub filename: String,
    pub source_filename: String,
    pub absolute_filename: PathBuf,
    /// Index of the pattern the asset came from
    pub pattern_index: usize,
    pub action: AssetAction,
    pub info: AssetInfo,
    pub size: usize,
}

/// Emit, update or skip each asset against the registry, in order.
pub fn reconcile(
    assets: Vec<EmittableAsset>,
    registry: &mut dyn AssetRegistry,
) -> Vec<AssetOutcome> {
    let mut outcomes = Vec::with_capacity(assets.len());

    for asset in assets {
        let info = AssetInfo {
            copied: true,
            immutable: asset.immutable,
        };
        let size = asset.source.len();

        let action = if registry.get_asset(&asset.filename).is_some() {
            if asset.force {
                info!(
                    "force updating '{}' to compilation asset from '{}'",
                    asset.filename,
                    asset.absolute_filename.display()
                );
                registry.update_asset(&asset.filename, asset.source, info);
                AssetAction::Updated
            } else {
                info!("skipping '{}', because it already exists", asset.filename);
                AssetAction::Skipped
            }
        } else {
            info!(
                "writing '{}' to compilation assets from '{}'",
                asset.filename,
                asset.absolute_filename.display()
            );
            registry.emit_asset(&asset.filename, asset.source, info);
            AssetAction::Emitted
        };

        outcomes.push(AssetOutcome {
            filename: asset.filename,
            source_filename: asset.source_filename,
            absolute_filename: asset.absolute_filename,
            pattern_index: asset.index,
            action,
            info,
            size,
        });
    }

    outcomes
}
