//! Content pipeline
//!
//! Produces the bytes of one candidate:
//!
//! 1. With both a cache store and a snapshotter on the host, a cached entry
//!    whose snapshot still matches the file is reused as-is: no read, no
//!    transform.
//! 2. Otherwise the file is read and, if the pattern has a transform, the
//!    bytes go through it. With transform caching enabled the output is
//!    looked up and stored under a key derived from the raw content.
//! 3. The final bytes are stored with a snapshot of the bytes that were
//!    read, taken before any hook runs.

use copy_cache::CachedSource;
use copy_fs::checksum::compute_hex_digest;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::debug;

use crate::enumerate::Candidate;
use crate::hooks::{Transform, run_hook};
use crate::normalize::ResolvedPattern;
use crate::pattern::{CacheSetting, Pattern};
use crate::{Error, Host, Result};

/// Store id of snapshot-validated source entries
pub const SNAPSHOT_STORE: &str = "copy-snapshot";

/// Store id of transform outputs
pub const TRANSFORM_STORE: &str = "copy-transform";

/// Snapshot cache key of a candidate.
pub fn snapshot_key(resolved: &ResolvedPattern, pattern: &Pattern, candidate: &Candidate) -> String {
    let identity = pattern
        .cache_key
        .clone()
        .unwrap_or_else(|| resolved.index.to_string());
    format!("{}|{}", candidate.source_filename, identity)
}

/// Transform cache key: `transform|` followed by the keys as JSON with
/// sorted fields.
pub async fn transform_key(
    resolved: &ResolvedPattern,
    pattern: &Pattern,
    transform: &dyn Transform,
    candidate: &Candidate,
    raw: &[u8],
) -> Result<String> {
    let mut keys: BTreeMap<String, Value> = BTreeMap::new();
    keys.insert("version".into(), env!("CARGO_PKG_VERSION").into());
    keys.insert("sourceFilename".into(), candidate.source_filename.clone().into());
    keys.insert("transform".into(), transform.identity().into());
    keys.insert("contentHash".into(), compute_hex_digest(raw).into());
    keys.insert("index".into(), resolved.index.into());

    let keys = match &pattern.cache {
        CacheSetting::Keys(extra) => {
            keys.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
            keys
        }
        CacheSetting::Derived(hook) => {
            let hook = hook.clone();
            let path = candidate.absolute_filename.clone();
            run_hook(async move { hook.keys(keys, &path).await })
                .await
                .map_err(|message| Error::Transform {
                    path: candidate.absolute_filename.clone(),
                    message: format!("cache keys: {message}"),
                })?
        }
        CacheSetting::Enabled | CacheSetting::Disabled => keys,
    };

    Ok(format!("transform|{}", serde_json::to_string(&keys)?))
}

async fn apply_transform(
    transform: Arc<dyn Transform>,
    candidate: &Candidate,
    raw: Vec<u8>,
) -> Result<Vec<u8>> {
    debug!("transforming content for '{}'", candidate.absolute_filename.display());
    let path = candidate.absolute_filename.clone();
    run_hook(async move { transform.transform(raw, &path).await })
        .await
        .map_err(|message| Error::Transform {
            path: candidate.absolute_filename.clone(),
            message,
        })
}

async fn transformed(
    resolved: &ResolvedPattern,
    pattern: &Pattern,
    host: &Host,
    candidate: &Candidate,
    raw: Vec<u8>,
) -> Result<Vec<u8>> {
    let Some(transform) = pattern.transform.clone() else {
        return Ok(raw);
    };

    let store = match &host.cache {
        Some(store) if pattern.cache.is_enabled() => store.clone(),
        _ => return apply_transform(transform, candidate, raw).await,
    };

    let key = transform_key(resolved, pattern, transform.as_ref(), candidate, &raw).await?;
    if let Some(hit) = store.get(TRANSFORM_STORE, &key).await? {
        debug!(
            "getting cached transformation for '{}'",
            candidate.absolute_filename.display()
        );
        return Ok(hit);
    }

    let output = apply_transform(transform, candidate, raw).await?;
    store.put(TRANSFORM_STORE, &key, output.clone()).await?;
    debug!(
        "caching transformation for '{}'",
        candidate.absolute_filename.display()
    );
    Ok(output)
}

/// Produce the final bytes of a candidate.
pub async fn load(
    resolved: &ResolvedPattern,
    pattern: &Pattern,
    host: &Host,
    candidate: &Candidate,
) -> Result<Vec<u8>> {
    let snapshots = match (&host.cache, &host.snapshotter) {
        (Some(store), Some(snapshotter)) => Some((store.clone(), snapshotter.clone())),
        _ => None,
    };
    let key = snapshot_key(resolved, pattern, candidate);

    if let Some((store, snapshotter)) = &snapshots
        && let Some(blob) = store.get(SNAPSHOT_STORE, &key).await?
    {
        match CachedSource::decode(&blob) {
            Ok(cached) => {
                let valid = snapshotter
                    .is_snapshot_valid(&cached.snapshot)
                    .await
                    .map_err(|source| Error::Snapshot {
                        path: candidate.absolute_filename.clone(),
                        source,
                    })?;
                if valid {
                    debug!(
                        "reusing cached content for '{}'",
                        candidate.absolute_filename.display()
                    );
                    return Ok(cached.content);
                }
            }
            Err(e) => debug!("discarding unreadable cache entry '{}': {}", key, e),
        }
    }

    let start = SystemTime::now();
    debug!("reading '{}'", candidate.absolute_filename.display());
    let raw = host
        .fs
        .read_file(&candidate.absolute_filename)
        .await
        .map_err(|source| Error::Read {
            path: candidate.absolute_filename.clone(),
            source,
        })?;

    // Fingerprint the bytes just read, before any hook can touch the file
    let snapshot = match &snapshots {
        Some((_, snapshotter)) => snapshotter
            .create_snapshot(start, &candidate.absolute_filename, &raw)
            .await
            .map_err(|source| Error::Snapshot {
                path: candidate.absolute_filename.clone(),
                source,
            })?,
        None => None,
    };

    let content = transformed(resolved, pattern, host, candidate, raw).await?;

    if let (Some((store, _)), Some(snapshot)) = (&snapshots, snapshot) {
        let entry = CachedSource::new(snapshot, content.clone());
        store.put(SNAPSHOT_STORE, &key, entry.encode()?).await?;
    }

    Ok(content)
}
