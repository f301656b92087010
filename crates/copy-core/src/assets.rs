//! Output asset registries
//!
//! The reconciler talks to the host's build output through
//! [`AssetRegistry`]. Two shapes exist: [`Assets`] keeps per-asset info,
//! [`LegacyAssets`] is a bare name to source map that cannot hold info.

use serde::Serialize;
use std::collections::BTreeMap;

/// Metadata attached to an emitted asset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AssetInfo {
    pub copied: bool,
    /// The name is derived from the content
    pub immutable: bool,
}

/// Raw bytes of an asset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSource(Vec<u8>);

impl RawSource {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for RawSource {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

/// An asset as stored in a registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub name: String,
    pub source: RawSource,
    pub info: AssetInfo,
}

/// The host's output asset set.
pub trait AssetRegistry: Send {
    fn get_asset(&self, name: &str) -> Option<Asset>;

    fn emit_asset(&mut self, name: &str, source: RawSource, info: AssetInfo);

    fn update_asset(&mut self, name: &str, source: RawSource, info: AssetInfo);
}

/// Registry keeping source and info per asset.
#[derive(Debug, Clone, Default)]
pub struct Assets {
    entries: BTreeMap<String, (RawSource, AssetInfo)>,
}

impl Assets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Asset names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Asset> + '_ {
        self.entries.iter().map(|(name, (source, info))| Asset {
            name: name.clone(),
            source: source.clone(),
            info: *info,
        })
    }
}

impl AssetRegistry for Assets {
    fn get_asset(&self, name: &str) -> Option<Asset> {
        self.entries.get(name).map(|(source, info)| Asset {
            name: name.to_string(),
            source: source.clone(),
            info: *info,
        })
    }

    fn emit_asset(&mut self, name: &str, source: RawSource, info: AssetInfo) {
        self.entries.insert(name.to_string(), (source, info));
    }

    fn update_asset(&mut self, name: &str, source: RawSource, info: AssetInfo) {
        self.entries.insert(name.to_string(), (source, info));
    }
}

/// Registry of the older shape: names map straight to sources and any
/// info is dropped.
#[derive(Debug, Clone, Default)]
pub struct LegacyAssets {
    pub assets: BTreeMap<String, RawSource>,
}

impl LegacyAssets {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AssetRegistry for LegacyAssets {
    fn get_asset(&self, name: &str) -> Option<Asset> {
        self.assets.get(name).map(|source| Asset {
            name: name.to_string(),
            source: source.clone(),
            info: AssetInfo::default(),
        })
    }

    fn emit_asset(&mut self, name: &str, source: RawSource, _info: AssetInfo) {
        self.assets.insert(name.to_string(), source);
    }

    fn update_asset(&mut self, name: &str, source: RawSource, _info: AssetInfo) {
        self.assets.insert(name.to_string(), source);
    }
}
