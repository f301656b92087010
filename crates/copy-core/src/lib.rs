//! Pattern resolution and asset materialization
//!
//! A [`CopyPlugin`] holds declarative copy [`Pattern`]s. Each run resolves
//! every pattern against the [`Host`] capabilities, in this order:
//!
//! 1. [`normalize`]: canonical paths, destination type, source classification
//! 2. [`plan`]: glob expression, glob options and watch dependencies
//! 3. [`enumerate`]: glob expansion into per-file candidates
//! 4. [`content`]: read, transform and cache the bytes of each candidate
//! 5. [`naming`]: final destination names, including template tokens
//! 6. [`emit`]: serial reconciliation against the asset registry
//!
//! Steps 1 to 5 run concurrently across patterns (bounded) and across the
//! candidates of a pattern (unbounded). Step 6 runs once, after everything
//! else, in pattern order then match order.

pub mod assets;
pub mod content;
pub mod digest;
pub mod emit;
pub mod enumerate;
pub mod error;
pub mod hooks;
pub mod host;
pub mod naming;
pub mod normalize;
pub mod options;
pub mod pattern;
pub mod plan;
pub mod plugin;
pub mod template;

pub use assets::{Asset, AssetInfo, AssetRegistry, Assets, LegacyAssets, RawSource};
pub use emit::{AssetAction, AssetOutcome, EmittableAsset};
pub use enumerate::Candidate;
pub use error::{Error, PatternFailure, Result};
pub use hooks::{
    CacheKeys, Filter, HookError, HookResult, PathTransform, Transform, cache_keys_fn, filter_fn,
    transform_fn, transform_path_fn,
};
pub use host::{Dependencies, Host};
pub use naming::ResolvedName;
pub use normalize::{FromKind, ResolvedPattern};
pub use options::{CopyConfig, PatternConfig, PatternEntry, PluginOptions};
pub use pattern::{CacheSetting, GlobSettings, GlobSpec, Pattern, Source, ToType};
pub use plan::{FromType, GlobPlan};
pub use plugin::{CopyPlugin, CopyReport};
