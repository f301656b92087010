//! Caching capabilities for the asset copy pipeline
//!
//! Two capabilities live here:
//!
//! - [`CacheStore`]: a key to blob store partitioned by store id. The
//!   pipeline only ever calls `get` and `put`; the store is responsible for
//!   its own concurrent-access safety.
//! - [`Snapshotter`]: point-in-time fingerprints of source files, used to
//!   decide whether cached bytes can be reused without reading the file.

pub mod entry;
pub mod error;
pub mod snapshot;
pub mod store;

pub use entry::CachedSource;
pub use error::{Error, Result};
pub use snapshot::{FsSnapshotter, Snapshot, Snapshotter};
pub use store::{CacheStore, DiskStore, MemoryStore};
