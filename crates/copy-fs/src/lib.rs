//! Filesystem abstraction for the asset copy pipeline
//!
//! Provides normalized path handling, the read-only filesystem capability
//! consumed by the pipeline, the default glob engine and safe I/O helpers.

pub mod checksum;
pub mod config;
pub mod error;
pub mod filesystem;
pub mod glob;
pub mod io;
pub mod path;

pub use config::ConfigStore;
pub use error::{Error, Result};
pub use filesystem::{DirEntry, FileKind, FileStat, InputFileSystem, MemoryFs, NativeFs};
pub use glob::{
    EscapePolicy, FsGlobber, GlobEntry, GlobOptions, Globber, escape, glob_parent, has_magic,
};
pub use path::{NormalizedPath, normalize_lexically, normalize_path, relative_path, to_slash};
