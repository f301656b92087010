//! Shared test utilities for the asset copy workspace.
//!
//! Dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`fixture`]: the standard source tree, on disk or in memory
//! - [`counting`]: filesystem wrapper counting reads, for cache tests

pub mod counting;
pub mod fixture;

pub use counting::CountingFs;
pub use fixture::{FIXTURE_FILES, Fixture, memory_fixture};
