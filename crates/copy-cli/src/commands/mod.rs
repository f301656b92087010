//! Command implementations

mod check;
mod run;

pub use check::run_check;
pub use run::{RunArgs, run_copy};
