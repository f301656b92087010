//! CLI argument parsing using clap derive

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Copy Assets - Copy files into a build output from declarative patterns
#[derive(Parser, Debug)]
#[command(name = "copy-assets")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run every pattern and write the produced assets
    ///
    /// Examples:
    ///   copy-assets run                         # copy.toml in the current directory
    ///   copy-assets run -c assets.json -o dist  # explicit config and output
    ///   copy-assets run --cache-dir .cache      # reuse unchanged files across runs
    Run {
        /// Configuration file (.toml, .json, .yaml or .yml)
        #[arg(short, long, env = "COPY_ASSETS_CONFIG", default_value = "copy.toml")]
        config: PathBuf,

        /// Build context relative sources are resolved against
        #[arg(long, default_value = ".")]
        context: PathBuf,

        /// Output directory assets are written to
        #[arg(short, long, env = "COPY_ASSETS_OUTPUT", default_value = "dist")]
        output: PathBuf,

        /// Persistent cache directory; enables snapshot and transform caching
        #[arg(long, env = "COPY_ASSETS_CACHE_DIR")]
        cache_dir: Option<PathBuf>,

        /// Resolve everything but write nothing
        #[arg(long)]
        dry_run: bool,

        /// Output the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate a configuration file and list its patterns
    Check {
        /// Configuration file (.toml, .json, .yaml or .yml)
        #[arg(short, long, env = "COPY_ASSETS_CONFIG", default_value = "copy.toml")]
        config: PathBuf,
    },
}
