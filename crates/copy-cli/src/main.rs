//! Copy Assets CLI
//!
//! A minimal build host: loads a pattern configuration, runs the copy
//! pipeline against a directory and writes the produced assets.

mod cli;
mod commands;
mod error;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use cli::{Cli, Commands};
use commands::RunArgs;
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

/// `RUST_LOG` wins unless `--verbose` is given; the default level is `info`.
/// Logs go to stderr so stdout stays parseable with `--json`.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(verbose)
                .with_writer(std::io::stderr),
        )
        .try_init();
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    tracing::debug!("Verbose mode enabled");

    match cli.command {
        Some(cmd) => execute_command(cmd),
        None => {
            println!("{} asset copy pipeline", "copy-assets".green().bold());
            println!();
            println!("Run {} for available commands.", "copy-assets --help".cyan());
            Ok(())
        }
    }
}

fn execute_command(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Run {
            config,
            context,
            output,
            cache_dir,
            dry_run,
            json,
        } => commands::run_copy(&RunArgs {
            config,
            context,
            output,
            cache_dir,
            dry_run,
            json,
        }),
        Commands::Check { config } => commands::run_check(&config),
    }
}
