//! The copy run

use std::path::{Path, PathBuf};
use std::sync::Arc;

use colored::Colorize;
use serde::Serialize;

use copy_cache::{DiskStore, FsSnapshotter};
use copy_core::{AssetAction, AssetOutcome, Assets, CopyPlugin, CopyReport, Host};
use copy_fs::io::write_atomic;
use copy_fs::{NativeFs, NormalizedPath, normalize_path};

use crate::error::{CliError, Result};

/// Arguments of the `run` command
#[derive(Debug, Clone)]
pub struct RunArgs {
    pub config: PathBuf,
    pub context: PathBuf,
    pub output: PathBuf,
    pub cache_dir: Option<PathBuf>,
    pub dry_run: bool,
    pub json: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonError {
    index: usize,
    from: String,
    message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonReport<'a> {
    dry_run: bool,
    assets: &'a [AssetOutcome],
    errors: Vec<JsonError>,
    file_dependencies: Vec<PathBuf>,
    context_dependencies: Vec<PathBuf>,
}

fn absolute(path: &Path) -> Result<PathBuf> {
    Ok(normalize_path(&std::path::absolute(path)?))
}

/// Resolve `name` under the output directory, refusing names that escape it.
fn output_file(output: &Path, name: &str) -> Result<NormalizedPath> {
    if name == ".." || name.starts_with("../") || Path::new(name).is_absolute() {
        return Err(CliError::user(format!(
            "Refusing to write '{}' outside of {}",
            name,
            output.display()
        )));
    }
    Ok(NormalizedPath::new(output.join(name)))
}

fn build_host(args: &RunArgs) -> Result<Host> {
    let context = dunce::canonicalize(&args.context).map_err(|e| {
        CliError::user(format!(
            "Invalid context '{}': {}",
            args.context.display(),
            e
        ))
    })?;

    let mut host = Host::native(context).with_output_path(absolute(&args.output)?);
    if let Some(cache_dir) = &args.cache_dir {
        tracing::debug!("Using cache directory {}", cache_dir.display());
        host = host
            .with_cache(Arc::new(DiskStore::new(absolute(cache_dir)?)))
            .with_snapshotter(Arc::new(FsSnapshotter::new(Arc::new(NativeFs))));
    }
    Ok(host)
}

/// Run the configured patterns and write the assets to the output directory.
pub fn run_copy(args: &RunArgs) -> Result<()> {
    let plugin = CopyPlugin::load(&NormalizedPath::new(&args.config))?;
    let host = build_host(args)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    if !args.json {
        println!(
            "{} Copying assets from {}...",
            "=>".blue().bold(),
            host.context.display().to_string().cyan()
        );
    }

    let mut assets = Assets::new();
    let report = runtime.block_on(plugin.run(&host, &mut assets));

    let output = absolute(&args.output)?;
    if !args.dry_run {
        for asset in assets.iter() {
            let target = output_file(&output, &asset.name)?;
            write_atomic(&target, asset.source.bytes())?;
        }
    }

    if args.json {
        print_json(args, &host, &report)?;
    } else {
        print_report(args, &output, &report);
    }

    if report.is_success() {
        Ok(())
    } else {
        Err(CliError::PatternErrors {
            count: report.errors.len(),
        })
    }
}

fn print_json(args: &RunArgs, host: &Host, report: &CopyReport) -> Result<()> {
    let json = JsonReport {
        dry_run: args.dry_run,
        assets: &report.outcomes,
        errors: report
            .errors
            .iter()
            .map(|failure| JsonError {
                index: failure.index,
                from: failure.from.clone(),
                message: failure.error.to_string(),
            })
            .collect(),
        file_dependencies: host.dependencies.file_dependencies(),
        context_dependencies: host.dependencies.context_dependencies(),
    };
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

fn print_report(args: &RunArgs, output: &Path, report: &CopyReport) {
    for outcome in &report.outcomes {
        let mut flags = String::new();
        if outcome.info.copied {
            flags.push_str(" [copied]");
        }
        if outcome.info.immutable {
            flags.push_str(" [immutable]");
        }

        match outcome.action {
            AssetAction::Emitted => println!(
                "   {} {}{} ({} bytes)",
                "+".green(),
                outcome.filename.cyan(),
                flags.dimmed(),
                outcome.size
            ),
            AssetAction::Updated => println!(
                "   {} {}{} ({} bytes, forced)",
                "~".yellow(),
                outcome.filename.cyan(),
                flags.dimmed(),
                outcome.size
            ),
            AssetAction::Skipped => println!(
                "   {} {} (already exists)",
                "-".dimmed(),
                outcome.filename.dimmed()
            ),
        }
    }

    for failure in &report.errors {
        println!("   {} {}", "!".red(), failure);
    }

    let written = report.outcomes.len() - report.count(AssetAction::Skipped);
    if args.dry_run {
        println!(
            "{} {} asset(s) would be written to {}",
            "DRY RUN".yellow().bold(),
            written,
            output.display()
        );
    } else if report.is_success() {
        println!(
            "{} {} asset(s) written to {}",
            "OK".green().bold(),
            written,
            output.display()
        );
    } else {
        println!(
            "{} {} asset(s) written to {}, {} pattern error(s)",
            "FAILED".red().bold(),
            written,
            output.display(),
            report.errors.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use copy_test_utils::Fixture;
    use std::fs;

    fn args(fixture: &Fixture, config: &str) -> RunArgs {
        let config_path = fixture.path("copy.toml");
        fs::write(&config_path, config).unwrap();
        RunArgs {
            config: config_path,
            context: fixture.root().to_path_buf(),
            output: fixture.path("dist"),
            cache_dir: None,
            dry_run: false,
            json: false,
        }
    }

    #[test]
    fn writes_assets_to_the_output() {
        let fixture = Fixture::new();
        let args = args(&fixture, "patterns = [\"file.txt\", { from = \"directory\", to = \"dir\" }]\n");

        run_copy(&args).unwrap();

        fixture.assert_file_content("dist/file.txt", "new");
        fixture.assert_file_content("dist/dir/directoryfile.txt", "new");
        fixture.assert_file_content("dist/dir/.dottedfile", "dottedfile contents\n");
    }

    #[test]
    fn dry_run_writes_nothing() {
        let fixture = Fixture::new();
        let mut args = args(&fixture, "patterns = [\"file.txt\"]\n");
        args.dry_run = true;

        run_copy(&args).unwrap();
        fixture.assert_file_not_exists("dist");
    }

    #[test]
    fn pattern_errors_fail_the_command() {
        let fixture = Fixture::new();
        let args = args(&fixture, "patterns = [\"missing.txt\", \"file.txt\"]\n");

        let err = run_copy(&args).unwrap_err();
        assert!(matches!(err, CliError::PatternErrors { count: 1 }));
        fixture.assert_file_exists("dist/file.txt");
    }

    #[test]
    fn escaping_names_are_refused() {
        let err = output_file(Path::new("/out"), "../secret.txt").unwrap_err();
        assert!(err.to_string().contains("outside of /out"));
        assert!(output_file(Path::new("/out"), "a/b.txt").is_ok());
    }
}
