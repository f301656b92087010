//! Configuration validation

use std::path::Path;

use colored::Colorize;

use copy_core::CopyPlugin;
use copy_fs::NormalizedPath;

use crate::error::Result;

/// Load the configuration exactly as `run` would and list its patterns.
pub fn run_check(config: &Path) -> Result<()> {
    println!(
        "{} Checking {}...",
        "=>".blue().bold(),
        config.display().to_string().cyan()
    );

    let plugin = CopyPlugin::load(&NormalizedPath::new(config))?;

    for (index, pattern) in plugin.patterns().iter().enumerate() {
        println!(
            "   {} {} -> {}",
            format!("{index}.").dimmed(),
            pattern.from.to_string().cyan(),
            pattern.to.as_deref().unwrap_or(".")
        );
    }
    println!(
        "{} {} pattern(s), concurrency {}",
        "OK".green().bold(),
        plugin.patterns().len(),
        plugin.options().concurrency
    );

    Ok(())
}
