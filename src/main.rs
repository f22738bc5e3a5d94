// src/main.rs

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::{Path, PathBuf};
use tracing::info;
use unnest::filesystem::IgnoreSet;
use unnest::{Config, ExtractionConfig, FileInventory, Normalizer, classify};

/// Command-line overrides for the `[extraction]` section
#[derive(Debug, Default)]
struct Overrides {
    ignore: Vec<String>,
    jobs: Option<usize>,
    max_passes: Option<usize>,
    max_bytes: Option<u64>,
}

impl Overrides {
    fn apply(self, mut config: ExtractionConfig) -> ExtractionConfig {
        config.ignore_dirs.extend(self.ignore);
        if let Some(jobs) = self.jobs {
            config.jobs = jobs;
        }
        if let Some(max_passes) = self.max_passes {
            config.max_passes = max_passes;
        }
        if let Some(max_bytes) = self.max_bytes {
            config.max_extracted_bytes = max_bytes;
        }
        config
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing subscriber for logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::new(),
    };

    match cli.command {
        Commands::Normalize {
            source,
            dest,
            ignore,
            jobs,
            max_passes,
            max_bytes,
            inventory,
        } => {
            let overrides = Overrides {
                ignore,
                jobs,
                max_passes,
                max_bytes,
            };
            let clean = cmd_normalize(
                &source,
                &dest,
                overrides.apply(config.extraction),
                inventory,
            )?;
            if !clean {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Classify { paths } => {
            cmd_classify(&paths);
            Ok(())
        }
        Commands::Inventory { dir, ignore } => {
            let overrides = Overrides {
                ignore,
                ..Default::default()
            };
            let extraction = overrides.apply(config.extraction);
            cmd_inventory(&dir, &extraction.ignore_set())
        }
    }
}

/// Run a normalization; returns whether every file was processed
fn cmd_normalize(
    source: &Path,
    dest: &Path,
    extraction: ExtractionConfig,
    show_inventory: bool,
) -> Result<bool> {
    let ignore = extraction.ignore_set();
    let normalizer = Normalizer::new(extraction).context("Invalid extraction settings")?;

    info!("Normalizing {} into {}", source.display(), dest.display());
    let report = normalizer
        .run(source, dest)
        .with_context(|| format!("Failed to normalize {}", source.display()))?;

    println!("{report}");

    if show_inventory {
        println!();
        cmd_inventory(dest, &ignore)?;
    }

    Ok(report.is_clean())
}

fn cmd_classify(paths: &[PathBuf]) {
    for path in paths {
        println!("{:<18} {}", classify(path), path.display());
    }
}

fn cmd_inventory(dir: &Path, ignore: &IgnoreSet) -> Result<()> {
    let inventory = FileInventory::scan(dir, ignore)
        .with_context(|| format!("Failed to scan {}", dir.display()))?;

    println!("Files: {}", inventory.len());
    for (extension, count) in inventory.extension_counts() {
        println!("  {:<20} {}", extension, count);
    }
    Ok(())
}
