// src/cli.rs
//! CLI definitions for unnest
//!
//! This module contains the command-line interface definitions using clap.
//! The command implementations live in `main.rs`. `build.rs` includes this
//! file to render the man page, so it depends on nothing but clap and std.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "unnest")]
#[command(author = "Unnest Contributors")]
#[command(version)]
#[command(about = "Recursively unpack archives and compressed files into a plain tree", long_about = None)]
pub struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true, value_name = "CONFIG")]
    pub config: Option<PathBuf>,

    /// Log per-file detail
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Copy a file or directory, unpacking every archive it contains
    Normalize {
        /// Source file or directory (never modified)
        source: PathBuf,

        /// Destination directory (created if missing)
        dest: PathBuf,

        /// Skip directories whose path contains PATTERN (repeatable, adds to the config list)
        #[arg(long = "ignore", value_name = "PATTERN")]
        ignore: Vec<String>,

        /// Worker threads per scan
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Maximum nested scans that may change the tree
        #[arg(long)]
        max_passes: Option<usize>,

        /// Maximum bytes all extractions of the run may write
        #[arg(long = "max-bytes", value_name = "BYTES")]
        max_bytes: Option<u64>,

        /// Print file and per-extension counts of the result
        #[arg(long)]
        inventory: bool,
    },

    /// Show how each path would be handled
    Classify {
        /// Files to classify
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Count the files of a tree by extension
    Inventory {
        /// Directory to scan
        dir: PathBuf,

        /// Skip directories whose path contains PATTERN (repeatable, adds to the config list)
        #[arg(long = "ignore", value_name = "PATTERN")]
        ignore: Vec<String>,
    },
}
