// src/normalize/mod.rs

//! Normalization pipeline
//!
//! A run has two phases:
//!
//! 1. The **Tree Copier** mirrors the source into the destination, turning
//!    compressed files into their content and archives into directories.
//! 2. The **Nested-Extraction Driver** rescans the destination until a scan
//!    finds nothing left to unpack.
//!
//! A single-file source is treated as the only file of an imaginary source
//! directory, so it lands at `dest/<file name>` (or its unpacked form).
//!
//! # Example
//!
//! ```no_run
//! use unnest::config::ExtractionConfig;
//! use unnest::normalize::Normalizer;
//! use std::path::Path;
//!
//! let normalizer = Normalizer::new(ExtractionConfig::default())?;
//! let report = normalizer.run(Path::new("drop/"), Path::new("flat/"))?;
//! println!("{report}");
//! # Ok::<(), unnest::Error>(())
//! ```

pub mod context;
mod copier;
mod driver;
mod report;

pub use context::ExtractionContext;
pub use copier::{copy_or_extract_file, copy_tree_with_extraction};
pub use driver::extract_nested_archives;
pub use report::{FailedFile, NormalizeReport, ScanSummary};

use crate::config::ExtractionConfig;
use crate::error::{Error, Result};
use rayon::ThreadPool;
use rayon::prelude::*;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tracing::info;

/// Run `f` over `items`, on `pool` when one is given
///
/// The first error stops the remaining work and is returned.
pub(crate) fn for_each_item<T, F>(items: &[T], pool: Option<&ThreadPool>, f: F) -> Result<()>
where
    T: Sync,
    F: Fn(&T) -> Result<()> + Sync + Send,
{
    match pool {
        Some(pool) => pool.install(|| items.par_iter().try_for_each(&f)),
        None => items.iter().try_for_each(f),
    }
}

/// Entry point: normalizes a source file or directory into a destination
#[derive(Debug)]
pub struct Normalizer {
    config: ExtractionConfig,
    interrupt: Option<Arc<AtomicBool>>,
}

impl Normalizer {
    /// Create a normalizer, rejecting unusable settings
    pub fn new(config: ExtractionConfig) -> Result<Self> {
        config.check()?;
        Ok(Self {
            config,
            interrupt: None,
        })
    }

    /// Abandon the run between files once `flag` is set
    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupt = Some(flag);
        self
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Normalize `source` into `dest`
    ///
    /// `dest` is created if missing. The source is never modified, so a
    /// source at or below `dest` is refused before anything is written.
    ///
    /// Errors: `NotFileOrDirectory` for a missing or special source,
    /// `SourceInsideDestination`, and every fatal extraction error. Per-file
    /// failures are listed in the report instead.
    pub fn run(&self, source: &Path, dest: &Path) -> Result<NormalizeReport> {
        let metadata =
            fs::metadata(source).map_err(|_| Error::NotFileOrDirectory(source.to_path_buf()))?;
        if !metadata.is_dir() && !metadata.is_file() {
            return Err(Error::NotFileOrDirectory(source.to_path_buf()));
        }

        fs::create_dir_all(dest)?;
        let dest = dest.canonicalize()?;
        let source = source.canonicalize()?;
        if source.starts_with(&dest) {
            return Err(Error::SourceInsideDestination { input: source, dest });
        }

        let mut ctx = ExtractionContext::new(
            self.config.ignore_set(),
            self.config.max_extracted_bytes,
        );
        if let Some(flag) = &self.interrupt {
            ctx = ctx.with_interrupt(Arc::clone(flag));
        }

        let pool = self.build_pool()?;

        info!("Normalizing {} into {}", source.display(), dest.display());

        if metadata.is_dir() {
            copy_tree_with_extraction(&source, &dest, &ctx, pool.as_ref())?;
        } else {
            let rel = virtual_root_path(&source)?;
            copy_or_extract_file(&source, &dest, &rel, &ctx)?;
        }

        let summary = extract_nested_archives(&dest, &ctx, self.config.max_passes, pool.as_ref())?;

        let report = ctx.report(summary.passes);
        info!(
            "Normalization finished: {} copied, {} decompressed, {} archives, {} failures",
            report.files_copied,
            report.files_decompressed,
            report.archives_extracted,
            report.failures.len()
        );
        Ok(report)
    }

    fn build_pool(&self) -> Result<Option<ThreadPool>> {
        if self.config.jobs <= 1 {
            return Ok(None);
        }
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.jobs)
            .thread_name(|i| format!("unnest-worker-{i}"))
            .build()
            .map(Some)
            .map_err(|e| Error::Io(io::Error::other(e)))
    }
}

/// Relative path of a single-file source under its imaginary parent
fn virtual_root_path(source: &Path) -> Result<PathBuf> {
    source
        .file_name()
        .map(PathBuf::from)
        .ok_or_else(|| Error::NotFileOrDirectory(source.to_path_buf()))
}
