// src/normalize/context.rs

//! Per-run extraction state
//!
//! One `ExtractionContext` is created per run and shared by reference with
//! every worker. It carries the ignore set, the byte budget, the output path
//! reservations, counters, the files that failed and the files known not
//! to extract.

use super::report::{FailedFile, NormalizeReport};
use crate::budget::ByteBudget;
use crate::error::{Error, Result};
use crate::filesystem::{DestinationClaims, IgnoreSet};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Counters updated concurrently during a run
#[derive(Debug, Default)]
pub struct RunStats {
    pub files_copied: AtomicU64,
    pub files_decompressed: AtomicU64,
    pub archives_extracted: AtomicU64,
    pub entries_extracted: AtomicU64,
    pub skipped_entries: AtomicU64,
    pub bytes_written: AtomicU64,
}

impl RunStats {
    pub fn add(counter: &AtomicU64, amount: u64) {
        counter.fetch_add(amount, Ordering::Relaxed);
    }

    fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}

/// Shared state for one normalization run
#[derive(Debug)]
pub struct ExtractionContext {
    ignore: IgnoreSet,
    budget: ByteBudget,
    claims: DestinationClaims,
    stats: RunStats,
    failures: Mutex<Vec<FailedFile>>,
    /// Destination files known not to extract (mismatched or failed)
    inert: Mutex<HashSet<PathBuf>>,
    interrupt: Option<Arc<AtomicBool>>,
}

impl ExtractionContext {
    pub fn new(ignore: IgnoreSet, max_extracted_bytes: u64) -> Self {
        Self {
            ignore,
            budget: ByteBudget::new(max_extracted_bytes),
            claims: DestinationClaims::new(),
            stats: RunStats::default(),
            failures: Mutex::new(Vec::new()),
            inert: Mutex::new(HashSet::new()),
            interrupt: None,
        }
    }

    /// Stop the run between files once `flag` is set
    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupt = Some(flag);
        self
    }

    pub fn ignore(&self) -> &IgnoreSet {
        &self.ignore
    }

    pub fn budget(&self) -> &ByteBudget {
        &self.budget
    }

    pub fn claims(&self) -> &DestinationClaims {
        &self.claims
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Fail with `Interrupted` if the run has been asked to stop
    pub fn check_interrupt(&self) -> Result<()> {
        match &self.interrupt {
            Some(flag) if flag.load(Ordering::SeqCst) => Err(Error::Interrupted),
            _ => Ok(()),
        }
    }

    /// Record a recoverable per-file failure
    pub fn record_failure(&self, path: &Path, error: &Error) {
        warn!("Skipping {}: {}", path.display(), error);
        self.failures
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(FailedFile {
                path: path.to_path_buf(),
                error: error.to_string(),
            });
    }

    /// Remember that a destination file does not extract
    ///
    /// Nested scans skip inert files for the rest of the run, so a
    /// misnamed or corrupt file is tried once.
    pub fn mark_inert(&self, path: &Path) {
        self.inert
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(path.to_path_buf());
    }

    pub fn is_inert(&self, path: &Path) -> bool {
        self.inert
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(path)
    }

    /// Number of failures recorded so far
    pub fn failure_count(&self) -> usize {
        self.failures
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Snapshot counters and failures into a report
    pub fn report(&self, passes: usize) -> NormalizeReport {
        let mut failures = self
            .failures
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        failures.sort_by(|a, b| a.path.cmp(&b.path));

        NormalizeReport {
            files_copied: RunStats::get(&self.stats.files_copied),
            files_decompressed: RunStats::get(&self.stats.files_decompressed),
            archives_extracted: RunStats::get(&self.stats.archives_extracted),
            entries_extracted: RunStats::get(&self.stats.entries_extracted),
            skipped_entries: RunStats::get(&self.stats.skipped_entries),
            bytes_written: RunStats::get(&self.stats.bytes_written),
            passes,
            failures,
        }
    }
}
