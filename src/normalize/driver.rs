// src/normalize/driver.rs

//! Nested-Extraction Driver
//!
//! Rescans the destination tree until a full scan changes nothing. Each scan
//! first lists the candidates, then processes them; files produced during a
//! scan are picked up by the next one. Every successful extraction deletes
//! its source file, so the tree only ever trades archives for their content.
//!
//! Files that turn out not to be archives, or that fail, stay where they are
//! and are marked inert so later scans of the same run skip them. This is
//! what lets the loop settle on corrupt or misnamed input.

use super::context::{ExtractionContext, RunStats};
use super::for_each_item;
use super::report::ScanSummary;
use crate::archive::{MultiOutcome, extract_multi};
use crate::classify::{ExtractionKind, classify};
use crate::compression::decompress;
use crate::error::{Error, Result};
use crate::filesystem::FileWalk;
use rayon::ThreadPool;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

/// Extract archives and compressed files in place until none remain
///
/// At most `max_passes` scans may change the tree; a tree that still changes
/// after that fails with `PossibleArchiveBomb`.
pub fn extract_nested_archives(
    dest_root: &Path,
    ctx: &ExtractionContext,
    max_passes: usize,
    pool: Option<&ThreadPool>,
) -> Result<ScanSummary> {
    let mut summary = ScanSummary::default();

    loop {
        ctx.check_interrupt()?;
        summary.passes += 1;

        let candidates = scan(dest_root, ctx)?;
        if candidates.is_empty() {
            break;
        }
        if summary.passes > max_passes {
            return Err(Error::PossibleArchiveBomb {
                reason: format!(
                    "{} still holds {} archives after {} extraction passes",
                    dest_root.display(),
                    candidates.len(),
                    max_passes
                ),
            });
        }

        info!(
            "Nested scan pass {}: {} candidates",
            summary.passes,
            candidates.len()
        );

        let changed = AtomicU64::new(0);
        for_each_item(&candidates, pool, |(path, kind)| {
            if extract_in_place(path, dest_root, *kind, ctx)? {
                changed.fetch_add(1, Ordering::Relaxed);
            }
            Ok(())
        })?;

        let changed = changed.into_inner();
        summary.changes += changed;
        if changed == 0 {
            break;
        }
    }

    info!(
        "Nested extraction settled after {} passes ({} changes)",
        summary.passes, summary.changes
    );
    Ok(summary)
}

/// Files in the tree that still need extracting
fn scan(dest_root: &Path, ctx: &ExtractionContext) -> Result<Vec<(PathBuf, ExtractionKind)>> {
    let files = FileWalk::new(dest_root, ctx.ignore()).collect()?;

    Ok(files
        .into_iter()
        .filter(|path| !ctx.is_inert(path))
        .filter_map(|path| {
            let kind = classify(&path);
            kind.needs_extraction().then_some((path, kind))
        })
        .collect())
}

/// Process one candidate; returns whether the tree changed
fn extract_in_place(
    path: &Path,
    dest_root: &Path,
    kind: ExtractionKind,
    ctx: &ExtractionContext,
) -> Result<bool> {
    ctx.check_interrupt()?;

    match try_extract(path, dest_root, kind, ctx) {
        Err(e) if e.is_recoverable() => {
            ctx.record_failure(path, &e);
            ctx.mark_inert(path);
            Ok(false)
        }
        other => other,
    }
}

fn try_extract(
    path: &Path,
    dest_root: &Path,
    kind: ExtractionKind,
    ctx: &ExtractionContext,
) -> Result<bool> {
    let stats = ctx.stats();

    match kind {
        ExtractionKind::Plain => Ok(false),
        ExtractionKind::SingleCompressed => {
            let dest = ctx.claims().claim(&path.with_extension(""));
            let bytes = decompress(path, &dest, ctx.budget())?;
            fs::remove_file(path)?;

            debug!("Decompressed {} in place", path.display());
            RunStats::add(&stats.files_decompressed, 1);
            RunStats::add(&stats.bytes_written, bytes);
            Ok(true)
        }
        ExtractionKind::MultiArchive => {
            let rel = path.strip_prefix(dest_root).unwrap_or(path);
            match extract_multi(path, dest_root, rel, ctx)? {
                MultiOutcome::Extracted { .. } => {
                    fs::remove_file(path)?;
                    RunStats::add(&stats.archives_extracted, 1);
                    Ok(true)
                }
                MultiOutcome::CopiedVerbatim { .. } | MultiOutcome::LeftInPlace => {
                    ctx.mark_inert(path);
                    Ok(false)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::IgnoreSet;
    use std::io::Write;

    fn ctx() -> ExtractionContext {
        ExtractionContext::new(IgnoreSet::new([".git"]), u64::MAX)
    }

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_empty_tree_settles_immediately() {
        let dest = tempfile::tempdir().unwrap();
        let summary = extract_nested_archives(dest.path(), &ctx(), 4, None).unwrap();
        assert_eq!(summary, ScanSummary { passes: 1, changes: 0 });
    }

    #[test]
    fn test_nested_gzip_layers_unwrap() {
        let dest = tempfile::tempdir().unwrap();
        // data.txt.gz.gz -> data.txt.gz -> data.txt
        fs::write(dest.path().join("data.txt.gz.gz"), gzip(&gzip(b"payload"))).unwrap();

        let summary = extract_nested_archives(dest.path(), &ctx(), 8, None).unwrap();

        assert_eq!(fs::read(dest.path().join("data.txt")).unwrap(), b"payload");
        assert!(!dest.path().join("data.txt.gz").exists());
        assert!(!dest.path().join("data.txt.gz.gz").exists());
        assert_eq!(summary.changes, 2);
        assert_eq!(summary.passes, 3);
    }

    #[test]
    fn test_pass_limit() {
        let dest = tempfile::tempdir().unwrap();
        fs::write(dest.path().join("data.txt.gz.gz"), gzip(&gzip(b"payload"))).unwrap();

        let err = extract_nested_archives(dest.path(), &ctx(), 1, None).unwrap_err();
        assert!(matches!(err, Error::PossibleArchiveBomb { .. }));
    }

    #[test]
    fn test_misnamed_archive_left_in_place() {
        let dest = tempfile::tempdir().unwrap();
        let fake = dest.path().join("fake.zip");
        fs::write(&fake, b"not really a zip").unwrap();

        let context = ctx();
        let summary = extract_nested_archives(dest.path(), &context, 4, None).unwrap();

        assert_eq!(summary.changes, 0);
        assert_eq!(fs::read(&fake).unwrap(), b"not really a zip");
        assert!(context.is_inert(&fake));
        assert!(context.report(0).failures.is_empty());
    }

    #[test]
    fn test_corrupt_file_recorded_once() {
        let dest = tempfile::tempdir().unwrap();
        // Valid gzip header, then a deflate block with a reserved block type
        let mut broken = vec![0x1f, 0x8b, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x03];
        broken.extend([0xff; 16]);
        fs::write(dest.path().join("broken.log.gz"), &broken).unwrap();
        fs::write(dest.path().join("good.log.gz"), gzip(b"fine")).unwrap();

        let context = ctx();
        let summary = extract_nested_archives(dest.path(), &context, 4, None).unwrap();

        assert_eq!(summary.changes, 1);
        assert!(dest.path().join("broken.log.gz").exists());
        assert_eq!(fs::read(dest.path().join("good.log")).unwrap(), b"fine");
        assert_eq!(context.report(0).failures.len(), 1);
    }

    #[test]
    fn test_second_run_reports_no_changes() {
        let dest = tempfile::tempdir().unwrap();
        fs::write(dest.path().join("a.txt.gz"), gzip(b"a")).unwrap();

        let context = ctx();
        let first = extract_nested_archives(dest.path(), &context, 4, None).unwrap();
        assert_eq!(first.changes, 1);

        let second = extract_nested_archives(dest.path(), &context, 4, None).unwrap();
        assert_eq!(second, ScanSummary { passes: 1, changes: 0 });
    }

    #[test]
    fn test_ignored_directory_untouched() {
        let dest = tempfile::tempdir().unwrap();
        fs::create_dir_all(dest.path().join(".git")).unwrap();
        fs::write(dest.path().join(".git/pack.txt.gz"), gzip(b"x")).unwrap();

        let summary = extract_nested_archives(dest.path(), &ctx(), 4, None).unwrap();

        assert_eq!(summary.changes, 0);
        assert!(dest.path().join(".git/pack.txt.gz").exists());
    }
}
