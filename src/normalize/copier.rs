// src/normalize/copier.rs

//! Tree Copier: builds the initial destination tree from the source
//!
//! Every source file is classified and sent down one of three paths: plain
//! copy, single-stream decompression, or archive extraction. The source is
//! only ever read.

use super::context::{ExtractionContext, RunStats};
use super::for_each_item;
use crate::archive::{MultiOutcome, extract_multi};
use crate::classify::{ExtractionKind, classify};
use crate::compression::decompress;
use crate::error::Result;
use crate::filesystem::{FileWalk, copy_file};
use rayon::ThreadPool;
use std::path::Path;
use tracing::{debug, info};

/// Mirror `src_dir` into `dest_root`, unpacking what can be unpacked
///
/// Directories whose path below `src_dir` contains an ignore pattern are
/// skipped with everything in them. If `dest_root` lies inside `src_dir` it
/// is skipped too.
pub fn copy_tree_with_extraction(
    src_dir: &Path,
    dest_root: &Path,
    ctx: &ExtractionContext,
    pool: Option<&ThreadPool>,
) -> Result<()> {
    let files = FileWalk::new(src_dir, ctx.ignore())
        .exclude(dest_root)
        .collect()?;

    info!(
        "Copying {} files from {} to {}",
        files.len(),
        src_dir.display(),
        dest_root.display()
    );

    for_each_item(&files, pool, |src_file| {
        let rel = src_file.strip_prefix(src_dir).unwrap_or(src_file);
        copy_or_extract_file(src_file, dest_root, rel, ctx)
    })
}

/// Classify one source file and write its mirror under `dest_root`
///
/// `rel` is the file's path relative to the tree being mirrored.
/// Recoverable failures are recorded; the original bytes are then copied
/// unchanged so the destination still holds every source file.
pub fn copy_or_extract_file(
    src_file: &Path,
    dest_root: &Path,
    rel: &Path,
    ctx: &ExtractionContext,
) -> Result<()> {
    ctx.check_interrupt()?;

    let kind = classify(src_file);
    debug!("{} -> {}", rel.display(), kind);

    match dispatch(src_file, dest_root, rel, kind, ctx) {
        Err(e) if e.is_recoverable() => {
            ctx.record_failure(src_file, &e);
            copy_plain(src_file, dest_root, rel, ctx, true)
        }
        other => other,
    }
}

fn dispatch(
    src_file: &Path,
    dest_root: &Path,
    rel: &Path,
    kind: ExtractionKind,
    ctx: &ExtractionContext,
) -> Result<()> {
    let stats = ctx.stats();

    match kind {
        ExtractionKind::Plain => copy_plain(src_file, dest_root, rel, ctx, false),
        ExtractionKind::SingleCompressed => {
            // Drop only the final suffix: report.txt.gz -> report.txt
            let dest = ctx.claims().claim(&dest_root.join(rel.with_extension("")));
            let bytes = decompress(src_file, &dest, ctx.budget())?;
            RunStats::add(&stats.files_decompressed, 1);
            RunStats::add(&stats.bytes_written, bytes);
            Ok(())
        }
        ExtractionKind::MultiArchive => {
            match extract_multi(src_file, dest_root, rel, ctx)? {
                MultiOutcome::Extracted { .. } => {
                    RunStats::add(&stats.archives_extracted, 1);
                }
                MultiOutcome::CopiedVerbatim { dest, bytes } => {
                    ctx.mark_inert(&dest);
                    RunStats::add(&stats.files_copied, 1);
                    RunStats::add(&stats.bytes_written, bytes);
                }
                MultiOutcome::LeftInPlace => {}
            }
            Ok(())
        }
    }
}

fn copy_plain(
    src_file: &Path,
    dest_root: &Path,
    rel: &Path,
    ctx: &ExtractionContext,
    inert: bool,
) -> Result<()> {
    let dest = ctx.claims().claim(&dest_root.join(rel));
    let bytes = copy_file(src_file, &dest)?;
    if inert {
        ctx.mark_inert(&dest);
    }

    let stats = ctx.stats();
    RunStats::add(&stats.files_copied, 1);
    RunStats::add(&stats.bytes_written, bytes);
    Ok(())
}
