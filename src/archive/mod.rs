// src/archive/mod.rs

//! Multi-entry archive extraction
//!
//! An archive at `dest_root/<rel>` (or anywhere in the source tree, mirrored
//! to `<rel>`) is unpacked into `dest_root/<rel minus archive suffix>`.
//! Extraction happens in two phases:
//!
//! 1. **Plan**: every entry name is read and resolved against the target
//!    directory. One escaping entry fails the whole archive before anything
//!    is written. The flattening decision is made here too.
//! 2. **Write**: directories are created, then file entries are streamed to
//!    their destinations through atomic writes, charged to the run budget.
//!
//! Format is decided by content (zip signature, then tar header with
//! gzip/bzip2/xz autodetection), never by name. Content that is neither is
//! copied through unchanged.
//!
//! Link entries (symlinks, hard links) and device nodes are never
//! reproduced on disk; they are counted as skipped.

pub mod tar;
pub mod zip;

use crate::budget::copy_with_budget;
use crate::classify::COMPOUND_SUFFIXES;
use crate::compression::{CompressionFormat, read_magic};
use crate::error::{Error, Result};
use crate::filesystem::path::{first_segment, is_physically_within, resolve_within};
use crate::filesystem::{copy_file, write_atomic};
use crate::normalize::context::{ExtractionContext, RunStats};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// macOS resource-fork directory found in zips made by Finder
const MACOS_METADATA_DIR: &str = "__MACOSX";

/// Container format, determined from content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    /// Tar stream with its wrapping compression
    Tar(CompressionFormat),
}

impl ArchiveFormat {
    /// Sniff a file's content for a supported container
    ///
    /// Zip wins over tar. A zip is recognised by its leading signature or,
    /// failing that, by a readable central directory, which also covers
    /// self-extracting stubs. Returns `None` for anything else, including
    /// unreadable files.
    pub fn sniff(path: &Path) -> Option<Self> {
        let magic = read_magic(path).ok()?;
        if zip::has_zip_magic(&magic) || zip::has_central_directory(path) {
            return Some(Self::Zip);
        }
        self::tar::sniff(path).ok().flatten().map(Self::Tar)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::Tar(CompressionFormat::None) => "tar",
            Self::Tar(CompressionFormat::Gzip) => "tar+gzip",
            Self::Tar(CompressionFormat::Bzip2) => "tar+bzip2",
            Self::Tar(CompressionFormat::Xz) => "tar+xz",
            Self::Tar(CompressionFormat::Lzma) => "tar+lzma",
        }
    }
}

impl std::fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Entry type as reported by the archive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    /// Symbolic or hard link
    Link,
    /// Device node, fifo and similar
    Special,
    /// Format bookkeeping (pax headers, GNU long names); not a member
    Metadata,
}

/// An archive entry exactly as named inside the archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub name: String,
    pub kind: EntryKind,
}

/// A validated entry: its path relative to the extraction root
#[derive(Debug, Clone, PartialEq, Eq)]
struct PlannedEntry {
    relative: PathBuf,
    kind: EntryKind,
}

/// Where and what to extract, decided before any write
#[derive(Debug)]
struct ExtractionPlan {
    /// Directory entries are resolved against
    root: PathBuf,
    flattened: bool,
    /// Indexed like the archive's entries; `None` entries are not extracted
    entries: Vec<Option<PlannedEntry>>,
}

/// Counts for one extracted archive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractStats {
    pub entries: u64,
    pub skipped: u64,
    pub bytes: u64,
}

/// Result of [`extract_multi`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultiOutcome {
    /// Entries were unpacked below `root`
    Extracted { root: PathBuf, stats: ExtractStats },
    /// Not an archive after all; copied unchanged to its mirrored path
    CopiedVerbatim { dest: PathBuf, bytes: u64 },
    /// Not an archive after all, and already at its mirrored path
    LeftInPlace,
}

/// Strip the archive suffix from a relative path
///
/// The longest compound suffix (`.tar.gz`, `.tgz`, ...) is removed if one
/// matches, otherwise only the final extension.
///
/// # Examples
///
/// ```
/// use unnest::archive::strip_archive_suffix;
/// use std::path::{Path, PathBuf};
///
/// assert_eq!(strip_archive_suffix(Path::new("a/src.tar.gz")), PathBuf::from("a/src"));
/// assert_eq!(strip_archive_suffix(Path::new("bundle.zip")), PathBuf::from("bundle"));
/// assert_eq!(strip_archive_suffix(Path::new("v1.2.tgz")), PathBuf::from("v1.2"));
/// ```
pub fn strip_archive_suffix(rel: &Path) -> PathBuf {
    let Some(name) = rel.file_name().map(|n| n.to_string_lossy().into_owned()) else {
        return rel.to_path_buf();
    };
    let lower = name.to_ascii_lowercase();

    let longest = COMPOUND_SUFFIXES
        .iter()
        .filter(|suffix| lower.ends_with(*suffix) && lower.len() > suffix.len())
        .max_by_key(|suffix| suffix.len());

    match longest {
        Some(suffix) => rel.with_file_name(&name[..name.len() - suffix.len()]),
        None => rel.with_extension(""),
    }
}

/// Validate entry names and decide the extraction root
fn plan(archive: &Path, target_dir: &Path, raw: Vec<RawEntry>) -> Result<ExtractionPlan> {
    let mut entries = Vec::with_capacity(raw.len());

    for entry in raw {
        if entry.kind == EntryKind::Metadata {
            entries.push(None);
            continue;
        }

        let relative = resolve_within(&entry.name).ok_or_else(|| Error::PathTraversal {
            archive: archive.to_path_buf(),
            entry: entry.name.clone(),
        })?;

        let is_metadata_dir =
            first_segment(&relative).is_some_and(|segment| segment == MACOS_METADATA_DIR);
        if relative.as_os_str().is_empty() || is_metadata_dir {
            entries.push(None);
            continue;
        }

        let kind = if entry.kind == EntryKind::File && entry.name.ends_with('/') {
            EntryKind::Directory
        } else {
            entry.kind
        };
        entries.push(Some(PlannedEntry { relative, kind }));
    }

    let flattened = should_flatten(target_dir, entries.iter().flatten());
    let root = match (flattened, target_dir.parent()) {
        (true, Some(parent)) => parent.to_path_buf(),
        _ => target_dir.to_path_buf(),
    };

    Ok(ExtractionPlan {
        root,
        flattened,
        entries,
    })
}

/// Whether the archive wraps everything in one directory named like the target
fn should_flatten<'a>(
    target_dir: &Path,
    entries: impl Iterator<Item = &'a PlannedEntry> + Clone,
) -> bool {
    let Some(base_name) = target_dir.file_name().map(|n| n.to_string_lossy().into_owned())
    else {
        return false;
    };

    let top_levels: BTreeSet<String> = entries
        .clone()
        .filter_map(|entry| first_segment(&entry.relative))
        .collect();
    if top_levels.len() != 1 || !top_levels.contains(&base_name) {
        return false;
    }

    // A lone top-level file is not a wrapping directory
    entries.into_iter().all(|entry| {
        entry.relative.components().count() > 1 || entry.kind == EntryKind::Directory
    })
}

fn list_entries(src: &Path, format: ArchiveFormat) -> Result<Vec<RawEntry>> {
    match format {
        ArchiveFormat::Zip => zip::list_entries(src),
        ArchiveFormat::Tar(compression) => self::tar::list_entries(src, compression),
    }
}

/// Extract a multi-entry archive
///
/// `rel` is the archive's path relative to the tree being mirrored; the
/// target directory is `dest_root/<rel minus archive suffix>`. If the archive
/// holds exactly one top-level directory whose name equals the target's
/// base name, entries are unpacked into the target's parent instead so the
/// directory is not doubled (`example.zip` with `example/a.txt` yields
/// `example/a.txt`).
///
/// Errors: `PathTraversal` if any entry escapes the target directory (no
/// entry is written), `Archive`/`Decompression` for an unreadable body.
pub fn extract_multi(
    src: &Path,
    dest_root: &Path,
    rel: &Path,
    ctx: &ExtractionContext,
) -> Result<MultiOutcome> {
    let Some(format) = ArchiveFormat::sniff(src) else {
        return fallback_copy(src, dest_root, rel, ctx);
    };

    let target_dir = ctx
        .claims()
        .claim_dir(&dest_root.join(strip_archive_suffix(rel)));

    let raw = list_entries(src, format)?;
    let plan = plan(src, &target_dir, raw)?;

    debug!(
        "Extracting {} ({}) into {}{}",
        src.display(),
        format,
        plan.root.display(),
        if plan.flattened { " (flattened)" } else { "" }
    );

    fs::create_dir_all(&plan.root)?;

    let stats = write_entries(src, format, &plan, ctx)?;

    info!(
        "Extracted {} entries from {}",
        stats.entries,
        src.display()
    );
    Ok(MultiOutcome::Extracted {
        root: plan.root,
        stats,
    })
}

/// Copy a misclassified file to its mirrored path
fn fallback_copy(
    src: &Path,
    dest_root: &Path,
    rel: &Path,
    ctx: &ExtractionContext,
) -> Result<MultiOutcome> {
    let dest = dest_root.join(rel);
    if dest == src {
        debug!("{} is not an archive, leaving it in place", src.display());
        return Ok(MultiOutcome::LeftInPlace);
    }

    warn!(
        "{} is named like an archive but is not one, copying it unchanged",
        src.display()
    );
    let dest = ctx.claims().claim(&dest);
    let bytes = copy_file(src, &dest)?;
    Ok(MultiOutcome::CopiedVerbatim { dest, bytes })
}

/// Phase two: create directories, then stream file entries
fn write_entries(
    src: &Path,
    format: ArchiveFormat,
    plan: &ExtractionPlan,
    ctx: &ExtractionContext,
) -> Result<ExtractStats> {
    let canonical_root = plan.root.canonicalize()?;
    let mut stats = ExtractStats::default();
    let mut dirs = DirectoryClaims::new(&plan.root);

    for entry in plan.entries.iter().flatten() {
        match entry.kind {
            EntryKind::Directory => {
                let dir = dirs.resolve(&entry.relative, ctx);
                fs::create_dir_all(&dir)?;
                if !dir.canonicalize()?.starts_with(&canonical_root) {
                    return Err(traversal(src, &entry.relative));
                }
            }
            EntryKind::Link | EntryKind::Special => {
                warn!(
                    "Skipping link or special entry {} in {}",
                    entry.relative.display(),
                    src.display()
                );
                stats.skipped += 1;
            }
            EntryKind::File | EntryKind::Metadata => {}
        }
    }

    // Duplicate names within one archive overwrite each other
    let mut destinations: HashMap<PathBuf, PathBuf> = HashMap::new();

    let mut write_one = |index: usize, reader: &mut dyn Read| -> Result<()> {
        let Some(Some(entry)) = plan.entries.get(index) else {
            return Ok(());
        };
        if entry.kind != EntryKind::File {
            return Ok(());
        }
        ctx.check_interrupt()?;

        let parent = entry.relative.parent().unwrap_or(Path::new(""));
        let Some(file_name) = entry.relative.file_name() else {
            return Ok(());
        };
        let wanted = dirs.resolve(parent, ctx).join(file_name);
        let dest = destinations
            .entry(wanted.clone())
            .or_insert_with(|| ctx.claims().claim(&wanted))
            .clone();

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        if !is_physically_within(&canonical_root, &dest)? {
            return Err(traversal(src, &entry.relative));
        }

        let bytes = write_atomic(&dest, |file| {
            copy_with_budget(reader, file, ctx.budget(), src)
        })?;

        stats.entries += 1;
        stats.bytes += bytes;
        Ok(())
    };

    match format {
        ArchiveFormat::Zip => {
            let wanted = |index: usize| {
                matches!(
                    plan.entries.get(index),
                    Some(Some(PlannedEntry {
                        kind: EntryKind::File,
                        ..
                    }))
                )
            };
            zip::for_each_entry(src, wanted, &mut write_one)?;
        }
        ArchiveFormat::Tar(compression) => {
            self::tar::for_each_entry(src, compression, &mut write_one)?;
        }
    }

    let counters = ctx.stats();
    RunStats::add(&counters.entries_extracted, stats.entries);
    RunStats::add(&counters.skipped_entries, stats.skipped);
    RunStats::add(&counters.bytes_written, stats.bytes);

    Ok(stats)
}

/// Directory components of one archive, mapped onto the destination
///
/// A component whose name is held by a file gets a numbered sibling, and
/// every later entry below it follows the same renamed directory.
struct DirectoryClaims<'a> {
    root: &'a Path,
    resolved: HashMap<PathBuf, PathBuf>,
}

impl<'a> DirectoryClaims<'a> {
    fn new(root: &'a Path) -> Self {
        Self {
            root,
            resolved: HashMap::new(),
        }
    }

    /// On-disk directory for `relative`, claiming each component on first use
    fn resolve(&mut self, relative: &Path, ctx: &ExtractionContext) -> PathBuf {
        let mut current = self.root.to_path_buf();
        let mut logical = PathBuf::new();
        for component in relative.components() {
            logical.push(component);
            current = match self.resolved.get(&logical) {
                Some(dir) => dir.clone(),
                None => {
                    let dir = ctx.claims().claim_dir(&current.join(component));
                    self.resolved.insert(logical.clone(), dir.clone());
                    dir
                }
            };
        }
        current
    }
}

fn traversal(archive: &Path, entry: &Path) -> Error {
    Error::PathTraversal {
        archive: archive.to_path_buf(),
        entry: entry.display().to_string(),
    }
}
