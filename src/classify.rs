// src/classify.rs

//! File classification
//!
//! Decides, per file and per visit, whether a file is a multi-entry archive,
//! a single compressed stream, or an ordinary file. Decisions are made from
//! the file name first. Content is only read for extensionless, hash-named
//! files, which container image layers commonly are.
//!
//! Check order:
//! 1. compound tar suffixes (`.tar.gz`, `.tgz`, ...), `.zip`, `.tar`
//! 2. `.gz` (multi-entry unless a base extension precedes it)
//! 3. `.bz2`, `.xz`, `.lzma`
//! 4. hash-named file whose content parses as a tar stream

use crate::archive::tar::sniff_tar;
use std::fmt;
use std::path::Path;

/// Suffixes of compressed tarballs, longest first where they overlap
pub const COMPOUND_SUFFIXES: &[&str] = &[".tar.gz", ".tgz", ".tar.bz2", ".tbz2", ".tar.xz", ".txz"];

/// Suffixes of plain multi-entry archives
const ARCHIVE_SUFFIXES: &[&str] = &[".zip", ".tar"];

/// Suffixes that always mean a single compressed stream
const SINGLE_STREAM_SUFFIXES: &[&str] = &[".bz2", ".xz", ".lzma"];

/// Length bounds for hash-named layers (MD5 hex up to SHA-512 hex)
const HASH_NAME_MIN: usize = 32;
const HASH_NAME_MAX: usize = 128;

/// How a file must be processed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtractionKind {
    /// Ordinary file, copied as is
    Plain,
    /// One compressed stream, decoded to one file
    SingleCompressed,
    /// Container of entries, unpacked into a directory
    MultiArchive,
}

impl ExtractionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::SingleCompressed => "single-compressed",
            Self::MultiArchive => "multi-archive",
        }
    }

    /// Whether processing this file changes the tree
    pub fn needs_extraction(&self) -> bool {
        !matches!(self, Self::Plain)
    }
}

impl fmt::Display for ExtractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Classify a file
///
/// Suffix checks are case-insensitive. Only the hash-named case touches the
/// file's content; a file that cannot be read there is `Plain`.
///
/// # Examples
///
/// ```
/// use unnest::classify::{classify, ExtractionKind};
/// use std::path::Path;
///
/// assert_eq!(classify(Path::new("src.tar.gz")), ExtractionKind::MultiArchive);
/// assert_eq!(classify(Path::new("payload.gz")), ExtractionKind::MultiArchive);
/// assert_eq!(classify(Path::new("report.txt.gz")), ExtractionKind::SingleCompressed);
/// assert_eq!(classify(Path::new("notes.txt")), ExtractionKind::Plain);
/// ```
pub fn classify(path: &Path) -> ExtractionKind {
    let Some(original) = path.file_name().map(|n| n.to_string_lossy()) else {
        return ExtractionKind::Plain;
    };
    let name = original.to_ascii_lowercase();

    if COMPOUND_SUFFIXES.iter().any(|s| name.ends_with(s))
        || ARCHIVE_SUFFIXES.iter().any(|s| name.ends_with(s))
    {
        return ExtractionKind::MultiArchive;
    }

    if let Some(stem) = name.strip_suffix(".gz") {
        return if stem.contains('.') {
            ExtractionKind::SingleCompressed
        } else {
            ExtractionKind::MultiArchive
        };
    }

    if SINGLE_STREAM_SUFFIXES.iter().any(|s| name.ends_with(s)) {
        return ExtractionKind::SingleCompressed;
    }

    // Content-addressed layers carry no extension and a lowercase digest name
    if is_hash_name(&original) && sniff_tar(path).unwrap_or(false) {
        return ExtractionKind::MultiArchive;
    }

    ExtractionKind::Plain
}

/// Whether a file name looks like a lowercase hex digest
pub fn is_hash_name(name: &str) -> bool {
    (HASH_NAME_MIN..=HASH_NAME_MAX).contains(&name.len())
        && name.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
