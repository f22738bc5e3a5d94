// src/inventory.rs

//! Inventory of a normalized tree
//!
//! After normalization every payload is a plain file. `FileInventory` walks
//! the tree once and records what is there (path, extension, size, and
//! whether the content is UTF-8 text) for downstream consumers. It is an
//! ordinary value: build one per tree and pass it along.

use crate::error::Result;
use crate::filesystem::{FileWalk, IgnoreSet};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// How a file's content decodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    Utf8,
    Binary,
}

impl Encoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Binary => "binary",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One file of the inventory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub path: PathBuf,
    /// Path relative to the scanned root
    pub relative: PathBuf,
    pub extension: String,
    pub size: u64,
    pub encoding: Encoding,
}

impl FileRecord {
    /// Read the file as text, replacing invalid UTF-8 sequences
    pub fn read_text(&self) -> io::Result<String> {
        let bytes = fs::read(&self.path)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Grouping key for a file name
///
/// A dot-file with a single dot is its own key (`.gitignore`). Otherwise the
/// final extension with its dot (`.rs`), or the whole name when there is no
/// extension (`makefile`). Always lowercase.
///
/// # Examples
///
/// ```
/// use unnest::inventory::file_extension;
/// use std::path::Path;
///
/// assert_eq!(file_extension(Path::new("src/Main.RS")), ".rs");
/// assert_eq!(file_extension(Path::new(".gitignore")), ".gitignore");
/// assert_eq!(file_extension(Path::new("Makefile")), "makefile");
/// ```
pub fn file_extension(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    if name.starts_with('.') && name.matches('.').count() == 1 {
        return name;
    }

    match Path::new(&name).extension() {
        Some(ext) => format!(".{}", ext.to_string_lossy()),
        None => name,
    }
}

/// Registry of every file in a tree
#[derive(Debug, Clone, Default)]
pub struct FileInventory {
    records: Vec<FileRecord>,
}

impl FileInventory {
    /// Walk `root` (honouring `ignore`) and record every regular file
    ///
    /// Files that cannot be read are logged and left out.
    pub fn scan(root: &Path, ignore: &IgnoreSet) -> Result<Self> {
        let files = FileWalk::new(root, ignore).collect()?;
        let mut records = Vec::with_capacity(files.len());

        for path in files {
            match fs::read(&path) {
                Ok(content) => {
                    let encoding = if std::str::from_utf8(&content).is_ok() {
                        Encoding::Utf8
                    } else {
                        Encoding::Binary
                    };
                    let relative = path.strip_prefix(root).unwrap_or(&path).to_path_buf();

                    records.push(FileRecord {
                        extension: file_extension(&path),
                        size: content.len() as u64,
                        encoding,
                        relative,
                        path,
                    });
                }
                Err(e) => warn!("Could not read {}: {}", path.display(), e),
            }
        }

        debug!("Inventoried {} files under {}", records.len(), root.display());
        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Look a file up by absolute or root-relative path
    pub fn get(&self, path: &Path) -> Option<&FileRecord> {
        self.records
            .iter()
            .find(|r| r.path == path || r.relative == path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileRecord> {
        self.records.iter()
    }

    /// Number of files per extension key, sorted by key
    pub fn extension_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.records {
            *counts.entry(record.extension.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Sum of all file sizes
    pub fn total_size(&self) -> u64 {
        self.records.iter().map(|r| r.size).sum()
    }
}

impl<'a> IntoIterator for &'a FileInventory {
    type Item = &'a FileRecord;
    type IntoIter = std::slice::Iter<'a, FileRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
