// src/filesystem/claims.rs

//! Collision-free destination naming
//!
//! Every output file of a run reserves its path here before writing. If the
//! path already exists on disk, or another worker has reserved it, a numbered
//! sibling is chosen instead (`report.txt` -> `report-1.txt`). The counter
//! goes before the first `.` so `a.tar.gz` becomes `a-1.tar.gz` and is still
//! recognised as an archive.
//!
//! Directories are claimed separately: an existing directory, or one another
//! worker already claimed as a directory, is shared rather than renamed.

use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::warn;

#[derive(Debug, Default)]
struct Reserved {
    files: HashSet<PathBuf>,
    dirs: HashSet<PathBuf>,
}

impl Reserved {
    fn file_is_free(&self, candidate: &Path) -> bool {
        !self.files.contains(candidate) && !self.dirs.contains(candidate) && !candidate.exists()
    }

    fn dir_is_usable(&self, candidate: &Path) -> bool {
        if self.dirs.contains(candidate) {
            return true;
        }
        !self.files.contains(candidate) && (candidate.is_dir() || !candidate.exists())
    }
}

/// Run-wide registry of reserved output paths
#[derive(Debug, Default)]
pub struct DestinationClaims {
    reserved: Mutex<Reserved>,
}

impl DestinationClaims {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `wanted`, or the first free numbered sibling of it
    pub fn claim(&self, wanted: &Path) -> PathBuf {
        let mut reserved = self.lock();
        let claimed = first_matching(wanted, |candidate| reserved.file_is_free(candidate));
        reserved.files.insert(claimed.clone());
        claimed
    }

    /// Reserve `wanted` as a directory
    ///
    /// An existing directory (or one already claimed as a directory) is
    /// returned unchanged so several archives can merge into it. If a file
    /// holds the name, on disk or by reservation, the first usable numbered
    /// sibling is returned instead.
    pub fn claim_dir(&self, wanted: &Path) -> PathBuf {
        let mut reserved = self.lock();
        let claimed = first_matching(wanted, |candidate| reserved.dir_is_usable(candidate));
        reserved.dirs.insert(claimed.clone());
        claimed
    }

    /// Number of paths reserved so far
    pub fn len(&self) -> usize {
        let reserved = self.lock();
        reserved.files.len() + reserved.dirs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Reserved> {
        self.reserved
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// `wanted` if it passes `accept`, else its first numbered sibling that does
fn first_matching(wanted: &Path, mut accept: impl FnMut(&Path) -> bool) -> PathBuf {
    if accept(wanted) {
        return wanted.to_path_buf();
    }

    let mut counter = 1u32;
    loop {
        let candidate = numbered_sibling(wanted, counter);
        if accept(&candidate) {
            warn!(
                "Destination {} already exists, writing {} instead",
                wanted.display(),
                candidate.display()
            );
            return candidate;
        }
        counter += 1;
    }
}

/// Insert `-N` before the first `.` of the file name
///
/// A leading dot (hidden file) is not treated as the split point.
pub fn numbered_sibling(path: &Path, counter: u32) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let split = name
        .char_indices()
        .skip(1)
        .find(|&(_, c)| c == '.')
        .map(|(i, _)| i)
        .unwrap_or(name.len());

    let (stem, rest) = name.split_at(split);
    let renamed: OsString = format!("{}-{}{}", stem, counter, rest).into();
    path.with_file_name(renamed)
}
