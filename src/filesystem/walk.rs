// src/filesystem/walk.rs

//! Ignore-aware directory walks
//!
//! Walks never follow symlinks and never yield them. Ignore patterns are
//! matched against directory paths relative to the walk root, so a pattern
//! that happens to occur in the root's own absolute path prunes nothing.

use super::IgnoreSet;
use crate::error::Result;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

/// Regular files below `root`, in a stable order
#[derive(Debug)]
pub struct FileWalk<'a> {
    root: &'a Path,
    ignore: &'a IgnoreSet,
    exclude: Option<PathBuf>,
}

impl<'a> FileWalk<'a> {
    pub fn new(root: &'a Path, ignore: &'a IgnoreSet) -> Self {
        Self {
            root,
            ignore,
            exclude: None,
        }
    }

    /// Skip one directory entirely (used when the destination sits inside
    /// the source)
    pub fn exclude(mut self, dir: impl Into<PathBuf>) -> Self {
        self.exclude = Some(dir.into());
        self
    }

    fn is_pruned(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return false;
        }
        if self.exclude.as_deref() == Some(entry.path()) {
            return true;
        }

        let relative = entry.path().strip_prefix(self.root).unwrap_or(entry.path());
        if self.ignore.matches(relative) {
            debug!("Ignoring directory {}", entry.path().display());
            return true;
        }
        false
    }

    /// Collect every regular file, sorted by path
    pub fn collect(self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        let walker = WalkDir::new(self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !self.is_pruned(entry));

        for entry in walker {
            let entry = entry?;
            let file_type = entry.file_type();

            if file_type.is_file() {
                files.push(entry.into_path());
            } else if file_type.is_symlink() {
                debug!("Not following symlink {}", entry.path().display());
            }
        }

        Ok(files)
    }
}
