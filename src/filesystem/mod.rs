// src/filesystem/mod.rs

//! Filesystem operations for the destination tree
//!
//! This module provides:
//! - Path containment checks for untrusted archive entry names
//! - Ignore patterns and ignore-aware walks for the copy and nested-scan phases
//! - Collision-free naming for output files
//! - Atomic file placement (write to a temporary sibling, then rename)
//! - Timestamp-preserving plain copies

pub mod claims;
pub mod ignore;
pub mod path;
pub mod walk;

pub use claims::DestinationClaims;
pub use ignore::IgnoreSet;
pub use walk::FileWalk;

use crate::error::{Error, Result};
use filetime::FileTime;
use std::fs::{self, File};
use std::io;
use std::path::Path;
use tracing::debug;

/// Write a file atomically
///
/// Parent directories are created as needed. `write` fills a temporary file
/// in the destination directory; on success it is renamed to `dest`
/// (replacing any existing file), on failure it is removed and `dest` is
/// left untouched. Returns whatever `write` returns.
pub fn write_atomic<T, F>(dest: &Path, write: F) -> Result<T>
where
    F: FnOnce(&mut File) -> Result<T>,
{
    let parent = dest
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;

    let mut temp = tempfile::Builder::new()
        .prefix(".unnest-")
        .tempfile_in(parent)?;

    let value = write(temp.as_file_mut())?;
    temp.as_file_mut().sync_data().ok();
    temp.persist(dest).map_err(|e| Error::Io(e.error))?;

    Ok(value)
}

/// Copy a file byte for byte, keeping its modification time
///
/// The copy is placed atomically. Failing to carry the timestamp over is not
/// an error. Returns the number of bytes copied.
pub fn copy_file(src: &Path, dest: &Path) -> Result<u64> {
    let mut input = File::open(src)?;
    let metadata = input.metadata()?;

    let bytes = write_atomic(dest, |file| Ok(io::copy(&mut input, file)?))?;

    let mtime = FileTime::from_last_modification_time(&metadata);
    if let Err(e) = filetime::set_file_mtime(dest, mtime) {
        debug!("Could not preserve mtime of {}: {}", dest.display(), e);
    }

    Ok(bytes)
}
