// src/archive/zip.rs

//! Zip archives

use super::{EntryKind, RawEntry};
use crate::error::{Error, Result};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use zip::ZipArchive;
use zip::result::ZipError;

const S_IFMT: u32 = 0o170000;
const S_IFLNK: u32 = 0o120000;

/// Local file header, empty archive and spanned archive signatures
const ZIP_MAGIC: &[&[u8]] = &[b"PK\x03\x04", b"PK\x05\x06", b"PK\x07\x08"];

/// Whether the leading bytes of a file carry a zip signature
pub fn has_zip_magic(data: &[u8]) -> bool {
    ZIP_MAGIC.iter().any(|magic| data.starts_with(magic))
}

/// Whether the file ends in a readable zip central directory
///
/// Catches archives whose leading bytes are something else, such as a
/// self-extracting stub.
pub fn has_central_directory(path: &Path) -> bool {
    File::open(path)
        .map(|file| ZipArchive::new(BufReader::new(file)).is_ok())
        .unwrap_or(false)
}

fn open(path: &Path) -> Result<ZipArchive<BufReader<File>>> {
    let file = File::open(path)?;
    ZipArchive::new(BufReader::new(file)).map_err(|e| archive_error(path, e))
}

fn archive_error(path: &Path, err: ZipError) -> Error {
    Error::Archive {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

/// List every entry of a zip archive from its central directory
pub fn list_entries(path: &Path) -> Result<Vec<RawEntry>> {
    let mut archive = open(path)?;
    let mut listed = Vec::with_capacity(archive.len());

    for index in 0..archive.len() {
        // Raw access reads metadata without requiring a decryption key
        let file = archive
            .by_index_raw(index)
            .map_err(|e| archive_error(path, e))?;

        let is_symlink = file
            .unix_mode()
            .is_some_and(|mode| mode & S_IFMT == S_IFLNK);

        let kind = if is_symlink {
            EntryKind::Link
        } else if file.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        };

        listed.push(RawEntry {
            name: file.name().to_string(),
            kind,
        });
    }

    Ok(listed)
}

/// Open each entry in central-directory order and hand it to `visit`
///
/// Entries for which `wanted` returns false are not opened, so a skipped
/// encrypted or unsupported entry does not fail the archive.
pub fn for_each_entry<W, F>(path: &Path, wanted: W, mut visit: F) -> Result<()>
where
    W: Fn(usize) -> bool,
    F: FnMut(usize, &mut dyn Read) -> Result<()>,
{
    let mut archive = open(path)?;

    for index in 0..archive.len() {
        if !wanted(index) {
            continue;
        }
        let mut file = archive
            .by_index(index)
            .map_err(|e| archive_error(path, e))?;
        visit(index, &mut file)?;
    }

    Ok(())
}
