// src/archive/tar.rs

//! Tar archives, optionally wrapped in gzip, bzip2 or xz
//!
//! Tar is a stream format: listing reads every header once, extraction
//! re-opens the file and walks the same stream a second time. Entry indices
//! are positions in that stream and line up between the two passes.

use super::{EntryKind, RawEntry};
use crate::compression::{CompressionFormat, create_decoder, read_magic};
use crate::error::{Error, Result};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use tar::{Archive, EntryType};

/// Tar block size
pub const BLOCK_SIZE: usize = 512;

/// Offset and length of the header checksum field
const CHECKSUM_OFFSET: usize = 148;
const CHECKSUM_LEN: usize = 8;

/// Check whether a 512-byte block is a valid tar header
///
/// The stored checksum must match the unsigned byte sum of the block with
/// the checksum field itself counted as spaces. An all-zero block (the
/// end-of-archive marker) is not a header.
pub fn is_tar_header(block: &[u8]) -> bool {
    let Some(block) = block.get(..BLOCK_SIZE) else {
        return false;
    };
    if block.iter().all(|&b| b == 0) {
        return false;
    }

    let field = &block[CHECKSUM_OFFSET..CHECKSUM_OFFSET + CHECKSUM_LEN];
    let Some(stored) = parse_octal(field) else {
        return false;
    };

    let computed: u64 = block
        .iter()
        .enumerate()
        .map(|(i, &b)| {
            if (CHECKSUM_OFFSET..CHECKSUM_OFFSET + CHECKSUM_LEN).contains(&i) {
                u64::from(b' ')
            } else {
                u64::from(b)
            }
        })
        .sum();

    stored == computed
}

/// Parse a NUL- or space-terminated octal header field
fn parse_octal(field: &[u8]) -> Option<u64> {
    let start = field.iter().position(|&b| b != b' ')?;
    let digits = &field[start..];
    let end = digits
        .iter()
        .position(|b| !(b'0'..=b'7').contains(b))
        .unwrap_or(digits.len());

    if end == 0 || !digits[end..].iter().all(|&b| b == 0 || b == b' ') {
        return None;
    }

    digits[..end].iter().try_fold(0u64, |acc, &d| {
        acc.checked_mul(8)?.checked_add(u64::from(d - b'0'))
    })
}

/// Sniff a file for tar content
///
/// Returns the wrapping compression (`CompressionFormat::None` for a bare
/// tar) when the first decoded block is a valid tar header, `None` otherwise.
/// A stream that fails to decode is not tar.
pub fn sniff(path: &Path) -> io::Result<Option<CompressionFormat>> {
    let magic = read_magic(path)?;
    let compression = CompressionFormat::from_magic_bytes(&magic);

    let file = File::open(path)?;
    let decoder = create_decoder(BufReader::new(file), compression)?;

    let mut block = Vec::with_capacity(BLOCK_SIZE);
    if decoder
        .take(BLOCK_SIZE as u64)
        .read_to_end(&mut block)
        .is_err()
    {
        return Ok(None);
    }

    Ok(is_tar_header(&block).then_some(compression))
}

/// Whether a file is a (possibly compressed) tar stream
pub fn sniff_tar(path: &Path) -> io::Result<bool> {
    Ok(sniff(path)?.is_some())
}

fn open(path: &Path, compression: CompressionFormat) -> Result<Archive<Box<dyn Read>>> {
    let file = File::open(path)?;
    let decoder =
        create_decoder(BufReader::new(file), compression).map_err(|e| Error::Decompression {
            path: path.to_path_buf(),
            source: e,
        })?;
    Ok(Archive::new(decoder))
}

fn archive_error(path: &Path, err: io::Error) -> Error {
    Error::Archive {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

fn entry_kind(entry_type: EntryType) -> EntryKind {
    if entry_type.is_dir() {
        EntryKind::Directory
    } else if entry_type.is_file() || entry_type.is_contiguous() || entry_type.is_gnu_sparse() {
        EntryKind::File
    } else if entry_type.is_symlink() || entry_type.is_hard_link() {
        EntryKind::Link
    } else if entry_type.is_pax_global_extensions()
        || entry_type.is_pax_local_extensions()
        || entry_type.is_gnu_longname()
        || entry_type.is_gnu_longlink()
    {
        EntryKind::Metadata
    } else {
        EntryKind::Special
    }
}

/// List every entry of a tar stream without extracting anything
pub fn list_entries(path: &Path, compression: CompressionFormat) -> Result<Vec<RawEntry>> {
    let mut archive = open(path, compression)?;
    let mut listed = Vec::new();

    for entry in archive.entries().map_err(|e| archive_error(path, e))? {
        let entry = entry.map_err(|e| archive_error(path, e))?;
        let name = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
        listed.push(RawEntry {
            name,
            kind: entry_kind(entry.header().entry_type()),
        });
    }

    Ok(listed)
}

/// Walk the stream again, handing each entry's content to `visit`
pub fn for_each_entry<F>(path: &Path, compression: CompressionFormat, mut visit: F) -> Result<()>
where
    F: FnMut(usize, &mut dyn Read) -> Result<()>,
{
    let mut archive = open(path, compression)?;

    for (index, entry) in archive
        .entries()
        .map_err(|e| archive_error(path, e))?
        .enumerate()
    {
        let mut entry = entry.map_err(|e| archive_error(path, e))?;
        visit(index, &mut entry)?;
    }

    Ok(())
}
