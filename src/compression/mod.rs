// src/compression/mod.rs
//! Single-stream compression formats
//!
//! Gzip, bzip2, xz and legacy lzma each wrap exactly one byte stream. This
//! module detects them (magic bytes first, file suffix as fallback), builds
//! streaming decoders, and decodes one compressed file into one output file.

use crate::budget::{ByteBudget, copy_with_budget};
use crate::error::{Error, Result};
use crate::filesystem::write_atomic;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use tracing::debug;

/// Number of leading bytes needed to recognise any supported format
pub const MAGIC_LEN: usize = 6;

/// Supported single-stream compression formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionFormat {
    /// No compression (raw data)
    None,
    /// Gzip compression (.gz)
    Gzip,
    /// Bzip2 compression (.bz2)
    Bzip2,
    /// XZ compression (.xz)
    Xz,
    /// Legacy LZMA-alone compression (.lzma)
    Lzma,
}

impl CompressionFormat {
    /// Detect compression format from the final file suffix
    ///
    /// # Examples
    /// ```
    /// use unnest::compression::CompressionFormat;
    ///
    /// assert_eq!(CompressionFormat::from_extension("report.txt.gz"), CompressionFormat::Gzip);
    /// assert_eq!(CompressionFormat::from_extension("dump.sql.BZ2"), CompressionFormat::Bzip2);
    /// assert_eq!(CompressionFormat::from_extension("log.xz"), CompressionFormat::Xz);
    /// assert_eq!(CompressionFormat::from_extension("data.tar"), CompressionFormat::None);
    /// ```
    pub fn from_extension(path: impl AsRef<Path>) -> Self {
        let ext = path
            .as_ref()
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase());

        match ext.as_deref() {
            Some("gz") => Self::Gzip,
            Some("bz2") => Self::Bzip2,
            Some("xz") => Self::Xz,
            Some("lzma") => Self::Lzma,
            _ => Self::None,
        }
    }

    /// Detect compression format from magic bytes
    ///
    /// Magic bytes:
    /// - Gzip: `1f 8b`
    /// - Bzip2: `42 5a 68` ("BZh")
    /// - XZ: `fd 37 7a 58 5a 00` (FD + "7zXZ" + NUL)
    /// - LZMA-alone: `5d 00 00` (default properties byte, small dictionary)
    pub fn from_magic_bytes(data: &[u8]) -> Self {
        if data.starts_with(&[0x1f, 0x8b]) {
            Self::Gzip
        } else if data.starts_with(b"BZh") {
            Self::Bzip2
        } else if data.starts_with(&[0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00]) {
            Self::Xz
        } else if data.starts_with(&[0x5d, 0x00, 0x00]) {
            Self::Lzma
        } else {
            Self::None
        }
    }

    /// Get a human-readable name for this format
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Gzip => "gzip",
            Self::Bzip2 => "bzip2",
            Self::Xz => "xz",
            Self::Lzma => "lzma",
        }
    }
}

impl std::fmt::Display for CompressionFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Read up to [`MAGIC_LEN`] leading bytes of a file
///
/// Short files return fewer bytes; an empty file returns an empty vector.
pub fn read_magic(path: &Path) -> io::Result<Vec<u8>> {
    let mut file = File::open(path)?;
    let mut magic = Vec::with_capacity(MAGIC_LEN);
    file.by_ref().take(MAGIC_LEN as u64).read_to_end(&mut magic)?;
    Ok(magic)
}

/// Determine the format of a compressed file
///
/// Content wins over the name. The suffix is only consulted when the leading
/// bytes match nothing (including empty or unreadable files).
pub fn detect(path: &Path) -> CompressionFormat {
    let sniffed = read_magic(path)
        .map(|magic| CompressionFormat::from_magic_bytes(&magic))
        .unwrap_or(CompressionFormat::None);

    if sniffed != CompressionFormat::None {
        return sniffed;
    }
    CompressionFormat::from_extension(path)
}

/// Create a decompressing reader for the given format
///
/// Returns a boxed `Read` implementation that decompresses data on the fly.
/// For `CompressionFormat::None`, returns the reader unchanged. Concatenated
/// gzip members, bzip2 streams and xz streams are all decoded.
///
/// # Example
/// ```no_run
/// use unnest::compression::{CompressionFormat, create_decoder};
/// use std::io::Read;
///
/// let compressed_data: &[u8] = &[/* gzip data */];
/// let mut decoder = create_decoder(compressed_data, CompressionFormat::Gzip)?;
/// let mut output = Vec::new();
/// decoder.read_to_end(&mut output)?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn create_decoder<'a, R: Read + 'a>(
    reader: R,
    format: CompressionFormat,
) -> io::Result<Box<dyn Read + 'a>> {
    match format {
        CompressionFormat::None => Ok(Box::new(reader)),
        CompressionFormat::Gzip => Ok(Box::new(flate2::read::MultiGzDecoder::new(reader))),
        CompressionFormat::Bzip2 => Ok(Box::new(bzip2::read::MultiBzDecoder::new(reader))),
        CompressionFormat::Xz | CompressionFormat::Lzma => {
            // The auto decoder accepts both the xz container and lzma-alone
            let stream =
                xz2::stream::Stream::new_auto_decoder(u64::MAX, xz2::stream::CONCATENATED)
                    .map_err(io::Error::other)?;
            Ok(Box::new(xz2::read::XzDecoder::new_stream(reader, stream)))
        }
    }
}

/// Decompress `src` into `dest`
///
/// Missing parent directories of `dest` are created. The output appears only
/// once the whole stream decoded successfully. Returns the number of bytes
/// written.
pub fn decompress(src: &Path, dest: &Path, budget: &ByteBudget) -> Result<u64> {
    let format = detect(src);
    if format == CompressionFormat::None {
        return Err(Error::UnsupportedCompression(src.to_path_buf()));
    }

    debug!(
        "Decompressing {} ({}) to {}",
        src.display(),
        format,
        dest.display()
    );

    let input = BufReader::new(File::open(src)?);
    let mut decoder = create_decoder(input, format).map_err(|e| Error::Decompression {
        path: src.to_path_buf(),
        source: e,
    })?;

    write_atomic(dest, |file| {
        copy_with_budget(&mut decoder, file, budget, src)
    })
}
