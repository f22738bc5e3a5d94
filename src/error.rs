// src/error.rs

//! Error types for archive normalization
//!
//! Errors fall into two groups. Recoverable errors describe a single bad
//! artifact (a corrupt stream, an unreadable archive body); the run records
//! them and moves on. Everything else aborts the run: a hostile archive,
//! a bad top-level path, an exhausted extraction budget, or a failure to
//! write into the destination tree.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the normalization engine
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to walk directory tree: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Unsupported compression: {0}")]
    UnsupportedCompression(PathBuf),

    #[error("Failed to decompress {path}: {source}")]
    Decompression { path: PathBuf, source: io::Error },

    #[error("Failed to read archive {path}: {message}")]
    Archive { path: PathBuf, message: String },

    #[error("Path traversal in archive {archive}: entry '{entry}' escapes the extraction directory")]
    PathTraversal { archive: PathBuf, entry: String },

    #[error("Source is neither a file nor a directory: {0}")]
    NotFileOrDirectory(PathBuf),

    #[error("Source {input} lies inside the destination {dest}")]
    SourceInsideDestination { input: PathBuf, dest: PathBuf },

    #[error("Possible archive bomb: {reason}")]
    PossibleArchiveBomb { reason: String },

    #[error("Extraction interrupted")]
    Interrupted,

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Whether the run may continue after this error
    ///
    /// Recoverable errors are tied to one input file. The caller records the
    /// failure, leaves the file where it is and continues with the rest of the
    /// tree.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Decompression { .. } | Self::Archive { .. } | Self::UnsupportedCompression(_)
        )
    }
}

/// Result type for normalization operations
pub type Result<T> = std::result::Result<T, Error>;
