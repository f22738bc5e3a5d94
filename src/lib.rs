// src/lib.rs

//! Unnest: recursive archive normalization
//!
//! Turns a file or directory full of archives, compressed files and archives
//! inside archives into a plain directory tree that ordinary file-by-file
//! tools can inspect.
//!
//! # Architecture
//!
//! - Classification by name: compound suffixes (`.tar.gz`, `.tgz`, ...) win,
//!   hash-named tar layers are recognised by content
//! - Single-stream decompression: gzip, bzip2, xz, lzma (content sniffed)
//! - Multi-entry extraction: zip and tar, validated before anything is
//!   written, flattened when the archive wraps a same-named directory
//! - Two phases: mirror the source while unpacking, then rescan the output
//!   until nothing is left to unpack
//! - Guard rails: path containment, symlink refusal, pass limit and a
//!   cumulative byte budget

pub mod archive;
pub mod budget;
pub mod classify;
pub mod compression;
pub mod config;
mod error;
pub mod filesystem;
pub mod inventory;
pub mod normalize;

pub use classify::{ExtractionKind, classify};
pub use config::{Config, ExtractionConfig};
pub use error::{Error, Result};
pub use inventory::{Encoding, FileInventory, FileRecord};
pub use normalize::{NormalizeReport, Normalizer, ScanSummary};
