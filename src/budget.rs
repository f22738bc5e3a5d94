// src/budget.rs

//! Extraction budget and budgeted stream copying
//!
//! Every byte written into the destination tree is charged against one
//! run-wide budget. A stream that would push the total over the limit is cut
//! off mid-copy with [`Error::PossibleArchiveBomb`]; callers write through
//! [`crate::filesystem::write_atomic`] so the partial output is discarded.

use crate::error::{Error, Result};
use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

/// Copy buffer size
const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Cumulative byte budget shared by all workers of a run
#[derive(Debug)]
pub struct ByteBudget {
    limit: u64,
    used: AtomicU64,
}

impl ByteBudget {
    /// Create a budget allowing `limit` bytes in total
    pub fn new(limit: u64) -> Self {
        Self {
            limit,
            used: AtomicU64::new(0),
        }
    }

    /// A budget that never runs out
    pub fn unlimited() -> Self {
        Self::new(u64::MAX)
    }

    /// Charge `bytes` against the budget
    pub fn charge(&self, bytes: u64) -> Result<()> {
        let previous = self.used.fetch_add(bytes, Ordering::Relaxed);
        let total = previous.saturating_add(bytes);
        if total > self.limit {
            return Err(Error::PossibleArchiveBomb {
                reason: format!(
                    "extracted output exceeds the budget of {} bytes",
                    self.limit
                ),
            });
        }
        Ok(())
    }

    /// Bytes charged so far
    pub fn used(&self) -> u64 {
        self.used.load(Ordering::Relaxed).min(self.limit)
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }
}

/// Stream `reader` into `writer`, charging every chunk to `budget`
///
/// Read failures are reported as [`Error::Decompression`] against `source`
/// (for a decoder they mean a corrupt stream); write failures stay
/// [`Error::Io`].
pub fn copy_with_budget<R, W>(
    reader: &mut R,
    writer: &mut W,
    budget: &ByteBudget,
    source: &Path,
) -> Result<u64>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    let mut total = 0u64;

    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(Error::Decompression {
                    path: source.to_path_buf(),
                    source: e,
                });
            }
        };

        budget.charge(n as u64)?;
        writer.write_all(&buffer[..n])?;
        total += n as u64;
    }

    writer.flush()?;
    Ok(total)
}
