// src/normalize/report.rs

//! Run summaries

use std::fmt;
use std::path::PathBuf;

/// A file that could not be processed and was left as is
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedFile {
    pub path: PathBuf,
    pub error: String,
}

/// Outcome of [`super::extract_nested_archives`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Full-tree scans performed, including the final one that found nothing
    pub passes: usize,
    /// Files decompressed or archives extracted across all passes
    pub changes: u64,
}

/// Totals for one normalization run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    pub files_copied: u64,
    pub files_decompressed: u64,
    pub archives_extracted: u64,
    pub entries_extracted: u64,
    pub skipped_entries: u64,
    pub bytes_written: u64,
    pub passes: usize,
    pub failures: Vec<FailedFile>,
}

impl NormalizeReport {
    /// True when every file was processed
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for NormalizeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Files copied:        {}", self.files_copied)?;
        writeln!(f, "Files decompressed:  {}", self.files_decompressed)?;
        writeln!(f, "Archives extracted:  {}", self.archives_extracted)?;
        writeln!(f, "Entries extracted:   {}", self.entries_extracted)?;
        writeln!(f, "Entries skipped:     {}", self.skipped_entries)?;
        writeln!(f, "Bytes written:       {}", self.bytes_written)?;
        write!(f, "Nested scan passes:  {}", self.passes)?;

        if !self.failures.is_empty() {
            writeln!(f)?;
            write!(f, "Failed files:        {}", self.failures.len())?;
            for failure in &self.failures {
                writeln!(f)?;
                write!(f, "  {}: {}", failure.path.display(), failure.error)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_lists_failures() {
        let report = NormalizeReport {
            files_copied: 2,
            failures: vec![FailedFile {
                path: PathBuf::from("bad.txt.gz"),
                error: "corrupt".to_string(),
            }],
            ..Default::default()
        };

        let text = report.to_string();
        assert!(text.contains("Files copied:        2"));
        assert!(text.contains("bad.txt.gz: corrupt"));
        assert!(!report.is_clean());
    }

    #[test]
    fn test_clean_report() {
        let report = NormalizeReport::default();
        assert!(report.is_clean());
        assert!(!report.to_string().contains("Failed"));
    }
}
