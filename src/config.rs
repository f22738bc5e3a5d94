// src/config.rs
//! Configuration file parsing
//!
//! Supports TOML configuration files with one section:
//! - [extraction] - ignore patterns, pass limit, byte budget, worker count
//!
//! Every key is optional. Command-line flags override file values.

use crate::error::Error;
use crate::filesystem::IgnoreSet;
use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};
use std::path::Path;

/// TOML configuration file structure
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Extraction settings
    #[serde(default)]
    pub extraction: ExtractionConfig,
}

/// Extraction configuration section
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExtractionConfig {
    /// Directory path substrings to skip, as a list or a comma-separated string
    #[serde(default = "default_ignore_dirs", deserialize_with = "deserialize_patterns")]
    pub ignore_dirs: Vec<String>,

    /// Maximum number of nested scans that may change the tree
    #[serde(default = "default_max_passes")]
    pub max_passes: usize,

    /// Cumulative bytes all extractions of one run may write
    #[serde(default = "default_max_extracted_bytes")]
    pub max_extracted_bytes: u64,

    /// Worker threads per scan (1 = sequential)
    #[serde(default = "default_jobs")]
    pub jobs: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            ignore_dirs: default_ignore_dirs(),
            max_passes: default_max_passes(),
            max_extracted_bytes: default_max_extracted_bytes(),
            jobs: default_jobs(),
        }
    }
}

fn default_ignore_dirs() -> Vec<String> {
    vec![".git".to_string()]
}

fn default_max_passes() -> usize {
    32
}

fn default_max_extracted_bytes() -> u64 {
    16 * 1024 * 1024 * 1024
}

fn default_jobs() -> usize {
    1
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PatternList {
    List(Vec<String>),
    CommaSeparated(String),
}

fn deserialize_patterns<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match PatternList::deserialize(deserializer)? {
        PatternList::List(patterns) => patterns,
        PatternList::CommaSeparated(list) => IgnoreSet::from_comma_list(&list).patterns().to_vec(),
    })
}

impl ExtractionConfig {
    /// Build the ignore set from `ignore_dirs`
    pub fn ignore_set(&self) -> IgnoreSet {
        IgnoreSet::new(self.ignore_dirs.iter().cloned())
    }

    /// Check the values a run cannot work with
    pub fn check(&self) -> crate::Result<()> {
        if self.max_passes == 0 {
            return Err(Error::Config("extraction.max_passes must be at least 1".into()));
        }
        if self.max_extracted_bytes == 0 {
            return Err(Error::Config(
                "extraction.max_extracted_bytes must be at least 1".into(),
            ));
        }
        if self.jobs == 0 {
            return Err(Error::Config("extraction.jobs must be at least 1".into()));
        }
        if self.ignore_dirs.iter().any(|p| p.trim().is_empty()) {
            return Err(Error::Config(
                "extraction.ignore_dirs must not contain empty patterns".into(),
            ));
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.extraction.check()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::new();
        assert_eq!(config.extraction.ignore_dirs, vec![".git".to_string()]);
        assert_eq!(config.extraction.max_passes, 32);
        assert_eq!(config.extraction.max_extracted_bytes, 17_179_869_184);
        assert_eq!(config.extraction.jobs, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
[extraction]
ignore_dirs = [".git", ".svn", "node_modules"]
max_passes = 8
max_extracted_bytes = 1048576
jobs = 4
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.extraction.ignore_dirs.len(), 3);
        assert_eq!(config.extraction.max_passes, 8);
        assert_eq!(config.extraction.max_extracted_bytes, 1_048_576);
        assert_eq!(config.extraction.jobs, 4);
        assert!(config.extraction.ignore_set().matches(Path::new("web/node_modules/x")));
    }

    #[test]
    fn test_comma_separated_ignore_dirs() {
        let config: Config = toml::from_str("[extraction]\nignore_dirs = \".git, .hg,\"\n").unwrap();
        assert_eq!(config.extraction.ignore_dirs, vec![".git".to_string(), ".hg".to_string()]);
    }

    #[test]
    fn test_partial_section_uses_defaults() {
        let config: Config = toml::from_str("[extraction]\njobs = 2\n").unwrap();
        assert_eq!(config.extraction.jobs, 2);
        assert_eq!(config.extraction.max_passes, 32);
        assert_eq!(config.extraction.ignore_dirs, vec![".git".to_string()]);
    }

    #[test]
    fn test_invalid_values() {
        let mut config = Config::new();
        config.extraction.max_passes = 0;
        assert!(config.validate().is_err());

        let mut config = Config::new();
        config.extraction.jobs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::new();
        config.extraction.max_extracted_bytes = 0;
        assert!(config.validate().is_err());

        let mut config = Config::new();
        config.extraction.ignore_dirs.push("  ".to_string());
        assert!(matches!(config.extraction.check(), Err(Error::Config(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(file, "[extraction]\nmax_passes = 3").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.extraction.max_passes, 3);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let mut file = tempfile::NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(file, "[extraction]\njobs = 0").unwrap();
        assert!(Config::load(file.path()).is_err());

        let missing = Config::load(Path::new("/nonexistent/unnest.toml"));
        assert!(missing.is_err());
    }
}
