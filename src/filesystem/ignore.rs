// src/filesystem/ignore.rs

//! Ignore patterns for tree walks
//!
//! A pattern is a plain substring. A directory whose path (relative to the
//! walk root) contains any pattern is pruned along with everything below it.

use std::path::Path;

/// Configured set of ignore substrings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreSet {
    patterns: Vec<String>,
}

impl IgnoreSet {
    /// Create an ignore set from patterns, dropping blank ones
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns = patterns
            .into_iter()
            .map(Into::into)
            .map(|p: String| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        Self { patterns }
    }

    /// Parse a comma-separated pattern list (e.g. `".git, .svn"`)
    pub fn from_comma_list(list: &str) -> Self {
        Self::new(list.split(','))
    }

    /// Add one more pattern
    pub fn push(&mut self, pattern: impl Into<String>) {
        let pattern = pattern.into().trim().to_string();
        if !pattern.is_empty() && !self.patterns.contains(&pattern) {
            self.patterns.push(pattern);
        }
    }

    /// The configured patterns
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Whether a path contains any ignore pattern
    pub fn matches(&self, path: &Path) -> bool {
        if self.patterns.is_empty() {
            return false;
        }
        let path_str = path.to_string_lossy();
        self.patterns.iter().any(|p| path_str.contains(p.as_str()))
    }
}
