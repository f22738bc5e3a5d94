// src/filesystem/path.rs

//! Path containment utilities for security
//!
//! Archive entry names come from untrusted input. Before anything is written
//! the entry is resolved lexically against its extraction directory and must
//! land inside it. After parent directories exist on disk the resolved
//! location is checked again with symlinks followed, so a link planted in the
//! destination tree cannot redirect a write.

use std::io;
use std::path::{Component, Path, PathBuf};

/// Resolve an untrusted entry name against an extraction directory
///
/// Returns the entry's path *relative to* `root` with `.` dropped and `..`
/// collapsed. Returns `None` when the entry escapes `root`: an absolute path,
/// a drive prefix, or more `..` segments than there are segments to undo.
/// An entry that resolves to `root` itself yields an empty path.
///
/// # Examples
///
/// ```
/// use unnest::filesystem::path::resolve_within;
/// use std::path::PathBuf;
///
/// assert_eq!(resolve_within("lib/./a.txt"), Some(PathBuf::from("lib/a.txt")));
/// assert_eq!(resolve_within("lib/../a.txt"), Some(PathBuf::from("a.txt")));
/// assert_eq!(resolve_within("../../evil.txt"), None);
/// assert_eq!(resolve_within("/etc/passwd"), None);
/// ```
pub fn resolve_within(entry: impl AsRef<Path>) -> Option<PathBuf> {
    let mut resolved = PathBuf::new();

    for component in entry.as_ref().components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                // Popping past the root is an escape
                if !resolved.pop() {
                    return None;
                }
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    Some(resolved)
}

/// First path segment of an archive entry, as a string
///
/// Returns `None` for entries that are only `.` or `/`.
pub fn first_segment(entry: &Path) -> Option<String> {
    entry.components().find_map(|component| match component {
        Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
        _ => None,
    })
}

/// Check that `path` stays inside `root` once symlinks are followed
///
/// The parent of `path` must already exist. `root` should be canonical.
pub fn is_physically_within(root: &Path, path: &Path) -> io::Result<bool> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => return Ok(false),
    };

    let canonical_parent = parent.canonicalize()?;
    Ok(canonical_parent.starts_with(root))
}
