//! Destination-overlap guard.
//!
//! When the destination lives inside the source tree, the walk would pick up
//! the copies it just wrote. [`DirectoryFilter`] tells the walk which
//! directories to prune: any directory whose absolute path starts with the
//! absolute destination path.
//!
//! The comparison is a plain string prefix on lexically normalized absolute
//! paths, so with a destination of `/data/out` a sibling named `/data/outbox`
//! is pruned as well.

use std::io;
use std::path::{Component, Path, PathBuf};

/// Prunes the destination subtree from a source walk.
#[derive(Debug, Clone)]
pub struct DirectoryFilter {
    destination: String,
}

impl DirectoryFilter {
    /// Creates a filter for the given destination directory.
    ///
    /// # Errors
    ///
    /// Fails only when a relative path cannot be made absolute because the
    /// current directory is unavailable.
    pub fn new(destination: &Path) -> io::Result<Self> {
        Ok(Self {
            destination: absolute_string(destination)?,
        })
    }

    /// Returns true if `dir` is the destination or lies beneath it.
    ///
    /// A directory that cannot be made absolute is never skipped.
    pub fn should_skip(&self, dir: &Path) -> bool {
        absolute_string(dir)
            .map(|dir| dir.starts_with(&self.destination))
            .unwrap_or(false)
    }
}

fn absolute_string(path: &Path) -> io::Result<String> {
    let absolute = std::path::absolute(path)?;
    Ok(normalize_lexically(&absolute).to_string_lossy().into_owned())
}

/// Resolves `.` and `..` components without touching the filesystem.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
