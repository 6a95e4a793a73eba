//! Working-root containment.
//!
//! Every path a command names is resolved to a canonical absolute path and
//! accepted only if it lies under the canonical working root. Paths that do
//! not exist yet (CREATE targets, their parents) are canonicalized through
//! their longest existing ancestor, with the remaining components applied
//! lexically.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::warn;

use crate::error::{CoreError, ToolError};

/// Canonical directory that bounds all filesystem access of a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingRoot {
    path: PathBuf,
}

impl WorkingRoot {
    /// Canonicalize `dir` (relative paths are taken from the process working
    /// directory) and check that it is an existing directory.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidWorkingDirectory` if `dir` does not exist
    /// or is not a directory.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, CoreError> {
        let dir = dir.as_ref();
        let path = fs::canonicalize(dir)
            .map_err(|_| CoreError::InvalidWorkingDirectory(dir.to_path_buf()))?;
        if !path.is_dir() {
            return Err(CoreError::InvalidWorkingDirectory(dir.to_path_buf()));
        }
        Ok(Self { path })
    }

    /// The canonical root path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a canonical path lies under the root (or is the root).
    pub fn contains(&self, canonical: &Path) -> bool {
        canonical.starts_with(&self.path)
    }

    /// Resolve a requested path against the root.
    ///
    /// Relative paths are joined to the root, absolute paths are taken as-is;
    /// both are then canonicalized and checked for containment.
    ///
    /// # Errors
    ///
    /// Returns `ToolError::PathTooLong` if the request exceeds `max_len`
    /// bytes and `ToolError::PathOutsideRoot` if the canonical form escapes
    /// the root. Neither case touches the target.
    pub fn resolve(&self, requested: &str, max_len: usize) -> Result<PathBuf, ToolError> {
        if requested.len() > max_len {
            return Err(ToolError::PathTooLong {
                len: requested.len(),
                max: max_len,
            });
        }

        let candidate = Path::new(requested);
        let joined = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.path.join(candidate)
        };

        let resolved = weakly_canonical(&joined).map_err(|e| ToolError::io(requested, e))?;
        if !self.contains(&resolved) {
            warn!(
                requested,
                resolved = %resolved.display(),
                root = %self.path.display(),
                "rejected path outside working root"
            );
            return Err(ToolError::PathOutsideRoot(requested.to_owned()));
        }
        Ok(resolved)
    }

    /// Display form of a contained path relative to the root, `/`-separated.
    pub fn display_relative(&self, canonical: &Path) -> String {
        match canonical.strip_prefix(&self.path) {
            Ok(rel) if rel.as_os_str().is_empty() => ".".to_owned(),
            Ok(rel) => rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/"),
            Err(_) => canonical.display().to_string(),
        }
    }
}

/// Canonicalize the longest existing ancestor of `path` and append the rest
/// of its components lexically (`.` dropped, `..` popping).
fn weakly_canonical(path: &Path) -> io::Result<PathBuf> {
    let components: Vec<Component<'_>> = path.components().collect();

    for split in (1..=components.len()).rev() {
        let head: PathBuf = components[..split].iter().collect();
        let Ok(mut resolved) = fs::canonicalize(&head) else {
            continue;
        };

        for component in &components[split..] {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    resolved.pop();
                }
                other => resolved.push(other.as_os_str()),
            }
        }
        return Ok(resolved);
    }

    Err(io::Error::new(
        io::ErrorKind::NotFound,
        format!("no existing ancestor for {}", path.display()),
    ))
}
