//! File system helpers
//!
//! Thin wrappers over `tokio::fs` that turn a missing entry into
//! [`StorageError::NotFound`] carrying the client's path, plus symlink
//! resolution for the sandbox.

use std::ffi::OsString;
use std::fs::Metadata;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::StorageError;
use crate::storage::results::EntryKind;

/// Metadata following symlinks
pub async fn metadata(path: &Path, requested: &str) -> Result<Metadata, StorageError> {
    fs::metadata(path)
        .await
        .map_err(|e| not_found_or_io(e, requested))
}

/// Metadata of the entry itself, never its symlink target
pub async fn symlink_metadata(path: &Path, requested: &str) -> Result<Metadata, StorageError> {
    fs::symlink_metadata(path)
        .await
        .map_err(|e| not_found_or_io(e, requested))
}

/// Folder for directories (symlinks followed), file for everything else
pub async fn entry_kind(path: &Path) -> EntryKind {
    match fs::metadata(path).await {
        Ok(metadata) if metadata.is_dir() => EntryKind::Folder,
        _ => EntryKind::File,
    }
}

/// Whether the final component of a path is resolved when it is a symlink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LastComponent {
    /// The operation opens through the last component (read, write, mkdir)
    Follow,
    /// The operation acts on the entry itself (unlink, rename)
    Keep,
}

/// The location the OS will actually touch for `path`.
///
/// Symlinks are resolved on the deepest existing ancestor; missing trailing
/// components are appended unchanged. A dangling symlink on the way is
/// rejected since its target cannot be checked.
pub async fn real_location(
    path: &Path,
    last: LastComponent,
    requested: &str,
) -> Result<PathBuf, StorageError> {
    let mut pending: Vec<OsString> = Vec::new();
    let mut existing = path.to_path_buf();

    if last == LastComponent::Keep {
        match split_last(&existing) {
            Some((parent, name)) => {
                pending.push(name);
                existing = parent;
            }
            None => return Ok(existing),
        }
    }

    loop {
        match fs::canonicalize(&existing).await {
            Ok(mut real) => {
                for part in pending.iter().rev() {
                    real.push(part);
                }
                return Ok(real);
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                if fs::symlink_metadata(&existing).await.is_ok() {
                    return Err(StorageError::SandboxViolation(requested.to_string()));
                }

                let Some((parent, name)) = split_last(&existing) else {
                    return Err(e.into());
                };
                pending.push(name);
                existing = parent;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

fn split_last(path: &Path) -> Option<(PathBuf, OsString)> {
    Some((path.parent()?.to_path_buf(), path.file_name()?.to_os_string()))
}

fn not_found_or_io(error: std::io::Error, requested: &str) -> StorageError {
    if error.kind() == ErrorKind::NotFound {
        StorageError::NotFound(display_path(requested))
    } else {
        StorageError::Io(error)
    }
}

/// Client path as shown in messages; the root reads as `/`
pub fn display_path(requested: &str) -> String {
    if requested.is_empty() {
        "/".to_string()
    } else {
        requested.to_string()
    }
}
