//! Storage operations
//!
//! Handles the file manager operations: list, retrieve, store, delete,
//! create folder, move and rename. Every client path goes through the
//! [`Sandbox`] before the filesystem is touched, and every operation is
//! attempted exactly once. Operations act on the symlink-resolved location,
//! so an in-root link pointing outside the root cannot be used to escape it.

use log::{error, info, warn};
use std::path::PathBuf;
use tokio::fs;

use crate::error::{StorageError, handle_error};
use crate::storage::filesystem::{
    LastComponent, display_path, entry_kind, metadata, symlink_metadata,
};
use crate::storage::results::{DirectoryEntry, FilePayload};
use crate::storage::validation::{Sandbox, validate_filename};

/// Lists the immediate children of a directory, sorted by name
pub async fn list_directory(
    sandbox: &Sandbox,
    relative_path: &str,
) -> Result<Vec<DirectoryEntry>, StorageError> {
    let real_path = sandbox
        .resolve_real(relative_path, LastComponent::Follow)
        .await?;

    if !metadata(&real_path, relative_path).await?.is_dir() {
        return Err(StorageError::NotFound(display_path(relative_path)));
    }

    let prefix = relative_path.trim_end_matches('/');
    let mut entries = Vec::new();
    let mut read_dir = fs::read_dir(&real_path).await?;

    while let Some(entry) = read_dir.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        let kind = entry_kind(&entry.path()).await;
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{}/{}", prefix, name)
        };

        entries.push(DirectoryEntry { name, kind, path });
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));

    info!(
        "Listed directory {} (real: {}) - {} entries",
        display_path(relative_path),
        real_path.display(),
        entries.len()
    );

    Ok(entries)
}

/// Prepares a file for download, returning its real path
pub async fn prepare_file_retrieval(
    sandbox: &Sandbox,
    relative_path: &str,
) -> Result<PathBuf, StorageError> {
    let file_path = sandbox
        .resolve_real(relative_path, LastComponent::Follow)
        .await?;

    if !metadata(&file_path, relative_path).await?.is_file() {
        return Err(StorageError::NotFound(display_path(relative_path)));
    }

    Ok(file_path)
}

/// Writes uploaded files into a directory, returning the names written.
///
/// Existing files are overwritten. Payloads with an empty name are skipped;
/// payloads whose name is not a bare file name are rejected and skipped.
pub async fn store_files(
    sandbox: &Sandbox,
    relative_dir: &str,
    payloads: Vec<FilePayload>,
) -> Result<Vec<String>, StorageError> {
    let target_dir = sandbox
        .resolve_real(relative_dir, LastComponent::Follow)
        .await?;

    match metadata(&target_dir, relative_dir).await {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) | Err(StorageError::NotFound(_)) => {
            return Err(StorageError::InvalidPath(format!(
                "not a directory: {}",
                display_path(relative_dir)
            )));
        }
        Err(e) => return Err(e),
    }

    let mut written = Vec::new();
    let mut last_error = None;

    for payload in payloads {
        if payload.filename.is_empty() {
            continue;
        }

        // An existing link in the target may point outside the root
        let contained = match validate_filename(&payload.filename) {
            Ok(name) => {
                sandbox
                    .contain_real(&target_dir.join(name), name, LastComponent::Follow)
                    .await
            }
            Err(e) => Err(e),
        };

        let file_path = match contained {
            Ok(path) => path,
            Err(e) => {
                handle_error("upload", &e);
                continue;
            }
        };

        match fs::write(&file_path, &payload.data).await {
            Ok(()) => {
                info!(
                    "Stored file {} ({} bytes, real: {})",
                    payload.filename,
                    payload.data.len(),
                    file_path.display()
                );
                written.push(payload.filename);
            }
            Err(e) => {
                error!("Failed to write {}: {}", file_path.display(), e);
                last_error = Some(e);
            }
        }
    }

    if written.is_empty() {
        return Err(match last_error {
            Some(e) => StorageError::Io(e),
            None => StorageError::InvalidRequest("No selected file".into()),
        });
    }

    Ok(written)
}

/// Deletes a file, or a directory with everything beneath it
pub async fn delete_item(sandbox: &Sandbox, relative_path: &str) -> Result<(), StorageError> {
    let path = sandbox
        .resolve_real(relative_path, LastComponent::Keep)
        .await?;

    if sandbox.is_root(&path) {
        return Err(StorageError::InvalidPath("cannot delete the server root".into()));
    }

    // symlink_metadata: a link is removed as a link, its target is left alone
    if symlink_metadata(&path, relative_path).await?.is_dir() {
        fs::remove_dir_all(&path).await?;
    } else {
        fs::remove_file(&path).await?;
    }

    info!("Deleted {} (real: {})", relative_path, path.display());
    Ok(())
}

/// Creates a folder and any missing ancestors. Existing folders are fine.
pub async fn create_folder(sandbox: &Sandbox, relative_path: &str) -> Result<(), StorageError> {
    let path = sandbox
        .resolve_real(relative_path, LastComponent::Follow)
        .await?;

    fs::create_dir_all(&path).await?;

    info!(
        "Created folder {} (real: {})",
        display_path(relative_path),
        path.display()
    );
    Ok(())
}

/// Moves an item with a single rename. Fails across devices.
pub async fn move_item(
    sandbox: &Sandbox,
    source: &str,
    destination: &str,
) -> Result<(), StorageError> {
    let source_path = sandbox.resolve_real(source, LastComponent::Keep).await?;
    let destination_path = sandbox
        .resolve_real(destination, LastComponent::Keep)
        .await?;

    if sandbox.is_root(&source_path) {
        return Err(StorageError::InvalidPath("cannot move the server root".into()));
    }

    symlink_metadata(&source_path, source).await?;

    if let Err(e) = fs::rename(&source_path, &destination_path).await {
        warn!(
            "Failed to move {} to {}: {}",
            source_path.display(),
            destination_path.display(),
            e
        );
        return Err(e.into());
    }

    info!("Moved {} -> {}", source, destination);
    Ok(())
}

/// Renames an item in place. `new_name` must be a bare file name.
pub async fn rename_item(
    sandbox: &Sandbox,
    old_name: &str,
    new_name: &str,
) -> Result<(), StorageError> {
    let old_path = sandbox.resolve_real(old_name, LastComponent::Keep).await?;
    let new_name = validate_filename(new_name)?;

    let parent = old_path
        .parent()
        .ok_or_else(|| StorageError::SandboxViolation(new_name.to_string()))?;
    let new_path = sandbox
        .contain_real(&parent.join(new_name), new_name, LastComponent::Keep)
        .await?;

    symlink_metadata(&old_path, old_name).await?;

    if let Err(e) = fs::rename(&old_path, &new_path).await {
        warn!(
            "Failed to rename {} to {}: {}",
            old_path.display(),
            new_path.display(),
            e
        );
        return Err(e.into());
    }

    info!("Renamed {} -> {}", old_name, new_name);
    Ok(())
}
