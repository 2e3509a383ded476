//! Storage result types
//!
//! Defines the records passed into and returned by storage operations.

use axum::body::Bytes;
use serde::Serialize;

/// Kind of a listed entry. Anything that is not a directory is a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Folder,
    File,
}

/// One child of a listed directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Path relative to the server root, `/`-separated
    pub path: String,
}

/// A named file received in an upload request
#[derive(Debug, Clone)]
pub struct FilePayload {
    pub filename: String,
    pub data: Bytes,
}

impl FilePayload {
    pub fn new(filename: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            data: data.into(),
        }
    }
}
