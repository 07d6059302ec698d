//! File-storage collaborator and the folder/archive logic built on top of it.

mod archive;
mod drive;
mod error;
mod folders;
mod memory;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::query::FileQuery;

pub use archive::ArtifactWriter;
pub use drive::{multipart_body, DriveClient, DRIVE_API_BASE, DRIVE_UPLOAD_BASE};
pub use error::{Result, StorageError};
pub use folders::{FolderResolver, Layout};
pub use memory::MemoryDrive;

/// Summary of a stored file as returned by list and get.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub parents: Vec<String>,
    #[serde(default)]
    pub app_properties: BTreeMap<String, String>,
    #[serde(default)]
    pub trashed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<String>,
}

impl FileEntry {
    pub fn property(&self, key: &str) -> Option<&str> {
        self.app_properties.get(key).map(String::as_str)
    }
}

/// Metadata for a file about to be created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFile {
    pub name: String,
    pub mime_type: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub app_properties: BTreeMap<String, String>,
}

impl NewFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            ..Self::default()
        }
    }

    pub fn in_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parents.push(parent_id.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.app_properties.insert(key.into(), value.into());
        self
    }
}

/// Rename and/or move. Moving swaps parent references rather than copying.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileUpdate {
    pub name: Option<String>,
    pub add_parents: Vec<String>,
    pub remove_parents: Vec<String>,
}

impl FileUpdate {
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Moves a file from `from` into `to`, optionally renaming it on the way.
    pub fn relocate(name: Option<String>, from: &[String], to: &str) -> Self {
        Self {
            name,
            add_parents: vec![to.to_string()],
            remove_parents: from.to_vec(),
        }
    }
}

/// The file-storage operations the pipeline depends on.
pub trait StorageService: Send + Sync {
    fn list(&self, query: &FileQuery) -> Result<Vec<FileEntry>>;

    fn get(&self, id: &str) -> Result<FileEntry>;

    /// Creates a file (or a folder when `content` is `None`) and returns its id.
    fn create(&self, file: &NewFile, content: Option<&[u8]>) -> Result<String>;

    fn update(&self, id: &str, update: &FileUpdate) -> Result<()>;

    fn get_media(&self, id: &str) -> Result<Vec<u8>>;

    fn delete(&self, id: &str) -> Result<()>;
}
