//! Library Root, remote items and the handles returned to callers.

use crate::path::LibraryPath;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Store-specific metadata carried alongside the named fields.
pub type Properties = BTreeMap<String, serde_json::Value>;

/// The document library a client is bound to.
///
/// Established once when the client is opened and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryRoot {
    /// Library title as shown in SharePoint (e.g. "Documents")
    pub title: String,
    /// Remote identifier of the library (the Graph drive id)
    pub library_id: String,
    /// Remote identifier of the library's root folder
    pub root_item_id: String,
    /// Browser URL of the library, if the store reports one
    pub web_url: Option<String>,
    /// Server-relative URL of the library root (e.g. "/sites/Team/Shared Documents")
    pub server_relative_url: String,
}

impl LibraryRoot {
    /// Handle for the root folder itself.
    pub fn folder(&self) -> FolderHandle {
        FolderHandle {
            id: self.root_item_id.clone(),
            path: LibraryPath::root(),
            name: self.title.clone(),
            child_count: None,
            modified: None,
            web_url: self.web_url.clone(),
            properties: Properties::new(),
        }
    }

    /// Map a server-absolute URL onto a library-relative path.
    ///
    /// Returns `None` when `link` does not point inside this library.
    pub fn relative_path_of(&self, link: &str) -> Option<String> {
        let base = self.server_relative_url.trim_end_matches('/');
        let link = link.trim();
        let rest = strip_prefix_ignore_case(link, base)?;
        if rest.is_empty() || rest.starts_with('/') {
            Some(rest.trim_matches('/').to_string())
        } else {
            None
        }
    }
}

fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    if value.len() < prefix.len() || !value.is_char_boundary(prefix.len()) {
        return None;
    }
    let (head, tail) = value.split_at(prefix.len());
    head.eq_ignore_ascii_case(prefix).then_some(tail)
}

/// What kind of object a remote item is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ItemKind {
    Folder { child_count: Option<u64> },
    File { size: u64 },
}

/// A remote item as reported by a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteItem {
    pub id: String,
    pub name: String,
    pub path: LibraryPath,
    pub kind: ItemKind,
    pub modified: Option<DateTime<Utc>>,
    pub web_url: Option<String>,
    #[serde(default)]
    pub properties: Properties,
}

impl RemoteItem {
    pub fn is_folder(&self) -> bool {
        matches!(self.kind, ItemKind::Folder { .. })
    }

    pub fn is_file(&self) -> bool {
        matches!(self.kind, ItemKind::File { .. })
    }

    /// Convert into a folder handle, `None` if this is a file.
    pub fn into_folder(self) -> Option<FolderHandle> {
        match self.kind {
            ItemKind::Folder { child_count } => Some(FolderHandle {
                id: self.id,
                path: self.path,
                name: self.name,
                child_count,
                modified: self.modified,
                web_url: self.web_url,
                properties: self.properties,
            }),
            ItemKind::File { .. } => None,
        }
    }

    /// Convert into a file handle, `None` if this is a folder.
    pub fn into_file(self) -> Option<FileHandle> {
        match self.kind {
            ItemKind::File { size } => Some(FileHandle {
                id: self.id,
                path: self.path,
                name: self.name,
                size,
                modified: self.modified,
                web_url: self.web_url,
                properties: self.properties,
            }),
            ItemKind::Folder { .. } => None,
        }
    }
}

/// A resolved remote folder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderHandle {
    pub id: String,
    pub path: LibraryPath,
    pub name: String,
    pub child_count: Option<u64>,
    pub modified: Option<DateTime<Utc>>,
    pub web_url: Option<String>,
    #[serde(default)]
    pub properties: Properties,
}

impl FolderHandle {
    pub fn is_root(&self) -> bool {
        self.path.is_root()
    }

    /// Parent folder path, `None` for the Library Root.
    pub fn parent_path(&self) -> Option<LibraryPath> {
        self.path.parent()
    }

    pub(crate) fn as_item(&self) -> RemoteItem {
        RemoteItem {
            id: self.id.clone(),
            name: self.name.clone(),
            path: self.path.clone(),
            kind: ItemKind::Folder {
                child_count: self.child_count,
            },
            modified: self.modified,
            web_url: self.web_url.clone(),
            properties: self.properties.clone(),
        }
    }
}

/// A resolved remote file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileHandle {
    pub id: String,
    pub path: LibraryPath,
    pub name: String,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
    pub web_url: Option<String>,
    #[serde(default)]
    pub properties: Properties,
}

impl FileHandle {
    /// Path of the folder holding this file.
    pub fn parent_path(&self) -> LibraryPath {
        self.path.parent().unwrap_or_default()
    }

    pub(crate) fn as_item(&self) -> RemoteItem {
        RemoteItem {
            id: self.id.clone(),
            name: self.name.clone(),
            path: self.path.clone(),
            kind: ItemKind::File { size: self.size },
            modified: self.modified,
            web_url: self.web_url.clone(),
            properties: self.properties.clone(),
        }
    }
}

/// Downloaded content plus the suggested local file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub file_name: String,
    pub content: Vec<u8>,
}

/// Outcome of `delete_file`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteOutcome {
    Deleted,
    /// The file was already gone and the client runs in idempotent-delete mode
    AlreadyAbsent,
}

/// A folder given either as a path string or as an already-resolved handle.
#[derive(Debug, Clone, Copy)]
pub enum FolderTarget<'a> {
    Path(&'a str),
    Handle(&'a FolderHandle),
}

impl<'a> From<&'a str> for FolderTarget<'a> {
    fn from(value: &'a str) -> Self {
        Self::Path(value)
    }
}

impl<'a> From<&'a String> for FolderTarget<'a> {
    fn from(value: &'a String) -> Self {
        Self::Path(value.as_str())
    }
}

impl<'a> From<&'a FolderHandle> for FolderTarget<'a> {
    fn from(value: &'a FolderHandle) -> Self {
        Self::Handle(value)
    }
}

/// A file given either as a path string or as an already-resolved handle.
#[derive(Debug, Clone, Copy)]
pub enum FileTarget<'a> {
    Path(&'a str),
    Handle(&'a FileHandle),
}

impl<'a> From<&'a str> for FileTarget<'a> {
    fn from(value: &'a str) -> Self {
        Self::Path(value)
    }
}

impl<'a> From<&'a String> for FileTarget<'a> {
    fn from(value: &'a String) -> Self {
        Self::Path(value.as_str())
    }
}

impl<'a> From<&'a FileHandle> for FileTarget<'a> {
    fn from(value: &'a FileHandle) -> Self {
        Self::Handle(value)
    }
}
