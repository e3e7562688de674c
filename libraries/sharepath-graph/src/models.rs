//! Graph API payloads.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sharepath_core::{ItemKind, LibraryPath, Properties, RemoteItem};

#[derive(Debug, Deserialize)]
pub(crate) struct Page<T> {
    pub value: Vec<T>,
    #[serde(rename = "@odata.nextLink")]
    pub next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SiteDto {
    pub id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DriveDto {
    pub id: String,
    pub name: String,
    pub web_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DriveItemDto {
    pub id: String,
    pub name: Option<String>,
    pub size: Option<u64>,
    pub last_modified_date_time: Option<DateTime<Utc>>,
    pub web_url: Option<String>,
    pub e_tag: Option<String>,
    pub folder: Option<FolderFacet>,
    pub file: Option<FileFacet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FolderFacet {
    pub child_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FileFacet {
    pub mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UploadSessionDto {
    pub upload_url: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

impl DriveItemDto {
    /// Convert into a store item living at `path`.
    ///
    /// Graph reports names and ids but not library-relative paths, so the
    /// caller supplies the path it addressed the item by.
    pub(crate) fn into_item(self, path: LibraryPath) -> RemoteItem {
        let kind = if self.folder.is_some() {
            ItemKind::Folder {
                child_count: self.folder.and_then(|f| f.child_count),
            }
        } else {
            ItemKind::File {
                size: self.size.unwrap_or(0),
            }
        };

        let mut properties = Properties::new();
        if let Some(tag) = self.e_tag {
            properties.insert("eTag".to_string(), tag.into());
        }
        if let Some(mime) = self.file.and_then(|f| f.mime_type) {
            properties.insert("mimeType".to_string(), mime.into());
        }

        RemoteItem {
            id: self.id,
            name: self
                .name
                .or_else(|| path.name().map(str::to_string))
                .unwrap_or_default(),
            path,
            kind,
            modified: self.last_modified_date_time,
            web_url: self.web_url,
            properties,
        }
    }
}
