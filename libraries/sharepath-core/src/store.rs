//! The remote store seam.
//!
//! A [`RemoteStore`] owns an authenticated session against one document
//! library and performs single network exchanges. It knows nothing about
//! paths beyond the library-relative path it reports on each item; walking,
//! creating intermediate folders and conflict handling live above it.

use crate::error::StoreResult;
use crate::path::LibraryPath;
use crate::types::{LibraryRoot, RemoteItem};
use async_trait::async_trait;

#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Whether names compare case-insensitively (SharePoint does).
    fn case_insensitive(&self) -> bool {
        true
    }

    /// Describe the library this store is bound to.
    async fn library_root(&self) -> StoreResult<LibraryRoot>;

    /// Direct children of a folder, files and folders alike.
    async fn list_children(&self, folder: &RemoteItem) -> StoreResult<Vec<RemoteItem>>;

    /// Direct lookup by library-relative path. `Ok(None)` if absent.
    async fn get_item(&self, path: &LibraryPath) -> StoreResult<Option<RemoteItem>>;

    /// Create a child folder.
    ///
    /// Must fail with `StoreError::AlreadyExists` if the name is taken rather
    /// than silently renaming or replacing.
    async fn create_folder(&self, parent: &RemoteItem, name: &str) -> StoreResult<RemoteItem>;

    /// Store `content` as `name` inside `parent`.
    ///
    /// With `replace` unset an existing item fails with `AlreadyExists`.
    async fn upload(
        &self,
        parent: &RemoteItem,
        name: &str,
        content: Vec<u8>,
        replace: bool,
    ) -> StoreResult<RemoteItem>;

    /// Full content of a file.
    async fn download(&self, file: &RemoteItem) -> StoreResult<Vec<u8>>;

    /// Move `item` into `new_parent` under `new_name`; covers rename too.
    ///
    /// A file already holding `new_name` fails with `AlreadyExists` unless
    /// `replace` is set, in which case it is overwritten as part of the same
    /// exchange. A missing `item` leaves the destination untouched. Folders
    /// are never replaced.
    async fn move_item(
        &self,
        item: &RemoteItem,
        new_parent: &RemoteItem,
        new_name: &str,
        replace: bool,
    ) -> StoreResult<RemoteItem>;

    async fn delete(&self, item: &RemoteItem) -> StoreResult<()>;
}
