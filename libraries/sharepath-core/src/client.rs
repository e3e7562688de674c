//! Client facade: the single entry point callers use.

use crate::error::{LibraryError, Result};
use crate::operations::{FileRef, FolderRef, Operations};
use crate::options::ClientOptions;
use crate::path::LibraryPath;
use crate::resolver::{MissingFolders, Resolver};
use crate::store::RemoteStore;
use crate::types::{
    DeleteOutcome, DownloadedFile, FileHandle, FileTarget, FolderHandle, FolderTarget, LibraryRoot,
};
use std::path::{Path, PathBuf};
use tracing::info;

/// Path-addressed client bound to one document library.
///
/// The client owns the store (and with it the authenticated session) and
/// the Library Root. Both are read-only once the client is open, so one
/// client can serve any number of sequential calls and independent clients
/// never share state.
///
/// # Example
///
/// ```ignore
/// use sharepath_core::{ClientOptions, LibraryClient, MemoryStore};
///
/// let client = LibraryClient::open(MemoryStore::new("Documents"), ClientOptions::default()).await?;
/// client.create_folder("HR/Payroll/2025").await?;
/// let file = client.upload_file("report.xlsx", "HR/Payroll/2025").await?;
/// client.rename_file(&file, "report-final.xlsx").await?;
/// ```
pub struct LibraryClient<S: RemoteStore> {
    store: S,
    root: LibraryRoot,
    options: ClientOptions,
}

impl<S: RemoteStore> LibraryClient<S> {
    /// Bind a client to the library behind `store`.
    ///
    /// Fails with `Configuration` if the store cannot describe a usable
    /// Library Root.
    pub async fn open(store: S, options: ClientOptions) -> Result<Self> {
        let root = store.library_root().await?;

        if root.title.trim().is_empty() {
            return Err(LibraryError::Configuration(
                "library title cannot be empty".to_string(),
            ));
        }
        if root.root_item_id.is_empty() {
            return Err(LibraryError::Configuration(format!(
                "library '{}' has no root folder id",
                root.title
            )));
        }

        info!(
            library = %root.title,
            url = %root.server_relative_url,
            conflict_policy = ?options.conflict_policy,
            delete_mode = ?options.delete_mode,
            "Opened document library"
        );

        Ok(Self {
            store,
            root,
            options,
        })
    }

    pub fn root(&self) -> &LibraryRoot {
        &self.root
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn ops(&self) -> Operations<'_, S> {
        Operations::new(&self.store, &self.root, &self.options)
    }

    /// Resolve a folder path, creating missing segments when asked to.
    pub async fn resolve_folder(&self, path: &str, missing: MissingFolders) -> Result<FolderHandle> {
        let path = LibraryPath::parse(path)?;
        Resolver::new(&self.store, &self.root)
            .resolve_folder(&path, missing)
            .await
    }

    /// Resolve a file path. Never creates anything.
    pub async fn resolve_file(&self, path: &str) -> Result<FileHandle> {
        let path = LibraryPath::parse(path)?;
        Resolver::new(&self.store, &self.root).resolve_file(&path).await
    }

    /// Create a folder and any missing ancestors (`mkdir -p`).
    pub async fn create_folder(&self, path: &str) -> Result<FolderHandle> {
        let path = LibraryPath::parse(path)?;
        self.ops().create_folder(&path).await
    }

    /// Files directly inside a folder.
    pub async fn get_files<'t>(&self, folder: impl Into<FolderTarget<'t>>) -> Result<Vec<FileHandle>> {
        self.ops().get_files(folder_ref(folder.into())?).await
    }

    /// Folders directly inside a folder.
    pub async fn get_folders<'t>(
        &self,
        folder: impl Into<FolderTarget<'t>>,
    ) -> Result<Vec<FolderHandle>> {
        self.ops().get_folders(folder_ref(folder.into())?).await
    }

    /// Upload a local file into `target_folder`, creating the folder chain.
    pub async fn upload_file(
        &self,
        local_path: impl AsRef<Path>,
        target_folder: &str,
    ) -> Result<FileHandle> {
        let target = LibraryPath::parse(target_folder)?;
        self.ops().upload_file(local_path.as_ref(), &target).await
    }

    /// Content of a remote file plus its suggested local name.
    pub async fn fetch_file<'t>(&self, file: impl Into<FileTarget<'t>>) -> Result<DownloadedFile> {
        self.ops().fetch_file(file_ref(file.into())?).await
    }

    /// Download to `download_dir/<remote name>`, creating the directory.
    pub async fn download_file<'t>(
        &self,
        file: impl Into<FileTarget<'t>>,
        download_dir: impl AsRef<Path>,
    ) -> Result<PathBuf> {
        self.ops()
            .download_file(file_ref(file.into())?, download_dir.as_ref(), None)
            .await
    }

    /// Download to `download_dir/<local_name>`.
    pub async fn download_file_as<'t>(
        &self,
        file: impl Into<FileTarget<'t>>,
        download_dir: impl AsRef<Path>,
        local_name: &str,
    ) -> Result<PathBuf> {
        self.ops()
            .download_file(file_ref(file.into())?, download_dir.as_ref(), Some(local_name))
            .await
    }

    /// Download every file directly inside a folder.
    ///
    /// The outer result covers resolving and listing the folder; each file
    /// then succeeds or fails on its own, paired with its handle.
    pub async fn download_files<'t>(
        &self,
        folder: impl Into<FolderTarget<'t>>,
        download_dir: impl AsRef<Path>,
    ) -> Result<Vec<(FileHandle, Result<PathBuf>)>> {
        self.ops()
            .download_files(folder_ref(folder.into())?, download_dir.as_ref())
            .await
    }

    /// Move a file into `target_folder`, keeping its name.
    pub async fn move_file<'t>(
        &self,
        file: impl Into<FileTarget<'t>>,
        target_folder: &str,
    ) -> Result<FileHandle> {
        let file = file_ref(file.into())?;
        let target = LibraryPath::parse(target_folder)?;
        self.ops().move_file(file, &target).await
    }

    /// Rename a file inside its current folder.
    pub async fn rename_file<'t>(
        &self,
        file: impl Into<FileTarget<'t>>,
        new_name: &str,
    ) -> Result<FileHandle> {
        crate::path::validate_name(new_name)?;
        let file = file_ref(file.into())?;
        self.ops().rename_file(file, new_name).await
    }

    pub async fn delete_file<'t>(&self, file: impl Into<FileTarget<'t>>) -> Result<DeleteOutcome> {
        self.ops().delete_file(file_ref(file.into())?).await
    }

    /// Look up a folder by its server-absolute URL, e.g.
    /// `/sites/Team/Shared Documents/Compliance/2025`. No walk is performed.
    pub async fn get_folder_by_link(&self, link: &str) -> Result<FolderHandle> {
        self.ops().get_folder_by_link(link).await
    }

    /// Move `files` into `<folder>/Archive/<sub_folder>`, creating it.
    pub async fn archive_files(
        &self,
        files: &[FileHandle],
        folder: &str,
        sub_folder: &str,
    ) -> Result<Vec<Result<FileHandle>>> {
        let folder = LibraryPath::parse(folder)?;
        self.ops().archive_files(files, &folder, sub_folder).await
    }
}

fn folder_ref(target: FolderTarget<'_>) -> Result<FolderRef<'_>> {
    Ok(match target {
        FolderTarget::Path(raw) => FolderRef::Path(LibraryPath::parse(raw)?),
        FolderTarget::Handle(handle) => FolderRef::Handle(handle),
    })
}

fn file_ref(target: FileTarget<'_>) -> Result<FileRef<'_>> {
    Ok(match target {
        FileTarget::Path(raw) => FileRef::Path(LibraryPath::parse(raw)?),
        FileTarget::Handle(handle) => FileRef::Handle(handle),
    })
}
