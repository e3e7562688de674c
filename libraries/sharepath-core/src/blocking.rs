//! Blocking wrapper around [`LibraryClient`].
//!
//! Every call blocks the current thread until the store has answered. The
//! wrapper owns a current-thread runtime, so it must not be used from inside
//! an async context.

use crate::client::LibraryClient;
use crate::error::{LibraryError, Result};
use crate::options::ClientOptions;
use crate::resolver::MissingFolders;
use crate::store::RemoteStore;
use crate::types::{
    DeleteOutcome, DownloadedFile, FileHandle, FileTarget, FolderHandle, FolderTarget, LibraryRoot,
};
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::runtime::{Builder, Runtime};

pub struct BlockingLibraryClient<S: RemoteStore> {
    inner: LibraryClient<S>,
    runtime: Runtime,
}

impl<S: RemoteStore> BlockingLibraryClient<S> {
    pub fn open(store: S, options: ClientOptions) -> Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        let inner = runtime.block_on(LibraryClient::open(store, options))?;
        Ok(Self { inner, runtime })
    }

    /// Build the store on this wrapper's runtime, then open it.
    ///
    /// Stores holding network connections must be created on the runtime
    /// that later drives them, so remote stores are opened this way.
    pub fn connect<F, Fut, E>(connect: F, options: ClientOptions) -> Result<Self>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<S, E>>,
        E: Into<LibraryError>,
    {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        let inner = runtime.block_on(async {
            let store = connect().await.map_err(Into::<LibraryError>::into)?;
            LibraryClient::open(store, options).await
        })?;
        Ok(Self { inner, runtime })
    }

    /// Wrap a client that was opened elsewhere.
    pub fn from_client(inner: LibraryClient<S>) -> Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self { inner, runtime })
    }

    pub fn client(&self) -> &LibraryClient<S> {
        &self.inner
    }

    pub fn root(&self) -> &LibraryRoot {
        self.inner.root()
    }

    pub fn resolve_folder(&self, path: &str, missing: MissingFolders) -> Result<FolderHandle> {
        self.runtime.block_on(self.inner.resolve_folder(path, missing))
    }

    pub fn resolve_file(&self, path: &str) -> Result<FileHandle> {
        self.runtime.block_on(self.inner.resolve_file(path))
    }

    pub fn create_folder(&self, path: &str) -> Result<FolderHandle> {
        self.runtime.block_on(self.inner.create_folder(path))
    }

    pub fn get_files<'t>(&self, folder: impl Into<FolderTarget<'t>>) -> Result<Vec<FileHandle>> {
        self.runtime.block_on(self.inner.get_files(folder))
    }

    pub fn get_folders<'t>(&self, folder: impl Into<FolderTarget<'t>>) -> Result<Vec<FolderHandle>> {
        self.runtime.block_on(self.inner.get_folders(folder))
    }

    pub fn upload_file(&self, local_path: impl AsRef<Path>, target_folder: &str) -> Result<FileHandle> {
        self.runtime
            .block_on(self.inner.upload_file(local_path, target_folder))
    }

    pub fn fetch_file<'t>(&self, file: impl Into<FileTarget<'t>>) -> Result<DownloadedFile> {
        self.runtime.block_on(self.inner.fetch_file(file))
    }

    pub fn download_file<'t>(
        &self,
        file: impl Into<FileTarget<'t>>,
        download_dir: impl AsRef<Path>,
    ) -> Result<PathBuf> {
        self.runtime
            .block_on(self.inner.download_file(file, download_dir))
    }

    pub fn download_file_as<'t>(
        &self,
        file: impl Into<FileTarget<'t>>,
        download_dir: impl AsRef<Path>,
        local_name: &str,
    ) -> Result<PathBuf> {
        self.runtime
            .block_on(self.inner.download_file_as(file, download_dir, local_name))
    }

    pub fn download_files<'t>(
        &self,
        folder: impl Into<FolderTarget<'t>>,
        download_dir: impl AsRef<Path>,
    ) -> Result<Vec<(FileHandle, Result<PathBuf>)>> {
        self.runtime
            .block_on(self.inner.download_files(folder, download_dir))
    }

    pub fn move_file<'t>(&self, file: impl Into<FileTarget<'t>>, target_folder: &str) -> Result<FileHandle> {
        self.runtime.block_on(self.inner.move_file(file, target_folder))
    }

    pub fn rename_file<'t>(&self, file: impl Into<FileTarget<'t>>, new_name: &str) -> Result<FileHandle> {
        self.runtime.block_on(self.inner.rename_file(file, new_name))
    }

    pub fn delete_file<'t>(&self, file: impl Into<FileTarget<'t>>) -> Result<DeleteOutcome> {
        self.runtime.block_on(self.inner.delete_file(file))
    }

    pub fn get_folder_by_link(&self, link: &str) -> Result<FolderHandle> {
        self.runtime.block_on(self.inner.get_folder_by_link(link))
    }

    pub fn archive_files(
        &self,
        files: &[FileHandle],
        folder: &str,
        sub_folder: &str,
    ) -> Result<Vec<Result<FileHandle>>> {
        self.runtime
            .block_on(self.inner.archive_files(files, folder, sub_folder))
    }
}
