//! Structural operations on resolved handles.

use crate::error::{LibraryError, Result, StoreError};
use crate::options::{suffixed_name, ClientOptions, ConflictPolicy, DeleteMode};
use crate::path::{validate_name, LibraryPath};
use crate::resolver::{MissingFolders, Resolver};
use crate::store::RemoteStore;
use crate::types::{
    DeleteOutcome, DownloadedFile, FileHandle, FolderHandle, LibraryRoot, RemoteItem,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Folder argument after path normalization.
pub(crate) enum FolderRef<'h> {
    Path(LibraryPath),
    Handle(&'h FolderHandle),
}

/// File argument after path normalization.
pub(crate) enum FileRef<'h> {
    Path(LibraryPath),
    Handle(&'h FileHandle),
}

/// Name chosen for an incoming item, and whether it overwrites the file
/// holding that name under `ConflictPolicy::Replace`.
struct Claim {
    name: String,
    replace: bool,
}

pub(crate) struct Operations<'a, S: RemoteStore + ?Sized> {
    store: &'a S,
    root: &'a LibraryRoot,
    options: &'a ClientOptions,
}

impl<'a, S: RemoteStore + ?Sized> Operations<'a, S> {
    pub(crate) fn new(store: &'a S, root: &'a LibraryRoot, options: &'a ClientOptions) -> Self {
        Self {
            store,
            root,
            options,
        }
    }

    fn resolver(&self) -> Resolver<'a, S> {
        Resolver::new(self.store, self.root)
    }

    async fn folder(&self, target: FolderRef<'_>, missing: MissingFolders) -> Result<FolderHandle> {
        match target {
            FolderRef::Path(path) => self.resolver().resolve_folder(&path, missing).await,
            FolderRef::Handle(handle) => Ok(handle.clone()),
        }
    }

    async fn file(&self, target: FileRef<'_>) -> Result<FileHandle> {
        match target {
            FileRef::Path(path) => self.resolver().resolve_file(&path).await,
            FileRef::Handle(handle) => Ok(handle.clone()),
        }
    }

    pub(crate) async fn create_folder(&self, path: &LibraryPath) -> Result<FolderHandle> {
        self.resolver()
            .resolve_folder(path, MissingFolders::Create)
            .await
    }

    pub(crate) async fn get_files(&self, target: FolderRef<'_>) -> Result<Vec<FileHandle>> {
        let folder = self.folder(target, MissingFolders::Fail).await?;
        let children = self.resolver().list(&folder.as_item()).await?;
        let files: Vec<FileHandle> = children.into_iter().filter_map(RemoteItem::into_file).collect();
        debug!(folder = %folder.path, count = files.len(), "Listed files");
        Ok(files)
    }

    pub(crate) async fn get_folders(&self, target: FolderRef<'_>) -> Result<Vec<FolderHandle>> {
        let folder = self.folder(target, MissingFolders::Fail).await?;
        let children = self.resolver().list(&folder.as_item()).await?;
        Ok(children
            .into_iter()
            .filter_map(RemoteItem::into_folder)
            .collect())
    }

    pub(crate) async fn upload_file(
        &self,
        local_path: &Path,
        target: &LibraryPath,
    ) -> Result<FileHandle> {
        let file_name = local_file_name(local_path)?;
        let content = read_local(local_path).await?;

        let folder = self
            .resolver()
            .resolve_folder(target, MissingFolders::Create)
            .await?;
        let folder_item = folder.as_item();
        let claim = self.claim_name(&folder_item, &file_name, None).await?;
        let size = content.len();

        let uploaded = self
            .store
            .upload(&folder_item, &claim.name, content, claim.replace)
            .await
            .map_err(|e| self.commit_error(e, &folder.path.join(&claim.name)))?;

        info!(
            local = %local_path.display(),
            remote = %uploaded.path,
            size = size,
            "Uploaded file"
        );
        expect_file(uploaded)
    }

    pub(crate) async fn fetch_file(&self, target: FileRef<'_>) -> Result<DownloadedFile> {
        let file = self.file(target).await?;
        let content = self
            .store
            .download(&file.as_item())
            .await
            .map_err(|e| self.commit_error(e, &file.path))?;
        Ok(DownloadedFile {
            file_name: file.name,
            content,
        })
    }

    pub(crate) async fn download_file(
        &self,
        target: FileRef<'_>,
        download_dir: &Path,
        local_name: Option<&str>,
    ) -> Result<PathBuf> {
        if let Some(name) = local_name {
            validate_name(name)?;
        }

        let fetched = self.fetch_file(target).await?;
        tokio::fs::create_dir_all(download_dir).await?;

        let dest = download_dir.join(local_name.unwrap_or(&fetched.file_name));
        tokio::fs::write(&dest, &fetched.content).await?;

        info!(
            file = %fetched.file_name,
            dest = %dest.display(),
            size = fetched.content.len(),
            "Downloaded file"
        );
        Ok(dest)
    }

    pub(crate) async fn download_files(
        &self,
        target: FolderRef<'_>,
        download_dir: &Path,
    ) -> Result<Vec<(FileHandle, Result<PathBuf>)>> {
        let files = self.get_files(target).await?;
        let mut results = Vec::with_capacity(files.len());

        for file in files {
            let result = self
                .download_file(FileRef::Handle(&file), download_dir, None)
                .await;
            if let Err(e) = &result {
                warn!(file = %file.path, error = %e, "Download failed");
            }
            results.push((file, result));
        }

        Ok(results)
    }

    pub(crate) async fn move_file(
        &self,
        target: FileRef<'_>,
        target_folder: &LibraryPath,
    ) -> Result<FileHandle> {
        let file = self.file(target).await?;
        let dest = self
            .resolver()
            .resolve_folder(target_folder, MissingFolders::Create)
            .await?;
        self.move_into(&file, &dest).await
    }

    async fn move_into(&self, file: &FileHandle, dest: &FolderHandle) -> Result<FileHandle> {
        if file.parent_path() == dest.path {
            debug!(file = %file.path, "File already in target folder");
            return Ok(file.clone());
        }

        let dest_item = dest.as_item();
        let claim = self.claim_name(&dest_item, &file.name, Some(&file.id)).await?;
        let moved = self.commit_move(file, &dest_item, &claim).await?;

        info!(from = %file.path, to = %moved.path, "Moved file");
        expect_file(moved)
    }

    pub(crate) async fn rename_file(&self, target: FileRef<'_>, new_name: &str) -> Result<FileHandle> {
        validate_name(new_name)?;

        let file = self.file(target).await?;
        if file.name == new_name {
            return Ok(file);
        }

        let parent = self
            .resolver()
            .resolve_folder(&file.parent_path(), MissingFolders::Fail)
            .await?;
        let parent_item = parent.as_item();
        let claim = self.claim_name(&parent_item, new_name, Some(&file.id)).await?;
        let renamed = self.commit_move(&file, &parent_item, &claim).await?;

        info!(from = %file.path, to = %renamed.path, "Renamed file");
        expect_file(renamed)
    }

    pub(crate) async fn delete_file(&self, target: FileRef<'_>) -> Result<DeleteOutcome> {
        let file = match self.file(target).await {
            Ok(file) => file,
            Err(e) if e.is_not_found() => return self.absent(e),
            Err(e) => return Err(e),
        };

        match self.store.delete(&file.as_item()).await {
            Ok(()) => {
                info!(file = %file.path, "Deleted file");
                Ok(DeleteOutcome::Deleted)
            }
            Err(StoreError::NotFound(_)) => self.absent(LibraryError::not_found(
                file.path.to_string(),
                file.path.to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    fn absent(&self, error: LibraryError) -> Result<DeleteOutcome> {
        match self.options.delete_mode {
            DeleteMode::Strict => Err(error),
            DeleteMode::Idempotent => {
                debug!(error = %error, "Delete target already absent");
                Ok(DeleteOutcome::AlreadyAbsent)
            }
        }
    }

    pub(crate) async fn get_folder_by_link(&self, link: &str) -> Result<FolderHandle> {
        let relative = self
            .root
            .relative_path_of(link)
            .ok_or_else(|| LibraryError::not_found(link, link))?;
        let path = LibraryPath::parse(&relative)?;
        if path.is_root() {
            return Ok(self.root.folder());
        }

        match self.store.get_item(&path).await? {
            Some(item) if item.is_folder() => {
                debug!(link = %link, path = %item.path, "Accessed folder by link");
                expect_folder(item)
            }
            Some(_) => Err(LibraryError::NotAFolder(path.to_string())),
            None => Err(LibraryError::not_found(link, link)),
        }
    }

    pub(crate) async fn archive_files(
        &self,
        files: &[FileHandle],
        folder: &LibraryPath,
        sub_folder: &str,
    ) -> Result<Vec<Result<FileHandle>>> {
        validate_name(sub_folder)?;
        if files.is_empty() {
            return Ok(Vec::new());
        }

        let archive_path = folder.join("Archive").join(sub_folder);
        let archive = self
            .resolver()
            .resolve_folder(&archive_path, MissingFolders::Create)
            .await?;

        let mut results = Vec::with_capacity(files.len());
        for file in files {
            let result = self.move_into(file, &archive).await;
            if let Err(e) = &result {
                warn!(file = %file.path, error = %e, "Archiving file failed");
            }
            results.push(result);
        }
        Ok(results)
    }

    /// Pick the name an incoming item will take in `folder`.
    async fn claim_name(
        &self,
        folder: &RemoteItem,
        name: &str,
        moving: Option<&str>,
    ) -> Result<Claim> {
        let children = self.resolver().list(folder).await?;

        let Some(existing) = self.find_taken(&children, name, moving) else {
            return Ok(Claim {
                name: name.to_string(),
                replace: false,
            });
        };

        match self.options.conflict_policy {
            ConflictPolicy::Reject => Err(LibraryError::Conflict(folder.path.join(name).to_string())),
            ConflictPolicy::Replace if existing.is_file() => Ok(Claim {
                name: existing.name.clone(),
                replace: true,
            }),
            ConflictPolicy::Replace => Err(LibraryError::Conflict(existing.path.to_string())),
            ConflictPolicy::AutoSuffix => {
                let mut n = 1;
                loop {
                    let candidate = suffixed_name(name, n);
                    if self.find_taken(&children, &candidate, moving).is_none() {
                        debug!(requested = %name, chosen = %candidate, "Name taken, using suffix");
                        return Ok(Claim {
                            name: candidate,
                            replace: false,
                        });
                    }
                    n += 1;
                }
            }
        }
    }

    fn find_taken<'c>(
        &self,
        children: &'c [RemoteItem],
        name: &str,
        moving: Option<&str>,
    ) -> Option<&'c RemoteItem> {
        let case_insensitive = self.store.case_insensitive();
        children.iter().find(|child| {
            Some(child.id.as_str()) != moving
                && (child.name == name
                    || (case_insensitive && child.name.to_lowercase() == name.to_lowercase()))
        })
    }

    /// Move `file` into `dest` under the claimed name. Any replacement
    /// happens inside the store call.
    async fn commit_move(
        &self,
        file: &FileHandle,
        dest: &RemoteItem,
        claim: &Claim,
    ) -> Result<RemoteItem> {
        let target = dest.path.join(&claim.name);
        if claim.replace {
            warn!(path = %target, "Replacing existing file");
        }

        match self
            .store
            .move_item(&file.as_item(), dest, &claim.name, claim.replace)
            .await
        {
            Ok(moved) => Ok(moved),
            Err(StoreError::NotFound(_)) => Err(LibraryError::not_found(
                file.path.to_string(),
                file.path.to_string(),
            )),
            Err(StoreError::AlreadyExists(_)) => Err(LibraryError::Conflict(target.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    /// Map a store error raised while committing a mutation.
    fn commit_error(&self, error: StoreError, path: &LibraryPath) -> LibraryError {
        match error {
            StoreError::AlreadyExists(_) => LibraryError::Conflict(path.to_string()),
            StoreError::NotFound(_) => LibraryError::not_found(path.to_string(), path.to_string()),
            other => other.into(),
        }
    }
}

fn local_file_name(local_path: &Path) -> Result<String> {
    let name = local_path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| LibraryError::invalid_name(local_path.display().to_string(), "no usable file name"))?;
    validate_name(name)?;
    Ok(name.to_string())
}

async fn read_local(local_path: &Path) -> Result<Vec<u8>> {
    match tokio::fs::metadata(local_path).await {
        Ok(meta) if meta.is_file() => Ok(tokio::fs::read(local_path).await?),
        Ok(_) => Err(LibraryError::LocalFileNotFound(local_path.to_path_buf())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(LibraryError::LocalFileNotFound(local_path.to_path_buf()))
        }
        Err(e) => Err(e.into()),
    }
}

fn expect_file(item: RemoteItem) -> Result<FileHandle> {
    let path = item.path.to_string();
    item.into_file().ok_or_else(|| {
        StoreError::other(format!("store returned a folder where a file was expected: {path}"))
            .into()
    })
}

fn expect_folder(item: RemoteItem) -> Result<FolderHandle> {
    let path = item.path.to_string();
    item.into_folder()
        .ok_or(LibraryError::NotAFolder(path))
}
