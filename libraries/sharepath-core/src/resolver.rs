//! Path resolution against a remote store.
//!
//! The resolver walks from the Library Root one segment at a time, listing
//! each folder and picking the child whose name matches. Missing folders are
//! either reported or created, depending on [`MissingFolders`].

use crate::error::{LibraryError, Result, StoreError};
use crate::path::LibraryPath;
use crate::store::RemoteStore;
use crate::types::{FileHandle, FolderHandle, LibraryRoot, RemoteItem};
use tracing::{debug, info, warn};

/// What `resolve_folder` does when a segment does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingFolders {
    /// Fail with `NotFound` naming the first missing segment
    Fail,
    /// Create the segment and keep walking
    Create,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wanted {
    Folder,
    File,
}

impl Wanted {
    fn accepts(self, item: &RemoteItem) -> bool {
        match self {
            Wanted::Folder => item.is_folder(),
            Wanted::File => item.is_file(),
        }
    }
}

/// Translates library paths into handles.
pub struct Resolver<'a, S: RemoteStore + ?Sized> {
    store: &'a S,
    root: &'a LibraryRoot,
}

impl<'a, S: RemoteStore + ?Sized> Resolver<'a, S> {
    pub fn new(store: &'a S, root: &'a LibraryRoot) -> Self {
        Self { store, root }
    }

    /// Resolve `path` to a folder, optionally creating missing segments.
    ///
    /// Each created folder is its own step. If step k fails, steps 1..k-1
    /// stay committed and the error names segment k.
    pub async fn resolve_folder(
        &self,
        path: &LibraryPath,
        missing: MissingFolders,
    ) -> Result<FolderHandle> {
        let mut current = self.root.folder().as_item();

        for (index, segment) in path.segments().iter().enumerate() {
            let here = path.prefix(index + 1);
            let children = self.list(&current).await?;

            current = match self.pick(&children, segment, &here, Wanted::Folder)? {
                Some(found) => {
                    debug!(path = %here, "Descending into existing folder");
                    found
                }
                None if missing == MissingFolders::Fail => {
                    return Err(LibraryError::not_found(path.to_string(), here.to_string()));
                }
                None => self.create_segment(&current, segment, index + 1, &here).await?,
            };
        }

        current
            .into_folder()
            .ok_or_else(|| LibraryError::NotAFolder(path.to_string()))
    }

    /// Resolve `path` to an existing file. Nothing is ever created.
    pub async fn resolve_file(&self, path: &LibraryPath) -> Result<FileHandle> {
        let (Some(parent), Some(name)) = (path.parent(), path.name()) else {
            return Err(LibraryError::invalid_path("", "the library root is not a file"));
        };

        let folder = self.resolve_folder(&parent, MissingFolders::Fail).await?;
        let children = self.list(&folder.as_item()).await?;

        self.pick(&children, name, path, Wanted::File)?
            .and_then(RemoteItem::into_file)
            .ok_or_else(|| LibraryError::not_found(path.to_string(), path.to_string()))
    }

    /// List a folder, mapping a vanished folder onto `NotFound`.
    pub(crate) async fn list(&self, folder: &RemoteItem) -> Result<Vec<RemoteItem>> {
        match self.store.list_children(folder).await {
            Ok(children) => Ok(children),
            Err(StoreError::NotFound(_)) => Err(LibraryError::not_found(
                folder.path.to_string(),
                folder.path.to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// Choose the child named `name`.
    ///
    /// An exact match always wins. On a case-insensitive store a single
    /// case-variant match stands in for it; several variants are ambiguous.
    fn pick(
        &self,
        children: &[RemoteItem],
        name: &str,
        here: &LibraryPath,
        wanted: Wanted,
    ) -> Result<Option<RemoteItem>> {
        if let Some(exact) = children.iter().find(|c| c.name == name) {
            if wanted.accepts(exact) {
                return Ok(Some(exact.clone()));
            }
            return match wanted {
                Wanted::Folder => Err(LibraryError::NotAFolder(here.to_string())),
                Wanted::File => Ok(None),
            };
        }

        if !self.store.case_insensitive() {
            return Ok(None);
        }

        let lowered = name.to_lowercase();
        let variants: Vec<&RemoteItem> = children
            .iter()
            .filter(|c| c.name.to_lowercase() == lowered)
            .collect();

        match variants.as_slice() {
            [] => Ok(None),
            [only] if wanted.accepts(only) => Ok(Some((*only).clone())),
            [_] if wanted == Wanted::Folder => Err(LibraryError::NotAFolder(here.to_string())),
            [_] => Ok(None),
            many => Err(LibraryError::Ambiguous {
                path: here.to_string(),
                candidates: many.iter().map(|c| c.name.clone()).collect(),
            }),
        }
    }

    async fn create_segment(
        &self,
        parent: &RemoteItem,
        segment: &str,
        depth: usize,
        here: &LibraryPath,
    ) -> Result<RemoteItem> {
        let failed = |source: StoreError| LibraryError::FolderCreation {
            segment: segment.to_string(),
            depth,
            committed: parent.path.to_string(),
            source,
        };

        match self.store.create_folder(parent, segment).await {
            Ok(created) => {
                info!(path = %here, "Created folder");
                Ok(created)
            }
            Err(StoreError::AlreadyExists(existing)) => {
                warn!(path = %here, "Folder appeared concurrently, reusing it");
                let children = self.store.list_children(parent).await.map_err(failed)?;
                self.pick(&children, segment, here, Wanted::Folder)?
                    .ok_or_else(|| failed(StoreError::AlreadyExists(existing)))
            }
            Err(source) => Err(failed(source)),
        }
    }
}
