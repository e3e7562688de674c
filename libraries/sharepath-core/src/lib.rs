//! Sharepath Core
//!
//! Path-addressed folder and file operations over a remote document library.
//!
//! Callers name folders and files with slash-separated paths relative to the
//! library root. The [`Resolver`] turns those paths into handles, creating
//! intermediate folders on demand, and the [`LibraryClient`] exposes the
//! structural operations (create, list, upload, download, move, rename,
//! delete) on top of it.
//!
//! # Architecture
//!
//! - **Remote store**: the [`RemoteStore`] trait is the only place that talks
//!   to the network. `sharepath-graph` implements it over Microsoft Graph;
//!   [`MemoryStore`] implements it in memory.
//! - **Resolver**: walks paths segment by segment, see [`MissingFolders`].
//! - **Client facade**: [`LibraryClient`] (async) and
//!   [`BlockingLibraryClient`] (blocking).
//!
//! # Example
//!
//! ```rust
//! use sharepath_core::{BlockingLibraryClient, ClientOptions, MemoryStore};
//!
//! let client = BlockingLibraryClient::open(MemoryStore::new("Documents"), ClientOptions::default())?;
//! let folder = client.create_folder("A/B/C")?;
//! assert_eq!(folder.path.to_string(), "A/B/C");
//! assert!(client.get_files("A/B/C")?.is_empty());
//! # Ok::<(), sharepath_core::LibraryError>(())
//! ```

#![forbid(unsafe_code)]

mod blocking;
mod client;
mod error;
mod memory;
mod operations;
mod options;
mod path;
mod resolver;
mod store;
mod types;

pub use blocking::BlockingLibraryClient;
pub use client::LibraryClient;
pub use error::{LibraryError, Result, StoreError, StoreResult};
pub use memory::MemoryStore;
pub use options::{ClientOptions, ConflictPolicy, DeleteMode};
pub use path::{validate_name, LibraryPath};
pub use resolver::{MissingFolders, Resolver};
pub use store::RemoteStore;
pub use types::{
    DeleteOutcome, DownloadedFile, FileHandle, FileTarget, FolderHandle, FolderTarget, ItemKind,
    LibraryRoot, Properties, RemoteItem,
};
