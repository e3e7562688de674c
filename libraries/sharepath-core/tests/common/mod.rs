//! Shared fixtures for the sharepath-core integration tests
#![allow(dead_code)]

use sharepath_core::{ClientOptions, LibraryClient, MemoryStore};
use std::path::{Path, PathBuf};

pub const LIBRARY_TITLE: &str = "Documents";

/// Open a client over an empty, case-insensitive in-memory library
pub async fn memory_client(options: ClientOptions) -> LibraryClient<MemoryStore> {
    LibraryClient::open(MemoryStore::new(LIBRARY_TITLE), options)
        .await
        .expect("memory store always opens")
}

/// Open a client over an empty, case-sensitive in-memory library
pub async fn case_sensitive_client() -> LibraryClient<MemoryStore> {
    LibraryClient::open(MemoryStore::case_sensitive(LIBRARY_TITLE), ClientOptions::default())
        .await
        .expect("memory store always opens")
}

/// Write a local file for upload tests and return its path
pub fn local_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).expect("write local fixture");
    path
}

/// Names of a listing, sorted
pub fn names<T, F>(items: &[T], name: F) -> Vec<String>
where
    F: Fn(&T) -> &str,
{
    let mut names: Vec<String> = items.iter().map(|i| name(i).to_string()).collect();
    names.sort();
    names
}
