//! Common test utilities and fixtures
#![allow(dead_code)]

use sharepath_cli::{execute, Command, Output};
use sharepath_core::{ClientOptions, LibraryClient, MemoryStore};

pub async fn memory_client(options: ClientOptions) -> LibraryClient<MemoryStore> {
    LibraryClient::open(MemoryStore::new("Documents"), options)
        .await
        .unwrap()
}

/// Run a command and return its output lines and failure count.
pub async fn run(
    client: &LibraryClient<MemoryStore>,
    command: Command,
    json: bool,
) -> sharepath_cli::Result<(Vec<String>, usize)> {
    let mut out = Output::new(Vec::new(), json);
    let failures = execute(client, command, &mut out).await?;
    let text = String::from_utf8(out.into_inner()).unwrap();
    Ok((text.lines().map(str::to_string).collect(), failures))
}

pub fn local_file(dir: &tempfile::TempDir, name: &str, content: &[u8]) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}
