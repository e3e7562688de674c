/// Subcommands and their execution against a library client
use crate::error::Result;
use clap::Subcommand;
use serde::Serialize;
use sharepath_core::{
    DeleteOutcome, FileHandle, FolderHandle, LibraryClient, LibraryPath, RemoteStore,
};
use std::io::Write;
use std::path::PathBuf;

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Create a folder and any missing parents
    Mkdir {
        /// Library-relative folder path, e.g. `HR/Payroll/2025`
        path: String,
    },
    /// List the contents of a folder
    Ls {
        /// Library-relative folder path (root when omitted)
        #[arg(default_value = "")]
        path: String,
        /// Only list files
        #[arg(long, conflicts_with = "folders")]
        files: bool,
        /// Only list folders
        #[arg(long)]
        folders: bool,
    },
    /// Upload a local file into a folder, creating the folder chain
    Upload {
        /// Local file to upload
        local: PathBuf,
        /// Target folder (root when omitted)
        #[arg(default_value = "")]
        folder: String,
    },
    /// Download a file
    Download {
        /// Library-relative file path
        file: String,
        /// Local directory to write into
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
        /// Local file name (defaults to the remote name)
        #[arg(long = "as")]
        local_name: Option<String>,
    },
    /// Download every file directly inside a folder
    DownloadAll {
        folder: String,
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },
    /// Move a file into another folder, keeping its name
    Mv { file: String, folder: String },
    /// Rename a file inside its folder
    Rename { file: String, new_name: String },
    /// Delete a file
    Rm { file: String },
    /// Look up a folder by its server-relative URL
    Link { url: String },
    /// Move files of a folder into `<folder>/Archive/<sub_folder>`
    Archive {
        folder: String,
        sub_folder: String,
        /// File names inside `folder` (all files when omitted)
        files: Vec<String>,
    },
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Entry<'a> {
    Folder(&'a FolderHandle),
    File(&'a FileHandle),
}

#[derive(Debug, Serialize)]
struct Failure {
    target: String,
    error: String,
}

/// Writes command results either as text lines or as JSON documents.
pub struct Output<W: Write> {
    writer: W,
    json: bool,
}

impl<W: Write> Output<W> {
    pub fn new(writer: W, json: bool) -> Self {
        Self { writer, json }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn emit<T: Serialize>(&mut self, value: &T, text: impl FnOnce() -> String) -> Result<()> {
        if self.json {
            serde_json::to_writer(&mut self.writer, value)?;
            writeln!(self.writer)?;
        } else {
            writeln!(self.writer, "{}", text())?;
        }
        Ok(())
    }

    fn folder(&mut self, folder: &FolderHandle) -> Result<()> {
        self.emit(&Entry::Folder(folder), || format!("{}/", display_path(&folder.path)))
    }

    fn file(&mut self, file: &FileHandle) -> Result<()> {
        self.emit(&Entry::File(file), || format!("{}\t{}", file.path, file.size))
    }

    fn local(&mut self, path: &std::path::Path) -> Result<()> {
        self.emit(&path, || path.display().to_string())
    }

    fn failure(&mut self, target: impl Into<String>, error: &sharepath_core::LibraryError) -> Result<()> {
        let failure = Failure {
            target: target.into(),
            error: error.to_string(),
        };
        self.emit(&failure, || format!("FAILED {}: {}", failure.target, failure.error))
    }
}

fn display_path(path: &LibraryPath) -> String {
    if path.is_root() {
        String::new()
    } else {
        path.to_string()
    }
}

/// Run one command. Per-item failures of batch commands are reported in the
/// output; the returned count says how many there were.
pub async fn execute<S, W>(
    client: &LibraryClient<S>,
    command: Command,
    out: &mut Output<W>,
) -> Result<usize>
where
    S: RemoteStore,
    W: Write,
{
    let mut failures = 0;

    match command {
        Command::Mkdir { path } => {
            let folder = client.create_folder(&path).await?;
            out.folder(&folder)?;
        }
        Command::Ls {
            path,
            files,
            folders,
        } => {
            if !files {
                for folder in client.get_folders(path.as_str()).await? {
                    out.folder(&folder)?;
                }
            }
            if !folders {
                for file in client.get_files(path.as_str()).await? {
                    out.file(&file)?;
                }
            }
        }
        Command::Upload { local, folder } => {
            let file = client.upload_file(&local, &folder).await?;
            out.file(&file)?;
        }
        Command::Download {
            file,
            dir,
            local_name,
        } => {
            let written = match local_name {
                Some(name) => client.download_file_as(file.as_str(), &dir, &name).await?,
                None => client.download_file(file.as_str(), &dir).await?,
            };
            out.local(&written)?;
        }
        Command::DownloadAll { folder, dir } => {
            for (file, result) in client.download_files(folder.as_str(), &dir).await? {
                match result {
                    Ok(written) => out.local(&written)?,
                    Err(e) => {
                        failures += 1;
                        out.failure(file.path.to_string(), &e)?;
                    }
                }
            }
        }
        Command::Mv { file, folder } => {
            let moved = client.move_file(file.as_str(), &folder).await?;
            out.file(&moved)?;
        }
        Command::Rename { file, new_name } => {
            let renamed = client.rename_file(file.as_str(), &new_name).await?;
            out.file(&renamed)?;
        }
        Command::Rm { file } => {
            let outcome = client.delete_file(file.as_str()).await?;
            out.emit(&outcome, || match outcome {
                DeleteOutcome::Deleted => format!("deleted {file}"),
                DeleteOutcome::AlreadyAbsent => format!("already absent {file}"),
            })?;
        }
        Command::Link { url } => {
            let folder = client.get_folder_by_link(&url).await?;
            out.folder(&folder)?;
        }
        Command::Archive {
            folder,
            sub_folder,
            files,
        } => {
            let selected = if files.is_empty() {
                client.get_files(folder.as_str()).await?
            } else {
                let base = LibraryPath::parse(&folder)?;
                let mut selected = Vec::with_capacity(files.len());
                for name in &files {
                    selected.push(client.resolve_file(&base.join(name).to_string()).await?);
                }
                selected
            };

            let results = client.archive_files(&selected, &folder, &sub_folder).await?;
            for (file, result) in selected.iter().zip(results) {
                match result {
                    Ok(archived) => out.file(&archived)?,
                    Err(e) => {
                        failures += 1;
                        out.failure(file.path.to_string(), &e)?;
                    }
                }
            }
        }
    }

    Ok(failures)
}
