//! Sharepath CLI Library
//!
//! Command-line access to a SharePoint document library: configuration
//! loading and the subcommands of the `sharepath` binary.
//!
//! This library exposes the command layer for testing purposes.

pub mod commands;
pub mod config;
pub mod error;

pub use commands::{execute, Command, Output};
pub use config::CliConfig;
pub use error::{CliError, Result};
