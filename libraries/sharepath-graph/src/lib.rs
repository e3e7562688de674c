//! Sharepath Graph
//!
//! Microsoft Graph transport for `sharepath-core`.
//!
//! # Features
//!
//! - **Authentication**: static bearer token, client secret, or a
//!   certificate-signed client assertion (see [`TokenProvider`])
//! - **Library binding**: the site and the library's drive are resolved once
//!   at connect time
//! - **Transfers**: single-request uploads up to 4 MiB, upload sessions above
//! - **Listings**: paged children listings are followed to the end
//!
//! # Example
//!
//! ```ignore
//! use sharepath_core::ClientOptions;
//! use sharepath_graph::{Credential, GraphSettings};
//!
//! let settings = GraphSettings::new(
//!     "tenant-id",
//!     "client-id",
//!     Credential::ClientSecret { secret: "...".into() },
//!     "contoso.sharepoint.com",
//!     "/sites/Team",
//!     "Documents",
//! );
//! let client = sharepath_graph::connect(&settings, ClientOptions::default()).await?;
//! client.upload_file("report.xlsx", "HR/Payroll/2025").await?;
//! ```

#![forbid(unsafe_code)]

mod auth;
mod error;
mod http;
mod models;
mod settings;
mod store;

pub use auth::{token_provider, ClientCredentials, StaticToken, TokenProvider, GRAPH_SCOPE};
pub use error::{GraphError, Result};
pub use settings::{
    Credential, GraphSettings, DEFAULT_GRAPH_BASE_URL, DEFAULT_LOGIN_BASE_URL,
    DEFAULT_UPLOAD_CHUNK_SIZE, SIMPLE_UPLOAD_LIMIT, UPLOAD_CHUNK_ALIGNMENT,
};
pub use store::GraphStore;

use sharepath_core::{BlockingLibraryClient, ClientOptions, LibraryClient};

/// Connect to the configured library and open a client on it.
pub async fn connect(
    settings: &GraphSettings,
    options: ClientOptions,
) -> sharepath_core::Result<LibraryClient<GraphStore>> {
    let store = GraphStore::connect(settings).await?;
    LibraryClient::open(store, options).await
}

/// Blocking variant of [`connect`].
pub fn connect_blocking(
    settings: GraphSettings,
    options: ClientOptions,
) -> sharepath_core::Result<BlockingLibraryClient<GraphStore>> {
    BlockingLibraryClient::connect(
        || async move { GraphStore::connect(&settings).await },
        options,
    )
}
