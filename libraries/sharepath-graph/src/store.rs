//! [`RemoteStore`] over the Microsoft Graph drives API.
//!
//! A SharePoint document library is a Graph drive. Items are addressed by
//! id once resolved; direct path lookups use the `root:/path` syntax.

use crate::auth::{token_provider, TokenProvider};
use crate::error::{GraphError, Result};
use crate::http::{build_client, check, json};
use crate::models::{DriveDto, DriveItemDto, Page, SiteDto, UploadSessionDto};
use crate::settings::{GraphSettings, SIMPLE_UPLOAD_LIMIT};
use async_trait::async_trait;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::json;
use sharepath_core::{LibraryPath, LibraryRoot, RemoteItem, RemoteStore, StoreResult};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Characters escaped inside a single path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b':')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'\'');

/// A document library reached through Graph.
pub struct GraphStore {
    http: Client,
    tokens: Arc<dyn TokenProvider>,
    base_url: String,
    drive_id: String,
    root: LibraryRoot,
    chunk_size: usize,
}

impl GraphStore {
    /// Authenticate, then resolve the site, the library's drive and its root.
    ///
    /// Lookups are retried up to `connect_attempts` times; rejected
    /// credentials and an unknown library title fail immediately.
    pub async fn connect(settings: &GraphSettings) -> Result<Self> {
        settings.validate()?;

        let http = build_client(settings.timeout())?;
        let tokens = token_provider(settings, &http)?;

        let mut attempt = 1;
        loop {
            match Self::bind(settings, http.clone(), Arc::clone(&tokens)).await {
                Ok(store) => return Ok(store),
                Err(
                    e @ (GraphError::LibraryNotFound { .. }
                    | GraphError::Configuration(_)
                    | GraphError::AuthFailed(_)
                    | GraphError::Unauthorized(_)),
                ) => return Err(e),
                Err(e) if attempt < settings.connect_attempts => {
                    warn!(attempt, error = %e, "Connecting to SharePoint failed, retrying");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn bind(
        settings: &GraphSettings,
        http: Client,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Self> {
        let base_url = settings.graph_base_url.trim_end_matches('/').to_string();
        let mut store = Self {
            http,
            tokens,
            base_url,
            drive_id: String::new(),
            root: LibraryRoot {
                title: settings.library.clone(),
                library_id: String::new(),
                root_item_id: String::new(),
                web_url: None,
                server_relative_url: String::new(),
            },
            chunk_size: settings.upload_chunk_size,
        };

        let site = store.site(&settings.site_hostname, &settings.site_path).await?;
        let drive = store.drive(&site.id, &settings.library).await?;
        store.drive_id.clone_from(&drive.id);

        let root_item: DriveItemDto = {
            let url = format!("{}/drives/{}/root", store.base_url, drive.id);
            let response = store.send(store.http.get(&url), "library root").await?;
            json(response, "library root").await?
        };

        let server_relative_url = drive
            .web_url
            .as_deref()
            .and_then(server_relative)
            .unwrap_or_else(|| format!("{}/{}", settings.site_path.trim_end_matches('/'), drive.name));

        store.root = LibraryRoot {
            title: drive.name,
            library_id: drive.id,
            root_item_id: root_item.id,
            web_url: drive.web_url,
            server_relative_url,
        };

        info!(
            site = %site.id,
            drive = %store.drive_id,
            url = %store.root.server_relative_url,
            "Bound to SharePoint library"
        );
        Ok(store)
    }

    async fn site(&self, hostname: &str, site_path: &str) -> Result<SiteDto> {
        let url = format!("{}/sites/{}:{}", self.base_url, hostname.trim(), site_path);
        let what = format!("site {hostname}{site_path}");
        let response = self.send(self.http.get(&url), &what).await?;
        json(response, "site").await
    }

    async fn drive(&self, site_id: &str, title: &str) -> Result<DriveDto> {
        let url = format!("{}/sites/{}/drives", self.base_url, site_id);
        let mut drives: Vec<DriveDto> = self.collect_pages(url, "site drives").await?;

        let exact = drives.iter().position(|d| d.name == title);
        let position = exact.or_else(|| {
            let mut variants = drives
                .iter()
                .enumerate()
                .filter(|(_, d)| d.name.eq_ignore_ascii_case(title));
            match (variants.next(), variants.next()) {
                (Some((index, _)), None) => Some(index),
                _ => None,
            }
        });

        match position {
            Some(index) => Ok(drives.swap_remove(index)),
            None => Err(GraphError::LibraryNotFound {
                title: title.to_string(),
                available: drives.into_iter().map(|d| d.name).collect(),
            }),
        }
    }

    pub fn drive_id(&self) -> &str {
        &self.drive_id
    }

    fn item_url(&self, id: &str) -> String {
        format!("{}/drives/{}/items/{}", self.base_url, self.drive_id, id)
    }

    /// Attach the bearer token, send, and map the status.
    async fn send(&self, request: RequestBuilder, what: &str) -> Result<reqwest::Response> {
        let token = self.tokens.access_token().await?;
        let response = request
            .bearer_auth(token)
            .header("Accept", "application/json")
            .send()
            .await?;
        debug!(resource = %what, status = %response.status(), "Graph request");
        check(response, what).await
    }

    /// Follow `@odata.nextLink` until the listing is exhausted.
    async fn collect_pages<T: serde::de::DeserializeOwned>(
        &self,
        first: String,
        what: &str,
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut next = Some(first);
        let mut pages = 0;

        while let Some(url) = next {
            let response = self.send(self.http.get(&url), what).await?;
            let page: Page<T> = json(response, what).await?;
            items.extend(page.value);
            next = page.next_link;
            pages += 1;
        }

        debug!(resource = %what, pages, count = items.len(), "Collected listing");
        Ok(items)
    }

    async fn upload_small(
        &self,
        parent: &RemoteItem,
        name: &str,
        content: Vec<u8>,
        replace: bool,
    ) -> Result<DriveItemDto> {
        let url = format!(
            "{}:/{}:/content?@microsoft.graph.conflictBehavior={}",
            self.item_url(&parent.id),
            encode_segment(name),
            conflict_behavior(replace)
        );
        let what = parent.path.join(name).to_string();
        let response = self.send(self.http.put(&url).body(content), &what).await?;
        json(response, "uploaded item").await
    }

    /// Upload through a resumable session, `chunk_size` bytes at a time.
    async fn upload_session(
        &self,
        parent: &RemoteItem,
        name: &str,
        content: Vec<u8>,
        replace: bool,
    ) -> Result<DriveItemDto> {
        let what = parent.path.join(name).to_string();
        let url = format!(
            "{}:/{}:/createUploadSession",
            self.item_url(&parent.id),
            encode_segment(name)
        );
        let body = json!({
            "item": { "@microsoft.graph.conflictBehavior": conflict_behavior(replace) }
        });
        let response = self.send(self.http.post(&url).json(&body), &what).await?;
        let session: UploadSessionDto = json(response, "upload session").await?;

        let total = content.len();
        let mut offset = 0;
        while offset < total {
            let end = (offset + self.chunk_size).min(total);
            debug!(file = %what, start = offset, end, total, "Uploading chunk");

            // The upload URL is pre-authenticated; Graph rejects a bearer token here
            let response = self
                .http
                .put(&session.upload_url)
                .header("Content-Range", format!("bytes {}-{}/{}", offset, end - 1, total))
                .body(content[offset..end].to_vec())
                .send()
                .await?;
            let response = check(response, &what).await?;

            offset = end;
            if offset >= total
                || matches!(response.status(), StatusCode::OK | StatusCode::CREATED)
            {
                return json(response, "uploaded item").await;
            }
        }

        Err(GraphError::Parse(format!(
            "upload session for '{what}' ended without an item"
        )))
    }
}

#[async_trait]
impl RemoteStore for GraphStore {
    fn case_insensitive(&self) -> bool {
        true
    }

    async fn library_root(&self) -> StoreResult<LibraryRoot> {
        Ok(self.root.clone())
    }

    async fn list_children(&self, folder: &RemoteItem) -> StoreResult<Vec<RemoteItem>> {
        let url = format!("{}/children", self.item_url(&folder.id));
        let children: Vec<DriveItemDto> = self
            .collect_pages(url, &folder.path.to_string())
            .await?;

        Ok(children
            .into_iter()
            .filter_map(|child| {
                let Some(name) = child.name.as_deref().filter(|n| !n.is_empty()) else {
                    debug!(folder = %folder.path, id = %child.id, "Skipping child without a name");
                    return None;
                };
                let path = folder.path.join(name);
                Some(child.into_item(path))
            })
            .collect())
    }

    async fn get_item(&self, path: &LibraryPath) -> StoreResult<Option<RemoteItem>> {
        let url = if path.is_root() {
            format!("{}/drives/{}/root", self.base_url, self.drive_id)
        } else {
            let encoded: Vec<String> = path.segments().iter().map(|s| encode_segment(s)).collect();
            format!(
                "{}/drives/{}/root:/{}",
                self.base_url,
                self.drive_id,
                encoded.join("/")
            )
        };

        match self.send(self.http.get(&url), &path.to_string()).await {
            Ok(response) => {
                let item: DriveItemDto = json(response, "drive item").await?;
                Ok(Some(item.into_item(path.clone())))
            }
            Err(GraphError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn create_folder(&self, parent: &RemoteItem, name: &str) -> StoreResult<RemoteItem> {
        let url = format!("{}/children", self.item_url(&parent.id));
        let path = parent.path.join(name);
        let body = json!({
            "name": name,
            "folder": {},
            "@microsoft.graph.conflictBehavior": "fail",
        });

        let response = self
            .send(self.http.post(&url).json(&body), &path.to_string())
            .await?;
        let created: DriveItemDto = json(response, "created folder").await?;
        debug!(path = %path, id = %created.id, "Graph created folder");
        Ok(created.into_item(path))
    }

    async fn upload(
        &self,
        parent: &RemoteItem,
        name: &str,
        content: Vec<u8>,
        replace: bool,
    ) -> StoreResult<RemoteItem> {
        let path = parent.path.join(name);
        let uploaded = if content.len() > SIMPLE_UPLOAD_LIMIT {
            self.upload_session(parent, name, content, replace).await?
        } else {
            self.upload_small(parent, name, content, replace).await?
        };
        Ok(uploaded.into_item(path))
    }

    async fn download(&self, file: &RemoteItem) -> StoreResult<Vec<u8>> {
        let url = format!("{}/content", self.item_url(&file.id));
        let response = self
            .send(self.http.get(&url), &file.path.to_string())
            .await?;
        let bytes = response.bytes().await.map_err(GraphError::Request)?;
        Ok(bytes.to_vec())
    }

    async fn move_item(
        &self,
        item: &RemoteItem,
        new_parent: &RemoteItem,
        new_name: &str,
        replace: bool,
    ) -> StoreResult<RemoteItem> {
        let path = new_parent.path.join(new_name);
        let url = format!(
            "{}?@microsoft.graph.conflictBehavior={}",
            self.item_url(&item.id),
            conflict_behavior(replace)
        );
        let body = json!({
            "parentReference": { "id": new_parent.id },
            "name": new_name,
        });

        let response = self
            .send(self.http.patch(&url).json(&body), &path.to_string())
            .await?;
        let moved: DriveItemDto = json(response, "moved item").await?;
        Ok(moved.into_item(path))
    }

    async fn delete(&self, item: &RemoteItem) -> StoreResult<()> {
        self.send(self.http.delete(self.item_url(&item.id)), &item.path.to_string())
            .await?;
        Ok(())
    }
}

fn conflict_behavior(replace: bool) -> &'static str {
    if replace {
        "replace"
    } else {
        "fail"
    }
}

fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT).to_string()
}

/// `https://contoso.sharepoint.com/sites/Team/Shared%20Documents` becomes
/// `/sites/Team/Shared Documents`.
fn server_relative(web_url: &str) -> Option<String> {
    let url = Url::parse(web_url).ok()?;
    let decoded = percent_decode_str(url.path()).decode_utf8().ok()?;
    Some(decoded.trim_end_matches('/').to_string())
}
