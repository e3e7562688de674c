//! In-memory remote store.
//!
//! Behaves like a SharePoint library for structural purposes: folder and
//! file names are unique per folder (case-insensitively unless built with
//! [`MemoryStore::case_sensitive`]), collisions report `AlreadyExists` and
//! unknown items report `NotFound`. Failure injection hooks let tests
//! reproduce partial folder creation and creation races.

use crate::error::{StoreError, StoreResult};
use crate::path::LibraryPath;
use crate::store::RemoteStore;
use crate::types::{ItemKind, LibraryRoot, Properties, RemoteItem};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone)]
enum NodeKind {
    Folder,
    File(Vec<u8>),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<String>,
    name: String,
    kind: NodeKind,
    modified: DateTime<Utc>,
    version: u64,
}

#[derive(Debug, Default)]
struct State {
    nodes: HashMap<String, Node>,
    /// Folder paths whose creation fails with a 503
    failing_creates: HashSet<String>,
    /// Folder paths that another writer creates just before we do
    racing_creates: HashSet<String>,
}

/// A document library held entirely in memory.
pub struct MemoryStore {
    title: String,
    root_id: String,
    case_insensitive: bool,
    state: RwLock<State>,
}

impl MemoryStore {
    /// An empty, case-insensitive library.
    pub fn new(title: impl Into<String>) -> Self {
        Self::build(title.into(), true)
    }

    /// An empty library that treats differently-cased names as distinct.
    pub fn case_sensitive(title: impl Into<String>) -> Self {
        Self::build(title.into(), false)
    }

    fn build(title: String, case_insensitive: bool) -> Self {
        let root_id = Uuid::new_v4().to_string();
        let mut state = State::default();
        state.nodes.insert(
            root_id.clone(),
            Node {
                parent: None,
                name: title.clone(),
                kind: NodeKind::Folder,
                modified: Utc::now(),
                version: 1,
            },
        );
        Self {
            title,
            root_id,
            case_insensitive,
            state: RwLock::new(state),
        }
    }

    /// Make every attempt to create the folder at `path` fail.
    pub async fn fail_folder_creation(&self, path: &str) {
        self.state
            .write()
            .await
            .failing_creates
            .insert(path.trim_matches('/').to_string());
    }

    /// Simulate a concurrent writer: the next creation of `path` finds the
    /// folder already created by someone else.
    pub async fn race_folder_creation(&self, path: &str) {
        self.state
            .write()
            .await
            .racing_creates
            .insert(path.trim_matches('/').to_string());
    }

    /// Number of items (files and folders) below the root.
    pub async fn item_count(&self) -> usize {
        self.state.read().await.nodes.len() - 1
    }

    fn names_match(&self, a: &str, b: &str) -> bool {
        if self.case_insensitive {
            a.to_lowercase() == b.to_lowercase()
        } else {
            a == b
        }
    }

    fn server_relative_url(&self) -> String {
        format!("/sites/memory/{}", self.title)
    }
}

impl State {
    fn path_of(&self, id: &str) -> LibraryPath {
        let mut segments = Vec::new();
        let mut current = self.nodes.get(id);
        while let Some(node) = current {
            match &node.parent {
                Some(parent) => {
                    segments.push(node.name.clone());
                    current = self.nodes.get(parent);
                }
                None => break,
            }
        }
        segments.reverse();
        LibraryPath::from_segments(segments)
    }

    fn children_of(&self, id: &str) -> Vec<(&String, &Node)> {
        let mut children: Vec<_> = self
            .nodes
            .iter()
            .filter(|(_, node)| node.parent.as_deref() == Some(id))
            .collect();
        children.sort_by(|a, b| a.1.name.cmp(&b.1.name));
        children
    }

    fn item(&self, id: &str) -> Option<RemoteItem> {
        let node = self.nodes.get(id)?;
        let kind = match &node.kind {
            NodeKind::Folder => ItemKind::Folder {
                child_count: Some(self.children_of(id).len() as u64),
            },
            NodeKind::File(content) => ItemKind::File {
                size: content.len() as u64,
            },
        };
        let mut properties = Properties::new();
        properties.insert("version".to_string(), node.version.into());
        Some(RemoteItem {
            id: id.to_string(),
            name: node.name.clone(),
            path: self.path_of(id),
            kind,
            modified: Some(node.modified),
            web_url: None,
            properties,
        })
    }

    fn remove_tree(&mut self, id: &str) {
        let children: Vec<String> = self.children_of(id).into_iter().map(|(k, _)| k.clone()).collect();
        for child in children {
            self.remove_tree(&child);
        }
        self.nodes.remove(id);
    }
}

impl MemoryStore {
    fn require_folder(&self, state: &State, item: &RemoteItem) -> StoreResult<()> {
        match state.nodes.get(&item.id) {
            Some(Node {
                kind: NodeKind::Folder,
                ..
            }) => Ok(()),
            Some(_) => Err(StoreError::Server {
                status: 400,
                message: format!("'{}' is not a folder", item.path),
            }),
            None => Err(StoreError::NotFound(item.path.to_string())),
        }
    }

    fn find_child(&self, state: &State, parent: &str, name: &str) -> Option<String> {
        state
            .children_of(parent)
            .into_iter()
            .find(|(_, node)| self.names_match(&node.name, name))
            .map(|(id, _)| id.clone())
    }

    fn insert_node(state: &mut State, parent: &str, name: &str, kind: NodeKind) -> String {
        let id = Uuid::new_v4().to_string();
        state.nodes.insert(
            id.clone(),
            Node {
                parent: Some(parent.to_string()),
                name: name.to_string(),
                kind,
                modified: Utc::now(),
                version: 1,
            },
        );
        id
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    fn case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    async fn library_root(&self) -> StoreResult<LibraryRoot> {
        Ok(LibraryRoot {
            title: self.title.clone(),
            library_id: "memory".to_string(),
            root_item_id: self.root_id.clone(),
            web_url: None,
            server_relative_url: self.server_relative_url(),
        })
    }

    async fn list_children(&self, folder: &RemoteItem) -> StoreResult<Vec<RemoteItem>> {
        let state = self.state.read().await;
        self.require_folder(&state, folder)?;
        Ok(state
            .children_of(&folder.id)
            .into_iter()
            .filter_map(|(id, _)| state.item(id))
            .collect())
    }

    async fn get_item(&self, path: &LibraryPath) -> StoreResult<Option<RemoteItem>> {
        let state = self.state.read().await;
        let mut current = self.root_id.clone();
        for segment in path.segments() {
            match self.find_child(&state, &current, segment) {
                Some(id) => current = id,
                None => return Ok(None),
            }
        }
        Ok(state.item(&current))
    }

    async fn create_folder(&self, parent: &RemoteItem, name: &str) -> StoreResult<RemoteItem> {
        let mut state = self.state.write().await;
        self.require_folder(&state, parent)?;

        let target = parent.path.join(name).to_string();
        if state.failing_creates.contains(&target) {
            return Err(StoreError::Server {
                status: 503,
                message: format!("injected failure creating '{}'", target),
            });
        }
        if state.racing_creates.remove(&target) && self.find_child(&state, &parent.id, name).is_none() {
            Self::insert_node(&mut state, &parent.id, name, NodeKind::Folder);
        }
        if self.find_child(&state, &parent.id, name).is_some() {
            return Err(StoreError::AlreadyExists(target));
        }

        let id = Self::insert_node(&mut state, &parent.id, name, NodeKind::Folder);
        debug!(path = %target, "Memory store created folder");
        state.item(&id).ok_or(StoreError::NotFound(target))
    }

    async fn upload(
        &self,
        parent: &RemoteItem,
        name: &str,
        content: Vec<u8>,
        replace: bool,
    ) -> StoreResult<RemoteItem> {
        let mut state = self.state.write().await;
        self.require_folder(&state, parent)?;
        let target = parent.path.join(name).to_string();

        let id = match self.find_child(&state, &parent.id, name) {
            Some(existing) => {
                let node = state
                    .nodes
                    .get_mut(&existing)
                    .ok_or_else(|| StoreError::NotFound(target.clone()))?;
                if !replace || matches!(node.kind, NodeKind::Folder) {
                    return Err(StoreError::AlreadyExists(target));
                }
                node.kind = NodeKind::File(content);
                node.modified = Utc::now();
                node.version += 1;
                existing
            }
            None => Self::insert_node(&mut state, &parent.id, name, NodeKind::File(content)),
        };

        state.item(&id).ok_or(StoreError::NotFound(target))
    }

    async fn download(&self, file: &RemoteItem) -> StoreResult<Vec<u8>> {
        let state = self.state.read().await;
        match state.nodes.get(&file.id) {
            Some(Node {
                kind: NodeKind::File(content),
                ..
            }) => Ok(content.clone()),
            Some(_) => Err(StoreError::Server {
                status: 400,
                message: format!("'{}' is a folder", file.path),
            }),
            None => Err(StoreError::NotFound(file.path.to_string())),
        }
    }

    async fn move_item(
        &self,
        item: &RemoteItem,
        new_parent: &RemoteItem,
        new_name: &str,
        replace: bool,
    ) -> StoreResult<RemoteItem> {
        let mut state = self.state.write().await;
        if !state.nodes.contains_key(&item.id) {
            return Err(StoreError::NotFound(item.path.to_string()));
        }
        self.require_folder(&state, new_parent)?;

        let target = new_parent.path.join(new_name).to_string();
        if let Some(existing) = self.find_child(&state, &new_parent.id, new_name) {
            if existing != item.id {
                let is_file = state
                    .nodes
                    .get(&existing)
                    .is_some_and(|node| matches!(node.kind, NodeKind::File(_)));
                if !replace || !is_file {
                    return Err(StoreError::AlreadyExists(target));
                }
                // Swapped under the same write lock as the move below
                state.remove_tree(&existing);
            }
        }

        if let Some(node) = state.nodes.get_mut(&item.id) {
            node.parent = Some(new_parent.id.clone());
            node.name = new_name.to_string();
            node.modified = Utc::now();
            node.version += 1;
        }
        state.item(&item.id).ok_or(StoreError::NotFound(target))
    }

    async fn delete(&self, item: &RemoteItem) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if item.id == self.root_id {
            return Err(StoreError::Server {
                status: 403,
                message: "the library root cannot be deleted".to_string(),
            });
        }
        if !state.nodes.contains_key(&item.id) {
            return Err(StoreError::NotFound(item.path.to_string()));
        }
        state.remove_tree(&item.id);
        Ok(())
    }
}
