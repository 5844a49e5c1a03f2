//! Mapping from logical storage scopes to physical containers.
//!
//! Every upload lands in the container of its scope: the shared `default`
//! scope, or `folder:<id>` for folders with dedicated storage. Containers are
//! created on first use and the mapping is persisted as its own document.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::blob::{BlobStore, ContainerHandle};
use crate::store::document;
use crate::Result;

/// A logical storage scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Default,
    Folder(u64),
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Default => f.write_str("default"),
            Scope::Folder(id) => write!(f, "folder:{id}"),
        }
    }
}

/// Persisted scope → container mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerMap {
    #[serde(default)]
    pub default: Option<ContainerHandle>,
    #[serde(default)]
    pub folders: BTreeMap<u64, ContainerHandle>,
}

impl ContainerMap {
    pub fn get(&self, scope: Scope) -> Option<&ContainerHandle> {
        match scope {
            Scope::Default => self.default.as_ref(),
            Scope::Folder(id) => self.folders.get(&id),
        }
    }

    /// Whether any scope maps to `handle`.
    pub fn contains(&self, handle: &ContainerHandle) -> bool {
        self.default.as_ref() == Some(handle) || self.folders.values().any(|h| h == handle)
    }

    fn insert(&mut self, scope: Scope, handle: ContainerHandle) {
        match scope {
            Scope::Default => self.default = Some(handle),
            Scope::Folder(id) => {
                self.folders.insert(id, handle);
            }
        }
    }

    fn remove(&mut self, scope: Scope) -> Option<ContainerHandle> {
        match scope {
            Scope::Default => self.default.take(),
            Scope::Folder(id) => self.folders.remove(&id),
        }
    }
}

/// Resolves scopes to containers, creating each container exactly once.
pub struct ContainerRegistry {
    blobs: Arc<dyn BlobStore>,
    map: Mutex<ContainerMap>,
    path: Option<PathBuf>,
    default_label: String,
}

impl ContainerRegistry {
    /// Open the mapping document at `path`.
    pub fn open(blobs: Arc<dyn BlobStore>, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let map: ContainerMap = document::load_or_default(&path);
        tracing::info!(
            "Container map loaded from {}: default={}, {} folder containers",
            path.display(),
            map.default.is_some(),
            map.folders.len()
        );
        Self {
            blobs,
            map: Mutex::new(map),
            path: Some(path),
            default_label: default_label(),
        }
    }

    /// A registry whose mapping is never written to disk.
    pub fn in_memory(blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            blobs,
            map: Mutex::new(ContainerMap::default()),
            path: None,
            default_label: default_label(),
        }
    }

    /// Set the label used when creating the default container.
    pub fn with_default_label(mut self, label: impl Into<String>) -> Self {
        self.default_label = label.into();
        self
    }

    /// Existing mapping for `scope`, without creating anything.
    pub async fn lookup(&self, scope: Scope) -> Option<ContainerHandle> {
        self.map.lock().await.get(scope).cloned()
    }

    pub async fn snapshot(&self) -> ContainerMap {
        self.map.lock().await.clone()
    }

    /// Whether `handle` is still mapped to some scope.
    pub async fn is_live(&self, handle: &ContainerHandle) -> bool {
        self.map.lock().await.contains(handle)
    }

    /// Return the container of `scope`, creating it on first use.
    ///
    /// The mapping lock is held across creation so two callers never create
    /// two containers for one scope. If creation or the save of the new
    /// mapping fails, nothing is recorded and the next call tries again.
    pub async fn resolve(&self, scope: Scope) -> Result<ContainerHandle> {
        let mut map = self.map.lock().await;
        if let Some(handle) = map.get(scope) {
            return Ok(handle.clone());
        }

        let label = match scope {
            Scope::Default => self.default_label.clone(),
            Scope::Folder(id) => format!("{} - folder {id}", self.default_label),
        };
        let handle = self.blobs.create_container(&label).await.map_err(|e| {
            tracing::warn!("Failed to create container for {}: {}", scope, e);
            e
        })?;

        let mut updated = map.clone();
        updated.insert(scope, handle.clone());
        if let Err(e) = self.persist(&updated) {
            tracing::error!(
                "Failed to save container map for {}, releasing {}: {}",
                scope,
                handle,
                e
            );
            if let Err(cleanup) = self.blobs.delete_container(&handle).await {
                tracing::warn!("Failed to release container {}: {}", handle, cleanup);
            }
            return Err(e);
        }

        *map = updated;
        tracing::info!("Created container {} for {}", handle, scope);
        Ok(handle)
    }

    /// Drop the mapping of `scope`. Unknown scopes are a no-op.
    pub async fn forget(&self, scope: Scope) -> Result<Option<ContainerHandle>> {
        let mut map = self.map.lock().await;
        if map.get(scope).is_none() {
            return Ok(None);
        }

        let mut updated = map.clone();
        let removed = updated.remove(scope);
        self.persist(&updated)?;
        *map = updated;
        Ok(removed)
    }

    /// Best-effort delete the physical container of `scope`, then forget it.
    ///
    /// A failed physical delete is logged and does not keep the mapping.
    pub async fn teardown(&self, scope: Scope) -> Result<Option<ContainerHandle>> {
        let Some(handle) = self.lookup(scope).await else {
            return Ok(None);
        };

        match self.blobs.delete_container(&handle).await {
            Ok(()) => tracing::info!("Deleted container {} of {}", handle, scope),
            Err(e) => tracing::warn!("Failed to delete container {} of {}: {}", handle, scope, e),
        }

        self.forget(scope).await
    }

    fn persist(&self, map: &ContainerMap) -> Result<()> {
        match &self.path {
            Some(path) => document::save(path, map),
            None => Ok(()),
        }
    }
}

fn default_label() -> String {
    "Drive Storage".to_string()
}
