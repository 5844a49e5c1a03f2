//! Blob storage capability for msgdrive.
//!
//! File bytes live outside the metadata document, in an opaque store that
//! groups objects into containers. The engine never interprets handles or
//! object references; it only hands them back to the store that issued them.
//!
//! Adapters:
//! - [`LocalBlobStore`]: sharded directories on local disk
//! - [`MemoryBlobStore`]: `HashMap`-backed, with failure injection for tests
//! - [`NullBlobStore`]: accepts writes, never returns bytes (demo mode)

mod local;
mod memory;
mod null;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use local::LocalBlobStore;
pub use memory::MemoryBlobStore;
pub use null::NullBlobStore;

use crate::config::{BlobBackend, StorageConfig};

/// Opaque handle of a physical container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerHandle(pub String);

impl ContainerHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque id of an object inside a container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectRef(pub String);

impl ObjectRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a file's bytes are stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlobRef {
    pub container: ContainerHandle,
    pub object: ObjectRef,
}

/// Descriptive metadata attached to a put.
///
/// Adapters may record it (as a caption, a sidecar, a header) or ignore it.
#[derive(Debug, Clone)]
pub struct BlobMeta {
    pub file_name: String,
    pub mime_type: String,
    pub uploaded_by: i64,
}

/// Errors reported by blob store adapters.
#[derive(Error, Debug)]
pub enum BlobError {
    /// Container or object does not exist.
    #[error("{0} not found in blob store")]
    NotFound(String),

    /// The backend refused or timed out; the call may succeed later.
    #[error("blob store unavailable: {0}")]
    Unavailable(String),

    /// Local I/O failure.
    #[error("blob store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Capability to store, fetch and delete byte blobs grouped into containers.
///
/// Any call may fail transiently. Implementations must be safe to share
/// between request handlers.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Create a new container and return its handle.
    async fn create_container(&self, label: &str) -> Result<ContainerHandle, BlobError>;

    /// Store `bytes` in `container` and return the new object's reference.
    async fn put(
        &self,
        container: &ContainerHandle,
        bytes: &[u8],
        meta: &BlobMeta,
    ) -> Result<ObjectRef, BlobError>;

    /// Fetch the bytes of an object.
    async fn get(&self, container: &ContainerHandle, object: &ObjectRef)
        -> Result<Vec<u8>, BlobError>;

    /// Delete an object.
    async fn delete(&self, container: &ContainerHandle, object: &ObjectRef)
        -> Result<(), BlobError>;

    /// Delete a container and everything left in it.
    async fn delete_container(&self, container: &ContainerHandle) -> Result<(), BlobError>;
}

/// Build the adapter selected by configuration.
pub fn from_config(config: &StorageConfig) -> crate::Result<Arc<dyn BlobStore>> {
    let store: Arc<dyn BlobStore> = match config.backend {
        BlobBackend::Local => Arc::new(LocalBlobStore::new(&config.blob_path)?),
        BlobBackend::Memory => Arc::new(MemoryBlobStore::new()),
        BlobBackend::Null => Arc::new(NullBlobStore::new()),
    };
    tracing::info!("Blob store backend: {:?}", config.backend);
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_serialize_transparently() {
        let blob = BlobRef {
            container: ContainerHandle("c-1".to_string()),
            object: ObjectRef("o-9".to_string()),
        };
        let json = serde_json::to_string(&blob).unwrap();
        assert_eq!(json, r#"{"container":"c-1","object":"o-9"}"#);

        let back: BlobRef = serde_json::from_str(&json).unwrap();
        assert_eq!(back, blob);
    }

    #[test]
    fn test_from_config_memory() {
        let config = StorageConfig {
            backend: BlobBackend::Memory,
            ..StorageConfig::default()
        };
        assert!(from_config(&config).is_ok());
    }

    #[test]
    fn test_from_config_local_creates_directory() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let blob_path = temp_dir.path().join("blobs");
        let config = StorageConfig {
            backend: BlobBackend::Local,
            blob_path: blob_path.to_string_lossy().into_owned(),
            ..StorageConfig::default()
        };

        from_config(&config).unwrap();
        assert!(blob_path.is_dir());
    }
}
