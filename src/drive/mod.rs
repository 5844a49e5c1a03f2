//! File lifecycle engine for msgdrive.
//!
//! This module provides:
//! - Upload and download with container routing
//! - Soft-delete, bin, restore and permanent delete
//! - Rename with version history, move, copy and starring
//! - Folder CRUD with cascading delete
//! - Bulk operations with per-item outcomes

mod bulk;
mod folder;
pub mod name;
mod service;
mod upload;

use std::sync::Arc;

use chrono::Duration;

pub use bulk::{BulkItem, BulkOp, BulkOutcome};
pub use folder::FolderDeletion;
pub use service::{Bin, Download, StorageInfo, UploadRequest};
pub use upload::{UploadTracker, DEFAULT_CANCEL_TTL};

use crate::blob::{self, BlobStore};
use crate::config::{CascadeMode, Config, DownloadFallback, Isolation};
use crate::container::ContainerRegistry;
use crate::store::MetadataStore;
use crate::Result;

/// Engine behaviour taken from configuration.
#[derive(Debug, Clone)]
pub struct DriveSettings {
    pub isolation: Isolation,
    pub cascade: CascadeMode,
    pub download_fallback: DownloadFallback,
    pub recent_window: Duration,
    pub recent_limit: usize,
    /// Largest accepted upload, in bytes.
    pub max_upload_bytes: u64,
}

impl Default for DriveSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl DriveSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            isolation: config.storage.isolation,
            cascade: config.drive.cascade,
            download_fallback: config.drive.download_fallback,
            recent_window: Duration::minutes(config.drive.recent_window_minutes),
            recent_limit: config.drive.recent_limit,
            max_upload_bytes: config.server.max_upload_bytes(),
        }
    }
}

/// The lifecycle engine.
///
/// Holds the metadata store, the container registry and the blob store.
/// Every mutation runs as one [`MetadataStore::transact`] call; blob store
/// calls happen outside it.
pub struct Drive {
    store: Arc<MetadataStore>,
    containers: ContainerRegistry,
    blobs: Arc<dyn BlobStore>,
    uploads: UploadTracker,
    settings: DriveSettings,
}

impl Drive {
    pub fn new(
        store: Arc<MetadataStore>,
        containers: ContainerRegistry,
        blobs: Arc<dyn BlobStore>,
        settings: DriveSettings,
    ) -> Self {
        Self {
            store,
            containers,
            blobs,
            uploads: UploadTracker::new(),
            settings,
        }
    }

    /// Open the documents and blob store named in `config`.
    pub fn open(config: &Config) -> Result<Self> {
        let blobs = blob::from_config(&config.storage)?;
        let store = Arc::new(MetadataStore::open(&config.storage.metadata_path));
        let containers = ContainerRegistry::open(blobs.clone(), &config.storage.containers_path)
            .with_default_label(config.storage.default_container_label.clone());

        Ok(Self::new(
            store,
            containers,
            blobs,
            DriveSettings::from_config(config),
        ))
    }

    /// An engine with nothing on disk except what `blobs` writes.
    pub fn in_memory(blobs: Arc<dyn BlobStore>, settings: DriveSettings) -> Self {
        let containers = ContainerRegistry::in_memory(blobs.clone());
        Self::new(
            Arc::new(MetadataStore::in_memory()),
            containers,
            blobs,
            settings,
        )
    }

    pub fn store(&self) -> &Arc<MetadataStore> {
        &self.store
    }

    pub fn containers(&self) -> &ContainerRegistry {
        &self.containers
    }

    pub fn settings(&self) -> &DriveSettings {
        &self.settings
    }

    pub fn uploads(&self) -> &UploadTracker {
        &self.uploads
    }

    /// Mark an upload as cancelled; see [`UploadTracker`].
    pub fn cancel_upload(&self, upload_id: &str) {
        self.uploads.cancel(upload_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_from_config() {
        let mut config = Config::default();
        config.drive.recent_window_minutes = 5;
        config.server.max_upload_size_mb = 2;

        let settings = DriveSettings::from_config(&config);

        assert_eq!(settings.recent_window, Duration::minutes(5));
        assert_eq!(settings.max_upload_bytes, 2 * 1024 * 1024);
        assert_eq!(settings.cascade, CascadeMode::Flat);
        assert_eq!(settings.isolation, Isolation::PerFolder);
    }

    #[tokio::test]
    async fn test_open_from_config() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let mut config = Config::default();
        config.storage.metadata_path = temp_dir.path().join("db.json").display().to_string();
        config.storage.containers_path = temp_dir.path().join("c.json").display().to_string();
        config.storage.blob_path = temp_dir.path().join("blobs").display().to_string();

        let drive = Drive::open(&config).unwrap();
        assert_eq!(
            drive.store().path(),
            Some(temp_dir.path().join("db.json").as_path())
        );
        assert!(drive.list_files(0).await.is_empty());
    }
}
