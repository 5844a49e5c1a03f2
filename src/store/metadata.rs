//! Process-wide owner of the metadata document.

use std::path::{Path, PathBuf};

use tokio::sync::RwLock;

use super::document;
use super::model::Metadata;
use crate::Result;

/// The single metadata document behind one lock.
///
/// Readers share the lock and see a consistent document. Writers go through
/// [`MetadataStore::transact`], which serializes every load-mutate-persist
/// cycle: the closure runs on a working copy, the copy is saved, and only a
/// successful save makes it visible.
#[derive(Debug)]
pub struct MetadataStore {
    doc: RwLock<Metadata>,
    path: Option<PathBuf>,
}

impl MetadataStore {
    /// Open the document at `path`, starting empty if it is missing or corrupt.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut doc: Metadata = document::load_or_default(&path);
        if doc.repair_next_id() {
            tracing::warn!(
                "next_id in {} was behind issued ids, raised to {}",
                path.display(),
                doc.next_id
            );
        }
        tracing::info!(
            "Metadata loaded from {}: {} users, {} folders, {} files",
            path.display(),
            doc.users.len(),
            doc.folders.len(),
            doc.files.len()
        );

        Self {
            doc: RwLock::new(doc),
            path: Some(path),
        }
    }

    /// A store that is never written to disk.
    pub fn in_memory() -> Self {
        Self::from_document(Metadata::default())
    }

    /// Wrap an existing document without a backing file.
    pub fn from_document(mut doc: Metadata) -> Self {
        doc.repair_next_id();
        Self {
            doc: RwLock::new(doc),
            path: None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Run `f` against the current document under the shared lock.
    pub async fn read<T>(&self, f: impl FnOnce(&Metadata) -> T) -> T {
        let doc = self.doc.read().await;
        f(&doc)
    }

    /// Clone the current document.
    pub async fn snapshot(&self) -> Metadata {
        self.doc.read().await.clone()
    }

    /// Apply `f` to the document and persist the result as one step.
    ///
    /// If `f` fails nothing changes. If the save fails the error is returned
    /// and both memory and disk keep the previous document.
    pub async fn transact<T>(&self, f: impl FnOnce(&mut Metadata) -> Result<T>) -> Result<T> {
        let mut doc = self.doc.write().await;
        let mut working = doc.clone();
        let out = f(&mut working)?;

        if let Some(path) = &self.path {
            if let Err(e) = document::save(path, &working) {
                tracing::error!("Metadata save failed, mutation discarded: {}", e);
                return Err(e);
            }
        }

        *doc = working;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DriveError;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_transact_persists() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("db.json");

        let store = MetadataStore::open(&path);
        let id = store.transact(|doc| Ok(doc.allocate_id())).await.unwrap();
        assert_eq!(id, 1);

        let reopened = MetadataStore::open(&path);
        assert_eq!(reopened.read(|doc| doc.next_id).await, 2);
    }

    #[tokio::test]
    async fn test_failed_closure_changes_nothing() {
        let store = MetadataStore::in_memory();

        let result: Result<()> = store
            .transact(|doc| {
                doc.allocate_id();
                Err(DriveError::FileNotFound(1))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(store.read(|doc| doc.next_id).await, 1);
    }

    #[tokio::test]
    async fn test_failed_save_discards_mutation() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("db.json");
        let store = MetadataStore::open(&path);
        store.transact(|doc| Ok(doc.allocate_id())).await.unwrap();

        std::fs::create_dir(temp_dir.path().join("db.json.tmp")).unwrap();
        let result = store.transact(|doc| Ok(doc.allocate_id())).await;

        assert!(matches!(result, Err(DriveError::Persistence(_))));
        assert_eq!(store.read(|doc| doc.next_id).await, 2);
        assert_eq!(MetadataStore::open(&path).read(|d| d.next_id).await, 2);
    }

    #[tokio::test]
    async fn test_open_repairs_counter() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("db.json");
        std::fs::write(
            &path,
            r#"{"folders":[{"id":12,"name":"x","parent_id":0,"created_by":1,
                "created_at":"2024-01-01T00:00:00Z","state":{"status":"active"}}],
                "next_id":3}"#,
        )
        .unwrap();

        let store = MetadataStore::open(&path);
        assert_eq!(store.read(|doc| doc.next_id).await, 13);
    }
}
