//! Local-disk blob store.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use uuid::Uuid;

use super::{BlobError, BlobMeta, BlobStore, ContainerHandle, ObjectRef};

/// Blob store keeping each container as a directory.
///
/// Objects are sharded by the first 2 characters of their UUID:
/// ```text
/// {base_path}/
/// ├── {container-uuid}/
/// │   ├── ab/
/// │   │   └── ab12cd34-5678-90ab-cdef-123456789012.pdf
/// │   └── cd/
/// │       └── cd90ab12-3456-7890-abcd-ef1234567890.bin
/// └── ...
/// ```
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    base_path: PathBuf,
}

impl LocalBlobStore {
    /// Create a store rooted at `base_path`, creating the directory if needed.
    pub fn new(base_path: impl Into<PathBuf>) -> io::Result<Self> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path)?;

        Ok(Self { base_path })
    }

    /// Get the base path of this store.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn container_path(&self, container: &ContainerHandle) -> Result<PathBuf, BlobError> {
        let name = container.as_str();
        if !Self::is_safe_component(name) {
            return Err(BlobError::NotFound(format!("container {name}")));
        }
        Ok(self.base_path.join(name))
    }

    fn object_path(
        &self,
        container: &ContainerHandle,
        object: &ObjectRef,
    ) -> Result<PathBuf, BlobError> {
        let name = object.as_str();
        if !Self::is_safe_component(name) {
            return Err(BlobError::NotFound(format!("object {name}")));
        }
        Ok(self
            .container_path(container)?
            .join(Self::shard(name))
            .join(name))
    }

    /// First 2 characters of the object name.
    fn shard(name: &str) -> &str {
        name.get(..2).unwrap_or(name)
    }

    /// Handles come back from persisted documents; never let one escape the base path.
    fn is_safe_component(name: &str) -> bool {
        !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\'])
    }

    /// Extension of the original file name, "bin" if there is none.
    fn extract_extension(filename: &str) -> &str {
        Path::new(filename)
            .extension()
            .and_then(|s| s.to_str())
            .filter(|ext| Self::is_safe_component(ext))
            .unwrap_or("bin")
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn create_container(&self, label: &str) -> Result<ContainerHandle, BlobError> {
        let handle = ContainerHandle(Uuid::new_v4().to_string());
        let path = self.container_path(&handle)?;
        tokio::fs::create_dir_all(&path).await?;
        tracing::debug!("Created container {} ({})", handle, label);
        Ok(handle)
    }

    async fn put(
        &self,
        container: &ContainerHandle,
        bytes: &[u8],
        meta: &BlobMeta,
    ) -> Result<ObjectRef, BlobError> {
        let container_path = self.container_path(container)?;
        if !container_path.is_dir() {
            return Err(BlobError::NotFound(format!("container {container}")));
        }

        let ext = Self::extract_extension(&meta.file_name);
        let object = ObjectRef(format!("{}.{ext}", Uuid::new_v4()));
        let path = self.object_path(container, &object)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;

        Ok(object)
    }

    async fn get(
        &self,
        container: &ContainerHandle,
        object: &ObjectRef,
    ) -> Result<Vec<u8>, BlobError> {
        let path = self.object_path(container, object)?;
        match tokio::fs::read(&path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(BlobError::NotFound(format!("object {object}")))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(
        &self,
        container: &ContainerHandle,
        object: &ObjectRef,
    ) -> Result<(), BlobError> {
        let path = self.object_path(container, object)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(BlobError::NotFound(format!("object {object}")))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_container(&self, container: &ContainerHandle) -> Result<(), BlobError> {
        let path = self.container_path(container)?;
        match tokio::fs::remove_dir_all(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(BlobError::NotFound(format!("container {container}")))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_store() -> (TempDir, LocalBlobStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalBlobStore::new(temp_dir.path()).unwrap();
        (temp_dir, store)
    }

    fn meta(name: &str) -> BlobMeta {
        BlobMeta {
            file_name: name.to_string(),
            mime_type: "application/octet-stream".to_string(),
            uploaded_by: 1,
        }
    }

    #[test]
    fn test_new_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let storage_path = temp_dir.path().join("blobs");

        assert!(!storage_path.exists());

        let store = LocalBlobStore::new(&storage_path).unwrap();

        assert!(storage_path.exists());
        assert_eq!(store.base_path(), storage_path);
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let (_temp_dir, store) = setup_store();
        let container = store.create_container("test").await.unwrap();

        let object = store
            .put(&container, b"Hello, World!", &meta("hello.txt"))
            .await
            .unwrap();
        assert!(object.as_str().ends_with(".txt"));

        let loaded = store.get(&container, &object).await.unwrap();
        assert_eq!(loaded, b"Hello, World!");
    }

    #[tokio::test]
    async fn test_put_shards_by_prefix() {
        let (_temp_dir, store) = setup_store();
        let container = store.create_container("test").await.unwrap();

        let object = store.put(&container, b"data", &meta("a.bin")).await.unwrap();

        let shard = &object.as_str()[..2];
        let shard_dir = store.base_path().join(container.as_str()).join(shard);
        assert!(shard_dir.is_dir());
    }

    #[tokio::test]
    async fn test_put_into_missing_container() {
        let (_temp_dir, store) = setup_store();
        let missing = ContainerHandle("does-not-exist".to_string());

        let result = store.put(&missing, b"data", &meta("a.txt")).await;
        assert!(matches!(result, Err(BlobError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_object() {
        let (_temp_dir, store) = setup_store();
        let container = store.create_container("test").await.unwrap();
        let object = store.put(&container, b"bye", &meta("x.txt")).await.unwrap();

        store.delete(&container, &object).await.unwrap();

        assert!(matches!(
            store.get(&container, &object).await,
            Err(BlobError::NotFound(_))
        ));
        assert!(matches!(
            store.delete(&container, &object).await,
            Err(BlobError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_container_removes_objects() {
        let (_temp_dir, store) = setup_store();
        let container = store.create_container("test").await.unwrap();
        let object = store.put(&container, b"data", &meta("x.txt")).await.unwrap();

        store.delete_container(&container).await.unwrap();

        assert!(!store.base_path().join(container.as_str()).exists());
        assert!(store.get(&container, &object).await.is_err());
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let (_temp_dir, store) = setup_store();
        let evil = ContainerHandle("..".to_string());
        let object = ObjectRef("../../etc/passwd".to_string());

        assert!(store.get(&evil, &object).await.is_err());
        assert!(store.delete_container(&evil).await.is_err());
    }

    #[test]
    fn test_extract_extension() {
        assert_eq!(LocalBlobStore::extract_extension("test.txt"), "txt");
        assert_eq!(LocalBlobStore::extract_extension("document.PDF"), "PDF");
        assert_eq!(LocalBlobStore::extract_extension("no_ext"), "bin");
        assert_eq!(LocalBlobStore::extract_extension("file.tar.gz"), "gz");
        assert_eq!(LocalBlobStore::extract_extension(".hidden"), "bin");
    }

    #[test]
    fn test_shard() {
        assert_eq!(LocalBlobStore::shard("abcdef.txt"), "ab");
        assert_eq!(LocalBlobStore::shard("x"), "x");
        assert_eq!(LocalBlobStore::shard(""), "");
    }
}
