//! Null blob store for demo deployments.

use async_trait::async_trait;
use uuid::Uuid;

use super::{BlobError, BlobMeta, BlobStore, ContainerHandle, ObjectRef};

/// Accepts every write and discards the bytes.
///
/// Reads always fail with [`BlobError::Unavailable`], so downloads go
/// through the engine's fallback policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullBlobStore;

impl NullBlobStore {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BlobStore for NullBlobStore {
    async fn create_container(&self, _label: &str) -> Result<ContainerHandle, BlobError> {
        Ok(ContainerHandle(format!("null-{}", Uuid::new_v4())))
    }

    async fn put(
        &self,
        _container: &ContainerHandle,
        _bytes: &[u8],
        _meta: &BlobMeta,
    ) -> Result<ObjectRef, BlobError> {
        Ok(ObjectRef(Uuid::new_v4().to_string()))
    }

    async fn get(
        &self,
        _container: &ContainerHandle,
        object: &ObjectRef,
    ) -> Result<Vec<u8>, BlobError> {
        Err(BlobError::Unavailable(format!(
            "null store holds no bytes for {object}"
        )))
    }

    async fn delete(
        &self,
        _container: &ContainerHandle,
        _object: &ObjectRef,
    ) -> Result<(), BlobError> {
        Ok(())
    }

    async fn delete_container(&self, _container: &ContainerHandle) -> Result<(), BlobError> {
        Ok(())
    }
}
