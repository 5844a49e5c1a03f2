//! In-memory blob store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use super::{BlobError, BlobMeta, BlobStore, ContainerHandle, ObjectRef};

type Containers = HashMap<ContainerHandle, HashMap<ObjectRef, Vec<u8>>>;

/// `HashMap`-backed blob store for tests and embedding.
///
/// Failures can be switched on to simulate a backend outage; while failing,
/// every call returns [`BlobError::Unavailable`] and nothing is mutated.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    containers: Mutex<Containers>,
    failing: AtomicBool,
    containers_created: AtomicUsize,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of successful `create_container` calls so far.
    pub fn containers_created(&self) -> usize {
        self.containers_created.load(Ordering::SeqCst)
    }

    pub fn has_container(&self, container: &ContainerHandle) -> bool {
        self.lock().contains_key(container)
    }

    /// Number of objects currently stored in `container`, if it exists.
    pub fn object_count(&self, container: &ContainerHandle) -> Option<usize> {
        self.lock().get(container).map(HashMap::len)
    }

    pub fn contains(&self, container: &ContainerHandle, object: &ObjectRef) -> bool {
        self.lock()
            .get(container)
            .is_some_and(|objects| objects.contains_key(object))
    }

    fn check(&self) -> Result<(), BlobError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(BlobError::Unavailable("simulated outage".to_string()));
        }
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Containers> {
        // A poisoned map is still structurally valid.
        self.containers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn create_container(&self, _label: &str) -> Result<ContainerHandle, BlobError> {
        self.check()?;
        let handle = ContainerHandle(format!("mem-{}", Uuid::new_v4()));
        self.lock().insert(handle.clone(), HashMap::new());
        self.containers_created.fetch_add(1, Ordering::SeqCst);
        Ok(handle)
    }

    async fn put(
        &self,
        container: &ContainerHandle,
        bytes: &[u8],
        _meta: &BlobMeta,
    ) -> Result<ObjectRef, BlobError> {
        self.check()?;
        let mut containers = self.lock();
        let objects = containers
            .get_mut(container)
            .ok_or_else(|| BlobError::NotFound(format!("container {container}")))?;
        let object = ObjectRef(Uuid::new_v4().to_string());
        objects.insert(object.clone(), bytes.to_vec());
        Ok(object)
    }

    async fn get(
        &self,
        container: &ContainerHandle,
        object: &ObjectRef,
    ) -> Result<Vec<u8>, BlobError> {
        self.check()?;
        self.lock()
            .get(container)
            .and_then(|objects| objects.get(object))
            .cloned()
            .ok_or_else(|| BlobError::NotFound(format!("object {object}")))
    }

    async fn delete(
        &self,
        container: &ContainerHandle,
        object: &ObjectRef,
    ) -> Result<(), BlobError> {
        self.check()?;
        self.lock()
            .get_mut(container)
            .and_then(|objects| objects.remove(object))
            .map(|_| ())
            .ok_or_else(|| BlobError::NotFound(format!("object {object}")))
    }

    async fn delete_container(&self, container: &ContainerHandle) -> Result<(), BlobError> {
        self.check()?;
        self.lock()
            .remove(container)
            .map(|_| ())
            .ok_or_else(|| BlobError::NotFound(format!("container {container}")))
    }
}
