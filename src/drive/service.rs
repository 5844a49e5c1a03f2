//! File operations and listings.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{name, Drive};
use crate::blob::{BlobMeta, BlobRef};
use crate::config::DownloadFallback;
use crate::container::Scope;
use crate::store::{File, FileState, Folder, Metadata, StorageMode, Version, ROOT_FOLDER_ID};
use crate::{DriveError, Result};

/// MIME type used when nothing better is known.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// An upload as handed to [`Drive::upload`].
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    pub folder_id: u64,
    /// Client-side file name, possibly a full path.
    pub name: Option<String>,
    pub mime_type: Option<String>,
    pub content: Vec<u8>,
    /// Client-chosen id that [`Drive::cancel_upload`] can refer to.
    pub upload_id: Option<String>,
}

impl UploadRequest {
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: Some(name.into()),
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn in_folder(mut self, folder_id: u64) -> Self {
        self.folder_id = folder_id;
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn with_upload_id(mut self, upload_id: impl Into<String>) -> Self {
        self.upload_id = Some(upload_id.into());
        self
    }
}

/// Result of [`Drive::download`].
#[derive(Debug, Clone)]
pub struct Download {
    pub file: File,
    pub content: Vec<u8>,
    pub mime_type: String,
    /// `content` is generated text, not the stored bytes.
    pub placeholder: bool,
}

/// Contents of the bin.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Bin {
    pub files: Vec<File>,
    pub folders: Vec<Folder>,
}

/// Totals over ACTIVE files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StorageInfo {
    pub total_bytes: u64,
    pub total_file_count: usize,
}

impl Drive {
    /// Store `request.content` and record it as a new ACTIVE file.
    ///
    /// The target folder is checked before the bytes are sent and again in
    /// the commit, together with the cancellation mark. Bytes stored for an
    /// upload that does not commit are deleted again.
    pub async fn upload(&self, actor: i64, request: UploadRequest) -> Result<File> {
        let UploadRequest {
            folder_id,
            name,
            mime_type,
            content,
            upload_id,
        } = request;

        let size = content.len() as u64;
        if size > self.settings.max_upload_bytes {
            return Err(DriveError::InvalidInput(format!(
                "file of {size} bytes exceeds the upload limit of {} bytes",
                self.settings.max_upload_bytes
            )));
        }

        let name = name::upload_name(name.as_deref());
        let mime_type = resolve_mime(mime_type.as_deref(), &name);

        if let Some(upload_id) = &upload_id {
            if self.uploads.take_cancelled(upload_id) {
                tracing::info!("Upload {} cancelled before transfer", upload_id);
                return Err(DriveError::UploadCancelled(upload_id.clone()));
            }
        }

        let scope = self.store.read(|doc| scope_for(doc, folder_id)).await?;
        let container = self.containers.resolve(scope).await?;
        let meta = BlobMeta {
            file_name: name.clone(),
            mime_type: mime_type.clone(),
            uploaded_by: actor,
        };
        let object = self
            .blobs
            .put(&container, &content, &meta)
            .await
            .map_err(|e| {
                tracing::warn!("Failed to store {} in {}: {}", name, container, e);
                DriveError::from(e)
            })?;
        drop(content);

        let blob = BlobRef { container, object };
        let uploads = &self.uploads;
        let committed = self
            .store
            .transact(|doc| {
                if let Some(upload_id) = &upload_id {
                    if uploads.take_cancelled(upload_id) {
                        return Err(DriveError::UploadCancelled(upload_id.clone()));
                    }
                }
                doc.ensure_target(folder_id)?;

                let file = File {
                    id: doc.allocate_id(),
                    name,
                    folder_id,
                    size,
                    mime_type,
                    blob: blob.clone(),
                    uploaded_by: actor,
                    created_at: Utc::now(),
                    state: FileState::Active { restored_at: None },
                    starred: false,
                    moved_at: None,
                    versions: Vec::new(),
                };
                doc.files.push(file.clone());
                Ok(file)
            })
            .await;

        match committed {
            Ok(file) => {
                tracing::info!(
                    "Uploaded file {} '{}' ({} bytes) to folder {} by user {}",
                    file.id,
                    file.name,
                    file.size,
                    file.folder_id,
                    actor
                );
                Ok(file)
            }
            Err(e) => {
                tracing::warn!("Upload not committed ({}), releasing {}", e, blob.object);
                self.release_blob(&blob).await;
                // The folder went away between the scope lookup and the commit;
                // its delete may have missed the container created for us.
                if let (DriveError::FolderNotFound(_), Scope::Folder(folder_id)) = (&e, scope) {
                    self.release_folder_container(folder_id, &HashSet::new())
                        .await;
                }
                Err(e)
            }
        }
    }

    /// Fetch the bytes of an ACTIVE file.
    ///
    /// When the blob store cannot deliver them, the configured
    /// [`DownloadFallback`] decides between placeholder text and an error.
    pub async fn download(&self, id: u64) -> Result<Download> {
        let file = self.store.read(|doc| doc.active_file(id).cloned()).await?;

        match self.blobs.get(&file.blob.container, &file.blob.object).await {
            Ok(content) => {
                let mime_type = download_mime(&file);
                tracing::debug!("Downloading file {} ({} bytes)", file.id, content.len());
                Ok(Download {
                    file,
                    content,
                    mime_type,
                    placeholder: false,
                })
            }
            Err(e) => match self.settings.download_fallback {
                DownloadFallback::Fail => {
                    tracing::warn!("Bytes of file {} unavailable: {}", file.id, e);
                    Err(e.into())
                }
                DownloadFallback::Placeholder => {
                    tracing::warn!(
                        "Bytes of file {} unavailable ({}), serving placeholder",
                        file.id,
                        e
                    );
                    Ok(Download {
                        content: placeholder_content(&file).into_bytes(),
                        mime_type: "text/plain".to_string(),
                        file,
                        placeholder: true,
                    })
                }
            },
        }
    }

    /// An ACTIVE file.
    pub async fn get_file(&self, id: u64) -> Result<File> {
        self.store.read(|doc| doc.active_file(id).cloned()).await
    }

    /// Rename, recording the old name as a version.
    pub async fn rename(&self, id: u64, new_name: &str) -> Result<File> {
        let new_name = name::sanitize(new_name)?;
        let now = Utc::now();
        let file = self
            .store
            .transact(|doc| {
                let file = doc.active_file_mut(id)?;
                file.rename(new_name, now)?;
                Ok(file.clone())
            })
            .await?;

        tracing::info!(
            "Renamed file {} to '{}' (version {})",
            file.id,
            file.name,
            file.versions.len()
        );
        Ok(file)
    }

    /// Move an ACTIVE file to root or an ACTIVE folder.
    pub async fn move_file(&self, id: u64, folder_id: u64) -> Result<File> {
        let now = Utc::now();
        let file = self
            .store
            .transact(|doc| move_in(doc, id, folder_id, now))
            .await?;
        tracing::info!("Moved file {} to folder {}", file.id, file.folder_id);
        Ok(file)
    }

    /// Create a new file record sharing the bytes of `id`.
    ///
    /// The copy starts unstarred with an empty version list.
    pub async fn copy_file(
        &self,
        actor: i64,
        id: u64,
        folder_id: u64,
        new_name: Option<&str>,
    ) -> Result<File> {
        let new_name = new_name.map(name::sanitize).transpose()?;
        let now = Utc::now();
        let copy = self
            .store
            .transact(|doc| copy_in(doc, actor, id, folder_id, new_name, now))
            .await?;
        tracing::info!(
            "Copied file {} to {} in folder {}",
            id,
            copy.id,
            copy.folder_id
        );
        Ok(copy)
    }

    /// Flip the star of an ACTIVE file.
    pub async fn toggle_star(&self, id: u64) -> Result<File> {
        let file = self
            .store
            .transact(|doc| {
                let file = doc.active_file_mut(id)?;
                file.starred = !file.starred;
                Ok(file.clone())
            })
            .await?;
        tracing::info!("File {} starred={}", file.id, file.starred);
        Ok(file)
    }

    pub async fn set_starred(&self, id: u64, starred: bool) -> Result<File> {
        self.store
            .transact(|doc| set_starred_in(doc, id, starred))
            .await
    }

    /// ACTIVE → DELETED.
    pub async fn delete_file(&self, id: u64) -> Result<File> {
        let now = Utc::now();
        let file = self
            .store
            .transact(|doc| soft_delete_in(doc, id, now))
            .await?;
        tracing::info!("Moved file {} to bin", file.id);
        Ok(file)
    }

    /// DELETED → ACTIVE.
    ///
    /// A file whose folder is gone comes back at the root. A file whose
    /// container was torn down stays in the bin with [`DriveError::BytesLost`].
    pub async fn restore_file(&self, id: u64) -> Result<File> {
        let container = self
            .store
            .read(|doc| {
                doc.file(id)
                    .filter(|f| f.is_deleted())
                    .map(|f| f.blob.container.clone())
            })
            .await
            .ok_or(DriveError::FileNotFoundInBin(id))?;
        if !self.containers.is_live(&container).await {
            tracing::warn!("Not restoring file {}: container {} is gone", id, container);
            return Err(DriveError::BytesLost(id));
        }

        let now = Utc::now();
        let file = self
            .store
            .transact(|doc| {
                let folder_id = doc
                    .file(id)
                    .filter(|f| f.is_deleted())
                    .map(|f| f.folder_id)
                    .ok_or(DriveError::FileNotFoundInBin(id))?;
                let folder_alive = doc.is_valid_target(folder_id);

                let file = doc.binned_file_mut(id)?;
                file.restore(now)?;
                if !folder_alive {
                    file.folder_id = ROOT_FOLDER_ID;
                }
                Ok(file.clone())
            })
            .await?;
        tracing::info!("Restored file {} to folder {}", file.id, file.folder_id);
        Ok(file)
    }

    /// DELETED → PURGED.
    ///
    /// The record goes first. The bytes are then deleted best-effort, and
    /// only if no other record still points at them.
    pub async fn purge_file(&self, id: u64) -> Result<File> {
        let (file, shared) = self
            .store
            .transact(|doc| {
                let pos = doc
                    .files
                    .iter()
                    .position(|f| f.id == id && f.is_deleted())
                    .ok_or(DriveError::FileNotFound(id))?;
                let file = doc.files.remove(pos);
                let shared = doc.blob_references(&file.blob, file.id) > 0;
                Ok((file, shared))
            })
            .await?;

        if shared {
            tracing::debug!("Bytes of file {} still referenced, kept", file.id);
        } else {
            self.release_blob(&file.blob).await;
        }
        tracing::info!("Permanently deleted file {}", file.id);
        Ok(file)
    }

    /// Purge every binned file. Returns how many were removed.
    pub async fn empty_bin(&self) -> Result<usize> {
        let (count, orphaned) = self
            .store
            .transact(|doc| {
                let (binned, kept): (Vec<File>, Vec<File>) = std::mem::take(&mut doc.files)
                    .into_iter()
                    .partition(|f| f.is_deleted());
                doc.files = kept;

                let mut orphaned: Vec<BlobRef> = Vec::new();
                for file in &binned {
                    if doc.blob_references(&file.blob, file.id) == 0
                        && !orphaned.contains(&file.blob)
                    {
                        orphaned.push(file.blob.clone());
                    }
                }
                Ok((binned.len(), orphaned))
            })
            .await?;

        for blob in &orphaned {
            self.release_blob(blob).await;
        }
        tracing::info!("Emptied bin: {} files removed", count);
        Ok(count)
    }

    /// ACTIVE files directly in `folder_id`.
    pub async fn list_files(&self, folder_id: u64) -> Vec<File> {
        self.store
            .read(|doc| {
                doc.files
                    .iter()
                    .filter(|f| f.is_active() && f.folder_id == folder_id)
                    .cloned()
                    .collect()
            })
            .await
    }

    /// Every file record, binned ones included.
    pub async fn list_all_files(&self) -> Vec<File> {
        self.store.read(|doc| doc.files.clone()).await
    }

    pub async fn list_bin(&self) -> Bin {
        self.store
            .read(|doc| Bin {
                files: doc.files.iter().filter(|f| f.is_deleted()).cloned().collect(),
                folders: doc
                    .folders
                    .iter()
                    .filter(|f| !f.is_active())
                    .cloned()
                    .collect(),
            })
            .await
    }

    pub async fn list_starred(&self) -> Vec<File> {
        self.store
            .read(|doc| {
                doc.files
                    .iter()
                    .filter(|f| f.is_active() && f.starred)
                    .cloned()
                    .collect()
            })
            .await
    }

    pub async fn list_recent(&self) -> Vec<File> {
        self.list_recent_at(Utc::now()).await
    }

    /// ACTIVE files created within the recent window before `now`, newest first.
    ///
    /// Files with equal timestamps keep their insertion order.
    pub async fn list_recent_at(&self, now: DateTime<Utc>) -> Vec<File> {
        let cutoff = now - self.settings.recent_window;
        let limit = self.settings.recent_limit;
        self.store
            .read(|doc| {
                let mut files: Vec<File> = doc
                    .files
                    .iter()
                    .filter(|f| f.is_active() && f.created_at > cutoff)
                    .cloned()
                    .collect();
                files.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                files.truncate(limit);
                files
            })
            .await
    }

    /// Case-insensitive substring match on ACTIVE file names.
    pub async fn search(&self, query: &str) -> Result<Vec<File>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Err(DriveError::InvalidInput(
                "search query must not be empty".to_string(),
            ));
        }

        Ok(self
            .store
            .read(|doc| {
                doc.files
                    .iter()
                    .filter(|f| f.is_active() && f.name.to_lowercase().contains(&needle))
                    .cloned()
                    .collect()
            })
            .await)
    }

    pub async fn versions(&self, id: u64) -> Result<Vec<Version>> {
        self.store
            .read(|doc| doc.active_file(id).map(|f| f.versions.clone()))
            .await
    }

    /// Roll the name back to version `version_number`.
    pub async fn restore_version(&self, id: u64, version_number: u32) -> Result<File> {
        let now = Utc::now();
        let file = self
            .store
            .transact(|doc| {
                let file = doc.active_file_mut(id)?;
                file.restore_version(version_number, now)?;
                Ok(file.clone())
            })
            .await?;
        tracing::info!(
            "File {} restored to version {}, now '{}'",
            file.id,
            version_number,
            file.name
        );
        Ok(file)
    }

    pub async fn storage_info(&self) -> StorageInfo {
        self.store
            .read(|doc| {
                let active = doc.files.iter().filter(|f| f.is_active());
                StorageInfo {
                    total_bytes: active.clone().map(|f| f.size).sum(),
                    total_file_count: active.count(),
                }
            })
            .await
    }

    /// Best-effort delete of stored bytes.
    pub(super) async fn release_blob(&self, blob: &BlobRef) {
        if let Err(e) = self.blobs.delete(&blob.container, &blob.object).await {
            tracing::warn!(
                "Failed to delete {} from {}: {}",
                blob.object,
                blob.container,
                e
            );
        }
    }
}

/// Container scope that uploads into `folder_id` go to.
pub(super) fn scope_for(doc: &Metadata, folder_id: u64) -> Result<Scope> {
    if folder_id == ROOT_FOLDER_ID {
        return Ok(Scope::Default);
    }
    let folder = doc.active_folder(folder_id)?;
    Ok(match folder.storage {
        StorageMode::Dedicated => Scope::Folder(folder.id),
        StorageMode::Shared => Scope::Default,
    })
}

pub(super) fn move_in(
    doc: &mut Metadata,
    id: u64,
    folder_id: u64,
    now: DateTime<Utc>,
) -> Result<File> {
    doc.active_file(id)?;
    doc.ensure_target(folder_id)?;

    let file = doc.active_file_mut(id)?;
    file.folder_id = folder_id;
    file.moved_at = Some(now);
    Ok(file.clone())
}

pub(super) fn copy_in(
    doc: &mut Metadata,
    actor: i64,
    id: u64,
    folder_id: u64,
    new_name: Option<String>,
    now: DateTime<Utc>,
) -> Result<File> {
    let source = doc.active_file(id)?.clone();
    doc.ensure_target(folder_id)?;

    let copy = File {
        id: doc.allocate_id(),
        name: new_name.unwrap_or(source.name),
        folder_id,
        size: source.size,
        mime_type: source.mime_type,
        blob: source.blob,
        uploaded_by: actor,
        created_at: now,
        state: FileState::Active { restored_at: None },
        starred: false,
        moved_at: None,
        versions: Vec::new(),
    };
    doc.files.push(copy.clone());
    Ok(copy)
}

pub(super) fn set_starred_in(doc: &mut Metadata, id: u64, starred: bool) -> Result<File> {
    let file = doc.active_file_mut(id)?;
    file.starred = starred;
    Ok(file.clone())
}

pub(super) fn soft_delete_in(doc: &mut Metadata, id: u64, now: DateTime<Utc>) -> Result<File> {
    let file = doc.active_file_mut(id)?;
    file.soft_delete(now)?;
    Ok(file.clone())
}

/// Supplied type, else a guess from the name, else octet-stream.
fn resolve_mime(supplied: Option<&str>, name: &str) -> String {
    supplied
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| guess_mime(name))
}

fn download_mime(file: &File) -> String {
    if file.mime_type == OCTET_STREAM {
        guess_mime(&file.name)
    } else {
        file.mime_type.clone()
    }
}

fn guess_mime(name: &str) -> String {
    mime_guess::from_path(name)
        .first()
        .map(|m| m.to_string())
        .unwrap_or_else(|| OCTET_STREAM.to_string())
}

fn placeholder_content(file: &File) -> String {
    format!(
        "Content of '{}' is not available right now.\nFile ID: {}\nSize: {} bytes\nCreated: {}\n",
        file.name,
        file.id,
        file.size,
        file.created_at.to_rfc3339()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::{BlobError, BlobStore, ContainerHandle, MemoryBlobStore, ObjectRef};
    use crate::drive::DriveSettings;
    use async_trait::async_trait;
    use std::sync::{Arc, OnceLock, Weak};

    fn setup() -> (Arc<MemoryBlobStore>, Drive) {
        let blobs = Arc::new(MemoryBlobStore::new());
        let drive = Drive::in_memory(blobs.clone(), DriveSettings::default());
        (blobs, drive)
    }

    type BlobResult<T> = std::result::Result<T, BlobError>;

    /// Memory store that acts on the engine in the middle of an upload.
    #[derive(Default)]
    struct InterleavedBlobs {
        inner: MemoryBlobStore,
        drive: OnceLock<Weak<Drive>>,
        created: OnceLock<ContainerHandle>,
        /// Folder to soft-delete while its container is being created.
        delete_folder_on_create: OnceLock<u64>,
        /// Upload to cancel right after its bytes are stored.
        cancel_on_put: OnceLock<String>,
    }

    impl InterleavedBlobs {
        fn drive(&self) -> Option<Arc<Drive>> {
            self.drive.get().and_then(Weak::upgrade)
        }
    }

    #[async_trait]
    impl BlobStore for InterleavedBlobs {
        async fn create_container(&self, label: &str) -> BlobResult<ContainerHandle> {
            let pending_delete = self.delete_folder_on_create.get().copied();
            if let (Some(folder_id), Some(drive)) = (pending_delete, self.drive()) {
                let now = Utc::now();
                drive
                    .store()
                    .transact(|doc| {
                        doc.folder_mut(folder_id)
                            .ok_or(DriveError::FolderNotFound(folder_id))?
                            .soft_delete(now)
                    })
                    .await
                    .unwrap();
            }
            let handle = self.inner.create_container(label).await?;
            let _ = self.created.set(handle.clone());
            Ok(handle)
        }

        async fn put(
            &self,
            container: &ContainerHandle,
            bytes: &[u8],
            meta: &BlobMeta,
        ) -> BlobResult<ObjectRef> {
            let object = self.inner.put(container, bytes, meta).await?;
            if let (Some(upload_id), Some(drive)) = (self.cancel_on_put.get(), self.drive()) {
                drive.cancel_upload(upload_id);
            }
            Ok(object)
        }

        async fn get(
            &self,
            container: &ContainerHandle,
            object: &ObjectRef,
        ) -> BlobResult<Vec<u8>> {
            self.inner.get(container, object).await
        }

        async fn delete(
            &self,
            container: &ContainerHandle,
            object: &ObjectRef,
        ) -> BlobResult<()> {
            self.inner.delete(container, object).await
        }

        async fn delete_container(&self, container: &ContainerHandle) -> BlobResult<()> {
            self.inner.delete_container(container).await
        }
    }

    fn interleaved() -> (Arc<InterleavedBlobs>, Arc<Drive>) {
        let blobs = Arc::new(InterleavedBlobs::default());
        let drive = Arc::new(Drive::in_memory(blobs.clone(), DriveSettings::default()));
        blobs.drive.set(Arc::downgrade(&drive)).unwrap();
        (blobs, drive)
    }

    #[test]
    fn test_resolve_mime() {
        assert_eq!(resolve_mime(Some("image/png"), "a.txt"), "image/png");
        assert_eq!(resolve_mime(None, "notes.txt"), "text/plain");
        assert_eq!(resolve_mime(Some(" "), "report.pdf"), "application/pdf");
        assert_eq!(resolve_mime(None, "blob.zzunknown"), OCTET_STREAM);
    }

    #[tokio::test]
    async fn test_upload_and_download() {
        let (_blobs, drive) = setup();

        let file = drive
            .upload(1, UploadRequest::new("hello.txt", b"hello".to_vec()))
            .await
            .unwrap();
        assert_eq!(file.size, 5);
        assert_eq!(file.mime_type, "text/plain");
        assert!(file.is_active());

        let download = drive.download(file.id).await.unwrap();
        assert_eq!(download.content, b"hello");
        assert!(!download.placeholder);
    }

    #[tokio::test]
    async fn test_download_guesses_generic_type() {
        let (_blobs, drive) = setup();
        let file = drive
            .upload(
                1,
                UploadRequest::new("page.html", b"<p>".to_vec()).with_mime_type(OCTET_STREAM),
            )
            .await
            .unwrap();
        assert_eq!(file.mime_type, OCTET_STREAM);

        let download = drive.download(file.id).await.unwrap();
        assert_eq!(download.mime_type, "text/html");
    }

    #[tokio::test]
    async fn test_upload_size_limit() {
        let blobs = Arc::new(MemoryBlobStore::new());
        let settings = DriveSettings {
            max_upload_bytes: 4,
            ..DriveSettings::default()
        };
        let drive = Drive::in_memory(blobs.clone(), settings);

        let result = drive
            .upload(1, UploadRequest::new("big.bin", vec![0u8; 5]))
            .await;

        assert!(matches!(result, Err(DriveError::InvalidInput(_))));
        assert_eq!(blobs.containers_created(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_upload_is_never_committed() {
        let (blobs, drive) = setup();
        drive.cancel_upload("u-1");

        let result = drive
            .upload(
                1,
                UploadRequest::new("a.txt", b"abc".to_vec()).with_upload_id("u-1"),
            )
            .await;

        assert!(matches!(result, Err(DriveError::UploadCancelled(_))));
        assert!(drive.list_all_files().await.is_empty());
        assert_eq!(blobs.containers_created(), 0);
        assert_eq!(drive.uploads().pending(), 0);
    }

    #[tokio::test]
    async fn test_cancel_during_transfer_discards_stored_bytes() {
        let (blobs, drive) = interleaved();
        blobs.cancel_on_put.set("mid".to_string()).unwrap();
        let next_id = drive.store().read(|doc| doc.next_id).await;

        let result = drive
            .upload(
                1,
                UploadRequest::new("a.txt", b"abc".to_vec()).with_upload_id("mid"),
            )
            .await;

        assert!(matches!(result, Err(DriveError::UploadCancelled(id)) if id == "mid"));
        assert!(drive.list_all_files().await.is_empty());
        assert_eq!(drive.store().read(|doc| doc.next_id).await, next_id);
        let container = drive.containers().lookup(Scope::Default).await.unwrap();
        assert_eq!(blobs.inner.object_count(&container), Some(0));
        assert_eq!(drive.uploads().pending(), 0);
    }

    #[tokio::test]
    async fn test_folder_deleted_during_first_upload_releases_container() {
        let (blobs, drive) = interleaved();
        let folder = drive.create_folder(1, "doomed", 0).await.unwrap();
        blobs.delete_folder_on_create.set(folder.id).unwrap();

        let result = drive
            .upload(
                1,
                UploadRequest::new("a.txt", b"abc".to_vec()).in_folder(folder.id),
            )
            .await;

        assert!(matches!(result, Err(DriveError::FolderNotFound(id)) if id == folder.id));
        assert!(drive.list_all_files().await.is_empty());
        assert_eq!(blobs.inner.containers_created(), 1);
        assert!(!blobs.inner.has_container(blobs.created.get().unwrap()));
        assert_eq!(drive.containers().lookup(Scope::Folder(folder.id)).await, None);
        assert!(drive.containers().snapshot().await.folders.is_empty());
    }

    #[tokio::test]
    async fn test_failed_put_leaves_no_record() {
        let (blobs, drive) = setup();
        drive.containers().resolve(Scope::Default).await.unwrap();
        blobs.set_failing(true);

        let result = drive
            .upload(1, UploadRequest::new("a.txt", b"abc".to_vec()))
            .await;

        assert!(matches!(result, Err(DriveError::StorageUnavailable(_))));
        assert!(drive.list_all_files().await.is_empty());
        assert_eq!(drive.store().read(|doc| doc.next_id).await, 1);
    }

    #[tokio::test]
    async fn test_upload_into_missing_folder() {
        let (blobs, drive) = setup();
        let result = drive
            .upload(1, UploadRequest::new("a.txt", b"abc".to_vec()).in_folder(42))
            .await;

        assert!(matches!(result, Err(DriveError::FolderNotFound(42))));
        assert_eq!(blobs.containers_created(), 0);
    }

    #[tokio::test]
    async fn test_search_rejects_empty_query() {
        let (_blobs, drive) = setup();
        assert!(matches!(
            drive.search("  ").await,
            Err(DriveError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_purge_requires_bin() {
        let (_blobs, drive) = setup();
        let file = drive
            .upload(1, UploadRequest::new("a.txt", b"abc".to_vec()))
            .await
            .unwrap();

        assert!(matches!(
            drive.purge_file(file.id).await,
            Err(DriveError::FileNotFound(_))
        ));
        assert!(drive.get_file(file.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_purge_keeps_shared_bytes() {
        let (blobs, drive) = setup();
        let file = drive
            .upload(1, UploadRequest::new("a.txt", b"abc".to_vec()))
            .await
            .unwrap();
        let copy = drive.copy_file(1, file.id, 0, None).await.unwrap();

        drive.delete_file(file.id).await.unwrap();
        drive.purge_file(file.id).await.unwrap();

        assert!(blobs.contains(&copy.blob.container, &copy.blob.object));
        assert_eq!(drive.download(copy.id).await.unwrap().content, b"abc");
    }
}
