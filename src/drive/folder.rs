//! Folder operations and the delete cascade.

use std::collections::{BTreeSet, HashSet};

use chrono::Utc;
use serde::Serialize;

use super::{name, Drive};
use crate::blob::ContainerHandle;
use crate::config::{CascadeMode, Isolation};
use crate::container::Scope;
use crate::store::{Folder, FolderState, Metadata, StorageMode};
use crate::{DriveError, Result};

/// What a folder delete touched.
#[derive(Debug, Clone, Serialize)]
pub struct FolderDeletion {
    pub folder: Folder,
    /// Folders moved to the bin, this one included.
    pub folders_deleted: usize,
    pub files_deleted: usize,
    /// Dedicated containers torn down.
    pub containers_released: usize,
}

impl Drive {
    /// Create a folder under root or an ACTIVE folder.
    ///
    /// Its storage mode is fixed here from the isolation setting.
    pub async fn create_folder(&self, actor: i64, name: &str, parent_id: u64) -> Result<Folder> {
        let name = name::sanitize(name)?;
        let storage = match self.settings.isolation {
            Isolation::Shared => StorageMode::Shared,
            Isolation::PerFolder => StorageMode::Dedicated,
        };

        let folder = self
            .store
            .transact(|doc| {
                doc.ensure_target(parent_id)?;
                let folder = Folder {
                    id: doc.allocate_id(),
                    name,
                    parent_id,
                    created_by: actor,
                    created_at: Utc::now(),
                    state: FolderState::Active,
                    storage,
                };
                doc.folders.push(folder.clone());
                Ok(folder)
            })
            .await?;

        tracing::info!(
            "Created folder {} '{}' under {} ({:?} storage)",
            folder.id,
            folder.name,
            folder.parent_id,
            folder.storage
        );
        Ok(folder)
    }

    /// ACTIVE folders directly under `parent_id`.
    pub async fn list_folders(&self, parent_id: u64) -> Vec<Folder> {
        self.store
            .read(|doc| {
                doc.folders
                    .iter()
                    .filter(|f| f.is_active() && f.parent_id == parent_id)
                    .cloned()
                    .collect()
            })
            .await
    }

    pub async fn get_folder(&self, id: u64) -> Result<Folder> {
        self.store.read(|doc| doc.active_folder(id).cloned()).await
    }

    /// Soft-delete a folder and the ACTIVE files in it.
    ///
    /// With [`CascadeMode::Recursive`] every ACTIVE descendant folder and its
    /// files go to the bin too. Dedicated containers of the deleted folders
    /// are torn down afterwards, except where a file record outside the
    /// cascade still points into them.
    pub async fn delete_folder(&self, id: u64) -> Result<FolderDeletion> {
        let cascade = self.settings.cascade;
        let now = Utc::now();

        let (mut deletion, dedicated, cascaded_files) = self
            .store
            .transact(|doc| {
                doc.active_folder(id)?;
                let folder_ids = cascade_set(doc, id, cascade);

                let mut cascaded_files = HashSet::new();
                for file in doc.files.iter_mut() {
                    if file.is_active() && folder_ids.contains(&file.folder_id) {
                        file.soft_delete(now)?;
                        cascaded_files.insert(file.id);
                    }
                }

                let mut folder = None;
                let mut dedicated = Vec::new();
                for &folder_id in &folder_ids {
                    let Some(record) = doc.folder_mut(folder_id) else {
                        continue;
                    };
                    record.soft_delete(now)?;
                    if record.storage == StorageMode::Dedicated {
                        dedicated.push(folder_id);
                    }
                    if folder_id == id {
                        folder = Some(record.clone());
                    }
                }

                let folder = folder.ok_or(DriveError::FolderNotFound(id))?;
                let deletion = FolderDeletion {
                    folder,
                    folders_deleted: folder_ids.len(),
                    files_deleted: cascaded_files.len(),
                    containers_released: 0,
                };
                Ok((deletion, dedicated, cascaded_files))
            })
            .await?;

        // Containers are looked up after the commit.
        for folder_id in dedicated {
            if self.release_folder_container(folder_id, &cascaded_files).await {
                deletion.containers_released += 1;
            }
        }

        tracing::info!(
            "Deleted folder {}: {} folders and {} files moved to bin, {} containers released",
            id,
            deletion.folders_deleted,
            deletion.files_deleted,
            deletion.containers_released
        );
        Ok(deletion)
    }

    /// Tear down the dedicated container of `folder_id` once the folder is
    /// no longer ACTIVE.
    ///
    /// The container is kept while a file outside `ignored` still stores its
    /// bytes there. Returns whether a container was released.
    pub(super) async fn release_folder_container(
        &self,
        folder_id: u64,
        ignored: &HashSet<u64>,
    ) -> bool {
        let scope = Scope::Folder(folder_id);
        let Some(handle) = self.containers.lookup(scope).await else {
            return false;
        };

        let keep = self
            .store
            .read(|doc| {
                doc.active_folder(folder_id).is_ok() || referenced_outside(doc, &handle, ignored)
            })
            .await;
        if keep {
            tracing::info!("Keeping container {} of {}: still referenced", handle, scope);
            return false;
        }

        match self.containers.teardown(scope).await {
            Ok(released) => released.is_some(),
            Err(e) => {
                tracing::warn!("Failed to forget container of {}: {}", scope, e);
                false
            }
        }
    }
}

/// `root` plus, for a recursive cascade, its ACTIVE descendants.
fn cascade_set(doc: &Metadata, root: u64, mode: CascadeMode) -> BTreeSet<u64> {
    let mut ids = BTreeSet::from([root]);
    if mode == CascadeMode::Flat {
        return ids;
    }

    let mut frontier = vec![root];
    while let Some(parent) = frontier.pop() {
        for child in doc
            .folders
            .iter()
            .filter(|f| f.is_active() && f.parent_id == parent)
        {
            if ids.insert(child.id) {
                frontier.push(child.id);
            }
        }
    }
    ids
}

/// Whether any file not in `cascaded` stores its bytes in `container`.
fn referenced_outside(
    doc: &Metadata,
    container: &ContainerHandle,
    cascaded: &HashSet<u64>,
) -> bool {
    doc.files
        .iter()
        .any(|f| &f.blob.container == container && !cascaded.contains(&f.id))
}
