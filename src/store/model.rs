//! Records held in the metadata document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::blob::BlobRef;
use crate::{DriveError, Result};

/// Folder id meaning "no folder".
pub const ROOT_FOLDER_ID: u64 = 0;

/// A user known to the drive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// External identity id.
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
}

/// Which container scope a folder's uploads go to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageMode {
    /// Uploads share the default container.
    #[default]
    Shared,
    /// Uploads go to a container owned by this folder.
    Dedicated,
}

/// Lifecycle state of a folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FolderState {
    Active,
    Deleted { deleted_at: DateTime<Utc> },
}

/// A folder in the drive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    pub id: u64,
    pub name: String,
    /// Parent folder id ([`ROOT_FOLDER_ID`] for top-level folders).
    pub parent_id: u64,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    pub state: FolderState,
    #[serde(default)]
    pub storage: StorageMode,
}

impl Folder {
    pub fn is_active(&self) -> bool {
        matches!(self.state, FolderState::Active)
    }

    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        match self.state {
            FolderState::Deleted { deleted_at } => Some(deleted_at),
            FolderState::Active => None,
        }
    }

    /// ACTIVE → DELETED.
    pub fn soft_delete(&mut self, now: DateTime<Utc>) -> Result<()> {
        if !self.is_active() {
            return Err(DriveError::FolderNotFound(self.id));
        }
        self.state = FolderState::Deleted { deleted_at: now };
        Ok(())
    }
}

/// Lifecycle state of a file.
///
/// PURGED is not represented: a purged file has no record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileState {
    Active {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        restored_at: Option<DateTime<Utc>>,
    },
    Deleted {
        deleted_at: DateTime<Utc>,
    },
}

/// A prior name of a file, captured before a rename.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    /// 1-based, equal to the position in the file's version list plus one.
    pub version_number: u32,
    pub previous_name: String,
    pub captured_at: DateTime<Utc>,
}

/// A file in the drive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct File {
    pub id: u64,
    pub name: String,
    /// Containing folder ([`ROOT_FOLDER_ID`] for the root).
    pub folder_id: u64,
    /// Byte length of the stored blob.
    pub size: u64,
    pub mime_type: String,
    pub blob: BlobRef,
    pub uploaded_by: i64,
    pub created_at: DateTime<Utc>,
    pub state: FileState,
    #[serde(default)]
    pub starred: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub versions: Vec<Version>,
}

impl File {
    pub fn is_active(&self) -> bool {
        matches!(self.state, FileState::Active { .. })
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self.state, FileState::Deleted { .. })
    }

    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        match self.state {
            FileState::Deleted { deleted_at } => Some(deleted_at),
            FileState::Active { .. } => None,
        }
    }

    pub fn restored_at(&self) -> Option<DateTime<Utc>> {
        match self.state {
            FileState::Active { restored_at } => restored_at,
            FileState::Deleted { .. } => None,
        }
    }

    /// ACTIVE → DELETED.
    pub fn soft_delete(&mut self, now: DateTime<Utc>) -> Result<()> {
        if !self.is_active() {
            return Err(DriveError::FileNotFound(self.id));
        }
        self.state = FileState::Deleted { deleted_at: now };
        Ok(())
    }

    /// DELETED → ACTIVE.
    pub fn restore(&mut self, now: DateTime<Utc>) -> Result<()> {
        if !self.is_deleted() {
            return Err(DriveError::FileNotFoundInBin(self.id));
        }
        self.state = FileState::Active {
            restored_at: Some(now),
        };
        Ok(())
    }

    /// Append a snapshot of the current name and return its number.
    pub fn capture_version(&mut self, now: DateTime<Utc>) -> u32 {
        let version_number = self.versions.len() as u32 + 1;
        self.versions.push(Version {
            version_number,
            previous_name: self.name.clone(),
            captured_at: now,
        });
        version_number
    }

    /// Rename, snapshotting the old name first.
    pub fn rename(&mut self, new_name: String, now: DateTime<Utc>) -> Result<()> {
        if !self.is_active() {
            return Err(DriveError::FileNotFound(self.id));
        }
        self.capture_version(now);
        self.name = new_name;
        Ok(())
    }

    /// Roll the name back to the one captured in `version_number`.
    ///
    /// The current name is snapshotted first, so numbers are never reused.
    pub fn restore_version(&mut self, version_number: u32, now: DateTime<Utc>) -> Result<()> {
        if !self.is_active() {
            return Err(DriveError::FileNotFound(self.id));
        }
        let previous_name = self
            .versions
            .iter()
            .find(|v| v.version_number == version_number)
            .map(|v| v.previous_name.clone())
            .ok_or(DriveError::VersionNotFound {
                file_id: self.id,
                version: version_number,
            })?;
        self.capture_version(now);
        self.name = previous_name;
        Ok(())
    }
}

/// The whole metadata document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub folders: Vec<Folder>,
    #[serde(default)]
    pub files: Vec<File>,
    /// Next id handed out to a folder or file. Always greater than every issued id.
    #[serde(default = "default_next_id")]
    pub next_id: u64,
}

fn default_next_id() -> u64 {
    1
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            users: Vec::new(),
            folders: Vec::new(),
            files: Vec::new(),
            next_id: default_next_id(),
        }
    }
}

impl Metadata {
    /// Take the next id from the shared folder/file counter.
    pub fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Raise `next_id` above every id already present.
    ///
    /// Returns `true` if the counter had to move.
    pub fn repair_next_id(&mut self) -> bool {
        let max_issued = self
            .folders
            .iter()
            .map(|f| f.id)
            .chain(self.files.iter().map(|f| f.id))
            .max()
            .unwrap_or(0);
        let floor = (max_issued + 1).max(default_next_id());
        if self.next_id < floor {
            self.next_id = floor;
            return true;
        }
        false
    }

    pub fn user(&self, id: i64) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    pub fn file(&self, id: u64) -> Option<&File> {
        self.files.iter().find(|f| f.id == id)
    }

    pub fn file_mut(&mut self, id: u64) -> Option<&mut File> {
        self.files.iter_mut().find(|f| f.id == id)
    }

    pub fn active_file(&self, id: u64) -> Result<&File> {
        self.file(id)
            .filter(|f| f.is_active())
            .ok_or(DriveError::FileNotFound(id))
    }

    pub fn active_file_mut(&mut self, id: u64) -> Result<&mut File> {
        self.file_mut(id)
            .filter(|f| f.is_active())
            .ok_or(DriveError::FileNotFound(id))
    }

    pub fn binned_file_mut(&mut self, id: u64) -> Result<&mut File> {
        self.file_mut(id)
            .filter(|f| f.is_deleted())
            .ok_or(DriveError::FileNotFoundInBin(id))
    }

    pub fn folder(&self, id: u64) -> Option<&Folder> {
        self.folders.iter().find(|f| f.id == id)
    }

    pub fn folder_mut(&mut self, id: u64) -> Option<&mut Folder> {
        self.folders.iter_mut().find(|f| f.id == id)
    }

    pub fn active_folder(&self, id: u64) -> Result<&Folder> {
        self.folder(id)
            .filter(|f| f.is_active())
            .ok_or(DriveError::FolderNotFound(id))
    }

    /// Root, or an ACTIVE folder.
    pub fn is_valid_target(&self, folder_id: u64) -> bool {
        folder_id == ROOT_FOLDER_ID || self.active_folder(folder_id).is_ok()
    }

    /// Fail with `FolderNotFound` unless `folder_id` can hold files.
    pub fn ensure_target(&self, folder_id: u64) -> Result<()> {
        if self.is_valid_target(folder_id) {
            Ok(())
        } else {
            Err(DriveError::FolderNotFound(folder_id))
        }
    }

    /// Number of records other than `except` whose bytes live at `blob`.
    pub fn blob_references(&self, blob: &BlobRef, except: u64) -> usize {
        self.files
            .iter()
            .filter(|f| f.id != except && &f.blob == blob)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::{ContainerHandle, ObjectRef};

    fn sample_file(id: u64) -> File {
        File {
            id,
            name: format!("file-{id}.txt"),
            folder_id: ROOT_FOLDER_ID,
            size: 3,
            mime_type: "text/plain".to_string(),
            blob: BlobRef {
                container: ContainerHandle("c".to_string()),
                object: ObjectRef(format!("o{id}")),
            },
            uploaded_by: 42,
            created_at: Utc::now(),
            state: FileState::Active { restored_at: None },
            starred: false,
            moved_at: None,
            versions: Vec::new(),
        }
    }

    #[test]
    fn test_allocate_id_increments() {
        let mut doc = Metadata::default();
        assert_eq!(doc.allocate_id(), 1);
        assert_eq!(doc.allocate_id(), 2);
        assert_eq!(doc.next_id, 3);
    }

    #[test]
    fn test_repair_next_id() {
        let mut doc = Metadata::default();
        doc.files.push(sample_file(9));
        assert!(doc.repair_next_id());
        assert_eq!(doc.next_id, 10);
        assert!(!doc.repair_next_id());
    }

    #[test]
    fn test_missing_fields_default() {
        let doc: Metadata = serde_json::from_str("{}").unwrap();
        assert_eq!(doc, Metadata::default());
    }

    #[test]
    fn test_soft_delete_and_restore() {
        let mut file = sample_file(1);
        let original = file.clone();
        let t1 = Utc::now();

        file.soft_delete(t1).unwrap();
        assert!(file.is_deleted());
        assert_eq!(file.deleted_at(), Some(t1));
        assert!(matches!(
            file.soft_delete(t1),
            Err(DriveError::FileNotFound(1))
        ));

        let t2 = Utc::now();
        file.restore(t2).unwrap();
        assert_eq!(file.restored_at(), Some(t2));
        assert_eq!(file.deleted_at(), None);
        assert!(matches!(
            file.restore(t2),
            Err(DriveError::FileNotFoundInBin(1))
        ));

        file.state = original.state;
        assert_eq!(file, original);
    }

    #[test]
    fn test_rename_captures_version() {
        let mut file = sample_file(1);
        let now = Utc::now();

        file.rename("b.txt".to_string(), now).unwrap();
        file.rename("c.txt".to_string(), now).unwrap();

        assert_eq!(file.name, "c.txt");
        assert_eq!(file.versions.len(), 2);
        assert_eq!(file.versions[0].previous_name, "file-1.txt");
        assert_eq!(file.versions[1].previous_name, "b.txt");
        for (i, v) in file.versions.iter().enumerate() {
            assert_eq!(v.version_number as usize, i + 1);
        }
    }

    #[test]
    fn test_restore_version_never_reuses_numbers() {
        let mut file = sample_file(1);
        let now = Utc::now();
        file.rename("renamed.txt".to_string(), now).unwrap();

        file.restore_version(1, now).unwrap();

        assert_eq!(file.name, "file-1.txt");
        assert_eq!(file.versions.len(), 2);
        assert_eq!(file.versions[1].version_number, 2);
        assert_eq!(file.versions[1].previous_name, "renamed.txt");

        assert!(matches!(
            file.restore_version(7, now),
            Err(DriveError::VersionNotFound {
                file_id: 1,
                version: 7
            })
        ));
    }

    #[test]
    fn test_state_serialization() {
        let mut file = sample_file(5);
        let json = serde_json::to_value(&file).unwrap();
        assert_eq!(json["state"]["status"], "active");
        assert!(json["state"].get("restored_at").is_none());

        file.soft_delete(Utc::now()).unwrap();
        let json = serde_json::to_value(&file).unwrap();
        assert_eq!(json["state"]["status"], "deleted");
        assert!(json["state"]["deleted_at"].is_string());

        let back: File = serde_json::from_value(json).unwrap();
        assert_eq!(back, file);
    }

    #[test]
    fn test_folder_targets() {
        let mut doc = Metadata::default();
        doc.folders.push(Folder {
            id: 3,
            name: "Docs".to_string(),
            parent_id: ROOT_FOLDER_ID,
            created_by: 1,
            created_at: Utc::now(),
            state: FolderState::Active,
            storage: StorageMode::Shared,
        });

        assert!(doc.is_valid_target(ROOT_FOLDER_ID));
        assert!(doc.is_valid_target(3));
        assert!(!doc.is_valid_target(4));

        doc.folder_mut(3).unwrap().soft_delete(Utc::now()).unwrap();
        assert!(matches!(
            doc.ensure_target(3),
            Err(DriveError::FolderNotFound(3))
        ));
    }

    #[test]
    fn test_blob_references() {
        let mut doc = Metadata::default();
        let a = sample_file(1);
        let mut b = sample_file(2);
        b.blob = a.blob.clone();
        doc.files.push(a.clone());
        doc.files.push(b);

        assert_eq!(doc.blob_references(&a.blob, 1), 1);
        assert_eq!(doc.blob_references(&a.blob, 99), 2);
    }
}
