//! Bulk file operations.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::service::{copy_in, move_in, set_starred_in, soft_delete_in};
use super::Drive;
use crate::{DriveError, Result};

/// Operation applied to every id of a bulk request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkOp {
    Move,
    Copy,
    Delete,
    Star,
    Unstar,
}

impl BulkOp {
    pub fn needs_target(self) -> bool {
        matches!(self, BulkOp::Move | BulkOp::Copy)
    }
}

/// Per-item result of a bulk request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BulkOutcome {
    Moved,
    Copied { new_id: u64 },
    Deleted,
    Starred,
    Unstarred,
    NotFound,
}

impl BulkOutcome {
    pub fn is_ok(&self) -> bool {
        !matches!(self, BulkOutcome::NotFound)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BulkItem {
    pub file_id: u64,
    #[serde(flatten)]
    pub outcome: BulkOutcome,
}

impl Drive {
    /// Apply `op` to each of `ids`, reporting an outcome per id.
    ///
    /// Ids without an ACTIVE file are reported as `NotFound` and do not stop
    /// the others. The target folder of a move or copy is checked once up
    /// front; an invalid target fails the whole request. All changes are
    /// saved together.
    pub async fn bulk(
        &self,
        actor: i64,
        op: BulkOp,
        ids: &[u64],
        target: Option<u64>,
    ) -> Result<Vec<BulkItem>> {
        let target = match (op.needs_target(), target) {
            (true, None) => {
                return Err(DriveError::InvalidInput(format!(
                    "{op:?} requires a target folder"
                )))
            }
            (true, Some(folder_id)) => folder_id,
            (false, _) => 0,
        };
        let now = Utc::now();

        let items = self
            .store
            .transact(|doc| {
                if op.needs_target() {
                    doc.ensure_target(target)?;
                }

                let mut items = Vec::with_capacity(ids.len());
                for &file_id in ids {
                    let applied = match op {
                        BulkOp::Move => {
                            move_in(doc, file_id, target, now).map(|_| BulkOutcome::Moved)
                        }
                        BulkOp::Copy => copy_in(doc, actor, file_id, target, None, now)
                            .map(|copy| BulkOutcome::Copied { new_id: copy.id }),
                        BulkOp::Delete => {
                            soft_delete_in(doc, file_id, now).map(|_| BulkOutcome::Deleted)
                        }
                        BulkOp::Star => {
                            set_starred_in(doc, file_id, true).map(|_| BulkOutcome::Starred)
                        }
                        BulkOp::Unstar => {
                            set_starred_in(doc, file_id, false).map(|_| BulkOutcome::Unstarred)
                        }
                    };

                    let outcome = match applied {
                        Ok(outcome) => outcome,
                        Err(DriveError::FileNotFound(_)) => BulkOutcome::NotFound,
                        Err(e) => return Err(e),
                    };
                    items.push(BulkItem { file_id, outcome });
                }
                Ok(items)
            })
            .await?;

        let succeeded = items.iter().filter(|i| i.outcome.is_ok()).count();
        tracing::info!(
            "Bulk {:?} by user {}: {} of {} succeeded",
            op,
            actor,
            succeeded,
            items.len()
        );
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::MemoryBlobStore;
    use crate::drive::{DriveSettings, UploadRequest};
    use std::sync::Arc;

    async fn drive_with_files(n: usize) -> (Drive, Vec<u64>) {
        let drive = Drive::in_memory(Arc::new(MemoryBlobStore::new()), DriveSettings::default());
        let mut ids = Vec::new();
        for i in 0..n {
            let file = drive
                .upload(1, UploadRequest::new(format!("f{i}.txt"), b"x".to_vec()))
                .await
                .unwrap();
            ids.push(file.id);
        }
        (drive, ids)
    }

    #[test]
    fn test_item_serialization() {
        let item = BulkItem {
            file_id: 3,
            outcome: BulkOutcome::Copied { new_id: 9 },
        };
        let json = serde_json::to_value(item).unwrap();
        assert_eq!(json["file_id"], 3);
        assert_eq!(json["status"], "copied");
        assert_eq!(json["new_id"], 9);
    }

    #[tokio::test]
    async fn test_bulk_delete_partial_success() {
        let (drive, ids) = drive_with_files(1).await;

        let items = drive
            .bulk(1, BulkOp::Delete, &[ids[0], 99999], None)
            .await
            .unwrap();

        assert_eq!(
            items,
            vec![
                BulkItem {
                    file_id: ids[0],
                    outcome: BulkOutcome::Deleted
                },
                BulkItem {
                    file_id: 99999,
                    outcome: BulkOutcome::NotFound
                },
            ]
        );
        assert!(drive.get_file(ids[0]).await.is_err());
        assert_eq!(drive.list_bin().await.files.len(), 1);
    }

    #[tokio::test]
    async fn test_bulk_move_requires_valid_target() {
        let (drive, ids) = drive_with_files(2).await;

        assert!(matches!(
            drive.bulk(1, BulkOp::Move, &ids, None).await,
            Err(DriveError::InvalidInput(_))
        ));
        assert!(matches!(
            drive.bulk(1, BulkOp::Move, &ids, Some(4242)).await,
            Err(DriveError::FolderNotFound(4242))
        ));

        let folder = drive.create_folder(1, "Target", 0).await.unwrap();
        let items = drive
            .bulk(1, BulkOp::Move, &ids, Some(folder.id))
            .await
            .unwrap();
        assert!(items.iter().all(|i| i.outcome == BulkOutcome::Moved));
        assert_eq!(drive.list_files(folder.id).await.len(), 2);
    }

    #[tokio::test]
    async fn test_bulk_copy_and_star() {
        let (drive, ids) = drive_with_files(2).await;

        let items = drive.bulk(1, BulkOp::Copy, &ids, Some(0)).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(drive.list_files(0).await.len(), 4);

        drive.bulk(1, BulkOp::Star, &ids, None).await.unwrap();
        assert_eq!(drive.list_starred().await.len(), 2);

        drive.bulk(1, BulkOp::Unstar, &ids[..1], None).await.unwrap();
        assert_eq!(drive.list_starred().await.len(), 1);
    }
}
