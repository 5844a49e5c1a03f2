//! Concurrency tests for msgdrive.
//!
//! These tests verify that concurrent engine calls never interleave inside
//! one load-mutate-persist cycle.

use std::collections::HashSet;
use std::sync::Arc;

use msgdrive::drive::BulkOp;
use msgdrive::{Drive, DriveSettings, MemoryBlobStore, UploadRequest};

const ACTOR: i64 = 7;

fn setup_test_drive() -> (Arc<Drive>, Arc<MemoryBlobStore>) {
    let blobs = Arc::new(MemoryBlobStore::new());
    let drive = Arc::new(Drive::in_memory(blobs.clone(), DriveSettings::default()));
    (drive, blobs)
}

/// Concurrent uploads get distinct ids and all land in the document.
#[tokio::test]
async fn test_concurrent_uploads_get_unique_ids() {
    let (drive, _blobs) = setup_test_drive();

    const NUM_UPLOADS: usize = 20;

    let mut handles = Vec::new();
    for i in 0..NUM_UPLOADS {
        let drive = Arc::clone(&drive);
        handles.push(tokio::spawn(async move {
            drive
                .upload(ACTOR, UploadRequest::new(format!("file-{i}.txt"), vec![i as u8]))
                .await
        }));
    }

    let mut ids = HashSet::new();
    for handle in handles {
        let file = handle.await.unwrap().unwrap();
        assert!(ids.insert(file.id), "duplicate id {}", file.id);
    }

    assert_eq!(ids.len(), NUM_UPLOADS);
    assert_eq!(drive.list_files(0).await.len(), NUM_UPLOADS);
    let next_id = drive.store().read(|doc| doc.next_id).await;
    assert!(ids.iter().all(|id| *id < next_id));
}

/// The first uploads into a dedicated folder race to create its container;
/// exactly one container is created.
#[tokio::test]
async fn test_concurrent_first_uploads_create_one_container() {
    let (drive, blobs) = setup_test_drive();
    let folder = drive.create_folder(ACTOR, "race", 0).await.unwrap();

    const NUM_UPLOADS: usize = 10;

    let mut handles = Vec::new();
    for i in 0..NUM_UPLOADS {
        let drive = Arc::clone(&drive);
        let folder_id = folder.id;
        handles.push(tokio::spawn(async move {
            drive
                .upload(
                    ACTOR,
                    UploadRequest::new(format!("part-{i}"), vec![0u8; 16]).in_folder(folder_id),
                )
                .await
        }));
    }

    let mut containers = HashSet::new();
    for handle in handles {
        let file = handle.await.unwrap().unwrap();
        containers.insert(file.blob.container);
    }

    assert_eq!(containers.len(), 1);
    assert_eq!(blobs.containers_created(), 1);
    let container = containers.into_iter().next().unwrap();
    assert_eq!(blobs.object_count(&container), Some(NUM_UPLOADS));
}

/// Concurrent renames of one file each append exactly one version.
#[tokio::test]
async fn test_concurrent_renames_keep_versions_dense() {
    let (drive, _blobs) = setup_test_drive();
    let file = drive
        .upload(ACTOR, UploadRequest::new("start.txt", b"x".to_vec()))
        .await
        .unwrap();

    const NUM_RENAMES: usize = 10;

    let mut handles = Vec::new();
    for i in 0..NUM_RENAMES {
        let drive = Arc::clone(&drive);
        let id = file.id;
        handles.push(tokio::spawn(async move {
            drive.rename(id, &format!("name-{i}")).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let versions = drive.versions(file.id).await.unwrap();
    assert_eq!(versions.len(), NUM_RENAMES);
    for (i, version) in versions.iter().enumerate() {
        assert_eq!(version.version_number, i as u32 + 1);
    }
    assert_eq!(versions[0].previous_name, "start.txt");
}

/// A bulk delete racing single deletes never reports a file twice as deleted.
#[tokio::test]
async fn test_bulk_and_single_deletes_do_not_double_count() {
    let (drive, _blobs) = setup_test_drive();

    let mut ids = Vec::new();
    for i in 0..6 {
        let file = drive
            .upload(ACTOR, UploadRequest::new(format!("{i}.txt"), vec![1]))
            .await
            .unwrap();
        ids.push(file.id);
    }

    let bulk = {
        let drive = Arc::clone(&drive);
        let ids = ids.clone();
        tokio::spawn(async move { drive.bulk(ACTOR, BulkOp::Delete, &ids, None).await })
    };
    let singles: Vec<_> = ids
        .iter()
        .map(|&id| {
            let drive = Arc::clone(&drive);
            tokio::spawn(async move { drive.delete_file(id).await.is_ok() })
        })
        .collect();

    let bulk_ok = bulk
        .await
        .unwrap()
        .unwrap()
        .iter()
        .filter(|item| item.outcome.is_ok())
        .count();
    let mut single_ok = 0;
    for handle in singles {
        if handle.await.unwrap() {
            single_ok += 1;
        }
    }

    assert_eq!(bulk_ok + single_ok, ids.len());
    assert_eq!(drive.list_bin().await.files.len(), ids.len());
}
