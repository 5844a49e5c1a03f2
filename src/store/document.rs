//! Whole-document JSON persistence.
//!
//! Documents are read and written in one piece. A save goes through a
//! temporary sibling file and a rename, so the previous copy stays intact if
//! anything fails before the rename.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{DriveError, Result};

/// Load a document, falling back to `T::default()` when it is missing or corrupt.
///
/// A corrupt document is moved aside to `<path>.corrupt-<timestamp>` so the
/// next save cannot overwrite the only copy of its contents.
pub fn load_or_default<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::info!("No document at {}, starting empty", path.display());
            return T::default();
        }
        Err(e) => {
            tracing::warn!("Failed to read {}: {}. Starting empty", path.display(), e);
            return T::default();
        }
    };

    match serde_json::from_str(&content) {
        Ok(doc) => doc,
        Err(e) => {
            let backup = sibling(path, &format!(".corrupt-{}", Utc::now().timestamp()));
            match fs::rename(path, &backup) {
                Ok(()) => tracing::warn!(
                    "Corrupt document {} ({}), moved to {}. Starting empty",
                    path.display(),
                    e,
                    backup.display()
                ),
                Err(rename_err) => tracing::warn!(
                    "Corrupt document {} ({}), could not move it aside: {}. Starting empty",
                    path.display(),
                    e,
                    rename_err
                ),
            }
            T::default()
        }
    }
}

/// Atomically replace the document at `path` with `value`.
pub fn save<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)
        .map_err(|e| DriveError::Persistence(format!("serialize {}: {e}", path.display())))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| persistence(path, e))?;
        }
    }

    let tmp = sibling(path, ".tmp");
    if let Err(e) = fs::write(&tmp, content) {
        let _ = fs::remove_file(&tmp);
        return Err(persistence(path, e));
    }
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(persistence(path, e));
    }

    Ok(())
}

fn persistence(path: &Path, e: io::Error) -> DriveError {
    DriveError::Persistence(format!("write {}: {e}", path.display()))
}

/// `path` with `suffix` appended to its file name.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Doc {
        items: Vec<u32>,
    }

    #[test]
    fn test_missing_document_is_default() {
        let temp_dir = TempDir::new().unwrap();
        let doc: Doc = load_or_default(&temp_dir.path().join("none.json"));
        assert_eq!(doc, Doc::default());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("doc.json");

        save(&path, &Doc { items: vec![1, 2] }).unwrap();

        let doc: Doc = load_or_default(&path);
        assert_eq!(doc.items, vec![1, 2]);
        assert!(!sibling(&path, ".tmp").exists());
    }

    #[test]
    fn test_corrupt_document_is_moved_aside() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("doc.json");
        fs::write(&path, "{ not json").unwrap();

        let doc: Doc = load_or_default(&path);
        assert_eq!(doc, Doc::default());
        assert!(!path.exists());

        let backups: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().contains(".corrupt-"))
            .collect();
        assert_eq!(backups.len(), 1);
        assert_eq!(fs::read_to_string(backups[0].path()).unwrap(), "{ not json");
    }

    #[test]
    fn test_failed_save_keeps_previous_copy() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("doc.json");
        save(&path, &Doc { items: vec![1] }).unwrap();

        // A directory where the temp file should go makes the write fail.
        fs::create_dir(sibling(&path, ".tmp")).unwrap();
        let result = save(&path, &Doc { items: vec![1, 2, 3] });

        assert!(matches!(result, Err(DriveError::Persistence(_))));
        let doc: Doc = load_or_default(&path);
        assert_eq!(doc.items, vec![1]);
    }
}
