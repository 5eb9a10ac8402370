//! JSON-file storage: one pretty-printed document per key under a root
//! directory (`<root>/<key>.json`).
//!
//! Writes go to a uniquely named temporary sibling first and are renamed over
//! the target, so readers never observe a half-written snapshot.

use async_trait::async_trait;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

use crate::error::{PersistResult, PersistenceError};
use crate::traits::store::SnapshotStore;

/// File-backed snapshot store.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path of the document for `key`. Keys may contain `/` to nest
    /// directories but may not escape the root.
    pub fn path_for(&self, key: &str) -> PersistResult<PathBuf> {
        let relative = Path::new(key);
        let valid = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !valid {
            return Err(PersistenceError::InvalidKey {
                key: key.to_string(),
            });
        }
        Ok(self.root.join(format!("{}.json", key)))
    }

    async fn write_atomic(&self, key: &str, path: &Path, bytes: &[u8]) -> PersistResult<()> {
        let io = |source| PersistenceError::Io {
            key: key.to_string(),
            source,
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io)?;
        }

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("snapshot.json");
        let tmp_path = path.with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4()));

        let result = async {
            let mut file = tokio::fs::File::create(&tmp_path).await?;
            file.write_all(bytes).await?;
            file.sync_all().await?;
            drop(file);
            tokio::fs::rename(&tmp_path, path).await
        }
        .await;

        if let Err(e) = result {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(io(e));
        }
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for FileStore {
    async fn load(&self, key: &str) -> PersistResult<Option<Value>> {
        let path = self.path_for(key)?;

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(PersistenceError::Io {
                    key: key.to_string(),
                    source,
                })
            }
        };

        let document = serde_json::from_slice(&bytes).map_err(|e| PersistenceError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        })?;

        debug!(key = %key, path = %path.display(), "Loaded snapshot document");
        Ok(Some(document))
    }

    async fn save(&self, key: &str, document: &Value) -> PersistResult<()> {
        let path = self.path_for(key)?;
        let bytes = serde_json::to_vec_pretty(document).map_err(|e| PersistenceError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        })?;

        self.write_atomic(key, &path, &bytes).await?;
        debug!(key = %key, path = %path.display(), bytes = bytes.len(), "Saved snapshot document");
        Ok(())
    }

    fn name(&self) -> &str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_missing_document_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        assert_eq!(store.load("i4/new").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_save_creates_nested_path() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        store
            .save("i5/used-links", &json!({"links": [], "timestamp": 1}))
            .await
            .unwrap();

        assert!(dir.path().join("i5").join("used-links.json").exists());
        assert_eq!(
            store.load("i5/used-links").await.unwrap(),
            Some(json!({"links": [], "timestamp": 1}))
        );
    }

    #[tokio::test]
    async fn test_save_replaces_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        store.save("i4/new", &json!({"v": 1})).await.unwrap();
        store.save("i4/new", &json!({"v": 2})).await.unwrap();

        assert_eq!(store.load("i4/new").await.unwrap(), Some(json!({"v": 2})));
        let entries: Vec<_> = std::fs::read_dir(dir.path().join("i4"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_document() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
        let store = FileStore::new(dir.path());

        assert!(matches!(
            store.load("broken").await,
            Err(PersistenceError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_keys_cannot_escape_root() {
        let store = FileStore::new("/tmp/snapshots");

        assert!(store.path_for("../etc/passwd").is_err());
        assert!(store.path_for("/abs").is_err());
        assert!(store.path_for("").is_err());
        assert!(store.path_for("i5/new").is_ok());
    }
}
