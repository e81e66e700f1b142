//! services/tracker/src/adapters/json_store.rs
//!
//! This module contains the file-backed document store, which is the concrete
//! implementation of the `DocumentStore` port from the core crate. Every key is
//! one pretty-printed JSON file under the data directory.

use async_trait::async_trait;
use presence_core::{DocumentStore, PortError, PortResult};
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A JSON file store that implements the `DocumentStore` port.
pub struct JsonFileStore {
    root: PathBuf,
    /// Serializes writes so two never race on the same file.
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Creates a new `JsonFileStore` rooted at `root`. The directory is
    /// created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", key))
    }
}

fn unexpected(context: &str, path: &Path, e: impl std::fmt::Display) -> PortError {
    PortError::Unexpected(format!("{} {}: {}", context, path.display(), e))
}

//=========================================================================================
// DocumentStore Implementation
//=========================================================================================

#[async_trait]
impl DocumentStore for JsonFileStore {
    async fn exists(&self, key: &str) -> PortResult<bool> {
        let path = self.path_for(key);
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| unexpected("failed to stat", &path, e))
    }

    async fn read(&self, key: &str) -> PortResult<Value> {
        let path = self.path_for(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(PortError::NotFound(path.display().to_string()))
            }
            Err(e) => return Err(unexpected("failed to read", &path, e)),
        };
        serde_json::from_slice(&bytes).map_err(|e| unexpected("invalid JSON in", &path, e))
    }

    /// Writes to a sibling temp file, syncs it, then renames it over the
    /// target so readers only ever see a complete document.
    async fn write(&self, key: &str, document: &Value) -> PortResult<()> {
        let path = self.path_for(key);
        let tmp_path = self.root.join(format!(".{}.json.tmp", key));
        let bytes = serde_json::to_vec_pretty(document)
            .map_err(|e| unexpected("failed to encode", &path, e))?;

        let _guard = self.write_lock.lock().await;

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| unexpected("failed to create", &self.root, e))?;

        let mut file = tokio::fs::File::create(&tmp_path)
            .await
            .map_err(|e| unexpected("failed to create", &tmp_path, e))?;
        file.write_all(&bytes)
            .await
            .map_err(|e| unexpected("failed to write", &tmp_path, e))?;
        file.sync_all()
            .await
            .map_err(|e| unexpected("failed to sync", &tmp_path, e))?;
        drop(file);

        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| unexpected("failed to replace", &path, e))?;

        debug!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn missing_document_is_not_found() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());

        assert!(!store.exists("locationBoxes").await.unwrap());
        assert!(matches!(
            store.read("locationBoxes").await,
            Err(PortError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn write_then_read_returns_the_document() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested"));
        let document = json!({"lobby": {"id": "lobby", "height": 2.0}});

        store.write("locationBoxes", &document).await.unwrap();

        assert!(store.exists("locationBoxes").await.unwrap());
        assert_eq!(store.read("locationBoxes").await.unwrap(), document);
        assert!(dir.path().join("nested/locationBoxes.json").is_file());
    }

    #[tokio::test]
    async fn overwrite_leaves_no_temp_file_behind() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());

        store.write("locationTracking", &json!({"u1": {}})).await.unwrap();
        store.write("locationTracking", &json!({"u2": {}})).await.unwrap();

        assert_eq!(
            store.read("locationTracking").await.unwrap(),
            json!({"u2": {}})
        );
        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["locationTracking.json".to_string()]);
    }

    #[tokio::test]
    async fn corrupt_file_is_an_unexpected_error() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("locationTracking.json"), b"{\"u1\": ").unwrap();
        let store = JsonFileStore::new(dir.path());

        assert!(matches!(
            store.read("locationTracking").await,
            Err(PortError::Unexpected(_))
        ));
    }

    #[tokio::test]
    async fn concurrent_writes_are_serialized() {
        let dir = tempdir().unwrap();
        let store = std::sync::Arc::new(JsonFileStore::new(dir.path()));

        let mut handles = Vec::new();
        for n in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.write("locationTracking", &json!({ "n": n })).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let document = store.read("locationTracking").await.unwrap();
        assert!(document["n"].as_i64().unwrap() < 8);
    }
}
