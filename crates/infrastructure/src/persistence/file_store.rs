//! File-backed key-value store.
//!
//! Each store is one JSON object on disk mapping keys to string values:
//! ```json
//! {
//!   "accessToken": "eyJhbGciOi...",
//!   "tokenData": "{\"accessToken\":\"eyJhbGciOi...\",...}"
//! }
//! ```
//! The file is rewritten whole on every change and is readable only by its
//! owner on Unix.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use prohero_application::ports::{KeyValueStore, StorageError};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use crate::serialization::{from_json_bytes, to_json_stable_bytes};

/// Key-value store persisted as a JSON file.
#[derive(Debug)]
pub struct FileKeyValueStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileKeyValueStore {
    /// Creates a store backed by `path`. The file is created on first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// The backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match fs::read(&self.path).await {
            Ok(content) => {
                from_json_bytes(&content).map_err(|e| StorageError::Serialization(e.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let content =
            to_json_stable_bytes(entries).map_err(|e| StorageError::Serialization(e.to_string()))?;

        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, &content).await?;
        restrict_to_owner(&staging).await?;
        fs::rename(&staging, &self.path).await?;
        debug!(path = %self.path.display(), entries = entries.len(), "store written");
        Ok(())
    }
}

#[cfg(unix)]
async fn restrict_to_owner(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await
}

#[cfg(not(unix))]
async fn restrict_to_owner(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_all().await?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.read_all().await?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.read_all().await?;
        if entries.remove(key).is_some() {
            self.write_all(&entries).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileKeyValueStore::new(dir.path().join("secure.json"));

        assert_eq!(store.get("accessToken").await.unwrap(), None);
        store.remove("accessToken").await.unwrap();
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_values_survive_a_new_instance() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("secure.json");

        let store = FileKeyValueStore::new(&path);
        store.set("refreshToken", "r1").await.unwrap();
        store.set("accessToken", "a1").await.unwrap();
        store.set("accessToken", "a2").await.unwrap();

        let reopened = FileKeyValueStore::new(&path);
        assert_eq!(reopened.get("accessToken").await.unwrap().as_deref(), Some("a2"));
        assert_eq!(reopened.get("refreshToken").await.unwrap().as_deref(), Some("r1"));

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "{\n  \"accessToken\": \"a2\",\n  \"refreshToken\": \"r1\"\n}\n"
        );
    }

    #[tokio::test]
    async fn test_remove_deletes_key() {
        let dir = TempDir::new().unwrap();
        let store = FileKeyValueStore::new(dir.path().join("local.json"));
        store.set("dutyStatus", "true").await.unwrap();
        store.remove("dutyStatus").await.unwrap();
        assert_eq!(store.get("dutyStatus").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_a_serialization_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("secure.json");
        std::fs::write(&path, "{oops").unwrap();

        let store = FileKeyValueStore::new(&path);
        assert!(matches!(
            store.get("user").await,
            Err(StorageError::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_writes_keep_every_key() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(FileKeyValueStore::new(dir.path().join("secure.json")));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.set(&format!("k{i}"), "v").await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        for i in 0..8 {
            assert!(store.get(&format!("k{i}")).await.unwrap().is_some());
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = FileKeyValueStore::new(dir.path().join("secure.json"));
        store.set("accessToken", "a").await.unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
