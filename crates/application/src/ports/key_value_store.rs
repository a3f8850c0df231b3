//! Key-value store port
//!
//! Backs both the secure store (tokens, cached user) and the less sensitive
//! local store (duty status).

use async_trait::async_trait;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// String key-value persistence.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads a value; `None` when the key is absent.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Writes a value, replacing any previous one.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Deletes a key; deleting an absent key succeeds.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

impl dyn KeyValueStore {
    /// Reads and decodes a JSON value.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` when the stored text is not valid JSON for `T`.
    pub async fn get_json<T>(&self, key: &str) -> Result<Option<T>, StorageError>
    where
        T: serde::de::DeserializeOwned,
    {
        match self.get(key).await? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| StorageError::Serialization(e.to_string())),
            None => Ok(None),
        }
    }

    /// Encodes and writes a JSON value.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` when `value` cannot be encoded.
    pub async fn set_json<T>(&self, key: &str, value: &T) -> Result<(), StorageError>
    where
        T: serde::Serialize + ?Sized,
    {
        let raw =
            serde_json::to_string(value).map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.set(key, &raw).await
    }
}
