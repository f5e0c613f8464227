//! # Cache Storage
//!
//! The stores persist successful fetches through the [`Storage`] trait, a small
//! async key-value contract (`get`, `set`, `remove`, `clear`). Values are plain
//! JSON documents; the stores write [`CacheRecord`] envelopes into them.
//!
//! Two backends ship with the crate:
//!
//! | Backend | Persistence | Use Case |
//! |---------|-------------|----------|
//! | [`MemoryStorage`] | Process lifetime | Default, tests |
//! | [`FileStorage`] | JSON file on disk | Desktop / CLI apps that survive restarts |
//!
//! Storage is an accelerator, not a source of truth: every error coming out of
//! a backend is logged and treated as a miss by the stores.

use crate::error::StorageError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Async key-value store used to persist cached resources.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Reads the value stored under `key`, or `None` if there is none.
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError>;

    /// Removes `key`. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Removes every key.
    async fn clear(&self) -> Result<(), StorageError>;
}

/// The persisted envelope for a cached resource.
///
/// `timestamp` is the write time in milliseconds since the Unix epoch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord<T> {
    pub data: T,
    pub timestamp: i64,
}

impl<T> CacheRecord<T> {
    /// Wraps `data` with the current time.
    pub fn now(data: T) -> Self {
        Self {
            data,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Milliseconds elapsed since the record was written. Never negative.
    pub fn age_millis(&self) -> u64 {
        let elapsed = chrono::Utc::now().timestamp_millis() - self.timestamp;
        u64::try_from(elapsed).unwrap_or(0)
    }
}

/// In-process storage backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, Value>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Value>> {
        // A poisoned map is still a valid map.
        self.items.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        self.lock().insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.lock().remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.lock().clear();
        Ok(())
    }
}

/// Persistent storage that keeps every key in a single JSON object on disk.
///
/// The whole document is rewritten on each mutation, which is fine for the
/// handful of entries a UI cache holds. A missing file reads as empty.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    // Serializes read-modify-write cycles on the document.
    write_lock: tokio::sync::Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_document(&self) -> Result<Map<String, Value>, StorageError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(Map::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Map::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_document(&self, document: &Map<String, Value>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let bytes = serde_json::to_vec(document)?;
        tokio::fs::write(&self.path, bytes).await?;
        debug!(path = %self.path.display(), keys = document.len(), "Storage flushed");
        Ok(())
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let document = self.read_document().await?;
        Ok(document.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut document = self.read_document().await?;
        document.insert(key.to_string(), value);
        self.write_document(&document).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut document = self.read_document().await?;
        if document.remove(key).is_some() {
            self.write_document(&document).await?;
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        self.write_document(&Map::new()).await
    }
}
