//! In-memory implementation of the Storage trait.
//!
//! Same semantics as SQLite, but everything is lost when the session ends.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{Result, StoreError};
use crate::traits::Storage;

/// In-memory storage. Thread-safe via RwLock.
pub struct MemoryStorage {
    inner: RwLock<Option<BTreeMap<String, Bytes>>>,
}

impl MemoryStorage {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Some(BTreeMap::new())),
        }
    }

    fn read<T>(&self, f: impl FnOnce(&BTreeMap<String, Bytes>) -> T) -> Result<T> {
        let guard = self.inner.read().map_err(|e| StoreError::Task(e.to_string()))?;
        guard.as_ref().map(f).ok_or(StoreError::Closed)
    }

    fn write<T>(&self, f: impl FnOnce(&mut BTreeMap<String, Bytes>) -> T) -> Result<T> {
        let mut guard = self.inner.write().map_err(|e| StoreError::Task(e.to_string()))?;
        guard.as_mut().map(f).ok_or(StoreError::Closed)
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        self.read(|map| map.get(key).cloned())
    }

    async fn put(&self, key: &str, value: Bytes) -> Result<()> {
        self.write(|map| {
            map.insert(key.to_string(), value);
        })
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.write(|map| map.remove(key).is_some())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        self.read(|map| {
            map.range(prefix.to_string()..)
                .take_while(|(k, _)| k.starts_with(prefix))
                .map(|(k, _)| k.clone())
                .collect()
        })
    }

    async fn close(&self) -> Result<()> {
        let mut guard = self.inner.write().map_err(|e| StoreError::Task(e.to_string()))?;
        if guard.take().is_some() {
            tracing::debug!("memory storage closed");
        }
        Ok(())
    }
}
