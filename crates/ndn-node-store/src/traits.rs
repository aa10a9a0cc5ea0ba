//! Storage trait: the abstract interface for session state.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use ndn_node_core::Data;

use crate::error::Result;
use crate::memory::MemoryStorage;
use crate::sqlite::SqliteStorage;

/// Async key/value storage.
///
/// Keys are `/`-separated strings; `list` matches on a plain string prefix.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Get a value by key.
    async fn get(&self, key: &str) -> Result<Option<Bytes>>;

    /// Insert or replace a value.
    async fn put(&self, key: &str, value: Bytes) -> Result<()>;

    /// Remove a value. Returns whether it existed.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// All keys starting with `prefix`, sorted.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Flush and release the backend. Idempotent.
    async fn close(&self) -> Result<()>;
}

/// Packet helpers on top of [`Storage`].
#[async_trait]
pub trait StorageExt: Storage {
    /// Store a signed packet in wire form.
    async fn put_data(&self, key: &str, data: &Data) -> Result<()> {
        self.put(key, Bytes::from(data.to_wire())).await
    }

    /// Load a packet stored with [`put_data`](StorageExt::put_data).
    async fn get_data(&self, key: &str) -> Result<Option<Data>> {
        match self.get(key).await? {
            Some(wire) => Ok(Some(Data::from_wire(&wire)?)),
            None => Ok(None),
        }
    }
}

impl<S: Storage + ?Sized> StorageExt for S {}

/// Where a session's storage lives.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StorageLocation {
    /// Discarded when the session ends.
    #[default]
    Memory,
    /// A SQLite database file.
    Sqlite(PathBuf),
}

impl StorageLocation {
    /// Open the backend.
    pub fn open(&self) -> Result<Arc<dyn Storage>> {
        match self {
            StorageLocation::Memory => Ok(Arc::new(MemoryStorage::new())),
            StorageLocation::Sqlite(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                Ok(Arc::new(SqliteStorage::open(path)?))
            }
        }
    }
}

impl std::fmt::Display for StorageLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageLocation::Memory => f.write_str("memory"),
            StorageLocation::Sqlite(path) => write!(f, "sqlite:{}", path.display()),
        }
    }
}

impl std::str::FromStr for StorageLocation {
    type Err = std::convert::Infallible;

    /// `memory` or a database path.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "memory" | ":memory:" => StorageLocation::Memory,
            path => StorageLocation::Sqlite(PathBuf::from(path.strip_prefix("sqlite:").unwrap_or(path))),
        })
    }
}
