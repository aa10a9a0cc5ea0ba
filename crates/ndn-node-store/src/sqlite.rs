//! SQLite implementation of the Storage trait.
//!
//! Uses rusqlite with bundled SQLite, wrapped in async via
//! `tokio::task::spawn_blocking`.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::Storage;

/// SQLite-based storage.
///
/// The connection sits behind a mutex; `close()` takes it out, after which
/// every operation fails with [`StoreError::Closed`].
pub struct SqliteStorage {
    conn: Arc<Mutex<Option<Connection>>>,
}

impl SqliteStorage {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path.as_ref())?;
        migration::migrate(&mut conn)?;
        tracing::debug!(path = %path.as_ref().display(), "opened sqlite storage");
        Ok(Self::from_connection(conn))
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(Some(conn))),
        }
    }

    /// Run `f` against the connection on the blocking pool.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|e| StoreError::Task(format!("mutex poisoned: {e}")))?;
            let conn = guard.as_ref().ok_or(StoreError::Closed)?;
            f(conn)
        })
        .await
        .map_err(|e| StoreError::Task(format!("spawn_blocking failed: {e}")))?
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let key = key.to_string();
        self.blocking(move |conn| {
            let value: Option<Vec<u8>> = conn
                .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                    row.get(0)
                })
                .optional()?;
            Ok(value.map(Bytes::from))
        })
        .await
    }

    async fn put(&self, key: &str, value: Bytes) -> Result<()> {
        let key = key.to_string();
        self.blocking(move |conn| {
            conn.execute(
                "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, value.as_ref(), ndn_node_core::now_millis() as i64],
            )?;
            Ok(())
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let key = key.to_string();
        self.blocking(move |conn| {
            let removed = conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
            Ok(removed > 0)
        })
        .await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let prefix = prefix.to_string();
        self.blocking(move |conn| {
            // substr comparison keeps LIKE wildcards in keys literal
            let mut stmt = conn.prepare(
                "SELECT key FROM kv WHERE substr(key, 1, length(?1)) = ?1 ORDER BY key",
            )?;
            let keys = stmt
                .query_map(params![prefix], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            Ok(keys)
        })
        .await
    }

    async fn close(&self) -> Result<()> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|e| StoreError::Task(format!("mutex poisoned: {e}")))?;
            if let Some(conn) = guard.take() {
                conn.close().map_err(|(_, e)| StoreError::Database(e))?;
                tracing::debug!("sqlite storage closed");
            }
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Task(format!("spawn_blocking failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[tokio::test]
    async fn test_put_get_delete() {
        let storage = SqliteStorage::open_memory().unwrap();
        storage.put("doc/title", Bytes::from_static(b"call")).await.unwrap();
        assert_eq!(
            storage.get("doc/title").await.unwrap(),
            Some(Bytes::from_static(b"call"))
        );
        storage.put("doc/title", Bytes::from_static(b"notes")).await.unwrap();
        assert_eq!(
            storage.get("doc/title").await.unwrap(),
            Some(Bytes::from_static(b"notes"))
        );
        assert!(storage.delete("doc/title").await.unwrap());
        assert_eq!(storage.get("doc/title").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_list_prefix_is_literal() {
        let storage = SqliteStorage::open_memory().unwrap();
        for key in ["certs/a", "certs/b", "certs%/x", "docs/a"] {
            storage.put(key, Bytes::from_static(b"-")).await.unwrap();
        }
        assert_eq!(storage.list("certs/").await.unwrap(), vec!["certs/a", "certs/b"]);
        assert_eq!(storage.list("certs%").await.unwrap(), vec!["certs%/x"]);
        assert_eq!(storage.list("").await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("node.db");

        let storage = SqliteStorage::open(&path).unwrap();
        storage.put("k", Bytes::from_static(b"v")).await.unwrap();
        storage.close().await.unwrap();

        let reopened = SqliteStorage::open(&path).unwrap();
        assert_eq!(reopened.get("k").await.unwrap(), Some(Bytes::from_static(b"v")));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let storage = SqliteStorage::open_memory().unwrap();
        storage.close().await.unwrap();
        storage.close().await.unwrap();
        assert!(matches!(storage.list("").await, Err(StoreError::Closed)));
    }

    proptest! {
        #[test]
        fn prop_values_survive(key in "[a-z/]{1,24}", value in proptest::collection::vec(any::<u8>(), 0..256)) {
            let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
            rt.block_on(async {
                let storage = SqliteStorage::open_memory().unwrap();
                storage.put(&key, Bytes::from(value.clone())).await.unwrap();
                prop_assert_eq!(storage.get(&key).await.unwrap(), Some(Bytes::from(value)));
                Ok(())
            })?;
        }
    }
}
