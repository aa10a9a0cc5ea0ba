//! # NDN Node Store
//!
//! The storage handle a session hands to its workload. A flat key/value
//! namespace behind the async [`Storage`] trait, with SQLite and in-memory
//! implementations.
//!
//! ## Key Types
//!
//! - [`Storage`] - The async trait for all storage operations
//! - [`SqliteStorage`] - SQLite-based persistent storage
//! - [`MemoryStorage`] - In-memory storage for tests and ephemeral sessions
//! - [`StorageLocation`] - Where a session's storage lives
//!
//! ## Usage
//!
//! ```rust,no_run
//! use ndn_node_store::{Storage, StorageLocation};
//!
//! async fn example() -> ndn_node_store::Result<()> {
//!     let storage = StorageLocation::Sqlite("node.db".into()).open()?;
//!     storage.put("doc/title", b"weekly call".to_vec().into()).await?;
//!     let keys = storage.list("doc/").await?;
//!     assert_eq!(keys, vec!["doc/title".to_string()]);
//!     storage.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Close is final**: every operation after `close()` fails with
//!   [`StoreError::Closed`]; closing twice is a no-op
//! - **Packets**: [`StorageExt`] stores signed Data packets in wire form

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageExt, StorageLocation};
