//! Optional persistence for the catalog cache.
//!
//! Storage holds named lists of JSON values. The cache owns the meaning of the
//! values; storage only guarantees that each call is applied atomically.

use serde_json::Value;
use thiserror::Error;

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;

/// Installed apps, rebuilt from the bundle store.
pub const INSTALLED_KEY: &str = "apps:installed";
/// Apps published by the remote catalog.
pub const AVAILABLE_KEY: &str = "apps:available";
/// Available apps whose version differs from the installed one.
pub const UPDATEABLE_KEY: &str = "apps:updateable";

/// Failure of a storage backend.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The database rejected a statement.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A stored list is not a JSON array of values.
    #[error("Corrupt list '{key}': {source}")]
    Corrupt {
        /// List key.
        key: String,
        /// Decoding error.
        source: serde_json::Error,
    },

    /// A thread panicked while holding the storage lock.
    #[error("Storage lock poisoned")]
    Poisoned,
}

/// A key-value store of lists.
pub trait Storage: Send + Sync + std::fmt::Debug {
    /// Returns the list stored under `key`, or `None` if it was never set.
    ///
    /// # Errors
    ///
    /// The backend failed or the stored list does not decode.
    fn get_list(&self, key: &str) -> Result<Option<Vec<Value>>, StorageError>;

    /// Replaces the whole list under `key`.
    ///
    /// # Errors
    ///
    /// The backend failed.
    fn set_list(&self, key: &str, items: &[Value]) -> Result<(), StorageError>;

    /// Appends one item to the list under `key`, creating it if needed.
    ///
    /// # Errors
    ///
    /// The backend failed or the stored list does not decode.
    fn append(&self, key: &str, item: &Value) -> Result<(), StorageError>;

    /// Removes every item equal to `item` from the list under `key`.
    ///
    /// # Errors
    ///
    /// The backend failed or the stored list does not decode.
    fn remove(&self, key: &str, item: &Value) -> Result<(), StorageError>;

    /// Drops the list under `key` entirely.
    ///
    /// # Errors
    ///
    /// The backend failed.
    fn delete(&self, key: &str) -> Result<(), StorageError>;
}
