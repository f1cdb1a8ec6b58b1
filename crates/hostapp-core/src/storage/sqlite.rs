//! SQLite-backed list storage
//!
//! Each list is one row holding a JSON array. Every mutation runs inside a
//! transaction so readers never see a half-applied append or removal.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{Connection, OptionalExtension, Transaction, params};
use serde_json::Value;

use super::{Storage, StorageError};

/// List storage persisted in a `SQLite` database.
#[derive(Debug)]
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Open or create the database at `path`.
    ///
    /// # Errors
    ///
    /// The database cannot be opened or initialized.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrency
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::init(conn)
    }

    /// Open a private in-memory database (for testing)
    ///
    /// # Errors
    ///
    /// The database cannot be initialized.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS lists (
                key TEXT PRIMARY KEY,
                items TEXT NOT NULL
            );
            ",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_tx<T>(
        &self,
        f: impl FnOnce(&Transaction<'_>) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let mut conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;
        let tx = conn.transaction()?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }
}

fn read(conn: &Connection, key: &str) -> Result<Option<Vec<Value>>, StorageError> {
    let raw: Option<String> = conn
        .query_row("SELECT items FROM lists WHERE key = ?1", params![key], |row| {
            row.get(0)
        })
        .optional()?;

    raw.map(|text| {
        serde_json::from_str(&text).map_err(|source| StorageError::Corrupt {
            key: key.to_string(),
            source,
        })
    })
    .transpose()
}

fn write(conn: &Connection, key: &str, items: &[Value]) -> Result<(), StorageError> {
    let text = serde_json::to_string(items).map_err(|source| StorageError::Corrupt {
        key: key.to_string(),
        source,
    })?;
    conn.execute(
        "INSERT OR REPLACE INTO lists (key, items) VALUES (?1, ?2)",
        params![key, text],
    )?;
    Ok(())
}

impl Storage for SqliteStorage {
    fn get_list(&self, key: &str) -> Result<Option<Vec<Value>>, StorageError> {
        let conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;
        read(&conn, key)
    }

    fn set_list(&self, key: &str, items: &[Value]) -> Result<(), StorageError> {
        self.with_tx(|tx| write(tx, key, items))
    }

    fn append(&self, key: &str, item: &Value) -> Result<(), StorageError> {
        self.with_tx(|tx| {
            let mut items = read(tx, key)?.unwrap_or_default();
            items.push(item.clone());
            write(tx, key, &items)
        })
    }

    fn remove(&self, key: &str, item: &Value) -> Result<(), StorageError> {
        self.with_tx(|tx| {
            let Some(mut items) = read(tx, key)? else {
                return Ok(());
            };
            items.retain(|v| v != item);
            write(tx, key, &items)
        })
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.with_tx(|tx| {
            tx.execute("DELETE FROM lists WHERE key = ?1", params![key])?;
            Ok(())
        })
    }
}
