//! In-process list storage.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::Value;

use super::{Storage, StorageError};

/// Process-local storage, for tests and one-shot embedding.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    lists: Mutex<HashMap<String, Vec<Value>>>,
}

impl MemoryStorage {
    /// Empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    fn with_lists<T>(
        &self,
        f: impl FnOnce(&mut HashMap<String, Vec<Value>>) -> T,
    ) -> Result<T, StorageError> {
        let mut lists = self.lists.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(f(&mut lists))
    }
}

impl Storage for MemoryStorage {
    fn get_list(&self, key: &str) -> Result<Option<Vec<Value>>, StorageError> {
        self.with_lists(|lists| lists.get(key).cloned())
    }

    fn set_list(&self, key: &str, items: &[Value]) -> Result<(), StorageError> {
        self.with_lists(|lists| {
            lists.insert(key.to_string(), items.to_vec());
        })
    }

    fn append(&self, key: &str, item: &Value) -> Result<(), StorageError> {
        self.with_lists(|lists| {
            lists.entry(key.to_string()).or_default().push(item.clone());
        })
    }

    fn remove(&self, key: &str, item: &Value) -> Result<(), StorageError> {
        self.with_lists(|lists| {
            if let Some(list) = lists.get_mut(key) {
                list.retain(|v| v != item);
            }
        })
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.with_lists(|lists| {
            lists.remove(key);
        })
    }
}
