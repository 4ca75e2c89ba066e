use std::collections::HashMap;
use std::sync::Mutex;

use super::Storage;
use crate::error::StorageError;
use crate::lock::lock;

/// In-memory storage, the `sessionStorage` analogue.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        lock(&self.items).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(lock(&self.items).get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        lock(&self.items).insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        lock(&self.items).remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        lock(&self.items).clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_remove() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get_item("profile").unwrap(), None);

        storage.set_item("profile", r#"{"name":"Alice"}"#).unwrap();
        assert_eq!(
            storage.get_item("profile").unwrap().as_deref(),
            Some(r#"{"name":"Alice"}"#)
        );

        storage.set_item("profile", "{}").unwrap();
        assert_eq!(storage.get_item("profile").unwrap().as_deref(), Some("{}"));
        assert_eq!(storage.len(), 1);

        storage.remove_item("profile").unwrap();
        storage.remove_item("profile").unwrap();
        assert!(storage.is_empty());
    }

    #[test]
    fn clear_removes_everything() {
        let storage = MemoryStorage::new();
        storage.set_item("a", "1").unwrap();
        storage.set_item("b", "2").unwrap();

        storage.clear().unwrap();
        assert!(storage.is_empty());
        assert_eq!(storage.get_item("a").unwrap(), None);
    }
}
