//! Key-value storage backends for persisted stores.
//!
//! The [`Storage`] trait mirrors the browser `localStorage` shape: string keys
//! mapping to string values. Two backends ship with the crate:
//! - [`MemoryStorage`] - process-local, gone when the process exits
//! - [`FileStorage`] - one JSON file per key under a directory

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use crate::error::StorageError;

/// A string key-value store.
pub trait Storage: Send + Sync {
    /// Read the value stored under `key`, or `None` if there is none.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, overwriting any previous value.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;

    /// Remove every key.
    fn clear(&self) -> Result<(), StorageError>;
}
