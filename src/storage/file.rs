//! File-backed storage.
//!
//! # Layout
//!
//! ```text
//! {base_path}/
//! ├── profileStore.json
//! └── counterStore.json
//! ```

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use super::Storage;
use crate::error::StorageError;

const EXTENSION: &str = "json";

/// Storage that keeps one file per key, the `localStorage` analogue.
///
/// Writes go to a uniquely named temporary file that is then renamed over the
/// target, so a crash mid-write never leaves a truncated entry behind and
/// concurrent writers to one key never share a temporary file.
#[derive(Debug, Clone)]
pub struct FileStorage {
    base_path: PathBuf,
}

impl FileStorage {
    /// Create a storage rooted at `base_path`. The directory is created lazily
    /// on the first write.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn entry_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.base_path.join(format!("{key}.{EXTENSION}")))
    }

    fn ensure_dir(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.base_path).map_err(StorageError::CreateDir)
    }
}

/// Keys become file names, so only a conservative character set is allowed.
fn validate_key(key: &str) -> Result<(), StorageError> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.entry_path(key)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Read(e)),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.entry_path(key)?;
        self.ensure_dir()?;

        // The temporary file is deleted on drop if any step fails.
        let mut temp = NamedTempFile::new_in(&self.base_path).map_err(StorageError::Write)?;
        temp.write_all(value.as_bytes()).map_err(StorageError::Write)?;
        temp.persist(&path).map_err(|e| StorageError::Write(e.error))?;

        debug!(key, path = %path.display(), "wrote storage entry");
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let path = self.entry_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Remove(e)),
        }
    }

    fn clear(&self) -> Result<(), StorageError> {
        let entries = match fs::read_dir(&self.base_path) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(StorageError::Read(e)),
        };

        for entry in entries {
            let path = entry.map_err(StorageError::Read)?.path();
            if path.extension().is_some_and(|ext| ext == EXTENSION) {
                fs::remove_file(&path).map_err(StorageError::Remove)?;
            }
        }
        Ok(())
    }
}
