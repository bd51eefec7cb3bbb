//! JSON file-based key/value store.
//!
//! Entries live in memory and are written back on every change using atomic
//! file writes (write-to-temp + rename) so a crash never leaves a truncated file.
//!
//! # Performance Characteristics
//!
//! - **Read**: O(log n) - the whole file is loaded once on open
//! - **Write**: O(n) - every change rewrites the entire file
//! - **Best for**: a handful of persisted fields, infrequent writes

use crate::domain::error::{Result, SynapseError};
use crate::storage::backend::KeyValueStore;
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const FORMAT_VERSION: u32 = 1;

/// On-disk container format.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoreData {
    /// Version of the storage format for future migrations.
    version: u32,

    #[serde(default)]
    entries: BTreeMap<String, String>,
}

impl Default for StoreData {
    fn default() -> Self {
        Self {
            version: FORMAT_VERSION,
            entries: BTreeMap::new(),
        }
    }
}

/// JSON file key/value store.
///
/// # File Format
///
/// ```json
/// {
///   "version": 1,
///   "entries": {
///     "assets": "[{\"id\":1}]",
///     "search__q": "\"rust\""
///   }
/// }
/// ```
#[derive(Debug)]
pub struct FileStore {
    file_path: PathBuf,
    data: RefCell<StoreData>,
    dirty: Cell<bool>,
}

impl FileStore {
    /// Opens the store at `file_path`, creating parent directories.
    ///
    /// A missing file starts an empty store; nothing is written until the first
    /// change.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Parent directory creation fails
    /// - The file exists but cannot be read
    /// - The file contains invalid JSON
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use synapse::storage::{FileStore, KeyValueStore};
    ///
    /// let store = FileStore::open("/tmp/synapse/state.json")?;
    /// store.set("theme", "\"dark\"")?;
    /// # Ok::<(), synapse::SynapseError>(())
    /// ```
    pub fn open(file_path: impl Into<PathBuf>) -> Result<Self> {
        let file_path = file_path.into();
        tracing::debug!(path = ?file_path, "opening file store");

        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let data = if file_path.exists() {
            Self::load_from_file(&file_path)?
        } else {
            tracing::debug!("initializing new empty store");
            StoreData::default()
        };

        tracing::debug!(entries = data.entries.len(), "file store opened");

        Ok(Self {
            file_path,
            data: RefCell::new(data),
            dirty: Cell::new(false),
        })
    }

    /// The backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.file_path
    }

    fn load_from_file(path: &Path) -> Result<StoreData> {
        let contents = std::fs::read_to_string(path)?;
        let data: StoreData = serde_json::from_str(&contents)
            .map_err(|e| SynapseError::Storage(format!("failed to parse JSON: {e}")))?;

        if data.version != FORMAT_VERSION {
            tracing::warn!(version = data.version, "unexpected store format version");
        }
        tracing::debug!(version = data.version, entries = data.entries.len(), "loaded store data");

        Ok(data)
    }

    /// Writes pending changes to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary file cannot be written or renamed.
    pub fn save(&self) -> Result<()> {
        if !self.dirty.get() {
            tracing::trace!("skipping save, no changes");
            return Ok(());
        }

        let json = serde_json::to_string_pretty(&*self.data.borrow())
            .map_err(|e| SynapseError::Storage(format!("failed to serialize JSON: {e}")))?;

        let tmp_path = self.file_path.with_extension("tmp");
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, &self.file_path)?;

        self.dirty.set(false);
        tracing::debug!(path = ?self.file_path, "file store saved");
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.data.borrow().entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let _span = tracing::trace_span!("file_store_set", key = %key).entered();

        let previous = self
            .data
            .borrow_mut()
            .entries
            .insert(key.to_string(), value.to_string());
        if previous.as_deref() == Some(value) {
            return Ok(());
        }

        self.dirty.set(true);
        self.save()
    }

    fn remove(&self, key: &str) -> Result<()> {
        let _span = tracing::trace_span!("file_store_remove", key = %key).entered();

        if self.data.borrow_mut().entries.remove(key).is_none() {
            return Ok(());
        }

        self.dirty.set(true);
        self.save()
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.data.borrow().entries.keys().cloned().collect())
    }
}

impl Drop for FileStore {
    fn drop(&mut self) {
        if self.dirty.get() {
            tracing::debug!("saving dirty data on drop");
            if let Err(e) = self.save() {
                tracing::error!(error = %e, "failed to save on drop");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let store = FileStore::open(&path).unwrap();
        assert!(!path.exists());
        store.set("assets", "[1,2]").unwrap();
        store.set("search__q", "\"rust\"").unwrap();
        drop(store);

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get("assets").unwrap().as_deref(), Some("[1,2]"));
        assert_eq!(reopened.keys().unwrap(), vec!["assets", "search__q"]);
    }

    #[test]
    fn remove_rewrites_the_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");

        let store = FileStore::open(&path).unwrap();
        store.set("theme", "\"dark\"").unwrap();
        store.remove("theme").unwrap();
        store.remove("theme").unwrap();

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get("theme").unwrap(), None);
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn rejects_corrupt_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(matches!(FileStore::open(&path), Err(SynapseError::Storage(_))));
    }
}
