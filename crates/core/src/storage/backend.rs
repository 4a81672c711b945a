//! Storage backends
//!
//! A backend is a flat map from string keys to JSON values. Backends are
//! swappable at runtime through
//! [`StorageService::switch_backend`](super::StorageService::switch_backend).

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use dashmap::DashMap;
use parking_lot::RwLock;
use serde_json::{Map, Value};

use super::{StorageError, StorageResult};

/// Key-value persistence used by [`StorageService`](super::StorageService)
pub trait StorageBackend: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    fn get_value(&self, key: &str) -> Option<Value>;

    fn set_value(&self, key: &str, value: Value) -> StorageResult<()>;

    /// Delete `key`, returning the value it held
    fn remove(&self, key: &str) -> StorageResult<Option<Value>>;

    /// All stored keys, sorted
    fn keys(&self) -> Vec<String>;
}

/// Process-local storage
#[derive(Debug, Default)]
pub struct MemoryBackend {
    values: DashMap<String, Value>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn get_value(&self, key: &str) -> Option<Value> {
        self.values.get(key).map(|v| v.value().clone())
    }

    fn set_value(&self, key: &str, value: Value) -> StorageResult<()> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<Option<Value>> {
        Ok(self.values.remove(key).map(|(_, v)| v))
    }

    fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.values.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }
}

/// Storage persisted as one JSON object on disk
///
/// The whole document is rewritten after every change: written to a sibling
/// `.tmp` file, then renamed over the target. The in-memory map only takes a
/// change once it is on disk.
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    values: RwLock<Map<String, Value>>,
}

impl FileBackend {
    /// Open `path`, starting empty if it does not exist yet
    ///
    /// # Errors
    /// [`StorageError::Corrupt`] if the file is not a JSON object
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();

        let values = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let values: Map<String, Value> =
                serde_json::from_str(&content).map_err(|source| StorageError::Corrupt {
                    path: path.clone(),
                    source,
                })?;
            tracing::debug!("Loaded {} stored values from {:?}", values.len(), path);
            values
        } else {
            Map::new()
        };

        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling file the document is staged in before the rename
    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn flush(&self, values: &Map<String, Value>) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(values).map_err(std::io::Error::from)?;
        let staging = self.staging_path();
        std::fs::write(&staging, content)?;

        if let Err(e) = std::fs::rename(&staging, &self.path) {
            let _ = std::fs::remove_file(&staging);
            return Err(e.into());
        }
        Ok(())
    }
}

impl StorageBackend for FileBackend {
    fn name(&self) -> &'static str {
        "file"
    }

    fn get_value(&self, key: &str) -> Option<Value> {
        self.values.read().get(key).cloned()
    }

    fn set_value(&self, key: &str, value: Value) -> StorageResult<()> {
        let mut values = self.values.write();
        let mut next = values.clone();
        next.insert(key.to_string(), value);

        self.flush(&next)?;
        *values = next;
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<Option<Value>> {
        let mut values = self.values.write();
        if !values.contains_key(key) {
            return Ok(None);
        }

        let mut next = values.clone();
        let old = next.remove(key);
        self.flush(&next)?;
        *values = next;
        Ok(old)
    }

    fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.values.read().keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_memory_backend_basic() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.get_value("a"), None);

        backend.set_value("b", json!(2)).unwrap();
        backend.set_value("a", json!("one")).unwrap();
        assert_eq!(backend.get_value("a"), Some(json!("one")));
        assert_eq!(backend.keys(), vec!["a", "b"]);

        assert_eq!(backend.remove("a").unwrap(), Some(json!("one")));
        assert_eq!(backend.remove("a").unwrap(), None);
    }

    #[test]
    fn test_file_backend_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("storage.json");

        let backend = FileBackend::open(&path).unwrap();
        backend.set_value("debugMode", json!(true)).unwrap();
        backend.set_value("volume", json!(7)).unwrap();
        backend.remove("volume").unwrap();
        drop(backend);

        let reopened = FileBackend::open(&path).unwrap();
        assert_eq!(reopened.get_value("debugMode"), Some(json!(true)));
        assert_eq!(reopened.get_value("volume"), None);
        assert_eq!(reopened.path(), path.as_path());
    }

    #[test]
    fn test_file_backend_keeps_memory_when_write_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");

        let backend = FileBackend::open(&path).unwrap();
        backend.set_value("kept", json!(1)).unwrap();

        // A directory at the staging path makes the write fail
        std::fs::create_dir(dir.path().join("storage.json.tmp")).unwrap();

        assert!(backend.set_value("lost", json!(2)).is_err());
        assert!(backend.remove("kept").is_err());
        assert_eq!(backend.get_value("lost"), None);
        assert_eq!(backend.get_value("kept"), Some(json!(1)));
        assert_eq!(backend.keys(), vec!["kept"]);

        let on_disk = FileBackend::open(&path).unwrap();
        assert_eq!(on_disk.keys(), vec!["kept"]);
    }

    #[test]
    fn test_file_backend_leaves_no_staging_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");

        let backend = FileBackend::open(&path).unwrap();
        backend.set_value("a", json!(true)).unwrap();
        backend.remove("a").unwrap();

        assert!(path.exists());
        assert!(!dir.path().join("storage.json.tmp").exists());
    }

    #[test]
    fn test_file_backend_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();

        let err = FileBackend::open(&path).unwrap_err();
        assert!(matches!(err, StorageError::Corrupt { .. }));
    }
}
