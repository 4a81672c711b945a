//! Typed key-value storage with change listeners
//!
//! [`StorageService`] encodes values as JSON, stores them in a swappable
//! [`StorageBackend`], and notifies listeners registered for a key whenever
//! that key is written or removed.
//!
//! # Example
//!
//! ```ignore
//! use tabbridge_core::storage::{keys, StorageService};
//!
//! let storage = StorageService::in_memory();
//! let key = storage.on_change(keys::DEBUG_MODE, |_, old, new| {
//!     tracing::info!("debug mode {:?} -> {:?}", old, new);
//! });
//!
//! storage.set(keys::DEBUG_MODE, &true)?;
//! assert!(storage.get(keys::DEBUG_MODE, false));
//! storage.remove_listener(key);
//! ```

mod backend;

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use slotmap::{new_key_type, SlotMap};

pub use backend::{FileBackend, MemoryBackend, StorageBackend};

use crate::config::{CoreConfig, StorageKind};

/// Well-known storage keys
pub mod keys {
    /// Persisted debug mode flag
    pub const DEBUG_MODE: &str = "debugMode";
}

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Failed to read or write the backing file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Value could not be represented as JSON
    #[error("Failed to encode value for '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Backing file exists but is not a JSON object
    #[error("Corrupt storage file {path:?}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

new_key_type! {
    /// Key for a change listener, used for removal
    pub struct ChangeKey;
}

/// Change callback: `(key, old, new)`; `None` means absent
pub type ChangeCallback = Arc<dyn Fn(&str, Option<&Value>, Option<&Value>) + Send + Sync>;

struct Listener {
    key: String,
    callback: ChangeCallback,
}

/// Typed storage facade over a swappable backend
pub struct StorageService {
    backend: RwLock<Arc<dyn StorageBackend>>,
    listeners: RwLock<SlotMap<ChangeKey, Listener>>,
}

impl StorageService {
    pub fn new(backend: impl StorageBackend + 'static) -> Self {
        Self {
            backend: RwLock::new(Arc::new(backend)),
            listeners: RwLock::new(SlotMap::with_key()),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }

    /// Build the backend selected by `config`
    pub fn from_config(config: &CoreConfig) -> StorageResult<Self> {
        let service = match config.storage_backend {
            StorageKind::Memory => Self::in_memory(),
            StorageKind::File => Self::new(FileBackend::open(&config.storage_path)?),
        };
        tracing::debug!("Storage using {} backend", service.backend_name());
        Ok(service)
    }

    fn backend(&self) -> Arc<dyn StorageBackend> {
        self.backend.read().clone()
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.read().name()
    }

    /// Replace the backend; stored values are not migrated
    pub fn switch_backend(&self, backend: impl StorageBackend + 'static) {
        let backend: Arc<dyn StorageBackend> = Arc::new(backend);
        let old = std::mem::replace(&mut *self.backend.write(), backend);
        tracing::info!(
            "Switched storage backend from {} to {}",
            old.name(),
            self.backend_name()
        );
    }

    /// Read and decode `key`, or `default` when absent or of another type
    pub fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        let Some(value) = self.backend().get_value(key) else {
            return default;
        };

        match serde_json::from_value(value) {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::debug!("Stored value for '{}' did not decode: {}", key, e);
                default
            }
        }
    }

    /// Raw JSON value under `key`
    pub fn get_value(&self, key: &str) -> Option<Value> {
        self.backend().get_value(key)
    }

    /// Encode and store `value`, then notify listeners
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> StorageResult<()> {
        let value = serde_json::to_value(value).map_err(|source| StorageError::Encode {
            key: key.to_string(),
            source,
        })?;

        let backend = self.backend();
        let old = backend.get_value(key);
        backend.set_value(key, value.clone())?;

        self.notify(key, old.as_ref(), Some(&value));
        Ok(())
    }

    /// Delete `key`, notifying listeners if it was present
    pub fn remove(&self, key: &str) -> StorageResult<()> {
        if let Some(old) = self.backend().remove(key)? {
            self.notify(key, Some(&old), None);
        }
        Ok(())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.backend().get_value(key).is_some()
    }

    pub fn keys(&self) -> Vec<String> {
        self.backend().keys()
    }

    /// Register `callback` for changes to `key`
    pub fn on_change<F>(&self, key: &str, callback: F) -> ChangeKey
    where
        F: Fn(&str, Option<&Value>, Option<&Value>) + Send + Sync + 'static,
    {
        self.listeners.write().insert(Listener {
            key: key.to_string(),
            callback: Arc::new(callback),
        })
    }

    /// Returns `true` if the listener was found and removed.
    pub fn remove_listener(&self, key: ChangeKey) -> bool {
        self.listeners.write().remove(key).is_some()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    fn notify(&self, key: &str, old: Option<&Value>, new: Option<&Value>) {
        // Snapshot so callbacks may register or remove listeners
        let callbacks: Vec<ChangeCallback> = self
            .listeners
            .read()
            .values()
            .filter(|l| l.key == key)
            .map(|l| l.callback.clone())
            .collect();

        for callback in callbacks {
            callback(key, old, new);
        }
    }
}

impl std::fmt::Debug for StorageService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageService")
            .field("backend", &self.backend_name())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl Default for StorageService {
    fn default() -> Self {
        Self::in_memory()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Position {
        x: i32,
        y: i32,
    }

    #[test]
    fn test_get_returns_default_when_absent() {
        let storage = StorageService::in_memory();
        assert_eq!(storage.get("missing", 5), 5);
        assert!(!storage.contains("missing"));
    }

    #[test]
    fn test_set_and_get_struct() {
        let storage = StorageService::in_memory();
        storage.set("pos", &Position { x: 1, y: 2 }).unwrap();

        let pos: Position = storage.get("pos", Position { x: 0, y: 0 });
        assert_eq!(pos, Position { x: 1, y: 2 });
        assert_eq!(storage.get_value("pos"), Some(json!({"x": 1, "y": 2})));
    }

    #[test]
    fn test_get_with_wrong_type_returns_default() {
        let storage = StorageService::in_memory();
        storage.set("flag", "yes").unwrap();
        assert!(!storage.get("flag", false));
    }

    #[test]
    fn test_listener_sees_old_and_new() {
        let storage = StorageService::in_memory();
        let seen: Arc<Mutex<Vec<(Option<Value>, Option<Value>)>>> = Arc::default();
        let s = seen.clone();

        storage.on_change("volume", move |key, old, new| {
            assert_eq!(key, "volume");
            s.lock().push((old.cloned(), new.cloned()));
        });

        storage.set("volume", &3).unwrap();
        storage.set("volume", &3).unwrap();
        storage.set("volume", &4).unwrap();
        storage.set("other", &1).unwrap();
        storage.remove("volume").unwrap();
        storage.remove("volume").unwrap();

        assert_eq!(
            *seen.lock(),
            vec![
                (None, Some(json!(3))),
                (Some(json!(3)), Some(json!(3))),
                (Some(json!(3)), Some(json!(4))),
                (Some(json!(4)), None),
            ]
        );
    }

    #[test]
    fn test_remove_listener() {
        let storage = StorageService::in_memory();
        let count = Arc::new(Mutex::new(0));
        let c = count.clone();

        let key = storage.on_change("k", move |_, _, _| *c.lock() += 1);
        storage.set("k", &1).unwrap();

        assert!(storage.remove_listener(key));
        assert!(!storage.remove_listener(key));
        storage.set("k", &2).unwrap();

        assert_eq!(*count.lock(), 1);
        assert_eq!(storage.listener_count(), 0);
    }

    #[test]
    fn test_listener_may_write_storage() {
        let storage = Arc::new(StorageService::in_memory());
        let inner = storage.clone();

        storage.on_change("a", move |_, _, new| {
            if let Some(v) = new.and_then(Value::as_i64) {
                inner.set("b", &(v * 2)).unwrap();
            }
        });

        storage.set("a", &21).unwrap();
        assert_eq!(storage.get("b", 0), 42);
    }

    #[test]
    fn test_switch_backend() {
        let storage = StorageService::in_memory();
        storage.set("k", &1).unwrap();
        assert_eq!(storage.backend_name(), "memory");

        let dir = tempfile::tempdir().unwrap();
        storage.switch_backend(FileBackend::open(dir.path().join("s.json")).unwrap());

        assert_eq!(storage.backend_name(), "file");
        assert_eq!(storage.get("k", 0), 0);
        storage.set("k", &2).unwrap();
        assert_eq!(storage.keys(), vec!["k"]);
    }

    #[test]
    fn test_failed_write_keeps_old_value_and_skips_listeners() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();

        let storage = StorageService::new(FileBackend::open(blocker.join("s.json")).unwrap());
        let count = Arc::new(Mutex::new(0));
        let c = count.clone();
        storage.on_change("k", move |_, _, _| *c.lock() += 1);

        assert!(storage.set("k", &7).is_err());
        assert_eq!(storage.get("k", 0), 0);
        assert!(!storage.contains("k"));
        assert_eq!(*count.lock(), 0);
    }

    #[test]
    fn test_from_config_file_backend() {
        let dir = tempfile::tempdir().unwrap();
        let config = CoreConfig {
            storage_backend: StorageKind::File,
            storage_path: dir.path().join("storage.json"),
            ..CoreConfig::default()
        };

        let storage = StorageService::from_config(&config).unwrap();
        storage.set(keys::DEBUG_MODE, &true).unwrap();

        let reopened = StorageService::from_config(&config).unwrap();
        assert!(reopened.get(keys::DEBUG_MODE, false));
    }
}
