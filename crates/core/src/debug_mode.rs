//! Persisted debug mode flag

use std::sync::Arc;

use crate::config::CoreConfig;
use crate::storage::{keys, StorageResult, StorageService};

/// Debug mode stored under [`keys::DEBUG_MODE`]
///
/// Falls back to [`CoreConfig::debug`] until a value has been stored.
#[derive(Debug, Clone)]
pub struct DebugMode {
    storage: Arc<StorageService>,
    default: bool,
}

impl DebugMode {
    pub fn new(storage: Arc<StorageService>, config: &CoreConfig) -> Self {
        Self {
            storage,
            default: config.debug,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.storage.get(keys::DEBUG_MODE, self.default)
    }

    pub fn set(&self, enabled: bool) -> StorageResult<()> {
        self.storage.set(keys::DEBUG_MODE, &enabled)?;
        tracing::info!(
            "Debug mode {}",
            if enabled { "enabled" } else { "disabled" }
        );
        Ok(())
    }

    /// Flip the flag
    ///
    /// # Returns
    /// The new state
    pub fn toggle(&self) -> StorageResult<bool> {
        let enabled = !self.is_enabled();
        self.set(enabled)?;
        Ok(enabled)
    }
}
