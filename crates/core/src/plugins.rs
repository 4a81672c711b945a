//! Plugin lifecycle
//!
//! Plugins are registered once and toggled with [`PluginManager::enable`] and
//! [`PluginManager::disable`]. `init` runs on every transition to enabled and
//! `destroy` on every transition to disabled; repeated calls in the same
//! state do nothing.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

/// A unit of functionality with setup and teardown
///
/// A plugin that installs hooks typically keeps a
/// [`HookRegistry`](tabbridge_hooks::HookRegistry) and calls `detach_all` in
/// [`destroy`](Self::destroy).
pub trait Plugin: Send + Sync {
    /// Unique id; registering another plugin with the same id replaces it
    fn id(&self) -> &str;

    fn init(&self);

    fn destroy(&self);
}

/// Snapshot of one registered plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginStatus {
    pub id: String,
    pub enabled: bool,
}

struct PluginEntry {
    plugin: Arc<dyn Plugin>,
    enabled: bool,
}

/// Registry of plugins and their enabled state
#[derive(Default)]
pub struct PluginManager {
    plugins: RwLock<Vec<PluginEntry>>,
}

impl PluginManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin, initializing it if `enabled`
    ///
    /// An existing plugin with the same id is destroyed (if enabled) and
    /// replaced in place, keeping its position in [`list`](Self::list).
    pub fn register(&self, plugin: impl Plugin + 'static, enabled: bool) {
        self.register_arc(Arc::new(plugin), enabled);
    }

    pub fn register_arc(&self, plugin: Arc<dyn Plugin>, enabled: bool) {
        let replaced = {
            let mut plugins = self.plugins.write();
            let entry = PluginEntry {
                plugin: plugin.clone(),
                enabled,
            };

            match plugins.iter().position(|e| e.plugin.id() == plugin.id()) {
                Some(index) => Some(std::mem::replace(&mut plugins[index], entry)),
                None => {
                    plugins.push(entry);
                    None
                }
            }
        };

        if let Some(old) = replaced {
            tracing::warn!("Plugin '{}' already registered, replacing", plugin.id());
            if old.enabled {
                old.plugin.destroy();
            }
        }

        tracing::info!("Registered plugin: {}", plugin.id());
        if enabled {
            plugin.init();
        }
    }

    /// Enable a plugin, running `init` if it was disabled
    ///
    /// # Returns
    /// `false` if no plugin has this id
    pub fn enable(&self, id: &str) -> bool {
        self.transition(id, true)
    }

    /// Disable a plugin, running `destroy` if it was enabled
    ///
    /// # Returns
    /// `false` if no plugin has this id
    pub fn disable(&self, id: &str) -> bool {
        self.transition(id, false)
    }

    fn transition(&self, id: &str, enable: bool) -> bool {
        let changed = {
            let mut plugins = self.plugins.write();
            let Some(entry) = plugins.iter_mut().find(|e| e.plugin.id() == id) else {
                tracing::warn!("Plugin '{}' not found", id);
                return false;
            };

            if entry.enabled == enable {
                None
            } else {
                entry.enabled = enable;
                Some(entry.plugin.clone())
            }
        };

        // Lifecycle callbacks run without the lock held
        if let Some(plugin) = changed {
            if enable {
                tracing::info!("Enabling plugin: {}", id);
                plugin.init();
            } else {
                tracing::info!("Disabling plugin: {}", id);
                plugin.destroy();
            }
        }
        true
    }

    /// Disable every enabled plugin, most recently registered first
    ///
    /// # Returns
    /// The number of plugins disabled
    pub fn disable_all(&self) -> usize {
        let enabled: Vec<String> = self
            .plugins
            .read()
            .iter()
            .rev()
            .filter(|e| e.enabled)
            .map(|e| e.plugin.id().to_string())
            .collect();

        for id in &enabled {
            self.disable(id);
        }
        enabled.len()
    }

    pub fn is_enabled(&self, id: &str) -> bool {
        self.plugins
            .read()
            .iter()
            .any(|e| e.plugin.id() == id && e.enabled)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.plugins.read().iter().any(|e| e.plugin.id() == id)
    }

    /// Plugins in registration order
    pub fn list(&self) -> Vec<PluginStatus> {
        self.plugins
            .read()
            .iter()
            .map(|e| PluginStatus {
                id: e.plugin.id().to_string(),
                enabled: e.enabled,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.read().is_empty()
    }
}
