//! Menu commands - registration and dispatch
//!
//! A menu command is a named callback the host surfaces to the user (a
//! context-menu entry, a hotkey, a toolbar button). Registering a name that
//! already exists replaces the earlier command.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Handle for a registered menu command
    pub struct MenuKey;
}

/// Menu command callback
pub type MenuCallback = Arc<dyn Fn() + Send + Sync>;

struct MenuEntry {
    name: String,
    callback: MenuCallback,
}

struct Menu {
    /// Commands indexed by key
    commands: SlotMap<MenuKey, MenuEntry>,

    /// Lookup by exact name
    by_name: HashMap<String, MenuKey>,

    /// Names in registration order
    order: Vec<MenuKey>,
}

impl Menu {
    fn remove(&mut self, key: MenuKey) -> Option<MenuEntry> {
        let entry = self.commands.remove(key)?;
        self.by_name.remove(&entry.name);
        self.order.retain(|k| *k != key);
        Some(entry)
    }
}

/// Registry of menu commands
pub struct MenuRegistry {
    menu: RwLock<Menu>,
}

impl MenuRegistry {
    pub fn new() -> Self {
        Self {
            menu: RwLock::new(Menu {
                commands: SlotMap::with_key(),
                by_name: HashMap::new(),
                order: Vec::new(),
            }),
        }
    }

    /// Register a command, replacing any command with the same name
    pub fn register<F>(&self, name: &str, callback: F) -> MenuKey
    where
        F: Fn() + Send + Sync + 'static,
    {
        let mut menu = self.menu.write();

        if let Some(old) = menu.by_name.get(name).copied() {
            menu.remove(old);
            tracing::debug!("Replacing menu command: {}", name);
        }

        let key = menu.commands.insert(MenuEntry {
            name: name.to_string(),
            callback: Arc::new(callback),
        });
        menu.by_name.insert(name.to_string(), key);
        menu.order.push(key);

        tracing::debug!("Registered menu command: {}", name);
        key
    }

    /// Unregister a command by key
    ///
    /// Returns `false` for stale keys, including keys of replaced commands.
    pub fn unregister(&self, key: MenuKey) -> bool {
        match self.menu.write().remove(key) {
            Some(entry) => {
                tracing::debug!("Unregistered menu command: {}", entry.name);
                true
            }
            None => false,
        }
    }

    pub fn unregister_by_name(&self, name: &str) -> bool {
        let key = self.menu.read().by_name.get(name).copied();
        key.is_some_and(|k| self.unregister(k))
    }

    /// Remove every command
    ///
    /// # Returns
    /// The number of commands removed
    pub fn unregister_all(&self) -> usize {
        let mut menu = self.menu.write();
        let count = menu.commands.len();

        menu.commands.clear();
        menu.by_name.clear();
        menu.order.clear();

        if count > 0 {
            tracing::debug!("Unregistered {} menu commands", count);
        }
        count
    }

    /// Run the command registered under `name`
    ///
    /// The callback runs without the registry lock held, so it may register
    /// or unregister commands.
    ///
    /// # Returns
    /// `false` if no such command exists
    pub fn invoke(&self, name: &str) -> bool {
        let callback = {
            let menu = self.menu.read();
            menu.by_name
                .get(name)
                .and_then(|key| menu.commands.get(*key))
                .map(|entry| entry.callback.clone())
        };

        match callback {
            Some(callback) => {
                tracing::trace!("Invoking menu command: {}", name);
                callback();
                true
            }
            None => {
                tracing::debug!("No menu command named '{}'", name);
                false
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.menu.read().by_name.contains_key(name)
    }

    /// Command names in registration order
    pub fn names(&self) -> Vec<String> {
        let menu = self.menu.read();
        menu.order
            .iter()
            .filter_map(|key| menu.commands.get(*key))
            .map(|entry| entry.name.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.menu.read().commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.menu.read().commands.is_empty()
    }
}

impl Default for MenuRegistry {
    fn default() -> Self {
        Self::new()
    }
}
