//! Runtime wiring
//!
//! [`Toolkit`] owns one of each collaborator and ties their lifetimes
//! together: [`Toolkit::shutdown`] disables plugins, removes hooks, and clears
//! the menu.

use std::sync::Arc;

use tabbridge_hooks::{hook_methods_with, Class, HookConfig, HookRegistry, Hookable};

use crate::config::CoreConfig;
use crate::debug_mode::DebugMode;
use crate::menu::MenuRegistry;
use crate::plugins::PluginManager;
use crate::storage::StorageService;
use crate::{logging, Result};

/// Name of the built-in debug mode menu command
pub const DEBUG_MODE_COMMAND: &str = "Toggle debug mode";

pub struct Toolkit {
    config: CoreConfig,
    storage: Arc<StorageService>,
    menu: MenuRegistry,
    plugins: PluginManager,
    hooks: HookRegistry,
    debug_mode: DebugMode,
}

impl Toolkit {
    /// Build collaborators from `config` without touching global state
    pub fn new(config: CoreConfig) -> Result<Self> {
        let storage = Arc::new(StorageService::from_config(&config)?);
        let debug_mode = DebugMode::new(storage.clone(), &config);

        Ok(Self {
            config,
            storage,
            menu: MenuRegistry::new(),
            plugins: PluginManager::new(),
            hooks: HookRegistry::new(),
            debug_mode,
        })
    }

    /// [`new`](Self::new), plus logging and the built-in menu commands
    pub fn start(config: CoreConfig) -> Result<Self> {
        logging::init(&config);
        let toolkit = Self::new(config)?;
        toolkit.register_builtin_commands();

        tracing::info!(
            "TabBridge started (storage: {}, debug: {})",
            toolkit.storage.backend_name(),
            toolkit.debug_mode.is_enabled()
        );
        Ok(toolkit)
    }

    fn register_builtin_commands(&self) {
        let debug_mode = self.debug_mode.clone();
        self.menu.register(DEBUG_MODE_COMMAND, move || {
            if let Err(e) = debug_mode.toggle() {
                tracing::error!("Failed to toggle debug mode: {}", e);
            }
        });
    }

    /// Hook named methods of `class`
    ///
    /// Skipped names are logged at `warn` when `warn_on_missing_methods` is set.
    pub fn hook_methods<T, C, I, S>(&self, class: &Class<T, C>, hooks: I) -> Class<T, C>
    where
        T: Hookable,
        I: IntoIterator<Item = (S, HookConfig<T::Args, T::Output, T::Error>)>,
        S: AsRef<str>,
    {
        let warn = self.config.warn_on_missing_methods;
        hook_methods_with(class, hooks, |name| {
            if warn {
                tracing::warn!("Class '{}' has no method '{}'", class.name(), name);
            } else {
                tracing::trace!("Skipping unknown method '{}'", name);
            }
        })
    }

    /// Disable plugins, detach hooks, and clear the menu
    pub fn shutdown(&self) {
        tracing::info!("TabBridge shutting down...");

        let plugins = self.plugins.disable_all();
        let hooks = self.hooks.detach_all();
        let commands = self.menu.unregister_all();

        tracing::info!(
            "Shutdown complete ({} plugins disabled, {} hooks detached, {} menu commands removed)",
            plugins,
            hooks,
            commands
        );
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<StorageService> {
        &self.storage
    }

    pub fn menu(&self) -> &MenuRegistry {
        &self.menu
    }

    pub fn plugins(&self) -> &PluginManager {
        &self.plugins
    }

    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    pub fn debug_mode(&self) -> &DebugMode {
        &self.debug_mode
    }
}
