//! TabBridge - Core runtime
//!
//! Configuration, logging, storage, menu commands, and plugins around the
//! hooking primitives of `tabbridge-hooks`.
//!
//! # Re-exports
//!
//! - [`hooks`] - function, instance, and class instrumentation
//!
//! # Example
//!
//! ```ignore
//! use tabbridge_core::{CoreConfig, Toolkit};
//!
//! let toolkit = Toolkit::start(CoreConfig::load()?)?;
//! toolkit.menu().register("Say hello", || tracing::info!("hello"));
//! // ...
//! toolkit.shutdown();
//! ```

pub use tabbridge_hooks as hooks;

pub mod config;
pub mod debug_mode;
pub mod error;
pub mod logging;
pub mod menu;
pub mod plugins;
pub mod storage;
pub mod toolkit;

pub use config::{ConfigError, ConfigResult, CoreConfig, PluginConfig, StorageKind};
pub use debug_mode::DebugMode;
pub use error::{Error, Result};
pub use menu::{MenuKey, MenuRegistry};
pub use plugins::{Plugin, PluginManager, PluginStatus};
pub use storage::{
    keys, ChangeKey, FileBackend, MemoryBackend, StorageBackend, StorageError, StorageResult,
    StorageService,
};
pub use toolkit::{Toolkit, DEBUG_MODE_COMMAND};
