//! TabBridge hooks - function, instance, and class instrumentation
//!
//! Wraps callables with composable lifecycle callbacks without touching call
//! sites. Four grains of interception, all built on one function wrapper:
//!
//! - [`wrap`] - one callable ([`Func`] or [`Method`])
//! - [`hook_instance`] - every method of one live [`Instance`]
//! - [`hook_class`] - construction through a [`Class`], optionally hooking each
//!   new instance
//! - [`hook_methods`] - named prototype methods, affecting all instances
//!
//! [`attach_detachable`] hooks a named slot and hands back a [`Detach`] handle;
//! [`HookRegistry`] keeps such handles for bulk removal.
//!
//! Hooks compose last-applied-outermost: the most recent hook's `before` runs
//! first and its `after` runs last.

pub mod class;
pub mod config;
pub mod detach;
pub mod error;
pub mod func;
pub mod instance;
pub mod method;
pub mod registry;

#[cfg(test)]
pub(crate) mod testing;

pub use class::{hook_class, hook_methods, hook_methods_with, Class, ClassHooks};
pub use config::HookConfig;
pub use detach::{attach_detachable, Detach, SlotOwner};
pub use error::{HookError, HookResult};
pub use func::{wrap, Func, Hook};
pub use instance::{hook_instance, Instance, MethodHooks};
pub use method::{FunctionTable, Hookable, Method, MethodTable};
pub use registry::{HookKey, HookRegistry};
