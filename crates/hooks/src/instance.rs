//! Instance hooks
//!
//! Hooking an instance installs wrapped copies of its class methods as own
//! slots on that one object. The shared prototype and every other instance are
//! left alone.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::HookConfig;
use crate::error::HookError;
use crate::func::Hook;
use crate::method::{Hookable, Method, MethodTable};

/// Shared behavior definition of a class
pub(crate) type Prototype<T> = RwLock<MethodTable<T>>;

/// Shared handle to a live object
///
/// Method lookup checks the object's own slots first, then its prototype.
/// Clones refer to the same object.
pub struct Instance<T: Hookable> {
    inner: Arc<InstanceInner<T>>,
}

struct InstanceInner<T: Hookable> {
    state: T,
    prototype: Arc<Prototype<T>>,
    own: RwLock<HashMap<String, Method<T>>>,
}

impl<T: Hookable> Instance<T> {
    /// Create a standalone object with a fresh prototype from `T::methods()`
    pub fn new(state: T) -> Self {
        Self::with_prototype(state, Arc::new(RwLock::new(T::methods())))
    }

    pub(crate) fn with_prototype(state: T, prototype: Arc<Prototype<T>>) -> Self {
        Self {
            inner: Arc::new(InstanceInner {
                state,
                prototype,
                own: RwLock::new(HashMap::new()),
            }),
        }
    }

    pub(crate) fn prototype(&self) -> &Arc<Prototype<T>> {
        &self.inner.prototype
    }

    /// The receiver passed to every method call
    pub fn state(&self) -> &T {
        &self.inner.state
    }

    /// Resolve a method: own slot first, then prototype
    pub fn method(&self, name: &str) -> Option<Method<T>> {
        if let Some(method) = self.inner.own.read().get(name) {
            return Some(method.clone());
        }
        self.inner.prototype.read().get(name).cloned()
    }

    /// Call a method by name
    ///
    /// The method is resolved before it runs, so callbacks may re-hook or
    /// detach slots on this object without deadlocking.
    pub fn call(&self, name: &str, args: T::Args) -> Result<T::Output, T::Error>
    where
        T::Error: From<HookError>,
    {
        let method = self
            .method(name)
            .ok_or_else(|| HookError::MissingMethod(name.to_string()))?;
        method.call(&self.inner.state, args)
    }

    /// Names defined by the prototype, in declaration order
    pub fn method_names(&self) -> Vec<String> {
        self.inner.prototype.read().names()
    }

    /// Sorted names of slots installed on this object only
    pub fn own_methods(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.own.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn has_own_method(&self, name: &str) -> bool {
        self.inner.own.read().contains_key(name)
    }

    pub(crate) fn set_own(&self, name: &str, method: Method<T>) {
        self.inner.own.write().insert(name.to_string(), method);
    }

    /// Whether both handles refer to the same object
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: Hookable> Clone for Instance<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Hookable + fmt::Debug> fmt::Debug for Instance<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("state", &self.inner.state)
            .field("own", &self.own_methods())
            .finish()
    }
}

/// Per-method configuration source for instance and class hooks
pub enum MethodHooks<T: Hookable> {
    /// The same configuration for every method
    All(HookConfig<T::Args, T::Output, T::Error>),
    /// A configuration resolved from each method name
    PerMethod(Arc<dyn Fn(&str) -> HookConfig<T::Args, T::Output, T::Error> + Send + Sync>),
}

impl<T: Hookable> MethodHooks<T> {
    /// Resolve a configuration per method name (e.g. a distinct log tag per method)
    pub fn per_method<F>(resolve: F) -> Self
    where
        F: Fn(&str) -> HookConfig<T::Args, T::Output, T::Error> + Send + Sync + 'static,
    {
        MethodHooks::PerMethod(Arc::new(resolve))
    }

    /// The effective configuration for `name`
    pub fn resolve(&self, name: &str) -> HookConfig<T::Args, T::Output, T::Error> {
        match self {
            MethodHooks::All(config) => config.clone(),
            MethodHooks::PerMethod(resolve) => resolve(name),
        }
    }
}

impl<T: Hookable> Clone for MethodHooks<T> {
    fn clone(&self) -> Self {
        match self {
            MethodHooks::All(config) => MethodHooks::All(config.clone()),
            MethodHooks::PerMethod(resolve) => MethodHooks::PerMethod(resolve.clone()),
        }
    }
}

impl<T: Hookable> From<HookConfig<T::Args, T::Output, T::Error>> for MethodHooks<T> {
    fn from(config: HookConfig<T::Args, T::Output, T::Error>) -> Self {
        MethodHooks::All(config)
    }
}

/// Hook every prototype method of one instance
///
/// Each method's current implementation (an existing own slot, or else the
/// prototype entry) is wrapped and installed as an own slot. Hooking the same
/// instance twice nests the wrappers.
///
/// # Returns
/// A handle to the same instance
pub fn hook_instance<T: Hookable>(
    instance: &Instance<T>,
    hooks: impl Into<MethodHooks<T>>,
) -> Instance<T> {
    let hooks = hooks.into();
    let mut hooked = 0;

    for name in instance.method_names() {
        // Resolve outside any lock: the resolver is caller code
        if let Some(current) = instance.method(&name) {
            let config = hooks.resolve(&name);
            instance.set_own(&name, current.hook(config));
            hooked += 1;
        }
    }

    tracing::debug!("Hooked {} methods on instance", hooked);
    instance.clone()
}
