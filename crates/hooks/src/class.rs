//! Class hooks: construction interception and prototype method hooks
//!
//! A [`Class`] is the explicit construction point for a [`Hookable`] type. It
//! owns the shared prototype every instance resolves methods through, so:
//!
//! - [`hook_class`] returns a replacement class whose constructor runs the
//!   lifecycle callbacks (and optionally hooks each new instance). It shares
//!   the prototype of the original, so `is_instance_of` holds for both.
//! - [`hook_methods`] rewrites prototype entries in place, affecting every
//!   existing and future instance.
//!
//! # Example
//!
//! ```ignore
//! use tabbridge_hooks::{hook_class, Class, ClassHooks, HookConfig};
//!
//! let class = Class::new("Counter", |start: i64| Ok(Counter::new(start)));
//! let traced = hook_class(
//!     &class,
//!     ClassHooks::new()
//!         .constructor(HookConfig::new().before(|start| Some(start.max(0))))
//!         .methods(HookConfig::traced("counter")),
//! );
//!
//! let counter = traced.construct(-5)?;
//! assert!(counter.is_instance_of(&class));
//! ```

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::HookConfig;
use crate::func::{Func, Hook};
use crate::instance::{hook_instance, Instance, MethodHooks, Prototype};
use crate::method::{Hookable, Method};

/// Construction point and shared prototype for `T`, built from arguments `C`
pub struct Class<T: Hookable, C> {
    name: Arc<str>,
    prototype: Arc<Prototype<T>>,
    constructor: Func<C, Instance<T>, T::Error>,
}

impl<T: Hookable, C: 'static> Class<T, C> {
    /// Define a class from a constructor function
    ///
    /// The prototype is initialised from `T::methods()`.
    pub fn new<F>(name: &str, construct: F) -> Self
    where
        F: Fn(C) -> Result<T, T::Error> + Send + Sync + 'static,
    {
        let prototype = Arc::new(RwLock::new(T::methods()));
        let shared = prototype.clone();
        let constructor = Func::new(move |args: C| {
            construct(args).map(|state| Instance::with_prototype(state, shared.clone()))
        });

        Self {
            name: Arc::from(name),
            prototype,
            constructor,
        }
    }
}

impl<T: Hookable, C> Class<T, C> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Create a new instance
    pub fn construct(&self, args: C) -> Result<Instance<T>, T::Error> {
        self.constructor.call(args)
    }

    /// Current prototype entry for `name`
    pub fn method(&self, name: &str) -> Option<Method<T>> {
        self.prototype.read().get(name).cloned()
    }

    /// Prototype method names in declaration order
    pub fn method_names(&self) -> Vec<String> {
        self.prototype.read().names()
    }

    pub(crate) fn set_method(&self, name: &str, method: Method<T>) {
        self.prototype.write().insert(name, method);
    }

    /// Whether both classes share one prototype (one is a hooked form of the other)
    pub fn same_class<D>(&self, other: &Class<T, D>) -> bool {
        Arc::ptr_eq(&self.prototype, &other.prototype)
    }
}

impl<T: Hookable, C> Clone for Class<T, C> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            prototype: self.prototype.clone(),
            constructor: self.constructor.clone(),
        }
    }
}

impl<T: Hookable, C> fmt::Debug for Class<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("name", &self.name)
            .field("methods", &self.method_names())
            .finish()
    }
}

impl<T: Hookable> Instance<T> {
    /// Whether this object was produced by `class` or any hooked form of it
    pub fn is_instance_of<C>(&self, class: &Class<T, C>) -> bool {
        Arc::ptr_eq(self.prototype(), &class.prototype)
    }
}

/// Configuration for [`hook_class`]
pub struct ClassHooks<T: Hookable, C> {
    constructor: Option<HookConfig<C, Instance<T>, T::Error>>,
    methods: Option<MethodHooks<T>>,
}

impl<T: Hookable, C> ClassHooks<T, C> {
    pub fn new() -> Self {
        Self {
            constructor: None,
            methods: None,
        }
    }

    /// Callbacks around construction
    ///
    /// `after` receives the new instance and may return a replacement.
    pub fn constructor(mut self, config: HookConfig<C, Instance<T>, T::Error>) -> Self {
        self.constructor = Some(config);
        self
    }

    /// Hook the methods of every constructed instance
    pub fn methods(mut self, hooks: impl Into<MethodHooks<T>>) -> Self {
        self.methods = Some(hooks.into());
        self
    }
}

impl<T: Hookable, C> Default for ClassHooks<T, C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Intercept construction of `class`
///
/// Per construction: `before` may substitute the arguments, the original
/// constructor runs, `after` may replace the instance, then the instance's
/// methods are hooked when `methods` is configured. `on_error` sees failures of
/// any of these steps and `on_finally` runs last.
///
/// # Returns
/// A replacement class sharing the original's prototype
pub fn hook_class<T, C>(class: &Class<T, C>, hooks: ClassHooks<T, C>) -> Class<T, C>
where
    T: Hookable,
    C: Clone + 'static,
{
    let ClassHooks {
        constructor,
        methods,
    } = hooks;
    let config = constructor.unwrap_or_default();
    let original = class.constructor.clone();

    let constructor = Func::new(move |args: C| {
        config.run(
            args,
            |args| original.call(args),
            |instance| match &methods {
                Some(methods) => hook_instance(&instance, methods.clone()),
                None => instance,
            },
        )
    });

    tracing::debug!("Hooked constructor of class '{}'", class.name);

    Class {
        name: class.name.clone(),
        prototype: class.prototype.clone(),
        constructor,
    }
}

/// Hook named prototype methods of `class`
///
/// Names that are not defined on the prototype are skipped without error.
///
/// # Returns
/// The same class
pub fn hook_methods<T, C, I, S>(class: &Class<T, C>, hooks: I) -> Class<T, C>
where
    T: Hookable,
    I: IntoIterator<Item = (S, HookConfig<T::Args, T::Output, T::Error>)>,
    S: AsRef<str>,
{
    hook_methods_with(class, hooks, |name| {
        tracing::trace!("Skipping unknown method '{}'", name);
    })
}

/// [`hook_methods`] with a diagnostic callback for skipped names
pub fn hook_methods_with<T, C, I, S, D>(
    class: &Class<T, C>,
    hooks: I,
    mut on_missing: D,
) -> Class<T, C>
where
    T: Hookable,
    I: IntoIterator<Item = (S, HookConfig<T::Args, T::Output, T::Error>)>,
    S: AsRef<str>,
    D: FnMut(&str),
{
    for (name, config) in hooks {
        let name = name.as_ref();
        let hooked = {
            let mut prototype = class.prototype.write();
            match prototype.get(name).cloned() {
                Some(current) => {
                    prototype.insert(name, current.hook(config));
                    true
                }
                None => false,
            }
        };

        if hooked {
            tracing::debug!("Hooked method '{}' on class '{}'", name, class.name);
        } else {
            on_missing(name);
        }
    }

    class.clone()
}
