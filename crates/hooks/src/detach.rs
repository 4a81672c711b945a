//! Detachable hooks
//!
//! [`attach_detachable`] replaces a named slot on an owner with a wrapped copy
//! and returns a [`Detach`] handle that writes the original back.
//!
//! # Example
//!
//! ```ignore
//! use tabbridge_hooks::{attach_detachable, FunctionTable, HookConfig};
//!
//! let dom = FunctionTable::new().with("click", |selector: String| Ok::<_, HookError>(()));
//! let detach = attach_detachable(
//!     &dom,
//!     "click",
//!     HookConfig::new().before(|s: &String| {
//!         tracing::info!("click {}", s);
//!         None
//!     }),
//! )?;
//!
//! dom.call("click", "#submit".into())?; // logged
//! detach.detach();
//! dom.call("click", "#submit".into())?; // original
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::class::Class;
use crate::config::HookConfig;
use crate::error::{HookError, HookResult};
use crate::func::{Func, Hook};
use crate::instance::Instance;
use crate::method::{FunctionTable, Hookable, Method};

/// An object with named, replaceable callable slots
///
/// Implementations are cheap handles: clones refer to the same slots.
pub trait SlotOwner: Clone + Send + Sync + 'static {
    /// The callable stored in each slot
    type Slot: Hook;

    /// Read the callable currently visible under `name`
    fn read_slot(&self, name: &str) -> Option<Self::Slot>;

    /// Install `slot` under `name`
    fn write_slot(&self, name: &str, slot: Self::Slot);
}

/// Instance slots: reads see own slots first, writes go to own slots
impl<T: Hookable> SlotOwner for Instance<T> {
    type Slot = Method<T>;

    fn read_slot(&self, name: &str) -> Option<Method<T>> {
        self.method(name)
    }

    fn write_slot(&self, name: &str, slot: Method<T>) {
        self.set_own(name, slot);
    }
}

/// Class slots are prototype entries
impl<T: Hookable, C: 'static> SlotOwner for Class<T, C> {
    type Slot = Method<T>;

    fn read_slot(&self, name: &str) -> Option<Method<T>> {
        self.method(name)
    }

    fn write_slot(&self, name: &str, slot: Method<T>) {
        self.set_method(name, slot);
    }
}

impl<A, R, E> SlotOwner for FunctionTable<A, R, E>
where
    A: Clone + 'static,
    R: 'static,
    E: 'static,
{
    type Slot = Func<A, R, E>;

    fn read_slot(&self, name: &str) -> Option<Func<A, R, E>> {
        self.get(name)
    }

    fn write_slot(&self, name: &str, slot: Func<A, R, E>) {
        self.insert(name, slot);
    }
}

/// Handle that restores a hooked slot to its original callable
///
/// Only the first [`detach`](Self::detach) writes; later calls do nothing.
pub struct Detach {
    name: Arc<str>,
    detached: AtomicBool,
    restore: Box<dyn Fn() + Send + Sync>,
}

impl Detach {
    /// Restore the original callable
    ///
    /// Calls already in flight finish with the wrapper they resolved.
    ///
    /// # Returns
    /// `true` if this call performed the restoration
    pub fn detach(&self) -> bool {
        if self.detached.swap(true, Ordering::AcqRel) {
            return false;
        }

        (self.restore)();
        tracing::debug!("Detached hook '{}'", self.name);
        true
    }

    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::Acquire)
    }

    /// Slot name this handle restores
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for Detach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Detach")
            .field("name", &self.name)
            .field("detached", &self.is_detached())
            .finish()
    }
}

/// Hook `owner`'s slot `name` and return a handle that undoes it
///
/// # Errors
/// [`HookError::InvalidTarget`] if `owner` has no callable under `name`
pub fn attach_detachable<O: SlotOwner>(
    owner: &O,
    name: &str,
    config: HookConfig<
        <O::Slot as Hook>::Args,
        <O::Slot as Hook>::Output,
        <O::Slot as Hook>::Error,
    >,
) -> HookResult<Detach> {
    let original = owner
        .read_slot(name)
        .ok_or_else(|| HookError::InvalidTarget(name.to_string()))?;

    owner.write_slot(name, original.hook(config));
    tracing::debug!("Attached detachable hook '{}'", name);

    let name: Arc<str> = Arc::from(name);
    let (slot_owner, slot_name) = (owner.clone(), name.clone());

    Ok(Detach {
        name,
        detached: AtomicBool::new(false),
        restore: Box::new(move || slot_owner.write_slot(&slot_name, original.clone())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{args, counter_class, CounterError, Log};

    type Config = HookConfig<i64, i64, CounterError>;

    fn table() -> FunctionTable<(i32, i32), i32, HookError> {
        FunctionTable::new().with("add", |(a, b): (i32, i32)| Ok(a + b))
    }

    #[test]
    fn test_detach_restores_original_behavior() {
        let log = Log::default();
        let l = log.clone();
        let owner = table();
        let before = owner.get("add").unwrap();

        let detach = attach_detachable(
            &owner,
            "add",
            HookConfig::new().after(move |sum: &i32, _: &(i32, i32)| {
                l.push("after");
                Some(sum * 10)
            }),
        )
        .unwrap();

        assert_eq!(owner.call("add", (1, 2)), Ok(30));
        assert!(detach.detach());
        assert!(detach.is_detached());

        assert_eq!(owner.call("add", (1, 2)), Ok(3));
        assert!(owner.get("add").unwrap().ptr_eq(&before));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_second_detach_is_a_no_op() {
        let owner = table();
        let detach = attach_detachable(&owner, "add", HookConfig::new()).unwrap();
        assert!(detach.detach());

        // A later hook by someone else survives a repeated detach
        let later = attach_detachable(
            &owner,
            "add",
            HookConfig::new().after(|sum: &i32, _: &(i32, i32)| Some(sum + 1)),
        )
        .unwrap();
        assert!(!detach.detach());
        assert_eq!(owner.call("add", (1, 1)), Ok(3));
        assert!(!later.is_detached());
    }

    #[test]
    fn test_missing_slot_is_invalid_target() {
        let err = attach_detachable(&table(), "sub", HookConfig::new()).unwrap_err();
        assert_eq!(err, HookError::InvalidTarget("sub".to_string()));
    }

    #[test]
    fn test_detach_on_instance_restores_original() {
        let class = counter_class();
        let instance = class.construct(args("a", 1)).unwrap();

        let detach = attach_detachable(
            &instance,
            "get",
            Config::new().after(|value, _| Some(value + 100)),
        )
        .unwrap();
        assert_eq!(instance.call("get", 0), Ok(101));
        assert_eq!(detach.name(), "get");

        detach.detach();
        assert_eq!(instance.call("get", 0), Ok(1));
    }

    #[test]
    fn test_detach_on_class_affects_all_instances() {
        let class = counter_class();
        let a = class.construct(args("a", 1)).unwrap();

        let detach =
            attach_detachable(&class, "get", Config::new().after(|_, _| Some(0))).unwrap();
        let b = class.construct(args("b", 2)).unwrap();
        assert_eq!(a.call("get", 0), Ok(0));
        assert_eq!(b.call("get", 0), Ok(0));

        detach.detach();
        assert_eq!(a.call("get", 0), Ok(1));
        assert_eq!(b.call("get", 0), Ok(2));
    }

    #[test]
    fn test_detach_from_inside_callback() {
        let owner = table();
        let handle: Arc<parking_lot::Mutex<Option<Detach>>> = Arc::default();
        let h = handle.clone();

        let detach = attach_detachable(
            &owner,
            "add",
            HookConfig::new().after(move |sum: &i32, _: &(i32, i32)| {
                if let Some(detach) = h.lock().as_ref() {
                    detach.detach();
                }
                Some(sum * 2)
            }),
        )
        .unwrap();
        *handle.lock() = Some(detach);

        // The in-flight call keeps its wrapper; the next one sees the original
        assert_eq!(owner.call("add", (2, 2)), Ok(8));
        assert_eq!(owner.call("add", (2, 2)), Ok(4));
    }
}
