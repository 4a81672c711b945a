//! Behavior definitions: named methods and named functions
//!
//! A type opts into instance and class hooking by implementing [`Hookable`],
//! which declares the shared signature of its hookable methods and lists them
//! in a [`MethodTable`]. The table is the enumerable replacement for walking an
//! object's prototype at runtime.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::atomic::{AtomicI64, Ordering};
//! use tabbridge_hooks::{method_table, Hookable, MethodTable};
//!
//! struct Counter(AtomicI64);
//!
//! impl Counter {
//!     fn add(&self, n: i64) -> Result<i64, String> {
//!         Ok(self.0.fetch_add(n, Ordering::SeqCst) + n)
//!     }
//!
//!     fn get(&self, _: i64) -> Result<i64, String> {
//!         Ok(self.0.load(Ordering::SeqCst))
//!     }
//! }
//!
//! impl Hookable for Counter {
//!     type Args = i64;
//!     type Output = i64;
//!     type Error = String;
//!
//!     fn methods() -> MethodTable<Self> {
//!         method_table!(Counter => add, get)
//!     }
//! }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::HookConfig;
use crate::error::HookError;
use crate::func::{Func, Hook};

/// A receiver type whose methods can be hooked by name
pub trait Hookable: Send + Sync + Sized + 'static {
    /// Argument tuple shared by every hookable method
    type Args: Clone + 'static;
    /// Success value shared by every hookable method
    type Output: 'static;
    /// Error value shared by every hookable method
    type Error: 'static;

    /// The behavior definition: every hookable method by name
    fn methods() -> MethodTable<Self>;
}

/// A shared method callable on a `&T` receiver
pub struct Method<T: Hookable>(
    Arc<dyn Fn(&T, T::Args) -> Result<T::Output, T::Error> + Send + Sync>,
);

impl<T: Hookable> Method<T> {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&T, T::Args) -> Result<T::Output, T::Error> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Invoke the method on `receiver`
    pub fn call(&self, receiver: &T, args: T::Args) -> Result<T::Output, T::Error> {
        (self.0)(receiver, args)
    }

    /// Whether both handles point at the same callable
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<T: Hookable> Clone for Method<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: Hookable> fmt::Debug for Method<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Method({:p})", Arc::as_ptr(&self.0) as *const ())
    }
}

impl<T: Hookable> Hook for Method<T> {
    type Args = T::Args;
    type Output = T::Output;
    type Error = T::Error;

    fn hook(&self, config: HookConfig<T::Args, T::Output, T::Error>) -> Self {
        let original = self.clone();
        // The wrapper forwards the receiver it was invoked on
        Method::new(move |receiver: &T, args| {
            config.run(args, |args| original.call(receiver, args), |result| result)
        })
    }
}

/// Ordered name to method mapping
pub struct MethodTable<T: Hookable> {
    entries: Vec<(String, Method<T>)>,
}

impl<T: Hookable> MethodTable<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Builder form of [`insert`](Self::insert) taking a plain function
    pub fn with<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&T, T::Args) -> Result<T::Output, T::Error> + Send + Sync + 'static,
    {
        self.insert(name, Method::new(f));
        self
    }

    /// Add or replace a method, keeping the position of a replaced entry
    ///
    /// # Returns
    /// The previous method under `name`, if any
    pub fn insert(&mut self, name: &str, method: Method<T>) -> Option<Method<T>> {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, method)),
            None => {
                self.entries.push((name.to_string(), method));
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Method<T>> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, method)| method)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Method names in declaration order
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Method<T>)> {
        self.entries.iter().map(|(n, m)| (n.as_str(), m))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: Hookable> Default for MethodTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Hookable> Clone for MethodTable<T> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<T: Hookable> fmt::Debug for MethodTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.iter().map(|(n, _)| n)).finish()
    }
}

/// Build a [`MethodTable`] from associated functions of a type
///
/// ```ignore
/// method_table!(Counter => add, reset, get)
/// ```
#[macro_export]
macro_rules! method_table {
    ($ty:ty => $($method:ident),+ $(,)?) => {
        $crate::MethodTable::<$ty>::new()
            $(.with(stringify!($method), <$ty>::$method))+
    };
}

/// A shared table of named functions
///
/// The function-valued-properties analogue of a plain object: a natural owner
/// for detachable hooks on free callables. Clones share the same slots.
pub struct FunctionTable<A, R, E> {
    slots: Arc<RwLock<HashMap<String, Func<A, R, E>>>>,
}

impl<A, R, E> FunctionTable<A, R, E> {
    pub fn new() -> Self {
        Self {
            slots: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Builder form of [`insert`](Self::insert) taking a plain function
    pub fn with<F>(self, name: &str, f: F) -> Self
    where
        F: Fn(A) -> Result<R, E> + Send + Sync + 'static,
    {
        self.insert(name, Func::new(f));
        self
    }

    /// Install `func` under `name`, returning what was there before
    pub fn insert(&self, name: &str, func: Func<A, R, E>) -> Option<Func<A, R, E>> {
        self.slots.write().insert(name.to_string(), func)
    }

    pub fn get(&self, name: &str) -> Option<Func<A, R, E>> {
        self.slots.read().get(name).cloned()
    }

    pub fn remove(&self, name: &str) -> Option<Func<A, R, E>> {
        self.slots.write().remove(name)
    }

    /// Sorted slot names
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.slots.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Call the function currently installed under `name`
    ///
    /// The slot is read before the call, so the callee may replace or restore
    /// slots on this table while it runs.
    pub fn call(&self, name: &str, args: A) -> Result<R, E>
    where
        E: From<HookError>,
    {
        let func = self
            .get(name)
            .ok_or_else(|| HookError::MissingMethod(name.to_string()))?;
        func.call(args)
    }

    /// Whether both handles share the same slots
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.slots, &other.slots)
    }
}

impl<A, R, E> Default for FunctionTable<A, R, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A, R, E> Clone for FunctionTable<A, R, E> {
    fn clone(&self) -> Self {
        Self {
            slots: self.slots.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::func::wrap;
    use std::sync::atomic::{AtomicI64, Ordering};

    struct Counter {
        value: AtomicI64,
    }

    impl Counter {
        fn add(&self, n: i64) -> Result<i64, String> {
            Ok(self.value.fetch_add(n, Ordering::SeqCst) + n)
        }

        fn get(&self, _: i64) -> Result<i64, String> {
            Ok(self.value.load(Ordering::SeqCst))
        }
    }

    impl Hookable for Counter {
        type Args = i64;
        type Output = i64;
        type Error = String;

        fn methods() -> MethodTable<Self> {
            method_table!(Counter => add, get)
        }
    }

    fn counter(start: i64) -> Counter {
        Counter {
            value: AtomicI64::new(start),
        }
    }

    #[test]
    fn test_method_table_keeps_declaration_order() {
        let table = Counter::methods();
        assert_eq!(table.names(), vec!["add", "get"]);
        assert_eq!(table.len(), 2);
        assert!(table.contains("add"));
        assert!(!table.contains("reset"));
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut table = Counter::methods();
        let previous = table.insert("add", Method::<Counter>::new(|_, n| Ok(-n)));

        assert!(previous.is_some());
        assert_eq!(table.names(), vec!["add", "get"]);
        let c = counter(0);
        assert_eq!(table.get("add").unwrap().call(&c, 5), Ok(-5));
    }

    #[test]
    fn test_hooked_method_forwards_receiver() {
        let table = Counter::methods();
        let add = table.get("add").unwrap();
        let hooked = wrap(add, HookConfig::new().before(|n: &i64| Some(n * 2)));

        let a = counter(10);
        let b = counter(100);
        assert_eq!(hooked.call(&a, 1), Ok(12));
        assert_eq!(hooked.call(&b, 1), Ok(102));
        assert_eq!(a.value.load(Ordering::SeqCst), 12);
    }

    #[test]
    fn test_function_table_call_by_name() {
        let table: FunctionTable<(i32, i32), i32, HookError> =
            FunctionTable::new().with("add", |(a, b): (i32, i32)| Ok(a + b));

        assert_eq!(table.call("add", (2, 2)), Ok(4));
        assert_eq!(
            table.call("sub", (2, 2)),
            Err(HookError::MissingMethod("sub".to_string()))
        );
    }

    #[test]
    fn test_function_table_clones_share_slots() {
        let table: FunctionTable<(), &'static str, HookError> = FunctionTable::new();
        let alias = table.clone();
        table.insert("greet", Func::new(|_| Ok("hello")));

        assert!(alias.ptr_eq(&table));
        assert_eq!(alias.call("greet", ()), Ok("hello"));
        assert_eq!(alias.names(), vec!["greet"]);
        assert!(table.remove("greet").is_some());
        assert!(alias.get("greet").is_none());
    }
}
