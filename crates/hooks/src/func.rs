//! Function wrapper
//!
//! The leaf primitive: wraps one callable with a [`HookConfig`]. Every other
//! hook grain is built on [`Hook::hook`].

use std::fmt;
use std::sync::Arc;

use crate::config::HookConfig;

/// A shared callable taking an argument tuple `A`
///
/// Cloning shares the underlying closure.
pub struct Func<A, R, E>(Arc<dyn Fn(A) -> Result<R, E> + Send + Sync>);

impl<A, R, E> Func<A, R, E> {
    /// Wrap a closure or function item
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(A) -> Result<R, E> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Invoke the callable
    pub fn call(&self, args: A) -> Result<R, E> {
        (self.0)(args)
    }

    /// Whether both handles point at the same callable
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<A, R, E> Clone for Func<A, R, E> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<A, R, E> fmt::Debug for Func<A, R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Func({:p})", Arc::as_ptr(&self.0) as *const ())
    }
}

/// A callable that can be wrapped by a [`HookConfig`]
///
/// The produced callable has the same signature as the original. Hooking an
/// already hooked callable nests: the most recent configuration is outermost.
pub trait Hook: Clone + Send + Sync + 'static {
    /// Argument tuple
    type Args;
    /// Success value
    type Output;
    /// Error value
    type Error;

    /// Produce a wrapped copy of this callable
    fn hook(&self, config: HookConfig<Self::Args, Self::Output, Self::Error>) -> Self;
}

impl<A, R, E> Hook for Func<A, R, E>
where
    A: Clone + 'static,
    R: 'static,
    E: 'static,
{
    type Args = A;
    type Output = R;
    type Error = E;

    fn hook(&self, config: HookConfig<A, R, E>) -> Self {
        let original = self.clone();
        Func::new(move |args| config.run(args, |args| original.call(args), |result| result))
    }
}

/// Wrap `original` with `config`
///
/// The original is left untouched; the returned callable is the drop-in
/// replacement.
pub fn wrap<H: Hook>(original: &H, config: HookConfig<H::Args, H::Output, H::Error>) -> H {
    original.hook(config)
}
