//! Hook configuration and the call engine shared by every hook grain
//!
//! A [`HookConfig`] carries up to four lifecycle callbacks for a callable that
//! takes an argument tuple `A` and returns `Result<R, E>`:
//!
//! - `before` sees the arguments and may substitute them
//! - `after` sees the result and the (possibly substituted) arguments and may
//!   substitute the result
//! - `on_error` sees the error and the arguments; the error still propagates
//! - `on_finally` runs exactly once per call, success or failure
//!
//! # Example
//!
//! ```ignore
//! use tabbridge_hooks::{wrap, Func, HookConfig};
//!
//! let add = Func::new(|(a, b): (i32, i32)| Ok::<_, String>(a + b));
//! let doubled = wrap(&add, HookConfig::new().after(|sum, _| Some(sum * 2)));
//! assert_eq!(doubled.call((1, 1)), Ok(4));
//! ```

use std::fmt;
use std::sync::Arc;

/// Callback run at call entry
pub type BeforeFn<A, E> = dyn Fn(&A) -> Result<Option<A>, E> + Send + Sync;

/// Callback run after a successful call
pub type AfterFn<A, R, E> = dyn Fn(&R, &A) -> Result<Option<R>, E> + Send + Sync;

/// Callback run after a failed call
pub type ErrorFn<A, E> = dyn Fn(&E, &A) -> Result<(), E> + Send + Sync;

/// Callback run when a call completes
pub type FinallyFn = dyn Fn() + Send + Sync;

/// Lifecycle callbacks applied around a callable
///
/// Cloning is cheap: callbacks are shared, never copied. A configuration is not
/// changed once it has been applied to a target.
pub struct HookConfig<A, R, E> {
    before: Option<Arc<BeforeFn<A, E>>>,
    after: Option<Arc<AfterFn<A, R, E>>>,
    on_error: Option<Arc<ErrorFn<A, E>>>,
    on_finally: Option<Arc<FinallyFn>>,
}

impl<A, R, E> Default for HookConfig<A, R, E> {
    fn default() -> Self {
        Self {
            before: None,
            after: None,
            on_error: None,
            on_finally: None,
        }
    }
}

impl<A, R, E> Clone for HookConfig<A, R, E> {
    fn clone(&self) -> Self {
        Self {
            before: self.before.clone(),
            after: self.after.clone(),
            on_error: self.on_error.clone(),
            on_finally: self.on_finally.clone(),
        }
    }
}

impl<A, R, E> fmt::Debug for HookConfig<A, R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookConfig")
            .field("before", &self.before.is_some())
            .field("after", &self.after.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_finally", &self.on_finally.is_some())
            .finish()
    }
}

impl<A: 'static, R: 'static, E: 'static> HookConfig<A, R, E> {
    /// Create an empty configuration (every call passes straight through)
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` at call entry. Returning `Some(args)` replaces the arguments.
    pub fn before<F>(self, f: F) -> Self
    where
        F: Fn(&A) -> Option<A> + Send + Sync + 'static,
    {
        self.try_before(move |args| Ok(f(args)))
    }

    /// Fallible form of [`before`](Self::before). An `Err` fails the call.
    pub fn try_before<F>(mut self, f: F) -> Self
    where
        F: Fn(&A) -> Result<Option<A>, E> + Send + Sync + 'static,
    {
        self.before = Some(Arc::new(f));
        self
    }

    /// Run `f` after a successful call. Returning `Some(result)` replaces the result.
    pub fn after<F>(self, f: F) -> Self
    where
        F: Fn(&R, &A) -> Option<R> + Send + Sync + 'static,
    {
        self.try_after(move |result, args| Ok(f(result, args)))
    }

    /// Fallible form of [`after`](Self::after). An `Err` fails the call.
    pub fn try_after<F>(mut self, f: F) -> Self
    where
        F: Fn(&R, &A) -> Result<Option<R>, E> + Send + Sync + 'static,
    {
        self.after = Some(Arc::new(f));
        self
    }

    /// Observe a failed call. The error is always returned to the caller.
    pub fn on_error<F>(self, f: F) -> Self
    where
        F: Fn(&E, &A) + Send + Sync + 'static,
    {
        self.try_on_error(move |err, args| {
            f(err, args);
            Ok(())
        })
    }

    /// Fallible form of [`on_error`](Self::on_error).
    ///
    /// Returning `Err` masks the original error with the returned one.
    pub fn try_on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&E, &A) -> Result<(), E> + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(f));
        self
    }

    /// Run `f` once per call after `after`/`on_error`, success or failure
    ///
    /// Also runs while a panic from the original or another callback is
    /// unwinding. A panic raised by `f` at that point is caught and logged so
    /// the first panic keeps propagating instead of aborting the process.
    pub fn on_finally<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_finally = Some(Arc::new(f));
        self
    }
}

impl<A: 'static, R: 'static, E: fmt::Display + 'static> HookConfig<A, R, E> {
    /// A configuration that only logs: entry and success at debug, failure at warn
    ///
    /// Useful as a per-method resolver for instance hooks:
    /// `MethodHooks::per_method(HookConfig::traced)`.
    pub fn traced(tag: &str) -> Self {
        let tag: Arc<str> = Arc::from(tag);
        let (enter, exit, failed) = (tag.clone(), tag.clone(), tag);

        Self::new()
            .before(move |_| {
                tracing::debug!("-> {}", enter);
                None
            })
            .after(move |_, _| {
                tracing::debug!("<- {}", exit);
                None
            })
            .on_error(move |err, _| {
                tracing::warn!("<- {} failed: {}", failed, err);
            })
    }
}

impl<A, R, E> HookConfig<A, R, E> {
    /// Whether no callback is configured
    pub fn is_empty(&self) -> bool {
        self.before.is_none()
            && self.after.is_none()
            && self.on_error.is_none()
            && self.on_finally.is_none()
    }

    /// Drive one call through the lifecycle
    ///
    /// `call` invokes the original with the effective arguments. `finish` runs on
    /// the final success value before `on_finally`, so post-processing (such as
    /// hooking a freshly constructed instance) still happens inside the call.
    pub(crate) fn run<F, G>(&self, args: A, call: F, finish: G) -> Result<R, E>
    where
        A: Clone,
        F: FnOnce(A) -> Result<R, E>,
        G: FnOnce(R) -> R,
    {
        let _finally = FinallyGuard(self.on_finally.as_deref());

        let args = match self.before.as_ref().map(|before| before(&args)) {
            None | Some(Ok(None)) => args,
            Some(Ok(Some(substituted))) => substituted,
            Some(Err(err)) => return Err(self.fail(err, &args)),
        };

        // Only keep a copy of the arguments when a callback will look at them
        let kept = (self.after.is_some() || self.on_error.is_some()).then(|| args.clone());

        let result = call(args).and_then(|value| match (&self.after, &kept) {
            (Some(after), Some(args)) => after(&value, args).map(|r| r.unwrap_or(value)),
            _ => Ok(value),
        });

        match (result, &kept) {
            (Ok(value), _) => Ok(finish(value)),
            (Err(err), Some(args)) => Err(self.fail(err, args)),
            (Err(err), None) => Err(err),
        }
    }

    fn fail(&self, err: E, args: &A) -> E {
        match &self.on_error {
            Some(on_error) => match on_error(&err, args) {
                Ok(()) => err,
                Err(masked) => masked,
            },
            None => err,
        }
    }
}

/// Runs `on_finally` on scope exit, including unwinding
struct FinallyGuard<'a>(Option<&'a FinallyFn>);

impl Drop for FinallyGuard<'_> {
    fn drop(&mut self) {
        let Some(on_finally) = self.0 else {
            return;
        };

        if !std::thread::panicking() {
            on_finally();
            return;
        }

        // A second panic escaping a drop during unwinding aborts
        let contained = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| on_finally()));
        if contained.is_err() {
            tracing::error!("on_finally panicked while unwinding; panic suppressed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type Config = HookConfig<(i32, i32), i32, String>;

    fn add((a, b): (i32, i32)) -> Result<i32, String> {
        Ok(a + b)
    }

    #[test]
    fn test_empty_config_passes_through() {
        let config = Config::new();
        assert!(config.is_empty());
        assert_eq!(config.run((2, 3), add, |r| r), Ok(5));
    }

    #[test]
    fn test_before_error_runs_on_error_and_finally() {
        let errors = Arc::new(AtomicUsize::new(0));
        let finals = Arc::new(AtomicUsize::new(0));
        let (e, f) = (errors.clone(), finals.clone());

        let config = Config::new()
            .try_before(|_| Err("rejected".to_string()))
            .on_error(move |err, args| {
                assert_eq!(err, "rejected");
                assert_eq!(*args, (1, 2));
                e.fetch_add(1, Ordering::SeqCst);
            })
            .on_finally(move || {
                f.fetch_add(1, Ordering::SeqCst);
            });

        let called = AtomicUsize::new(0);
        let result = config.run(
            (1, 2),
            |args| {
                called.fetch_add(1, Ordering::SeqCst);
                add(args)
            },
            |r| r,
        );

        assert_eq!(result, Err("rejected".to_string()));
        assert_eq!(called.load(Ordering::SeqCst), 0);
        assert_eq!(errors.load(Ordering::SeqCst), 1);
        assert_eq!(finals.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_on_error_can_mask_error() {
        let config = Config::new().try_on_error(|err, _| Err(format!("masked: {}", err)));
        let result = config.run((1, 1), |_| Err("boom".to_string()), |r| r);
        assert_eq!(result, Err("masked: boom".to_string()));
    }

    #[test]
    fn test_finish_runs_before_finally() {
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let o = order.clone();

        let config = Config::new().on_finally(move || o.lock().push("finally"));
        let result = config.run((1, 1), add, |r| {
            order.lock().push("finish");
            r + 10
        });

        assert_eq!(result, Ok(12));
        assert_eq!(*order.lock(), vec!["finish", "finally"]);
    }

    #[test]
    fn test_finally_runs_on_panic() {
        let finals = Arc::new(AtomicUsize::new(0));
        let f = finals.clone();
        let config = Config::new().on_finally(move || {
            f.fetch_add(1, Ordering::SeqCst);
        });

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            config.run((1, 1), |_| panic!("original panicked"), |r| r)
        }));

        assert!(outcome.is_err());
        assert_eq!(finals.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_finally_panic_during_unwind_is_contained() {
        let finals = Arc::new(AtomicUsize::new(0));
        let f = finals.clone();
        let config = Config::new().on_finally(move || {
            f.fetch_add(1, Ordering::SeqCst);
            panic!("finally panicked");
        });

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            config.run((1, 1), |_| panic!("original panicked"), |r| r)
        }));

        let payload = outcome.unwrap_err();
        assert_eq!(payload.downcast_ref::<&str>(), Some(&"original panicked"));
        assert_eq!(finals.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_traced_does_not_change_results() {
        let config = Config::traced("add");
        assert!(!config.is_empty());
        assert_eq!(config.run((2, 2), add, |r| r), Ok(4));
        assert_eq!(
            config.run((2, 2), |_| Err("nope".to_string()), |r| r),
            Err("nope".to_string())
        );
    }

    #[test]
    fn test_debug_shows_configured_slots() {
        let config = Config::new().on_finally(|| {});
        let debug = format!("{:?}", config);
        assert!(debug.contains("on_finally: true"));
        assert!(debug.contains("before: false"));
    }
}
