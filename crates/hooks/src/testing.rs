//! Shared fixtures for unit tests

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::{method_table, Class, HookError, Hookable, MethodTable};

/// Error type of the [`Counter`] fixture
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub(crate) enum CounterError {
    #[error("{0}")]
    Refused(String),

    #[error(transparent)]
    Hook(#[from] HookError),
}

pub(crate) fn refused(message: &str) -> CounterError {
    CounterError::Refused(message.to_string())
}

/// A small stateful receiver with a failing method
pub(crate) struct Counter {
    pub label: String,
    pub value: AtomicI64,
}

impl Counter {
    pub fn new(label: &str, start: i64) -> Self {
        Self {
            label: label.to_string(),
            value: AtomicI64::new(start),
        }
    }

    fn add(&self, n: i64) -> Result<i64, CounterError> {
        Ok(self.value.fetch_add(n, Ordering::SeqCst) + n)
    }

    fn get(&self, _: i64) -> Result<i64, CounterError> {
        Ok(self.value.load(Ordering::SeqCst))
    }

    fn fail(&self, n: i64) -> Result<i64, CounterError> {
        Err(CounterError::Refused(format!("{} refused {}", self.label, n)))
    }
}

impl Hookable for Counter {
    type Args = i64;
    type Output = i64;
    type Error = CounterError;

    fn methods() -> MethodTable<Self> {
        method_table!(Counter => add, get, fail)
    }
}

/// Constructor arguments: (label, start)
pub(crate) type CounterArgs = (String, i64);

pub(crate) fn counter_class() -> Class<Counter, CounterArgs> {
    Class::new("Counter", |(label, start): CounterArgs| {
        if start < 0 {
            return Err(CounterError::Refused(format!("negative start for {}", label)));
        }
        Ok(Counter::new(&label, start))
    })
}

pub(crate) fn args(label: &str, start: i64) -> CounterArgs {
    (label.to_string(), start)
}

/// Append-only event log shared between callbacks
#[derive(Clone, Default)]
pub(crate) struct Log(Arc<Mutex<Vec<String>>>);

impl Log {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.0.lock().len()
    }
}
