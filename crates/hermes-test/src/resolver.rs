//! Instrumented resolvers.

use hermes_core::{Marshaler, MarshalerResolver, ResolveError, TypeKey};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Wraps a resolver and counts how often it is probed and loaded.
///
/// # Example
///
/// ```
/// use hermes_core::{MarshalerRegistry, MarshalerResolver};
/// use hermes_test::{fixtures::Order, CountingResolver};
///
/// let registry = MarshalerRegistry::builder().register::<Order>().build();
/// let resolver = CountingResolver::new(registry);
///
/// resolver.load_marshaler(&Order::key()).unwrap();
/// assert_eq!(resolver.loads(), 1);
/// assert_eq!(resolver.loads_of(&Order::key()), 1);
/// ```
pub struct CountingResolver<R> {
    inner: R,
    delay: Duration,
    probes: AtomicUsize,
    loads: AtomicUsize,
    per_key: Mutex<HashMap<TypeKey, usize>>,
}

impl<R: MarshalerResolver> CountingResolver<R> {
    /// Wraps `inner`.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            delay: Duration::ZERO,
            probes: AtomicUsize::new(0),
            loads: AtomicUsize::new(0),
            per_key: Mutex::new(HashMap::new()),
        }
    }

    /// Sleeps for `delay` inside every load, to widen race windows.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of `has_associated_marshaler` calls.
    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    /// Number of `load_marshaler` calls.
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Number of `load_marshaler` calls for `key`.
    pub fn loads_of(&self, key: &TypeKey) -> usize {
        self.per_key.lock().get(key).copied().unwrap_or(0)
    }

    /// Returns the wrapped resolver.
    pub fn inner(&self) -> &R {
        &self.inner
    }
}

impl<R: MarshalerResolver> MarshalerResolver for CountingResolver<R> {
    fn has_associated_marshaler(&self, key: &TypeKey) -> bool {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.inner.has_associated_marshaler(key)
    }

    fn load_marshaler(&self, key: &TypeKey) -> Result<Arc<dyn Marshaler>, ResolveError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        *self.per_key.lock().entry(key.clone()).or_insert(0) += 1;
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        self.inner.load_marshaler(key)
    }
}

impl<R> fmt::Debug for CountingResolver<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CountingResolver")
            .field("probes", &self.probes.load(Ordering::SeqCst))
            .field("loads", &self.loads.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// Wraps a resolver and fails its first `n` loads.
///
/// Probes always pass through, so negotiation still succeeds while loads
/// fail.
pub struct FlakyResolver<R> {
    inner: R,
    remaining: AtomicUsize,
    failed: AtomicUsize,
}

impl<R: MarshalerResolver> FlakyResolver<R> {
    /// Wraps `inner`, failing the first `failures` loads.
    pub fn new(inner: R, failures: usize) -> Self {
        Self {
            inner,
            remaining: AtomicUsize::new(failures),
            failed: AtomicUsize::new(0),
        }
    }

    /// Number of loads that were failed on purpose.
    pub fn failures(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }
}

impl<R: MarshalerResolver> MarshalerResolver for FlakyResolver<R> {
    fn has_associated_marshaler(&self, key: &TypeKey) -> bool {
        self.inner.has_associated_marshaler(key)
    }

    fn load_marshaler(&self, key: &TypeKey) -> Result<Arc<dyn Marshaler>, ResolveError> {
        let fail = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if fail {
            self.failed.fetch_add(1, Ordering::SeqCst);
            return Err(ResolveError::load_failed(key, "injected load failure"));
        }
        self.inner.load_marshaler(key)
    }
}

impl<R> fmt::Debug for FlakyResolver<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlakyResolver")
            .field("remaining", &self.remaining.load(Ordering::SeqCst))
            .field("failed", &self.failed.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}
