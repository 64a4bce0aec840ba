//! Marshaler caching.
//!
//! [`MarshalerCache`] memoizes resolver results per [`TypeKey`]. Populated
//! keys are served from a sharded map without blocking other readers. A cold
//! key is claimed by the first caller, who runs the resolver outside any map
//! lock; concurrent callers for the same key wait for that one load and all
//! observe its outcome.
//!
//! Failed loads are never remembered: the slot is dropped and the next call
//! resolves again. Successful entries live until explicitly invalidated; the
//! set of payload types a service uses is small and stable, so there is no
//! eviction.
//!
//! # Example
//!
//! ```rust
//! use hermes_core::{Marshaled, MarshalerCache, MarshalerRegistry, TypeKey};
//! use serde::{Deserialize, Serialize};
//! use std::sync::Arc;
//!
//! #[derive(Serialize, Deserialize)]
//! struct Invoice {
//!     number: u64,
//! }
//!
//! impl Marshaled for Invoice {
//!     const TYPE_KEY: &'static str = "billing.Invoice";
//! }
//!
//! let registry = MarshalerRegistry::builder().register::<Invoice>().build();
//! let cache = MarshalerCache::new(Arc::new(registry));
//!
//! let key = TypeKey::of::<Invoice>();
//! let first = cache.get_or_load(&key).unwrap();
//! let second = cache.get_or_load(&key).unwrap();
//! assert!(Arc::ptr_eq(&first, &second));
//! assert_eq!(cache.stats().loads, 1);
//! ```

use crate::error::ResolveError;
use crate::marshaler::Marshaler;
use crate::registry::MarshalerResolver;
use crate::TypeKey;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use metrics::{counter, histogram};
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

type LoadOutcome = Result<Arc<dyn Marshaler>, ResolveError>;

/// Cache statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from a populated entry.
    pub hits: u64,
    /// Lookups that found no populated entry.
    pub misses: u64,
    /// Resolver invocations (initial loads and refreshes).
    pub loads: u64,
    /// Resolver invocations that failed.
    pub load_failures: u64,
    /// Refreshes of already populated entries.
    pub refreshes: u64,
    /// Number of populated entries.
    pub size: usize,
}

/// One resolver invocation that other callers may wait on.
struct InFlight {
    outcome: Mutex<Option<LoadOutcome>>,
    done: Condvar,
}

impl InFlight {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            outcome: Mutex::new(None),
            done: Condvar::new(),
        })
    }

    fn complete(&self, outcome: LoadOutcome) {
        *self.outcome.lock() = Some(outcome);
        self.done.notify_all();
    }

    fn wait(&self) -> LoadOutcome {
        let mut guard = self.outcome.lock();
        loop {
            if let Some(outcome) = guard.as_ref() {
                return outcome.clone();
            }
            self.done.wait(&mut guard);
        }
    }
}

enum Slot {
    /// First load in progress; no marshaler yet.
    Loading(Arc<InFlight>),
    /// Populated. `refreshing` is set while a reload runs.
    Ready {
        marshaler: Arc<dyn Marshaler>,
        refreshing: Option<Arc<InFlight>>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadKind {
    Initial,
    Reload,
}

impl LoadKind {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Reload => "reload",
        }
    }
}

/// Concurrent, lazily populated type key → marshaler cache.
pub struct MarshalerCache {
    resolver: Arc<dyn MarshalerResolver>,
    slots: DashMap<TypeKey, Slot>,
    hits: AtomicU64,
    misses: AtomicU64,
    loads: AtomicU64,
    load_failures: AtomicU64,
    refreshes: AtomicU64,
}

impl MarshalerCache {
    /// Creates an empty cache over `resolver`.
    pub fn new(resolver: Arc<dyn MarshalerResolver>) -> Self {
        Self {
            resolver,
            slots: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            loads: AtomicU64::new(0),
            load_failures: AtomicU64::new(0),
            refreshes: AtomicU64::new(0),
        }
    }

    /// Returns the resolver this cache loads from.
    #[must_use]
    pub fn resolver(&self) -> &Arc<dyn MarshalerResolver> {
        &self.resolver
    }

    /// Returns the marshaler for `key`, loading it if necessary.
    ///
    /// Blocks while another caller's load of the same key is in progress and
    /// then returns that load's outcome, including its failure.
    pub fn get_or_load(&self, key: &TypeKey) -> Result<Arc<dyn Marshaler>, ResolveError> {
        if let Some(marshaler) = self.get_if_present(key) {
            return Ok(marshaler);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        counter!("hermes_marshaler_cache_misses_total").increment(1);

        let flight = match self.slots.entry(key.clone()) {
            Entry::Occupied(entry) => {
                let waiting = match entry.get() {
                    Slot::Ready { marshaler, .. } => return Ok(Arc::clone(marshaler)),
                    Slot::Loading(flight) => Arc::clone(flight),
                };
                drop(entry);
                tracing::trace!(type_key = %key, "waiting for in-flight marshaler load");
                return waiting.wait();
            }
            Entry::Vacant(entry) => {
                let flight = InFlight::new();
                entry.insert(Slot::Loading(Arc::clone(&flight)));
                flight
            }
        };

        self.run_load(key, flight, LoadKind::Initial)
    }

    /// Returns the marshaler for `key` if it is already loaded.
    #[must_use]
    pub fn get_if_present(&self, key: &TypeKey) -> Option<Arc<dyn Marshaler>> {
        let slot = self.slots.get(key)?;
        match slot.value() {
            Slot::Ready { marshaler, .. } => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                counter!("hermes_marshaler_cache_hits_total").increment(1);
                Some(Arc::clone(marshaler))
            }
            Slot::Loading(_) => None,
        }
    }

    /// Loads `key` if it is neither loaded nor loading.
    ///
    /// Failures are logged and swallowed; they surface again on the next
    /// [`get_or_load`](Self::get_or_load).
    pub fn warm(&self, key: &TypeKey) {
        if self.slots.contains_key(key) {
            return;
        }
        if let Err(e) = self.get_or_load(key) {
            tracing::debug!(type_key = %key, error = %e, "marshaler warm-up failed");
        }
    }

    /// Recomputes the marshaler for `key`.
    ///
    /// A loaded entry keeps serving its current marshaler until the new one
    /// is published; if the reload fails, the current one is kept. Coalesces
    /// with a load or refresh of the same key that is already running. On an
    /// absent key this is a plain load.
    pub fn refresh(&self, key: &TypeKey) -> Result<(), ResolveError> {
        let (flight, kind) = match self.slots.entry(key.clone()) {
            Entry::Vacant(entry) => {
                let flight = InFlight::new();
                entry.insert(Slot::Loading(Arc::clone(&flight)));
                (flight, LoadKind::Initial)
            }
            Entry::Occupied(mut entry) => match entry.get_mut() {
                Slot::Loading(_) | Slot::Ready { refreshing: Some(_), .. } => {
                    tracing::trace!(type_key = %key, "refresh coalesced with running load");
                    return Ok(());
                }
                Slot::Ready { refreshing, .. } => {
                    let flight = InFlight::new();
                    *refreshing = Some(Arc::clone(&flight));
                    (flight, LoadKind::Reload)
                }
            },
        };

        self.run_load(key, flight, kind).map(|_| ())
    }

    /// Drops the entry for `key`. Callers already waiting on a load still
    /// receive its outcome.
    pub fn invalidate(&self, key: &TypeKey) {
        if self.slots.remove(key).is_some() {
            tracing::debug!(type_key = %key, "marshaler cache entry invalidated");
        }
    }

    /// Drops every entry.
    pub fn invalidate_all(&self) {
        self.slots.clear();
    }

    /// Returns `true` if a marshaler for `key` is loaded.
    #[must_use]
    pub fn contains(&self, key: &TypeKey) -> bool {
        self.slots
            .get(key)
            .is_some_and(|slot| matches!(slot.value(), Slot::Ready { .. }))
    }

    /// Returns `true` while a first load or a reload of `key` is running.
    #[must_use]
    pub fn is_loading(&self, key: &TypeKey) -> bool {
        self.slots.get(key).is_some_and(|slot| {
            matches!(
                slot.value(),
                Slot::Loading(_) | Slot::Ready { refreshing: Some(_), .. }
            )
        })
    }

    /// Returns the number of loaded entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot.value(), Slot::Ready { .. }))
            .count()
    }

    /// Returns `true` if nothing is loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a snapshot of the cache counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            loads: self.loads.load(Ordering::Relaxed),
            load_failures: self.load_failures.load(Ordering::Relaxed),
            refreshes: self.refreshes.load(Ordering::Relaxed),
            size: self.len(),
        }
    }

    fn run_load(&self, key: &TypeKey, flight: Arc<InFlight>, kind: LoadKind) -> LoadOutcome {
        let pending = PendingLoad {
            cache: self,
            key,
            flight,
            kind,
            finished: false,
        };

        let started = Instant::now();
        let outcome = self.resolver.load_marshaler(key);
        histogram!("hermes_marshaler_load_duration_seconds", "kind" => kind.as_str())
            .record(started.elapsed().as_secs_f64());

        pending.finish(outcome.clone());
        outcome
    }

    fn publish(&self, key: &TypeKey, flight: &Arc<InFlight>, kind: LoadKind, outcome: LoadOutcome) {
        self.loads.fetch_add(1, Ordering::Relaxed);
        if kind == LoadKind::Reload {
            self.refreshes.fetch_add(1, Ordering::Relaxed);
        }

        match &outcome {
            Ok(marshaler) => {
                counter!("hermes_marshaler_loads_total", "outcome" => "success").increment(1);
                if let Some(mut slot) = self.slots.get_mut(key) {
                    if slot_owned_by(slot.value(), flight) {
                        *slot = Slot::Ready {
                            marshaler: Arc::clone(marshaler),
                            refreshing: None,
                        };
                    }
                }
                tracing::debug!(type_key = %key, kind = kind.as_str(), "marshaler loaded");
            }
            Err(e) => {
                self.load_failures.fetch_add(1, Ordering::Relaxed);
                counter!("hermes_marshaler_loads_total", "outcome" => "failure").increment(1);
                match kind {
                    LoadKind::Initial => {
                        self.slots
                            .remove_if(key, |_, slot| slot_owned_by(slot, flight));
                        tracing::debug!(type_key = %key, error = %e, "marshaler load failed");
                    }
                    LoadKind::Reload => {
                        if let Some(mut slot) = self.slots.get_mut(key) {
                            if let Slot::Ready { refreshing, .. } = slot.value_mut() {
                                if refreshing.as_ref().is_some_and(|f| Arc::ptr_eq(f, flight)) {
                                    *refreshing = None;
                                }
                            }
                        }
                        tracing::warn!(
                            type_key = %key,
                            error = %e,
                            "marshaler refresh failed, keeping previous marshaler"
                        );
                    }
                }
            }
        }

        flight.complete(outcome);
    }
}

fn slot_owned_by(slot: &Slot, flight: &Arc<InFlight>) -> bool {
    match slot {
        Slot::Loading(f) => Arc::ptr_eq(f, flight),
        Slot::Ready {
            refreshing: Some(f),
            ..
        } => Arc::ptr_eq(f, flight),
        Slot::Ready { .. } => false,
    }
}

impl fmt::Debug for MarshalerCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarshalerCache")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

/// Publishes a load's outcome exactly once, even if the resolver unwinds.
struct PendingLoad<'a> {
    cache: &'a MarshalerCache,
    key: &'a TypeKey,
    flight: Arc<InFlight>,
    kind: LoadKind,
    finished: bool,
}

impl PendingLoad<'_> {
    fn finish(mut self, outcome: LoadOutcome) {
        self.finished = true;
        self.cache.publish(self.key, &self.flight, self.kind, outcome);
    }
}

impl Drop for PendingLoad<'_> {
    fn drop(&mut self) {
        if !self.finished {
            let err = ResolveError::load_failed(self.key, "marshaler load panicked");
            self.cache.publish(self.key, &self.flight, self.kind, Err(err));
        }
    }
}
