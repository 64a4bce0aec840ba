//! Background marshaler warm-up.
//!
//! A positive negotiation hands the type key to the [`WarmupScheduler`], which
//! loads (or reloads) the marshaler off the request path. Nothing here can fail
//! or block the negotiation that triggered it.
//!
//! At most one job per key is queued or running at a time. Keys whose load is
//! already in flight in the cache are skipped as well.

use hermes_config::{NegotiationLoad, ProviderConfig, WarmupMode};
use hermes_core::{MarshalerCache, TypeKey};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;
use tokio::sync::mpsc;

/// Schedules cache loads after positive negotiations.
///
/// Clones share the pending set and the worker thread.
#[derive(Debug, Clone)]
pub struct WarmupScheduler {
    mode: WarmupMode,
    load: NegotiationLoad,
    thread_name: String,
    pending: Arc<Mutex<HashSet<TypeKey>>>,
    scheduled: Arc<AtomicU64>,
    worker: Arc<OnceLock<Option<mpsc::UnboundedSender<WarmupJob>>>>,
}

impl WarmupScheduler {
    /// Creates a scheduler from provider configuration.
    #[must_use]
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            mode: config.warmup,
            load: config.negotiation_load,
            thread_name: config.warmup_thread_name.clone(),
            pending: Arc::new(Mutex::new(HashSet::new())),
            scheduled: Arc::new(AtomicU64::new(0)),
            worker: Arc::new(OnceLock::new()),
        }
    }

    /// Returns `true` if scheduling is switched off.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.mode == WarmupMode::Disabled
    }

    /// Number of jobs handed to a runtime or the worker thread so far.
    #[must_use]
    pub fn jobs_scheduled(&self) -> u64 {
        self.scheduled.load(Ordering::Relaxed)
    }

    /// Schedules a load of `key` into `cache`.
    ///
    /// Runs on the current tokio runtime's blocking pool when called from
    /// inside a runtime, otherwise on a single long-lived named worker thread.
    /// Nothing is scheduled while a job for `key` is pending or the cache is
    /// already loading it. In [`NegotiationLoad::Warm`] mode an already loaded
    /// key schedules nothing either.
    pub fn schedule(&self, cache: &Arc<MarshalerCache>, key: &TypeKey) {
        if self.is_disabled() || cache.is_loading(key) {
            return;
        }
        if self.load == NegotiationLoad::Warm && cache.contains(key) {
            return;
        }
        if !self.pending.lock().insert(key.clone()) {
            tracing::trace!(type_key = %key, "warm-up already pending");
            return;
        }

        let job = WarmupJob {
            cache: Arc::clone(cache),
            load: self.load,
            pending: PendingKey {
                set: Arc::clone(&self.pending),
                key: key.clone(),
            },
        };

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            tracing::trace!(type_key = %key, "scheduling warm-up on runtime blocking pool");
            self.scheduled.fetch_add(1, Ordering::Relaxed);
            // The join handle is dropped; the task is detached.
            drop(handle.spawn_blocking(move || job.run()));
            return;
        }

        let Some(sender) = self.worker.get_or_init(|| self.start_worker()) else {
            return;
        };
        tracing::trace!(type_key = %key, thread = %self.thread_name, "queueing warm-up on worker thread");
        if sender.send(job).is_ok() {
            self.scheduled.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn start_worker(&self) -> Option<mpsc::UnboundedSender<WarmupJob>> {
        let (sender, mut receiver) = mpsc::unbounded_channel::<WarmupJob>();
        let spawned = thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || {
                while let Some(job) = receiver.blocking_recv() {
                    if panic::catch_unwind(AssertUnwindSafe(|| job.run())).is_err() {
                        tracing::warn!("warm-up job panicked");
                    }
                }
            });

        match spawned {
            Ok(_) => Some(sender),
            Err(e) => {
                tracing::warn!(thread = %self.thread_name, error = %e, "failed to spawn warm-up thread");
                None
            }
        }
    }
}

/// Removes its key from the pending set when the job finishes or is dropped.
struct PendingKey {
    set: Arc<Mutex<HashSet<TypeKey>>>,
    key: TypeKey,
}

impl Drop for PendingKey {
    fn drop(&mut self) {
        self.set.lock().remove(&self.key);
    }
}

struct WarmupJob {
    cache: Arc<MarshalerCache>,
    load: NegotiationLoad,
    pending: PendingKey,
}

impl WarmupJob {
    fn run(self) {
        let key = &self.pending.key;
        match self.load {
            NegotiationLoad::Warm => self.cache.warm(key),
            NegotiationLoad::Refresh => {
                if let Err(e) = self.cache.refresh(key) {
                    tracing::debug!(type_key = %key, error = %e, "marshaler refresh failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermes_core::{Marshaler, MarshalerRegistry, MarshalerResolver, ResolveError};
    use hermes_test::fixtures::Order;
    use hermes_test::CountingResolver;
    use std::time::{Duration, Instant};

    fn counting_cache() -> (Arc<CountingResolver<MarshalerRegistry>>, Arc<MarshalerCache>) {
        let resolver = Arc::new(CountingResolver::new(
            MarshalerRegistry::builder().register::<Order>().build(),
        ));
        let cache = Arc::new(MarshalerCache::new(resolver.clone()));
        (resolver, cache)
    }

    fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        condition()
    }

    #[test]
    fn test_disabled_schedules_nothing() {
        let (resolver, cache) = counting_cache();
        let scheduler = WarmupScheduler::new(&ProviderConfig {
            warmup: WarmupMode::Disabled,
            ..Default::default()
        });

        scheduler.schedule(&cache, &Order::key());
        thread::sleep(Duration::from_millis(50));

        assert!(scheduler.is_disabled());
        assert_eq!(resolver.loads(), 0);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_warm_on_thread_without_runtime() {
        let (resolver, cache) = counting_cache();
        let scheduler = WarmupScheduler::new(&ProviderConfig::default());

        scheduler.schedule(&cache, &Order::key());

        assert!(wait_until(|| cache.contains(&Order::key())));
        assert_eq!(resolver.loads(), 1);
    }

    #[test]
    fn test_warm_skips_loaded_key() {
        let (resolver, cache) = counting_cache();
        cache.get_or_load(&Order::key()).unwrap();
        let scheduler = WarmupScheduler::new(&ProviderConfig::default());

        scheduler.schedule(&cache, &Order::key());
        thread::sleep(Duration::from_millis(50));

        assert_eq!(resolver.loads(), 1);
    }

    #[test]
    fn test_refresh_reloads_loaded_key() {
        let (resolver, cache) = counting_cache();
        cache.get_or_load(&Order::key()).unwrap();
        let scheduler = WarmupScheduler::new(&ProviderConfig {
            negotiation_load: NegotiationLoad::Refresh,
            ..Default::default()
        });

        scheduler.schedule(&cache, &Order::key());

        assert!(wait_until(|| resolver.loads() == 2));
        assert!(wait_until(|| cache.stats().refreshes == 1));
    }

    #[test]
    fn test_unknown_key_failure_is_swallowed() {
        let (resolver, cache) = counting_cache();
        let scheduler = WarmupScheduler::new(&ProviderConfig::default());
        let missing = TypeKey::new("orders.Missing");

        scheduler.schedule(&cache, &missing);

        assert!(wait_until(|| resolver.loads() == 1));
        assert!(!cache.contains(&missing));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_warm_on_runtime_blocking_pool() {
        let (resolver, cache) = counting_cache();
        let scheduler = WarmupScheduler::new(&ProviderConfig::default());

        scheduler.schedule(&cache, &Order::key());

        let deadline = Instant::now() + Duration::from_secs(5);
        while !cache.contains(&Order::key()) && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(cache.contains(&Order::key()));
        assert_eq!(resolver.loads(), 1);
    }

    #[test]
    fn test_repeated_refresh_schedules_bounded_jobs() {
        let resolver = Arc::new(
            CountingResolver::new(MarshalerRegistry::builder().register::<Order>().build())
                .with_delay(Duration::from_millis(30)),
        );
        let cache = Arc::new(MarshalerCache::new(resolver.clone()));
        let scheduler = WarmupScheduler::new(&ProviderConfig {
            negotiation_load: NegotiationLoad::Refresh,
            ..Default::default()
        });

        for _ in 0..200 {
            scheduler.schedule(&cache, &Order::key());
        }

        assert!(wait_until(|| cache.contains(&Order::key())));
        assert!(wait_until(|| !cache.is_loading(&Order::key())));
        assert!(scheduler.jobs_scheduled() < 10, "{} jobs", scheduler.jobs_scheduled());
        assert!(resolver.loads() < 10, "{} loads", resolver.loads());
    }

    #[test]
    fn test_finished_job_allows_next_schedule() {
        let (resolver, cache) = counting_cache();
        let scheduler = WarmupScheduler::new(&ProviderConfig {
            negotiation_load: NegotiationLoad::Refresh,
            ..Default::default()
        });

        scheduler.schedule(&cache, &Order::key());
        assert!(wait_until(|| resolver.loads() == 1));
        assert!(wait_until(|| scheduler.pending.lock().is_empty()));

        scheduler.schedule(&cache, &Order::key());
        assert!(wait_until(|| resolver.loads() == 2));
        assert_eq!(scheduler.jobs_scheduled(), 2);
    }

    #[test]
    fn test_skips_key_loading_in_cache() {
        let resolver = Arc::new(
            CountingResolver::new(MarshalerRegistry::builder().register::<Order>().build())
                .with_delay(Duration::from_millis(100)),
        );
        let cache = Arc::new(MarshalerCache::new(resolver.clone()));
        let loader = {
            let cache = Arc::clone(&cache);
            thread::spawn(move || cache.get_or_load(&Order::key()).map(|_| ()))
        };
        assert!(wait_until(|| cache.is_loading(&Order::key())));

        let scheduler = WarmupScheduler::new(&ProviderConfig::default());
        scheduler.schedule(&cache, &Order::key());

        assert_eq!(scheduler.jobs_scheduled(), 0);
        loader.join().unwrap().unwrap();
        assert_eq!(resolver.loads(), 1);
    }

    /// Records the name of the thread each load runs on.
    struct ThreadNames {
        inner: MarshalerRegistry,
        names: Mutex<Vec<Option<String>>>,
    }

    impl MarshalerResolver for ThreadNames {
        fn has_associated_marshaler(&self, key: &TypeKey) -> bool {
            self.inner.has_associated_marshaler(key)
        }

        fn load_marshaler(&self, key: &TypeKey) -> Result<Arc<dyn Marshaler>, ResolveError> {
            self.names
                .lock()
                .push(thread::current().name().map(str::to_owned));
            self.inner.load_marshaler(key)
        }
    }

    #[test]
    fn test_jobs_share_named_worker_thread() {
        let resolver = Arc::new(ThreadNames {
            inner: MarshalerRegistry::builder().register::<Order>().build(),
            names: Mutex::new(Vec::new()),
        });
        let cache = Arc::new(MarshalerCache::new(resolver.clone()));
        let scheduler = WarmupScheduler::new(&ProviderConfig {
            negotiation_load: NegotiationLoad::Refresh,
            warmup_thread_name: "orders-warmup".into(),
            ..Default::default()
        });

        for _ in 0..3 {
            scheduler.schedule(&cache, &Order::key());
            assert!(wait_until(|| scheduler.pending.lock().is_empty()));
        }

        let names = resolver.names.lock().clone();
        assert_eq!(names.len(), 3);
        assert!(names.iter().all(|name| name.as_deref() == Some("orders-warmup")));
    }
}
