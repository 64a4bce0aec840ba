//! Negotiation and warm-up integration tests.

use hermes_config::{NegotiationLoad, ProviderConfig, WarmupMode};
use hermes_core::{MarshalerRegistry, TypeKey};
use hermes_provider::MarshalingProvider;
use hermes_test::fixtures::{sample_order, Order, OrderLine, Shape};
use hermes_test::{CountingResolver, FlakyResolver};
use mime::Mime;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn registry() -> MarshalerRegistry {
    MarshalerRegistry::builder()
        .register::<Order>()
        .register::<OrderLine>()
        .register::<Shape>()
        .build()
}

fn counting_provider(
    config: ProviderConfig,
) -> (Arc<CountingResolver<MarshalerRegistry>>, MarshalingProvider) {
    let resolver = Arc::new(CountingResolver::new(registry()));
    let provider = MarshalingProvider::builder()
        .shared_resolver(resolver.clone())
        .config(config)
        .build();
    (resolver, provider)
}

fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

fn mime(s: &str) -> Mime {
    s.parse().unwrap()
}

#[test]
fn test_supports_agrees_with_loading() {
    let (_, provider) = counting_provider(ProviderConfig {
        warmup: WarmupMode::Disabled,
        ..Default::default()
    });
    let keys = [
        Order::key(),
        TypeKey::of::<OrderLine>(),
        Shape::key(),
        TypeKey::new("orders.Missing"),
        TypeKey::new("geometry.Circle"),
    ];

    for key in &keys {
        let supported = provider.supports(key, &mime::APPLICATION_JSON);
        let loadable = provider.cache().get_or_load(key).is_ok();
        assert_eq!(supported, loadable, "mismatch for {key}");
    }
}

#[test]
fn test_negotiation_is_deterministic() {
    let (_, provider) = counting_provider(ProviderConfig::default());
    let json = mime("application/json; charset=utf-8");
    let first = provider.is_readable(&Order::key(), &json);

    for _ in 0..10 {
        assert_eq!(provider.is_readable(&Order::key(), &json), first);
        assert_eq!(provider.is_writeable(&Order::key(), &json), first);
    }
    assert!(first);
}

#[test]
fn test_only_exact_json_media_type_accepted() {
    let (_, provider) = counting_provider(ProviderConfig {
        warmup: WarmupMode::Disabled,
        ..Default::default()
    });
    let accepted = ["application/json", "APPLICATION/JSON", "application/json;charset=UTF-8"];
    let declined = [
        "*/*",
        "application/*",
        "text/plain",
        "text/json",
        "application/problem+json",
        "application/x-ndjson",
    ];

    for media_type in accepted {
        assert!(provider.is_writeable(&Order::key(), &mime(media_type)), "{media_type}");
    }
    for media_type in declined {
        assert!(!provider.is_writeable(&Order::key(), &mime(media_type)), "{media_type}");
    }
}

#[test]
fn test_positive_negotiation_warms_cache_without_runtime() {
    let (resolver, provider) = counting_provider(ProviderConfig::default());

    assert!(provider.is_readable(&Order::key(), &mime::APPLICATION_JSON));
    assert!(eventually(|| provider.cache().contains(&Order::key())));

    let body = serde_json::to_vec(&sample_order()).unwrap();
    let order: Order = provider.read(&mime::APPLICATION_JSON, &body[..]).unwrap();
    assert_eq!(order, sample_order());
    assert_eq!(resolver.loads_of(&Order::key()), 1);
}

#[test]
fn test_negative_negotiation_schedules_nothing() {
    let (resolver, provider) = counting_provider(ProviderConfig::default());

    assert!(!provider.is_readable(&Order::key(), &mime::TEXT_PLAIN));
    assert!(!provider.is_readable(&TypeKey::new("orders.Missing"), &mime::APPLICATION_JSON));

    thread::sleep(Duration::from_millis(50));
    assert_eq!(resolver.loads(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_positive_negotiation_warms_cache_on_runtime() {
    let (resolver, provider) = counting_provider(ProviderConfig::default());

    assert!(provider.is_writeable(&Shape::key(), &mime::APPLICATION_JSON));

    let deadline = Instant::now() + Duration::from_secs(5);
    while !provider.cache().contains(&Shape::key()) && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(provider.cache().contains(&Shape::key()));
    assert_eq!(resolver.loads_of(&Shape::key()), 1);
}

#[test]
fn test_warm_mode_loads_once_across_negotiations() {
    let (resolver, provider) = counting_provider(ProviderConfig::default());

    assert!(provider.is_readable(&Order::key(), &mime::APPLICATION_JSON));
    assert!(eventually(|| provider.cache().contains(&Order::key())));
    for _ in 0..5 {
        assert!(provider.is_readable(&Order::key(), &mime::APPLICATION_JSON));
    }

    thread::sleep(Duration::from_millis(50));
    assert_eq!(resolver.loads_of(&Order::key()), 1);
}

#[test]
fn test_refresh_mode_reloads_on_negotiation() {
    let (resolver, provider) = counting_provider(ProviderConfig {
        negotiation_load: NegotiationLoad::Refresh,
        ..Default::default()
    });
    provider.cache().get_or_load(&Order::key()).unwrap();

    assert!(provider.is_writeable(&Order::key(), &mime::APPLICATION_JSON));
    assert!(eventually(|| resolver.loads_of(&Order::key()) == 2));
    assert!(eventually(|| provider.cache().stats().refreshes == 1));

    let body = provider.write_bytes(&sample_order(), &mime::APPLICATION_JSON).unwrap();
    let order: Order = provider.read(&mime::APPLICATION_JSON, &body[..]).unwrap();
    assert_eq!(order, sample_order());
}

#[test]
fn test_repeated_refresh_negotiations_queue_few_jobs() {
    let resolver = Arc::new(CountingResolver::new(registry()).with_delay(Duration::from_millis(20)));
    let provider = MarshalingProvider::builder()
        .shared_resolver(resolver.clone())
        .config(ProviderConfig {
            negotiation_load: NegotiationLoad::Refresh,
            ..Default::default()
        })
        .build();

    for _ in 0..200 {
        assert!(provider.is_readable(&Order::key(), &mime::APPLICATION_JSON));
    }

    assert!(eventually(|| provider.cache().contains(&Order::key())));
    assert!(eventually(|| !provider.cache().is_loading(&Order::key())));
    let jobs = provider.warmup().jobs_scheduled();
    assert!(jobs < 10, "{jobs} warm-up jobs for 200 negotiations");
    assert!(resolver.loads_of(&Order::key()) < 10);
}

#[test]
fn test_failed_warmup_surfaces_on_decode_then_recovers() {
    let resolver = Arc::new(FlakyResolver::new(registry(), 2));
    let provider = MarshalingProvider::builder()
        .shared_resolver(resolver.clone())
        .build();
    let body = serde_json::to_vec(&sample_order()).unwrap();

    // The negotiation succeeds and its warm-up consumes the first failure.
    assert!(provider.is_readable(&Order::key(), &mime::APPLICATION_JSON));
    assert!(eventually(|| resolver.failures() == 1));
    assert!(!provider.cache().contains(&Order::key()));

    let err = provider
        .read_from(&Order::key(), &mime::APPLICATION_JSON, &body[..])
        .unwrap_err();
    assert_eq!(err.error_code(), "CODEC_UNAVAILABLE");
    assert_eq!(err.status_code(), http::StatusCode::INTERNAL_SERVER_ERROR);

    // The decode above either shared the warm-up's failure or hit the second
    // one; either way a retry within two attempts succeeds.
    let order = (0..2)
        .find_map(|_| provider.read::<Order, _>(&mime::APPLICATION_JSON, &body[..]).ok())
        .expect("decode recovers once injected failures are used up");
    assert_eq!(order, sample_order());
    assert_eq!(resolver.failures(), 2);
    assert!(provider.cache().contains(&Order::key()));
}

#[test]
fn test_concurrent_cold_decodes_load_once() {
    let resolver = Arc::new(
        CountingResolver::new(registry()).with_delay(Duration::from_millis(50)),
    );
    let provider = MarshalingProvider::builder()
        .shared_resolver(resolver.clone())
        .config(ProviderConfig {
            warmup: WarmupMode::Disabled,
            ..Default::default()
        })
        .build();
    let body = Arc::new(serde_json::to_vec(&sample_order()).unwrap());

    let handles: Vec<_> = (0..12)
        .map(|_| {
            let provider = provider.clone();
            let body = Arc::clone(&body);
            thread::spawn(move || provider.read::<Order, _>(&mime::APPLICATION_JSON, &body[..]))
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap().unwrap(), sample_order());
    }
    assert_eq!(resolver.loads_of(&Order::key()), 1);
}
