//! Content negotiation.

use crate::media;
use crate::provider::MarshalingProvider;
use hermes_core::TypeKey;
use hermes_telemetry::metrics::{record_negotiation, Direction};
use mime::Mime;

impl MarshalingProvider {
    /// Returns `true` if request bodies of `key` in `media_type` can be read.
    ///
    /// A positive answer schedules a background warm-up of the marshaler.
    pub fn is_readable(&self, key: &TypeKey, media_type: &Mime) -> bool {
        self.negotiate(Direction::Decode, key, media_type)
    }

    /// Returns `true` if response bodies of `key` in `media_type` can be
    /// written.
    ///
    /// A positive answer schedules a background warm-up of the marshaler.
    pub fn is_writeable(&self, key: &TypeKey, media_type: &Mime) -> bool {
        self.negotiate(Direction::Encode, key, media_type)
    }

    /// Returns `true` if `key` has a marshaler and `media_type` is JSON.
    ///
    /// This is the pure capability check: it never loads a marshaler and
    /// schedules nothing.
    pub fn supports(&self, key: &TypeKey, media_type: &Mime) -> bool {
        media::is_json(media_type) && self.cache.resolver().has_associated_marshaler(key)
    }

    fn negotiate(&self, direction: Direction, key: &TypeKey, media_type: &Mime) -> bool {
        let accepted = self.supports(key, media_type);
        record_negotiation(direction, accepted);
        tracing::trace!(
            type_key = %key,
            media_type = %media_type,
            direction = direction.as_str(),
            accepted,
            "negotiated"
        );

        if accepted {
            self.warmup.schedule(&self.cache, key);
        }
        accepted
    }
}

#[cfg(test)]
mod tests {
    use crate::MarshalingProvider;
    use hermes_config::{ProviderConfig, WarmupMode};
    use hermes_core::{MarshalerRegistry, TypeKey};
    use hermes_test::fixtures::{Order, Shape};
    use hermes_test::CountingResolver;
    use mime::Mime;
    use std::sync::Arc;

    fn provider(
        warmup: WarmupMode,
    ) -> (Arc<CountingResolver<MarshalerRegistry>>, MarshalingProvider) {
        let resolver = Arc::new(CountingResolver::new(
            MarshalerRegistry::builder()
                .register::<Order>()
                .register::<Shape>()
                .build(),
        ));
        let provider = MarshalingProvider::builder()
            .shared_resolver(resolver.clone())
            .config(ProviderConfig {
                warmup,
                ..Default::default()
            })
            .build();
        (resolver, provider)
    }

    fn mime(s: &str) -> Mime {
        s.parse().unwrap()
    }

    #[test]
    fn test_json_and_known_type_accepted() {
        let (_, provider) = provider(WarmupMode::Disabled);
        assert!(provider.is_readable(&Order::key(), &mime::APPLICATION_JSON));
        assert!(provider.is_writeable(&Shape::key(), &mime("application/json; charset=utf-8")));
    }

    #[test]
    fn test_unknown_type_declined() {
        let (_, provider) = provider(WarmupMode::Disabled);
        let missing = TypeKey::new("orders.Missing");
        assert!(!provider.is_readable(&missing, &mime::APPLICATION_JSON));
        assert!(!provider.is_writeable(&missing, &mime::APPLICATION_JSON));
    }

    #[test]
    fn test_other_media_types_declined_without_probe() {
        let (resolver, provider) = provider(WarmupMode::Disabled);
        for media_type in ["text/plain", "*/*", "application/*", "application/xml"] {
            assert!(!provider.is_readable(&Order::key(), &mime(media_type)));
        }
        assert_eq!(resolver.probes(), 0);
    }

    #[test]
    fn test_negotiation_never_loads_inline() {
        let (resolver, provider) = provider(WarmupMode::Disabled);
        for _ in 0..3 {
            assert!(provider.is_readable(&Order::key(), &mime::APPLICATION_JSON));
        }
        assert_eq!(resolver.probes(), 3);
        assert_eq!(resolver.loads(), 0);
        assert!(provider.cache().is_empty());
    }

    #[test]
    fn test_supports_schedules_nothing() {
        let (resolver, provider) = provider(WarmupMode::Background);
        assert!(provider.supports(&Order::key(), &mime::APPLICATION_JSON));
        std::thread::sleep(std::time::Duration::from_millis(50));
        assert_eq!(resolver.loads(), 0);
    }
}
