//! The marshaling provider.

use crate::media::APPLICATION_JSON;
use crate::warmup::WarmupScheduler;
use hermes_config::ProviderConfig;
use hermes_core::{MarshalerCache, MarshalerRegistry, MarshalerResolver};
use http::header::{self, HeaderMap, HeaderValue};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Reads and writes `application/json` bodies through cached marshalers.
///
/// Cloning is cheap; clones share the marshaler cache.
///
/// # Example
///
/// ```rust
/// use hermes_core::MarshalerRegistry;
/// use hermes_provider::MarshalingProvider;
/// # use serde::{Deserialize, Serialize};
/// # #[derive(Debug, PartialEq, Serialize, Deserialize)]
/// # struct Ping { seq: u32 }
/// # impl hermes_core::Marshaled for Ping { const TYPE_KEY: &'static str = "demo.Ping"; }
///
/// let provider = MarshalingProvider::builder()
///     .resolver(MarshalerRegistry::builder().register::<Ping>().build())
///     .build();
///
/// let body = provider.write_bytes(&Ping { seq: 7 }, &mime::APPLICATION_JSON).unwrap();
/// assert_eq!(&body[..], br#"{"seq":7}"#);
///
/// let ping: Ping = provider.read(&mime::APPLICATION_JSON, &body[..]).unwrap();
/// assert_eq!(ping, Ping { seq: 7 });
/// ```
#[derive(Clone)]
pub struct MarshalingProvider {
    pub(crate) cache: Arc<MarshalerCache>,
    pub(crate) warmup: WarmupScheduler,
    config: ProviderConfig,
}

impl MarshalingProvider {
    /// Creates a new builder.
    #[must_use]
    pub fn builder() -> MarshalingProviderBuilder {
        MarshalingProviderBuilder::new()
    }

    /// Returns the marshaler cache.
    #[must_use]
    pub fn cache(&self) -> &Arc<MarshalerCache> {
        &self.cache
    }

    /// Returns the warm-up scheduler.
    #[must_use]
    pub fn warmup(&self) -> &WarmupScheduler {
        &self.warmup
    }

    /// Returns the provider configuration.
    #[must_use]
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Returns the encoded length of `value`.
    ///
    /// Always `None`: bodies are streamed and their length is not known up
    /// front.
    #[must_use]
    pub fn size_of(&self, _value: &dyn Any) -> Option<u64> {
        None
    }

    /// Prepares response headers for a streamed JSON body.
    ///
    /// Sets `Content-Type: application/json` and removes any
    /// `Content-Length`, so the server falls back to chunked framing.
    pub fn prepare_response_headers(headers: &mut HeaderMap) {
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(APPLICATION_JSON.essence_str()),
        );
        headers.remove(header::CONTENT_LENGTH);
    }
}

impl fmt::Debug for MarshalingProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarshalingProvider")
            .field("cache", &self.cache)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Builder for [`MarshalingProvider`].
#[derive(Default)]
pub struct MarshalingProviderBuilder {
    resolver: Option<Arc<dyn MarshalerResolver>>,
    config: ProviderConfig,
}

impl MarshalingProviderBuilder {
    /// Creates a builder with no resolver and default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the resolver marshalers are loaded from.
    #[must_use]
    pub fn resolver<R: MarshalerResolver>(mut self, resolver: R) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    /// Sets a resolver that is shared with other owners.
    #[must_use]
    pub fn shared_resolver(mut self, resolver: Arc<dyn MarshalerResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Sets the provider configuration.
    #[must_use]
    pub fn config(mut self, config: ProviderConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the provider.
    ///
    /// Without a resolver the provider knows no types and declines every
    /// negotiation.
    #[must_use]
    pub fn build(self) -> MarshalingProvider {
        let resolver = self
            .resolver
            .unwrap_or_else(|| Arc::new(MarshalerRegistry::default()));

        tracing::debug!(
            warmup = %self.config.warmup,
            negotiation_load = %self.config.negotiation_load,
            "marshaling provider built"
        );

        MarshalingProvider {
            cache: Arc::new(MarshalerCache::new(resolver)),
            warmup: WarmupScheduler::new(&self.config),
            config: self.config,
        }
    }
}

impl fmt::Debug for MarshalingProviderBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarshalingProviderBuilder")
            .field("has_resolver", &self.resolver.is_some())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermes_config::WarmupMode;
    use hermes_test::fixtures::{sample_order, Order};

    #[test]
    fn test_builder_defaults() {
        let provider = MarshalingProvider::builder().build();
        assert_eq!(provider.config(), &ProviderConfig::default());
        assert!(provider.cache().is_empty());
        assert!(!provider
            .cache()
            .resolver()
            .has_associated_marshaler(&Order::key()));
    }

    #[test]
    fn test_builder_with_config() {
        let config = ProviderConfig {
            warmup: WarmupMode::Disabled,
            ..Default::default()
        };
        let provider = MarshalingProvider::builder().config(config.clone()).build();
        assert_eq!(provider.config(), &config);
    }

    #[test]
    fn test_clones_share_cache() {
        let provider = MarshalingProvider::builder()
            .resolver(MarshalerRegistry::builder().register::<Order>().build())
            .build();
        let clone = provider.clone();

        provider.cache().get_or_load(&Order::key()).unwrap();
        assert!(clone.cache().contains(&Order::key()));
        assert!(Arc::ptr_eq(provider.cache(), clone.cache()));
    }

    #[test]
    fn test_size_is_unknown() {
        let provider = MarshalingProvider::builder().build();
        assert_eq!(provider.size_of(&sample_order()), None);
    }

    #[test]
    fn test_prepare_response_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("42"));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));

        MarshalingProvider::prepare_response_headers(&mut headers);

        assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "application/json");
        assert!(headers.get(header::CONTENT_LENGTH).is_none());
    }
}
