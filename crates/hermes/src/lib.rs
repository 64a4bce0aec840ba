//! # Hermes
//!
//! Streaming JSON marshaling provider for HTTP message bodies.
//!
//! Hermes decides whether it can read or write a body of a given type and
//! media type, and then streams the body through a marshaler that is loaded
//! once per type and cached for the life of the process.
//!
//! ## Crates
//!
//! - [`core`] - type keys, marshalers, the resolver/registry and the cache
//! - [`provider`] - negotiation, decoding and encoding
//! - [`config`] - layered configuration
//! - [`telemetry`] - logging and metrics setup
//!
//! ## Example
//!
//! ```rust
//! use hermes::prelude::*;
//! # use serde::{Deserialize, Serialize};
//! # #[derive(Debug, PartialEq, Serialize, Deserialize)]
//! # struct Greeting { text: String }
//! # impl Marshaled for Greeting { const TYPE_KEY: &'static str = "demo.Greeting"; }
//!
//! let config = ConfigLoader::new().with_defaults().load().unwrap();
//! let provider = MarshalingProvider::builder()
//!     .resolver(MarshalerRegistry::builder().register::<Greeting>().build())
//!     .config(config.provider)
//!     .build();
//!
//! let body = provider
//!     .write_bytes(&Greeting { text: "hi".into() }, &APPLICATION_JSON)
//!     .unwrap();
//! let back: Greeting = provider.read(&APPLICATION_JSON, &body[..]).unwrap();
//! assert_eq!(back.text, "hi");
//! ```

#![doc(html_root_url = "https://docs.rs/hermes/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use hermes_core as core;

// Re-export provider types
pub use hermes_provider as provider;

// Re-export configuration types
pub use hermes_config as config;

// Re-export telemetry setup
pub use hermes_telemetry as telemetry;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use hermes::prelude::*;
///
/// let provider = MarshalingProvider::builder().build();
/// assert!(!provider.supports(&TypeKey::new("demo.Unknown"), &APPLICATION_JSON));
/// ```
pub mod prelude {
    pub use hermes_core::{
        DeclaredType, MarshalError, Marshaled, Marshaler, MarshalerCache, MarshalerRegistry,
        MarshalerResolver, Payload, ResolveError, SerdeMarshaler, TypeKey,
    };

    // Re-export the provider
    pub use hermes_provider::media::APPLICATION_JSON;
    pub use hermes_provider::{
        MarshalingProvider, MarshalingProviderBuilder, ProviderError, ProviderResult,
    };

    // Re-export configuration
    pub use hermes_config::{ConfigLoader, HermesConfig, NegotiationLoad, ProviderConfig, WarmupMode};

    // Re-export telemetry setup
    pub use hermes_telemetry::{init_telemetry, TelemetryConfig};
}
