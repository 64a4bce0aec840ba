//! # Hermes Provider
//!
//! HTTP message body provider that streams `application/json` bodies through
//! cached marshalers.
//!
//! | Operation | Methods |
//! |-----------|---------|
//! | Negotiation | [`MarshalingProvider::is_readable`], [`MarshalingProvider::is_writeable`], [`MarshalingProvider::supports`] |
//! | Decoding | [`MarshalingProvider::read_from`], [`MarshalingProvider::read`], [`MarshalingProvider::read_bytes`] |
//! | Encoding | [`MarshalingProvider::write_to`], [`MarshalingProvider::write`], [`MarshalingProvider::write_bytes`] |
//! | Framing | [`MarshalingProvider::size_of`], [`MarshalingProvider::prepare_response_headers`] |
//!
//! A positive negotiation schedules a background load of the type's
//! marshaler, so the decode or encode that follows finds it in the cache.
//!
//! ## Example
//!
//! ```rust
//! use hermes_core::{DeclaredType, MarshalerRegistry, TypeKey};
//! use hermes_provider::MarshalingProvider;
//! # use serde::{Deserialize, Serialize};
//! # #[derive(Debug, PartialEq, Serialize, Deserialize)]
//! # struct Invoice { number: u32 }
//! # impl hermes_core::Marshaled for Invoice { const TYPE_KEY: &'static str = "billing.Invoice"; }
//!
//! let provider = MarshalingProvider::builder()
//!     .resolver(MarshalerRegistry::builder().register::<Invoice>().build())
//!     .build();
//!
//! let key = TypeKey::new("billing.Invoice");
//! assert!(provider.is_writeable(&key, &mime::APPLICATION_JSON));
//! assert!(!provider.is_writeable(&key, &mime::TEXT_PLAIN));
//!
//! let mut body = Vec::new();
//! provider
//!     .write_to(
//!         &Invoice { number: 12 },
//!         &key,
//!         &DeclaredType::concrete(key.clone()),
//!         &mime::APPLICATION_JSON,
//!         &mut body,
//!     )
//!     .unwrap();
//! assert_eq!(body, br#"{"number":12}"#);
//! ```
//!
//! ## Errors
//!
//! Decoding and encoding return [`ProviderError`], which carries an HTTP
//! status and a stable error code. Only malformed request bodies are client
//! errors.

#![doc(html_root_url = "https://docs.rs/hermes-provider/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod decode;
mod encode;
mod error;
pub mod media;
mod negotiate;
mod provider;
mod warmup;

pub use error::{ProviderError, ProviderResult};
pub use provider::{MarshalingProvider, MarshalingProviderBuilder};
pub use warmup::WarmupScheduler;

pub use hermes_config::{NegotiationLoad, ProviderConfig, WarmupMode};
