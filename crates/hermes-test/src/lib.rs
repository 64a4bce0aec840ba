//! # Hermes Test
//!
//! Test utilities for Hermes.
//!
//! - [`CountingResolver`] / [`FlakyResolver`] - instrumented resolvers
//! - [`StreamProbe`] with [`TrackedReader`] / [`TrackedWriter`] - streams
//!   that record their release
//! - [`PanickingMarshaler`] - unwinds mid-stream
//! - [`fixtures`] - payload types and proptest strategies
//!
//! ## Example
//!
//! ```
//! use hermes_core::{MarshalerCache, MarshalerRegistry};
//! use hermes_test::{fixtures::Order, CountingResolver};
//! use std::sync::Arc;
//!
//! let resolver = Arc::new(CountingResolver::new(
//!     MarshalerRegistry::builder().register::<Order>().build(),
//! ));
//! let cache = MarshalerCache::new(resolver.clone());
//!
//! cache.get_or_load(&Order::key()).unwrap();
//! cache.get_or_load(&Order::key()).unwrap();
//! assert_eq!(resolver.loads(), 1);
//! ```

#![doc(html_root_url = "https://docs.rs/hermes-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod fixtures;
mod marshaler;
mod resolver;
mod stream;

pub use marshaler::PanickingMarshaler;
pub use resolver::{CountingResolver, FlakyResolver};
pub use stream::{StreamProbe, TrackedReader, TrackedWriter};
