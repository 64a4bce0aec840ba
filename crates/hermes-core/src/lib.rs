//! # Hermes Core
//!
//! Core types and traits for the Hermes JSON marshaling provider.
//!
//! This crate provides the pieces the HTTP layer is built on:
//!
//! - [`TypeKey`] - Identity of a marshalable type
//! - [`DeclaredType`] - Statically declared type of a payload, possibly generic
//! - [`Marshaler`] - Paired decode/encode capability for one type
//! - [`MarshalerResolver`] / [`MarshalerRegistry`] - Where marshalers come from
//! - [`MarshalerCache`] - Concurrent, lazily populated marshaler cache
//! - [`json`] - Streaming JSON parser and generator handed to marshalers

#![doc(html_root_url = "https://docs.rs/hermes-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod cache;
mod declared;
mod error;
pub mod json;
mod marshaler;
mod registry;
mod type_key;

pub use cache::{CacheStats, MarshalerCache};
pub use declared::DeclaredType;
pub use error::{MarshalError, MarshalResult, ResolveError};
pub use json::{JsonGenerator, JsonParser, JsonToken};
pub use marshaler::{Marshaler, Payload, SerdeMarshaler};
pub use registry::{MarshalerFactory, MarshalerRegistry, MarshalerRegistryBuilder, MarshalerResolver};
pub use type_key::{Marshaled, TypeKey};
