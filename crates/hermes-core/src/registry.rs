//! Marshaler resolution.
//!
//! A [`MarshalerResolver`] answers two questions about a [`TypeKey`]: whether
//! a marshaler is associated with it (a cheap probe) and, if so, how to obtain
//! one (a potentially expensive load). [`MarshalerRegistry`] is the standard
//! resolver: an explicit table built once at startup.
//!
//! # Example
//!
//! ```rust
//! use hermes_core::{Marshaled, MarshalerRegistry, MarshalerResolver, TypeKey};
//! use serde::{Deserialize, Serialize};
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
//! let registry = MarshalerRegistry::builder()
//!     .register::<Invoice>()
//!     .build();
//!
//! let key = TypeKey::of::<Invoice>();
//! assert!(registry.has_associated_marshaler(&key));
//!
//! let marshaler = registry.load_marshaler(&key).unwrap();
//! assert_eq!(marshaler.type_key(), &key);
//! ```

use crate::error::ResolveError;
use crate::marshaler::{Marshaler, SerdeMarshaler};
use crate::{Marshaled, TypeKey};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Produces marshalers for type keys.
pub trait MarshalerResolver: Send + Sync + 'static {
    /// Returns `true` if a marshaler is associated with `key`.
    ///
    /// Must be cheap and must not construct the marshaler.
    fn has_associated_marshaler(&self, key: &TypeKey) -> bool;

    /// Produces the marshaler for `key`.
    fn load_marshaler(&self, key: &TypeKey) -> Result<Arc<dyn Marshaler>, ResolveError>;
}

impl<R: MarshalerResolver + ?Sized> MarshalerResolver for Arc<R> {
    fn has_associated_marshaler(&self, key: &TypeKey) -> bool {
        (**self).has_associated_marshaler(key)
    }

    fn load_marshaler(&self, key: &TypeKey) -> Result<Arc<dyn Marshaler>, ResolveError> {
        (**self).load_marshaler(key)
    }
}

/// Deferred marshaler construction.
pub type MarshalerFactory =
    Arc<dyn Fn(&TypeKey) -> Result<Arc<dyn Marshaler>, ResolveError> + Send + Sync>;

fn shared_factory(marshaler: Arc<dyn Marshaler>) -> MarshalerFactory {
    Arc::new(
        move |_: &TypeKey| -> Result<Arc<dyn Marshaler>, ResolveError> {
            Ok(Arc::clone(&marshaler))
        },
    )
}

/// Explicit type key → marshaler table.
///
/// Built with [`MarshalerRegistry::builder`] and immutable afterwards.
#[derive(Clone, Default)]
pub struct MarshalerRegistry {
    factories: HashMap<TypeKey, MarshalerFactory>,
}

impl MarshalerRegistry {
    /// Creates a new registry builder.
    #[must_use]
    pub fn builder() -> MarshalerRegistryBuilder {
        MarshalerRegistryBuilder::new()
    }

    /// Returns `true` if `key` is registered.
    #[must_use]
    pub fn contains(&self, key: &TypeKey) -> bool {
        self.factories.contains_key(key)
    }

    /// Returns the registered keys in sorted order.
    #[must_use]
    pub fn keys(&self) -> Vec<TypeKey> {
        let mut keys: Vec<_> = self.factories.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Returns the number of registered keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl MarshalerResolver for MarshalerRegistry {
    fn has_associated_marshaler(&self, key: &TypeKey) -> bool {
        self.contains(key)
    }

    fn load_marshaler(&self, key: &TypeKey) -> Result<Arc<dyn Marshaler>, ResolveError> {
        let factory = self
            .factories
            .get(key)
            .ok_or_else(|| ResolveError::not_associated(key))?;
        factory(key)
    }
}

impl fmt::Debug for MarshalerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarshalerRegistry")
            .field("keys", &self.keys())
            .finish()
    }
}

/// Builder for [`MarshalerRegistry`].
#[derive(Default)]
pub struct MarshalerRegistryBuilder {
    factories: HashMap<TypeKey, MarshalerFactory>,
}

impl MarshalerRegistryBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the serde marshaler for `T` under [`Marshaled::TYPE_KEY`].
    #[must_use]
    pub fn register<T: Marshaled>(self) -> Self {
        self.register_as::<T>(TypeKey::of::<T>())
    }

    /// Registers the serde marshaler for `T` under an explicit key.
    #[must_use]
    pub fn register_as<T>(self, key: impl Into<TypeKey>) -> Self
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        let key = key.into();
        let marshaler: Arc<dyn Marshaler> = Arc::new(SerdeMarshaler::<T>::new(key.clone()));
        self.insert(key, shared_factory(marshaler))
    }

    /// Registers a prebuilt marshaler under its own key.
    #[must_use]
    pub fn register_marshaler(self, marshaler: Arc<dyn Marshaler>) -> Self {
        let key = marshaler.type_key().clone();
        self.insert(key, shared_factory(marshaler))
    }

    /// Registers a factory that is invoked on every load of `key`.
    #[must_use]
    pub fn register_factory<F>(self, key: impl Into<TypeKey>, factory: F) -> Self
    where
        F: Fn(&TypeKey) -> Result<Arc<dyn Marshaler>, ResolveError> + Send + Sync + 'static,
    {
        self.insert(key.into(), Arc::new(factory))
    }

    fn insert(mut self, key: TypeKey, factory: MarshalerFactory) -> Self {
        if self.factories.insert(key.clone(), factory).is_some() {
            tracing::warn!(type_key = %key, "replacing previously registered marshaler");
        }
        self
    }

    /// Builds the registry.
    #[must_use]
    pub fn build(self) -> MarshalerRegistry {
        MarshalerRegistry {
            factories: self.factories,
        }
    }
}

impl fmt::Debug for MarshalerRegistryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarshalerRegistryBuilder")
            .field("registered", &self.factories.len())
            .finish()
    }
}
