//! The marshaler (codec) abstraction.
//!
//! A [`Marshaler`] is bound to exactly one [`TypeKey`] and knows how to read
//! that type from a [`JsonParser`] and write it to a [`JsonGenerator`].
//! Marshalers are created once by a resolver, shared read-only through the
//! cache and never mutated afterwards.

use crate::error::{MarshalError, MarshalResult};
use crate::json::{JsonGenerator, JsonParser};
use crate::{Marshaled, TypeKey};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;

/// A decoded value whose concrete type is known to the marshaler that
/// produced it.
pub type Payload = Box<dyn Any + Send>;

/// Paired decode/encode capability for one declared type.
pub trait Marshaler: Send + Sync + 'static {
    /// The type this marshaler is bound to.
    fn type_key(&self) -> &TypeKey;

    /// Reads one instance.
    ///
    /// The parser is already positioned at the value's first token.
    fn unmarshal_instance(&self, parser: &mut JsonParser<'_>) -> MarshalResult<Payload>;

    /// Writes one instance.
    ///
    /// Returns [`MarshalError::TypeMismatch`] if `value` is not of the type
    /// this marshaler handles.
    fn marshal_instance(&self, generator: &mut JsonGenerator<'_>, value: &dyn Any)
        -> MarshalResult<()>;
}

impl fmt::Debug for dyn Marshaler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Marshaler")
            .field("type_key", self.type_key())
            .finish_non_exhaustive()
    }
}

/// Marshaler for any serde-capable type.
pub struct SerdeMarshaler<T> {
    key: TypeKey,
    _marker: PhantomData<fn() -> T>,
}

impl<T> SerdeMarshaler<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Creates a marshaler for `T` under an explicit key.
    #[must_use]
    pub fn new(key: impl Into<TypeKey>) -> Self {
        Self {
            key: key.into(),
            _marker: PhantomData,
        }
    }
}

impl<T: Marshaled> SerdeMarshaler<T> {
    /// Creates a marshaler for `T` under its own [`Marshaled::TYPE_KEY`].
    #[must_use]
    pub fn of() -> Self {
        Self::new(TypeKey::of::<T>())
    }
}

impl<T> Marshaler for SerdeMarshaler<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn type_key(&self) -> &TypeKey {
        &self.key
    }

    fn unmarshal_instance(&self, parser: &mut JsonParser<'_>) -> MarshalResult<Payload> {
        let value: T = parser.read_value()?;
        Ok(Box::new(value))
    }

    fn marshal_instance(
        &self,
        generator: &mut JsonGenerator<'_>,
        value: &dyn Any,
    ) -> MarshalResult<()> {
        let value = value
            .downcast_ref::<T>()
            .ok_or_else(|| MarshalError::TypeMismatch {
                expected: self.key.clone(),
            })?;
        generator.write_value(value)
    }
}

impl<T> fmt::Debug for SerdeMarshaler<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerdeMarshaler")
            .field("key", &self.key)
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}
