//! Stable identifiers for marshaled payload types.
//!
//! A [`TypeKey`] names "the kind of value being transferred". It is an
//! explicit string tag rather than a runtime type token, so two requests for
//! the same payload shape always map to the same cache entry regardless of how
//! the value was produced.
//!
//! # Example
//!
//! ```
//! use hermes_core::{Marshaled, TypeKey};
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
//! assert_eq!(TypeKey::of::<Invoice>(), TypeKey::new("billing.Invoice"));
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Identifier of a marshaled payload type.
///
/// Cheap to clone for static tags; owned tags are accepted for keys that are
/// only known at runtime (e.g. read from configuration).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeKey(Cow<'static, str>);

impl TypeKey {
    /// Creates a key from a static tag.
    #[must_use]
    pub const fn new(tag: &'static str) -> Self {
        Self(Cow::Borrowed(tag))
    }

    /// Creates a key from an owned tag.
    #[must_use]
    pub fn owned(tag: impl Into<String>) -> Self {
        Self(Cow::Owned(tag.into()))
    }

    /// Returns the key for a [`Marshaled`] type.
    #[must_use]
    pub const fn of<T: Marshaled>() -> Self {
        Self::new(T::TYPE_KEY)
    }

    /// Returns the tag as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for TypeKey {
    fn from(tag: &'static str) -> Self {
        Self::new(tag)
    }
}

impl From<String> for TypeKey {
    fn from(tag: String) -> Self {
        Self::owned(tag)
    }
}

impl AsRef<str> for TypeKey {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// A payload type with a stable [`TypeKey`].
///
/// Implementing this trait is what makes a type registrable with
/// [`MarshalerRegistryBuilder::register`](crate::MarshalerRegistryBuilder::register)
/// and usable with the typed provider entry points.
pub trait Marshaled: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// The tag this type is advertised under.
    const TYPE_KEY: &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[derive(Serialize, Deserialize)]
    struct Sample;

    impl Marshaled for Sample {
        const TYPE_KEY: &'static str = "test.Sample";
    }

    #[test]
    fn test_static_and_owned_keys_are_equal() {
        let a = TypeKey::new("test.Sample");
        let b = TypeKey::owned(String::from("test.Sample"));
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn test_of_uses_type_key_const() {
        assert_eq!(TypeKey::of::<Sample>().as_str(), "test.Sample");
    }

    #[test]
    fn test_display() {
        assert_eq!(TypeKey::new("orders.Order").to_string(), "orders.Order");
    }

    #[test]
    fn test_serde_transparent() {
        let key = TypeKey::new("orders.Order");
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, r#""orders.Order""#);

        let back: TypeKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }
}
