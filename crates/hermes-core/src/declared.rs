//! Declared payload types.
//!
//! The declared type is what an exchange's body is contractually advertised
//! as. Only a [`DeclaredType::Concrete`] type names a single marshaler; every
//! other shape is ambiguous and is never guessed at.

use crate::TypeKey;
use std::fmt;

/// The advertised type of a request or response body.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeclaredType {
    /// A single, concretely known type.
    Concrete(TypeKey),

    /// A generic type applied to arguments, e.g. `Page<Order>`.
    Parameterized {
        /// The generic type itself.
        raw: TypeKey,
        /// Its type arguments.
        arguments: Vec<DeclaredType>,
    },

    /// An open type parameter, e.g. `T`.
    Variable(String),

    /// An unbounded wildcard.
    Wildcard,
}

impl DeclaredType {
    /// Creates a concrete declared type.
    #[must_use]
    pub fn concrete(key: impl Into<TypeKey>) -> Self {
        Self::Concrete(key.into())
    }

    /// Creates a parameterized declared type.
    #[must_use]
    pub fn parameterized(raw: impl Into<TypeKey>, arguments: Vec<DeclaredType>) -> Self {
        Self::Parameterized {
            raw: raw.into(),
            arguments,
        }
    }

    /// Creates an open type variable.
    #[must_use]
    pub fn variable(name: impl Into<String>) -> Self {
        Self::Variable(name.into())
    }

    /// Returns the key if this type resolves to exactly one concrete type.
    #[must_use]
    pub fn as_concrete(&self) -> Option<&TypeKey> {
        match self {
            Self::Concrete(key) => Some(key),
            _ => None,
        }
    }

    /// Returns `true` if this type resolves to exactly one concrete type.
    #[must_use]
    pub fn is_concrete(&self) -> bool {
        self.as_concrete().is_some()
    }
}

impl From<TypeKey> for DeclaredType {
    fn from(key: TypeKey) -> Self {
        Self::Concrete(key)
    }
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Concrete(key) => write!(f, "{key}"),
            Self::Parameterized { raw, arguments } => {
                write!(f, "{raw}<")?;
                for (i, arg) in arguments.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(">")
            }
            Self::Variable(name) => f.write_str(name),
            Self::Wildcard => f.write_str("?"),
        }
    }
}
