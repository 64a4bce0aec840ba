//! Error types for Hermes core.
//!
//! - [`MarshalError`] is raised while a marshaler reads from or writes to a
//!   JSON stream.
//! - [`ResolveError`] is raised when no marshaler can be produced for a type.

use crate::TypeKey;
use std::io;
use thiserror::Error;

/// Result type alias using [`MarshalError`].
pub type MarshalResult<T> = Result<T, MarshalError>;

/// Failure while streaming a value through a marshaler.
#[derive(Error, Debug)]
pub enum MarshalError {
    /// The underlying byte stream failed.
    #[error("I/O error on JSON stream: {0}")]
    Io(#[from] io::Error),

    /// The JSON could not be parsed or did not match the expected shape.
    #[error("invalid JSON: {0}")]
    Json(#[source] serde_json::Error),

    /// The stream ended before a value started.
    #[error("unexpected end of JSON input")]
    UnexpectedEof,

    /// A byte that cannot start a JSON value was found.
    #[error("unexpected byte 0x{byte:02x} at start of JSON value")]
    UnexpectedByte {
        /// The offending byte.
        byte: u8,
    },

    /// A value was read before the parser was advanced to a token.
    #[error("parser is not positioned at a value token")]
    NotPositioned,

    /// The value handed to a marshaler is not of the type it handles.
    #[error("value is not an instance of '{expected}'")]
    TypeMismatch {
        /// The type key the marshaler is bound to.
        expected: TypeKey,
    },

    /// Marshaler-specific failure.
    #[error("{0}")]
    Custom(String),
}

impl MarshalError {
    /// Creates a custom marshaling error.
    #[must_use]
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }

    /// Returns `true` if the failure originated in the byte stream itself.
    #[must_use]
    pub fn is_io(&self) -> bool {
        match self {
            Self::Io(_) => true,
            Self::Json(e) => e.is_io(),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for MarshalError {
    fn from(e: serde_json::Error) -> Self {
        // Unwrap stream failures so callers can tell a broken pipe from bad JSON.
        if e.is_io() {
            return Self::Io(e.into());
        }
        Self::Json(e)
    }
}

/// Failure to produce a marshaler for a type.
///
/// `Clone` so that a single failed load can be reported to every caller that
/// was waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// No marshaler is associated with the type.
    #[error("no marshaler associated with type '{key}'")]
    NotAssociated {
        /// The requested type.
        key: TypeKey,
    },

    /// A marshaler is associated but could not be constructed.
    #[error("failed to load marshaler for '{key}': {reason}")]
    LoadFailed {
        /// The requested type.
        key: TypeKey,
        /// Why construction failed.
        reason: String,
    },
}

impl ResolveError {
    /// Creates a not-associated error.
    #[must_use]
    pub fn not_associated(key: &TypeKey) -> Self {
        Self::NotAssociated { key: key.clone() }
    }

    /// Creates a load failure.
    #[must_use]
    pub fn load_failed(key: &TypeKey, reason: impl Into<String>) -> Self {
        Self::LoadFailed {
            key: key.clone(),
            reason: reason.into(),
        }
    }

    /// Returns the type key the failure is about.
    #[must_use]
    pub fn key(&self) -> &TypeKey {
        match self {
            Self::NotAssociated { key } | Self::LoadFailed { key, .. } => key,
        }
    }
}
