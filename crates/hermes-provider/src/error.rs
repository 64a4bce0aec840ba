//! Provider error types.
//!
//! A [`ProviderError`] is what the HTTP layer sees. Each variant maps to a
//! status code and a stable error code for error envelopes.

use hermes_core::{MarshalError, ResolveError, TypeKey};
use http::StatusCode;
use thiserror::Error;

/// Result type alias using [`ProviderError`].
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Failure while decoding a request body or encoding a response body.
///
/// # Example
///
/// ```rust
/// use hermes_core::{MarshalError, TypeKey};
/// use hermes_provider::ProviderError;
/// use http::StatusCode;
///
/// let err = ProviderError::malformed(&TypeKey::new("orders.Order"), MarshalError::UnexpectedEof);
/// assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
/// assert_eq!(err.error_code(), "MALFORMED_PAYLOAD");
/// assert!(err.is_client_error());
/// ```
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The request body is not valid JSON for the expected type, or the body
    /// stream failed while it was being read.
    #[error("malformed '{type_key}' payload: {source}")]
    MalformedPayload {
        /// The type the body was decoded as.
        type_key: TypeKey,
        /// What went wrong.
        #[source]
        source: MarshalError,
    },

    /// No marshaler could be obtained for the type.
    #[error("codec unavailable: {0}")]
    CodecUnavailable(#[from] ResolveError),

    /// Writing the response body failed.
    #[error("failed to encode '{type_key}' payload: {source}")]
    EncodeFailed {
        /// The declared type the body was encoded as.
        type_key: TypeKey,
        /// What went wrong.
        #[source]
        source: MarshalError,
    },

    /// A decoded payload is not of the Rust type the caller asked for.
    #[error("decoded payload is not a '{expected}'")]
    TypeMismatch {
        /// The requested type.
        expected: TypeKey,
    },
}

impl ProviderError {
    /// Creates a malformed payload error.
    #[must_use]
    pub fn malformed(type_key: &TypeKey, source: MarshalError) -> Self {
        Self::MalformedPayload {
            type_key: type_key.clone(),
            source,
        }
    }

    /// Creates an encode failure.
    #[must_use]
    pub fn encode_failed(type_key: &TypeKey, source: MarshalError) -> Self {
        Self::EncodeFailed {
            type_key: type_key.clone(),
            source,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MalformedPayload { .. } => StatusCode::BAD_REQUEST,
            Self::CodecUnavailable(_) | Self::EncodeFailed { .. } | Self::TypeMismatch { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns the error code suitable for error envelopes.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MalformedPayload { .. } => "MALFORMED_PAYLOAD",
            Self::CodecUnavailable(_) => "CODEC_UNAVAILABLE",
            Self::EncodeFailed { .. } => "ENCODE_FAILED",
            Self::TypeMismatch { .. } => "PAYLOAD_TYPE_MISMATCH",
        }
    }

    /// Returns `true` if the caller sent something wrong.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Short label used in metrics.
    pub(crate) fn outcome(&self) -> &'static str {
        match self {
            Self::MalformedPayload { .. } => "malformed",
            Self::CodecUnavailable(_) => "unavailable",
            Self::EncodeFailed { .. } => "failed",
            Self::TypeMismatch { .. } => "mismatch",
        }
    }
}
